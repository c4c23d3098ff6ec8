//! A library for handling Cryo Interactive's DOS-era HSQ resource
//! compression and the CONDIT condition bytecode that rides inside it.
//!
//! HSQ is an LZ77-family container: a 6-byte checksummed header followed
//! by a bitstream of literals and short/long back-references, with control
//! bits delivered in 16-bit sentinel words interleaved with data bytes.
//! [`decompress`] and [`compress`] are bit-exact against the original
//! engine's decoder; [`Decoder`] and [`EncoderBuilder`] expose headers,
//! search settings, and diagnostic logging.
//! ```
//! let original = b"ABBACABBACD";
//! let compressed = hsq::compress(original).unwrap();
//! let decompressed = hsq::decompress(&compressed).unwrap();
//! assert_eq!(&original[..], decompressed);
//! ```
//! The [`condit`] module covers the condition system found in one specific
//! resource: parsing its offset table, deriving the shared bytecode
//! chains, decompiling entries to expression trees, and compiling the
//! textual expression syntax back to bytecode.
//!
//! All operations are synchronous pure functions over in-memory buffers;
//! independent resources can be processed in parallel by the caller
//! without coordination.

mod bits;
pub mod condit;
mod decode;
mod encode;
mod errors;
mod format;

pub use decode::{decompress, decompress_file, hsq_info, Decoder};
pub use encode::{compress, EncoderBuilder, EncoderSettings};
pub use errors::{DecodeError, FormatError, ParseError};
pub use format::{HsqHeader, HEADER_SIZE};
