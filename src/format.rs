//! The HSQ container header.
//!
//! Every HSQ file starts with six bytes:
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0..2     | decompressed size, u16 little endian |
//! | 2        | checksum byte |
//! | 3..5     | compressed size (including this header), u16 little endian |
//! | 5        | checksum byte |
//!
//! The two checksum bytes are chosen so that all six header bytes sum to
//! `0xAB` modulo 256. That sum is the primary validity check on decode:
//! there are no magic bytes in the format.

use crate::errors::FormatError;

/// Physical size of the container header in bytes.
pub const HEADER_SIZE: usize = 6;

/// All six header bytes must sum to this value modulo 256.
pub(crate) const CHECKSUM_TARGET: u8 = 0xAB;

/// The sizes stored at the start of an HSQ container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsqHeader {
    /// size of the decompressed data
    pub decompressed_size: u16,
    /// physical size of the whole container, header included
    pub compressed_size: u16,
}

impl HsqHeader {
    /// Parse and validate the header at the front of `data`.
    ///
    /// Fails if fewer than [`HEADER_SIZE`] bytes are available or the
    /// checksum invariant does not hold. The compressed size is *not*
    /// checked against `data.len()` here; the decoder does that, since a
    /// header may be inspected on its own.
    pub(crate) fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < HEADER_SIZE {
            return Err(FormatError::TooShort(data.len()));
        }
        let sum = data[..HEADER_SIZE]
            .iter()
            .fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != CHECKSUM_TARGET {
            return Err(FormatError::Checksum { found: sum });
        }

        Ok(Self {
            decompressed_size: u16::from_le_bytes([data[0], data[1]]),
            compressed_size: u16::from_le_bytes([data[3], data[4]]),
        })
    }

    /// Serialize `self`, computing checksum bytes so the header invariant
    /// holds. The second checksum byte is always zero; the first absorbs
    /// the whole correction.
    pub(crate) fn to_array(self) -> [u8; HEADER_SIZE] {
        let mut arr = [0u8; HEADER_SIZE];
        arr[0..2].copy_from_slice(&self.decompressed_size.to_le_bytes());
        arr[3..5].copy_from_slice(&self.compressed_size.to_le_bytes());
        let sum = arr.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        arr[2] = CHECKSUM_TARGET.wrapping_sub(sum);
        arr
    }
}
