use crate::bits::BitSource;
use crate::errors::FormatError;
use crate::format::{HsqHeader, HEADER_SIZE};
use std::{borrow::Cow, fs, io::Write, path::Path};

use crate::encode::LONG_REACH;

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the decoding settings, such as logging and input.
///
/// Create a `Decoder` with [`for_bytes()`] or [`for_file()`], then
/// decompress the input with [`decode()`]. The validated [`HsqHeader`] is
/// available separately from [`header()`]:
/// ```
/// let original = b"ABBACABBACD";
/// let compressed = hsq::compress(original).unwrap();
///
/// let mut decoder = hsq::Decoder::for_bytes(&compressed);
/// assert_eq!(decoder.header().unwrap().decompressed_size as usize, original.len());
/// assert_eq!(decoder.decode().unwrap(), original);
/// ```
/// [`for_bytes()`]: Decoder::for_bytes
/// [`for_file()`]: Decoder::for_file
/// [`decode()`]: Decoder::decode
/// [`header()`]: Decoder::header
pub struct Decoder<'a, 'l> {
    data: Cow<'a, [u8]>,
    log: Option<LogWtr<'l>>,
}

impl<'a, 'l> Decoder<'a, 'l> {
    /// Create a new `Decoder` for a complete in-memory container.
    #[inline]
    pub fn for_bytes(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            log: None,
        }
    }

    /// Create a new `Decoder` for the container in the file at `p`.
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, FormatError> {
        Ok(Self {
            data: Cow::Owned(fs::read(p)?),
            log: None,
        })
    }

    /// Write a per-token trace to `wtr` while the input is being decoded.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'l mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Parse and validate the 6-byte header without decompressing.
    #[inline]
    pub fn header(&self) -> Result<HsqHeader, FormatError> {
        HsqHeader::from_bytes(&self.data)
    }

    /// Decompress the container into a fresh `Vec<u8>`.
    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, FormatError> {
        do_decode(&self.data, &mut self.log)
    }
}

/// Extract the validated [`HsqHeader`] from a container.
///
/// This is a convenience function to inspect a container's declared sizes
/// without setting up a [`Decoder`] or decompressing anything.
pub fn hsq_info(data: &[u8]) -> Result<HsqHeader, FormatError> {
    HsqHeader::from_bytes(data)
}

/// Decompress an HSQ container into a `Vec<u8>`
///
/// This is a convenience function to decode a byte slice without having to
/// set up a [`Decoder`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    Decoder::for_bytes(data).decode()
}

/// Decompress the HSQ container in the file at `p`.
pub fn decompress_file<P: AsRef<Path>>(p: P) -> Result<Vec<u8>, FormatError> {
    let data = fs::read(p)?;
    decompress(&data)
}

fn do_decode(data: &[u8], log: &mut Option<LogWtr>) -> Result<Vec<u8>, FormatError> {
    let header = HsqHeader::from_bytes(data)?;
    if header.compressed_size as usize != data.len() {
        return Err(FormatError::SizeMismatch {
            declared: header.compressed_size,
            actual: data.len(),
        });
    }

    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# Header\n{:?}\n", &header)?;
    }

    let output_size = header.decompressed_size as usize;
    let mut src = BitSource::new(data, HEADER_SIZE);
    let mut output: Vec<u8> = Vec::with_capacity(output_size);

    loop {
        if src.read_bit()? {
            // literal byte; streams without an EOF sentinel end on a full
            // buffer, matching the original decoder
            if output.len() >= output_size {
                break;
            }
            let byte = src.read_u8()?;
            output.push(byte);

            if let Some(wtr) = log.as_mut() {
                writeln!(wtr, "{:04x} - Uncoded: {:02x}", output.len() - 1, byte)?;
            }
        } else if src.read_bit()? {
            // long back-reference: 3-bit count, 13-bit offset
            let word = src.read_u16()?;
            let mut count = (word & 0x07) as usize;
            let distance = LONG_REACH - (word >> 3) as usize;

            if count == 0 {
                count = src.read_u8()? as usize;
                if count == 0 {
                    if let Some(wtr) = log.as_mut() {
                        writeln!(wtr, "{:04x} - End of stream", output.len())?;
                    }
                    break;
                }
            }

            if let Some(wtr) = log.as_mut() {
                writeln!(
                    wtr,
                    "{:04x} - Copyback [long]: size: {} mb: {}",
                    output.len(),
                    count + 2,
                    distance
                )?;
            }
            copy_back(&mut output, distance, count + 2)?;
        } else {
            // short back-reference: 2-bit count, one-byte offset
            let hi = src.read_bit()? as usize;
            let lo = src.read_bit()? as usize;
            let count = hi * 2 + lo;
            let distance = 256 - src.read_u8()? as usize;

            if let Some(wtr) = log.as_mut() {
                writeln!(
                    wtr,
                    "{:04x} - Copyback [short]: size: {} mb: {}",
                    output.len(),
                    count + 2,
                    distance
                )?;
            }
            copy_back(&mut output, distance, count + 2)?;
        }
    }

    if output.len() < output_size {
        return Err(FormatError::OutputTooShort {
            declared: header.decompressed_size,
            produced: output.len(),
        });
    }
    // a trailing copy may overshoot the declared size
    output.truncate(output_size);

    Ok(output)
}

/// Append `len` already-produced bytes starting `distance` back from the end
/// of `output`. The source may overlap the destination; copying byte at a
/// time extends runs correctly.
fn copy_back(output: &mut Vec<u8>, distance: usize, len: usize) -> Result<(), FormatError> {
    if distance > output.len() {
        return Err(FormatError::BadReference {
            at: output.len(),
            distance,
        });
    }
    let start = output.len() - distance;
    for i in start..start + len {
        let byte = output[i];
        output.push(byte);
    }
    Ok(())
}
