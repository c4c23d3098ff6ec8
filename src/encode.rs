use crate::bits::BitSink;
use crate::errors::FormatError;
use crate::format::{HsqHeader, HEADER_SIZE};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

mod matcher;

use self::matcher::{Match, MatchFinder};

type LogWtr<'a> = &'a mut dyn Write;

/// Furthest distance the 13-bit long reference form can reach back.
pub(crate) const LONG_REACH: usize = 8192;
/// Furthest distance the one-byte short reference form can reach back.
pub(crate) const SHORT_REACH: usize = 256;
/// Longest copy a single reference can describe (extension byte of 255).
pub(crate) const MAX_MATCH: usize = 257;

/// Longest copy the short form can describe (2-bit count).
const SHORT_MAX_MATCH: usize = 5;
/// Longest copy the long form can describe without an extension byte.
const LONG_INLINE_MAX_MATCH: usize = 9;

/// Configure the greedy match search that underlies HSQ compression.
///
/// `max_chain` bounds how many candidate positions are examined per hash
/// bucket before the search gives up, trading ratio for worst-case speed.
/// The sliding window itself is fixed by the format at 8 KiB (the reach of
/// the long reference form).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EncoderSettings {
    /// max hash-chain candidates examined per position
    pub max_chain: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self { max_chain: 64 }
    }
}

/// Specify the encoding settings, such as match search depth, logging,
/// input, and output.
///
/// To create a new `EncoderBuilder`, use [`for_bytes()`]. Then, change any
/// of the encoding settings with the helper methods. Finally, encode the
/// input with [`encode_to_vec()`], [`encode_to_writer()`], or
/// [`encode_to_file()`].
/// ```
/// let input = b"ABBACABBCADFEGABA";
/// let compressed = hsq::EncoderBuilder::for_bytes(input)
///     .with_settings(hsq::EncoderSettings { max_chain: 16 })
///     .encode_to_vec()
///     .unwrap();
/// assert_eq!(hsq::decompress(&compressed).unwrap(), input);
/// ```
/// [`for_bytes()`]: EncoderBuilder::for_bytes
/// [`encode_to_vec()`]: EncoderBuilder::encode_to_vec
/// [`encode_to_writer()`]: EncoderBuilder::encode_to_writer
/// [`encode_to_file()`]: EncoderBuilder::encode_to_file
pub struct EncoderBuilder<'a, 'l> {
    data: &'a [u8],
    settings: EncoderSettings,
    log: Option<LogWtr<'l>>,
}

impl<'a, 'l> EncoderBuilder<'a, 'l> {
    /// Create a new `EncoderBuilder` for the data in `bytes`.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            data: bytes,
            settings: EncoderSettings::default(),
            log: None,
        }
    }

    /// Set the settings used for the underlying match search.
    #[inline]
    pub fn with_settings(&mut self, settings: EncoderSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Write debugging and diagnostic information to `log` while the input
    /// is being encoded.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, log: &'l mut W) -> &mut Self {
        self.log = Some(log as LogWtr);
        self
    }

    /// Start the encoding and return the compressed container in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, FormatError> {
        do_encode(self.data, self.settings, &mut self.log)
    }

    /// Start the encoding and write the compressed container out to `wtr`.
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, mut wtr: W) -> Result<(), FormatError> {
        let out = self.encode_to_vec()?;
        wtr.write_all(&out).map_err(Into::into)
    }

    /// Start the encoding and write the compressed container out to the
    /// newly created `File` `f`.
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), FormatError> {
        let wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(wtr)
    }
}

/// Compress data into an HSQ container `Vec<u8>`
///
/// This is a convenience function to encode a byte slice without having to
/// import and set up an [`EncoderBuilder`].
pub fn compress(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    EncoderBuilder::for_bytes(data).encode_to_vec()
}

fn do_encode(
    data: &[u8],
    settings: EncoderSettings,
    log: &mut Option<LogWtr>,
) -> Result<Vec<u8>, FormatError> {
    if data.len() > u16::MAX as usize {
        return Err(FormatError::InputTooLarge(data.len()));
    }

    let mut finder = MatchFinder::new(data.len());
    let mut sink = BitSink::new();
    let mut pos = 0;

    while pos < data.len() {
        match finder.find_match(data, pos, settings.max_chain) {
            Some(m) => {
                if let Some(wtr) = log.as_mut() {
                    writeln!(
                        wtr,
                        "{:04x} - Copyback: size: {} mb: {}",
                        pos, m.length, m.distance
                    )?;
                }
                emit_match(&mut sink, m);
                for i in pos..pos + m.length {
                    finder.insert(data, i);
                }
                pos += m.length;
            }
            None => {
                if let Some(wtr) = log.as_mut() {
                    writeln!(wtr, "{:04x} - Uncoded: {:02x}", pos, data[pos])?;
                }
                sink.push_bit(true);
                sink.push_u8(data[pos]);
                finder.insert(data, pos);
                pos += 1;
            }
        }
    }

    // long-form EOF sentinel: count field 0, extension byte 0
    sink.push_bit(false);
    sink.push_bit(true);
    sink.push_u16(0);
    sink.push_u8(0);

    let payload = sink.finish();
    let total = payload.len() + HEADER_SIZE;
    if total > u16::MAX as usize {
        return Err(FormatError::InputTooLarge(data.len()));
    }

    let header = HsqHeader {
        decompressed_size: data.len() as u16,
        compressed_size: total as u16,
    };

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&header.to_array());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Write one back-reference, preferring the cheaper short form whenever the
/// distance fits in its one-byte offset.
fn emit_match(sink: &mut BitSink, m: Match) {
    debug_assert!(m.length >= 2 && m.length <= MAX_MATCH);
    debug_assert!(m.distance >= 1 && m.distance <= LONG_REACH);

    if m.distance <= SHORT_REACH && m.length <= SHORT_MAX_MATCH {
        let count = m.length - 2;
        sink.push_bit(false);
        sink.push_bit(false);
        sink.push_bit(count & 2 != 0);
        sink.push_bit(count & 1 != 0);
        sink.push_u8((SHORT_REACH - m.distance) as u8);
    } else {
        let offset_field = ((LONG_REACH - m.distance) as u16) << 3;
        sink.push_bit(false);
        sink.push_bit(true);
        if m.length <= LONG_INLINE_MAX_MATCH {
            sink.push_u16(offset_field | (m.length - 2) as u16);
        } else {
            sink.push_u16(offset_field);
            sink.push_u8((m.length - 2) as u8);
        }
    }
}
