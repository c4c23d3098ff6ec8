//! Bit-level access to the HSQ payload stream.
//!
//! HSQ does not use a conventional byte-aligned bitstream. Control bits are
//! delivered in 16-bit little-endian words pulled from the same forward
//! cursor as literal and back-reference bytes, in consumption order. The
//! reader keeps a 16-bit queue refilled as `0x8000 | (word >> 1)`: folding a
//! sentinel into the top bit lets it detect, after exactly 16 shifts, that
//! the queue is exhausted without a separate bit counter.

use crate::errors::FormatError;

/// Bit and byte reader over a compressed payload.
///
/// Bits come LSB-first out of the sentinel queue; bytes and words are read
/// at the current cursor position. Both share one forward cursor.
pub(crate) struct BitSource<'a> {
    data: &'a [u8],
    pos: usize,
    queue: u16,
}

impl<'a> BitSource<'a> {
    pub(crate) fn new(data: &'a [u8], start: usize) -> Self {
        // queue of 0 forces a refill on the first bit read
        Self {
            data,
            pos: start,
            queue: 0,
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, FormatError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(FormatError::Truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, FormatError> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub(crate) fn read_bit(&mut self) -> Result<bool, FormatError> {
        let mut bit = self.queue & 1;
        self.queue >>= 1;
        if self.queue == 0 {
            let word = self.read_u16()?;
            bit = word & 1;
            self.queue = 0x8000 | (word >> 1);
        }
        Ok(bit != 0)
    }
}

/// Bit and byte writer producing a payload the [`BitSource`] scheme reads
/// back verbatim.
///
/// The first bit of every 16-bit group reserves a two-byte slot at the
/// current end of the output; data bytes pushed while the group fills land
/// after the slot, which is patched once 16 bits have accumulated. This
/// reproduces the single shared cursor order of the reference decoder.
pub(crate) struct BitSink {
    out: Vec<u8>,
    /// byte index of the word slot currently accepting bits
    slot: Option<usize>,
    word: u16,
    filled: u32,
}

impl BitSink {
    pub(crate) fn new() -> Self {
        Self {
            out: Vec::new(),
            slot: None,
            word: 0,
            filled: 0,
        }
    }

    pub(crate) fn push_bit(&mut self, bit: bool) {
        if self.slot.is_none() {
            self.slot = Some(self.out.len());
            self.out.extend_from_slice(&[0, 0]);
            self.word = 0;
            self.filled = 0;
        }
        if bit {
            self.word |= 1 << self.filled;
        }
        self.filled += 1;
        if self.filled == 16 {
            self.patch_word();
        }
    }

    pub(crate) fn push_u8(&mut self, byte: u8) {
        self.out.push(byte);
    }

    pub(crate) fn push_u16(&mut self, word: u16) {
        self.out.extend_from_slice(&word.to_le_bytes());
    }

    /// Patch any partially filled word and return the finished payload.
    /// Unused high bits are left zero; a well-formed stream terminates
    /// before they are ever consumed.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.patch_word();
        self.out
    }

    fn patch_word(&mut self) {
        if let Some(at) = self.slot.take() {
            self.out[at..at + 2].copy_from_slice(&self.word.to_le_bytes());
        }
    }
}
