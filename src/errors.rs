use std::io;
use thiserror::Error;

/// Errors from reading or writing the physical HSQ container, or from a
/// malformed CONDIT offset table.
///
/// Every variant is fatal to the single operation that raised it; there is
/// no partial or recoverable decode.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("input is {0} bytes, too short for the 6-byte HSQ header")]
    TooShort(usize),

    #[error("header bytes sum to {found:#04x}, expected 0xab")]
    Checksum { found: u8 },

    #[error("header declares {declared} compressed bytes but input is {actual}")]
    SizeMismatch { declared: u16, actual: usize },

    #[error("compressed stream ended early at offset {0:#06x}")]
    Truncated(usize),

    #[error("back-reference at output position {at:#06x} reaches {distance} bytes before the start of output")]
    BadReference { at: usize, distance: usize },

    #[error("stream ended with {produced} of {declared} declared output bytes")]
    OutputTooShort { declared: u16, produced: usize },

    #[error("input of {0} bytes cannot be described by the 16-bit header fields")]
    InputTooLarge(usize),

    #[error("condition table is {0} bytes, too short for an offset table")]
    TableTooShort(usize),

    #[error("condition table has a malformed first offset {0:#06x}")]
    BadOffsetTable(u16),

    #[error("condition table entry {index} offset {offset:#06x} points outside the bytecode area")]
    EntryOutOfBounds { index: u16, offset: u16 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A CONDIT bytecode walk that never reached its `0xFF` terminator.
///
/// Fatal only to the one entry being decoded; batch callers should catch
/// per entry and continue with the rest of the table.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("program at {start:#06x} ran off the end of the buffer at {offset:#06x} without a terminator")]
    Unterminated { start: usize, offset: usize },
}

/// Expression text that does not match the condition grammar.
///
/// Positions are byte offsets into the source string.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,

    #[error("unrecognized input at byte {pos}")]
    UnexpectedFragment { pos: usize },

    #[error("unexpected `{found}` at byte {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression at byte {pos}")]
    UnexpectedEnd { pos: usize },

    #[error("expected `)` at byte {pos}")]
    UnbalancedParen { pos: usize },

    #[error("malformed number at byte {pos}")]
    BadNumber { pos: usize },

    #[error("numeric literal at byte {pos} does not fit in 16 bits")]
    NumberTooLarge { pos: usize },

    #[error("variable address at byte {pos} does not fit in 8 bits")]
    AddressTooLarge { pos: usize },

    #[error("trailing input at byte {pos}")]
    TrailingInput { pos: usize },
}
