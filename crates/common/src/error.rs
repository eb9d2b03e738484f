//! Errors for NCS instruction decoding and encoding.

use thiserror::Error;

/// Structurally invalid NCS data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The file does not start with `"NCS "`.
    #[error("bad magic: expected \"NCS \", found {0:02x?}")]
    BadMagic([u8; 4]),

    /// The version field is not `"V1.0"`.
    #[error("bad version: expected \"V1.0\", found {0:02x?}")]
    BadVersion([u8; 4]),

    /// The header declares more bytes than the buffer holds.
    #[error("declared size {declared} exceeds buffer length {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    /// The stream ended in the middle of a header or instruction.
    #[error("truncated stream at offset {offset}: need {needed} more byte(s)")]
    Truncated { offset: usize, needed: usize },

    /// A jump lands outside the program or between instructions.
    #[error("jump at instruction {at} targets {target}, which is not an instruction")]
    JumpOutOfRange { at: usize, target: i64 },

    /// A jump-family instruction has no resolved target.
    #[error("jump at instruction {at} has no target")]
    MissingJumpTarget { at: usize },

    /// A CONSTS string holds a character outside the single-byte range.
    #[error("string at instruction {at} contains non-byte character {ch:?}")]
    UnencodableChar { at: usize, ch: char },

    /// A CONSTS string is longer than a u16 length prefix allows.
    #[error("string at instruction {at} is {len} bytes (max 65535)")]
    StringTooLong { at: usize, len: usize },
}

/// An instruction that has no defined binary encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported instruction {byte_code:#04x}/{qualifier:#04x} at {location}: {reason}")]
pub struct UnsupportedInstructionError {
    /// Raw byte code.
    pub byte_code: u8,
    /// Raw qualifier.
    pub qualifier: u8,
    /// Where it was found.
    pub location: Location,
    /// What made it unsupported.
    pub reason: &'static str,
}

/// Location of an instruction, either in the byte stream or the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Byte offset in an encoded stream.
    Offset(usize),
    /// Index in a program's instruction vector.
    Index(usize),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Offset(offset) => write!(f, "offset {offset:#x}"),
            Location::Index(index) => write!(f, "instruction {index}"),
        }
    }
}

/// Any codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedInstructionError),
}
