//! Errors and diagnostics for decompilation and compilation.

use std::fmt;

use ncs_common::{CodecError, FormatError, Location};
use thiserror::Error;

/// A decompilation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecompileError {
    /// The control-flow graph could not be built.
    #[error("malformed control flow: {0}")]
    Format(#[from] FormatError),

    /// Re-encoding the program for the bytecode fence failed.
    #[error("cannot embed bytecode: {0}")]
    Encode(#[from] CodecError),

    /// An instruction's operands do not match its opcode.
    #[error("malformed operands for {mnemonic} at instruction {at}")]
    MalformedOperands { at: usize, mnemonic: String },
}

impl DecompileError {
    /// Index of the instruction that caused the failure, when known.
    pub fn instruction(&self) -> Option<usize> {
        match self {
            DecompileError::Format(e) => format_location(e),
            DecompileError::Encode(CodecError::Format(e)) => format_location(e),
            DecompileError::Encode(CodecError::Unsupported(e)) => match e.location {
                Location::Index(at) => Some(at),
                Location::Offset(_) => None,
            },
            DecompileError::MalformedOperands { at, .. } => Some(*at),
        }
    }
}

fn format_location(err: &FormatError) -> Option<usize> {
    match err {
        FormatError::JumpOutOfRange { at, .. }
        | FormatError::MissingJumpTarget { at }
        | FormatError::UnencodableChar { at, .. }
        | FormatError::StringTooLong { at, .. } => Some(*at),
        _ => None,
    }
}

/// Errors locating or decoding an embedded bytecode fence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FenceError {
    /// The opening marker has no closing marker after it.
    #[error("bytecode fence is not terminated")]
    Unterminated,

    #[error("bytecode fence is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("embedded bytecode is invalid: {0}")]
    Codec(#[from] CodecError),
}

/// A failure of the compile entry point.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Fence(#[from] FenceError),

    /// The source has no fence and the front end rejected it.
    #[error("front end failed: {0}")]
    FrontEnd(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Failures loading a routine table.
#[derive(Debug, Error)]
pub enum RoutineTableError {
    #[error("invalid routine table JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("routine id {0:?} is not an integer in 0..=65535")]
    BadId(String),
}

/// Something the emitter worked around instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An instruction needed more operands than the symbolic stack held.
    StackUnderflow { needed: usize, available: usize },
    /// A stack-relative access pointed above the top of the stack.
    UnresolvedSlot { offset: i64 },
    /// A block was never reached by structured emission.
    SkippedBlock,
}

/// A lenient recovery, tied to the instruction where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub at: usize,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::StackUnderflow { needed, available } => write!(
                f,
                "instruction {}: stack underflow (needed {needed}, had {available})",
                self.at
            ),
            DiagnosticKind::UnresolvedSlot { offset } => {
                write!(f, "instruction {}: unresolved stack slot {offset}", self.at)
            }
            DiagnosticKind::SkippedBlock => {
                write!(f, "instruction {}: block not emitted", self.at)
            }
        }
    }
}
