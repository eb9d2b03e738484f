//! NCS common types and binary codec.
//!
//! This crate provides the foundational data structures for compiled NCS
//! scripts:
//!
//! - [`ByteCode`] and [`Qualifier`]: the two bytes that form a logical opcode
//! - [`Instruction`]: one decoded instruction with typed operands and a
//!   resolved jump target
//! - [`Program`]: an ordered instruction sequence
//! - [`codec`]: reading and writing the `NCS V1.0` container
//! - [`FormatError`], [`UnsupportedInstructionError`], [`CodecError`]
//!
//! # Dependencies
//!
//! `thiserror` for error types and `log` for decode summaries.

pub mod codec;
pub mod error;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod qualifier;

// Re-export commonly used types at the crate root.
pub use error::{CodecError, FormatError, Location, UnsupportedInstructionError};
pub use instruction::{Instruction, Operand, OperandType, StackEffect};
pub use opcode::ByteCode;
pub use program::Program;
pub use qualifier::Qualifier;
