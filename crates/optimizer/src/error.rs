//! Optimizer errors.

use ncs_common::FormatError;
use thiserror::Error;

/// A pass failure. The program is left as it was before the failing pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// The pass exists as an extension point but does nothing yet.
    #[error("optimizer pass {pass} is not implemented")]
    NotImplemented { pass: &'static str },

    /// A surviving jump would point at a deleted instruction.
    #[error("instruction {at} would jump to removed instruction {target}")]
    DanglingJump { at: usize, target: usize },

    #[error(transparent)]
    Format(FormatError),
}

impl From<FormatError> for OptimizeError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::JumpOutOfRange { at, target } => OptimizeError::DanglingJump {
                at,
                target: usize::try_from(target).unwrap_or(0),
            },
            other => OptimizeError::Format(other),
        }
    }
}
