//! Error types for the NCS assembler.

use thiserror::Error;

/// Errors produced while assembling a listing. Lines are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// An unrecognized mnemonic was encountered.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// An opcode did not have enough operands.
    #[error("line {line}: {opcode} expects {expected} operand(s)")]
    MissingArgument {
        line: usize,
        opcode: String,
        expected: usize,
    },

    /// A jump-family opcode has no `@<index>` target.
    #[error("line {line}: {opcode} needs an @<index> target")]
    MissingTarget { line: usize, opcode: String },

    /// A jump target names an instruction past the end of the listing.
    #[error("line {line}: jump target @{target} is past the last instruction")]
    TargetOutOfRange { line: usize, target: usize },

    /// A numeric literal could not be parsed or is out of range.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    #[error("line {line}: invalid escape '\\{escape}'")]
    InvalidEscape { line: usize, escape: String },

    /// Strings hold one byte per character.
    #[error("line {line}: character {ch:?} does not fit in one byte")]
    WideChar { line: usize, ch: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_opcode() {
        let e = AsmError::UnknownOpcode {
            line: 3,
            token: "FOO".to_string(),
        };
        assert_eq!(e.to_string(), "line 3: unknown opcode 'FOO'");
    }

    #[test]
    fn error_display_missing_argument() {
        let e = AsmError::MissingArgument {
            line: 7,
            opcode: "CPDOWNSP".to_string(),
            expected: 2,
        };
        assert_eq!(e.to_string(), "line 7: CPDOWNSP expects 2 operand(s)");
    }

    #[test]
    fn error_display_missing_target() {
        let e = AsmError::MissingTarget {
            line: 2,
            opcode: "JZ".to_string(),
        };
        assert_eq!(e.to_string(), "line 2: JZ needs an @<index> target");
    }

    #[test]
    fn error_display_invalid_escape() {
        let e = AsmError::InvalidEscape {
            line: 1,
            escape: "q".to_string(),
        };
        assert_eq!(e.to_string(), "line 1: invalid escape '\\q'");
    }

    #[test]
    fn error_display_wide_char() {
        let e = AsmError::WideChar { line: 4, ch: '€' };
        assert_eq!(e.to_string(), "line 4: character '€' does not fit in one byte");
    }
}
