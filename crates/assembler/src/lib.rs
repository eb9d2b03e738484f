//! NCS assembler: listing text to program and back.
//!
//! The assembler is a mechanical 1:1 translation with no macros or labels.
//!
//! # Usage
//!
//! ```
//! use ncs_assembler::{assemble, disassemble};
//!
//! let text = "CONSTI 1\nJZ @3\nACTION 5 0\nRETN\n";
//! let program = assemble(text).unwrap();
//! assert_eq!(program.len(), 4);
//! assert_eq!(disassemble(&program), text);
//! ```
//!
//! # Listing format
//!
//! - one instruction per line: `MNEMONIC operand...`
//! - jump targets are instruction indices written `@<index>`
//! - strings are double-quoted with `\"`, `\\`, `\n`, `\t`, `\r` and
//!   `\xNN` escapes
//! - `;` starts a comment; an optional `<index>:` prefix is ignored
//!
//! # Roundtrip Guarantee
//!
//! `assemble(disassemble(program)) == program` holds for every program
//! whose jumps are in range and whose floats are not NaN. The assembler
//! also accepts non-canonical input (hex operands, lowercase mnemonics).

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use disassembler::{disassemble, disassemble_numbered};
pub use error::AsmError;

use lexer::tokenize_line;
use ncs_common::Program;
use parser::parse_line;

/// Assemble listing text into a program.
///
/// Returns the first error encountered. Jump targets are checked once the
/// whole listing has been read.
pub fn assemble(text: &str) -> Result<Program, AsmError> {
    let mut instructions = Vec::new();
    let mut lines = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(line, line_num)?;
        if let Some(instr) = parse_line(&tokens, line_num)? {
            instructions.push(instr);
            lines.push(line_num);
        }
    }

    for (instr, &line) in instructions.iter().zip(&lines) {
        if let Some(target) = instr.jump {
            if target >= instructions.len() {
                return Err(AsmError::TargetOutOfRange { line, target });
            }
        }
    }

    Ok(Program::new(instructions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_common::{ByteCode, Instruction, Qualifier};

    #[test]
    fn assemble_minimal() {
        let program = assemble("CONSTI 42\nRETN\n").unwrap();
        assert_eq!(
            program.instructions,
            vec![Instruction::const_int(42), Instruction::retn()]
        );
    }

    #[test]
    fn assemble_with_comments_blanks_and_prefixes() {
        let text = "\
; main
0: RSADDI        ; int x
1: CONSTI 0x10

2: CPDOWNSP -8 4
3: MOVSP -4
4: RETN
";
        let program = assemble(text).unwrap();
        assert_eq!(program.len(), 5);
        assert_eq!(program.instructions[1], Instruction::const_int(16));
    }

    #[test]
    fn roundtrip_disassemble_then_assemble() {
        let original = Program::new(vec![
            Instruction::jump(ByteCode::Jsr, 2),
            Instruction::retn(),
            Instruction::rsadd(Qualifier::String),
            Instruction::const_string("tab\there\u{ff}"),
            Instruction::const_float(-0.25),
            Instruction::const_object(1),
            Instruction::jump(ByteCode::Jmp, 0),
        ]);
        assert_eq!(assemble(&disassemble(&original)).unwrap(), original);
        assert_eq!(assemble(&disassemble_numbered(&original)).unwrap(), original);
    }

    #[test]
    fn target_past_end() {
        let err = assemble("JMP @0\nJMP @2\n").unwrap_err();
        assert_eq!(err, AsmError::TargetOutOfRange { line: 2, target: 2 });
    }

    #[test]
    fn error_reports_correct_line() {
        let err = assemble("RETN\n\nFOOBAR\n").unwrap_err();
        assert!(matches!(err, AsmError::UnknownOpcode { line: 3, .. }));
    }
}
