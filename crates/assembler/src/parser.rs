//! Parser for listing tokens into instructions.
//!
//! The mnemonic fixes the `(ByteCode, Qualifier)` pair, which in turn
//! fixes the operand shape. Jump-family opcodes take one `@<index>` target
//! after their operands.

use std::sync::OnceLock;

use ncs_common::instruction::{mnemonic_of, operand_types};
use ncs_common::opcode::ALL_BYTE_CODES;
use ncs_common::{ByteCode, Instruction, Operand, OperandType, Qualifier};

use crate::error::AsmError;
use crate::lexer::Token;

/// Every valid logical opcode with its mnemonic.
fn mnemonic_table() -> &'static [(String, ByteCode, Qualifier)] {
    static TABLE: OnceLock<Vec<(String, ByteCode, Qualifier)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        ALL_BYTE_CODES
            .iter()
            .flat_map(|&code| {
                code.qualifiers()
                    .iter()
                    .map(move |&q| (mnemonic_of(code, q), code, q))
            })
            .collect()
    })
}

fn lookup_mnemonic(mnemonic: &str) -> Option<(ByteCode, Qualifier)> {
    mnemonic_table()
        .iter()
        .find(|(m, _, _)| m == mnemonic)
        .map(|&(_, code, q)| (code, q))
}

/// Parse the tokens of one line.
///
/// Returns `Ok(None)` for blank lines. An `<index>:` prefix is accepted
/// and ignored.
pub(crate) fn parse_line(tokens: &[Token], line: usize) -> Result<Option<Instruction>, AsmError> {
    let tokens = match tokens.first() {
        Some(Token::Label(_)) => &tokens[1..],
        _ => tokens,
    };
    let Some(first) = tokens.first() else {
        return Ok(None);
    };

    let mnemonic = match first {
        Token::Word(w) => w.to_uppercase(),
        other => {
            return Err(AsmError::UnexpectedToken {
                line,
                token: other.text(),
            })
        }
    };
    let (byte_code, qualifier) =
        lookup_mnemonic(&mnemonic).ok_or_else(|| AsmError::UnknownOpcode {
            line,
            token: mnemonic.clone(),
        })?;

    let shape = operand_types(byte_code, qualifier);
    let args = &tokens[1..];
    let mut operands = Vec::with_capacity(shape.len());
    for (idx, &ty) in shape.iter().enumerate() {
        let token = args.get(idx).ok_or_else(|| AsmError::MissingArgument {
            line,
            opcode: mnemonic.clone(),
            expected: shape.len(),
        })?;
        operands.push(parse_operand(token, ty, line)?);
    }

    let mut instr = Instruction::new(byte_code, qualifier, operands);
    let mut rest = &args[shape.len()..];
    if byte_code.is_jump() {
        match rest.first() {
            Some(Token::Target(target)) => {
                instr.jump = Some(*target);
                rest = &rest[1..];
            }
            _ => {
                return Err(AsmError::MissingTarget {
                    line,
                    opcode: mnemonic,
                })
            }
        }
    }
    expect_end(rest, line)?;
    Ok(Some(instr))
}

fn parse_operand(token: &Token, ty: OperandType, line: usize) -> Result<Operand, AsmError> {
    let word = match (token, ty) {
        (Token::Str(s), OperandType::Str) => return Ok(Operand::Str(s.clone())),
        (Token::Word(w), ty) if ty != OperandType::Str => w,
        (other, _) => {
            return Err(AsmError::UnexpectedToken {
                line,
                token: other.text(),
            })
        }
    };
    let invalid = || AsmError::InvalidNumber {
        line,
        token: word.clone(),
    };

    if ty == OperandType::F32 {
        return word.parse::<f32>().map(Operand::F32).map_err(|_| invalid());
    }
    let value = parse_int(word).ok_or_else(invalid)?;
    let operand = match ty {
        OperandType::I32 => i32::try_from(value).ok().map(Operand::I32),
        OperandType::U32 => u32::try_from(value).ok().map(Operand::U32),
        OperandType::I16 => i16::try_from(value).ok().map(Operand::I16),
        OperandType::U16 => u16::try_from(value).ok().map(Operand::U16),
        OperandType::U8 => u8::try_from(value).ok().map(Operand::U8),
        OperandType::F32 | OperandType::Str => None,
    };
    operand.ok_or_else(invalid)
}

/// Decimal or `0x` hex, optionally negative.
fn parse_int(word: &str) -> Option<i64> {
    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Check that there are no extra tokens.
fn expect_end(remaining: &[Token], line: usize) -> Result<(), AsmError> {
    match remaining.first() {
        Some(tok) => Err(AsmError::UnexpectedToken {
            line,
            token: tok.text(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_line;

    fn parse(text: &str) -> Result<Option<Instruction>, AsmError> {
        parse_line(&tokenize_line(text, 1)?, 1)
    }

    #[test]
    fn blank_line() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("3:").unwrap(), None);
    }

    #[test]
    fn mnemonics_are_unique() {
        let table = mnemonic_table();
        for (i, (m, _, _)) in table.iter().enumerate() {
            assert!(
                table[i + 1..].iter().all(|(other, _, _)| other != m),
                "duplicate mnemonic {m}"
            );
        }
    }

    #[test]
    fn typed_opcodes() {
        assert_eq!(parse("ADDII").unwrap(), Some(Instruction::int_op(ByteCode::Add)));
        assert_eq!(
            parse("rsaddf").unwrap(),
            Some(Instruction::rsadd(Qualifier::Float))
        );
        assert_eq!(
            parse("DECISP -4").unwrap(),
            Some(Instruction::step(ByteCode::DecSp, -4))
        );
    }

    #[test]
    fn operands_by_shape() {
        assert_eq!(
            parse("CPDOWNSP -8 4").unwrap(),
            Some(Instruction::copy(ByteCode::CpDownSp, -8, 4))
        );
        assert_eq!(parse("ACTION 0x1e 2").unwrap(), Some(Instruction::action(30, 2)));
        assert_eq!(parse("CONSTF -1.5").unwrap(), Some(Instruction::const_float(-1.5)));
        assert_eq!(
            parse("CONSTS \"hi\"").unwrap(),
            Some(Instruction::const_string("hi"))
        );
        assert_eq!(
            parse("STORE_STATE 16 8").unwrap(),
            Some(Instruction::new(
                ByteCode::StoreState,
                Qualifier::Effect,
                vec![Operand::U32(16), Operand::U32(8)]
            ))
        );
        assert_eq!(
            parse("EQUALTT 12").unwrap(),
            Some(Instruction::new(
                ByteCode::Equal,
                Qualifier::StructStruct,
                vec![Operand::U16(12)]
            ))
        );
    }

    #[test]
    fn jump_target() {
        assert_eq!(
            parse("5: JZ @9").unwrap(),
            Some(Instruction::jump(ByteCode::Jz, 9))
        );
    }

    #[test]
    fn jump_without_target() {
        assert_eq!(
            parse("JMP").unwrap_err(),
            AsmError::MissingTarget {
                line: 1,
                opcode: "JMP".to_string()
            }
        );
    }

    #[test]
    fn missing_operand() {
        assert_eq!(
            parse("CPTOPSP -4").unwrap_err(),
            AsmError::MissingArgument {
                line: 1,
                opcode: "CPTOPSP".to_string(),
                expected: 2
            }
        );
    }

    #[test]
    fn operand_out_of_range() {
        assert_eq!(
            parse("ACTION 70000 0").unwrap_err(),
            AsmError::InvalidNumber {
                line: 1,
                token: "70000".to_string()
            }
        );
    }

    #[test]
    fn string_where_number_expected() {
        assert!(matches!(
            parse("MOVSP \"x\""),
            Err(AsmError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn extra_tokens() {
        assert_eq!(
            parse("RETN 1").unwrap_err(),
            AsmError::UnexpectedToken {
                line: 1,
                token: "1".to_string()
            }
        );
    }

    #[test]
    fn unknown_opcode() {
        assert_eq!(
            parse("FOOBAR").unwrap_err(),
            AsmError::UnknownOpcode {
                line: 1,
                token: "FOOBAR".to_string()
            }
        );
    }
}
