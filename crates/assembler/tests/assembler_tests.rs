//! Integration tests for the NCS assembler.
//!
//! Tests cover:
//! - hand-written listings that go through the binary codec and analysis
//! - roundtrip properties (disassemble → assemble) over every opcode
//! - error cases with line numbers

use ncs_analysis::{analyze, StructureKind};
use ncs_assembler::{assemble, disassemble, disassemble_numbered, AsmError};
use ncs_common::instruction::operand_types;
use ncs_common::opcode::ALL_BYTE_CODES;
use ncs_common::{Instruction, Operand, OperandType, Program};
use proptest::prelude::*;

// ---- Listings ----

const IF_ELSE: &str = "\
; void main() { int x = 1; if (x) A(); else B(); }
 0: JSR @2
 1: RETN
 2: RSADDI
 3: CONSTI 1
 4: CPDOWNSP -8 4
 5: MOVSP -4
 6: CPTOPSP -4 4
 7: JZ @10
 8: ACTION 10 0
 9: JMP @11
10: ACTION 11 0
11: MOVSP -4
12: RETN
";

#[test]
fn listing_survives_the_codec() {
    let program = assemble(IF_ELSE).unwrap();
    let bytes = program.encode().unwrap();
    assert_eq!(Program::decode(&bytes).unwrap(), program);
    let expected: Vec<&str> = IF_ELSE.lines().skip(1).collect();
    let listing = disassemble_numbered(&program);
    assert_eq!(listing.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn listing_analyzes_as_if_else() {
    let program = assemble(IF_ELSE).unwrap();
    let analysis = analyze(&program).unwrap();
    let ifs: Vec<_> = analysis
        .structures
        .iter()
        .filter(|s| s.kind == StructureKind::If)
        .collect();
    assert_eq!(ifs.len(), 1);
    assert!(ifs[0].has_else());
}

#[test]
fn every_string_byte_roundtrips() {
    let all: String = (0u8..=255).map(char::from).collect();
    let program = Program::new(vec![Instruction::const_string(all)]);
    let text = disassemble(&program);
    assert!(text.is_ascii());
    assert_eq!(assemble(&text).unwrap(), program);
}

// ---- Errors ----

#[test]
fn error_lines_count_blank_and_comment_lines() {
    let err = assemble("; header\n\nRETN\nCPDOWNSP -8\n").unwrap_err();
    assert_eq!(
        err,
        AsmError::MissingArgument {
            line: 4,
            opcode: "CPDOWNSP".to_string(),
            expected: 2
        }
    );
}

#[test]
fn error_unterminated_string() {
    let err = assemble("CONSTS \"open\n").unwrap_err();
    assert_eq!(err, AsmError::UnterminatedString { line: 1 });
}

#[test]
fn error_jump_past_end() {
    let err = assemble("JZ @5\nRETN\n").unwrap_err();
    assert_eq!(err, AsmError::TargetOutOfRange { line: 1, target: 5 });
}

// ---- Roundtrip properties ----

fn arb_operand(ty: OperandType) -> BoxedStrategy<Operand> {
    match ty {
        OperandType::I32 => any::<i32>().prop_map(Operand::I32).boxed(),
        OperandType::U32 => any::<u32>().prop_map(Operand::U32).boxed(),
        OperandType::I16 => any::<i16>().prop_map(Operand::I16).boxed(),
        OperandType::U16 => any::<u16>().prop_map(Operand::U16).boxed(),
        OperandType::U8 => any::<u8>().prop_map(Operand::U8).boxed(),
        OperandType::F32 => prop_oneof![prop::num::f32::NORMAL, Just(0.0f32)]
            .prop_map(Operand::F32)
            .boxed(),
        OperandType::Str => prop::collection::vec(any::<u8>(), 0..24)
            .prop_map(|bytes| Operand::Str(bytes.into_iter().map(char::from).collect()))
            .boxed(),
    }
}

fn arb_program() -> impl Strategy<Value = Program> {
    let instruction = prop::sample::select(&ALL_BYTE_CODES[..])
        .prop_flat_map(|code| (Just(code), prop::sample::select(code.qualifiers())))
        .prop_flat_map(|(code, qualifier)| {
            let operands: Vec<_> = operand_types(code, qualifier)
                .iter()
                .map(|&ty| arb_operand(ty))
                .collect();
            (Just(code), Just(qualifier), operands)
        });
    prop::collection::vec((instruction, any::<usize>()), 1..40).prop_map(|items| {
        let len = items.len();
        Program::new(
            items
                .into_iter()
                .map(|((code, qualifier, operands), target)| {
                    let mut instr = Instruction::new(code, qualifier, operands);
                    if code.is_jump() {
                        instr.jump = Some(target % len);
                    }
                    instr
                })
                .collect(),
        )
    })
}

proptest! {
    #[test]
    fn disassemble_then_assemble(program in arb_program()) {
        prop_assert_eq!(assemble(&disassemble(&program)).unwrap(), program);
    }

    #[test]
    fn numbered_listing_reassembles(program in arb_program()) {
        let text = disassemble_numbered(&program);
        prop_assert_eq!(disassemble(&assemble(&text).unwrap()), disassemble(&program));
    }
}
