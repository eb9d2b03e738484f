//! Integration tests for CFG construction and structure recovery on
//! compiler-shaped programs that have been through the binary codec.

use ncs_analysis::{analyze, reachability, StructureKind};
use ncs_common::{ByteCode, Instruction, Program, Qualifier};

fn through_codec(instrs: Vec<Instruction>) -> Program {
    let bytes = Program::new(instrs).encode().unwrap();
    Program::decode(&bytes).unwrap()
}

/// `void main() { int x = 1; if (x) { A(); } else { B(); } }`
fn if_else_program() -> Program {
    through_codec(vec![
        Instruction::jump(ByteCode::Jsr, 2),         // 0
        Instruction::retn(),                         // 1
        Instruction::rsadd(Qualifier::Int),          // 2  main
        Instruction::const_int(1),                   // 3
        Instruction::copy(ByteCode::CpDownSp, -8, 4), // 4
        Instruction::mov_sp(-4),                     // 5
        Instruction::copy(ByteCode::CpTopSp, -4, 4), // 6
        Instruction::jump(ByteCode::Jz, 10),         // 7
        Instruction::action(10, 0),                  // 8  A()
        Instruction::jump(ByteCode::Jmp, 11),        // 9
        Instruction::action(11, 0),                  // 10 B()
        Instruction::mov_sp(-4),                     // 11
        Instruction::retn(),                         // 12
    ])
}

#[test]
fn if_else_has_exactly_one_if() {
    let program = if_else_program();
    let analysis = analyze(&program).unwrap();
    let ifs: Vec<_> = analysis
        .structures
        .iter()
        .filter(|s| s.kind == StructureKind::If)
        .collect();
    assert_eq!(ifs.len(), 1, "{:?}", analysis.structures);

    let s = ifs[0];
    let body_instrs: Vec<usize> = s
        .body_blocks
        .iter()
        .flat_map(|&b| analysis.cfg.blocks[b].range())
        .collect();
    let else_instrs: Vec<usize> = s
        .else_blocks
        .iter()
        .flat_map(|&b| analysis.cfg.blocks[b].range())
        .collect();
    assert_eq!(body_instrs, vec![8, 9]);
    assert_eq!(else_instrs, vec![10]);
    assert_eq!(program.instructions[8].int_operand(0), Some(10));
    assert_eq!(program.instructions[10].int_operand(0), Some(11));
}

/// `void main() { int i = 0; while (i < 10) { i++; } }`
#[test]
fn while_loop_has_exactly_one_loop() {
    let program = through_codec(vec![
        Instruction::rsadd(Qualifier::Int),           // 0
        Instruction::const_int(0),                    // 1
        Instruction::copy(ByteCode::CpDownSp, -8, 4), // 2
        Instruction::mov_sp(-4),                      // 3
        Instruction::copy(ByteCode::CpTopSp, -4, 4),  // 4  header
        Instruction::const_int(10),                   // 5
        Instruction::int_op(ByteCode::Lt),            // 6
        Instruction::jump(ByteCode::Jz, 10),          // 7
        Instruction::step(ByteCode::IncSp, -4),       // 8  body
        Instruction::jump(ByteCode::Jmp, 4),          // 9  latch
        Instruction::mov_sp(-4),                      // 10
        Instruction::retn(),                          // 11
    ]);
    let analysis = analyze(&program).unwrap();
    assert_eq!(analysis.structures.len(), 1, "{:?}", analysis.structures);

    let s = &analysis.structures[0];
    assert_eq!(s.kind, StructureKind::Loop);
    let header = &analysis.cfg.blocks[s.start_block];
    assert_eq!(header.range(), 4..8);
    let latch = &analysis.cfg.blocks[s.end_block];
    assert_eq!(latch.last(), 9);
    assert_eq!(
        s.body_blocks,
        (s.start_block..=s.end_block).collect::<Vec<_>>()
    );
}

#[test]
fn dead_code_after_return_is_unreachable() {
    let program = through_codec(vec![
        Instruction::retn(),
        Instruction::const_int(1),
        Instruction::mov_sp(-4),
    ]);
    assert_eq!(reachability::unreachable(&program.instructions), vec![1, 2]);
}

#[test]
fn trampoline_call_edge() {
    let program = if_else_program();
    let analysis = analyze(&program).unwrap();
    assert_eq!(analysis.cfg.blocks[0].range(), 0..1);
    let main = analysis.cfg.block_starting_at(2).unwrap();
    assert!(analysis.cfg.blocks[0].successors.contains(&main));
    assert!(analysis.cfg.blocks[main].is_jump_target);
}
