//! Heuristic recovery of loops and if/else regions.
//!
//! Detection works on block order, not dominance:
//!
//! - every edge `A -> B` with `B <= A` is a loop whose body is `[B, A]`;
//! - a block ending in JZ to block `T` is an `if`. When one of the blocks
//!   strictly between the JZ block and `T` ends in a JMP that lands past
//!   `T`, the JMP's landing block closes an `else` that starts at `T`.
//!
//! The result is a flat list. Nesting is left to the emitter.

use ncs_common::{ByteCode, Instruction};

use crate::cfg::ControlFlowGraph;
use crate::expr::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Loop,
    If,
}

/// A recovered region. Block fields index into the graph's block list.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlStructure {
    pub kind: StructureKind,
    /// Loop header, or the block ending in the `if` test.
    pub start_block: usize,
    /// Loop latch, or the first block after the whole `if`.
    pub end_block: usize,
    pub body_blocks: Vec<usize>,
    pub else_blocks: Vec<usize>,
    /// Filled in by the emitter once the test has been replayed.
    pub condition: Option<Expression>,
}

impl ControlStructure {
    /// Whether `block` is this structure's start or lies in one of its arms.
    pub fn owns(&self, block: usize) -> bool {
        self.start_block == block
            || self.body_blocks.contains(&block)
            || self.else_blocks.contains(&block)
    }

    pub fn has_else(&self) -> bool {
        !self.else_blocks.is_empty()
    }
}

/// Recover all loops, then all `if` regions.
pub fn recover(cfg: &ControlFlowGraph, instrs: &[Instruction]) -> Vec<ControlStructure> {
    let mut structures = find_loops(cfg, instrs);
    structures.extend(find_ifs(cfg, instrs));
    log::debug!(
        "recovered {} structures from {} blocks",
        structures.len(),
        cfg.len()
    );
    structures
}

/// One loop per back edge. Edges out of a JSR are calls, not loops.
pub fn find_loops(cfg: &ControlFlowGraph, instrs: &[Instruction]) -> Vec<ControlStructure> {
    cfg.edges()
        .filter(|&(from, to)| to <= from && terminator(cfg, instrs, from) != Some(ByteCode::Jsr))
        .map(|(latch, header)| ControlStructure {
            kind: StructureKind::Loop,
            start_block: header,
            end_block: latch,
            body_blocks: (header..=latch).collect(),
            else_blocks: Vec::new(),
            condition: None,
        })
        .collect()
}

/// `if` and `if`/`else` regions opened by a forward JZ.
pub fn find_ifs(cfg: &ControlFlowGraph, instrs: &[Instruction]) -> Vec<ControlStructure> {
    let mut found = Vec::new();
    for block in &cfg.blocks {
        let last = &instrs[block.last()];
        if last.byte_code != ByteCode::Jz {
            continue;
        }
        let Some(target_block) = last.jump.and_then(|t| cfg.block_of(t)) else {
            continue;
        };
        if target_block <= block.index {
            continue;
        }
        let target_start = cfg.blocks[target_block].start;

        let exit = (block.index + 1..target_block).find_map(|b| {
            let tail = &instrs[cfg.blocks[b].last()];
            match (tail.byte_code, tail.jump) {
                (ByteCode::Jmp, Some(t)) if t > target_start => {
                    cfg.block_of(t).map(|landing| (b, landing))
                }
                _ => None,
            }
        });

        match exit {
            Some((jmp_block, landing)) => found.push(ControlStructure {
                kind: StructureKind::If,
                start_block: block.index,
                end_block: landing,
                body_blocks: (block.index + 1..=jmp_block).collect(),
                else_blocks: (target_block..landing).collect(),
                condition: None,
            }),
            None if !jumps_backwards(cfg, instrs, target_block - 1) => {
                found.push(ControlStructure {
                    kind: StructureKind::If,
                    start_block: block.index,
                    end_block: target_block,
                    body_blocks: (block.index + 1..target_block).collect(),
                    else_blocks: Vec::new(),
                    condition: None,
                })
            }
            None => {}
        }
    }
    found
}

fn terminator(cfg: &ControlFlowGraph, instrs: &[Instruction], block: usize) -> Option<ByteCode> {
    cfg.blocks
        .get(block)
        .map(|b| instrs[b.last()].byte_code)
}

/// A block ending in a JMP to itself or an earlier block closes a loop.
fn jumps_backwards(cfg: &ControlFlowGraph, instrs: &[Instruction], block: usize) -> bool {
    let Some(b) = cfg.blocks.get(block) else {
        return false;
    };
    let tail = &instrs[b.last()];
    tail.byte_code == ByteCode::Jmp && tail.jump.is_some_and(|t| t < b.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_common::Qualifier;

    fn structures(instrs: &[Instruction]) -> Vec<ControlStructure> {
        let cfg = ControlFlowGraph::build(instrs).unwrap();
        recover(&cfg, instrs)
    }

    #[test]
    fn straight_line_has_no_structures() {
        let instrs = [Instruction::const_int(1), Instruction::mov_sp(-4), Instruction::retn()];
        assert!(structures(&instrs).is_empty());
    }

    #[test]
    fn if_else() {
        let instrs = [
            Instruction::const_int(1),            // 0  b0
            Instruction::jump(ByteCode::Jz, 4),   // 1
            Instruction::action(1, 0),            // 2  b1
            Instruction::jump(ByteCode::Jmp, 5),  // 3
            Instruction::action(2, 0),            // 4  b2
            Instruction::retn(),                  // 5  b3
        ];
        let found = structures(&instrs);
        assert_eq!(found.len(), 1);
        let s = &found[0];
        assert_eq!(s.kind, StructureKind::If);
        assert_eq!(s.start_block, 0);
        assert_eq!(s.body_blocks, vec![1]);
        assert_eq!(s.else_blocks, vec![2]);
        assert_eq!(s.end_block, 3);
        assert!(s.owns(2));
        assert!(!s.owns(3));
    }

    #[test]
    fn if_without_else() {
        let instrs = [
            Instruction::const_int(1),
            Instruction::jump(ByteCode::Jz, 4),
            Instruction::action(1, 0),
            Instruction::const_int(0),
            Instruction::retn(),
        ];
        let found = structures(&instrs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body_blocks, vec![1]);
        assert!(!found[0].has_else());
        assert_eq!(found[0].end_block, 2);
    }

    #[test]
    fn while_loop() {
        let instrs = [
            Instruction::rsadd(Qualifier::Int),               // 0  b0
            Instruction::copy(ByteCode::CpTopSp, -4, 4),      // 1  b1 header
            Instruction::const_int(10),                       // 2
            Instruction::int_op(ByteCode::Lt),                // 3
            Instruction::jump(ByteCode::Jz, 7),               // 4
            Instruction::step(ByteCode::IncSp, -4),           // 5  b2
            Instruction::jump(ByteCode::Jmp, 1),              // 6
            Instruction::mov_sp(-4),                          // 7  b3
            Instruction::retn(),                              // 8
        ];
        let found = structures(&instrs);
        assert_eq!(found.len(), 1, "{found:?}");
        let s = &found[0];
        assert_eq!(s.kind, StructureKind::Loop);
        assert_eq!(s.start_block, 1);
        assert_eq!(s.end_block, 2);
        assert_eq!(s.body_blocks, vec![1, 2]);
    }

    #[test]
    fn self_loop() {
        let instrs = [
            Instruction::const_int(1),
            Instruction::jump(ByteCode::Jnz, 0),
            Instruction::retn(),
        ];
        let found = structures(&instrs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body_blocks, vec![0]);
    }

    #[test]
    fn call_to_earlier_routine_is_not_a_loop() {
        let instrs = [
            Instruction::retn(),                  // 0  b0 sub
            Instruction::jump(ByteCode::Jsr, 0),  // 1  b1
            Instruction::retn(),                  // 2  b2
        ];
        assert!(structures(&instrs).is_empty());
    }
}
