//! NCS analysis: control flow, structure recovery and expression trees.
//!
//! # Usage
//!
//! ```
//! use ncs_analysis::{analyze, StructureKind};
//! use ncs_common::{ByteCode, Instruction, Program};
//!
//! let program = Program::new(vec![
//!     Instruction::const_int(1),
//!     Instruction::jump(ByteCode::Jz, 3),
//!     Instruction::action(0, 0),
//!     Instruction::retn(),
//! ]);
//!
//! let analysis = analyze(&program).unwrap();
//! assert_eq!(analysis.cfg.len(), 3);
//! assert_eq!(analysis.structures[0].kind, StructureKind::If);
//! ```
//!
//! # Modules
//!
//! 1. **cfg**: basic blocks and edges
//! 2. **structure**: loops and if/else regions over block order
//! 3. **expr**: expression trees and precedence-aware rendering
//! 4. **reachability**: instruction-level reachability from index 0

pub mod cfg;
pub mod expr;
pub mod reachability;
pub mod structure;

pub use cfg::{BasicBlock, ControlFlowGraph};
pub use expr::{BinaryOp, Expression, Literal, UnaryOp};
pub use structure::{ControlStructure, StructureKind};

use ncs_common::{FormatError, Program};

/// Blocks and recovered structures of one program.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub cfg: ControlFlowGraph,
    pub structures: Vec<ControlStructure>,
}

/// Build the control-flow graph and recover structures.
pub fn analyze(program: &Program) -> Result<Analysis, FormatError> {
    let cfg = ControlFlowGraph::build(&program.instructions)?;
    let structures = structure::recover(&cfg, &program.instructions);
    Ok(Analysis { cfg, structures })
}

#[cfg(test)]
mod proptests {
    use super::*;
    use ncs_common::{ByteCode, Instruction, Qualifier};
    use proptest::prelude::*;

    /// A small instruction mix heavy on control flow.
    fn arb_program() -> impl Strategy<Value = Vec<Instruction>> {
        let kinds = prop_oneof![
            Just(ByteCode::Const),
            Just(ByteCode::Add),
            Just(ByteCode::MovSp),
            Just(ByteCode::Nop),
            Just(ByteCode::Jmp),
            Just(ByteCode::Jz),
            Just(ByteCode::Jnz),
            Just(ByteCode::Jsr),
            Just(ByteCode::Retn),
        ];
        prop::collection::vec((kinds, any::<usize>()), 1..60).prop_map(|items| {
            let len = items.len();
            items
                .into_iter()
                .map(|(code, target)| match code {
                    ByteCode::Const => Instruction::const_int(target as i32),
                    ByteCode::Add => Instruction::simple(ByteCode::Add, Qualifier::IntInt),
                    ByteCode::MovSp => Instruction::mov_sp(-4),
                    ByteCode::Nop => Instruction::nop(),
                    ByteCode::Retn => Instruction::retn(),
                    jump => Instruction::jump(jump, target % len),
                })
                .collect()
        })
    }

    proptest! {
        /// Blocks cover every index exactly once, in order.
        #[test]
        fn blocks_partition_the_program(instrs in arb_program()) {
            let cfg = ControlFlowGraph::build(&instrs).unwrap();
            let mut next = 0;
            for block in &cfg.blocks {
                prop_assert_eq!(block.start, next);
                prop_assert!(block.end > block.start);
                next = block.end;
            }
            prop_assert_eq!(next, instrs.len());
        }

        /// Exactly one entry (first) and one exit (last) block.
        #[test]
        fn single_entry_and_exit(instrs in arb_program()) {
            let cfg = ControlFlowGraph::build(&instrs).unwrap();
            let entries: Vec<_> = cfg.blocks.iter().filter(|b| b.is_entry).map(|b| b.index).collect();
            let exits: Vec<_> = cfg.blocks.iter().filter(|b| b.is_exit).map(|b| b.index).collect();
            prop_assert_eq!(entries, vec![0]);
            prop_assert_eq!(exits, vec![cfg.len() - 1]);
        }

        /// Predecessor sets mirror successor sets, and every jump target
        /// starts a block.
        #[test]
        fn edges_are_consistent(instrs in arb_program()) {
            let cfg = ControlFlowGraph::build(&instrs).unwrap();
            for (from, to) in cfg.edges() {
                prop_assert!(cfg.blocks[to].predecessors.contains(&from));
            }
            for instr in &instrs {
                if let Some(target) = instr.jump {
                    let b = cfg.block_starting_at(target);
                    prop_assert!(b.is_some());
                    prop_assert!(cfg.blocks[b.unwrap()].is_jump_target);
                }
            }
        }

        /// Recovered structures only name existing blocks.
        #[test]
        fn structures_stay_in_range(instrs in arb_program()) {
            let cfg = ControlFlowGraph::build(&instrs).unwrap();
            for s in structure::recover(&cfg, &instrs) {
                prop_assert!(s.start_block < cfg.len());
                prop_assert!(s.end_block < cfg.len());
                for b in s.body_blocks.iter().chain(&s.else_blocks) {
                    prop_assert!(*b < cfg.len());
                }
            }
        }
    }
}
