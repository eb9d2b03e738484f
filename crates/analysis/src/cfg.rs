//! Basic blocks and the control-flow graph.
//!
//! Blocks are half-open instruction ranges that partition the program.
//! A new block starts at index 0, at every jump target, and after every
//! block-ending instruction (JMP, JSR, JZ, JNZ, RETN).

use std::collections::BTreeSet;
use std::ops::Range;

use ncs_common::{FormatError, Instruction};

/// A maximal straight-line run of instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Position in [`ControlFlowGraph::blocks`].
    pub index: usize,
    /// First instruction index.
    pub start: usize,
    /// One past the last instruction index.
    pub end: usize,
    pub successors: BTreeSet<usize>,
    pub predecessors: BTreeSet<usize>,
    pub is_entry: bool,
    pub is_exit: bool,
    /// The first instruction is the target of some jump.
    pub is_jump_target: bool,
}

impl BasicBlock {
    fn new(index: usize, start: usize, end: usize) -> Self {
        Self {
            index,
            start,
            end,
            successors: BTreeSet::new(),
            predecessors: BTreeSet::new(),
            is_entry: false,
            is_exit: false,
            is_jump_target: false,
        }
    }

    /// Instruction index range covered by this block.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Index of the terminating instruction.
    pub fn last(&self) -> usize {
        self.end - 1
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, instr: usize) -> bool {
        self.range().contains(&instr)
    }
}

/// Control-flow graph over a single instruction sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFlowGraph {
    pub blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// Split `instrs` into basic blocks and connect them.
    ///
    /// Fails if any jump targets an index outside the sequence or a
    /// jump-family instruction has no target. An empty sequence yields an
    /// empty graph.
    pub fn build(instrs: &[Instruction]) -> Result<Self, FormatError> {
        if instrs.is_empty() {
            return Ok(Self::default());
        }

        let jumped = collect_targets(instrs)?;
        let is_leader = |idx: usize| idx == 0 || jumped.contains(&idx);

        let mut blocks = Vec::new();
        let mut start = 0;
        for idx in 1..instrs.len() {
            if is_leader(idx) || instrs[idx - 1].is_control_flow() {
                blocks.push(BasicBlock::new(blocks.len(), start, idx));
                start = idx;
            }
        }
        blocks.push(BasicBlock::new(blocks.len(), start, instrs.len()));

        let mut cfg = Self { blocks };
        let count = cfg.blocks.len();
        for b in 0..count {
            let start = cfg.blocks[b].start;
            cfg.blocks[b].is_jump_target = jumped.contains(&start);
            let last = &instrs[cfg.blocks[b].last()];
            let falls_through = last.byte_code.is_conditional_jump() || !last.is_control_flow();
            if falls_through && b + 1 < count {
                cfg.add_edge(b, b + 1);
            }
            if let Some(target) = last.jump {
                if let Some(tb) = cfg.block_of(target) {
                    cfg.add_edge(b, tb);
                }
            }
        }
        cfg.blocks[0].is_entry = true;
        cfg.blocks[count - 1].is_exit = true;

        log::debug!(
            "built {} blocks from {} instructions",
            count,
            instrs.len()
        );
        Ok(cfg)
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        self.blocks[from].successors.insert(to);
        self.blocks[to].predecessors.insert(from);
    }

    /// Index of the block containing instruction `instr`.
    pub fn block_of(&self, instr: usize) -> Option<usize> {
        self.blocks.iter().position(|b| b.contains(instr))
    }

    /// Index of the block starting exactly at instruction `instr`.
    pub fn block_starting_at(&self, instr: usize) -> Option<usize> {
        self.blocks.iter().position(|b| b.start == instr)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All edges as `(from, to)` block pairs, in block order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| b.successors.iter().map(move |&s| (b.index, s)))
    }
}

fn collect_targets(instrs: &[Instruction]) -> Result<BTreeSet<usize>, FormatError> {
    let mut targets = BTreeSet::new();
    for (at, instr) in instrs.iter().enumerate() {
        match instr.jump {
            Some(target) if target >= instrs.len() => {
                return Err(FormatError::JumpOutOfRange {
                    at,
                    target: target as i64,
                });
            }
            Some(target) => {
                targets.insert(target);
            }
            None if instr.byte_code.is_jump() => {
                return Err(FormatError::MissingJumpTarget { at });
            }
            None => {}
        }
    }
    Ok(targets)
}
