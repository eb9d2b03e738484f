//! NCS optimizer: in-place passes over a [`Program`].
//!
//! # Usage
//!
//! ```
//! use ncs_common::{ByteCode, Instruction, Program};
//! use ncs_optimizer::optimize;
//!
//! let mut program = Program::new(vec![
//!     Instruction::jump(ByteCode::Jmp, 1),
//!     Instruction::nop(),
//!     Instruction::mov_sp(0),
//!     Instruction::retn(),
//!     Instruction::retn(),
//! ]);
//!
//! let report = optimize(&mut program, None).unwrap();
//! assert_eq!(report.total_removed(), 3);
//! assert_eq!(program.len(), 2);
//! ```
//!
//! # Passes
//!
//! 1. **remove-nop**: always first, exactly once
//! 2. **remove-zero-movsp**: `MOVSP 0`
//! 3. **remove-unreachable**: code no path from index 0 reaches
//! 4. **merge-adjacent-movsp**, **remove-jmp-to-adjacent**,
//!    **remove-unused-blocks**, **remove-unused-globals-in-stack**: not
//!    implemented yet

pub mod error;
pub mod pass;
pub mod pending;
pub mod removal;

pub use error::OptimizeError;
pub use pass::OptimizerPass;
pub use pending::{
    MergeAdjacentMoveSpPass, RemoveJmpToAdjacentPass, RemoveUnusedBlocksPass,
    RemoveUnusedGlobalsInStackPass,
};
pub use removal::{RemoveNopPass, RemoveUnreachablePass, RemoveZeroMoveSpPass};

use ncs_common::Program;

/// Every pass name [`pass_by_name`] accepts.
pub const PASS_NAMES: [&str; 7] = [
    RemoveNopPass::NAME,
    RemoveZeroMoveSpPass::NAME,
    RemoveUnreachablePass::NAME,
    MergeAdjacentMoveSpPass::NAME,
    RemoveJmpToAdjacentPass::NAME,
    RemoveUnusedBlocksPass::NAME,
    RemoveUnusedGlobalsInStackPass::NAME,
];

/// Look up a pass by its [`OptimizerPass::name`].
pub fn pass_by_name(name: &str) -> Option<Box<dyn OptimizerPass>> {
    let pass: Box<dyn OptimizerPass> = match name {
        RemoveNopPass::NAME => Box::new(RemoveNopPass::default()),
        RemoveZeroMoveSpPass::NAME => Box::new(RemoveZeroMoveSpPass::default()),
        RemoveUnreachablePass::NAME => Box::new(RemoveUnreachablePass::default()),
        MergeAdjacentMoveSpPass::NAME => Box::new(MergeAdjacentMoveSpPass),
        RemoveJmpToAdjacentPass::NAME => Box::new(RemoveJmpToAdjacentPass),
        RemoveUnusedBlocksPass::NAME => Box::new(RemoveUnusedBlocksPass),
        RemoveUnusedGlobalsInStackPass::NAME => Box::new(RemoveUnusedGlobalsInStackPass),
        _ => return None,
    };
    Some(pass)
}

/// Passes run after NOP removal when the caller supplies none.
pub fn default_passes() -> Vec<Box<dyn OptimizerPass>> {
    vec![
        Box::new(RemoveZeroMoveSpPass::default()),
        Box::new(RemoveUnreachablePass::default()),
    ]
}

/// Removed-instruction counts, in the order the passes ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    pub passes: Vec<(&'static str, usize)>,
}

impl OptimizeReport {
    pub fn total_removed(&self) -> usize {
        self.passes.iter().map(|(_, n)| n).sum()
    }
}

/// Run NOP removal, then `passes` (or [`default_passes`]) in order.
///
/// A NOP pass in `passes` is dropped. Stops at the first failing pass;
/// passes before it have already modified `program`.
pub fn optimize(
    program: &mut Program,
    passes: Option<Vec<Box<dyn OptimizerPass>>>,
) -> Result<OptimizeReport, OptimizeError> {
    let mut queue: Vec<Box<dyn OptimizerPass>> = vec![Box::new(RemoveNopPass::default())];
    queue.extend(
        passes
            .unwrap_or_else(default_passes)
            .into_iter()
            .filter(|p| p.name() != RemoveNopPass::NAME),
    );

    let mut report = OptimizeReport::default();
    for mut pass in queue {
        pass.optimize(program)?;
        log::debug!(
            "{}: removed {} instructions, {} left",
            pass.name(),
            pass.instructions_removed(),
            program.len()
        );
        report.passes.push((pass.name(), pass.instructions_removed()));
    }
    Ok(report)
}
