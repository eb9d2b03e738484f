//! Passes that are named and wired into the runner but not written yet.
//! Each one fails with [`OptimizeError::NotImplemented`] and leaves the
//! program untouched.

use ncs_common::Program;

use crate::error::OptimizeError;
use crate::pass::OptimizerPass;

macro_rules! pending_pass {
    ($(#[$doc:meta])* $ty:ident, $name:literal) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $ty;

        impl $ty {
            pub const NAME: &'static str = $name;
        }

        impl OptimizerPass for $ty {
            fn name(&self) -> &'static str {
                Self::NAME
            }

            fn optimize(&mut self, _program: &mut Program) -> Result<(), OptimizeError> {
                Err(OptimizeError::NotImplemented { pass: Self::NAME })
            }

            fn instructions_removed(&self) -> usize {
                0
            }
        }
    };
}

pending_pass!(
    /// Fold consecutive MOVSPs into one.
    MergeAdjacentMoveSpPass,
    "merge-adjacent-movsp"
);
pending_pass!(
    /// Drop a JMP whose target is the next instruction.
    RemoveJmpToAdjacentPass,
    "remove-jmp-to-adjacent"
);
pending_pass!(
    /// Drop whole blocks without predecessors.
    RemoveUnusedBlocksPass,
    "remove-unused-blocks"
);
pending_pass!(
    /// Drop global slots that are never read.
    RemoveUnusedGlobalsInStackPass,
    "remove-unused-globals-in-stack"
);
