//! The pass interface and the relink-then-delete step shared by the
//! removal passes.

use std::collections::BTreeSet;

use ncs_common::{Instruction, Program};

use crate::error::OptimizeError;

/// One in-place transformation of a program.
pub trait OptimizerPass {
    /// Stable name, as accepted by [`crate::pass_by_name`].
    fn name(&self) -> &'static str;

    /// Run the pass. Every surviving jump is valid afterwards.
    fn optimize(&mut self, program: &mut Program) -> Result<(), OptimizeError>;

    /// Instructions deleted by the last run.
    fn instructions_removed(&self) -> usize;
}

/// Delete every instruction matching `doomed`.
///
/// Jumps into a doomed instruction are first moved to the next surviving
/// instruction after it. A doomed instruction with no survivor after it
/// stays when something still jumps to it.
pub(crate) fn relink_and_remove<F>(program: &mut Program, doomed: F) -> Result<usize, OptimizeError>
where
    F: Fn(&Instruction) -> bool,
{
    let len = program.len();
    let marked: Vec<bool> = program.instructions.iter().map(&doomed).collect();

    let mut next_kept = vec![None; len + 1];
    for idx in (0..len).rev() {
        next_kept[idx] = if marked[idx] {
            next_kept[idx + 1]
        } else {
            Some(idx)
        };
    }

    for instr in &mut program.instructions {
        if let Some(target) = instr.jump {
            if let Some(&Some(kept)) = next_kept.get(target) {
                instr.jump = Some(kept);
            }
        }
    }

    let targeted: BTreeSet<usize> = program.instructions.iter().filter_map(|i| i.jump).collect();
    let removed = program.remove_where(|idx, _| marked[idx] && !targeted.contains(&idx))?;
    Ok(removed)
}
