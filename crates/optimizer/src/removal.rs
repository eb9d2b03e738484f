//! Passes that delete instructions with no effect.

use ncs_analysis::reachability;
use ncs_common::{ByteCode, Instruction, Program};

use crate::error::OptimizeError;
use crate::pass::{relink_and_remove, OptimizerPass};

/// Deletes NOP instructions.
#[derive(Debug, Default)]
pub struct RemoveNopPass {
    removed: usize,
}

impl RemoveNopPass {
    pub const NAME: &'static str = "remove-nop";
}

impl OptimizerPass for RemoveNopPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn optimize(&mut self, program: &mut Program) -> Result<(), OptimizeError> {
        self.removed = relink_and_remove(program, |i| i.byte_code == ByteCode::Nop)?;
        Ok(())
    }

    fn instructions_removed(&self) -> usize {
        self.removed
    }
}

/// Deletes `MOVSP 0`.
#[derive(Debug, Default)]
pub struct RemoveZeroMoveSpPass {
    removed: usize,
}

impl RemoveZeroMoveSpPass {
    pub const NAME: &'static str = "remove-zero-movsp";
}

fn is_zero_move(instr: &Instruction) -> bool {
    instr.byte_code == ByteCode::MovSp && instr.int_operand(0) == Some(0)
}

impl OptimizerPass for RemoveZeroMoveSpPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn optimize(&mut self, program: &mut Program) -> Result<(), OptimizeError> {
        self.removed = relink_and_remove(program, is_zero_move)?;
        Ok(())
    }

    fn instructions_removed(&self) -> usize {
        self.removed
    }
}

/// Deletes instructions no execution path from index 0 reaches.
#[derive(Debug, Default)]
pub struct RemoveUnreachablePass {
    removed: usize,
}

impl RemoveUnreachablePass {
    pub const NAME: &'static str = "remove-unreachable";
}

impl OptimizerPass for RemoveUnreachablePass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn optimize(&mut self, program: &mut Program) -> Result<(), OptimizeError> {
        let live = reachability::reachable(&program.instructions);
        self.removed = program.remove_where(|idx, _| !live[idx])?;
        Ok(())
    }

    fn instructions_removed(&self) -> usize {
        self.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_common::Qualifier;

    #[test]
    fn nops_removed_and_jumps_relinked() {
        let mut program = Program::new(vec![
            Instruction::const_int(0),
            Instruction::jump(ByteCode::Jz, 3),
            Instruction::nop(),
            Instruction::nop(),
            Instruction::action(1, 0),
            Instruction::retn(),
        ]);
        let mut pass = RemoveNopPass::default();
        pass.optimize(&mut program).unwrap();
        assert_eq!(pass.instructions_removed(), 2);
        assert_eq!(program.len(), 4);
        assert_eq!(program.instructions[1].jump, Some(2));
        assert_eq!(program.instructions[2], Instruction::action(1, 0));
    }

    #[test]
    fn zero_movsp_only() {
        let mut program = Program::new(vec![
            Instruction::rsadd(Qualifier::Int),
            Instruction::mov_sp(0),
            Instruction::mov_sp(-4),
            Instruction::retn(),
        ]);
        let mut pass = RemoveZeroMoveSpPass::default();
        pass.optimize(&mut program).unwrap();
        assert_eq!(pass.instructions_removed(), 1);
        assert_eq!(
            program.instructions,
            vec![
                Instruction::rsadd(Qualifier::Int),
                Instruction::mov_sp(-4),
                Instruction::retn(),
            ]
        );
    }

    #[test]
    fn unreachable_code_after_return() {
        let mut program = Program::new(vec![
            Instruction::jump(ByteCode::Jmp, 3),
            Instruction::const_int(9),
            Instruction::mov_sp(-4),
            Instruction::retn(),
        ]);
        let mut pass = RemoveUnreachablePass::default();
        pass.optimize(&mut program).unwrap();
        assert_eq!(pass.instructions_removed(), 2);
        assert_eq!(
            program.instructions,
            vec![Instruction::jump(ByteCode::Jmp, 1), Instruction::retn()]
        );
    }

    #[test]
    fn subroutine_and_continuation_are_live() {
        let mut program = Program::new(vec![
            Instruction::jump(ByteCode::Jsr, 2),
            Instruction::retn(),
            Instruction::retn(),
        ]);
        let mut pass = RemoveUnreachablePass::default();
        pass.optimize(&mut program).unwrap();
        assert_eq!(pass.instructions_removed(), 0);
    }

    #[test]
    fn counts_reset_per_run() {
        let mut program = Program::new(vec![Instruction::nop(), Instruction::retn()]);
        let mut pass = RemoveNopPass::default();
        pass.optimize(&mut program).unwrap();
        pass.optimize(&mut program).unwrap();
        assert_eq!(pass.instructions_removed(), 0);
    }
}
