//! Instruction-level reachability.
//!
//! Walks real successors from index 0: JZ, JNZ and JSR continue at both
//! the target and the next instruction, JMP only at its target, RETN
//! nowhere, everything else at the next instruction.

use std::collections::VecDeque;

use ncs_common::{ByteCode, Instruction};

/// Successor indices of instruction `at`, in range only.
pub fn successors(instrs: &[Instruction], at: usize) -> impl Iterator<Item = usize> {
    let instr = &instrs[at];
    let next = Some(at + 1);
    let (first, second) = match instr.byte_code {
        ByteCode::Jz | ByteCode::Jnz | ByteCode::Jsr => (instr.jump, next),
        ByteCode::Jmp => (instr.jump, None),
        ByteCode::Retn => (None, None),
        _ => (next, None),
    };
    let len = instrs.len();
    first.into_iter().chain(second).filter(move |&i| i < len)
}

/// Reachability flag per instruction.
pub fn reachable(instrs: &[Instruction]) -> Vec<bool> {
    let mut seen = vec![false; instrs.len()];
    if instrs.is_empty() {
        return seen;
    }
    let mut queue = VecDeque::from([0usize]);
    seen[0] = true;
    while let Some(at) = queue.pop_front() {
        for next in successors(instrs, at) {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Indices of instructions that no path from index 0 reaches.
pub fn unreachable(instrs: &[Instruction]) -> Vec<usize> {
    reachable(instrs)
        .iter()
        .enumerate()
        .filter(|&(_, &ok)| !ok)
        .map(|(i, _)| i)
        .collect()
}
