//! Program representation for NCS instruction streams.
//!
//! A program owns its instructions in order. Jumps are indices into the
//! same vector, so deleting instructions requires remapping every
//! surviving jump; [`Program::remove_where`] does that in one pass.

use crate::codec;
use crate::error::{CodecError, FormatError};
use crate::instruction::Instruction;

/// An NCS program: an ordered sequence of instructions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The instruction stream.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Create a new program from a vector of instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Encode to the NCS container format.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(self)
    }

    /// Decode an NCS container.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode(bytes)
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Check that every jump-family instruction has an in-range target.
    pub fn validate_jumps(&self) -> Result<(), FormatError> {
        for (at, instr) in self.instructions.iter().enumerate() {
            match instr.jump {
                Some(target) if target >= self.instructions.len() => {
                    return Err(FormatError::JumpOutOfRange {
                        at,
                        target: target as i64,
                    });
                }
                None if instr.byte_code.is_jump() => {
                    return Err(FormatError::MissingJumpTarget { at });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Indices of instructions whose jump targets `target`.
    pub fn jumps_to(&self, target: usize) -> impl Iterator<Item = usize> + '_ {
        self.instructions
            .iter()
            .enumerate()
            .filter(move |(_, instr)| instr.jump == Some(target))
            .map(|(idx, _)| idx)
    }

    /// Redirect every jump targeting `from` to `to`. Returns how many changed.
    pub fn retarget_jumps(&mut self, from: usize, to: usize) -> usize {
        let mut changed = 0;
        for instr in &mut self.instructions {
            if instr.jump == Some(from) {
                instr.jump = Some(to);
                changed += 1;
            }
        }
        changed
    }

    /// Delete every instruction for which `remove` returns true and remap
    /// the jumps of the survivors.
    ///
    /// Fails without modifying the program if a surviving instruction still
    /// jumps to a removed one. Returns the number of removed instructions.
    pub fn remove_where<F>(&mut self, mut remove: F) -> Result<usize, FormatError>
    where
        F: FnMut(usize, &Instruction) -> bool,
    {
        let doomed: Vec<bool> = self
            .instructions
            .iter()
            .enumerate()
            .map(|(idx, instr)| remove(idx, instr))
            .collect();

        let mut new_index = Vec::with_capacity(doomed.len());
        let mut next = 0usize;
        for &gone in &doomed {
            new_index.push(if gone { None } else { Some(next) });
            if !gone {
                next += 1;
            }
        }

        for (at, instr) in self.instructions.iter().enumerate() {
            if doomed[at] {
                continue;
            }
            if let Some(target) = instr.jump {
                match new_index.get(target) {
                    Some(Some(_)) => {}
                    _ => {
                        return Err(FormatError::JumpOutOfRange {
                            at,
                            target: target as i64,
                        })
                    }
                }
            }
        }

        let removed = doomed.iter().filter(|&&gone| gone).count();
        let old = std::mem::take(&mut self.instructions);
        self.instructions = old
            .into_iter()
            .zip(doomed)
            .filter(|(_, gone)| !gone)
            .map(|(mut instr, _)| {
                instr.jump = instr.jump.and_then(|t| new_index[t]);
                instr
            })
            .collect();
        Ok(removed)
    }
}
