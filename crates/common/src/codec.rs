//! Binary reader and writer for the NCS container format.
//!
//! ```text
//! Bytes 0-3:   "NCS "
//! Bytes 4-7:   "V1.0"
//! Byte  8:     reserved (written as 0x42)
//! Bytes 9-12:  total file size (u32, big-endian)
//! Bytes 13..:  instruction stream (big-endian operands)
//! ```
//!
//! Jumps are encoded as a signed 32-bit offset relative to the start of
//! the jumping instruction.

use crate::error::{CodecError, FormatError, Location, UnsupportedInstructionError};
use crate::instruction::{operand_types, Instruction, Operand, OperandType};
use crate::opcode::ByteCode;
use crate::program::Program;
use crate::qualifier::Qualifier;

/// File magic.
pub const MAGIC: &[u8; 4] = b"NCS ";
/// Format version.
pub const VERSION: &[u8; 4] = b"V1.0";
/// Byte written into the reserved header slot.
pub const RESERVED_BYTE: u8 = 0x42;
/// Offset of the first instruction.
pub const HEADER_SIZE: usize = 13;

/// Size of a jump's opcode bytes plus its offset field.
const JUMP_SIZE: i64 = 6;

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: end - self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.array::<1>()?[0])
    }

    fn operand(&mut self, ty: OperandType) -> Result<Operand, FormatError> {
        Ok(match ty {
            OperandType::I32 => Operand::I32(i32::from_be_bytes(self.array()?)),
            OperandType::U32 => Operand::U32(u32::from_be_bytes(self.array()?)),
            OperandType::I16 => Operand::I16(i16::from_be_bytes(self.array()?)),
            OperandType::U16 => Operand::U16(u16::from_be_bytes(self.array()?)),
            OperandType::U8 => Operand::U8(self.u8()?),
            OperandType::F32 => Operand::F32(f32::from_be_bytes(self.array()?)),
            OperandType::Str => {
                let len = u16::from_be_bytes(self.array()?) as usize;
                let raw = self.take(len)?;
                Operand::Str(raw.iter().map(|&b| char::from(b)).collect())
            }
        })
    }
}

/// Decode an NCS file into a program.
///
/// Instructions are built first with their relative jump offsets recorded;
/// once the whole stream is read, every offset is resolved to the index of
/// the instruction starting at that byte.
pub fn decode(bytes: &[u8]) -> Result<Program, CodecError> {
    let mut reader = Reader { bytes, pos: 0 };

    let magic: [u8; 4] = reader.array()?;
    if &magic != MAGIC {
        return Err(FormatError::BadMagic(magic).into());
    }
    let version: [u8; 4] = reader.array()?;
    if &version != VERSION {
        return Err(FormatError::BadVersion(version).into());
    }
    let _reserved = reader.u8()?;
    let declared = u32::from_be_bytes(reader.array()?) as usize;
    if declared > bytes.len() || declared < HEADER_SIZE {
        return Err(FormatError::SizeMismatch {
            declared,
            actual: bytes.len(),
        }
        .into());
    }
    reader.bytes = &bytes[..declared];

    let mut instructions = Vec::new();
    let mut starts: Vec<usize> = Vec::new();
    let mut pending: Vec<(usize, i64)> = Vec::new();

    while reader.pos < reader.bytes.len() {
        let start = reader.pos;
        let raw_code = reader.u8()?;
        let raw_qualifier = reader.u8()?;
        let unsupported = |reason| UnsupportedInstructionError {
            byte_code: raw_code,
            qualifier: raw_qualifier,
            location: Location::Offset(start),
            reason,
        };

        let byte_code = ByteCode::try_from(raw_code).map_err(|_| unsupported("unknown byte code"))?;
        let qualifier =
            Qualifier::try_from(raw_qualifier).map_err(|_| unsupported("unknown qualifier"))?;
        if !byte_code.accepts(qualifier) {
            return Err(unsupported("qualifier not valid for byte code").into());
        }

        let operands = operand_types(byte_code, qualifier)
            .iter()
            .map(|&ty| reader.operand(ty))
            .collect::<Result<Vec<_>, _>>()?;

        if byte_code.is_jump() {
            let relative = i64::from(i32::from_be_bytes(reader.array()?));
            let target = relative + reader.pos as i64 - JUMP_SIZE;
            pending.push((instructions.len(), target));
        }

        starts.push(start);
        instructions.push(Instruction::new(byte_code, qualifier, operands));
    }

    for (at, target) in pending {
        let index = usize::try_from(target)
            .ok()
            .and_then(|offset| starts.binary_search(&offset).ok())
            .ok_or(FormatError::JumpOutOfRange { at, target })?;
        instructions[at].jump = Some(index);
    }

    log::debug!(
        "decoded {} instructions from {} bytes",
        instructions.len(),
        declared
    );
    Ok(Program::new(instructions))
}

/// Encode a program into an NCS file.
///
/// Sizes and start offsets of all instructions are computed first so that
/// forward jumps can be written in the same pass as everything else.
pub fn encode(program: &Program) -> Result<Vec<u8>, CodecError> {
    let mut starts = Vec::with_capacity(program.len());
    let mut pos = HEADER_SIZE;
    for (idx, instr) in program.instructions.iter().enumerate() {
        let unsupported = |reason| UnsupportedInstructionError {
            byte_code: instr.byte_code as u8,
            qualifier: instr.qualifier as u8,
            location: Location::Index(idx),
            reason,
        };
        if !instr.byte_code.accepts(instr.qualifier) {
            return Err(unsupported("qualifier not valid for byte code").into());
        }
        if !instr.has_valid_operands() {
            return Err(unsupported("operands do not match the opcode's shape").into());
        }
        starts.push(pos);
        pos += instr.encoded_size();
    }

    let mut out = Vec::with_capacity(pos);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(VERSION);
    out.push(RESERVED_BYTE);
    out.extend_from_slice(&(pos as u32).to_be_bytes());

    for (idx, instr) in program.instructions.iter().enumerate() {
        out.push(instr.byte_code as u8);
        out.push(instr.qualifier as u8);
        for op in &instr.operands {
            write_operand(&mut out, op, idx)?;
        }
        if instr.byte_code.is_jump() {
            let target = instr
                .jump
                .ok_or(FormatError::MissingJumpTarget { at: idx })?;
            let target_offset = *starts.get(target).ok_or(FormatError::JumpOutOfRange {
                at: idx,
                target: target as i64,
            })?;
            let relative = target_offset as i64 - starts[idx] as i64;
            out.extend_from_slice(&(relative as i32).to_be_bytes());
        }
    }

    debug_assert_eq!(out.len(), pos);
    Ok(out)
}

fn write_operand(out: &mut Vec<u8>, op: &Operand, at: usize) -> Result<(), FormatError> {
    match op {
        Operand::I32(v) => out.extend_from_slice(&v.to_be_bytes()),
        Operand::U32(v) => out.extend_from_slice(&v.to_be_bytes()),
        Operand::I16(v) => out.extend_from_slice(&v.to_be_bytes()),
        Operand::U16(v) => out.extend_from_slice(&v.to_be_bytes()),
        Operand::U8(v) => out.push(*v),
        Operand::F32(v) => out.extend_from_slice(&v.to_be_bytes()),
        Operand::Str(s) => {
            let len = s.chars().count();
            let len16 =
                u16::try_from(len).map_err(|_| FormatError::StringTooLong { at, len })?;
            out.extend_from_slice(&len16.to_be_bytes());
            for ch in s.chars() {
                let byte = u8::try_from(u32::from(ch))
                    .map_err(|_| FormatError::UnencodableChar { at, ch })?;
                out.push(byte);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(total: u32) -> Vec<u8> {
        let mut bytes = b"NCS V1.0".to_vec();
        bytes.push(0x42);
        bytes.extend_from_slice(&total.to_be_bytes());
        bytes
    }

    #[test]
    fn empty_program_is_header_only() {
        let bytes = encode(&Program::default()).unwrap();
        assert_eq!(bytes, header(13));
        assert_eq!(decode(&bytes).unwrap(), Program::default());
    }

    #[test]
    fn big_endian_operands() {
        let program = Program::new(vec![
            Instruction::const_int(0x0102_0304),
            Instruction::copy(ByteCode::CpDownSp, -8, 4),
        ]);
        let bytes = encode(&program).unwrap();
        assert_eq!(&bytes[13..19], &[0x04, 0x03, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            &bytes[19..27],
            &[0x01, 0x01, 0xFF, 0xFF, 0xFF, 0xF8, 0x00, 0x04]
        );
        assert_eq!(&bytes[9..13], &27u32.to_be_bytes());
    }

    #[test]
    fn jump_offsets_are_relative_to_instruction_start() {
        // 0: JMP @2 (13..19), 1: RETN (19..21), 2: RETN (21..23)
        let program = Program::new(vec![
            Instruction::jump(ByteCode::Jmp, 2),
            Instruction::retn(),
            Instruction::retn(),
        ]);
        let bytes = encode(&program).unwrap();
        assert_eq!(&bytes[13..19], &[0x1D, 0x00, 0, 0, 0, 8]);
        assert_eq!(decode(&bytes).unwrap(), program);
    }

    #[test]
    fn backward_jump_roundtrip() {
        let program = Program::new(vec![
            Instruction::const_int(1),
            Instruction::jump(ByteCode::Jz, 3),
            Instruction::jump(ByteCode::Jmp, 0),
            Instruction::retn(),
        ]);
        let bytes = encode(&program).unwrap();
        // JMP at offset 25 back to offset 13.
        assert_eq!(&bytes[25..31], &[0x1D, 0x00, 0xFF, 0xFF, 0xFF, 0xF4]);
        assert_eq!(decode(&bytes).unwrap(), program);
    }

    #[test]
    fn string_bytes_roundtrip() {
        let program = Program::new(vec![Instruction::const_string("caf\u{e9}\u{0}")]);
        let bytes = encode(&program).unwrap();
        assert_eq!(&bytes[15..17], &[0x00, 0x05]);
        assert_eq!(decode(&bytes).unwrap(), program);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = header(13);
        bytes[0] = b'X';
        assert_eq!(
            decode(&bytes),
            Err(CodecError::Format(FormatError::BadMagic(*b"XCS ")))
        );
    }

    #[test]
    fn rejects_bad_version() {
        let mut bytes = header(13);
        bytes[7] = b'1';
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::Format(FormatError::BadVersion(_)))
        ));
    }

    #[test]
    fn rejects_oversized_declared_length() {
        let bytes = header(40);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::Format(FormatError::SizeMismatch {
                declared: 40,
                actual: 13
            }))
        );
    }

    #[test]
    fn rejects_truncated_operand() {
        let mut bytes = header(16);
        bytes.extend_from_slice(&[0x04, 0x03, 0x00]);
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::Format(FormatError::Truncated { .. }))
        ));
    }

    #[test]
    fn rejects_store_state_all() {
        let mut bytes = header(15);
        bytes.extend_from_slice(&[0x1C, 0x08]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Unsupported(UnsupportedInstructionError {
                byte_code: 0x1C,
                location: Location::Offset(13),
                ..
            })
        ));
    }

    #[test]
    fn rejects_invalid_pair() {
        let mut bytes = header(15);
        bytes.extend_from_slice(&[0x14, 0x03]); // ADD with a single-int qualifier
        assert!(matches!(decode(&bytes), Err(CodecError::Unsupported(_))));
    }

    #[test]
    fn rejects_jump_into_the_middle_of_an_instruction() {
        let mut bytes = header(19);
        bytes.extend_from_slice(&[0x1D, 0x00, 0, 0, 0, 3]);
        assert_eq!(
            decode(&bytes),
            Err(CodecError::Format(FormatError::JumpOutOfRange {
                at: 0,
                target: 16
            }))
        );
    }

    #[test]
    fn writer_rejects_mismatched_operands() {
        let program = Program::new(vec![Instruction::simple(ByteCode::Action, Qualifier::None)]);
        assert!(matches!(
            encode(&program),
            Err(CodecError::Unsupported(UnsupportedInstructionError {
                location: Location::Index(0),
                ..
            }))
        ));
    }

    #[test]
    fn writer_rejects_missing_target() {
        let program = Program::new(vec![Instruction::simple(ByteCode::Jmp, Qualifier::None)]);
        assert_eq!(
            encode(&program),
            Err(CodecError::Format(FormatError::MissingJumpTarget { at: 0 }))
        );
    }

    #[test]
    fn writer_rejects_wide_chars() {
        let program = Program::new(vec![Instruction::const_string("\u{263a}")]);
        assert!(matches!(
            encode(&program),
            Err(CodecError::Format(FormatError::UnencodableChar { at: 0, .. }))
        ));
    }

    #[test]
    fn trailing_bytes_past_declared_size_are_ignored() {
        let mut bytes = encode(&Program::new(vec![Instruction::retn()])).unwrap();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode(&bytes).unwrap().len(), 1);
    }
}
