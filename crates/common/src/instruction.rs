//! The NCS instruction model.
//!
//! An instruction is a logical opcode `(ByteCode, Qualifier)` with a typed
//! operand list whose shape is fixed by [`operand_types`]. Jump-family
//! instructions carry no literal operand; their target is the index of
//! another instruction in the same [`Program`](crate::Program).
//!
//! Encoded layout (big-endian):
//! ```text
//! Byte 0:    byte code
//! Byte 1:    qualifier
//! Bytes 2..: operands per the arity table (jumps: i32 relative offset)
//! ```

use std::fmt;

use crate::opcode::ByteCode;
use crate::qualifier::Qualifier;

/// Wire type of a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    I32,
    U32,
    I16,
    U16,
    U8,
    F32,
    /// u16 length prefix followed by that many bytes.
    Str,
}

impl OperandType {
    /// Encoded size in bytes. `None` for length-prefixed strings.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            OperandType::I32 | OperandType::U32 | OperandType::F32 => Some(4),
            OperandType::I16 | OperandType::U16 => Some(2),
            OperandType::U8 => Some(1),
            OperandType::Str => None,
        }
    }
}

/// A decoded operand value.
///
/// Strings hold one `char` per encoded byte (`U+0000..=U+00FF`) so that
/// arbitrary byte strings survive a decode/encode cycle unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    I32(i32),
    U32(u32),
    I16(i16),
    U16(u16),
    U8(u8),
    F32(f32),
    Str(String),
}

impl Operand {
    /// Wire type of this operand.
    pub fn operand_type(&self) -> OperandType {
        match self {
            Operand::I32(_) => OperandType::I32,
            Operand::U32(_) => OperandType::U32,
            Operand::I16(_) => OperandType::I16,
            Operand::U16(_) => OperandType::U16,
            Operand::U8(_) => OperandType::U8,
            Operand::F32(_) => OperandType::F32,
            Operand::Str(_) => OperandType::Str,
        }
    }

    /// Any integer operand, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Operand::I32(v) => Some(i64::from(*v)),
            Operand::U32(v) => Some(i64::from(*v)),
            Operand::I16(v) => Some(i64::from(*v)),
            Operand::U16(v) => Some(i64::from(*v)),
            Operand::U8(v) => Some(i64::from(*v)),
            Operand::F32(_) | Operand::Str(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Operand::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::I32(v) => write!(f, "{v}"),
            Operand::U32(v) => write!(f, "{v}"),
            Operand::I16(v) => write!(f, "{v}"),
            Operand::U16(v) => write!(f, "{v}"),
            Operand::U8(v) => write!(f, "{v}"),
            Operand::F32(v) => write!(f, "{v:?}"),
            Operand::Str(s) => write!(f, "\"{}\"", escape_string(s)),
        }
    }
}

/// Escape a string for double-quoted output.
///
/// `"`, `\`, newline, tab and carriage return get C escapes; other control
/// and non-ASCII characters become `\xNN`.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || (0x7F..=0xFF).contains(&(c as u32)) => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// Operand shape of a logical opcode. Jump targets are not listed.
pub fn operand_types(byte_code: ByteCode, qualifier: Qualifier) -> &'static [OperandType] {
    use OperandType as T;
    match byte_code {
        ByteCode::Const => match qualifier {
            Qualifier::Float => &[T::F32],
            Qualifier::String => &[T::Str],
            _ => &[T::I32],
        },
        ByteCode::CpDownSp | ByteCode::CpTopSp | ByteCode::CpDownBp | ByteCode::CpTopBp => {
            &[T::I32, T::U16]
        }
        ByteCode::Action => &[T::U16, T::U8],
        ByteCode::MovSp
        | ByteCode::IncSp
        | ByteCode::DecSp
        | ByteCode::IncBp
        | ByteCode::DecBp => &[T::I32],
        ByteCode::StoreState => &[T::U32, T::U32],
        ByteCode::Destruct => &[T::U16, T::I16, T::U16],
        ByteCode::Equal | ByteCode::NEqual if qualifier == Qualifier::StructStruct => &[T::U16],
        _ => &[],
    }
}

/// Full mnemonic of a logical opcode (`ADDII`, `RSADDI`, `DECISP`, `JMP`).
pub fn mnemonic_of(byte_code: ByteCode, qualifier: Qualifier) -> String {
    let base = byte_code.mnemonic();
    let suffix = qualifier.suffix();
    if byte_code == ByteCode::StoreState || suffix.is_empty() {
        base.to_string()
    } else if base.contains('x') {
        base.replacen('x', suffix, 1)
    } else {
        format!("{base}{suffix}")
    }
}

/// Operand stack effect in 4-byte slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEffect {
    pub pops: usize,
    pub pushes: usize,
}

impl StackEffect {
    pub const fn new(pops: usize, pushes: usize) -> Self {
        Self { pops, pushes }
    }
}

/// A single NCS instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Operation family.
    pub byte_code: ByteCode,
    /// Operand-type variant.
    pub qualifier: Qualifier,
    /// Operands, shaped per [`operand_types`].
    pub operands: Vec<Operand>,
    /// Target instruction index for the jump family.
    pub jump: Option<usize>,
}

impl Instruction {
    /// Create an instruction without a jump target.
    pub fn new(byte_code: ByteCode, qualifier: Qualifier, operands: Vec<Operand>) -> Self {
        Self {
            byte_code,
            qualifier,
            operands,
            jump: None,
        }
    }

    /// An instruction without operands.
    pub fn simple(byte_code: ByteCode, qualifier: Qualifier) -> Self {
        Self::new(byte_code, qualifier, Vec::new())
    }

    /// A jump-family instruction targeting instruction `target`.
    pub fn jump(byte_code: ByteCode, target: usize) -> Self {
        Self {
            jump: Some(target),
            ..Self::simple(byte_code, Qualifier::None)
        }
    }

    pub fn const_int(value: i32) -> Self {
        Self::new(ByteCode::Const, Qualifier::Int, vec![Operand::I32(value)])
    }

    pub fn const_float(value: f32) -> Self {
        Self::new(ByteCode::Const, Qualifier::Float, vec![Operand::F32(value)])
    }

    pub fn const_string(value: impl Into<String>) -> Self {
        Self::new(
            ByteCode::Const,
            Qualifier::String,
            vec![Operand::Str(value.into())],
        )
    }

    pub fn const_object(value: i32) -> Self {
        Self::new(ByteCode::Const, Qualifier::Object, vec![Operand::I32(value)])
    }

    pub fn action(routine: u16, arg_count: u8) -> Self {
        Self::new(
            ByteCode::Action,
            Qualifier::None,
            vec![Operand::U16(routine), Operand::U8(arg_count)],
        )
    }

    pub fn mov_sp(delta: i32) -> Self {
        Self::new(ByteCode::MovSp, Qualifier::None, vec![Operand::I32(delta)])
    }

    pub fn rsadd(qualifier: Qualifier) -> Self {
        Self::simple(ByteCode::RsAdd, qualifier)
    }

    /// CPDOWNSP, CPTOPSP, CPDOWNBP or CPTOPBP.
    pub fn copy(byte_code: ByteCode, offset: i32, size: u16) -> Self {
        Self::new(
            byte_code,
            Qualifier::Stack,
            vec![Operand::I32(offset), Operand::U16(size)],
        )
    }

    /// INCxSP, DECxSP, INCxBP or DECxBP on an integer slot.
    pub fn step(byte_code: ByteCode, offset: i32) -> Self {
        Self::new(byte_code, Qualifier::Int, vec![Operand::I32(offset)])
    }

    /// A binary operation on two ints.
    pub fn int_op(byte_code: ByteCode) -> Self {
        Self::simple(byte_code, Qualifier::IntInt)
    }

    pub fn retn() -> Self {
        Self::simple(ByteCode::Retn, Qualifier::None)
    }

    pub fn nop() -> Self {
        Self::simple(ByteCode::Nop, Qualifier::None)
    }

    /// Full mnemonic, e.g. `CONSTI`.
    pub fn mnemonic(&self) -> String {
        mnemonic_of(self.byte_code, self.qualifier)
    }

    pub fn is_control_flow(&self) -> bool {
        self.byte_code.is_control_flow()
    }

    /// Integer operand at `idx`, widened.
    pub fn int_operand(&self, idx: usize) -> Option<i64> {
        self.operands.get(idx).and_then(Operand::as_i64)
    }

    /// Whether the operand list matches the arity table for this pair.
    pub fn has_valid_operands(&self) -> bool {
        let expected = operand_types(self.byte_code, self.qualifier);
        self.operands.len() == expected.len()
            && self
                .operands
                .iter()
                .zip(expected)
                .all(|(op, ty)| op.operand_type() == *ty)
    }

    /// Encoded size in bytes, including the two opcode bytes.
    pub fn encoded_size(&self) -> usize {
        let operands: usize = self
            .operands
            .iter()
            .map(|op| match op {
                Operand::Str(s) => 2 + s.chars().count(),
                other => other.operand_type().fixed_size().unwrap_or(0),
            })
            .sum();
        let jump = if self.byte_code.is_jump() { 4 } else { 0 };
        2 + operands + jump
    }

    /// Operand stack effect in 4-byte slots.
    ///
    /// Binary operators count as 2→1 and unary as 1→1 regardless of operand
    /// width; the symbolic stack holds one expression per operand.
    pub fn stack_effect(&self) -> StackEffect {
        let slots = |idx: usize| (self.int_operand(idx).unwrap_or(0).unsigned_abs() / 4) as usize;
        match self.byte_code {
            ByteCode::Equal | ByteCode::NEqual if self.qualifier == Qualifier::StructStruct => {
                StackEffect::new(2 * slots(0), 1)
            }
            code if code.is_binary_op() => StackEffect::new(2, 1),
            code if code.is_unary_op() => StackEffect::new(1, 1),
            ByteCode::Action => StackEffect::new(slots_u8(self.int_operand(1)), 1),
            ByteCode::Const | ByteCode::RsAdd => StackEffect::new(0, 1),
            ByteCode::CpTopSp | ByteCode::CpTopBp => StackEffect::new(0, slots(1)),
            ByteCode::MovSp => StackEffect::new(slots(0), 0),
            ByteCode::Destruct => StackEffect::new(slots(0), slots(2)),
            ByteCode::Jz | ByteCode::Jnz => StackEffect::new(1, 0),
            _ => StackEffect::new(0, 0),
        }
    }
}

fn slots_u8(value: Option<i64>) -> usize {
    value.unwrap_or(0).max(0) as usize
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic())?;
        for op in &self.operands {
            write!(f, " {op}")?;
        }
        if let Some(target) = self.jump {
            write!(f, " @{target}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics() {
        assert_eq!(Instruction::int_op(ByteCode::Add).mnemonic(), "ADDII");
        assert_eq!(Instruction::rsadd(Qualifier::Int).mnemonic(), "RSADDI");
        assert_eq!(Instruction::const_string("a").mnemonic(), "CONSTS");
        assert_eq!(Instruction::step(ByteCode::DecSp, -4).mnemonic(), "DECISP");
        assert_eq!(Instruction::step(ByteCode::IncBp, -4).mnemonic(), "INCIBP");
        assert_eq!(Instruction::copy(ByteCode::CpDownSp, -8, 4).mnemonic(), "CPDOWNSP");
        assert_eq!(Instruction::jump(ByteCode::Jz, 3).mnemonic(), "JZ");
        assert_eq!(
            Instruction::simple(ByteCode::Not, Qualifier::Int).mnemonic(),
            "NOTI"
        );
        assert_eq!(
            Instruction::new(
                ByteCode::StoreState,
                Qualifier::Effect,
                vec![Operand::U32(8), Operand::U32(0)]
            )
            .mnemonic(),
            "STORE_STATE"
        );
        assert_eq!(
            Instruction::simple(ByteCode::Equal, Qualifier::EffectEffect).mnemonic(),
            "EQUALEFFEFF"
        );
    }

    #[test]
    fn encoded_sizes() {
        assert_eq!(Instruction::int_op(ByteCode::Add).encoded_size(), 2);
        assert_eq!(Instruction::const_int(5).encoded_size(), 6);
        assert_eq!(Instruction::const_string("abc").encoded_size(), 7);
        assert_eq!(Instruction::copy(ByteCode::CpTopSp, -4, 4).encoded_size(), 8);
        assert_eq!(Instruction::action(1, 2).encoded_size(), 5);
        assert_eq!(Instruction::jump(ByteCode::Jmp, 0).encoded_size(), 6);
        assert_eq!(Instruction::mov_sp(-4).encoded_size(), 6);
        assert_eq!(Instruction::retn().encoded_size(), 2);
    }

    #[test]
    fn operand_validation() {
        assert!(Instruction::const_int(1).has_valid_operands());
        assert!(Instruction::action(4, 1).has_valid_operands());
        let bad = Instruction::new(ByteCode::Const, Qualifier::Int, vec![Operand::F32(1.0)]);
        assert!(!bad.has_valid_operands());
        let missing = Instruction::simple(ByteCode::MovSp, Qualifier::None);
        assert!(!missing.has_valid_operands());
    }

    #[test]
    fn stack_effects() {
        assert_eq!(
            Instruction::int_op(ByteCode::Mul).stack_effect(),
            StackEffect::new(2, 1)
        );
        assert_eq!(
            Instruction::simple(ByteCode::Neg, Qualifier::Float).stack_effect(),
            StackEffect::new(1, 1)
        );
        assert_eq!(Instruction::action(7, 3).stack_effect(), StackEffect::new(3, 1));
        assert_eq!(Instruction::mov_sp(-8).stack_effect(), StackEffect::new(2, 0));
        assert_eq!(
            Instruction::copy(ByteCode::CpTopSp, -4, 12).stack_effect(),
            StackEffect::new(0, 3)
        );
        assert_eq!(
            Instruction::jump(ByteCode::Jz, 0).stack_effect(),
            StackEffect::new(1, 0)
        );
    }

    #[test]
    fn display_includes_operands_and_target() {
        assert_eq!(Instruction::copy(ByteCode::CpDownSp, -8, 4).to_string(), "CPDOWNSP -8 4");
        assert_eq!(Instruction::jump(ByteCode::Jmp, 12).to_string(), "JMP @12");
        assert_eq!(Instruction::const_float(2.0).to_string(), "CONSTF 2.0");
        assert_eq!(
            Instruction::const_string("a\"b\n").to_string(),
            "CONSTS \"a\\\"b\\n\""
        );
    }

    #[test]
    fn escape_non_ascii_bytes() {
        assert_eq!(escape_string("\u{e9}\u{1}"), "\\xe9\\x01");
    }
}
