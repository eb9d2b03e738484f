//! Byte code definitions for the NCS instruction set.
//!
//! An NCS instruction starts with two bytes: the byte code selecting the
//! operation family and a [`Qualifier`] selecting the operand types. The
//! pair together is the logical opcode; [`ByteCode::accepts`] lists the
//! valid pairs.

use crate::qualifier::Qualifier;

/// Identifies the operation family of an instruction.
///
/// Byte `0x1C` (the obsolete STORE_STATEALL) has no variant: no encoder or
/// decoder exists for it.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ByteCode {
    // Stack copies and reservations
    /// Copy the top of stack down to an SP-relative slot.
    CpDownSp = 0x01,
    /// Reserve one stack slot of the qualifier's type.
    RsAdd = 0x02,
    /// Copy an SP-relative slot to the top of stack.
    CpTopSp = 0x03,
    /// Push a constant.
    Const = 0x04,
    /// Call an engine routine. Operands: routine id, argument count.
    Action = 0x05,

    // Logical and bitwise
    /// `&&`
    LogAnd = 0x06,
    /// `||`
    LogOr = 0x07,
    /// `|`
    IncOr = 0x08,
    /// `^`
    ExcOr = 0x09,
    /// `&`
    BoolAnd = 0x0A,

    // Comparison
    /// `==`
    Equal = 0x0B,
    /// `!=`
    NEqual = 0x0C,
    /// `>=`
    Geq = 0x0D,
    /// `>`
    Gt = 0x0E,
    /// `<`
    Lt = 0x0F,
    /// `<=`
    Leq = 0x10,

    // Shifts
    /// `<<`
    ShLeft = 0x11,
    /// `>>`
    ShRight = 0x12,
    /// `>>>`
    UShRight = 0x13,

    // Arithmetic
    /// `+`
    Add = 0x14,
    /// `-`
    Sub = 0x15,
    /// `*`
    Mul = 0x16,
    /// `/`
    Div = 0x17,
    /// `%`
    Mod = 0x18,
    /// Unary `-`
    Neg = 0x19,
    /// Unary `~`
    Comp = 0x1A,

    /// Adjust the stack pointer by a (non-positive) byte delta.
    MovSp = 0x1B,

    // Control flow
    /// Unconditional jump.
    Jmp = 0x1D,
    /// Jump to subroutine.
    Jsr = 0x1E,
    /// Pop; jump if zero.
    Jz = 0x1F,
    /// Return from subroutine.
    Retn = 0x20,

    /// Remove a range of bytes from the stack, keeping a sub-range.
    Destruct = 0x21,
    /// Unary `!`
    Not = 0x22,
    /// Decrement an SP-relative integer.
    DecSp = 0x23,
    /// Increment an SP-relative integer.
    IncSp = 0x24,
    /// Pop; jump if not zero.
    Jnz = 0x25,
    /// Copy the top of stack down to a BP-relative slot.
    CpDownBp = 0x26,
    /// Copy a BP-relative slot to the top of stack.
    CpTopBp = 0x27,
    /// Decrement a BP-relative integer.
    DecBp = 0x28,
    /// Increment a BP-relative integer.
    IncBp = 0x29,
    /// Save the base pointer (start of globals frame).
    SaveBp = 0x2A,
    /// Restore the base pointer.
    RestoreBp = 0x2B,
    /// Capture the stack for a deferred action.
    StoreState = 0x2C,
    /// No operation.
    Nop = 0x2D,
}

/// All valid byte codes, in definition order.
pub const ALL_BYTE_CODES: [ByteCode; 44] = [
    ByteCode::CpDownSp,
    ByteCode::RsAdd,
    ByteCode::CpTopSp,
    ByteCode::Const,
    ByteCode::Action,
    ByteCode::LogAnd,
    ByteCode::LogOr,
    ByteCode::IncOr,
    ByteCode::ExcOr,
    ByteCode::BoolAnd,
    ByteCode::Equal,
    ByteCode::NEqual,
    ByteCode::Geq,
    ByteCode::Gt,
    ByteCode::Lt,
    ByteCode::Leq,
    ByteCode::ShLeft,
    ByteCode::ShRight,
    ByteCode::UShRight,
    ByteCode::Add,
    ByteCode::Sub,
    ByteCode::Mul,
    ByteCode::Div,
    ByteCode::Mod,
    ByteCode::Neg,
    ByteCode::Comp,
    ByteCode::MovSp,
    ByteCode::Jmp,
    ByteCode::Jsr,
    ByteCode::Jz,
    ByteCode::Retn,
    ByteCode::Destruct,
    ByteCode::Not,
    ByteCode::DecSp,
    ByteCode::IncSp,
    ByteCode::Jnz,
    ByteCode::CpDownBp,
    ByteCode::CpTopBp,
    ByteCode::DecBp,
    ByteCode::IncBp,
    ByteCode::SaveBp,
    ByteCode::RestoreBp,
    ByteCode::StoreState,
    ByteCode::Nop,
];

impl TryFrom<u8> for ByteCode {
    /// The rejected byte.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ByteCode::CpDownSp),
            0x02 => Ok(ByteCode::RsAdd),
            0x03 => Ok(ByteCode::CpTopSp),
            0x04 => Ok(ByteCode::Const),
            0x05 => Ok(ByteCode::Action),
            0x06 => Ok(ByteCode::LogAnd),
            0x07 => Ok(ByteCode::LogOr),
            0x08 => Ok(ByteCode::IncOr),
            0x09 => Ok(ByteCode::ExcOr),
            0x0A => Ok(ByteCode::BoolAnd),
            0x0B => Ok(ByteCode::Equal),
            0x0C => Ok(ByteCode::NEqual),
            0x0D => Ok(ByteCode::Geq),
            0x0E => Ok(ByteCode::Gt),
            0x0F => Ok(ByteCode::Lt),
            0x10 => Ok(ByteCode::Leq),
            0x11 => Ok(ByteCode::ShLeft),
            0x12 => Ok(ByteCode::ShRight),
            0x13 => Ok(ByteCode::UShRight),
            0x14 => Ok(ByteCode::Add),
            0x15 => Ok(ByteCode::Sub),
            0x16 => Ok(ByteCode::Mul),
            0x17 => Ok(ByteCode::Div),
            0x18 => Ok(ByteCode::Mod),
            0x19 => Ok(ByteCode::Neg),
            0x1A => Ok(ByteCode::Comp),
            0x1B => Ok(ByteCode::MovSp),
            0x1D => Ok(ByteCode::Jmp),
            0x1E => Ok(ByteCode::Jsr),
            0x1F => Ok(ByteCode::Jz),
            0x20 => Ok(ByteCode::Retn),
            0x21 => Ok(ByteCode::Destruct),
            0x22 => Ok(ByteCode::Not),
            0x23 => Ok(ByteCode::DecSp),
            0x24 => Ok(ByteCode::IncSp),
            0x25 => Ok(ByteCode::Jnz),
            0x26 => Ok(ByteCode::CpDownBp),
            0x27 => Ok(ByteCode::CpTopBp),
            0x28 => Ok(ByteCode::DecBp),
            0x29 => Ok(ByteCode::IncBp),
            0x2A => Ok(ByteCode::SaveBp),
            0x2B => Ok(ByteCode::RestoreBp),
            0x2C => Ok(ByteCode::StoreState),
            0x2D => Ok(ByteCode::Nop),
            // 0x00, 0x1C (STORE_STATEALL) and 0x2E..=0xFF.
            _ => Err(value),
        }
    }
}

impl ByteCode {
    /// Returns the base mnemonic. Family members that embed their type in
    /// the middle of the name (`DECxSP`) keep a lowercase `x` placeholder.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ByteCode::CpDownSp => "CPDOWNSP",
            ByteCode::RsAdd => "RSADD",
            ByteCode::CpTopSp => "CPTOPSP",
            ByteCode::Const => "CONST",
            ByteCode::Action => "ACTION",
            ByteCode::LogAnd => "LOGAND",
            ByteCode::LogOr => "LOGOR",
            ByteCode::IncOr => "INCOR",
            ByteCode::ExcOr => "EXCOR",
            ByteCode::BoolAnd => "BOOLAND",
            ByteCode::Equal => "EQUAL",
            ByteCode::NEqual => "NEQUAL",
            ByteCode::Geq => "GEQ",
            ByteCode::Gt => "GT",
            ByteCode::Lt => "LT",
            ByteCode::Leq => "LEQ",
            ByteCode::ShLeft => "SHLEFT",
            ByteCode::ShRight => "SHRIGHT",
            ByteCode::UShRight => "USHRIGHT",
            ByteCode::Add => "ADD",
            ByteCode::Sub => "SUB",
            ByteCode::Mul => "MUL",
            ByteCode::Div => "DIV",
            ByteCode::Mod => "MOD",
            ByteCode::Neg => "NEG",
            ByteCode::Comp => "COMP",
            ByteCode::MovSp => "MOVSP",
            ByteCode::Jmp => "JMP",
            ByteCode::Jsr => "JSR",
            ByteCode::Jz => "JZ",
            ByteCode::Retn => "RETN",
            ByteCode::Destruct => "DESTRUCT",
            ByteCode::Not => "NOT",
            ByteCode::DecSp => "DECxSP",
            ByteCode::IncSp => "INCxSP",
            ByteCode::Jnz => "JNZ",
            ByteCode::CpDownBp => "CPDOWNBP",
            ByteCode::CpTopBp => "CPTOPBP",
            ByteCode::DecBp => "DECxBP",
            ByteCode::IncBp => "INCxBP",
            ByteCode::SaveBp => "SAVEBP",
            ByteCode::RestoreBp => "RESTOREBP",
            ByteCode::StoreState => "STORE_STATE",
            ByteCode::Nop => "NOP",
        }
    }

    /// Qualifiers that form a valid logical opcode with this byte code.
    pub fn qualifiers(&self) -> &'static [Qualifier] {
        use Qualifier as Q;
        match self {
            ByteCode::CpDownSp
            | ByteCode::CpTopSp
            | ByteCode::CpDownBp
            | ByteCode::CpTopBp
            | ByteCode::Destruct => &[Q::Stack],

            ByteCode::RsAdd => &[
                Q::Int,
                Q::Float,
                Q::String,
                Q::Object,
                Q::Effect,
                Q::Event,
                Q::Location,
                Q::Talent,
            ],
            ByteCode::Const => &[Q::Int, Q::Float, Q::String, Q::Object],

            ByteCode::Action
            | ByteCode::MovSp
            | ByteCode::Jmp
            | ByteCode::Jsr
            | ByteCode::Jz
            | ByteCode::Jnz
            | ByteCode::Retn
            | ByteCode::SaveBp
            | ByteCode::RestoreBp
            | ByteCode::Nop => &[Q::None],

            ByteCode::LogAnd
            | ByteCode::LogOr
            | ByteCode::IncOr
            | ByteCode::ExcOr
            | ByteCode::BoolAnd
            | ByteCode::ShLeft
            | ByteCode::ShRight
            | ByteCode::UShRight
            | ByteCode::Mod => &[Q::IntInt],

            ByteCode::Equal | ByteCode::NEqual => &[
                Q::IntInt,
                Q::FloatFloat,
                Q::ObjectObject,
                Q::StringString,
                Q::StructStruct,
                Q::EffectEffect,
                Q::EventEvent,
                Q::LocationLocation,
                Q::TalentTalent,
            ],
            ByteCode::Geq | ByteCode::Gt | ByteCode::Lt | ByteCode::Leq => {
                &[Q::IntInt, Q::FloatFloat]
            }

            ByteCode::Add => &[
                Q::IntInt,
                Q::IntFloat,
                Q::FloatInt,
                Q::FloatFloat,
                Q::StringString,
                Q::VectorVector,
            ],
            ByteCode::Sub => &[
                Q::IntInt,
                Q::IntFloat,
                Q::FloatInt,
                Q::FloatFloat,
                Q::VectorVector,
            ],
            ByteCode::Mul | ByteCode::Div => &[
                Q::IntInt,
                Q::IntFloat,
                Q::FloatInt,
                Q::FloatFloat,
                Q::VectorFloat,
                Q::FloatVector,
            ],
            ByteCode::Neg => &[Q::Int, Q::Float],
            ByteCode::Comp
            | ByteCode::Not
            | ByteCode::DecSp
            | ByteCode::IncSp
            | ByteCode::DecBp
            | ByteCode::IncBp => &[Q::Int],

            // STORE_STATE reuses 0x10 as its fixed qualifier byte.
            ByteCode::StoreState => &[Q::Effect],
        }
    }

    /// Whether `(self, qualifier)` is a valid logical opcode.
    pub fn accepts(&self, qualifier: Qualifier) -> bool {
        self.qualifiers().contains(&qualifier)
    }

    /// JMP, JSR, JZ, JNZ and RETN end a basic block.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            ByteCode::Jmp | ByteCode::Jsr | ByteCode::Jz | ByteCode::Jnz | ByteCode::Retn
        )
    }

    /// The jump family carries a resolved target instead of a literal.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            ByteCode::Jmp | ByteCode::Jsr | ByteCode::Jz | ByteCode::Jnz
        )
    }

    /// JZ and JNZ may fall through.
    pub fn is_conditional_jump(&self) -> bool {
        matches!(self, ByteCode::Jz | ByteCode::Jnz)
    }

    /// Two-operand arithmetic, comparison, logical, bitwise and shift ops.
    pub fn is_binary_op(&self) -> bool {
        matches!(
            self,
            ByteCode::LogAnd
                | ByteCode::LogOr
                | ByteCode::IncOr
                | ByteCode::ExcOr
                | ByteCode::BoolAnd
                | ByteCode::Equal
                | ByteCode::NEqual
                | ByteCode::Geq
                | ByteCode::Gt
                | ByteCode::Lt
                | ByteCode::Leq
                | ByteCode::ShLeft
                | ByteCode::ShRight
                | ByteCode::UShRight
                | ByteCode::Add
                | ByteCode::Sub
                | ByteCode::Mul
                | ByteCode::Div
                | ByteCode::Mod
        )
    }

    /// NEG, NOT and COMP.
    pub fn is_unary_op(&self) -> bool {
        matches!(self, ByteCode::Neg | ByteCode::Not | ByteCode::Comp)
    }
}
