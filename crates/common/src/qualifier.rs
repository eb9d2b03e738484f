//! Operand-type qualifiers, the second byte of every NCS instruction.

/// Selects the operand-type variant of a byte code.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    /// No type (control flow, ACTION, MOVSP, ...).
    None = 0x00,
    /// Raw stack bytes (CPDOWNSP, CPTOPSP, DESTRUCT, ...).
    Stack = 0x01,
    Int = 0x03,
    Float = 0x04,
    String = 0x05,
    Object = 0x06,
    Effect = 0x10,
    Event = 0x11,
    Location = 0x12,
    Talent = 0x13,
    IntInt = 0x20,
    FloatFloat = 0x21,
    ObjectObject = 0x22,
    StringString = 0x23,
    StructStruct = 0x24,
    IntFloat = 0x25,
    FloatInt = 0x26,
    EffectEffect = 0x30,
    EventEvent = 0x31,
    LocationLocation = 0x32,
    TalentTalent = 0x33,
    VectorVector = 0x3A,
    VectorFloat = 0x3B,
    FloatVector = 0x3C,
}

/// All valid qualifiers, in definition order.
pub const ALL_QUALIFIERS: [Qualifier; 24] = [
    Qualifier::None,
    Qualifier::Stack,
    Qualifier::Int,
    Qualifier::Float,
    Qualifier::String,
    Qualifier::Object,
    Qualifier::Effect,
    Qualifier::Event,
    Qualifier::Location,
    Qualifier::Talent,
    Qualifier::IntInt,
    Qualifier::FloatFloat,
    Qualifier::ObjectObject,
    Qualifier::StringString,
    Qualifier::StructStruct,
    Qualifier::IntFloat,
    Qualifier::FloatInt,
    Qualifier::EffectEffect,
    Qualifier::EventEvent,
    Qualifier::LocationLocation,
    Qualifier::TalentTalent,
    Qualifier::VectorVector,
    Qualifier::VectorFloat,
    Qualifier::FloatVector,
];

impl TryFrom<u8> for Qualifier {
    /// The rejected byte.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ALL_QUALIFIERS
            .iter()
            .find(|q| **q as u8 == value)
            .copied()
            .ok_or(value)
    }
}

impl Qualifier {
    /// Mnemonic suffix (`ADD` + `II` = `ADDII`). Empty for `None`/`Stack`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Qualifier::None | Qualifier::Stack => "",
            Qualifier::Int => "I",
            Qualifier::Float => "F",
            Qualifier::String => "S",
            Qualifier::Object => "O",
            Qualifier::Effect => "EFF",
            Qualifier::Event => "EVT",
            Qualifier::Location => "LOC",
            Qualifier::Talent => "TAL",
            Qualifier::IntInt => "II",
            Qualifier::FloatFloat => "FF",
            Qualifier::ObjectObject => "OO",
            Qualifier::StringString => "SS",
            Qualifier::StructStruct => "TT",
            Qualifier::IntFloat => "IF",
            Qualifier::FloatInt => "FI",
            Qualifier::EffectEffect => "EFFEFF",
            Qualifier::EventEvent => "EVTEVT",
            Qualifier::LocationLocation => "LOCLOC",
            Qualifier::TalentTalent => "TALTAL",
            Qualifier::VectorVector => "VV",
            Qualifier::VectorFloat => "VF",
            Qualifier::FloatVector => "FV",
        }
    }

    /// Source-language type name for single-type qualifiers.
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Qualifier::Int => Some("int"),
            Qualifier::Float => Some("float"),
            Qualifier::String => Some("string"),
            Qualifier::Object => Some("object"),
            Qualifier::Effect => Some("effect"),
            Qualifier::Event => Some("event"),
            Qualifier::Location => Some("location"),
            Qualifier::Talent => Some("talent"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_qualifiers() {
        for &q in &ALL_QUALIFIERS {
            assert_eq!(Qualifier::try_from(q as u8), Ok(q));
        }
    }

    #[test]
    fn gaps_are_rejected() {
        for byte in [0x02u8, 0x07, 0x0F, 0x14, 0x27, 0x34, 0x39, 0x3D, 0xFF] {
            assert_eq!(Qualifier::try_from(byte), Err(byte));
        }
    }

    #[test]
    fn suffixes_are_uppercase() {
        for q in &ALL_QUALIFIERS {
            let s = q.suffix();
            assert_eq!(s, s.to_uppercase());
        }
    }

    #[test]
    fn type_names() {
        assert_eq!(Qualifier::Int.type_name(), Some("int"));
        assert_eq!(Qualifier::Location.type_name(), Some("location"));
        assert_eq!(Qualifier::IntInt.type_name(), None);
    }
}
