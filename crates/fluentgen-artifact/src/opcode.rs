//! Instruction set for synthesized member bodies
//!
//! Member bodies are short, straight-line sequences: accessors load or store a
//! backing field, fluent setters forward through an interface and return `this`,
//! constructors allocate and chain to a base constructor. There are no jumps.

/// Bytecode opcode enumeration
///
/// All opcodes are single-byte instructions. Some opcodes take an operand that
/// follows the opcode byte in the code stream.
///
/// Opcodes are organized into categories:
/// - 0x10-0x1F: Arguments
/// - 0xA0-0xAF: Calls and return
/// - 0xB0-0xBF: Object operations
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Arguments (0x10-0x1F) =====
    /// Load argument onto stack (operand: u16 index, 0 is `this` for instance methods)
    LoadArg = 0x10,
    /// Load argument 0 (optimized, no operand)
    LoadArg0 = 0x12,
    /// Load argument 1 (optimized, no operand)
    LoadArg1 = 0x13,

    // ===== Calls (0xA0-0xAF) =====
    /// Non-virtual call (operand: u32 member-ref index)
    Call = 0xA0,
    /// Virtual call dispatched on the receiver's runtime type (operand: u32 member-ref index)
    CallVirt = 0xA1,
    /// Return from the current method, with the top of stack if the method returns a value
    Return = 0xA2,

    // ===== Object Operations (0xB0-0xBF) =====
    /// Allocate an object and run the referenced constructor (operand: u32 member-ref index)
    NewObj = 0xB0,
    /// Pop object, push field value (operand: u32 member-ref index)
    LoadField = 0xB1,
    /// Pop value, pop object, store field (operand: u32 member-ref index)
    StoreField = 0xB2,
}

impl Opcode {
    /// Convert byte to opcode
    ///
    /// Returns None if the byte does not correspond to a valid opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x10 => Some(Self::LoadArg),
            0x12 => Some(Self::LoadArg0),
            0x13 => Some(Self::LoadArg1),

            0xA0 => Some(Self::Call),
            0xA1 => Some(Self::CallVirt),
            0xA2 => Some(Self::Return),

            0xB0 => Some(Self::NewObj),
            0xB1 => Some(Self::LoadField),
            0xB2 => Some(Self::StoreField),

            _ => None,
        }
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the human-readable name of the opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::LoadArg => "LOAD_ARG",
            Self::LoadArg0 => "LOAD_ARG_0",
            Self::LoadArg1 => "LOAD_ARG_1",
            Self::Call => "CALL",
            Self::CallVirt => "CALL_VIRT",
            Self::Return => "RETURN",
            Self::NewObj => "NEW_OBJ",
            Self::LoadField => "LOAD_FIELD",
            Self::StoreField => "STORE_FIELD",
        }
    }

    /// Size in bytes of the operand that follows this opcode
    pub fn operand_size(self) -> usize {
        match self {
            Self::LoadArg0 | Self::LoadArg1 | Self::Return => 0,
            Self::LoadArg => 2,
            Self::Call | Self::CallVirt | Self::NewObj | Self::LoadField | Self::StoreField => 4,
        }
    }

    /// Check if this opcode takes a member-ref operand
    pub fn references_member(self) -> bool {
        matches!(
            self,
            Self::Call | Self::CallVirt | Self::NewObj | Self::LoadField | Self::StoreField
        )
    }

    /// Check if this is a call instruction
    pub fn is_call(self) -> bool {
        matches!(self, Self::Call | Self::CallVirt | Self::NewObj)
    }

    /// Check if this opcode ends a method body
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Return)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let opcodes = [
            Opcode::LoadArg,
            Opcode::LoadArg0,
            Opcode::LoadArg1,
            Opcode::Call,
            Opcode::CallVirt,
            Opcode::Return,
            Opcode::NewObj,
            Opcode::LoadField,
            Opcode::StoreField,
        ];

        for opcode in &opcodes {
            let byte = opcode.to_u8();
            assert_eq!(Opcode::from_u8(byte), Some(*opcode), "Failed roundtrip for {:?}", opcode);
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_u8(0x00), None);
        assert_eq!(Opcode::from_u8(0x02), None);
        assert_eq!(Opcode::from_u8(0x11), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::CallVirt.name(), "CALL_VIRT");
        assert_eq!(Opcode::LoadArg0.name(), "LOAD_ARG_0");
        assert_eq!(Opcode::StoreField.name(), "STORE_FIELD");
    }

    #[test]
    fn test_operand_sizes() {
        assert_eq!(Opcode::Return.operand_size(), 0);
        assert_eq!(Opcode::LoadArg.operand_size(), 2);
        assert_eq!(Opcode::NewObj.operand_size(), 4);
        assert!(Opcode::LoadField.references_member());
        assert!(!Opcode::LoadArg1.references_member());
    }

    #[test]
    fn test_terminator_detection() {
        assert!(Opcode::Return.is_terminator());
        assert!(!Opcode::CallVirt.is_terminator());
        assert!(Opcode::NewObj.is_call());
        assert!(!Opcode::LoadField.is_call());
    }
}
