use std::convert::TryFrom;
use std::fmt;

/// Action codes the unpacker knows about.
///
/// Codes from 0x80 up carry a u16 length and an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Opcode {
    End = 0x00,
    Add = 0x0A,
    Subtract = 0x0B,
    Multiply = 0x0C,
    Equals = 0x0E,
    Not = 0x12,
    GetVariable = 0x1C,
    SetVariable = 0x1D,
    DefineLocal = 0x3C,
    CallFunction = 0x3D,
    Return = 0x3E,
    Modulo = 0x3F,
    Add2 = 0x47,
    ConstantPool = 0x88,
    WaitForFrame = 0x8A,
    WaitForFrame2 = 0x8D,
    DefineFunction2 = 0x8E,
    With = 0x94,
    Push = 0x96,
    Jump = 0x99,
    DefineFunction = 0x9B,
    If = 0x9D,
}

impl Opcode {
    pub const ALL: [Opcode; 22] = [
        Opcode::End,
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Multiply,
        Opcode::Equals,
        Opcode::Not,
        Opcode::GetVariable,
        Opcode::SetVariable,
        Opcode::DefineLocal,
        Opcode::CallFunction,
        Opcode::Return,
        Opcode::Modulo,
        Opcode::Add2,
        Opcode::ConstantPool,
        Opcode::WaitForFrame,
        Opcode::WaitForFrame2,
        Opcode::DefineFunction2,
        Opcode::With,
        Opcode::Push,
        Opcode::Jump,
        Opcode::DefineFunction,
        Opcode::If,
    ];

    #[inline]
    pub fn has_operand(code: u8) -> bool {
        code >= 0x80
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| *op as u8 == v)
            .ok_or(v)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op as u8), Ok(op));
        }
        assert_eq!(Opcode::try_from(0x9Fu8), Err(0x9F));
        assert_eq!(Opcode::try_from(0x47u8), Ok(Opcode::Add2));
    }
}
