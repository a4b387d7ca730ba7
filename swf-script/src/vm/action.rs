use std::convert::TryFrom;

use swf_core::{data, DataError};

use super::opcode::Opcode;

/// One decoded action record. Borrows its operand from the code buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action<'a> {
    pub code: u8,
    pub operand: Option<&'a [u8]>,
    /// bytes consumed, header included
    pub size: usize,
}

impl<'a> Action<'a> {
    /// Decode the record at `pc`. Does not move any program counter.
    pub fn decode(code: &'a [u8], pc: usize) -> Result<Action<'a>, DataError> {
        let mut off = pc;
        let op = data::read_u8(code, &mut off)?;
        if !Opcode::has_operand(op) {
            return Ok(Action {
                code: op,
                operand: None,
                size: 1,
            });
        }
        let len = data::read_u16(code, &mut off)? as usize;
        let operand = data::subview(code, off, len)?;
        Ok(Action {
            code: op,
            operand: Some(operand),
            size: 3 + len,
        })
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.code).ok()
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.code == Opcode::End as u8
    }

    /// Operand bytes, empty for single-byte actions.
    pub fn operand(&self) -> &'a [u8] {
        self.operand.unwrap_or(&[])
    }

    /// Signed branch offset of a Jump or If.
    pub fn branch_offset(&self) -> Result<i16, DataError> {
        let mut off = 0;
        data::read_i16(self.operand(), &mut off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_records() {
        let code = hex::decode("12990200fbff00").unwrap();
        let not = Action::decode(&code, 0).unwrap();
        assert_eq!(not.opcode(), Some(Opcode::Not));
        assert_eq!(not.size, 1);
        assert_eq!(not.operand, None);

        let jump = Action::decode(&code, 1).unwrap();
        assert_eq!(jump.opcode(), Some(Opcode::Jump));
        assert_eq!(jump.size, 5);
        assert_eq!(jump.branch_offset().unwrap(), -5);

        assert!(Action::decode(&code, 6).unwrap().is_end());
    }

    #[test]
    fn operand_past_end() {
        let code = hex::decode("96050000").unwrap();
        assert!(matches!(
            Action::decode(&code, 0),
            Err(DataError::Truncated { offset: 3, needed: 5, .. })
        ));
        assert!(Action::decode(&code, 4).is_err());
    }
}
