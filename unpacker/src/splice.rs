//! Byte-range replacement that keeps relative branches pointing at the same
//! instructions.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use swf_core::DataError;
use swf_script::{Action, Opcode};

#[derive(thiserror::Error, Debug)]
pub enum SpliceError {
    #[error("splice range 0x{start:X}+{size} exceeds code of {len} bytes")]
    Range { start: usize, size: usize, len: usize },

    #[error("malformed action while repairing offsets: {0}")]
    Data(#[from] DataError),

    #[error("{opcode} at 0x{pc:X}: repaired offset {value} does not fit its field")]
    OffsetOverflow { opcode: Opcode, pc: usize, value: i64 },
}

/// Where a relative field lives inside an action and how wide it is.
enum Field {
    Branch(usize),
    U16(usize),
    U8(usize),
}

fn field_of(action: &Action<'_>, pc: usize) -> Result<Option<(Opcode, Field)>, DataError> {
    let Some(op) = action.opcode() else {
        return Ok(None);
    };
    let operand = pc + 3;
    let len = action.operand().len();
    let short = |need: usize| DataError::Truncated {
        offset: operand,
        needed: need,
        available: len,
    };
    let field = match op {
        Opcode::Jump | Opcode::If => {
            if len < 2 {
                return Err(short(2));
            }
            Field::Branch(operand)
        }
        Opcode::DefineFunction | Opcode::DefineFunction2 | Opcode::With => {
            if len < 2 {
                return Err(short(2));
            }
            Field::U16(operand + len - 2)
        }
        Opcode::WaitForFrame | Opcode::WaitForFrame2 => {
            if len < 1 {
                return Err(short(1));
            }
            Field::U8(operand + len - 1)
        }
        _ => return Ok(None),
    };
    Ok(Some((op, field)))
}

fn overflow(opcode: Opcode, pc: usize, value: i64) -> SpliceError {
    SpliceError::OffsetOverflow { opcode, pc, value }
}

/// Shift every field in `buf` whose target passes the test by `amount`.
///
/// `branch_only` limits the pass to Jump and If, which is all the suffix needs.
fn repair(
    buf: &mut [u8],
    amount: i64,
    branch_only: bool,
    crosses: impl Fn(i64) -> bool,
) -> Result<(), SpliceError> {
    let mut pc = 0;
    while pc < buf.len() {
        let action = Action::decode(buf, pc)?;
        let next = pc + action.size;
        let field = field_of(&action, pc)?;
        match field {
            Some((op, Field::Branch(at))) => {
                let offset = LittleEndian::read_i16(&buf[at..]) as i64;
                if crosses(next as i64 + offset) {
                    let value = offset + amount;
                    let value = i16::try_from(value).map_err(|_| overflow(op, pc, value))?;
                    LittleEndian::write_i16(&mut buf[at..], value);
                }
            }
            Some((op, Field::U16(at))) if !branch_only => {
                let offset = LittleEndian::read_u16(&buf[at..]) as i64;
                if crosses(next as i64 + offset) {
                    let value = offset + amount;
                    let value = u16::try_from(value).map_err(|_| overflow(op, pc, value))?;
                    LittleEndian::write_u16(&mut buf[at..], value);
                }
            }
            Some((op, Field::U8(at))) if !branch_only => {
                let offset = buf[at] as i64;
                if crosses(next as i64 + offset) {
                    let value = offset + amount;
                    buf[at] = u8::try_from(value).map_err(|_| overflow(op, pc, value))?;
                }
            }
            _ => {}
        }
        pc = next;
    }
    Ok(())
}

/// Replace `code[start..start + size]` with `insert`.
///
/// Offsets in the bytes before the edit that reach past its start, and
/// branches after it that reach back before it, are shifted by the change
/// in length. `code` itself is left untouched.
pub fn splice(
    code: &[u8],
    start: usize,
    size: usize,
    insert: Option<&[u8]>,
) -> Result<Bytes, SpliceError> {
    let insert = insert.unwrap_or(&[]);
    let end = start
        .checked_add(size)
        .filter(|end| *end <= code.len())
        .ok_or(SpliceError::Range {
            start,
            size,
            len: code.len(),
        })?;

    let mut prefix = code[..start].to_vec();
    let mut suffix = code[end..].to_vec();
    let amount = insert.len() as i64 - size as i64;

    if amount != 0 {
        let boundary = start as i64;
        repair(&mut prefix, amount, false, |target| target > boundary)?;
        repair(&mut suffix, -amount, true, |target| target < 0)?;
    }

    let mut out = BytesMut::with_capacity(prefix.len() + insert.len() + suffix.len());
    out.put_slice(&prefix);
    out.put_slice(insert);
    out.put_slice(&suffix);
    Ok(out.freeze())
}
