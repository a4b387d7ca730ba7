//! Bounds-checked readers over byte slices.
//!
//! Every read either returns exactly what was asked for or a [`DataError`];
//! nothing here ever reads past the end of the slice it was given.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use super::DataError;

/// Bounded sub-range view. Fails if fewer than `size` bytes follow `start`.
pub fn subview(data: &[u8], start: usize, size: usize) -> Result<&[u8], DataError> {
    let tail = subview_from(data, start).map_err(|_| DataError::Truncated {
        offset: start,
        needed: size,
        available: 0,
    })?;
    if tail.len() < size {
        return Err(DataError::Truncated {
            offset: start,
            needed: size,
            available: tail.len(),
        });
    }
    Ok(&tail[..size])
}

/// Everything from `start` to the end of `data`.
pub fn subview_from(data: &[u8], start: usize) -> Result<&[u8], DataError> {
    if start > data.len() {
        return Err(DataError::Truncated {
            offset: start,
            needed: 0,
            available: 0,
        });
    }
    Ok(&data[start..])
}

/// Same as [`subview`] but shares the backing storage of a [`Bytes`].
pub fn sub_bytes(data: &Bytes, start: usize, size: usize) -> Result<Bytes, DataError> {
    subview(data, start, size)?;
    Ok(data.slice(start..start + size))
}

/// Scan to the first NUL at or after `offset`. The returned slice includes the terminator.
pub fn read_null_terminated(data: &[u8], offset: usize) -> Result<&[u8], DataError> {
    let tail = subview_from(data, offset)?;
    match tail.iter().position(|&b| b == 0) {
        Some(n) => Ok(&tail[..=n]),
        None => Err(DataError::Unterminated { offset }),
    }
}

pub fn read_u8(data: &[u8], off: &mut usize) -> Result<u8, DataError> {
    let v = subview(data, *off, 1)?[0];
    *off += 1;
    Ok(v)
}

pub fn read_u16(data: &[u8], off: &mut usize) -> Result<u16, DataError> {
    let v = LittleEndian::read_u16(subview(data, *off, 2)?);
    *off += 2;
    Ok(v)
}

pub fn read_i16(data: &[u8], off: &mut usize) -> Result<i16, DataError> {
    let v = LittleEndian::read_i16(subview(data, *off, 2)?);
    *off += 2;
    Ok(v)
}

pub fn read_u32(data: &[u8], off: &mut usize) -> Result<u32, DataError> {
    let v = LittleEndian::read_u32(subview(data, *off, 4)?);
    *off += 4;
    Ok(v)
}

pub fn read_i32(data: &[u8], off: &mut usize) -> Result<i32, DataError> {
    let v = LittleEndian::read_i32(subview(data, *off, 4)?);
    *off += 4;
    Ok(v)
}

pub fn read_f64(data: &[u8], off: &mut usize) -> Result<f64, DataError> {
    let v = LittleEndian::read_f64(subview(data, *off, 8)?);
    *off += 8;
    Ok(v)
}

/// Read a C string and advance past its terminator. The terminator is not returned.
pub fn read_cstr<'a>(data: &'a [u8], off: &mut usize) -> Result<&'a [u8], DataError> {
    let s = read_null_terminated(data, *off)?;
    *off += s.len();
    Ok(&s[..s.len() - 1])
}

/// Number of bits needed to hold `i` as an unsigned value.
pub fn bit_count_u(i: u32) -> u32 {
    u32::BITS - i.leading_zeros()
}

/// Number of bits needed to hold `i` as a two's complement value.
pub fn bit_count_s(i: i32) -> u32 {
    if i < 0 {
        bit_count_u(!i as u32) + 1
    } else {
        bit_count_u(i as u32) + 1
    }
}

pub fn bits_to_bytes(count: usize) -> usize {
    count.div_ceil(8)
}

/// MSB-first reader addressing bits from the start of `data`.
#[derive(Debug, Clone, Copy)]
pub struct BitReader<'a> {
    data: &'a [u8],
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Read `count` (<= 32) bits starting at absolute bit offset `bit`.
    pub fn read(&self, count: u32, bit: usize) -> Result<u32, DataError> {
        let mut r = 0u32;
        for i in 0..count as usize {
            let b = bit + i;
            let byte = *self.data.get(b / 8).ok_or(DataError::Truncated {
                offset: b / 8,
                needed: 1,
                available: 0,
            })?;
            r = (r << 1) | ((byte >> (7 - b % 8)) & 1) as u32;
        }
        Ok(r)
    }

    /// Same as [`read`](Self::read), sign-extending from bit `count - 1`.
    pub fn read_signed(&self, count: u32, bit: usize) -> Result<i32, DataError> {
        let v = self.read(count, bit)?;
        if count == 0 || count >= 32 {
            return Ok(v as i32);
        }
        if v & (1 << (count - 1)) != 0 {
            Ok((v | !((1u32 << count) - 1)) as i32)
        } else {
            Ok(v as i32)
        }
    }
}

/// MSB-first writer, the counterpart of [`BitReader`].
#[derive(Debug)]
pub struct BitWriter<'a> {
    data: &'a mut [u8],
}

impl<'a> BitWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    /// Write the low `count` bits of `value` at absolute bit offset `bit`.
    pub fn write(&mut self, value: u32, count: u32, bit: usize) -> Result<(), DataError> {
        for i in 0..count {
            let b = bit + i as usize;
            let len = self.data.len();
            let byte = self.data.get_mut(b / 8).ok_or(DataError::Truncated {
                offset: b / 8,
                needed: 1,
                available: len.saturating_sub(b / 8),
            })?;
            let flag = 1u8 << (7 - b % 8);
            if (value >> (count - 1 - i)) & 1 != 0 {
                *byte |= flag;
            } else {
                *byte &= !flag;
            }
        }
        Ok(())
    }
}
