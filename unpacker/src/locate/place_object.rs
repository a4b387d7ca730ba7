use bytes::{BufMut, BytesMut};
use swf_core::{
    data::{self, BitReader},
    Tag,
};

use super::{put_code, rebuilt, LocateContext, Located, Locator, Scratch};
use crate::error::UnpackError;

const HAS_CHARACTER: u8 = 1 << 1;
const HAS_MATRIX: u8 = 1 << 2;
const HAS_COLOR_TRANSFORM: u8 = 1 << 3;
const HAS_RATIO: u8 = 1 << 4;
const HAS_NAME: u8 = 1 << 5;
const HAS_CLIP_DEPTH: u8 = 1 << 6;
const HAS_CLIP_ACTIONS: u8 = 1 << 7;

const CLIP_EVENT_KEY_PRESS: u32 = 1 << 22;

fn event_flags_width(version: u8) -> usize {
    if version >= 6 {
        4
    } else {
        2
    }
}

fn matrix_bits(r: &BitReader<'_>) -> Result<usize, UnpackError> {
    let mut b = 0;
    // scale and rotate are optional, translate always present
    for optional in [true, true, false] {
        if optional {
            let present = r.read(1, b)? != 0;
            b += 1;
            if !present {
                continue;
            }
        }
        b += 5 + r.read(5, b)? as usize * 2;
    }
    Ok(b)
}

fn cxform_bits(r: &BitReader<'_>) -> Result<usize, UnpackError> {
    let has_add = r.read(1, 0)? as usize;
    let has_mult = r.read(1, 1)? as usize;
    let nbits = r.read(4, 2)? as usize;
    Ok(6 + nbits * 4 * has_mult + nbits * 4 * has_add)
}

/// Length of everything before the first clip action record.
pub(crate) fn header_len(p: &[u8], version: u8) -> Result<usize, UnpackError> {
    let mut i = 0;
    let flags = data::read_u8(p, &mut i)?;
    // depth
    i += 2;
    if flags & HAS_CHARACTER != 0 {
        i += 2;
    }
    if flags & HAS_MATRIX != 0 {
        let r = BitReader::new(data::subview_from(p, i)?);
        i += data::bits_to_bytes(matrix_bits(&r)?);
    }
    if flags & HAS_COLOR_TRANSFORM != 0 {
        let r = BitReader::new(data::subview_from(p, i)?);
        i += data::bits_to_bytes(cxform_bits(&r)?);
    }
    if flags & HAS_RATIO != 0 {
        i += 2;
    }
    if flags & HAS_NAME != 0 {
        i += data::read_null_terminated(p, i)?.len();
    }
    if flags & HAS_CLIP_DEPTH != 0 {
        i += 2;
    }
    if flags & HAS_CLIP_ACTIONS == 0 {
        return Err(UnpackError::NoClipActions);
    }
    // reserved, all event flags
    i += 2 + event_flags_width(version);
    Ok(i)
}

/// PlaceObject2: a list of clip event records, each with its own code block.
pub struct ClipActions;

impl Locator for ClipActions {
    fn layout(&self) -> &'static str {
        "clip-actions"
    }

    fn locate(&self, marker: &Tag, tag: &Tag, ctx: &LocateContext<'_>) -> Result<Located, UnpackError> {
        let s = Scratch::new(marker, tag);
        let p = &tag.data[..];
        let width = event_flags_width(ctx.version);

        let mut i = header_len(p, ctx.version)?;
        let mut out = BytesMut::with_capacity(p.len());
        out.put_slice(data::subview(p, 0, i)?);

        let mut regions = Vec::new();
        loop {
            let flags_raw = data::subview(p, i, width)?;
            let event_flags = if width == 4 {
                data::read_u32(p, &mut i)?
            } else {
                data::read_u16(p, &mut i)? as u32
            };
            out.put_slice(flags_raw);
            if event_flags == 0 {
                if i < p.len() {
                    return Err(UnpackError::TrailingBytes { count: p.len() - i });
                }
                break;
            }

            let size = data::read_u32(p, &mut i)? as usize;
            let record = i;
            let end = s.base + record + size;

            let mut key_code = None;
            if event_flags & CLIP_EVENT_KEY_PRESS != 0 {
                key_code = Some(data::read_u8(p, &mut i)?);
            }

            let trace = ctx.tracer.trace(&s.data, s.before, end, s.base + i)?;
            let new_size = trace.code.len() + key_code.map_or(0, |_| 1);
            let new_size = u32::try_from(new_size).map_err(|_| UnpackError::SizeOverflow {
                size: new_size,
                width: 4,
            })?;

            log::debug!(
                "clip event 0x{:08X}: {} -> {} bytes",
                event_flags,
                size,
                new_size
            );

            out.put_u32_le(new_size);
            if let Some(key) = key_code {
                out.put_u8(key);
            }
            put_code(&mut out, &trace);
            regions.push(trace);

            i = record + size;
        }

        Ok(Located {
            tag: rebuilt(tag, out),
            regions,
        })
    }
}
