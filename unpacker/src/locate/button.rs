use bytes::{BufMut, BytesMut};
use swf_core::{data, Tag};

use super::{put_code, rebuilt, LocateContext, Located, Locator, Scratch};
use crate::error::UnpackError;

/// button id and flags
const ACTION_OFFSET_AT: usize = 3;
/// condition size and condition flags
const CONDITION_HEADER: usize = 4;

/// DefineButton2: conditional action records after the button characters.
pub struct ConditionalActions;

impl Locator for ConditionalActions {
    fn layout(&self) -> &'static str {
        "conditional-actions"
    }

    fn locate(&self, marker: &Tag, tag: &Tag, ctx: &LocateContext<'_>) -> Result<Located, UnpackError> {
        let s = Scratch::new(marker, tag);
        let p = &tag.data[..];

        let mut i = ACTION_OFFSET_AT;
        let offset = data::read_u16(p, &mut i)? as usize;
        if offset == 0 {
            return Err(UnpackError::NoButtonActions);
        }
        i = ACTION_OFFSET_AT + offset;

        let mut out = BytesMut::with_capacity(p.len());
        out.put_slice(data::subview(p, 0, i)?);

        let mut regions = Vec::new();
        while i < p.len() {
            let mut cursor = i;
            let condition_size = data::read_u16(p, &mut cursor)? as usize;
            let flags = data::read_u16(p, &mut cursor)?;
            let size = if condition_size != 0 {
                condition_size
            } else {
                p.len() - i
            };

            let trace = ctx
                .tracer
                .trace(&s.data, s.before, s.base + i + size, s.base + cursor)?;

            let new_size = if condition_size != 0 {
                let n = trace.code.len() + CONDITION_HEADER;
                u16::try_from(n).map_err(|_| UnpackError::SizeOverflow { size: n, width: 2 })?
            } else {
                0
            };
            log::debug!("condition 0x{:04X}: {} -> {} bytes", flags, size, new_size);

            out.put_u16_le(new_size);
            out.put_u16_le(flags);
            put_code(&mut out, &trace);
            regions.push(trace);

            if condition_size == 0 {
                break;
            }
            i += condition_size;
        }

        Ok(Located {
            tag: rebuilt(tag, out),
            regions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Tracer;
    use pretty_assertions::assert_eq;
    use swf_core::tag::code;

    fn marker() -> Tag {
        // exits to 0x2F, the end action of the condition below
        let payload = hex::decode(concat!(
            "960300006100",
            "9902000500",
            "990200f0ff",
            "1c",
            "12",
            "9902001600",
            "990200efff"
        ))
        .unwrap();
        Tag::new(code::MARKER, payload)
    }

    fn locate(payload: &str) -> Result<Located, UnpackError> {
        let tag = Tag::new(code::DEFINE_BUTTON2, hex::decode(payload).unwrap());
        let tracer = Tracer::default();
        let ctx = LocateContext {
            version: 6,
            tracer: &tracer,
        };
        ConditionalActions.locate(&marker(), &tag, &ctx)
    }

    #[test]
    fn last_condition() {
        let located = locate(concat!("0100", "00", "0300", "00", "0000", "0800", "990200eaff", "00")).unwrap();
        assert_eq!(
            &located.tag.data[..],
            &hex::decode(concat!("0100", "00", "0300", "00", "0000", "0800", "9603000061001c1200")).unwrap()[..]
        );
        assert_eq!(located.regions.len(), 1);
        assert_eq!(located.regions[0].entry, 42);
    }

    #[test]
    fn sized_condition() {
        let located = locate(concat!("0100", "00", "0300", "00", "0a00", "0800", "990200eaff", "00")).unwrap();
        assert_eq!(
            &located.tag.data[..],
            &hex::decode(concat!("0100", "00", "0300", "00", "0d00", "0800", "9603000061001c1200")).unwrap()[..]
        );
    }

    #[test]
    fn no_actions() {
        assert!(matches!(
            locate(concat!("0100", "00", "0000", "00")),
            Err(UnpackError::NoButtonActions)
        ));
    }
}
