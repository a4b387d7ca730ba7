use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use bytes::{Bytes, BytesMut};

use super::{
    data,
    tag::{self, Tag},
    FormatError,
};

#[derive(BinRead, BinWrite, Debug, Clone, Copy)]
#[brw(little)]
struct SpriteHeader {
    id: u16,
    frame_count: u16,
}

/// Nested tag group carried in a DefineSprite payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub id: u16,
    pub frame_count: u16,
    pub tags: Vec<Tag>,
}

impl Sprite {
    /// Decode a sprite payload. Tags run to the end of `buf`.
    pub fn decode(buf: &Bytes) -> Result<Sprite, FormatError> {
        let header = SpriteHeader::read(&mut Cursor::new(data::subview(buf, 0, 4)?))?;
        let tags = tag::decode_tags(buf, 4, buf.len())?;
        Ok(Sprite {
            id: header.id,
            frame_count: header.frame_count,
            tags,
        })
    }

    pub fn encode(&self) -> Result<Bytes, FormatError> {
        let mut head = Cursor::new(Vec::with_capacity(4));
        SpriteHeader {
            id: self.id,
            frame_count: self.frame_count,
        }
        .write(&mut head)?;

        let mut out = BytesMut::from(&head.into_inner()[..]);
        tag::encode_tags(&self.tags, &mut out);
        Ok(out.freeze())
    }
}
