use bytes::{BufMut, Bytes, BytesMut};

use super::{data, DataError};

/// Tag type codes the unpacker cares about.
pub mod code {
    pub const END: u16 = 0;
    pub const DO_ACTION: u16 = 12;
    pub const PLACE_OBJECT2: u16 = 26;
    pub const DEFINE_BUTTON2: u16 = 34;
    pub const DEFINE_SPRITE: u16 = 39;
    pub const DO_INIT_ACTION: u16 = 59;
    /// obfuscator marker preceding a relocated tag
    pub const MARKER: u16 = 253;
    /// obfuscator filler, carries nothing
    pub const PADDING: u16 = 255;
}

const SHORT_LEN_MAX: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub code: u16,
    pub data: Bytes,
    /// long header even though the payload would fit a short one
    pub force_long: bool,
}

impl Tag {
    pub fn new(code: u16, data: impl Into<Bytes>) -> Self {
        Self {
            code,
            data: data.into(),
            force_long: false,
        }
    }

    pub fn is_long(&self) -> bool {
        self.force_long || self.data.len() >= SHORT_LEN_MAX
    }

    #[inline]
    pub fn header_size(&self) -> usize {
        if self.is_long() {
            6
        } else {
            2
        }
    }

    /// Encoded size, header included.
    #[inline]
    pub fn size(&self) -> usize {
        self.header_size() + self.data.len()
    }

    /// Decode one tag at `offset`, returning it together with the bytes consumed.
    pub fn decode(buf: &Bytes, offset: usize) -> Result<(Tag, usize), DataError> {
        let mut off = offset;
        let head = data::read_u16(buf, &mut off)?;
        let code = head >> 6;
        let mut len = (head & 0x3f) as usize;
        let mut force_long = false;
        if len == SHORT_LEN_MAX {
            len = data::read_u32(buf, &mut off)? as usize;
            force_long = len < SHORT_LEN_MAX;
        }
        let payload = data::sub_bytes(buf, off, len)?;
        off += len;

        Ok((
            Tag {
                code,
                data: payload,
                force_long,
            },
            off - offset,
        ))
    }

    pub fn encode_into(&self, out: &mut BytesMut) {
        out.reserve(self.size());
        let len = self.data.len();
        if self.is_long() {
            out.put_u16_le((self.code << 6) | SHORT_LEN_MAX as u16);
            out.put_u32_le(len as u32);
        } else {
            out.put_u16_le((self.code << 6) | len as u16);
        }
        out.put_slice(&self.data);
    }

    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.size());
        self.encode_into(&mut out);
        out.freeze()
    }
}

/// Decode consecutive tags in `[start, end)`.
pub fn decode_tags(buf: &Bytes, start: usize, end: usize) -> Result<Vec<Tag>, DataError> {
    let mut tags = Vec::new();
    let mut off = start;
    while off < end {
        let (tag, consumed) = Tag::decode(buf, off)?;
        log::trace!("tag {} at 0x{:X}, {} bytes", tag.code, off, tag.data.len());
        tags.push(tag);
        off += consumed;
    }
    Ok(tags)
}

pub fn encode_tags(tags: &[Tag], out: &mut BytesMut) {
    for tag in tags {
        tag.encode_into(out);
    }
}
