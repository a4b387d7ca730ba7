use std::io::{Cursor, Read, Write};

use binrw::{BinRead, BinWrite};
use bytes::{BufMut, Bytes, BytesMut};
use flate2::{read::ZlibDecoder, write::ZlibEncoder};

use super::{
    data::{self, BitReader, BitWriter},
    tag::{self, Tag},
    FormatError,
};

const HEADER_SIZE: usize = 8;
const RECT_NBITS_WIDTH: u32 = 5;
const RECT_NBITS_MAX: u32 = (1 << RECT_NBITS_WIDTH) - 1;

#[derive(BinRead, BinWrite, Debug, Clone)]
#[brw(little)]
struct Header {
    magic: [u8; 3],
    version: u8,
    size: u32,
}

/// 8.8 fixed point, fraction byte first.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[brw(little)]
pub struct Fixed8 {
    pub fraction: u8,
    pub integer: u8,
}

impl Fixed8 {
    pub fn new(integer: u8, fraction: u8) -> Self {
        Self { fraction, integer }
    }

    pub fn value(&self) -> f32 {
        self.integer as f32 + self.fraction as f32 / 256.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Zlib,
}

impl Compression {
    fn magic(&self) -> &'static [u8; 3] {
        match self {
            Compression::None => b"FWS",
            Compression::Zlib => b"CWS",
        }
    }
}

/// Bit-packed rectangle in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
    /// field width seen on decode; encoding never goes narrower
    pub force_nbits: u32,
}

impl Rect {
    pub fn new(x_min: i32, x_max: i32, y_min: i32, y_max: i32) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            force_nbits: 0,
        }
    }

    pub fn nbits(&self) -> u32 {
        [self.x_min, self.x_max, self.y_min, self.y_max]
            .into_iter()
            .map(data::bit_count_s)
            .fold(self.force_nbits, u32::max)
    }

    pub fn size(&self) -> usize {
        data::bits_to_bytes((RECT_NBITS_WIDTH + 4 * self.nbits()) as usize)
    }

    pub fn decode(buf: &[u8], offset: usize) -> Result<(Rect, usize), FormatError> {
        let r = BitReader::new(data::subview_from(buf, offset)?);
        let nbits = r.read(RECT_NBITS_WIDTH, 0)?;
        let mut bit = RECT_NBITS_WIDTH as usize;
        let mut fields = [0i32; 4];
        for field in fields.iter_mut() {
            *field = r.read_signed(nbits, bit)?;
            bit += nbits as usize;
        }
        let [x_min, x_max, y_min, y_max] = fields;
        Ok((
            Rect {
                x_min,
                x_max,
                y_min,
                y_max,
                force_nbits: nbits,
            },
            data::bits_to_bytes(bit),
        ))
    }

    pub fn encode(&self, out: &mut BytesMut) -> Result<(), FormatError> {
        let nbits = self.nbits();
        if nbits > RECT_NBITS_MAX {
            return Err(FormatError::RectWidth(nbits));
        }
        let mut raw = vec![0u8; self.size()];
        let mut w = BitWriter::new(&mut raw);
        w.write(nbits, RECT_NBITS_WIDTH, 0)?;
        let mut bit = RECT_NBITS_WIDTH as usize;
        for v in [self.x_min, self.x_max, self.y_min, self.y_max] {
            w.write(v as u32, nbits, bit)?;
            bit += nbits as usize;
        }
        out.put_slice(&raw);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub compression: Compression,
    pub version: u8,
    pub frame_size: Rect,
    pub frame_rate: Fixed8,
    pub frame_count: u16,
    pub tags: Vec<Tag>,
}

impl Movie {
    pub fn decode(input: &[u8]) -> Result<Movie, FormatError> {
        let header = Header::read(&mut Cursor::new(data::subview(input, 0, HEADER_SIZE)?))?;
        let compression = match &header.magic {
            b"FWS" => Compression::None,
            b"CWS" => Compression::Zlib,
            other => {
                return Err(FormatError::BadSignature(
                    String::from_utf8_lossy(other).into_owned(),
                ))
            }
        };

        let buf = match compression {
            Compression::None => Bytes::copy_from_slice(input),
            Compression::Zlib => {
                let mut full = input[..HEADER_SIZE].to_vec();
                ZlibDecoder::new(&input[HEADER_SIZE..]).read_to_end(&mut full)?;
                Bytes::from(full)
            }
        };

        let declared = header.size as usize;
        if declared > buf.len() || declared < HEADER_SIZE {
            return Err(FormatError::SizeMismatch {
                declared,
                available: buf.len(),
            });
        }
        let buf = buf.slice(..declared);

        let mut off = HEADER_SIZE;
        let (frame_size, consumed) = Rect::decode(&buf, off)?;
        off += consumed;
        let frame_rate = Fixed8::read(&mut Cursor::new(data::subview(&buf, off, 2)?))?;
        off += 2;
        let frame_count = data::read_u16(&buf, &mut off)?;
        let tags = tag::decode_tags(&buf, off, declared)?;

        log::debug!(
            "movie v{} {:?}: {} tags, {} bytes",
            header.version,
            compression,
            tags.len(),
            declared
        );

        Ok(Movie {
            compression,
            version: header.version,
            frame_size,
            frame_rate,
            frame_count,
            tags,
        })
    }

    fn encode_body(&self) -> Result<BytesMut, FormatError> {
        let mut body = BytesMut::new();
        self.frame_size.encode(&mut body)?;
        body.put_u8(self.frame_rate.fraction);
        body.put_u8(self.frame_rate.integer);
        body.put_u16_le(self.frame_count);
        tag::encode_tags(&self.tags, &mut body);
        Ok(body)
    }

    /// Uncompressed size as it would be declared in the header.
    pub fn size(&self) -> Result<usize, FormatError> {
        Ok(HEADER_SIZE + self.encode_body()?.len())
    }

    pub fn encode(&self) -> Result<Vec<u8>, FormatError> {
        let body = self.encode_body()?;
        let header = Header {
            magic: *self.compression.magic(),
            version: self.version,
            size: (HEADER_SIZE + body.len()) as u32,
        };

        let mut out = Cursor::new(Vec::with_capacity(HEADER_SIZE + body.len()));
        header.write(&mut out)?;
        let mut out = out.into_inner();
        match self.compression {
            Compression::None => out.extend_from_slice(&body),
            Compression::Zlib => {
                let mut z = ZlibEncoder::new(out, flate2::Compression::default());
                z.write_all(&body)?;
                out = z.finish()?;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rect_roundtrip_negative() {
        let rect = Rect::new(-20, 11000, -1, 8000);
        assert_eq!(rect.nbits(), 15);
        let mut out = BytesMut::new();
        rect.encode(&mut out).unwrap();
        assert_eq!(out.len(), rect.size());
        let (back, consumed) = Rect::decode(&out, 0).unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!((back.x_min, back.x_max, back.y_min, back.y_max), (-20, 11000, -1, 8000));
        assert_eq!(back.force_nbits, 15);
    }

    #[test]
    fn rect_keeps_wider_width() {
        let mut rect = Rect::new(0, 1, 0, 1);
        rect.force_nbits = 20;
        assert_eq!(rect.nbits(), 20);
        let mut out = BytesMut::new();
        rect.encode(&mut out).unwrap();
        assert_eq!(out.len(), 11);
        let (back, _) = Rect::decode(&out, 0).unwrap();
        assert_eq!(back, rect);
    }

    #[test]
    fn rect_zero() {
        let mut out = BytesMut::new();
        Rect::default().encode(&mut out).unwrap();
        // 5 bits of width + 4 one-bit fields
        assert_eq!(&out[..], &[0b00001_000, 0b0_0000000]);
    }

    #[test]
    fn fixed8() {
        let rate = Fixed8::read(&mut Cursor::new([0x80u8, 0x18])).unwrap();
        assert_eq!(rate, Fixed8::new(24, 128));
        assert_eq!(rate.value(), 24.5);
    }
}
