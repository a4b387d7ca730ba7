use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_8};
use std::{borrow::Cow, str::FromStr};

pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;
}

/// Encoding used for strings embedded in action bytecode.
///
/// Movies from version 6 on store UTF-8. Older movies use whatever
/// code page the authoring machine ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    ShiftJis,
    /// Treat GBK as GB18030 (superset).
    Gbk,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Utf8 => UTF_8,
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Gbk => GB18030,
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "sjis" | "shift_jis" => Ok(Encoding::ShiftJis),
            "gbk" | "gb18030" => Ok(Encoding::Gbk),
            _ => Err(anyhow::anyhow!("unknown NLS: {}", s)),
        }
    }
}

/// A simple decoder bound to one encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    enc: Encoding,
}

impl Decoder {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }
}

impl TextDecoder for Decoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.enc {
            Encoding::Utf8 => String::from_utf8_lossy(bytes),
            Encoding::ShiftJis | Encoding::Gbk => {
                let (cow, had_errors) = self
                    .enc
                    .as_encoding_rs()
                    .decode_without_bom_handling(bytes);
                if had_errors {
                    log::warn!("malformed {:?} string: {:02x?}", self.enc, bytes);
                }
                cow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_jis_text() {
        // "テスト"
        let d = Decoder::new(Encoding::ShiftJis);
        assert_eq!(d.decode(&[0x83, 0x65, 0x83, 0x58, 0x83, 0x67]), "テスト");
    }

    #[test]
    fn gbk_text() {
        // "中文"
        let d = Decoder::new(Encoding::Gbk);
        assert_eq!(d.decode(&[0xD6, 0xD0, 0xCE, 0xC4]), "中文");
    }

    #[test]
    fn utf8_is_lossy() {
        let d = Decoder::default();
        assert_eq!(d.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn parse_names() {
        assert_eq!("SJIS".parse::<Encoding>().unwrap(), Encoding::ShiftJis);
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("gb18030".parse::<Encoding>().unwrap(), Encoding::Gbk);
        assert!("latin1".parse::<Encoding>().is_err());
    }
}
