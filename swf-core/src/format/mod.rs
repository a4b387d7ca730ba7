pub mod data;
pub mod movie;
pub mod sprite;
pub mod tag;

/// Bounds violations raised by the byte and bit primitives.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("buffer is too small at 0x{offset:X}: {available} < {needed}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unterminated string at 0x{offset:X}")]
    Unterminated { offset: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("unexpected SWF signature: {0:?}")]
    BadSignature(String),

    #[error("unexpected SWF size: {declared} > {available}")]
    SizeMismatch { declared: usize, available: usize },

    #[error("rect field width out of range: {0}")]
    RectWidth(u32),

    #[error("zlib stream: {0}")]
    Zlib(#[from] std::io::Error),

    #[error("header field: {0}")]
    Field(#[from] binrw::Error),
}
