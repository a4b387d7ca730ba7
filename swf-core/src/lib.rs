//! This crate implements the container side of the SWF unpacker.
//!
//! This mostly includes bounds-checked byte/bit primitives and the movie, tag
//! and sprite codecs. Nothing here knows about action bytecode.

#![allow(clippy::uninlined_format_args)]

pub mod format;

pub use format::{
    data,
    movie::{Compression, Fixed8, Movie, Rect},
    sprite::Sprite,
    tag::{self, Tag},
    DataError, FormatError,
};
