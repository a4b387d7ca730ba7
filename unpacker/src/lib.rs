//! Restores SWF action bytecode that was split up by jump trampolines.
//!
//! The obfuscator moves the code of a tag into a marker tag placed right
//! before it, cuts the code into pieces and chains them together with pairs of
//! jumps. [`Unpacker`] walks the tag tree, runs each hidden region in a small
//! AVM1 interpreter to find the pieces, and writes back a clean tag.

#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod locate;
pub mod report;
pub mod rewrite;
pub mod splice;
pub mod trace;

pub use error::UnpackError;
pub use report::Report;
pub use rewrite::{unpack, UnpackConfig, Unpacker};
pub use trace::{Trace, Tracer};
