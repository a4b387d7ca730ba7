//! Finding the bytecode inside the tags the obfuscator relocates.
//!
//! Every locator gets the marker tag and the tag that follows it. It builds a
//! scratch buffer holding both encoded tags back to back, points the tracer at
//! each code region of the real tag's layout, and rebuilds the payload from
//! what the tracer recovers.

mod button;
mod do_action;
mod place_object;

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use swf_core::{tag::code, Tag};

use crate::{
    error::UnpackError,
    trace::{Trace, Tracer},
};

pub use button::ConditionalActions;
pub use do_action::WholePayload;
pub use place_object::ClipActions;

pub struct LocateContext<'a> {
    /// movie version, decides event flag width
    pub version: u8,
    pub tracer: &'a Tracer,
}

#[derive(Debug, Clone)]
pub struct Located {
    pub tag: Tag,
    pub regions: Vec<Trace>,
}

pub trait Locator {
    /// Short layout name for logs and the report.
    fn layout(&self) -> &'static str;

    fn locate(&self, marker: &Tag, tag: &Tag, ctx: &LocateContext<'_>) -> Result<Located, UnpackError>;
}

/// Marker and real tag, encoded back to back.
pub struct Scratch {
    pub data: Bytes,
    /// length of the encoded marker
    pub before: usize,
    /// offset of the real tag's payload
    pub base: usize,
}

impl Scratch {
    pub fn new(marker: &Tag, tag: &Tag) -> Self {
        let mut data = BytesMut::with_capacity(marker.size() + tag.size());
        marker.encode_into(&mut data);
        let before = data.len();
        tag.encode_into(&mut data);
        Self {
            data: data.freeze(),
            before,
            base: before + tag.header_size(),
        }
    }
}

/// Same tag with a new payload. Keeps the header form.
pub(crate) fn rebuilt(tag: &Tag, payload: BytesMut) -> Tag {
    Tag {
        code: tag.code,
        data: payload.freeze(),
        force_long: tag.force_long,
    }
}

pub(crate) fn put_code(out: &mut BytesMut, trace: &Trace) {
    out.put_slice(&trace.code);
}

/// Locators keyed by the code of the tag that follows a marker.
pub struct Locators {
    by_code: HashMap<u16, Box<dyn Locator>>,
}

impl Locators {
    pub fn empty() -> Self {
        Self {
            by_code: HashMap::new(),
        }
    }

    pub fn register(&mut self, code: u16, locator: Box<dyn Locator>) {
        self.by_code.insert(code, locator);
    }

    pub fn get(&self, code: u16) -> Option<&dyn Locator> {
        self.by_code.get(&code).map(|l| l.as_ref())
    }
}

impl Default for Locators {
    fn default() -> Self {
        let mut locators = Self::empty();
        locators.register(code::DO_ACTION, Box::new(WholePayload));
        locators.register(code::PLACE_OBJECT2, Box::new(ClipActions));
        locators.register(code::DEFINE_BUTTON2, Box::new(ConditionalActions));
        locators
    }
}
