use bytes::BytesMut;
use swf_core::Tag;

use super::{put_code, rebuilt, LocateContext, Located, Locator, Scratch};
use crate::error::UnpackError;

/// DoAction: the payload is one code block.
pub struct WholePayload;

impl Locator for WholePayload {
    fn layout(&self) -> &'static str {
        "whole-payload"
    }

    fn locate(&self, marker: &Tag, tag: &Tag, ctx: &LocateContext<'_>) -> Result<Located, UnpackError> {
        let s = Scratch::new(marker, tag);
        let trace = ctx.tracer.trace(&s.data, s.before, s.data.len(), s.base)?;

        let mut out = BytesMut::with_capacity(trace.code.len());
        put_code(&mut out, &trace);
        Ok(Located {
            tag: rebuilt(tag, out),
            regions: vec![trace],
        })
    }
}
