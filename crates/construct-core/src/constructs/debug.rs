//! `Debug`: a transparent wrapper that logs entry/exit around its inner
//! construct. Never changes parsed/built values or stream position.

use crate::construct::{Construct, ConstructRef};
use crate::context::Context;
use crate::error::Result;
use crate::stream::Stream;
use crate::value::Value;

/// Wraps `inner`, logging its position and outcome at `trace` level under
/// `label` whenever it runs and the enclosing call was made with
/// `ParseOptions::debug`/`BuildOptions::debug` set (mirrored onto the
/// `Context` as `ctx.debug_enabled()`). With the flag unset, `Debug` is a
/// pure pass-through and never touches `log`. Purely observational either
/// way: `sizeof` just delegates.
#[derive(Debug)]
pub struct Debug {
    label: String,
    inner: ConstructRef,
}

impl Debug {
    pub fn new(label: impl Into<String>, inner: ConstructRef) -> Self {
        Self {
            label: label.into(),
            inner,
        }
    }
}

impl Construct for Debug {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        if !ctx.debug_enabled() {
            return self.inner.parse(stream, ctx);
        }
        let pos = stream.tell();
        log::trace!("{}: parse entering at position {pos}", self.label);
        let result = self.inner.parse(stream, ctx);
        match &result {
            Ok(value) => log::trace!("{}: parse returned {value:?}, now at {}", self.label, stream.tell()),
            Err(e) => log::trace!("{}: parse failed: {e}", self.label),
        }
        result
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        if !ctx.debug_enabled() {
            return self.inner.build(value, stream, ctx);
        }
        let pos = stream.tell();
        log::trace!("{}: build entering at position {pos} with {value:?}", self.label);
        let result = self.inner.build(value, stream, ctx);
        match &result {
            Ok(()) => log::trace!("{}: build finished, now at {}", self.label, stream.tell()),
            Err(e) => log::trace!("{}: build failed: {e}", self.label),
        }
        result
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }

    fn is_embedded(&self) -> bool {
        self.inner.is_embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::primitives::Integer;
    use crate::stream::ByteStream;
    use std::sync::Arc;

    #[test]
    fn passes_through_unchanged() {
        let d = Debug::new("width", Arc::new(Integer::new(1)) as ConstructRef);
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(vec![7]);
        assert_eq!(d.parse(&mut stream, &mut ctx).unwrap(), Value::Int(7));
    }

    #[test]
    fn passes_through_unchanged_with_capture_enabled() {
        let d = Debug::new("width", Arc::new(Integer::new(1)) as ConstructRef);
        let mut ctx = Context::new();
        ctx.set_debug(true);
        let mut stream = ByteStream::from_bytes(vec![7]);
        assert_eq!(d.parse(&mut stream, &mut ctx).unwrap(), Value::Int(7));

        let mut out = ByteStream::new();
        d.build(&Value::Int(7), &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), vec![7]);
    }
}
