//! Constructs that wrap a single child and transform its value or its
//! framing: `Adapted`, `Repeat`, `RepeatExactly`, `Prefixed`, `Padded`,
//! `Aligned`.

use std::fmt;

use crate::construct::{sizeof_unknown, Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::{ByteStream, Stream};
use crate::value::Value;

/// Applies `before_build` to the incoming value before delegating to
/// `inner.build`, and `after_parse` to the value `inner.parse` returns.
/// Both are opaque user transforms; anything they raise propagates as
/// `AdapterFailure`.
pub struct Adapted {
    inner: ConstructRef,
    before_build: Box<dyn Fn(&Value, &Context) -> anyhow::Result<Value> + Send + Sync>,
    after_parse: Box<dyn Fn(Value, &Context) -> anyhow::Result<Value> + Send + Sync>,
}

impl Adapted {
    pub fn new(
        inner: ConstructRef,
        before_build: impl Fn(&Value, &Context) -> anyhow::Result<Value> + Send + Sync + 'static,
        after_parse: impl Fn(Value, &Context) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            before_build: Box::new(before_build),
            after_parse: Box::new(after_parse),
        }
    }
}

impl fmt::Debug for Adapted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapted").field("inner", &self.inner).finish_non_exhaustive()
    }
}

impl Construct for Adapted {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let raw = self.inner.parse(stream, ctx)?;
        (self.after_parse)(raw, ctx).map_err(|e| ConstructError::adapter_failure(ctx.path(), stream.tell(), e))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let raw = (self.before_build)(value, ctx)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), stream.tell(), e))?;
        self.inner.build(&raw, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }
}

/// Greedy repetition: parse repeatedly until the stream signals end or
/// `inner` fails cleanly (its position left untouched, per the
/// transactional contract every construct upholds). Size is always
/// data-dependent.
#[derive(Debug)]
pub struct Repeat {
    inner: ConstructRef,
}

impl Repeat {
    pub fn new(inner: ConstructRef) -> Self {
        Self { inner }
    }
}

impl Construct for Repeat {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let mut items = Vec::new();
        loop {
            if stream.remaining() == Some(0) {
                break;
            }
            let entry_pos = stream.tell();
            ctx.push_field(format!("[{}]", items.len()));
            let result = self.inner.parse(stream, ctx);
            ctx.pop_field();
            match result {
                Ok(v) => items.push(v),
                Err(_) => {
                    // The failing child must have restored the stream to entry_pos;
                    // that's what makes this a clean end-of-sequence rather than a
                    // real error to propagate.
                    debug_assert_eq!(stream.tell(), entry_pos);
                    break;
                }
            }
        }
        Ok(Value::List(items))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let items = value
            .as_list()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "Repeat expects a list value"))?;
        for (i, item) in items.iter().enumerate() {
            ctx.push_field(format!("[{i}]"));
            let result = self.inner.build(item, stream, ctx);
            ctx.pop_field();
            result?;
        }
        Ok(())
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Err(sizeof_unknown(ctx.path()))
    }
}

/// Parses/builds exactly `n` elements; fails with `LengthMismatch` on build
/// if the list length differs.
#[derive(Debug)]
pub struct RepeatExactly {
    inner: ConstructRef,
    n: usize,
}

impl RepeatExactly {
    pub fn new(inner: ConstructRef, n: usize) -> Self {
        Self { inner, n }
    }
}

impl Construct for RepeatExactly {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let mut items = Vec::with_capacity(self.n);
        for i in 0..self.n {
            ctx.push_field(format!("[{i}]"));
            let result = self.inner.parse(stream, ctx);
            ctx.pop_field();
            items.push(result?);
        }
        Ok(Value::List(items))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let items = value
            .as_list()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "RepeatExactly expects a list value"))?;
        if items.len() != self.n {
            return Err(ConstructError::length_mismatch(
                ctx.path(),
                stream.tell(),
                format!("expected {} elements, got {}", self.n, items.len()),
            ));
        }
        for (i, item) in items.iter().enumerate() {
            ctx.push_field(format!("[{i}]"));
            let result = self.inner.build(item, stream, ctx);
            ctx.pop_field();
            result?;
        }
        Ok(())
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Ok(self.inner.sizeof(ctx)? * self.n as u64)
    }
}

/// Reads a length via `length`, restricts the stream to that window on
/// parse, and asserts the window is fully consumed. On build, builds
/// `inner` into a buffer first so the length can be written before it.
#[derive(Debug)]
pub struct Prefixed {
    length: ConstructRef,
    inner: ConstructRef,
}

impl Prefixed {
    pub fn new(length: ConstructRef, inner: ConstructRef) -> Self {
        Self { length, inner }
    }
}

impl Construct for Prefixed {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let len_value = self.length.parse(stream, ctx)?;
        let len = len_value.as_int().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Prefixed length construct must yield an integer")
        })? as usize;
        let window_start = stream.tell();
        let window_bytes = stream
            .read(len)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), window_start))?;
        let mut window = ByteStream::from_bytes(window_bytes);
        let value = self.inner.parse(&mut window, ctx)?;
        if window.remaining() != Some(0) {
            return Err(ConstructError::framing(
                ctx.path(),
                window_start,
                "Prefixed window was not fully consumed",
            ));
        }
        Ok(value)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let mut buffer = ByteStream::new();
        self.inner.build(value, &mut buffer, ctx)?;
        let bytes = buffer.into_bytes();
        self.length.build(&Value::Int(bytes.len() as i128), stream, ctx)?;
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Ok(self.length.sizeof(ctx)? + self.inner.sizeof(ctx)?)
    }
}

/// Total size is exactly `n`: the inner's encoding is padded or truncated to
/// fit. Trailing bytes on parse are discarded (no fully-consumed assertion,
/// unlike `Prefixed`).
#[derive(Debug)]
pub struct Padded {
    n: usize,
    inner: ConstructRef,
}

impl Padded {
    pub fn new(n: usize, inner: ConstructRef) -> Self {
        Self { n, inner }
    }
}

impl Construct for Padded {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let window_bytes = stream.read(self.n).map_err(|_| ConstructError::unexpected_end(ctx.path(), pos))?;
        let mut window = ByteStream::from_bytes(window_bytes);
        self.inner.parse(&mut window, ctx)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let mut buffer = ByteStream::new();
        self.inner.build(value, &mut buffer, ctx)?;
        let mut bytes = buffer.into_bytes();
        if bytes.len() > self.n {
            return Err(ConstructError::length_mismatch(
                ctx.path(),
                stream.tell(),
                format!("encoded size {} exceeds padded width {}", bytes.len(), self.n),
            ));
        }
        bytes.resize(self.n, 0);
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n as u64)
    }
}

/// Rounds the current stream position up to a multiple of `modulus` with
/// zero-fill on build / a skip on parse, then delegates.
#[derive(Debug)]
pub struct Aligned {
    modulus: u64,
    inner: ConstructRef,
}

impl Aligned {
    pub fn new(modulus: u64, inner: ConstructRef) -> Self {
        assert!(modulus > 0, "alignment modulus must be positive");
        Self { modulus, inner }
    }

    fn padding_needed(&self, pos: u64) -> u64 {
        let rem = pos % self.modulus;
        if rem == 0 {
            0
        } else {
            self.modulus - rem
        }
    }
}

impl Construct for Aligned {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pad = self.padding_needed(stream.tell());
        if pad > 0 {
            stream
                .read(pad as usize)
                .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))?;
        }
        self.inner.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let pad = self.padding_needed(stream.tell());
        if pad > 0 {
            stream
                .write(&vec![0u8; pad as usize])
                .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))?;
        }
        self.inner.build(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        // The padding needed depends on the stream's starting position, which
        // isn't part of the context, so the total size can't be known statically.
        let _ = self.inner.sizeof(ctx)?;
        Err(sizeof_unknown(ctx.path()))
    }
}
