//! `Lazy`: defers parsing a field's payload until explicitly forced.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::construct::{Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::{ByteStream, Stream};
use crate::value::Value;

/// The cached, not-yet-decoded payload a [`Lazy`] field parses to. Holds the
/// raw bytes and the construct that knows how to turn them into a real
/// value, so a caller can selectively force only the fields it needs instead
/// of paying to decode every large payload up front.
pub struct LazyHandle {
    raw: Vec<u8>,
    inner: ConstructRef,
}

impl LazyHandle {
    /// Decodes the cached bytes with the declared inner construct.
    pub fn force(&self, ctx: &mut Context) -> Result<Value> {
        let mut window = ByteStream::from_bytes(self.raw.clone());
        self.inner.parse(&mut window, ctx)
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl fmt::Debug for LazyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyHandle").field("len", &self.raw.len()).finish()
    }
}

/// Reads exactly `n` bytes and wraps them, unparsed, in a
/// [`Value::Arbitrary`] holding a [`LazyHandle`] (parsing `inner` against
/// those bytes is deferred until [`LazyHandle::force`] is called). Building
/// accepts either a previously-parsed `LazyHandle` (its raw bytes are
/// written back verbatim) or a real value to encode with `inner`.
#[derive(Debug)]
pub struct Lazy {
    n: usize,
    inner: ConstructRef,
}

impl Lazy {
    pub fn new(n: usize, inner: ConstructRef) -> Self {
        Self { n, inner }
    }
}

impl Construct for Lazy {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let raw = stream.read(self.n).map_err(|_| ConstructError::unexpected_end(ctx.path(), pos))?;
        let handle: Arc<dyn Any + Send + Sync> = Arc::new(LazyHandle {
            raw,
            inner: self.inner.clone(),
        });
        Ok(Value::Arbitrary(handle))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        if let Value::Arbitrary(any) = value {
            if let Some(handle) = any.downcast_ref::<LazyHandle>() {
                if handle.raw.len() != self.n {
                    return Err(ConstructError::length_mismatch(
                        ctx.path(),
                        stream.tell(),
                        format!("lazy payload is {} bytes, field is {}", handle.raw.len(), self.n),
                    ));
                }
                return stream
                    .write(&handle.raw)
                    .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()));
            }
        }
        let mut buffer = ByteStream::new();
        self.inner.build(value, &mut buffer, ctx)?;
        let bytes = buffer.into_bytes();
        if bytes.len() != self.n {
            return Err(ConstructError::length_mismatch(
                ctx.path(),
                stream.tell(),
                format!("encoded payload is {} bytes, field is {}", bytes.len(), self.n),
            ));
        }
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n as u64)
    }
}
