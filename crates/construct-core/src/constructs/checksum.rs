//! `Checksum`: verifies a parsed digest field against a hash of other
//! context data, and computes it on build.

use std::fmt;

use crate::construct::{Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Reads a digest with `field`, then calls `data_fn` to fetch the bytes the
/// digest is supposed to cover and `hash_fn` to compute the expected digest
/// from them. Parse fails with `ChecksumMismatch` if they disagree; build
/// always writes `hash_fn(data_fn(ctx))`, ignoring the supplied value (like
/// `Computed`, the checksum is derived, not stored).
pub struct Checksum {
    field: ConstructRef,
    hash_fn: Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>,
    data_fn: Box<dyn Fn(&Context) -> Result<Vec<u8>> + Send + Sync>,
}

impl Checksum {
    pub fn new(
        field: ConstructRef,
        hash_fn: impl Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
        data_fn: impl Fn(&Context) -> Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            field,
            hash_fn: Box::new(hash_fn),
            data_fn: Box::new(data_fn),
        }
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checksum").field("field", &self.field).finish_non_exhaustive()
    }
}

impl Construct for Checksum {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let found = self.field.parse(stream, ctx)?;
        let found_bytes = found
            .as_bytes()
            .ok_or_else(|| ConstructError::framing(ctx.path(), pos, "Checksum field must yield bytes"))?;
        let data = (self.data_fn)(ctx)?;
        let expected = (self.hash_fn)(&data);
        if expected != found_bytes {
            return Err(ConstructError::checksum_mismatch(ctx.path(), pos));
        }
        Ok(found)
    }

    fn build(&self, _value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let data = (self.data_fn)(ctx)?;
        let digest = (self.hash_fn)(&data);
        self.field.build(&Value::Bytes(digest), stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.field.sizeof(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::primitives::Bytes;
    use crate::stream::ByteStream;
    use std::sync::Arc;

    fn xor_hash(data: &[u8]) -> Vec<u8> {
        vec![data.iter().fold(0u8, |acc, b| acc ^ b)]
    }

    #[test]
    fn mismatch_on_parse() {
        let c = Checksum::new(
            Arc::new(Bytes::new(1)) as ConstructRef,
            xor_hash,
            |ctx: &Context| Ok(ctx.get("payload").and_then(Value::as_bytes).unwrap_or_default().to_vec()),
        );
        let mut ctx = Context::new();
        ctx.set("payload", Value::Bytes(vec![1, 2, 3]));
        let mut stream = ByteStream::from_bytes(vec![0xFF]);
        let err = c.parse(&mut stream, &mut ctx).unwrap_err();
        assert!(matches!(err, ConstructError::ChecksumMismatch { .. }));
    }

    #[test]
    fn build_computes_digest() {
        let c = Checksum::new(
            Arc::new(Bytes::new(1)) as ConstructRef,
            xor_hash,
            |ctx: &Context| Ok(ctx.get("payload").and_then(Value::as_bytes).unwrap_or_default().to_vec()),
        );
        let mut ctx = Context::new();
        ctx.set("payload", Value::Bytes(vec![1, 2, 3]));
        let mut out = ByteStream::new();
        c.build(&Value::Unit, &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), vec![1 ^ 2 ^ 3]);
    }
}
