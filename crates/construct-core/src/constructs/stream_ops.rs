//! Stream position manipulators: `Offset`, `Tell`.

use crate::construct::{Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Seeks to an absolute offset, delegates to `inner`, then restores the
/// original position. Size is always 0: an `Offset` field doesn't advance
/// the enclosing struct's own layout.
#[derive(Debug)]
pub struct Offset {
    absolute: u64,
    inner: ConstructRef,
}

impl Offset {
    pub fn new(absolute: u64, inner: ConstructRef) -> Self {
        Self { absolute, inner }
    }
}

impl Construct for Offset {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let return_to = stream.tell();
        stream
            .seek(self.absolute)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), self.absolute))?;
        let result = self.inner.parse(stream, ctx);
        let _ = stream.seek(return_to);
        result
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let return_to = stream.tell();
        stream
            .seek(self.absolute)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), self.absolute))?;
        let result = self.inner.build(value, stream, ctx);
        let _ = stream.seek(return_to);
        result
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

/// Parses to the current stream position as an integer, consuming no bytes.
/// On build, consumes no bytes and ignores the supplied value, per the
/// "computed from position, not stored data" nature of a tell field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tell;

impl Construct for Tell {
    fn parse(&self, stream: &mut dyn Stream, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Int(stream.tell() as i128))
    }

    fn build(&self, _value: &Value, _stream: &mut dyn Stream, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::primitives::Bytes;
    use crate::stream::ByteStream;
    use std::sync::Arc;

    #[test]
    fn offset_reads_then_restores_position() {
        let off = Offset::new(2, Arc::new(Bytes::new(2)) as ConstructRef);
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(vec![0, 1, 2, 3, 4, 5]);
        stream.seek(1).unwrap();
        let value = off.parse(&mut stream, &mut ctx).unwrap();
        assert_eq!(value, Value::Bytes(vec![2, 3]));
        assert_eq!(stream.tell(), 1);
    }

    #[test]
    fn tell_reports_position_without_consuming() {
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(vec![9, 9, 9]);
        stream.seek(2).unwrap();
        assert_eq!(Tell.parse(&mut stream, &mut ctx).unwrap(), Value::Int(2));
        assert_eq!(stream.tell(), 2);
    }
}
