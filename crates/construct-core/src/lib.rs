//! A declarative binary data processing engine: describe a binary layout
//! once as a tree of [`Construct`](construct::Construct)s and get parsing,
//! building, and size computation from the same declaration.
//!
//! Example format definitions (network protocols, file formats) are not
//! part of this crate: they are *users* of it, found under
//! `crates/construct-core/tests/` and `crates/construct-cli`.

pub mod construct;
pub mod constructs;
pub mod context;
pub mod error;
pub mod macros;
pub mod options;
pub mod stream;
pub mod value;

pub use construct::{Construct, ConstructRef, Forward};
pub use context::Context;
pub use error::{ConstructError, Result};
pub use options::{BuildOptions, ParseOptions};
pub use stream::{ByteStream, Stream};
pub use value::{Record, Value};

/// Parses `bytes` with `construct` against a fresh root context. With
/// `options.strict_end` set, trailing unconsumed bytes fail with
/// `UnexpectedEnd`; by default trailing bytes are permitted, per the
/// engine's permissive-by-default top-level parse policy. `options.debug`
/// enables the `Debug` construct's capture path for the duration of this call.
pub fn parse_bytes(bytes: impl Into<Vec<u8>>, construct: &dyn Construct, options: &ParseOptions) -> Result<Value> {
    let mut stream = ByteStream::from_bytes(bytes);
    let mut ctx = Context::new();
    ctx.set_debug(options.debug);
    let value = construct.parse(&mut stream, &mut ctx)?;
    if options.strict_end && stream.remaining() != Some(0) {
        return Err(ConstructError::unexpected_end(ctx.path(), stream.tell()));
    }
    Ok(value)
}

/// Builds `value` with `construct` against a fresh root context, returning
/// the accumulated bytes. `options.debug` enables the `Debug` construct's
/// capture path for the duration of this call.
pub fn to_bytes(value: &Value, construct: &dyn Construct, options: &BuildOptions) -> Result<Vec<u8>> {
    let mut stream = ByteStream::new();
    let mut ctx = Context::new();
    ctx.set_debug(options.debug);
    construct.build(value, &mut stream, &mut ctx)?;
    Ok(stream.into_bytes())
}

/// Computes the encoded size of `construct` under a fresh root context,
/// equivalent to calling `construct.sizeof` directly but matching the other
/// two top-level convenience functions' signature shape.
pub fn sizeof(construct: &dyn Construct, ctx: &Context) -> Result<u64> {
    construct.sizeof(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::Bytes;
    use std::sync::Arc;

    fn two_bytes() -> ConstructRef {
        Arc::new(Bytes::new(2))
    }

    #[test]
    fn permissive_by_default_allows_trailing_bytes() {
        let value = parse_bytes(vec![1, 2, 3], two_bytes().as_ref(), &ParseOptions::default()).unwrap();
        assert_eq!(value, Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn strict_end_rejects_trailing_bytes() {
        let err = parse_bytes(vec![1, 2, 3], two_bytes().as_ref(), &ParseOptions::strict()).unwrap_err();
        assert!(matches!(err, ConstructError::UnexpectedEnd { .. }));
    }

    #[test]
    fn strict_end_accepts_exact_consumption() {
        let value = parse_bytes(vec![1, 2], two_bytes().as_ref(), &ParseOptions::strict()).unwrap();
        assert_eq!(value, Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn to_bytes_and_sizeof_agree_with_parse_bytes() {
        let construct = two_bytes();
        let value = Value::Bytes(vec![9, 9]);
        let bytes = to_bytes(&value, construct.as_ref(), &BuildOptions::default()).unwrap();
        assert_eq!(bytes, vec![9, 9]);
        assert_eq!(sizeof(construct.as_ref(), &Context::new()).unwrap(), 2);
    }
}
