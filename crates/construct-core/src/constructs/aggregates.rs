//! Struct with ordered named fields, the `Contextual` deferred-parameter
//! wrapper, and the `Computed` virtual field.

use std::fmt;
use std::sync::Arc;

use crate::construct::{Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::{Record, Value};

/// Ordered list of `(field_name, construct)` pairs, parsed/built in
/// declaration order. Missing fields on build are only tolerated when the
/// field's own construct doesn't need the supplied value (`Const`,
/// `Padding`, `Computed`, or an `If` whose predicate turns out false), or
/// when the field's name starts with an underscore (internal framing the
/// user isn't expected to supply; build skips such a field entirely when
/// it's absent from the record). The first group is tolerated naturally,
/// since those constructs ignore the `Value` they're given; anything else
/// will fail with a typed error when handed `Value::Unit`.
#[derive(Debug)]
pub struct Struct {
    fields: Vec<(String, ConstructRef)>,
}

impl Struct {
    /// Declares a struct from an ordered field list, rejecting duplicate
    /// names.
    pub fn try_new(fields: Vec<(impl Into<String>, ConstructRef)>) -> std::result::Result<Self, String> {
        let fields: Vec<(String, ConstructRef)> = fields.into_iter().map(|(n, c)| (n.into(), c)).collect();
        let mut seen = std::collections::HashSet::new();
        for (name, _) in &fields {
            if !seen.insert(name.clone()) {
                return Err(format!("duplicate field name in Struct: {name}"));
            }
        }
        Ok(Self { fields })
    }

    pub fn new(fields: Vec<(impl Into<String>, ConstructRef)>) -> Self {
        Self::try_new(fields).expect("invalid Struct declaration")
    }

    pub(crate) fn parse_into(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        for (name, construct) in &self.fields {
            ctx.push_field(name.clone());
            let result = construct.parse(stream, ctx);
            ctx.pop_field();
            let value = result?;
            if !construct.is_embedded() {
                ctx.set(name.clone(), value);
            }
        }
        Ok(())
    }

    pub(crate) fn build_from(&self, record: &Record, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        for (name, construct) in &self.fields {
            ctx.push_field(name.clone());
            let result = if construct.is_embedded() {
                construct.build(&Value::Record(record.clone()), stream, ctx)
            } else if name.starts_with('_') && !record.contains(name) {
                // Internal framing field the user wasn't required to supply;
                // nothing to build for it.
                Ok(())
            } else {
                let value = record.get(name).cloned().unwrap_or(Value::Unit);
                ctx.set(name.clone(), value.clone());
                construct.build(&value, stream, ctx)
            };
            ctx.pop_field();
            result?;
        }
        Ok(())
    }
}

impl Construct for Struct {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let start_pos = stream.tell();
        ctx.push_scope();
        match self.parse_into(stream, ctx) {
            Ok(()) => Ok(Value::Record(ctx.pop_scope())),
            Err(e) => {
                ctx.pop_scope();
                let _ = stream.seek(start_pos);
                Err(e)
            }
        }
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let record = value.as_record().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Struct expects a record value")
        })?;
        let start_pos = stream.tell();
        ctx.push_scope();
        match self.build_from(record, stream, ctx) {
            Ok(()) => {
                ctx.pop_scope();
                Ok(())
            }
            Err(e) => {
                ctx.pop_scope();
                let _ = stream.seek(start_pos);
                Err(e)
            }
        }
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        let mut total = 0u64;
        for (_, construct) in &self.fields {
            total += construct.sizeof(ctx)?;
        }
        Ok(total)
    }
}

/// Flattens a nested [`Struct`]'s fields into the enclosing struct's own
/// scope instead of nesting them under one field name. Only `Struct`s can be
/// embedded (their value is always a record); other construct kinds aren't
/// accepted here because flattening anything else has no defined meaning.
#[derive(Debug)]
pub struct Embed {
    inner: Arc<Struct>,
}

impl Embed {
    pub fn new(inner: Arc<Struct>) -> Self {
        Self { inner }
    }
}

impl Construct for Embed {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        self.inner.parse_into(stream, ctx)?;
        Ok(Value::Unit)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let record = value.as_record().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Embed expects the enclosing record")
        })?;
        self.inner.build_from(record, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }

    fn is_embedded(&self) -> bool {
        true
    }
}

/// Late-binding wrapper: at parse/build/sizeof time, `constructor` is
/// invoked with the current context to produce the construct actually used
/// for this call: the mechanism for "the length of this field depends on a
/// previously parsed length field". The produced construct is never cached
/// across calls.
pub struct Contextual {
    constructor: Box<dyn Fn(&Context) -> Result<ConstructRef> + Send + Sync>,
}

impl Contextual {
    pub fn new(constructor: impl Fn(&Context) -> Result<ConstructRef> + Send + Sync + 'static) -> Self {
        Self {
            constructor: Box::new(constructor),
        }
    }
}

impl fmt::Debug for Contextual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contextual").finish_non_exhaustive()
    }
}

impl Construct for Contextual {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let inner = (self.constructor)(ctx)?;
        inner.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let inner = (self.constructor)(ctx)?;
        inner.build(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        let inner = (self.constructor)(ctx)?;
        inner.sizeof(ctx)
    }
}

/// Virtual field: parse evaluates `value_fn(ctx)` and writes it into the
/// scope under `name` without touching the stream; build does the same,
/// overriding any user-supplied value for `name` by policy. Size 0.
pub struct Computed {
    name: String,
    value_fn: Box<dyn Fn(&Context) -> Result<Value> + Send + Sync>,
}

impl Computed {
    pub fn new(name: impl Into<String>, value_fn: impl Fn(&Context) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            value_fn: Box::new(value_fn),
        }
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Construct for Computed {
    fn parse(&self, _stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let value = (self.value_fn)(ctx)?;
        ctx.set(self.name.clone(), value.clone());
        Ok(value)
    }

    fn build(&self, _value: &Value, _stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let value = (self.value_fn)(ctx)?;
        ctx.set(self.name.clone(), value);
        Ok(())
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::primitives::{Bytes, Const, Integer};
    use crate::stream::ByteStream;

    fn bmp_struct() -> Struct {
        Struct::new(vec![
            ("signature", Arc::new(Const::new(b"BMP".to_vec())) as ConstructRef),
            ("width", Arc::new(Integer::new(1)) as ConstructRef),
            ("height", Arc::new(Integer::new(1)) as ConstructRef),
            (
                "pixels",
                Arc::new(Contextual::new(|ctx: &Context| {
                    let w = ctx.get("width").and_then(Value::as_int).unwrap_or(0);
                    let h = ctx.get("height").and_then(Value::as_int).unwrap_or(0);
                    Ok(Arc::new(Bytes::new((w * h) as usize)) as ConstructRef)
                })) as ConstructRef,
            ),
        ])
    }

    #[test]
    fn bmp_scenario_parse() {
        let s = bmp_struct();
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(b"BMP\x03\x02\x07\x08\t\x0b\x0c\r".to_vec());
        let value = s.parse(&mut stream, &mut ctx).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("width"), Some(&Value::Int(3)));
        assert_eq!(record.get("height"), Some(&Value::Int(2)));
        assert_eq!(
            record.get("pixels"),
            Some(&Value::Bytes(b"\x07\x08\t\x0b\x0c\r".to_vec()))
        );
    }

    #[test]
    fn bmp_scenario_sizeof() {
        let s = bmp_struct();
        let mut ctx = Context::new();
        ctx.set("width", Value::Int(10));
        ctx.set("height", Value::Int(10));
        assert_eq!(s.sizeof(&ctx).unwrap(), 105);
    }

    #[test]
    fn bmp_scenario_roundtrip_build() {
        let s = bmp_struct();
        let mut ctx = Context::new();
        let mut record = Record::new();
        record.insert("signature", Value::Bytes(b"BMP".to_vec()));
        record.insert("width", Value::Int(3));
        record.insert("height", Value::Int(2));
        record.insert("pixels", Value::Bytes(b"\x07\x08\t\x0b\x0c\r".to_vec()));
        let mut out = ByteStream::new();
        s.build(&Value::Record(record), &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), b"BMP\x03\x02\x07\x08\t\x0b\x0c\r".to_vec());
    }

    #[test]
    fn bmp_scenario_pixels_group_into_rows_of_width() {
        use itertools::Itertools;

        // width is 3 for this scenario, so each row is one (u8, u8, u8) tuple;
        // mirrors the teacher's own `.tuples()` use for grouping flat channel
        // bytes into pixels in its texture converters.
        let s = bmp_struct();
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(b"BMP\x03\x02\x07\x08\t\x0b\x0c\r".to_vec());
        let value = s.parse(&mut stream, &mut ctx).unwrap();
        let record = value.as_record().unwrap();
        let pixels = record.get("pixels").and_then(Value::as_bytes).unwrap();

        let rows: Vec<(u8, u8, u8)> = pixels.iter().copied().tuples().collect();
        assert_eq!(rows, vec![(0x07, 0x08, 0x09), (0x0b, 0x0c, 0x0d)]);
    }

    #[test]
    fn underscore_prefixed_field_omitted_from_build_record_is_skipped() {
        let s = Struct::new(vec![
            ("width", Arc::new(Integer::new(1)) as ConstructRef),
            ("_reserved", Arc::new(Integer::new(2)) as ConstructRef),
        ]);
        let mut ctx = Context::new();
        let mut record = Record::new();
        record.insert("width", Value::Int(7));
        // "_reserved" is deliberately not supplied.
        let mut out = ByteStream::new();
        s.build(&Value::Record(record), &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), vec![7]);
    }

    #[test]
    fn underscore_prefixed_field_still_builds_when_supplied() {
        let s = Struct::new(vec![("_reserved", Arc::new(Integer::new(2)) as ConstructRef)]);
        let mut ctx = Context::new();
        let mut record = Record::new();
        record.insert("_reserved", Value::Int(0x0102));
        let mut out = ByteStream::new();
        s.build(&Value::Record(record), &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), vec![0x01, 0x02]);
    }

    #[test]
    fn computed_overrides_user_supplied_value_on_build() {
        let s = Struct::new(vec![
            ("a", Arc::new(Integer::new(1)) as ConstructRef),
            (
                "b",
                Arc::new(Computed::new("b", |ctx: &Context| {
                    Ok(Value::Int(ctx.get("a").and_then(Value::as_int).unwrap_or(0) * 2))
                })) as ConstructRef,
            ),
        ]);
        let mut ctx = Context::new();
        let mut record = Record::new();
        record.insert("a", Value::Int(5));
        record.insert("b", Value::Int(999)); // should be ignored; Computed wins
        let mut out = ByteStream::new();
        s.build_from(&record, &mut out, &mut ctx).unwrap();
        assert_eq!(ctx.current().get("b"), Some(&Value::Int(10)));
    }
}
