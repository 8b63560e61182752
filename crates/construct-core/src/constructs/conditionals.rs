//! `If`, `Switch`, `Enum`, `Raise`.

use std::fmt;

use crate::construct::{sizeof_unknown, Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::Value;

/// Evaluates `predicate` against the context; if true, delegates to `inner`,
/// else parse yields `Unit` and build consumes nothing.
pub struct If {
    predicate: Box<dyn Fn(&Context) -> Result<bool> + Send + Sync>,
    inner: ConstructRef,
}

impl If {
    pub fn new(predicate: impl Fn(&Context) -> Result<bool> + Send + Sync + 'static, inner: ConstructRef) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner,
        }
    }
}

impl fmt::Debug for If {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("If").field("inner", &self.inner).finish_non_exhaustive()
    }
}

impl Construct for If {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        if (self.predicate)(ctx)? {
            self.inner.parse(stream, ctx)
        } else {
            Ok(Value::Unit)
        }
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        if (self.predicate)(ctx)? {
            self.inner.build(value, stream, ctx)
        } else {
            Ok(())
        }
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        match (self.predicate)(ctx) {
            Ok(true) => self.inner.sizeof(ctx),
            Ok(false) => Ok(0),
            Err(_) => Err(sizeof_unknown(ctx.path())),
        }
    }
}

/// Evaluates `selector` against the context and dispatches to the matching
/// case by key. Fails with `SwitchNoMatch` on both parse and build if no
/// case matches and no `default` was given.
pub struct Switch {
    selector: Box<dyn Fn(&Context) -> Result<String> + Send + Sync>,
    cases: Vec<(String, ConstructRef)>,
    default: Option<ConstructRef>,
}

impl Switch {
    pub fn new(
        selector: impl Fn(&Context) -> Result<String> + Send + Sync + 'static,
        cases: Vec<(impl Into<String>, ConstructRef)>,
        default: Option<ConstructRef>,
    ) -> Self {
        Self {
            selector: Box::new(selector),
            cases: cases.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            default,
        }
    }

    fn case_for(&self, key: &str) -> Option<&ConstructRef> {
        self.cases
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| c)
            .or(self.default.as_ref())
    }
}

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switch")
            .field("cases", &self.cases.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

impl Construct for Switch {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let key = (self.selector)(ctx)?;
        let construct = self
            .case_for(&key)
            .ok_or_else(|| ConstructError::switch_no_match(ctx.path(), stream.tell()))?;
        construct.parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let key = (self.selector)(ctx)?;
        let construct = self
            .case_for(&key)
            .ok_or_else(|| ConstructError::switch_no_match(ctx.path(), stream.tell()))?;
        construct.build(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        let key = (self.selector)(ctx).map_err(|_| sizeof_unknown(ctx.path()))?;
        let construct = self
            .case_for(&key)
            .ok_or_else(|| ConstructError::switch_no_match(ctx.path(), 0))?;
        construct.sizeof(ctx)
    }
}

/// Bijection between raw values and string labels. Parse returns the label
/// (`UnknownEnumValue` on an unmapped raw value); build accepts a label
/// (`UnknownEnumLabel` on an unmapped label).
pub struct Enum {
    inner: ConstructRef,
    mapping: Vec<(Value, String)>,
}

impl Enum {
    pub fn new(inner: ConstructRef, mapping: Vec<(Value, impl Into<String>)>) -> Self {
        Self {
            inner,
            mapping: mapping.into_iter().map(|(v, l)| (v, l.into())).collect(),
        }
    }

    fn label_for(&self, raw: &Value) -> Option<&str> {
        self.mapping.iter().find(|(v, _)| v == raw).map(|(_, l)| l.as_str())
    }

    fn raw_for(&self, label: &str) -> Option<&Value> {
        self.mapping.iter().find(|(_, l)| l == label).map(|(v, _)| v)
    }
}

impl fmt::Debug for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enum")
            .field("labels", &self.mapping.iter().map(|(_, l)| l).collect::<Vec<_>>())
            .finish()
    }
}

impl Construct for Enum {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let raw = self.inner.parse(stream, ctx)?;
        let label = self.label_for(&raw).ok_or_else(|| {
            ConstructError::unknown_enum_value(ctx.path(), stream.tell(), format!("{raw:?} has no label"))
        })?;
        Ok(Value::Str(label.to_string()))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let label = value.as_str().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Enum expects a label string value")
        })?;
        let raw = self
            .raw_for(label)
            .cloned()
            .ok_or_else(|| ConstructError::unknown_enum_label(ctx.path(), format!("{label:?} is not mapped")))?;
        self.inner.build(&raw, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner.sizeof(ctx)
    }
}

/// Always fails with the stated error; useful as a `Switch` default to
/// forbid unknown variants.
pub struct Raise {
    message: Box<dyn Fn(&Context) -> String + Send + Sync>,
}

impl Raise {
    pub fn new(message: impl Fn(&Context) -> String + Send + Sync + 'static) -> Self {
        Self {
            message: Box::new(message),
        }
    }

    pub fn with_message(message: impl Into<String> + Clone + Send + Sync + 'static) -> Self {
        Self::new(move |_| message.clone().into())
    }
}

impl fmt::Debug for Raise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raise").finish_non_exhaustive()
    }
}

impl Construct for Raise {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        Err(ConstructError::raised(ctx.path(), stream.tell(), (self.message)(ctx)))
    }

    fn build(&self, _value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        Err(ConstructError::raised(ctx.path(), stream.tell(), (self.message)(ctx)))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Err(ConstructError::raised(ctx.path(), 0, (self.message)(ctx)))
    }
}
