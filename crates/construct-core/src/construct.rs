//! The tri-operation contract every construct implements, plus the shared
//! plumbing (transactional retry, shared ownership, recursive references)
//! that construct variants build on.

use std::fmt::Debug;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::Value;

/// A composable codec over a declared value type: parse bytes into a value,
/// build a value into bytes, or compute the encoded size without I/O.
///
/// Constructs are immutable after creation and are shared via [`ConstructRef`]
/// (an `Arc`), so the same declaration can be used to parse, build, and
/// compute sizes concurrently from multiple threads.
pub trait Construct: Debug + Send + Sync {
    /// Consumes bytes starting at the stream's current position, returning a
    /// value and advancing the stream. On failure the stream position and
    /// context scope must be exactly as they were at entry.
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value>;

    /// Appends the encoding of `value` at the stream's current position and
    /// advances it. Same failure-rewind contract as `parse`.
    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()>;

    /// The exact encoded byte length under the given context, or
    /// `Err(ConstructError::SizeofUnknown)` if it depends on data not yet
    /// seen (e.g. a `Repeat` or an `If` whose predicate reads an absent key).
    fn sizeof(&self, ctx: &Context) -> Result<u64>;

    /// Whether an aggregate should flatten this construct's parsed record
    /// fields into its own scope rather than storing them under one field
    /// name. Only meaningful for constructs whose value is a `Value::Record`.
    fn is_embedded(&self) -> bool {
        false
    }
}

/// Constructs are shared, not cloned: a `Struct` holds `ConstructRef`s to its
/// fields' constructs, and the same construct can be reused across many
/// parse/build calls (and, since `Construct: Send + Sync`, across threads).
pub type ConstructRef = Arc<dyn Construct>;

/// Snapshots the stream position and the current context scope length,
/// invokes `f`, and rewinds both if `f` fails. This is the mechanical
/// realization of the transactional contract every construct boundary must
/// uphold: aggregates and adapters that perform more than one stream
/// operation per call wrap their body in this so a later failure never
/// leaves partial bytes or partial context writes behind.
pub fn transactional<T>(
    stream: &mut dyn Stream,
    ctx: &mut Context,
    f: impl FnOnce(&mut dyn Stream, &mut Context) -> Result<T>,
) -> Result<T> {
    let start_pos = stream.tell();
    let start_len = ctx.current_len();
    match f(stream, ctx) {
        Ok(v) => Ok(v),
        Err(e) => {
            let _ = stream.seek(start_pos);
            ctx.truncate_current(start_len);
            Err(e)
        }
    }
}

/// A late-bound reference to a construct that isn't defined yet, for
/// recursive or mutually recursive grammars (e.g. an array construct whose
/// element type is itself). Create the `Forward`, clone it into whatever
/// needs to refer to the not-yet-built construct, build the real construct,
/// then `bind` it in.
#[derive(Debug, Default)]
pub struct Forward {
    inner: OnceCell<ConstructRef>,
}

impl Forward {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: OnceCell::new(),
        })
    }

    /// Binds the real construct. Must be called exactly once before any
    /// parse/build/sizeof call reaches this `Forward`; panics otherwise,
    /// since an unbound forward reference is a construction-time bug, not a
    /// data-dependent failure.
    pub fn bind(&self, inner: ConstructRef) {
        self.inner
            .set(inner)
            .unwrap_or_else(|_| panic!("Forward already bound"));
    }

    fn inner(&self) -> &ConstructRef {
        self.inner
            .get()
            .expect("Forward used before being bound via Forward::bind")
    }
}

impl Construct for Forward {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        self.inner().parse(stream, ctx)
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        self.inner().build(value, stream, ctx)
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        self.inner().sizeof(ctx)
    }

    fn is_embedded(&self) -> bool {
        self.inner().is_embedded()
    }
}

/// Raises `SizeofUnknown` at the given path; used by constructs whose size is
/// data-dependent (`Repeat`, data-dependent `If`/`Switch`, etc).
pub fn sizeof_unknown(ctx_path: &[String]) -> ConstructError {
    ConstructError::sizeof_unknown(ctx_path)
}
