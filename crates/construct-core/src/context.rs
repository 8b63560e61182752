//! Scoped mapping of field-name to parsed/building value, chained to the
//! parent scope.
//!
//! Each aggregate push a fresh scope for the duration of its own parse or
//! build call; lookups walk parent-ward. This is implemented as a plain
//! `Vec<Record>` stack rather than `Rc<RefCell<..>>` parent pointers: a
//! single parse/build call owns its `Context` outright, and a Struct only
//! ever needs to see scopes already on the stack above it, never reach back
//! in after the fact.

use crate::value::{Record, Value};

#[derive(Debug, Default)]
pub struct Context {
    scopes: Vec<Record>,
    /// Dotted field-name path from the root, used for error reporting only;
    /// independent of scope nesting (e.g. `Repeat` pushes an index without
    /// opening a new scope).
    path: Vec<String>,
    /// Mirrors `ParseOptions::debug`/`BuildOptions::debug` for the duration of
    /// a top-level call, so the `Debug` construct knows whether its capture
    /// path is enabled without the option threading through every `parse`/
    /// `build` signature.
    debug: bool,
}

impl Context {
    pub fn new() -> Self {
        Self {
            scopes: vec![Record::new()],
            path: Vec::new(),
            debug: false,
        }
    }

    /// Enables or disables the `Debug` construct's capture path for the rest
    /// of this call. Set once by the top-level `parse_bytes`/`to_bytes` entry
    /// points from `ParseOptions`/`BuildOptions`.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Record::new());
    }

    pub fn pop_scope(&mut self) -> Record {
        self.scopes
            .pop()
            .expect("pop_scope called without a matching push_scope")
    }

    pub fn push_field(&mut self, name: impl Into<String>) {
        self.path.push(name.into());
    }

    pub fn pop_field(&mut self) {
        self.path.pop();
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Writes into the innermost scope, per the context monotonicity invariant:
    /// once written, a field is visible to every later sibling and to every
    /// later sibling's build within the same scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.scopes
            .last_mut()
            .expect("context always has at least the root scope")
            .insert(name, value);
    }

    /// Looks a name up starting from the innermost scope, walking parent-ward.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn root(&self) -> &Record {
        &self.scopes[0]
    }

    pub fn current(&self) -> &Record {
        self.scopes.last().expect("context always has a scope")
    }

    pub fn current_len(&self) -> usize {
        self.current().len()
    }

    /// Discards scope keys written after `len`, used to undo a failed
    /// aggregate's partial writes (the transactional contract of the
    /// design's failure semantics).
    pub fn truncate_current(&mut self, len: usize) {
        self.scopes
            .last_mut()
            .expect("context always has a scope")
            .truncate(len);
    }
}
