//! Seekable byte source/sink with position tracking.
//!
//! Unlike `zenit_lvl_core`'s node reader (which drives an external
//! `Read + Seek` file), this engine's streams are always an in-memory
//! buffer: the whole point of a construct is to be usable for both parsing
//! and building without the caller needing two different I/O types. A single
//! [`ByteStream`] backs both directions.

/// Raw, path-less stream failure. Constructs enrich this with a field path
/// and position before surfacing it to the caller as a [`crate::error::ConstructError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEnd;

pub type StreamResult<T> = std::result::Result<T, StreamEnd>;

/// The stream contract every construct parses from and builds into: `read`,
/// `write`, `tell`, `seek`. Both directions are seekable, per the design's
/// unified stream model.
pub trait Stream {
    fn read(&mut self, n: usize) -> StreamResult<Vec<u8>>;
    fn write(&mut self, bytes: &[u8]) -> StreamResult<()>;
    fn tell(&self) -> u64;
    fn seek(&mut self, pos: u64) -> StreamResult<()>;
    /// Bytes left to read from the current position, if known (used by
    /// `Repeat`'s greedy loop and by strict-end checking).
    fn remaining(&self) -> Option<u64>;
}

/// A growable byte buffer used uniformly as both the input stream handed to
/// `parse` and the output stream handed to `build`. Seeking past the current
/// end and then writing fills the gap with zero bytes; seeking past the end
/// and only reading fails with [`StreamEnd`].
#[derive(Debug, Clone, Default)]
pub struct ByteStream {
    buf: Vec<u8>,
    pos: usize,
}

impl ByteStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: bytes.into(),
            pos: 0,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Stream for ByteStream {
    fn read(&mut self, n: usize) -> StreamResult<Vec<u8>> {
        let end = self.pos.checked_add(n).ok_or(StreamEnd)?;
        if end > self.buf.len() {
            return Err(StreamEnd);
        }
        let out = self.buf[self.pos..end].to_vec();
        self.pos = end;
        Ok(out)
    }

    fn write(&mut self, bytes: &[u8]) -> StreamResult<()> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos as u64
    }

    fn seek(&mut self, pos: u64) -> StreamResult<()> {
        self.pos = pos as usize;
        Ok(())
    }

    fn remaining(&self) -> Option<u64> {
        Some(self.buf.len().saturating_sub(self.pos) as u64)
    }
}
