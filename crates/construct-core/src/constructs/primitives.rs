//! Fixed-shape leaf constructs: `Pass`, `Flag`, `Bytes`, `Integer`, `Float`,
//! `Padding`, `Const`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::construct::Construct;
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::Value;

fn stream_err(ctx: &Context, position: u64) -> ConstructError {
    ConstructError::unexpected_end(ctx.path(), position)
}

/// Parses to `Unit`, builds nothing, size 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pass;

impl Construct for Pass {
    fn parse(&self, _stream: &mut dyn Stream, _ctx: &mut Context) -> Result<Value> {
        Ok(Value::Unit)
    }

    fn build(&self, _value: &Value, _stream: &mut dyn Stream, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(0)
    }
}

/// One byte: zero is false, nonzero parses as true; builds `true` as `0x01`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flag;

impl Construct for Flag {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let byte = stream.read(1).map_err(|_| stream_err(ctx, pos))?[0];
        Ok(Value::Bool(byte != 0))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let b = value.as_bool().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Flag expects a boolean value")
        })?;
        stream
            .write(&[if b { 1 } else { 0 }])
            .map_err(|_| stream_err(ctx, stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(1)
    }
}

/// Fixed-length byte string of exactly `n` bytes.
#[derive(Debug, Clone, Copy)]
pub struct Bytes {
    pub n: usize,
}

impl Bytes {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Construct for Bytes {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let bytes = stream.read(self.n).map_err(|_| stream_err(ctx, pos))?;
        Ok(Value::Bytes(bytes))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let bytes = value.as_bytes().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Bytes expects a byte string value")
        })?;
        if bytes.len() != self.n {
            return Err(ConstructError::length_mismatch(
                ctx.path(),
                stream.tell(),
                format!("expected {} bytes, got {}", self.n, bytes.len()),
            ));
        }
        stream
            .write(bytes)
            .map_err(|_| stream_err(ctx, stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Fixed-width integer, 1 to 16 bytes wide, signed or unsigned, big- or
/// little-endian. Values are carried in [`Value::Int`] as `i128` regardless
/// of declared width; `build` range-checks against the declared width.
#[derive(Debug, Clone, Copy)]
pub struct Integer {
    pub width: usize,
    pub signed: bool,
    pub endian: Endian,
}

impl Integer {
    pub fn new(width: usize) -> Self {
        assert!((1..=16).contains(&width), "Integer width must be 1..=16 bytes");
        Self {
            width,
            signed: false,
            endian: Endian::Big,
        }
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    pub fn little_endian(mut self) -> Self {
        self.endian = Endian::Little;
        self
    }

    fn bits(&self) -> u32 {
        (self.width * 8) as u32
    }

    fn range(&self) -> (i128, i128) {
        let bits = self.bits();
        if self.signed {
            if bits >= 128 {
                (i128::MIN, i128::MAX)
            } else {
                (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
            }
        } else if bits >= 127 {
            (0, i128::MAX)
        } else {
            (0, (1i128 << bits) - 1)
        }
    }

    fn decode(&self, raw: &[u8]) -> i128 {
        let mut be = raw.to_vec();
        if self.endian == Endian::Little {
            be.reverse();
        }
        let mut value: i128 = 0;
        for b in &be {
            value = (value << 8) | (*b as i128);
        }
        if self.signed {
            let bits = self.bits();
            if bits < 128 {
                let sign_bit = 1i128 << (bits - 1);
                if value & sign_bit != 0 {
                    value -= 1i128 << bits;
                }
            }
        }
        value
    }

    fn encode(&self, value: i128) -> Vec<u8> {
        let mut be = Vec::with_capacity(self.width);
        for i in 0..self.width {
            let shift = ((self.width - 1 - i) * 8) as u32;
            be.push(((value >> shift) & 0xFF) as u8);
        }
        if self.endian == Endian::Little {
            be.reverse();
        }
        be
    }
}

impl Construct for Integer {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let raw = stream.read(self.width).map_err(|_| stream_err(ctx, pos))?;
        Ok(Value::Int(self.decode(&raw)))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let v = value.as_int().ok_or_else(|| {
            ConstructError::framing(ctx.path(), stream.tell(), "Integer expects an integer value")
        })?;
        let (min, max) = self.range();
        if v < min || v > max {
            return Err(ConstructError::out_of_range(
                ctx.path(),
                stream.tell(),
                format!("{v} does not fit in a {}-byte {} integer", self.width, if self.signed { "signed" } else { "unsigned" }),
            ));
        }
        stream
            .write(&self.encode(v))
            .map_err(|_| stream_err(ctx, stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.width as u64)
    }
}

/// IEEE float, 4 or 8 bytes wide.
#[derive(Debug, Clone, Copy)]
pub struct Float {
    pub width: usize,
    pub endian: Endian,
}

impl Float {
    pub fn new(width: usize) -> Self {
        assert!(width == 4 || width == 8, "Float width must be 4 or 8 bytes");
        Self {
            width,
            endian: Endian::Big,
        }
    }

    pub fn little_endian(mut self) -> Self {
        self.endian = Endian::Little;
        self
    }
}

impl Construct for Float {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let raw = stream.read(self.width).map_err(|_| stream_err(ctx, pos))?;
        let v = match (self.width, self.endian) {
            (4, Endian::Big) => BigEndian::read_f32(&raw) as f64,
            (4, Endian::Little) => LittleEndian::read_f32(&raw) as f64,
            (8, Endian::Big) => BigEndian::read_f64(&raw),
            (8, Endian::Little) => LittleEndian::read_f64(&raw),
            _ => unreachable!("Float width validated at construction"),
        };
        Ok(Value::Float(v))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let v = match value {
            Value::Float(v) => *v,
            Value::Int(i) => *i as f64,
            _ => {
                return Err(ConstructError::framing(
                    ctx.path(),
                    stream.tell(),
                    "Float expects a numeric value",
                ))
            }
        };
        let mut buf = vec![0u8; self.width];
        match (self.width, self.endian) {
            (4, Endian::Big) => BigEndian::write_f32(&mut buf, v as f32),
            (4, Endian::Little) => LittleEndian::write_f32(&mut buf, v as f32),
            (8, Endian::Big) => BigEndian::write_f64(&mut buf, v),
            (8, Endian::Little) => LittleEndian::write_f64(&mut buf, v),
            _ => unreachable!("Float width validated at construction"),
        }
        stream
            .write(&buf)
            .map_err(|_| stream_err(ctx, stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.width as u64)
    }
}

/// Parses/skips `n` bytes ignoring content; builds `n` zero bytes.
#[derive(Debug, Clone, Copy)]
pub struct Padding {
    pub n: usize,
}

impl Padding {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Construct for Padding {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        stream.read(self.n).map_err(|_| stream_err(ctx, pos))?;
        Ok(Value::Unit)
    }

    fn build(&self, _value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        stream
            .write(&vec![0u8; self.n])
            .map_err(|_| stream_err(ctx, stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n as u64)
    }
}

/// Builds fixed literal bytes; on parse, reads the same count and fails with
/// `ConstMismatch` if the bytes read differ.
#[derive(Debug, Clone)]
pub struct Const {
    pub bytes: Vec<u8>,
}

impl Const {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl Construct for Const {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let found = stream
            .read(self.bytes.len())
            .map_err(|_| stream_err(ctx, pos))?;
        if found != self.bytes {
            return Err(ConstructError::const_mismatch(
                ctx.path(),
                pos,
                self.bytes.clone(),
                found,
            ));
        }
        Ok(Value::Bytes(found))
    }

    fn build(&self, _value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        stream
            .write(&self.bytes)
            .map_err(|_| stream_err(ctx, stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }
}
