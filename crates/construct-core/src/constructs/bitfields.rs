//! `BitFields`: a byte-aligned span packed into named sub-byte fields,
//! MSB first.

use crate::construct::Construct;
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::Stream;
use crate::value::{Record, Value};

/// Declares named bit-width fields packed MSB-first into whole bytes. The
/// widths must sum to a multiple of 8; this is checked once at construction,
/// not on every parse/build.
#[derive(Debug, Clone)]
pub struct BitFields {
    fields: Vec<(String, u32)>,
    total_bits: u32,
}

impl BitFields {
    pub fn try_new(fields: Vec<(impl Into<String>, u32)>) -> std::result::Result<Self, String> {
        let fields: Vec<(String, u32)> = fields.into_iter().map(|(n, w)| (n.into(), w)).collect();
        let total_bits: u32 = fields.iter().map(|(_, w)| w).sum();
        if total_bits == 0 || total_bits % 8 != 0 {
            return Err(format!(
                "BitFields widths must sum to a non-zero multiple of 8, got {total_bits}"
            ));
        }
        Ok(Self { fields, total_bits })
    }

    pub fn new(fields: Vec<(impl Into<String>, u32)>) -> Self {
        Self::try_new(fields).expect("invalid BitFields declaration")
    }

    fn n_bytes(&self) -> usize {
        (self.total_bits / 8) as usize
    }
}

impl Construct for BitFields {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let bytes = stream
            .read(self.n_bytes())
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), pos))?;

        let mut bits: u128 = 0;
        for b in &bytes {
            bits = (bits << 8) | (*b as u128);
        }

        let mut record = Record::new();
        let mut consumed = 0u32;
        for (name, width) in &self.fields {
            let shift = self.total_bits - consumed - width;
            let mask = if *width >= 128 { u128::MAX } else { (1u128 << width) - 1 };
            let value = (bits >> shift) & mask;
            record.insert(name.clone(), Value::Int(value as i128));
            consumed += width;
        }
        Ok(Value::Record(record))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let record = value
            .as_record()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "BitFields expects a record value"))?;

        let mut bits: u128 = 0;
        let mut consumed = 0u32;
        for (name, width) in &self.fields {
            let v = record
                .get(name)
                .and_then(Value::as_int)
                .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), format!("missing bit field {name:?}")))?;
            let max = if *width >= 128 { u128::MAX } else { (1u128 << width) - 1 };
            if v < 0 || (v as u128) > max {
                return Err(ConstructError::out_of_range(
                    ctx.path(),
                    stream.tell(),
                    format!("{v} does not fit in {width}-bit field {name:?}"),
                ));
            }
            let shift = self.total_bits - consumed - width;
            bits |= (v as u128) << shift;
            consumed += width;
        }

        let n = self.n_bytes();
        let mut out = vec![0u8; n];
        for (i, byte) in out.iter_mut().enumerate() {
            let shift = ((n - 1 - i) * 8) as u32;
            *byte = ((bits >> shift) & 0xFF) as u8;
        }
        stream
            .write(&out)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n_bytes() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::ByteStream;

    fn example() -> BitFields {
        BitFields::new(vec![("a", 3), ("b", 5)])
    }

    #[test]
    fn parses_msb_first() {
        let bf = example();
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(vec![0xA5]); // 1010_0101
        let value = bf.parse(&mut stream, &mut ctx).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Value::Int(0b101)));
        assert_eq!(record.get("b"), Some(&Value::Int(0b00101)));
    }

    #[test]
    fn build_roundtrips() {
        let bf = example();
        let mut ctx = Context::new();
        let mut record = Record::new();
        record.insert("a", Value::Int(0b101));
        record.insert("b", Value::Int(0b00101));
        let mut out = ByteStream::new();
        bf.build(&Value::Record(record), &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), vec![0xA5]);
    }

    #[test]
    fn build_out_of_range() {
        let bf = example();
        let mut ctx = Context::new();
        let mut record = Record::new();
        record.insert("a", Value::Int(8)); // only 3 bits available
        record.insert("b", Value::Int(0));
        let mut out = ByteStream::new();
        let err = bf.build(&Value::Record(record), &mut out, &mut ctx).unwrap_err();
        assert!(matches!(err, ConstructError::OutOfRange { .. }));
    }

    #[test]
    fn rejects_non_byte_aligned_widths() {
        assert!(BitFields::try_new(vec![("a", 3)]).is_err());
    }
}
