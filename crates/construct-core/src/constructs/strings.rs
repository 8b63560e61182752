//! Byte↔text constructs with a framing policy: `StringConstruct`,
//! `PascalString`, `CString`, `Line`.

use crate::construct::{Construct, ConstructRef};
use crate::context::Context;
use crate::error::{ConstructError, Result};
use crate::stream::{ByteStream, Stream};
use crate::value::Value;

/// The CRLF line terminator, per the wire-form contract: the two bytes
/// `0x0D 0x0A`.
pub const CRLF: [u8; 2] = [0x0D, 0x0A];
/// The C-string terminator.
pub const NUL: u8 = 0x00;

/// A declared text encoding, backing the byte↔text conversion every string
/// construct performs.
#[derive(Debug, Clone, Copy)]
pub struct TextEncoding(&'static encoding_rs::Encoding);

impl TextEncoding {
    pub const UTF8: TextEncoding = TextEncoding(encoding_rs::UTF_8);
    pub const LATIN1: TextEncoding = TextEncoding(encoding_rs::WINDOWS_1252);

    fn decode(&self, bytes: &[u8]) -> anyhow::Result<String> {
        let (text, _, had_errors) = self.0.decode(bytes);
        if had_errors {
            anyhow::bail!("invalid {} byte sequence", self.0.name());
        }
        Ok(text.into_owned())
    }

    fn encode(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let (bytes, _, had_errors) = self.0.encode(text);
        if had_errors {
            anyhow::bail!("{:?} is not representable in {}", text, self.0.name());
        }
        Ok(bytes.into_owned())
    }
}

/// `Bytes(n)` whose value is decoded/encoded with the declared text encoding.
#[derive(Debug, Clone, Copy)]
pub struct StringConstruct {
    n: usize,
    encoding: TextEncoding,
}

impl StringConstruct {
    pub fn new(n: usize, encoding: TextEncoding) -> Self {
        Self { n, encoding }
    }
}

impl Construct for StringConstruct {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let pos = stream.tell();
        let bytes = stream.read(self.n).map_err(|_| ConstructError::unexpected_end(ctx.path(), pos))?;
        let text = self
            .encoding
            .decode(&bytes)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), pos, e))?;
        Ok(Value::Str(text))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let text = value
            .as_str()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "String expects a text value"))?;
        let bytes = self
            .encoding
            .encode(text)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), stream.tell(), e))?;
        if bytes.len() != self.n {
            return Err(ConstructError::length_mismatch(
                ctx.path(),
                stream.tell(),
                format!("encoded text is {} bytes, field is {}", bytes.len(), self.n),
            ));
        }
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, _ctx: &Context) -> Result<u64> {
        Ok(self.n as u64)
    }
}

/// Length-prefixed string: a `length` construct followed by that many
/// encoded bytes.
#[derive(Debug)]
pub struct PascalString {
    length: ConstructRef,
    encoding: TextEncoding,
}

impl PascalString {
    pub fn new(length: ConstructRef, encoding: TextEncoding) -> Self {
        Self { length, encoding }
    }
}

impl Construct for PascalString {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let len_value = self.length.parse(stream, ctx)?;
        let len = len_value
            .as_int()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "PascalString length must be an integer"))?
            as usize;
        let pos = stream.tell();
        let bytes = stream.read(len).map_err(|_| ConstructError::unexpected_end(ctx.path(), pos))?;
        let text = self
            .encoding
            .decode(&bytes)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), pos, e))?;
        Ok(Value::Str(text))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let text = value
            .as_str()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "PascalString expects a text value"))?;
        let bytes = self
            .encoding
            .encode(text)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), stream.tell(), e))?;
        self.length.build(&Value::Int(bytes.len() as i128), stream, ctx)?;
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Err(crate::construct::sizeof_unknown(ctx.path()))
    }
}

/// Null-terminated string: parse reads until the first `0x00`; build appends
/// one.
#[derive(Debug, Clone, Copy)]
pub struct CString {
    encoding: TextEncoding,
}

impl CString {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }
}

impl Construct for CString {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let start = stream.tell();
        let mut bytes = Vec::new();
        loop {
            let byte = stream
                .read(1)
                .map_err(|_| ConstructError::framing(ctx.path(), start, "CString has no terminating NUL before end of stream"))?[0];
            if byte == NUL {
                break;
            }
            bytes.push(byte);
        }
        let text = self
            .encoding
            .decode(&bytes)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), start, e))?;
        Ok(Value::Str(text))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let text = value
            .as_str()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "CString expects a text value"))?;
        let bytes = self
            .encoding
            .encode(text)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), stream.tell(), e))?;
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))?;
        stream
            .write(&[NUL])
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Err(crate::construct::sizeof_unknown(ctx.path()))
    }
}

/// Terminator is CRLF; parse reads until CRLF (`FramingError` if absent
/// before stream end); build appends CRLF; the decoded value excludes the
/// terminator.
#[derive(Debug, Clone, Copy)]
pub struct Line {
    encoding: TextEncoding,
}

impl Line {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    pub fn utf8() -> Self {
        Self::new(TextEncoding::UTF8)
    }
}

impl Construct for Line {
    fn parse(&self, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Value> {
        let start = stream.tell();
        let mut bytes = Vec::new();
        loop {
            let remaining = stream.remaining();
            if remaining == Some(0) {
                return Err(ConstructError::framing(ctx.path(), start, "Line has no CRLF terminator before end of stream"));
            }
            let byte = stream
                .read(1)
                .map_err(|_| ConstructError::framing(ctx.path(), start, "Line has no CRLF terminator before end of stream"))?[0];
            if byte == CRLF[0] {
                let pos = stream.tell();
                if stream.remaining() != Some(0) {
                    let maybe_lf = stream.read(1).map_err(|_| ConstructError::framing(ctx.path(), start, "Line terminator incomplete"))?[0];
                    if maybe_lf == CRLF[1] {
                        break;
                    } else {
                        let _ = stream.seek(pos);
                        bytes.push(byte);
                        continue;
                    }
                } else {
                    return Err(ConstructError::framing(ctx.path(), start, "Line has no CRLF terminator before end of stream"));
                }
            }
            bytes.push(byte);
        }
        let text = self
            .encoding
            .decode(&bytes)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), start, e))?;
        Ok(Value::Str(text))
    }

    fn build(&self, value: &Value, stream: &mut dyn Stream, ctx: &mut Context) -> Result<()> {
        let text = value
            .as_str()
            .ok_or_else(|| ConstructError::framing(ctx.path(), stream.tell(), "Line expects a text value"))?;
        let bytes = self
            .encoding
            .encode(text)
            .map_err(|e| ConstructError::adapter_failure(ctx.path(), stream.tell(), e))?;
        stream
            .write(&bytes)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))?;
        stream
            .write(&CRLF)
            .map_err(|_| ConstructError::unexpected_end(ctx.path(), stream.tell()))
    }

    fn sizeof(&self, ctx: &Context) -> Result<u64> {
        Err(crate::construct::sizeof_unknown(ctx.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_roundtrip() {
        let line = Line::utf8();
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(b"OK\r\n".to_vec());
        assert_eq!(line.parse(&mut stream, &mut ctx).unwrap(), Value::Str("OK".into()));

        let mut out = ByteStream::new();
        line.build(&Value::Str("OK".into()), &mut out, &mut ctx).unwrap();
        assert_eq!(out.into_bytes(), b"OK\r\n".to_vec());
    }

    #[test]
    fn line_missing_terminator_fails() {
        let line = Line::utf8();
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(b"OK".to_vec());
        let err = line.parse(&mut stream, &mut ctx).unwrap_err();
        assert!(matches!(err, ConstructError::FramingError { .. }));
    }

    #[test]
    fn cstring_roundtrip() {
        let cs = CString::new(TextEncoding::UTF8);
        let mut ctx = Context::new();
        let mut stream = ByteStream::from_bytes(b"hi\0trailing".to_vec());
        assert_eq!(cs.parse(&mut stream, &mut ctx).unwrap(), Value::Str("hi".into()));
        assert_eq!(stream.remaining(), Some(8));
    }
}
