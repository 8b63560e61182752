//! Worked end-to-end scenarios assembled purely from public `construct-core`
//! types. These are not part of the library: RESP is a user of the engine,
//! not a construct kind the engine ships.

use std::sync::Arc;

use construct_core::construct::{Construct, ConstructRef, Forward};
use construct_core::constructs::{Adapted, Bytes, Contextual, If, Line, RepeatExactly, Struct, Switch};
use construct_core::context::Context;
use construct_core::stream::ByteStream;
use construct_core::value::{Record, Value};

fn decimal_line() -> Adapted {
    Adapted::new(
        Arc::new(Line::utf8()) as ConstructRef,
        |v: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            let n = v.as_int().ok_or_else(|| anyhow::anyhow!("expected an integer value"))?;
            Ok(Value::Str(n.to_string()))
        },
        |v: Value, _ctx: &Context| -> anyhow::Result<Value> {
            let s = v.as_str().ok_or_else(|| anyhow::anyhow!("expected decimal text"))?;
            let n: i128 = s.parse()?;
            Ok(Value::Int(n))
        },
    )
}

/// `Struct {length, data, ending}` wrapped so the outside world only sees
/// the bulk payload (or `Unit` for a null bulk string), per worked scenario
/// 3.
fn resp_bulk_string() -> Adapted {
    let inner = Struct::new(vec![
        ("length", Arc::new(decimal_line()) as ConstructRef),
        (
            "data",
            Arc::new(If::new(
                |ctx: &Context| Ok(ctx.get("length").and_then(Value::as_int) != Some(-1)),
                Arc::new(Contextual::new(|ctx: &Context| {
                    let n = ctx.get("length").and_then(Value::as_int).unwrap_or(0);
                    Ok(Arc::new(Bytes::new(n.max(0) as usize)) as ConstructRef)
                })) as ConstructRef,
            )) as ConstructRef,
        ),
        (
            "ending",
            Arc::new(If::new(
                |ctx: &Context| Ok(ctx.get("length").and_then(Value::as_int) != Some(-1)),
                Arc::new(construct_core::constructs::Const::new(b"\r\n".to_vec())) as ConstructRef,
            )) as ConstructRef,
        ),
    ]);

    Adapted::new(
        Arc::new(inner) as ConstructRef,
        |value: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            let mut record = Record::new();
            match value {
                Value::Bytes(bytes) => {
                    record.insert("length", Value::Int(bytes.len() as i128));
                    record.insert("data", Value::Bytes(bytes.clone()));
                }
                Value::Unit => {
                    record.insert("length", Value::Int(-1));
                    record.insert("data", Value::Unit);
                }
                _ => anyhow::bail!("resp bulk string expects bytes or unit"),
            }
            record.insert("ending", Value::Unit);
            Ok(Value::Record(record))
        },
        |value: Value, _ctx: &Context| -> anyhow::Result<Value> {
            let record = value.as_record().ok_or_else(|| anyhow::anyhow!("expected a record"))?;
            if record.get("length").and_then(Value::as_int) == Some(-1) {
                Ok(Value::Unit)
            } else {
                Ok(record.get("data").cloned().unwrap_or(Value::Unit))
            }
        },
    )
}

/// Builds the recursive RESP message construct of worked scenario 4: a
/// one-byte type tag dispatches to a simple string, error, integer, or
/// array-of-messages body.
fn resp_message() -> ConstructRef {
    let forward = Forward::new();

    let tag_field = Adapted::new(
        Arc::new(Bytes::new(1)) as ConstructRef,
        |v: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            let s = v.as_str().ok_or_else(|| anyhow::anyhow!("tag expects a single-character string"))?;
            Ok(Value::Bytes(s.as_bytes().to_vec()))
        },
        |v: Value, _ctx: &Context| -> anyhow::Result<Value> {
            let bytes = v.as_bytes().ok_or_else(|| anyhow::anyhow!("tag bytes expected"))?.to_vec();
            Ok(Value::Str(String::from_utf8(bytes)?))
        },
    );

    let error_case = Adapted::new(
        Arc::new(Line::utf8()) as ConstructRef,
        |v: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            match v {
                Value::Tagged(label, inner) if label == "RedisError" => Ok((**inner).clone()),
                _ => anyhow::bail!("expected a RedisError tagged value"),
            }
        },
        |v: Value, _ctx: &Context| -> anyhow::Result<Value> { Ok(Value::Tagged("RedisError".to_string(), Box::new(v))) },
    );

    let array_forward = forward.clone();
    let array_struct = Struct::new(vec![
        ("count", Arc::new(decimal_line()) as ConstructRef),
        (
            "items",
            Arc::new(Contextual::new(move |ctx: &Context| {
                let n = ctx.get("count").and_then(Value::as_int).unwrap_or(0);
                Ok(Arc::new(RepeatExactly::new(array_forward.clone() as ConstructRef, n.max(0) as usize)) as ConstructRef)
            })) as ConstructRef,
        ),
    ]);
    let array_case = Adapted::new(
        Arc::new(array_struct) as ConstructRef,
        |value: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            let items = value.as_list().ok_or_else(|| anyhow::anyhow!("array body expects a list"))?;
            let mut record = Record::new();
            record.insert("count", Value::Int(items.len() as i128));
            record.insert("items", value.clone());
            Ok(Value::Record(record))
        },
        |value: Value, _ctx: &Context| -> anyhow::Result<Value> {
            let record = value.as_record().ok_or_else(|| anyhow::anyhow!("expected a record"))?;
            Ok(record.get("items").cloned().unwrap_or(Value::List(Vec::new())))
        },
    );

    let body_field = Switch::new(
        |ctx: &Context| Ok(ctx.get("tag").and_then(Value::as_str).unwrap_or_default().to_string()),
        vec![
            ("+", Arc::new(Line::utf8()) as ConstructRef),
            ("-", Arc::new(error_case) as ConstructRef),
            (":", Arc::new(decimal_line()) as ConstructRef),
            ("*", Arc::new(array_case) as ConstructRef),
        ],
        None,
    );

    let message_struct = Struct::new(vec![("tag", Arc::new(tag_field) as ConstructRef), ("body", Arc::new(body_field) as ConstructRef)]);

    let message_adapted = Adapted::new(
        Arc::new(message_struct) as ConstructRef,
        |value: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            let tag = match value {
                Value::List(_) => "*",
                Value::Tagged(label, _) if label == "RedisError" => "-",
                Value::Int(_) => ":",
                Value::Str(_) => "+",
                _ => anyhow::bail!("no RESP tag for {value:?}"),
            };
            let mut record = Record::new();
            record.insert("tag", Value::Str(tag.to_string()));
            record.insert("body", value.clone());
            Ok(Value::Record(record))
        },
        |value: Value, _ctx: &Context| -> anyhow::Result<Value> {
            let record = value.as_record().ok_or_else(|| anyhow::anyhow!("expected a record"))?;
            Ok(record.get("body").cloned().unwrap_or(Value::Unit))
        },
    );

    let message_ref: ConstructRef = Arc::new(message_adapted);
    forward.bind(message_ref.clone());
    message_ref
}

#[test]
fn resp_simple_string_scenario() {
    let line = Line::utf8();
    let mut ctx = Context::new();
    let mut stream = ByteStream::from_bytes(b"OK\r\n".to_vec());
    assert_eq!(line.parse(&mut stream, &mut ctx).unwrap(), Value::Str("OK".to_string()));

    let mut out = ByteStream::new();
    line.build(&Value::Str("OK".to_string()), &mut out, &mut ctx).unwrap();
    assert_eq!(out.into_bytes(), b"OK\r\n".to_vec());
}

#[test]
fn resp_bulk_string_scenario() {
    let bulk = resp_bulk_string();
    let mut ctx = Context::new();

    let mut stream = ByteStream::from_bytes(b"6\r\nfoobar\r\n".to_vec());
    assert_eq!(bulk.parse(&mut stream, &mut ctx).unwrap(), Value::Bytes(b"foobar".to_vec()));

    let mut stream = ByteStream::from_bytes(b"-1\r\n".to_vec());
    assert_eq!(bulk.parse(&mut stream, &mut ctx).unwrap(), Value::Unit);

    let mut out = ByteStream::new();
    bulk.build(&Value::Bytes(b"xx\r\nyy".to_vec()), &mut out, &mut ctx).unwrap();
    assert_eq!(out.into_bytes(), b"6\r\nxx\r\nyy\r\n".to_vec());
}

#[test]
fn resp_recursive_array_scenario() {
    let message = resp_message();
    let mut ctx = Context::new();
    let mut stream = ByteStream::from_bytes(b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Foo\r\n-Bar\r\n".to_vec());
    let value = message.parse(&mut stream, &mut ctx).unwrap();

    assert_eq!(
        value,
        Value::List(vec![
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            Value::List(vec![
                Value::Str("Foo".to_string()),
                Value::Tagged("RedisError".to_string(), Box::new(Value::Str("Bar".to_string()))),
            ]),
        ])
    );
    assert_eq!(stream.remaining(), Some(0));
}
