//! The worked example formats from construct-core's documentation,
//! reassembled here as a CLI user of the library (schemas like these are
//! not part of construct-core itself).

use std::sync::Arc;

use construct_core::construct::{Construct, ConstructRef, Forward};
use construct_core::constructs::{Adapted, BitFields, Bytes, Const, Contextual, If, Integer, Line, RepeatExactly, Struct, Switch};
use construct_core::context::Context;
use construct_core::value::{Record, Value};

pub fn bmp_record() -> ConstructRef {
    Arc::new(Struct::new(vec![
        ("signature", Arc::new(Const::new(b"BMP".to_vec())) as ConstructRef),
        ("width", Arc::new(Integer::new(1)) as ConstructRef),
        ("height", Arc::new(Integer::new(1)) as ConstructRef),
        (
            "pixels",
            Arc::new(Contextual::new(|ctx: &Context| {
                let w = ctx.get("width").and_then(Value::as_int).unwrap_or(0);
                let h = ctx.get("height").and_then(Value::as_int).unwrap_or(0);
                Ok(Arc::new(Bytes::new((w * h).max(0) as usize)) as ConstructRef)
            })) as ConstructRef,
        ),
    ]))
}

pub fn resp_simple_string() -> ConstructRef {
    Arc::new(Line::utf8())
}

fn decimal_line() -> Adapted {
    Adapted::new(
        Arc::new(Line::utf8()) as ConstructRef,
        |v: &Value, _ctx: &Context| -> anyhow::Result<Value> {
            let n = v.as_int().ok_or_else(|| anyhow::anyhow!("expected an integer value"))?;
            Ok(Value::Str(n.to_string()))
        },
        |v: Value, _ctx: &Context| -> anyhow::Result<Value> {
            let s = v.as_str().ok_or_else(|| anyhow::anyhow!("expected decimal text"))?;
            Ok(Value::Int(s.parse()?))
        },
    )
}

pub fn resp_bulk_string() -> ConstructRef {
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
                Arc::new(Const::new(b"\r\n".to_vec())) as ConstructRef,
            )) as ConstructRef,
        ),
    ]);

    Arc::new(Adapted::new(
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
    ))
}

pub fn resp_message() -> ConstructRef {
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

pub fn bitfields() -> ConstructRef {
    Arc::new(BitFields::new(vec![("a", 3), ("b", 5)]))
}
