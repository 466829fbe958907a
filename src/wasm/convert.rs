//! JSON ↔ component-value conversion for the typed calling convention.
//!
//! Inbound, the declared parameter type drives the conversion: the payload
//! document must shape-match the type or the invocation is rejected before
//! the action runs. Outbound, values render generically; constructs with no
//! JSON rendering (resources, streams) are reported, not guessed at.

use serde_json::{Map, Number, Value};
use wasmtime::component::types::Type;
use wasmtime::component::Val;

/// Convert a JSON value into a component value of the declared type.
pub fn json_to_val(ty: &Type, json: &Value) -> Result<Val, String> {
    match ty {
        Type::Bool => json
            .as_bool()
            .map(Val::Bool)
            .ok_or_else(|| mismatch("bool", json)),
        Type::S8 => signed(json, i64::from(i8::MIN), i64::from(i8::MAX)).map(|n| Val::S8(n as i8)),
        Type::U8 => unsigned(json, u64::from(u8::MAX)).map(|n| Val::U8(n as u8)),
        Type::S16 => {
            signed(json, i64::from(i16::MIN), i64::from(i16::MAX)).map(|n| Val::S16(n as i16))
        }
        Type::U16 => unsigned(json, u64::from(u16::MAX)).map(|n| Val::U16(n as u16)),
        Type::S32 => {
            signed(json, i64::from(i32::MIN), i64::from(i32::MAX)).map(|n| Val::S32(n as i32))
        }
        Type::U32 => unsigned(json, u64::from(u32::MAX)).map(|n| Val::U32(n as u32)),
        Type::S64 => signed(json, i64::MIN, i64::MAX).map(Val::S64),
        Type::U64 => unsigned(json, u64::MAX).map(Val::U64),
        Type::Float32 => json
            .as_f64()
            .map(|f| Val::Float32(f as f32))
            .ok_or_else(|| mismatch("float32", json)),
        Type::Float64 => json
            .as_f64()
            .map(Val::Float64)
            .ok_or_else(|| mismatch("float64", json)),
        Type::Char => match json.as_str().map(|s| {
            let mut chars = s.chars();
            (chars.next(), chars.next())
        }) {
            Some((Some(c), None)) => Ok(Val::Char(c)),
            _ => Err(mismatch("char", json)),
        },
        Type::String => json
            .as_str()
            .map(|s| Val::String(s.to_string()))
            .ok_or_else(|| mismatch("string", json)),
        Type::List(list) => {
            let items = json.as_array().ok_or_else(|| mismatch("list", json))?;
            let elem_ty = list.ty();
            items
                .iter()
                .map(|item| json_to_val(&elem_ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Val::List)
        }
        Type::Record(record) => {
            let obj = json.as_object().ok_or_else(|| mismatch("record", json))?;
            let mut fields = Vec::with_capacity(record.fields().len());
            for field in record.fields() {
                let val = match obj.get(field.name) {
                    Some(v) => json_to_val(&field.ty, v)
                        .map_err(|e| format!("field {}: {e}", field.name))?,
                    None => match &field.ty {
                        // An absent field is only acceptable for option types.
                        Type::Option(_) => Val::Option(None),
                        _ => return Err(format!("missing required field {}", field.name)),
                    },
                };
                fields.push((field.name.to_string(), val));
            }
            Ok(Val::Record(fields))
        }
        Type::Tuple(tuple) => {
            let items = json.as_array().ok_or_else(|| mismatch("tuple", json))?;
            if items.len() != tuple.types().len() {
                return Err(format!(
                    "tuple expects {} elements, got {}",
                    tuple.types().len(),
                    items.len()
                ));
            }
            tuple
                .types()
                .zip(items.iter())
                .map(|(ty, item)| json_to_val(&ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Val::Tuple)
        }
        Type::Option(option) => match json {
            Value::Null => Ok(Val::Option(None)),
            other => json_to_val(&option.ty(), other).map(|v| Val::Option(Some(Box::new(v)))),
        },
        Type::Enum(en) => {
            let name = json.as_str().ok_or_else(|| mismatch("enum", json))?;
            if en.names().any(|n| n == name) {
                Ok(Val::Enum(name.to_string()))
            } else {
                Err(format!("{name} is not a case of the declared enum"))
            }
        }
        Type::Variant(variant) => {
            // `"case"` for payloadless cases, `{"case": payload}` otherwise.
            if let Some(name) = json.as_str() {
                let case = variant
                    .cases()
                    .find(|c| c.name == name)
                    .ok_or_else(|| format!("{name} is not a case of the declared variant"))?;
                return match case.ty {
                    None => Ok(Val::Variant(name.to_string(), None)),
                    Some(_) => Err(format!("case {name} requires a payload")),
                };
            }
            let obj = json.as_object().ok_or_else(|| mismatch("variant", json))?;
            let (name, payload) = obj.iter().next().ok_or("empty variant object")?;
            let case = variant
                .cases()
                .find(|c| c.name == name)
                .ok_or_else(|| format!("{name} is not a case of the declared variant"))?;
            match case.ty {
                Some(ty) => json_to_val(&ty, payload)
                    .map(|v| Val::Variant(name.clone(), Some(Box::new(v)))),
                None => Ok(Val::Variant(name.clone(), None)),
            }
        }
        other => Err(format!("unsupported parameter type {other:?}")),
    }
}

/// Render a component value as JSON.
pub fn val_to_json(val: &Val) -> Result<Value, String> {
    match val {
        Val::Bool(b) => Ok(Value::Bool(*b)),
        Val::S8(n) => Ok(Value::from(*n)),
        Val::U8(n) => Ok(Value::from(*n)),
        Val::S16(n) => Ok(Value::from(*n)),
        Val::U16(n) => Ok(Value::from(*n)),
        Val::S32(n) => Ok(Value::from(*n)),
        Val::U32(n) => Ok(Value::from(*n)),
        Val::S64(n) => Ok(Value::from(*n)),
        Val::U64(n) => Ok(Value::from(*n)),
        Val::Float32(f) => finite_number(f64::from(*f)),
        Val::Float64(f) => finite_number(*f),
        Val::Char(c) => Ok(Value::String(c.to_string())),
        Val::String(s) => Ok(Value::String(s.clone())),
        Val::List(items) | Val::Tuple(items) => items
            .iter()
            .map(val_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Val::Record(fields) => {
            let mut obj = Map::with_capacity(fields.len());
            for (name, v) in fields {
                obj.insert(name.clone(), val_to_json(v)?);
            }
            Ok(Value::Object(obj))
        }
        Val::Option(None) => Ok(Value::Null),
        Val::Option(Some(inner)) => val_to_json(inner),
        Val::Enum(name) => Ok(Value::String(name.clone())),
        Val::Variant(name, payload) => match payload {
            None => Ok(Value::String(name.clone())),
            Some(inner) => {
                let mut obj = Map::with_capacity(1);
                obj.insert(name.clone(), val_to_json(inner)?);
                Ok(Value::Object(obj))
            }
        },
        Val::Result(res) => {
            let (key, payload) = match res {
                Ok(p) => ("ok", p),
                Err(p) => ("error", p),
            };
            let rendered = match payload {
                Some(inner) => val_to_json(inner)?,
                None => Value::Null,
            };
            let mut obj = Map::with_capacity(1);
            obj.insert(key.to_string(), rendered);
            Ok(Value::Object(obj))
        }
        Val::Flags(names) => Ok(Value::Array(
            names.iter().map(|n| Value::String(n.clone())).collect(),
        )),
        other => Err(format!("value has no JSON rendering: {other:?}")),
    }
}

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expected {expected}, got {got}")
}

fn signed(json: &Value, min: i64, max: i64) -> Result<i64, String> {
    let n = json
        .as_i64()
        .ok_or_else(|| mismatch("integer", json))?;
    if n < min || n > max {
        return Err(format!("{n} is out of range for the declared integer type"));
    }
    Ok(n)
}

fn unsigned(json: &Value, max: u64) -> Result<u64, String> {
    let n = json
        .as_u64()
        .ok_or_else(|| mismatch("unsigned integer", json))?;
    if n > max {
        return Err(format!("{n} is out of range for the declared integer type"));
    }
    Ok(n)
}

fn finite_number(f: f64) -> Result<Value, String> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| format!("{f} has no JSON rendering"))
}
