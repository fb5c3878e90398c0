//! Shape helpers for Move object JSON.
//!
//! Fullnodes render structs either nested (`{ "type": .., "fields": {..} }`)
//! or flat, and u64 values as numbers or decimal strings. These helpers
//! accept both and report mismatches as [`DecodeError`].

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Object {0} has no readable content")]
    NoContent(String),

    #[error("Missing field `{0}`")]
    MissingField(String),

    #[error("Field `{field}` is not {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },
}

impl DecodeError {
    pub(crate) fn invalid(field: &str, expected: &'static str) -> Self {
        DecodeError::InvalidField {
            field: field.to_string(),
            expected,
        }
    }
}

/// Unwrap `{ fields: {..} }` once, returning the struct's field map.
pub fn struct_fields<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    let inner = value.get("fields").unwrap_or(value);
    inner
        .as_object()
        .ok_or_else(|| DecodeError::invalid(context, "a struct"))
}

pub fn required<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value, DecodeError> {
    fields
        .get(name)
        .ok_or_else(|| DecodeError::MissingField(name.to_string()))
}

pub fn string(fields: &Map<String, Value>, name: &str) -> Result<String, DecodeError> {
    required(fields, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DecodeError::invalid(name, "a string"))
}

/// String field that may be absent or null.
pub fn optional_string(fields: &Map<String, Value>, name: &str) -> Result<Option<String>, DecodeError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => move_option_string(value)
            .map_err(|_| DecodeError::invalid(name, "a string or option")),
    }
}

pub fn as_u64(value: &Value, name: &str) -> Result<u64, DecodeError> {
    value
        .as_u64()
        .or_else(|| value.as_str()?.trim().parse().ok())
        .ok_or_else(|| DecodeError::invalid(name, "a u64"))
}

pub fn u64_field(fields: &Map<String, Value>, name: &str) -> Result<u64, DecodeError> {
    as_u64(required(fields, name)?, name)
}

pub fn u64_or_default(fields: &Map<String, Value>, name: &str) -> Result<u64, DecodeError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => as_u64(value, name),
    }
}

pub fn array<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a [Value], DecodeError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(&[]),
        Some(value) => value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| DecodeError::invalid(name, "an array")),
    }
}

/// Decode a Move `Option<String>` in any of its JSON renderings:
/// a plain string, `{ vec: [..] }` or `{ fields: { vec: [..] } }`.
pub fn move_option_string(value: &Value) -> Result<Option<String>, DecodeError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Object(_) => {
            let fields = struct_fields(value, "option")?;
            let items = array(fields, "vec")?;
            match items.first() {
                None => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(DecodeError::invalid("vec", "a string")),
            }
        }
        _ => Err(DecodeError::invalid("option", "a string or option")),
    }
}

/// Decode a `Balance<T>` in any of its renderings: a bare u64, `{ value }`
/// or `{ fields: { value } }`.
pub fn balance(value: &Value, name: &str) -> Result<u64, DecodeError> {
    match value {
        Value::Object(_) => u64_field(struct_fields(value, name)?, "value"),
        other => as_u64(other, name),
    }
}

/// Object id of a `UID` field: `"0x.."`, `{ id: "0x.." }` or nested under `fields`.
pub fn uid(value: &Value, name: &str) -> Result<String, DecodeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Object(_) => uid(required(struct_fields(value, name)?, "id")?, name),
        _ => Err(DecodeError::invalid(name, "a UID")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_and_flat_structs() {
        let nested = json!({ "type": "x::y::Z", "fields": { "a": "1" } });
        let flat = json!({ "a": 1 });
        assert_eq!(u64_field(struct_fields(&nested, "z").unwrap(), "a"), Ok(1));
        assert_eq!(u64_field(struct_fields(&flat, "z").unwrap(), "a"), Ok(1));
    }

    #[test]
    fn option_renderings() {
        assert_eq!(move_option_string(&json!(null)), Ok(None));
        assert_eq!(move_option_string(&json!("alice.patreon.sui")).unwrap().as_deref(), Some("alice.patreon.sui"));
        assert_eq!(move_option_string(&json!({ "vec": [] })), Ok(None));
        assert_eq!(
            move_option_string(&json!({ "fields": { "vec": ["bob"] } })).unwrap(),
            Some("bob".to_string())
        );
        assert!(move_option_string(&json!(3)).is_err());
    }

    #[test]
    fn balances_and_uids() {
        assert_eq!(balance(&json!("42"), "revenue"), Ok(42));
        assert_eq!(balance(&json!({ "value": 7 }), "revenue"), Ok(7));
        assert_eq!(balance(&json!({ "fields": { "value": "9" } }), "revenue"), Ok(9));
        assert_eq!(uid(&json!({ "id": "0xabc" }), "id").unwrap(), "0xabc");
        assert_eq!(uid(&json!({ "id": { "id": "0xdef" } }), "id").unwrap(), "0xdef");
    }

    #[test]
    fn mismatches_are_typed() {
        let fields = struct_fields(&json!({ "n": "x", "s": 1 }), "t").unwrap().clone();
        assert_eq!(
            u64_field(&fields, "n"),
            Err(DecodeError::InvalidField { field: "n".into(), expected: "a u64" })
        );
        assert!(matches!(string(&fields, "s"), Err(DecodeError::InvalidField { .. })));
        assert_eq!(string(&fields, "missing"), Err(DecodeError::MissingField("missing".into())));
    }
}
