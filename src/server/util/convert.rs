//! Conversion between stored documents and JSON transport values.

use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

/// Textual format of datetimes in responses.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Converts a stored value into its transport form.
///
/// Object ids become hex strings and datetimes become `YYYY-MM-DD HH:MM:SS`
/// (UTC). Arrays and documents convert recursively; kinds without a natural
/// JSON form fall back to relaxed extended JSON.
pub fn to_transport(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(n) => Value::from(*n),
        Bson::Int64(n) => Value::from(*n),
        Bson::Double(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::String(dt.to_chrono().format(DATETIME_FORMAT).to_string()),
        Bson::Array(items) => Value::Array(items.iter().map(to_transport).collect()),
        Bson::Document(doc) => Value::Object(document_to_transport(doc)),
        other => other.clone().into_relaxed_extjson(),
    }
}

pub fn document_to_transport(doc: &Document) -> Map<String, Value> {
    doc.iter()
        .map(|(key, value)| (key.clone(), to_transport(value)))
        .collect()
}

/// Converts a request value into BSON.
///
/// Integers that fit 32 bits become `Int32`, larger ones `Int64`, other
/// numbers `Double`. No extended JSON interpretation takes place, so a
/// `{"$oid": ..}` object stays a plain document.
pub fn from_transport(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(i),
            },
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(from_transport).collect()),
        Value::Object(map) => Bson::Document(document_from_transport(map)),
    }
}

pub fn document_from_transport(map: &Map<String, Value>) -> Document {
    map.iter()
        .map(|(key, value)| (key.clone(), from_transport(value)))
        .collect()
}
