//! Conversion between Rust values and Firestore's wire representation.
//!
//! Documents pass through [`serde_json::Value`] as an intermediate step,
//! which keeps the conversion honest about what this crate supports: trees of
//! nulls, booleans, integers, doubles, strings, arrays, and maps. When
//! reading, timestamps are surfaced as epoch seconds and references as their
//! path string; bytes and geo points have no sensible JSON counterpart and
//! are rejected with [`Error::UnsupportedValueType`]. Doubles that JSON
//! cannot represent (NaN, infinities) are read back as null.

use std::collections::HashMap;
use std::fmt;

use firestore_grpc::v1::{value::ValueType, ArrayValue, MapValue, Value};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug)]
pub enum Error {
    Json(serde_json::Error),
    /// Only JSON objects can be stored as documents.
    DocumentNotAnObject,
    UnsupportedValueType(&'static str),
    /// Values coming from Firestore should always carry a value type.
    MissingValueType,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "{err}"),
            Self::DocumentNotAnObject => f.write_str("a document must serialize to a JSON object"),
            Self::UnsupportedValueType(kind) => {
                write!(f, "Firestore {kind} values are not supported")
            }
            Self::MissingValueType => f.write_str("missing value type"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Serializes a value into the field map of a Firestore document.
pub(crate) fn serialize_to_fields<T: Serialize>(
    value: &T,
) -> Result<HashMap<String, Value>, Error> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, json_to_value(value)))
            .collect()),
        _ => Err(Error::DocumentNotAnObject),
    }
}

/// Serializes a single value, e.g. for use in a query filter.
pub(crate) fn serialize_to_value<T: Serialize>(value: &T) -> Result<Value, Error> {
    Ok(json_to_value(serde_json::to_value(value)?))
}

/// Deserializes the field map of a Firestore document into `T`.
pub(crate) fn deserialize_fields<T: DeserializeOwned>(
    fields: HashMap<String, Value>,
) -> Result<T, Error> {
    let object = fields
        .into_iter()
        .map(|(key, value)| Ok((key, value_to_json(value)?)))
        .collect::<Result<serde_json::Map<String, serde_json::Value>, Error>>()?;

    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

fn json_to_value(json: serde_json::Value) -> Value {
    let value_type = match json {
        serde_json::Value::Null => ValueType::NullValue(0),
        serde_json::Value::Bool(b) => ValueType::BooleanValue(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => ValueType::IntegerValue(i),
            // u64 values beyond i64::MAX lose precision here, like they would
            // in any Firestore client: the wire format only has i64 and f64.
            None => ValueType::DoubleValue(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => ValueType::StringValue(s),
        serde_json::Value::Array(items) => ValueType::ArrayValue(ArrayValue {
            values: items.into_iter().map(json_to_value).collect(),
        }),
        serde_json::Value::Object(map) => ValueType::MapValue(MapValue {
            fields: map
                .into_iter()
                .map(|(key, value)| (key, json_to_value(value)))
                .collect(),
        }),
    };

    Value {
        value_type: Some(value_type),
    }
}

fn value_to_json(value: Value) -> Result<serde_json::Value, Error> {
    let json = match value.value_type.ok_or(Error::MissingValueType)? {
        ValueType::NullValue(_) => serde_json::Value::Null,
        ValueType::BooleanValue(b) => serde_json::Value::Bool(b),
        ValueType::IntegerValue(i) => serde_json::Value::from(i),
        ValueType::DoubleValue(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueType::TimestampValue(timestamp) => serde_json::Value::from(timestamp_seconds(&timestamp)),
        ValueType::StringValue(s) => serde_json::Value::String(s),
        ValueType::ReferenceValue(path) => serde_json::Value::String(path),
        ValueType::BytesValue(_) => return Err(Error::UnsupportedValueType("bytes")),
        ValueType::GeoPointValue(_) => return Err(Error::UnsupportedValueType("geo point")),
        ValueType::ArrayValue(array) => serde_json::Value::Array(
            array
                .values
                .into_iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, Error>>()?,
        ),
        ValueType::MapValue(map) => serde_json::Value::Object(
            map.fields
                .into_iter()
                .map(|(key, value)| Ok((key, value_to_json(value)?)))
                .collect::<Result<serde_json::Map<String, serde_json::Value>, Error>>()?,
        ),
    };

    Ok(json)
}

/// Seconds of UTC time since the Unix epoch, matching how the Firestore API
/// documents its timestamps.
fn timestamp_seconds(timestamp: &prost_types::Timestamp) -> i64 {
    timestamp.seconds
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Landmark {
        name: String,
        height_m: f64,
        visitors: i64,
        open: bool,
        tags: Vec<String>,
        note: Option<String>,
    }

    #[test]
    fn document_fields_survive_the_wire_format() {
        let landmark = Landmark {
            name: "Golden Gate Bridge".to_string(),
            height_m: 227.4,
            visitors: 10_000_000,
            open: true,
            tags: vec!["bridge".to_string(), "landmark".to_string()],
            note: None,
        };

        let fields = serialize_to_fields(&landmark).unwrap();
        assert_eq!(
            fields.get("name").and_then(|v| v.value_type.clone()),
            Some(ValueType::StringValue("Golden Gate Bridge".to_string()))
        );

        let restored: Landmark = deserialize_fields(fields).unwrap();
        assert_eq!(restored, landmark);
    }

    #[test]
    fn rejects_non_object_documents() {
        let result = serialize_to_fields(&"just a string");
        assert!(matches!(result, Err(Error::DocumentNotAnObject)));
    }

    #[test]
    fn timestamps_read_back_as_epoch_seconds() {
        let mut fields = HashMap::new();
        fields.insert(
            "updated_at".to_string(),
            Value {
                value_type: Some(ValueType::TimestampValue(prost_types::Timestamp {
                    seconds: 1_700_000_000,
                    nanos: 250,
                })),
            },
        );

        let json: serde_json::Value = deserialize_fields(fields).unwrap();
        assert_eq!(json["updated_at"], 1_700_000_000_i64);
    }

    #[test]
    fn bytes_values_are_rejected() {
        let mut fields = HashMap::new();
        fields.insert(
            "blob".to_string(),
            Value {
                value_type: Some(ValueType::BytesValue(vec![1, 2, 3])),
            },
        );

        let result = deserialize_fields::<serde_json::Value>(fields);
        assert!(matches!(result, Err(Error::UnsupportedValueType("bytes"))));
    }

    #[test]
    fn values_without_a_type_are_rejected() {
        let mut fields = HashMap::new();
        fields.insert("mystery".to_string(), Value { value_type: None });

        let result = deserialize_fields::<serde_json::Value>(fields);
        assert!(matches!(result, Err(Error::MissingValueType)));
    }
}
