//! JSON and serde interop.
//!
//! JSON has no `undefined`, dates or big integers, so conversion to JSON is
//! lossy: undefined fields are skipped, dates become epoch milliseconds and
//! big integers outside the `i64` range become strings.

use crate::error::{ValueError, ValueResult};
use crate::row::Row;
use crate::value::Value;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value as Json;

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Converts this value to JSON.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => match integral(*n) {
                Some(i) => Json::from(i),
                None => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            },
            Value::BigInt(n) => match i64::try_from(*n) {
                Ok(small) => Json::from(small),
                Err(_) => Json::String(n.to_string()),
            },
            Value::Date(ms) => Json::from(*ms),
            Value::Text(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(fields) => Json::Object(
                fields
                    .iter()
                    .filter(|(_, v)| !v.is_undefined())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Largest integer exactly representable in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Returns the integer form of a number without fraction, so integral
/// numbers round-trip into integer-typed fields.
#[allow(clippy::cast_possible_truncation)]
fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

impl TryFrom<Json> for Row {
    type Error = ValueError;

    fn try_from(json: Json) -> ValueResult<Self> {
        match Value::from(json) {
            Value::Object(fields) => Ok(Row::from_fields(fields)),
            other => Err(ValueError::not_an_object(other.type_name())),
        }
    }
}

impl Row {
    /// Converts this row to a JSON object.
    pub fn to_json(&self) -> Json {
        Value::Object(self.fields().clone()).to_json()
    }

    /// Builds a row from any serializable value.
    pub fn from_serialize<T: Serialize>(value: &T) -> ValueResult<Self> {
        Row::try_from(serde_json::to_value(value)?)
    }

    /// Deserializes a typed value from this row.
    pub fn to_deserialize<T: serde::de::DeserializeOwned>(&self) -> ValueResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => match integral(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Value::BigInt(n) => match i64::try_from(*n) {
                Ok(small) => serializer.serialize_i64(small),
                Err(_) => serializer.serialize_str(&n.to_string()),
            },
            Value::Date(ms) => serializer.serialize_i64(*ms),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => serialize_fields(fields.iter(), serializer),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_fields(self.fields().iter(), serializer)
    }
}

fn serialize_fields<'a, S, I>(fields: I, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    I: Iterator<Item = (&'a String, &'a Value)> + Clone,
{
    let defined = fields.filter(|(_, v)| !v.is_undefined());
    let mut map = serializer.serialize_map(Some(defined.clone().count()))?;
    for (key, value) in defined {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Json::deserialize(deserializer).map(Value::from)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Row::try_from(json).map_err(serde::de::Error::custom)
    }
}
