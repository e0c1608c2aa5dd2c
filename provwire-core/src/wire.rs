// Generic structured-document values exchanged with provider plugins.
//
// A wire value has exactly the kinds of a JSON document. It cannot express
// unknown values or assets; the marshaler is responsible for lowering those
// into this shape and the unmarshaler for recovering them.

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use tracing::{trace, warn};

/// String-keyed wire mapping. Field order is insertion order, which the
/// marshaler keeps lexicographic.
pub type WireStruct = IndexMap<String, WireValue>;

/// A value in the transport-neutral document shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WireValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<WireValue>),
    Struct(WireStruct),
}

impl WireValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Number(_) => "number",
            WireValue::String(_) => "string",
            WireValue::List(_) => "list",
            WireValue::Struct(_) => "struct",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[WireValue]> {
        match self {
            WireValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&WireStruct> {
        match self {
            WireValue::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    /// Build a wire value from a JSON document
    pub fn from_json(value: &JsonValue) -> Self {
        trace!("Converting JSON to wire value: {:?}", value);
        Self::from(value.clone())
    }

    /// Convert to a JSON document.
    ///
    /// JSON has no encoding for NaN or the infinities; those numbers become
    /// `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            WireValue::Null => JsonValue::Null,
            WireValue::Bool(b) => JsonValue::Bool(*b),
            WireValue::Number(n) => match Number::from_f64(*n) {
                Some(num) => JsonValue::Number(num),
                None => {
                    warn!("Non-finite number {} has no JSON form, encoding as null", n);
                    JsonValue::Null
                }
            },
            WireValue::String(s) => JsonValue::String(s.clone()),
            WireValue::List(items) => JsonValue::Array(items.iter().map(|v| v.to_json()).collect()),
            WireValue::Struct(fields) => JsonValue::Object(struct_to_json(fields)),
        }
    }
}

impl From<JsonValue> for WireValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => WireValue::Null,
            JsonValue::Bool(b) => WireValue::Bool(b),
            // Without arbitrary precision every JSON number has an f64 form.
            JsonValue::Number(n) => WireValue::Number(n.as_f64().unwrap_or_default()),
            JsonValue::String(s) => WireValue::String(s),
            JsonValue::Array(items) => WireValue::List(items.into_iter().map(WireValue::from).collect()),
            JsonValue::Object(map) => WireValue::Struct(struct_from_json(map)),
        }
    }
}

impl From<WireStruct> for WireValue {
    fn from(fields: WireStruct) -> Self {
        WireValue::Struct(fields)
    }
}

/// Convert a JSON object into a wire struct, keeping the object's key order.
pub fn struct_from_json(map: JsonMap<String, JsonValue>) -> WireStruct {
    map.into_iter().map(|(k, v)| (k, WireValue::from(v))).collect()
}

/// Convert a wire struct into a JSON object.
pub fn struct_to_json(fields: &WireStruct) -> JsonMap<String, JsonValue> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireValue::Null => serializer.serialize_unit(),
            WireValue::Bool(b) => serializer.serialize_bool(*b),
            WireValue::Number(n) => serializer.serialize_f64(*n),
            WireValue::String(s) => serializer.serialize_str(s),
            WireValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            WireValue::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for WireValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(WireValue::from)
    }
}
