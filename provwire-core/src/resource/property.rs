use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::borrow::Borrow;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use super::asset::{Archive, Asset};
use super::urn::ResourceReference;

/// Name of a resource property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKey(String);

impl PropertyKey {
    pub fn new(key: impl Into<String>) -> Self {
        PropertyKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PropertyKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyKey {
    fn from(key: &str) -> Self {
        PropertyKey::new(key)
    }
}

impl From<String> for PropertyKey {
    fn from(key: String) -> Self {
        PropertyKey(key)
    }
}

/// A value whose content a future operation will produce. The element only
/// carries the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    pub element: Box<PropertyValue>,
}

impl Computed {
    pub fn new(element: PropertyValue) -> Self {
        Computed {
            element: Box::new(element),
        }
    }
}

/// A state slot filled in by the provider; never sent as an input.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub element: Box<PropertyValue>,
}

impl Output {
    pub fn new(element: PropertyValue) -> Self {
        Output {
            element: Box::new(element),
        }
    }
}

/// The engine's typed value model for resource properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(PropertyMap),
    Asset(Asset),
    Archive(Archive),
    Resource(ResourceReference),
    Computed(Computed),
    Output(Output),
}

impl PropertyValue {
    pub fn computed(element: PropertyValue) -> Self {
        PropertyValue::Computed(Computed::new(element))
    }

    pub fn output(element: PropertyValue) -> Self {
        PropertyValue::Output(Output::new(element))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, PropertyValue::Computed(_))
    }

    pub fn is_output(&self) -> bool {
        matches!(self, PropertyValue::Output(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Number(_) => "number",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Object(_) => "object",
            PropertyValue::Asset(_) => "asset",
            PropertyValue::Archive(_) => "archive",
            PropertyValue::Resource(_) => "resource",
            PropertyValue::Computed(_) => "computed",
            PropertyValue::Output(_) => "output",
        }
    }

    /// Build a plain value from a JSON document. Objects stay objects; no
    /// asset or archive recognition happens here.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => PropertyValue::Null,
            JsonValue::Bool(b) => PropertyValue::Bool(b),
            JsonValue::Number(n) => PropertyValue::Number(n.as_f64().unwrap_or_default()),
            JsonValue::String(s) => PropertyValue::String(s),
            JsonValue::Array(items) => {
                PropertyValue::Array(items.into_iter().map(PropertyValue::from_json).collect())
            }
            JsonValue::Object(map) => PropertyValue::Object(PropertyMap::from_mappable(map)),
        }
    }

    /// Plain view of this value.
    ///
    /// Assets and archives appear in their serialized form, resources as
    /// their URN, and computed or output values as the plain view of their
    /// element.
    pub fn mappable(&self) -> JsonValue {
        match self {
            PropertyValue::Null => JsonValue::Null,
            PropertyValue::Bool(b) => JsonValue::Bool(*b),
            PropertyValue::Number(n) => Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            PropertyValue::String(s) => JsonValue::String(s.clone()),
            PropertyValue::Array(items) => {
                JsonValue::Array(items.iter().map(PropertyValue::mappable).collect())
            }
            PropertyValue::Object(map) => JsonValue::Object(map.mappable()),
            PropertyValue::Asset(asset) => JsonValue::Object(asset.serialize()),
            PropertyValue::Archive(archive) => JsonValue::Object(archive.serialize()),
            PropertyValue::Resource(reference) => JsonValue::String(reference.urn.to_string()),
            PropertyValue::Computed(c) => c.element.mappable(),
            PropertyValue::Output(o) => o.element.mappable(),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Number(f64::from(n))
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(items)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(map: PropertyMap) -> Self {
        PropertyValue::Object(map)
    }
}

impl From<Asset> for PropertyValue {
    fn from(asset: Asset) -> Self {
        PropertyValue::Asset(asset)
    }
}

impl From<Archive> for PropertyValue {
    fn from(archive: Archive) -> Self {
        PropertyValue::Archive(archive)
    }
}

impl From<ResourceReference> for PropertyValue {
    fn from(reference: ResourceReference) -> Self {
        PropertyValue::Resource(reference)
    }
}

impl From<Computed> for PropertyValue {
    fn from(computed: Computed) -> Self {
        PropertyValue::Computed(computed)
    }
}

impl From<Output> for PropertyValue {
    fn from(output: Output) -> Self {
        PropertyValue::Output(output)
    }
}

/// Mapping from property keys to values. Iteration is always in key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyMap(BTreeMap<PropertyKey, PropertyValue>);

impl PropertyMap {
    pub fn new() -> Self {
        PropertyMap(BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(
        &mut self,
        key: impl Into<PropertyKey>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PropertyKey, PropertyValue> {
        self.0.iter()
    }

    /// Keys in lexicographic order.
    pub fn stable_keys(&self) -> Vec<&PropertyKey> {
        self.0.keys().collect()
    }

    pub fn from_mappable(map: JsonMap<String, JsonValue>) -> Self {
        map.into_iter()
            .map(|(k, v)| (PropertyKey::from(k), PropertyValue::from_json(v)))
            .collect()
    }

    pub fn mappable(&self) -> JsonMap<String, JsonValue> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.mappable()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyMap
where
    K: Into<PropertyKey>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PropertyMap(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for PropertyMap {
    type Item = (PropertyKey, PropertyValue);
    type IntoIter = btree_map::IntoIter<PropertyKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyMap {
    type Item = (&'a PropertyKey, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, PropertyKey, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
