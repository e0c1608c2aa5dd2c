// Conversion between the engine's property model and the wire document shape.
//
// Marshaling lowers Computed and Output values to a placeholder of their
// element's shape and reports which keys were not fully known. Assets and
// archives travel as ordinary structs built from their serialized mapping and
// are recognized again on the way back.

pub mod resolver;


use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::error::{MarshalError, ResolveError};
use crate::resource::{sniff, PropertyKey, PropertyMap, PropertyValue, ResourceReference};
use crate::wire::{WireStruct, WireValue};

pub use resolver::{TableResolver, UrnResolver};

/// Flags that control marshaling. Threaded unchanged through every
/// recursive call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarshalOptions {
    /// Omit null-valued keys.
    pub skip_nulls: bool,
    /// Permit legacy-format URNs in resource references.
    pub old_urns: bool,
    /// Send resource references as their URN instead of resolving them.
    pub raw_resources: bool,
}

impl MarshalOptions {
    pub fn with_skip_nulls(mut self, skip_nulls: bool) -> Self {
        self.skip_nulls = skip_nulls;
        self
    }

    pub fn with_old_urns(mut self, old_urns: bool) -> Self {
        self.old_urns = old_urns;
        self
    }

    pub fn with_raw_resources(mut self, raw_resources: bool) -> Self {
        self.raw_resources = raw_resources;
        self
    }
}

/// Result of marshaling one property map.
struct MarshaledFields {
    fields: WireStruct,
    unknowns: BTreeSet<PropertyKey>,
    // Keys whose value was an output, or held one at any depth.
    dropped_outputs: Vec<PropertyKey>,
}

/// Result of marshaling one value.
struct MarshaledValue {
    wire: WireValue,
    known: bool,
    dropped_output: bool,
}

impl MarshaledValue {
    fn known(wire: WireValue) -> Self {
        MarshaledValue {
            wire,
            known: true,
            dropped_output: false,
        }
    }
}

/// Converts property maps to wire structs and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct Marshaler<'r> {
    opts: MarshalOptions,
    resolver: Option<&'r dyn UrnResolver>,
}

impl<'r> Marshaler<'r> {
    pub fn new(opts: MarshalOptions) -> Self {
        Marshaler {
            opts,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: &'r dyn UrnResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Marshal a property map, returning the keys whose values were not fully
    /// known alongside the struct. Unknown values are present in the struct
    /// as a placeholder of their element's shape, so callers need the key set
    /// to interpret the result. Output values are omitted entirely.
    pub fn marshal_properties_with_unknowns(
        &self,
        props: &PropertyMap,
    ) -> Result<(WireStruct, BTreeSet<PropertyKey>), MarshalError> {
        let marshaled = self.marshal_fields(props)?;
        Ok((marshaled.fields, marshaled.unknowns))
    }

    /// Marshal a property map that must be fully resolved. Any unknown or
    /// output value, at any depth, is an invariant violation.
    pub fn marshal_properties(&self, props: &PropertyMap) -> Result<WireStruct, MarshalError> {
        let marshaled = self.marshal_fields(props)?;
        if !marshaled.unknowns.is_empty() || !marshaled.dropped_outputs.is_empty() {
            let keys: BTreeSet<&str> = marshaled
                .unknowns
                .iter()
                .chain(marshaled.dropped_outputs.iter())
                .map(PropertyKey::as_str)
                .collect();
            let keys: Vec<&str> = keys.into_iter().collect();
            return Err(MarshalError::invariant(format!(
                "unexpected unknown properties during final marshaling: {}",
                keys.join(", ")
            )));
        }
        Ok(marshaled.fields)
    }

    fn marshal_fields(&self, props: &PropertyMap) -> Result<MarshaledFields, MarshalError> {
        let mut result = MarshaledFields {
            fields: WireStruct::with_capacity(props.len()),
            unknowns: BTreeSet::new(),
            dropped_outputs: Vec::new(),
        };

        // PropertyMap iterates in key order, so the struct's field order is stable.
        for (key, value) in props {
            trace!("Marshaling property for RPC: {}={:?}", key, value);

            if value.is_output() {
                trace!("Skipping output property {}", key);
                result.dropped_outputs.push(key.clone());
                continue;
            }
            if self.opts.skip_nulls && value.is_null() {
                trace!("Skipping null property {} (as requested)", key);
                continue;
            }

            let marshaled = self.marshal_tracked(value)?;
            result.fields.insert(key.to_string(), marshaled.wire);

            if !marshaled.known {
                result.unknowns.insert(key.clone());
            }
            if marshaled.dropped_output {
                trace!("Property {} omitted a nested output", key);
                result.dropped_outputs.push(key.clone());
            }
        }

        Ok(result)
    }

    /// Marshal a single value. The flag is `false` when the value, or
    /// anything inside it, is not yet known.
    pub fn marshal_value(&self, value: &PropertyValue) -> Result<(WireValue, bool), MarshalError> {
        let marshaled = self.marshal_tracked(value)?;
        Ok((marshaled.wire, marshaled.known))
    }

    fn marshal_tracked(&self, value: &PropertyValue) -> Result<MarshaledValue, MarshalError> {
        match value {
            PropertyValue::Null => Ok(MarshaledValue::known(WireValue::Null)),
            PropertyValue::Bool(b) => Ok(MarshaledValue::known(WireValue::Bool(*b))),
            PropertyValue::Number(n) => Ok(MarshaledValue::known(WireValue::Number(*n))),
            PropertyValue::String(s) => Ok(MarshaledValue::known(WireValue::String(s.clone()))),
            PropertyValue::Array(items) => {
                let mut known = true;
                let mut dropped_output = false;
                let mut elems = Vec::with_capacity(items.len());
                for item in items {
                    let elem = self.marshal_tracked(item)?;
                    known = known && elem.known;
                    dropped_output = dropped_output || elem.dropped_output;
                    elems.push(elem.wire);
                }
                Ok(MarshaledValue {
                    wire: WireValue::List(elems),
                    known,
                    dropped_output,
                })
            }
            PropertyValue::Object(map) => {
                let marshaled = self.marshal_fields(map)?;
                Ok(MarshaledValue {
                    wire: WireValue::Struct(marshaled.fields),
                    known: marshaled.unknowns.is_empty(),
                    dropped_output: !marshaled.dropped_outputs.is_empty(),
                })
            }
            PropertyValue::Asset(asset) => self.marshal_serialized(asset.serialize()),
            PropertyValue::Archive(archive) => self.marshal_serialized(archive.serialize()),
            PropertyValue::Resource(reference) => self.marshal_resource(reference),
            PropertyValue::Computed(computed) => {
                self.marshal_placeholder("computed", &computed.element)
            }
            PropertyValue::Output(output) => self.marshal_placeholder("output", &output.element),
        }
    }

    // Assets and archives go through the ordinary object path.
    fn marshal_serialized(
        &self,
        serialized: JsonMap<String, JsonValue>,
    ) -> Result<MarshaledValue, MarshalError> {
        let props = PropertyMap::from_mappable(serialized);
        self.marshal_tracked(&PropertyValue::Object(props))
    }

    fn marshal_placeholder(
        &self,
        kind: &str,
        element: &PropertyValue,
    ) -> Result<MarshaledValue, MarshalError> {
        if element.is_computed() {
            return Err(MarshalError::invariant(format!(
                "{} value wraps another computed value",
                kind
            )));
        }
        let marshaled = self.marshal_tracked(element)?;
        if !marshaled.known {
            return Err(MarshalError::invariant(format!(
                "{} element of type {} is not fully known",
                kind,
                element.type_name()
            )));
        }
        Ok(MarshaledValue {
            known: false,
            ..marshaled
        })
    }

    fn marshal_resource(&self, reference: &ResourceReference) -> Result<MarshaledValue, MarshalError> {
        if self.opts.raw_resources {
            return Ok(MarshaledValue::known(WireValue::String(
                reference.urn.to_string(),
            )));
        }

        let resolve_error = |source| MarshalError::Resolve {
            urn: reference.urn.to_string(),
            source,
        };
        let resolver = self
            .resolver
            .ok_or_else(|| resolve_error(ResolveError::Unavailable))?;

        match resolver.resolve(&reference.urn, &self.opts) {
            Ok(Some(id)) => Ok(MarshaledValue::known(WireValue::String(id.to_string()))),
            Ok(None) => {
                debug!("Resource {} has no ID yet, marshaling as unknown", reference.urn);
                Ok(MarshaledValue {
                    wire: WireValue::String(String::new()),
                    known: false,
                    dropped_output: false,
                })
            }
            Err(source) => Err(resolve_error(source)),
        }
    }

    /// Unmarshal a wire struct into a property map. A missing struct is an
    /// empty map.
    pub fn unmarshal_properties(
        &self,
        props: Option<&WireStruct>,
    ) -> Result<PropertyMap, MarshalError> {
        let mut result = PropertyMap::new();
        let Some(props) = props else {
            return Ok(result);
        };

        // Sorted so that failures are reported deterministically.
        let mut fields: Vec<(&String, &WireValue)> = props.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        for (key, wire) in fields {
            let value = self.unmarshal_value(wire)?;
            trace!("Unmarshaling property for RPC: {}={:?}", key, value);

            if value.is_computed() {
                return Err(MarshalError::invariant(format!(
                    "property {} unmarshaled to a computed value",
                    key
                )));
            }
            if self.opts.skip_nulls && value.is_null() {
                trace!("Skipping unmarshaling of {} (it is null)", key);
                continue;
            }
            result.insert(key.as_str(), value);
        }

        Ok(result)
    }

    /// Unmarshal a single wire value. Structs that carry a serialized asset or
    /// archive come back as that type; all others become objects.
    pub fn unmarshal_value(&self, value: &WireValue) -> Result<PropertyValue, MarshalError> {
        match value {
            WireValue::Null => Ok(PropertyValue::Null),
            WireValue::Bool(b) => Ok(PropertyValue::Bool(*b)),
            WireValue::Number(n) => Ok(PropertyValue::Number(*n)),
            WireValue::String(s) => Ok(PropertyValue::String(s.clone())),
            WireValue::List(items) => items
                .iter()
                .map(|item| self.unmarshal_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(PropertyValue::Array),
            WireValue::Struct(fields) => {
                let obj = self.unmarshal_properties(Some(fields))?;
                // Before returning it as an object, check for a recoverable type.
                if let Some(special) = sniff(&obj.mappable()) {
                    return Ok(special);
                }
                Ok(PropertyValue::Object(obj))
            }
        }
    }
}

pub fn marshal_properties_with_unknowns(
    props: &PropertyMap,
    opts: MarshalOptions,
) -> Result<(WireStruct, BTreeSet<PropertyKey>), MarshalError> {
    Marshaler::new(opts).marshal_properties_with_unknowns(props)
}

pub fn marshal_properties(
    props: &PropertyMap,
    opts: MarshalOptions,
) -> Result<WireStruct, MarshalError> {
    Marshaler::new(opts).marshal_properties(props)
}

pub fn marshal_property_value(
    value: &PropertyValue,
    opts: MarshalOptions,
) -> Result<(WireValue, bool), MarshalError> {
    Marshaler::new(opts).marshal_value(value)
}

pub fn unmarshal_properties(
    props: Option<&WireStruct>,
    opts: MarshalOptions,
) -> Result<PropertyMap, MarshalError> {
    Marshaler::new(opts).unmarshal_properties(props)
}

pub fn unmarshal_property_value(
    value: &WireValue,
    opts: MarshalOptions,
) -> Result<PropertyValue, MarshalError> {
    Marshaler::new(opts).unmarshal_value(value)
}
