//! Property model and wire marshaling for resource provider plugins.
//!
//! The engine keeps resource state as [`PropertyMap`]s of typed
//! [`PropertyValue`]s. Provider plugins only understand the generic document
//! shape of [`WireValue`]. The [`Marshaler`] converts between the two, keeping
//! track of values that are not yet known and round-tripping assets and
//! archives through ordinary structs.

pub mod compiler;
pub mod error;
pub mod marshal;
pub mod resource;
pub mod wire;

pub use error::{ErrorCode, MarshalError, ResolveError, RpcError};
pub use marshal::{
    marshal_properties, marshal_properties_with_unknowns, marshal_property_value,
    unmarshal_properties, unmarshal_property_value, MarshalOptions, Marshaler, TableResolver,
    UrnResolver,
};
pub use resource::{
    Archive, ArchiveMember, Asset, Computed, Output, PropertyKey, PropertyMap, PropertyValue,
    ResourceId, ResourceReference, Urn,
};
pub use wire::{WireStruct, WireValue};
