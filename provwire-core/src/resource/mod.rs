// Resource property model held by the engine.

pub mod asset;
pub mod property;
pub mod urn;

pub use asset::{
    sniff, Archive, ArchiveMember, ArchiveSource, Asset, AssetSource, Recognizer, ARCHIVE_SIG,
    ASSET_SIG, RECOGNIZERS, SIG_KEY,
};
pub use property::{Computed, Output, PropertyKey, PropertyMap, PropertyValue};
pub use urn::{ResourceId, ResourceReference, Urn};
