// Assets and archives: opaque content references that the wire shape has no
// native kind for. Each serializes to a self-describing mapping tagged with a
// reserved signature key, and is recovered from such a mapping on decode.

use serde_json::{Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::trace;

use super::property::PropertyValue;

/// Reserved key whose value says which special type a mapping encodes.
pub const SIG_KEY: &str = "4dabf18193072939515e22adb298388d";
/// Signature value of a serialized asset.
pub const ASSET_SIG: &str = "c44067f5952c0a294b673a41bacd8c17";
/// Signature value of a serialized archive.
pub const ARCHIVE_SIG: &str = "0def7320c3a5731c473e5ecbe6d01bc7";

const HASH_FIELD: &str = "hash";
const ASSET_TEXT: &str = "text";
const ASSET_PATH: &str = "path";
const ASSET_URI: &str = "uri";
const ARCHIVE_ASSETS: &str = "assets";
const ARCHIVE_PATH: &str = "path";
const ARCHIVE_URI: &str = "uri";

type JsonObject = JsonMap<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Inline content.
    Text(String),
    Path(String),
    Uri(String),
}

/// A single blob of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    source: AssetSource,
    hash: Option<String>,
}

impl Asset {
    /// Inline asset; its SHA-256 is computed up front.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = Some(content_hash(text.as_bytes()));
        Asset {
            source: AssetSource::Text(text),
            hash,
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        Asset {
            source: AssetSource::Path(path.into()),
            hash: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        Asset {
            source: AssetSource::Uri(uri.into()),
            hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn serialize(&self) -> JsonObject {
        let mut map = JsonObject::new();
        map.insert(SIG_KEY.to_string(), JsonValue::String(ASSET_SIG.to_string()));
        let (field, value) = match &self.source {
            AssetSource::Text(text) => (ASSET_TEXT, text),
            AssetSource::Path(path) => (ASSET_PATH, path),
            AssetSource::Uri(uri) => (ASSET_URI, uri),
        };
        map.insert(field.to_string(), JsonValue::String(value.clone()));
        if let Some(hash) = &self.hash {
            map.insert(HASH_FIELD.to_string(), JsonValue::String(hash.clone()));
        }
        map
    }

    /// Recover an asset from its serialized mapping. Any deviation from the
    /// serialized layout means the mapping is not an asset.
    pub fn deserialize(map: &JsonObject) -> Option<Self> {
        if !has_signature(map, ASSET_SIG) {
            return None;
        }
        let payload = &[ASSET_TEXT, ASSET_PATH, ASSET_URI];
        if !only_known_fields(map, payload) {
            return None;
        }
        let (field, value) = single_payload(map, payload)?;
        let value = value.as_str()?.to_string();
        let source = match field {
            ASSET_TEXT => AssetSource::Text(value),
            ASSET_PATH => AssetSource::Path(value),
            _ => AssetSource::Uri(value),
        };
        Some(Asset {
            source,
            hash: optional_hash(map)?,
        })
    }
}

/// A member of an archive built from named entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveMember {
    Asset(Asset),
    Archive(Archive),
}

impl ArchiveMember {
    fn serialize(&self) -> JsonObject {
        match self {
            ArchiveMember::Asset(asset) => asset.serialize(),
            ArchiveMember::Archive(archive) => archive.serialize(),
        }
    }

    fn deserialize(value: &JsonValue) -> Option<Self> {
        let map = value.as_object()?;
        Asset::deserialize(map)
            .map(ArchiveMember::Asset)
            .or_else(|| Archive::deserialize(map).map(ArchiveMember::Archive))
    }
}

impl From<Asset> for ArchiveMember {
    fn from(asset: Asset) -> Self {
        ArchiveMember::Asset(asset)
    }
}

impl From<Archive> for ArchiveMember {
    fn from(archive: Archive) -> Self {
        ArchiveMember::Archive(archive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    Assets(BTreeMap<String, ArchiveMember>),
    Path(String),
    Uri(String),
}

/// A collection of content, either assembled from members or referenced by
/// location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    source: ArchiveSource,
    hash: Option<String>,
}

impl Archive {
    pub fn from_assets<K, M>(members: impl IntoIterator<Item = (K, M)>) -> Self
    where
        K: Into<String>,
        M: Into<ArchiveMember>,
    {
        Archive {
            source: ArchiveSource::Assets(
                members
                    .into_iter()
                    .map(|(k, m)| (k.into(), m.into()))
                    .collect(),
            ),
            hash: None,
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        Archive {
            source: ArchiveSource::Path(path.into()),
            hash: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        Archive {
            source: ArchiveSource::Uri(uri.into()),
            hash: None,
        }
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn serialize(&self) -> JsonObject {
        let mut map = JsonObject::new();
        map.insert(SIG_KEY.to_string(), JsonValue::String(ARCHIVE_SIG.to_string()));
        match &self.source {
            ArchiveSource::Assets(members) => {
                let assets = members
                    .iter()
                    .map(|(name, member)| (name.clone(), JsonValue::Object(member.serialize())))
                    .collect();
                map.insert(ARCHIVE_ASSETS.to_string(), JsonValue::Object(assets));
            }
            ArchiveSource::Path(path) => {
                map.insert(ARCHIVE_PATH.to_string(), JsonValue::String(path.clone()));
            }
            ArchiveSource::Uri(uri) => {
                map.insert(ARCHIVE_URI.to_string(), JsonValue::String(uri.clone()));
            }
        }
        if let Some(hash) = &self.hash {
            map.insert(HASH_FIELD.to_string(), JsonValue::String(hash.clone()));
        }
        map
    }

    pub fn deserialize(map: &JsonObject) -> Option<Self> {
        if !has_signature(map, ARCHIVE_SIG) {
            return None;
        }
        let payload = &[ARCHIVE_ASSETS, ARCHIVE_PATH, ARCHIVE_URI];
        if !only_known_fields(map, payload) {
            return None;
        }
        let source = match single_payload(map, payload)? {
            (ARCHIVE_ASSETS, value) => {
                let members = value
                    .as_object()?
                    .iter()
                    .map(|(name, member)| Some((name.clone(), ArchiveMember::deserialize(member)?)))
                    .collect::<Option<BTreeMap<_, _>>>()?;
                ArchiveSource::Assets(members)
            }
            (ARCHIVE_PATH, value) => ArchiveSource::Path(value.as_str()?.to_string()),
            (_, value) => ArchiveSource::Uri(value.as_str()?.to_string()),
        };
        Some(Archive {
            source,
            hash: optional_hash(map)?,
        })
    }
}

/// Hex-encoded SHA-256 of asset content.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Attempts to read a special value out of a plain mapping.
pub type Recognizer = fn(&JsonObject) -> Option<PropertyValue>;

/// Recognizers in precedence order: assets are tried before archives.
pub const RECOGNIZERS: &[(&str, Recognizer)] = &[
    ("asset", recognize_asset),
    ("archive", recognize_archive),
];

pub fn recognize_asset(map: &JsonObject) -> Option<PropertyValue> {
    Asset::deserialize(map).map(PropertyValue::Asset)
}

pub fn recognize_archive(map: &JsonObject) -> Option<PropertyValue> {
    Archive::deserialize(map).map(PropertyValue::Archive)
}

/// Run the recognizer chain; the first match wins.
pub fn sniff(map: &JsonObject) -> Option<PropertyValue> {
    RECOGNIZERS.iter().find_map(|(name, recognize)| {
        let value = recognize(map)?;
        trace!("Recognized mapping as {}", name);
        Some(value)
    })
}

fn has_signature(map: &JsonObject, sig: &str) -> bool {
    map.get(SIG_KEY).and_then(JsonValue::as_str) == Some(sig)
}

fn only_known_fields(map: &JsonObject, payload: &[&str]) -> bool {
    map.keys()
        .all(|k| k == SIG_KEY || k == HASH_FIELD || payload.iter().any(|p| *p == k.as_str()))
}

// Exactly one payload field must be present.
fn single_payload<'a>(
    map: &'a JsonObject,
    payload: &[&'static str],
) -> Option<(&'static str, &'a JsonValue)> {
    let mut present = payload
        .iter()
        .filter_map(|field| map.get(*field).map(|value| (*field, value)));
    let first = present.next()?;
    if present.next().is_some() {
        return None;
    }
    Some(first)
}

// Outer None: malformed hash. Inner None: no hash.
fn optional_hash(map: &JsonObject) -> Option<Option<String>> {
    match map.get(HASH_FIELD) {
        None => Some(None),
        Some(JsonValue::String(hash)) => Some(Some(hash.clone())),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_text_asset_hash() {
        let asset = Asset::from_text("hello");
        assert_eq!(
            asset.hash(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[test]
    fn test_asset_serialize_layout() {
        let map = Asset::from_path("./index.html").serialize();
        assert_eq!(
            JsonValue::Object(map),
            json!({SIG_KEY: ASSET_SIG, "path": "./index.html"})
        );
    }

    #[test]
    fn test_asset_deserialize_each_source() {
        for asset in [
            Asset::from_text("body"),
            Asset::from_path("/tmp/a.txt"),
            Asset::from_uri("https://example.com/a.txt").with_hash("abc"),
        ] {
            assert_eq!(Asset::deserialize(&asset.serialize()), Some(asset));
        }
    }

    #[test]
    fn test_archive_with_nested_members() {
        let archive = Archive::from_assets([
            ("index.html", ArchiveMember::from(Asset::from_text("<html/>"))),
            ("lib", ArchiveMember::from(Archive::from_path("./lib.zip"))),
        ]);
        assert_eq!(Archive::deserialize(&archive.serialize()), Some(archive));
    }

    #[test]
    fn test_asset_requires_single_payload() {
        let none = object(json!({SIG_KEY: ASSET_SIG}));
        assert!(Asset::deserialize(&none).is_none());

        let two = object(json!({SIG_KEY: ASSET_SIG, "text": "a", "path": "b"}));
        assert!(Asset::deserialize(&two).is_none());

        let wrong_type = object(json!({SIG_KEY: ASSET_SIG, "text": 3}));
        assert!(Asset::deserialize(&wrong_type).is_none());
    }

    #[test]
    fn test_malformed_hash_is_not_a_match() {
        let map = object(json!({SIG_KEY: ASSET_SIG, "text": "a", "hash": 12}));
        assert!(Asset::deserialize(&map).is_none());
    }

    #[test]
    fn test_extra_fields_are_not_a_match() {
        let map = object(json!({SIG_KEY: ASSET_SIG, "text": "a", "owner": "me"}));
        assert!(Asset::deserialize(&map).is_none());
    }

    #[test]
    fn test_archive_member_must_be_special() {
        let map = object(json!({
            SIG_KEY: ARCHIVE_SIG,
            "assets": {"plain": {"text": "not an asset"}}
        }));
        assert!(Archive::deserialize(&map).is_none());
    }

    #[test]
    fn test_asset_signature_never_reads_as_archive() {
        let map = Asset::from_uri("s3://bucket/key").serialize();
        assert!(Archive::deserialize(&map).is_none());
        assert!(matches!(sniff(&map), Some(PropertyValue::Asset(_))));
    }

    #[test]
    fn test_archive_signature_never_reads_as_asset() {
        let map = Archive::from_uri("s3://bucket/key.zip").serialize();
        assert!(Asset::deserialize(&map).is_none());
        assert!(matches!(sniff(&map), Some(PropertyValue::Archive(_))));
    }

    #[test]
    fn test_mixed_payload_matches_neither() {
        // Asset signature with an archive payload, and the reverse.
        let asset_sig = object(json!({SIG_KEY: ASSET_SIG, "assets": {}}));
        assert!(sniff(&asset_sig).is_none());

        let archive_sig = object(json!({SIG_KEY: ARCHIVE_SIG, "text": "x"}));
        assert!(sniff(&archive_sig).is_none());
    }

    #[test]
    fn test_recognizer_order() {
        let names: Vec<&str> = RECOGNIZERS.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["asset", "archive"]);
    }

    #[test]
    fn test_unsigned_mapping_is_not_special() {
        let map = object(json!({"text": "hello"}));
        assert!(sniff(&map).is_none());
    }
}
