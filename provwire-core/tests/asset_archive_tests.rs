// Assets and archives must survive marshal -> wire -> unmarshal unchanged, and
// the two kinds must never be confused with each other or with plain objects.

use provwire_core::resource::{ARCHIVE_SIG, ASSET_SIG, SIG_KEY};
use provwire_core::{
    marshal_properties, unmarshal_properties, unmarshal_property_value, Archive, ArchiveMember,
    Asset, MarshalOptions, PropertyMap, PropertyValue, WireStruct, WireValue,
};
use serde_json::json;

fn round_trip(value: PropertyValue) -> PropertyValue {
    let map: PropertyMap = [("v", value)].into_iter().collect();
    let fields = marshal_properties(&map, MarshalOptions::default()).unwrap();

    // Push it through JSON text as a transport would.
    let text = serde_json::to_string(&WireValue::Struct(fields)).unwrap();
    let wire: WireValue = serde_json::from_str(&text).unwrap();

    let mut back = unmarshal_properties(wire.as_struct(), MarshalOptions::default()).unwrap();
    back.remove("v").unwrap()
}

fn wire_of(doc: serde_json::Value) -> WireValue {
    WireValue::from_json(&doc)
}

#[test]
fn test_text_asset_round_trip() {
    let asset = Asset::from_text("<h1>hello</h1>");
    assert_eq!(round_trip(asset.clone().into()), PropertyValue::Asset(asset));
}

#[test]
fn test_path_and_uri_assets_round_trip() {
    for asset in [
        Asset::from_path("./site/index.html"),
        Asset::from_uri("https://example.com/logo.png"),
    ] {
        assert_eq!(round_trip(asset.clone().into()), PropertyValue::Asset(asset));
    }
}

#[test]
fn test_archive_round_trip() {
    for archive in [
        Archive::from_path("./lambda.zip"),
        Archive::from_uri("s3://artifacts/lambda.zip").with_hash("feed"),
        Archive::from_assets([
            ("index.js", ArchiveMember::from(Asset::from_text("exports.handler = 1"))),
            ("vendor", ArchiveMember::from(Archive::from_path("./node_modules"))),
        ]),
    ] {
        assert_eq!(round_trip(archive.clone().into()), PropertyValue::Archive(archive));
    }
}

#[test]
fn test_assets_nested_in_objects_and_arrays() {
    let value = PropertyValue::Array(vec![
        Asset::from_path("a.txt").into(),
        [("code", PropertyValue::from(Archive::from_path("b.zip")))]
            .into_iter()
            .collect::<PropertyMap>()
            .into(),
    ]);
    assert_eq!(round_trip(value.clone()), value);
}

#[test]
fn test_asset_shaped_struct_is_not_archive() {
    let wire = wire_of(json!({SIG_KEY: ASSET_SIG, "uri": "https://example.com/x"}));
    let value = unmarshal_property_value(&wire, MarshalOptions::default()).unwrap();
    assert_eq!(value, PropertyValue::Asset(Asset::from_uri("https://example.com/x")));
}

#[test]
fn test_archive_shaped_struct_is_not_asset() {
    let wire = wire_of(json!({SIG_KEY: ARCHIVE_SIG, "path": "./dist"}));
    let value = unmarshal_property_value(&wire, MarshalOptions::default()).unwrap();
    assert_eq!(value, PropertyValue::Archive(Archive::from_path("./dist")));
}

#[test]
fn test_mapping_with_both_payloads_falls_through_to_object() {
    // Carries the asset signature but an archive's payload as well.
    let wire = wire_of(json!({SIG_KEY: ASSET_SIG, "text": "x", "assets": {}}));
    let value = unmarshal_property_value(&wire, MarshalOptions::default()).unwrap();
    match value {
        PropertyValue::Object(map) => {
            assert!(map.contains_key("text"));
            assert!(map.contains_key("assets"));
        }
        other => panic!("Expected object, got {:?}", other),
    }
}

#[test]
fn test_unsigned_mapping_stays_object() {
    let wire = wire_of(json!({"path": "./dist", "uri": "s3://x"}));
    let value = unmarshal_property_value(&wire, MarshalOptions::default()).unwrap();
    assert!(matches!(value, PropertyValue::Object(_)));
}

#[test]
fn test_unknown_signature_stays_object() {
    let wire = wire_of(json!({SIG_KEY: "not-a-signature", "text": "x"}));
    let value = unmarshal_property_value(&wire, MarshalOptions::default()).unwrap();
    assert!(matches!(value, PropertyValue::Object(_)));
}

#[test]
fn test_skip_nulls_does_not_break_recognition() {
    let mut fields = WireStruct::new();
    fields.insert(SIG_KEY.to_string(), WireValue::String(ASSET_SIG.to_string()));
    fields.insert("path".to_string(), WireValue::String("a.txt".to_string()));
    fields.insert("hash".to_string(), WireValue::Null);

    let opts = MarshalOptions::default().with_skip_nulls(true);
    let value = unmarshal_property_value(&WireValue::Struct(fields.clone()), opts).unwrap();
    assert_eq!(value, PropertyValue::Asset(Asset::from_path("a.txt")));

    // Without skipping, a null hash is malformed and the struct stays an object.
    let value =
        unmarshal_property_value(&WireValue::Struct(fields), MarshalOptions::default()).unwrap();
    assert!(matches!(value, PropertyValue::Object(_)));
}
