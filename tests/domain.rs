use std::str::FromStr;

use assert_matches::assert_matches;

use eeview::domain::{Asset, AssetId, AssetKind, validate_segment};
use eeview::error::EeError;

#[test]
fn asset_kind_parsing() {
    assert_eq!(AssetKind::from_str("image_collection").unwrap(), AssetKind::ImageCollection);
    assert_eq!(AssetKind::from_str("BUCKET").unwrap(), AssetKind::Folder);
    assert_matches!(AssetKind::from_str("VIDEO"), Err(EeError::UnknownAssetKind(_)));
}

#[test]
fn asset_id_serializes_as_plain_string() {
    let asset = Asset::new(
        "projects/demo/assets/scene".parse().unwrap(),
        AssetKind::Image,
    );
    let value = serde_json::to_value(&asset).unwrap();
    assert_eq!(value["id"], "projects/demo/assets/scene");
    assert_eq!(value["kind"], "IMAGE");
    assert_eq!(value["name"], "scene");

    let bad: Result<AssetId, _> = serde_json::from_str("\"users/x\"");
    assert!(bad.is_err());
}

#[test]
fn project_root_helpers() {
    let project = AssetId::project("demo").unwrap();
    assert!(project.is_project_root());
    assert_eq!(project.name(), "demo");
    assert!(project.parent().unwrap().is_root());
    assert_eq!(project.relative_path(), "");
    assert_matches!(AssetId::root().join("x"), Err(EeError::RelativeParent(_)));
}

#[test]
fn folder_name_validation() {
    assert!(validate_segment("exports_2024").is_ok());
    for name in ["", "  ", "..", "a/b", "two words"] {
        assert_matches!(validate_segment(name), Err(EeError::InvalidFolderName(_)));
    }
}
