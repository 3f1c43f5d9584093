use std::fs;

use assert_matches::assert_matches;

use eeview::config::{Config, ConfigLoader, DEFAULT_API_URL};
use eeview::error::EeError;

#[test]
fn parse_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eeview.json");
    fs::write(
        &path,
        r##"{
            "schema_version": 1,
            "project": "demo",
            "token": "ya29.file",
            "api_url": "http://localhost:8080",
            "chart_colors": ["#000000", "#ffffff"]
        }"##,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.project.as_deref(), Some("demo"));
    assert_eq!(resolved.api_url, "http://localhost:8080");
    assert_eq!(resolved.chart_colors.unwrap().len(), 2);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(EeError::ConfigRead(_))
    );
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eeview.json");
    fs::write(&path, "{ project: demo }").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(EeError::ConfigParse(_))
    );
}

#[test]
fn token_read_from_credentials_file() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = dir.path().join("credentials");
    fs::write(&credentials, r#"{"access_token": "ya29.stored", "refresh_token": "r"}"#).unwrap();

    let config = Config {
        credentials_path: Some(credentials.to_string_lossy().into_owned()),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config, None).unwrap();
    assert_eq!(resolved.token.as_deref(), Some("ya29.stored"));
    assert_eq!(resolved.api_url, DEFAULT_API_URL);
}

#[test]
fn blank_values_are_ignored() {
    let config = Config {
        project: Some("  ".to_string()),
        token: Some(String::new()),
        chart_colors: Some(Vec::new()),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config, Some(" ".to_string())).unwrap();
    assert!(resolved.project.is_none());
    assert!(resolved.token.is_none());
    assert!(resolved.chart_colors.is_none());
}
