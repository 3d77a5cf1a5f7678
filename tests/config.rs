use assert_matches::assert_matches;

use insightify_console::config::{ConfigLoader, DEFAULT_N_CLUSTERS};
use insightify_console::domain::{Domain, DEFAULT_PRIORITY};
use insightify_console::error::ConsoleError;

#[test]
fn resolve_reads_explicit_path() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("insightify.json");
    std::fs::write(
        &path,
        r#"{
            "base_url": "https://analytics.example.com/",
            "access_token": "tok-123",
            "n_clusters": 5,
            "priority": ["video", "banking", "advertising"],
            "currency_prefix": "€"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(resolved.base_url, "https://analytics.example.com");
    assert_eq!(resolved.access_token.as_deref(), Some("tok-123"));
    assert_eq!(resolved.n_clusters, 5);
    assert_eq!(
        resolved.priority,
        vec![Domain::Video, Domain::Banking, Domain::Advertising]
    );
    assert_eq!(resolved.currency_prefix, "€");
}

#[test]
fn resolve_applies_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("insightify.json");
    std::fs::write(&path, r#"{ "base_url": "http://127.0.0.1:8000" }"#).unwrap();

    let resolved = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap();
    assert_eq!(resolved.n_clusters, DEFAULT_N_CLUSTERS);
    assert_eq!(resolved.priority, DEFAULT_PRIORITY.to_vec());
    assert_eq!(resolved.currency_prefix, "$");
    assert!(resolved.access_token.is_none());
}

#[test]
fn explicit_missing_path_is_a_read_error() {
    let err = ConfigLoader::resolve(Some("/definitely/not/here.json")).unwrap_err();
    assert_matches!(err, ConsoleError::ConfigRead(_));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("insightify.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ConfigLoader::resolve(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, ConsoleError::ConfigParse(_));
}
