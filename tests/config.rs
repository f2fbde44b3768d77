use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use rrk_ckan_sync::config::{Config, ConfigLoader, LookupTables};
use rrk_ckan_sync::error::SyncError;

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn file_settings_are_read() {
    let (_temp, root) = temp_root();
    let path = root.join("rrk-ckan.json");
    fs::write(
        path.as_std_path(),
        r#"{
            "rrk_api_url": "https://rrk.example/api",
            "org": "sparcal",
            "collection_id": 7,
            "wfs_url": "https://geo.example/wfs",
            "disambiguated_labels": ["Density - Snags"]
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::read(Some(path.as_str())).unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.collection_id, 7);
    assert_eq!(resolved.taxonomy_id, 33);
    assert_eq!(resolved.endpoints.wfs, "https://geo.example/wfs");
    assert_eq!(
        resolved.endpoints.wms,
        "https://sparcal.sdsc.edu/geoserver/rrk/wms"
    );
    assert_eq!(resolved.disambiguated_labels, vec!["Density - Snags".to_string()]);
    assert_eq!(resolved.org.as_deref(), Some("sparcal"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let (_temp, root) = temp_root();
    let path = root.join("absent.json");
    assert_matches!(
        ConfigLoader::read(Some(path.as_str())),
        Err(SyncError::ConfigRead(_))
    );
}

#[test]
fn invalid_json_is_reported() {
    let (_temp, root) = temp_root();
    let path = root.join("broken.json");
    fs::write(path.as_std_path(), "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::read(Some(path.as_str())),
        Err(SyncError::ConfigParse(_))
    );
}

#[test]
fn catalog_url_is_required() {
    assert_matches!(
        ConfigLoader::resolve_config(Config::default()),
        Err(SyncError::MissingSetting(name)) if name == "RRK_API_URL"
    );
}

#[test]
fn legacy_env_names_are_honoured() {
    let config = ConfigLoader::apply_env(Config::default(), |name| match name {
        "ckan_url" => Some("https://ckan.example".to_string()),
        "api_key" => Some("key".to_string()),
        "rrk_api_url" => Some("https://rrk.example".to_string()),
        "org_ckan_name" => Some("sparcal".to_string()),
        _ => None,
    });
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    let registry = resolved.registry().unwrap();
    assert_eq!(registry.url, "https://ckan.example");
    assert_eq!(registry.api_key, "key");
    assert_eq!(registry.org, "sparcal");
}

#[test]
fn lookup_tables_load_from_json() {
    let (_temp, root) = temp_root();
    let urls = root.join("clm_download_urls.json");
    let keywords = root.join("dataset_keywords_map.json");
    fs::write(
        urls.as_std_path(),
        r#"["https://data.example/a/burn.zip", "https://data.example/b/burn.zip"]"#,
    )
    .unwrap();
    fs::write(
        keywords.as_std_path(),
        r#"{"clm-burn-probability": ["Fire", "Probability"]}"#,
    )
    .unwrap();

    let tables = LookupTables::load(&urls, &keywords).unwrap();
    assert_eq!(
        tables.download_url_for("burn.zip"),
        Some("https://data.example/a/burn.zip")
    );
    assert_eq!(tables.download_url_for(""), None);
    assert_eq!(tables.keywords_for("clm-burn-probability").len(), 2);
    assert!(tables.keywords_for("clm-unknown").is_empty());
}

#[test]
fn underscored_keyword_keys_match_hyphenated_slugs() {
    let (_temp, root) = temp_root();
    let urls = root.join("clm_download_urls.json");
    let keywords = root.join("dataset_keywords_map.json");
    fs::write(urls.as_std_path(), "[]").unwrap();
    fs::write(
        keywords.as_std_path(),
        r#"{"clm-annual_biomass": ["Carbon"]}"#,
    )
    .unwrap();

    let tables = LookupTables::load(&urls, &keywords).unwrap();
    assert_eq!(tables.keywords_for("clm-annual-biomass"), ["Carbon".to_string()]);
}

#[test]
fn missing_lookup_table_names_the_file() {
    let (_temp, root) = temp_root();
    let absent = root.join("absent.json");
    assert_matches!(
        LookupTables::load(&absent, &absent),
        Err(SyncError::LookupTable { path, .. }) if path.ends_with("absent.json")
    );
}
