use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub const DEFAULT_CONFIG_FILE: &str = "rrk-ckan.json";
pub const DEFAULT_COLLECTION_ID: u32 = 100;
pub const DEFAULT_TAXONOMY_ID: u32 = 33;
pub const DEFAULT_PAGE_LIMIT: u32 = 500;
pub const DEFAULT_WMS_URL: &str = "https://sparcal.sdsc.edu/geoserver/rrk/wms";
pub const DEFAULT_WCS_URL: &str = "https://sparcal.sdsc.edu/geoserver/rrk/wcs";
pub const DEFAULT_WFS_URL: &str = "https://sparcal.sdsc.edu/geoserver/rrk/wfs";
pub const DEFAULT_DOWNLOAD_URLS: &str = "clm_download_urls.json";
pub const DEFAULT_KEYWORDS: &str = "dataset_keywords_map.json";
pub const DEFAULT_SNAPSHOT: &str = "/tmp/rrk.json";

/// Environment variables for each setting; the first one set wins.
const ENV_CKAN_URL: [&str; 2] = ["CKAN_URL", "ckan_url"];
const ENV_API_KEY: [&str; 2] = ["CKAN_API_KEY", "api_key"];
const ENV_RRK_API_URL: [&str; 2] = ["RRK_API_URL", "rrk_api_url"];
const ENV_ORG: [&str; 2] = ["CKAN_ORG", "org_ckan_name"];

/// On-disk configuration. Every field is optional; environment variables
/// override what the file says.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ckan_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub rrk_api_url: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub collection_id: Option<u32>,
    #[serde(default)]
    pub taxonomy_id: Option<u32>,
    #[serde(default)]
    pub page_limit: Option<u32>,
    #[serde(default)]
    pub wms_url: Option<String>,
    #[serde(default)]
    pub wcs_url: Option<String>,
    #[serde(default)]
    pub wfs_url: Option<String>,
    #[serde(default)]
    pub download_urls: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
    /// Category labels whose datasets get the label prepended to their title.
    #[serde(default)]
    pub disambiguated_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoints {
    pub wms: String,
    pub wcs: String,
    pub wfs: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            wms: DEFAULT_WMS_URL.to_string(),
            wcs: DEFAULT_WCS_URL.to_string(),
            wfs: DEFAULT_WFS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    pub url: String,
    pub api_key: String,
    pub org: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub rrk_api_url: String,
    pub ckan_url: Option<String>,
    pub api_key: Option<String>,
    pub org: Option<String>,
    pub collection_id: u32,
    pub taxonomy_id: u32,
    pub page_limit: u32,
    pub endpoints: ServiceEndpoints,
    pub download_urls: Utf8PathBuf,
    pub keywords: Utf8PathBuf,
    pub snapshot: Utf8PathBuf,
    pub disambiguated_labels: Vec<String>,
}

impl ResolvedConfig {
    /// CKAN settings; only commands that talk to CKAN need them.
    pub fn registry(&self) -> Result<RegistrySettings, SyncError> {
        Ok(RegistrySettings {
            url: required(&self.ckan_url, ENV_CKAN_URL[0])?,
            api_key: required(&self.api_key, ENV_API_KEY[0])?,
            org: required(&self.org, ENV_ORG[0])?,
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String, SyncError> {
    value
        .clone()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| SyncError::MissingSetting(name.to_string()))
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SyncError> {
        let config = Self::read(path)?;
        let config = Self::apply_env(config, |name| std::env::var(name).ok());
        Self::resolve_config(config)
    }

    /// Reads the config file. A missing default file is an empty config; a
    /// missing file that was asked for explicitly is an error.
    pub fn read(path: Option<&str>) -> Result<Config, SyncError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SyncError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| SyncError::ConfigParse(err.to_string()))
    }

    pub fn apply_env<F>(mut config: Config, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |names: [&str; 2]| names.into_iter().find_map(&lookup);
        if let Some(value) = first_set(ENV_CKAN_URL) {
            config.ckan_url = Some(value);
        }
        if let Some(value) = first_set(ENV_API_KEY) {
            config.api_key = Some(value);
        }
        if let Some(value) = first_set(ENV_RRK_API_URL) {
            config.rrk_api_url = Some(value);
        }
        if let Some(value) = first_set(ENV_ORG) {
            config.org = Some(value);
        }
        config
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SyncError> {
        let rrk_api_url = required(&config.rrk_api_url, ENV_RRK_API_URL[0])?
            .trim_end_matches('/')
            .to_string();

        let endpoints = ServiceEndpoints {
            wms: config.wms_url.unwrap_or_else(|| DEFAULT_WMS_URL.to_string()),
            wcs: config.wcs_url.unwrap_or_else(|| DEFAULT_WCS_URL.to_string()),
            wfs: config.wfs_url.unwrap_or_else(|| DEFAULT_WFS_URL.to_string()),
        };

        let page_limit = config.page_limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if page_limit == 0 {
            return Err(SyncError::ConfigParse(
                "page_limit must be positive".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            rrk_api_url,
            ckan_url: config
                .ckan_url
                .map(|url| url.trim_end_matches('/').to_string()),
            api_key: config.api_key,
            org: config.org,
            collection_id: config.collection_id.unwrap_or(DEFAULT_COLLECTION_ID),
            taxonomy_id: config.taxonomy_id.unwrap_or(DEFAULT_TAXONOMY_ID),
            page_limit,
            endpoints,
            download_urls: Utf8PathBuf::from(
                config
                    .download_urls
                    .unwrap_or_else(|| DEFAULT_DOWNLOAD_URLS.to_string()),
            ),
            keywords: Utf8PathBuf::from(
                config
                    .keywords
                    .unwrap_or_else(|| DEFAULT_KEYWORDS.to_string()),
            ),
            snapshot: Utf8PathBuf::from(
                config
                    .snapshot
                    .unwrap_or_else(|| DEFAULT_SNAPSHOT.to_string()),
            ),
            disambiguated_labels: config
                .disambiguated_labels
                .unwrap_or_else(default_disambiguated_labels),
        })
    }
}

/// Category labels shared by several metrics with identical names.
pub fn default_disambiguated_labels() -> Vec<String> {
    [
        "Functional Species Richness",
        "Annual biomass data (2001-2021)",
        "Sierra Nevada Cost of Potential Treatments",
        "Northern CA Cost of Potential Treatments",
        "Ignition Cause -1992-2020",
        "Fire Return Interval Departure (FRID)",
        "Sierra Nevada - Large Tree Density",
        "Northern CA - Large Tree Density",
        "Density - Snags",
        "SDI: Stand Density Index",
        "SDI: Proportion of Max",
        "Distribution of Above Ground Live Biomass in Vegetation Type Categories",
        "Climate refugia (MIROC MODEL - hotter and drier)",
        "American Indian Or Alaska Native Race Alone And Multi-Race Population Concentration",
        "Hispanic and Latino Population Concentration",
        "Black and African American Population Concentration",
        "Asian Population Concentration",
        "Multi-race, Except Part-American Indian Pop. Concentration",
        "Low Income Population Concentration",
        "Hispanic and or Black, Indigenous Or People of Color (HSPBIPOC) Population Concentration",
    ]
    .iter()
    .map(|label| label.to_string())
    .collect()
}

/// Static inputs of a CLM run: download links and per-package keywords.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    pub download_urls: Vec<String>,
    /// Keyed by package name (`clm-<slug>`).
    pub keywords: HashMap<String, Vec<String>>,
}

impl LookupTables {
    pub fn load(download_urls: &Utf8Path, keywords: &Utf8Path) -> Result<Self, SyncError> {
        let keywords: HashMap<String, Vec<String>> = read_table(keywords)?;
        Ok(Self {
            download_urls: read_table(download_urls)?,
            // Older maps were keyed with `_` kept inside slugs.
            keywords: keywords
                .into_iter()
                .map(|(name, tags)| (name.replace('_', "-"), tags))
                .collect(),
        })
    }

    pub fn keywords_for(&self, package_name: &str) -> &[String] {
        self.keywords
            .get(package_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First download link containing `file_path`.
    pub fn download_url_for(&self, file_path: &str) -> Option<&str> {
        if file_path.is_empty() {
            return None;
        }
        self.download_urls
            .iter()
            .find(|url| url.contains(file_path))
            .map(String::as_str)
    }
}

fn read_table<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, SyncError> {
    let content = fs::read_to_string(path.as_std_path()).map_err(|err| SyncError::LookupTable {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|err| SyncError::LookupTable {
        path: path.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config {
            rrk_api_url: Some("https://rrk.example/api/".to_string()),
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.rrk_api_url, "https://rrk.example/api");
        assert_eq!(resolved.collection_id, DEFAULT_COLLECTION_ID);
        assert_eq!(resolved.taxonomy_id, DEFAULT_TAXONOMY_ID);
        assert_eq!(resolved.endpoints, ServiceEndpoints::default());
        assert_eq!(resolved.snapshot, Utf8PathBuf::from(DEFAULT_SNAPSHOT));
        assert_eq!(resolved.disambiguated_labels.len(), 20);
    }

    #[test]
    fn registry_settings_are_checked_on_demand() {
        let config = Config {
            rrk_api_url: Some("https://rrk.example".to_string()),
            ckan_url: Some("https://ckan.example".to_string()),
            api_key: Some("secret".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_matches!(
            resolved.registry(),
            Err(SyncError::MissingSetting(name)) if name == "CKAN_ORG"
        );
    }

    #[test]
    fn uppercase_env_wins_over_legacy_name() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CKAN_URL", "https://new.example"),
            ("ckan_url", "https://old.example"),
            ("org_ckan_name", "sparcal"),
        ]);
        let config = ConfigLoader::apply_env(Config::default(), |name| {
            env.get(name).map(|value| value.to_string())
        });
        assert_eq!(config.ckan_url.as_deref(), Some("https://new.example"));
        assert_eq!(config.org.as_deref(), Some("sparcal"));
        assert_eq!(config.api_key, None);
    }
}
