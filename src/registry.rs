use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::config::RegistrySettings;
use crate::error::SyncError;
use crate::package::PackageDocument;

const API_KEY_HEADER: &str = "X-CKAN-API-Key";
const DUPLICATE_NAME_MARKER: &str = "That URL is already in use.";
const MISSING_ORG_MARKER: &str = "Organization does not exist";

/// Write access to a CKAN instance.
pub trait RegistryClient: Send + Sync {
    /// Creates a package and returns its CKAN id.
    fn create_package(&self, package: &PackageDocument) -> Result<String, SyncError>;
    fn delete_package(&self, id: &str) -> Result<(), SyncError>;
    fn list_package_ids(&self) -> Result<Vec<String>, SyncError>;
    fn organization_exists(&self, name: &str) -> Result<bool, SyncError>;
}

/// Turns a failed CKAN action into a structured error.
///
/// CKAN only reports these conditions in its free-text error body, so this is
/// the single place that inspects message text.
pub fn classify_failure(status: u16, body: &str, package: &str, org: &str) -> SyncError {
    if body.contains(DUPLICATE_NAME_MARKER) {
        SyncError::DuplicateName(package.to_string())
    } else if body.contains(MISSING_ORG_MARKER) {
        SyncError::OrganizationNotFound(org.to_string())
    } else {
        SyncError::RegistryStatus {
            status,
            message: body.to_string(),
        }
    }
}

impl<T: RegistryClient + ?Sized> RegistryClient for &T {
    fn create_package(&self, package: &PackageDocument) -> Result<String, SyncError> {
        (**self).create_package(package)
    }

    fn delete_package(&self, id: &str) -> Result<(), SyncError> {
        (**self).delete_package(id)
    }

    fn list_package_ids(&self) -> Result<Vec<String>, SyncError> {
        (**self).list_package_ids()
    }

    fn organization_exists(&self, name: &str) -> Result<bool, SyncError> {
        (**self).organization_exists(name)
    }
}

/// Stand-in for commands that never write to CKAN; every call fails with
/// the missing setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRegistry;

impl RegistryClient for OfflineRegistry {
    fn create_package(&self, _package: &PackageDocument) -> Result<String, SyncError> {
        Err(SyncError::MissingSetting("CKAN_URL".to_string()))
    }

    fn delete_package(&self, _id: &str) -> Result<(), SyncError> {
        Err(SyncError::MissingSetting("CKAN_URL".to_string()))
    }

    fn list_package_ids(&self) -> Result<Vec<String>, SyncError> {
        Err(SyncError::MissingSetting("CKAN_URL".to_string()))
    }

    fn organization_exists(&self, _name: &str) -> Result<bool, SyncError> {
        Err(SyncError::MissingSetting("CKAN_URL".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct CreatedPackage {
    id: String,
}

#[derive(Clone)]
pub struct CkanHttpClient {
    client: Client,
    base_url: String,
}

impl CkanHttpClient {
    pub fn new(settings: &RegistrySettings) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rrk-ckan/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::RegistryHttp(err.to_string()))?,
        );
        headers.insert(
            HeaderName::from_static("x-ckan-api-key"),
            HeaderValue::from_str(&settings.api_key)
                .map_err(|_| SyncError::MissingSetting(format!("valid {API_KEY_HEADER}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn action_url(&self, action: &str) -> String {
        format!("{}/api/3/action/{action}", self.base_url)
    }

    fn send(request: RequestBuilder) -> Result<Response, SyncError> {
        request
            .send()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))
    }

    fn read_result<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
        let body: ActionResponse<T> = response
            .json()
            .map_err(|err| SyncError::RegistryHttp(err.to_string()))?;
        Ok(body.result)
    }

    fn failure_body(response: Response) -> (u16, String) {
        let status = response.status().as_u16();
        let body = response
            .text()
            .unwrap_or_else(|_| "CKAN request failed".to_string());
        (status, body)
    }
}

impl RegistryClient for CkanHttpClient {
    fn create_package(&self, package: &PackageDocument) -> Result<String, SyncError> {
        let response =
            Self::send(self.client.post(self.action_url("package_create")).json(package))?;
        if !response.status().is_success() {
            let (status, body) = Self::failure_body(response);
            return Err(classify_failure(
                status,
                &body,
                &package.name,
                &package.owner_org,
            ));
        }
        let created: CreatedPackage = Self::read_result(response)?;
        debug!(package = %package.name, id = %created.id, "package created");
        Ok(created.id)
    }

    fn delete_package(&self, id: &str) -> Result<(), SyncError> {
        let response = Self::send(
            self.client
                .post(self.action_url("package_delete"))
                .json(&json!({ "id": id })),
        )?;
        if !response.status().is_success() {
            let (status, message) = Self::failure_body(response);
            return Err(SyncError::RegistryStatus { status, message });
        }
        Ok(())
    }

    fn list_package_ids(&self) -> Result<Vec<String>, SyncError> {
        let response = Self::send(self.client.post(self.action_url("package_list")))?;
        if !response.status().is_success() {
            let (status, message) = Self::failure_body(response);
            return Err(SyncError::RegistryStatus { status, message });
        }
        Self::read_result(response)
    }

    fn organization_exists(&self, name: &str) -> Result<bool, SyncError> {
        let response = Self::send(
            self.client
                .get(self.action_url("organization_show"))
                .query(&[("id", name)]),
        )?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn duplicate_name_is_recognised() {
        let body = r#"{"success": false, "error": {"name": ["That URL is already in use."], "__type": "Validation Error"}}"#;
        assert_matches!(
            classify_failure(409, body, "clm-burn-probability", "sparcal"),
            SyncError::DuplicateName(name) if name == "clm-burn-probability"
        );
    }

    #[test]
    fn missing_org_is_recognised() {
        let body = r#"{"error": {"owner_org": ["Organization does not exist"]}}"#;
        assert_matches!(
            classify_failure(409, body, "clm-x", "sparcal"),
            SyncError::OrganizationNotFound(org) if org == "sparcal"
        );
    }

    #[test]
    fn other_failures_keep_status_and_body() {
        assert_matches!(
            classify_failure(500, "boom", "clm-x", "sparcal"),
            SyncError::RegistryStatus { status: 500, message } if message == "boom"
        );
    }

    #[test]
    fn action_urls() {
        let client = CkanHttpClient::new(&RegistrySettings {
            url: "https://ckan.example/".to_string(),
            api_key: "key".to_string(),
            org: "sparcal".to_string(),
        })
        .unwrap();
        assert_eq!(
            client.action_url("package_list"),
            "https://ckan.example/api/3/action/package_list"
        );
    }
}
