use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;

use crate::domain::{CategoryNode, DatasetRecord};
use crate::error::SyncError;

/// Read access to the RRK dataset catalog.
pub trait CatalogClient: Send + Sync {
    fn list_datasets(
        &self,
        collection: u32,
        skip: u32,
        limit: u32,
        order_by: &str,
        ascending: bool,
    ) -> Result<Vec<DatasetRecord>, SyncError>;
    fn get_hierarchy(&self, collection: u32, taxonomy: u32)
    -> Result<Vec<CategoryNode>, SyncError>;
}

impl<T: CatalogClient + ?Sized> CatalogClient for &T {
    fn list_datasets(
        &self,
        collection: u32,
        skip: u32,
        limit: u32,
        order_by: &str,
        ascending: bool,
    ) -> Result<Vec<DatasetRecord>, SyncError> {
        (**self).list_datasets(collection, skip, limit, order_by, ascending)
    }

    fn get_hierarchy(
        &self,
        collection: u32,
        taxonomy: u32,
    ) -> Result<Vec<CategoryNode>, SyncError> {
        (**self).get_hierarchy(collection, taxonomy)
    }
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
}

impl CatalogHttpClient {
    pub fn new(base_url: &str) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rrk-ckan/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::CatalogHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn datasets_url(&self, collection: u32) -> String {
        format!("{}/DatasetCollection/{collection}/Dataset", self.base_url)
    }

    pub fn hierarchy_url(&self, collection: u32, taxonomy: u32) -> String {
        format!(
            "{}/DatasetCollection/{collection}/taxonomy/{taxonomy}/hierarchy",
            self.base_url
        )
    }

    fn handle_status(response: Response) -> Result<Response, SyncError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "RRK request failed".to_string());
        Err(SyncError::CatalogStatus { status, message })
    }

    fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))
    }
}

impl CatalogClient for CatalogHttpClient {
    fn list_datasets(
        &self,
        collection: u32,
        skip: u32,
        limit: u32,
        order_by: &str,
        ascending: bool,
    ) -> Result<Vec<DatasetRecord>, SyncError> {
        let response = self
            .client
            .get(self.datasets_url(collection))
            .query(&[
                ("skip", skip.to_string()),
                ("limit", limit.to_string()),
                ("order_by", order_by.to_string()),
                ("ascending", ascending.to_string()),
            ])
            .send()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        Self::read_json(response)
    }

    fn get_hierarchy(
        &self,
        collection: u32,
        taxonomy: u32,
    ) -> Result<Vec<CategoryNode>, SyncError> {
        let response = self
            .client
            .get(self.hierarchy_url(collection, taxonomy))
            .send()
            .map_err(|err| SyncError::CatalogHttp(err.to_string()))?;
        Self::read_json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        let client = CatalogHttpClient::new("https://rrk.example/api/").unwrap();
        assert_eq!(
            client.datasets_url(100),
            "https://rrk.example/api/DatasetCollection/100/Dataset"
        );
        assert_eq!(
            client.hierarchy_url(100, 33),
            "https://rrk.example/api/DatasetCollection/100/taxonomy/33/hierarchy"
        );
    }
}
