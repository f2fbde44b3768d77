use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("missing required setting: {0}")]
    MissingSetting(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to load lookup table {path}: {message}")]
    LookupTable { path: String, message: String },

    #[error("RRK request failed: {0}")]
    CatalogHttp(String),

    #[error("RRK returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("CKAN request failed: {0}")]
    RegistryHttp(String),

    #[error("CKAN returned status {status}: {message}")]
    RegistryStatus { status: u16, message: String },

    #[error("a package named {0} already exists in CKAN")]
    #[diagnostic(help("delete the existing package or rerun with --skip-existing"))]
    DuplicateName(String),

    #[error("no organization in CKAN has the name: {0}")]
    OrganizationNotFound(String),

    #[error("OGC request failed: {0}")]
    OgcHttp(String),

    #[error("invalid OGC response: {0}")]
    OgcParse(String),

    #[error("reprojection failed: {0}")]
    Reprojection(String),

    #[error("unsupported coordinate reference system: EPSG:{0}")]
    UnsupportedCrs(String),

    #[error("no notes for package {0}")]
    #[diagnostic(help("the dataset has no metric_definition_and_relevance metadata entry"))]
    MissingNotes(String),

    #[error("dataset {0} has no GIS service")]
    MissingGisService(String),

    #[error("dataset not found in RRK: {0}")]
    DatasetNotFound(i64),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
