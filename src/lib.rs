pub mod app;
pub mod catalog;
pub mod config;
pub mod crs;
pub mod domain;
pub mod error;
pub mod extent;
pub mod its;
pub mod ogc;
pub mod output;
pub mod package;
pub mod registry;
pub mod repair;
pub mod store;
pub mod taxonomy;
pub mod text;
