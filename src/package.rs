//! CKAN package documents and their assembly from RRK dataset records.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{LookupTables, ServiceEndpoints};
use crate::domain::{CategoryRef, DatasetFamily, DatasetRecord, Extent, NOTES_FIELD};
use crate::error::SyncError;
use crate::extent::ExtentResolver;
use crate::ogc::{OgcClient, WCS_VERSION, WFS_VERSION, WMS_VERSION};
use crate::text::{
    clean_description, fix_title, normalize_text, slugify, title_case, trim_trailing_markup,
};

pub const COLLECTION_NAME: &str = "California Landscape Metrics";
pub const SERVICE_SRS: &str = "EPSG:3310";
pub const SHAPEFILE_FORMAT: &str = "Shapefile";
pub const DOWNLOAD_DESCRIPTION: &str = "An HTTP link to download the ZIP file";

/// Layer names RRK publishes that GeoServer knows under another name.
const LAYER_CORRECTIONS: [(&str, &str); 1] = [(
    "rrk:predlightningigncause_19922015_202406_t3_v5",
    "wldfireigncauselightning_19922020_202312_t1_v5",
)];

/// Body of a CKAN `package_create` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageDocument {
    pub name: String,
    pub title: String,
    pub owner_org: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub extras: Vec<Extra>,
    pub resources: Vec<Resource>,
    pub tags: Vec<Tag>,
}

impl PackageDocument {
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras
            .iter()
            .find(|extra| extra.key == key)
            .map(|extra| &extra.value)
    }

    pub fn resources_with_format(&self, format: &str) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(move |resource| resource.format == format)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extra {
    pub key: String,
    pub value: Value,
}

impl Extra {
    pub fn new(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    pub description: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(flatten)]
    pub service: Option<ServiceFields>,
}

impl Resource {
    /// A plain link with no OGC service fields.
    pub fn link(name: &str, description: &str, format: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            format: format.to_string(),
            resource_type: None,
            url: url.to_string(),
            mimetype: None,
            service: None,
        }
    }

    fn ogc(title: &str, protocol: &str, url: &str, service: ServiceFields) -> Self {
        Self {
            name: title.to_string(),
            description: format!("{protocol} for {title}"),
            format: protocol.to_string(),
            resource_type: Some("api".to_string()),
            url: url.to_string(),
            mimetype: Some("text/xml".to_string()),
            service: Some(service),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServiceFields {
    Wms {
        wms_layer: String,
        wms_version: String,
        service_type: String,
        wms_srs: String,
    },
    Wcs {
        wcs_coverage_id: String,
        wcs_version: String,
        service_type: String,
        wcs_srs: String,
    },
    Wfs {
        wfs_feature_id: String,
        wfs_version: String,
        service_type: String,
        wfs_srs: String,
    },
}

/// GeoJSON polygon of `extent`, serialized as CKAN expects in the `spatial` extra.
pub fn spatial_polygon(extent: &Extent, crs: Option<&str>) -> String {
    let mut geometry = json!({
        "type": "Polygon",
        "coordinates": [extent.ring()],
    });
    if let (Some(crs), Value::Object(map)) = (crs, &mut geometry) {
        map.insert(
            "crs".to_string(),
            json!({"type": "name", "properties": {"name": crs}}),
        );
    }
    geometry.to_string()
}

pub fn corrected_layer_name(layer: &str) -> &str {
    LAYER_CORRECTIONS
        .iter()
        .find(|(from, _)| *from == layer)
        .map(|(_, to)| *to)
        .unwrap_or(layer)
}

/// Builds CLM package documents for one organization.
#[derive(Debug, Clone)]
pub struct PackageAssembler {
    org: String,
    endpoints: ServiceEndpoints,
    disambiguated_labels: Vec<String>,
    lookups: LookupTables,
}

impl PackageAssembler {
    pub fn new(
        org: impl Into<String>,
        endpoints: ServiceEndpoints,
        disambiguated_labels: Vec<String>,
        lookups: LookupTables,
    ) -> Self {
        Self {
            org: org.into(),
            endpoints,
            disambiguated_labels,
            lookups,
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Package title before display casing: the normalized dataset name,
    /// prefixed with its category label when that label is ambiguous.
    pub fn base_title(&self, dataset: &DatasetRecord, category: Option<&CategoryRef>) -> String {
        let title = normalize_text(Some(&dataset.name));
        match category {
            Some(category)
                if self
                    .disambiguated_labels
                    .iter()
                    .any(|label| *label == category.label) =>
            {
                format!("{} - {title}", category.label)
            }
            _ => title,
        }
    }

    pub fn assemble<O: OgcClient>(
        &self,
        dataset: &DatasetRecord,
        category: Option<&CategoryRef>,
        extents: &ExtentResolver<O>,
    ) -> Result<PackageDocument, SyncError> {
        let base_title = self.base_title(dataset, category);
        let name = format!("{}{}", DatasetFamily::Clm.prefix(), slugify(&base_title));
        let title = fix_title(&title_case(&base_title));

        let mut extras = vec![
            Extra::new("File Name", dataset.file_path.as_str()),
            Extra::new(
                "Category",
                category.map_or(Value::Null, |category| Value::from(category.label.as_str())),
            ),
            Extra::new("Collection Name", COLLECTION_NAME),
        ];

        let mut notes = None;
        for entry in &dataset.dataset_metadata {
            let text = entry.text_or_empty();
            match entry.name.as_str() {
                "creation_method" => {
                    extras.push(Extra::new("Creation Method", clean_description(text)))
                }
                "data_vintage" => extras.push(Extra::new("Data Vintage", trim_trailing_markup(text))),
                NOTES_FIELD => {
                    let description = clean_description(text);
                    notes = Some(description.clone());
                    extras.push(Extra::new("Metric Definition and Relevance", description));
                }
                "data_units" => extras.push(Extra::new("Data Units", trim_trailing_markup(text))),
                "tier" => extras.push(Extra::new("Tier", trim_trailing_markup(text))),
                "min_value" => extras.push(Extra::new("Minimum Value", float_value(entry.float_value))),
                "max_value" => extras.push(Extra::new("Maximum Value", float_value(entry.float_value))),
                "data_resolution" => extras.push(Extra::new(
                    "Resolution",
                    entry.text_value.clone().map_or(Value::Null, Value::String),
                )),
                _ => {}
            }
        }
        let notes = notes.ok_or_else(|| SyncError::MissingNotes(name.clone()))?;

        let tags = self
            .lookups
            .keywords_for(&name)
            .iter()
            .map(|keyword| Tag {
                name: keyword.clone(),
            })
            .collect();

        let service = dataset
            .primary_service()
            .ok_or_else(|| SyncError::MissingGisService(name.clone()))?;
        let layer = corrected_layer_name(&service.layer_name);

        let resolved = extents.resolve(layer);
        if let Some(extent) = &resolved.extent {
            extras.push(Extra::new("spatial", spatial_polygon(extent, None)));
        }

        let mut resources = vec![Resource::ogc(
            &title,
            "WMS",
            &self.endpoints.wms,
            ServiceFields::Wms {
                wms_layer: layer.to_string(),
                wms_version: WMS_VERSION.to_string(),
                service_type: service.service_type.clone(),
                wms_srs: SERVICE_SRS.to_string(),
            },
        )];

        let format = if resolved.has_coverage() {
            resources.push(Resource::ogc(
                &title,
                "WCS",
                &self.endpoints.wcs,
                ServiceFields::Wcs {
                    wcs_coverage_id: layer.replace(':', "__"),
                    wcs_version: WCS_VERSION.to_string(),
                    service_type: service.service_type.clone(),
                    wcs_srs: SERVICE_SRS.to_string(),
                },
            ));
            dataset.file_type.clone()
        } else {
            resources.push(Resource::ogc(
                &title,
                "WFS",
                &self.endpoints.wfs,
                ServiceFields::Wfs {
                    wfs_feature_id: layer.to_string(),
                    wfs_version: WFS_VERSION.to_string(),
                    service_type: service.service_type.clone(),
                    wfs_srs: SERVICE_SRS.to_string(),
                },
            ));
            SHAPEFILE_FORMAT.to_string()
        };
        extras.push(Extra::new("format", format.as_str()));

        if let Some(url) = self.lookups.download_url_for(&dataset.file_path) {
            let file_name = url.rsplit('/').next().unwrap_or(url);
            resources.push(Resource::link(file_name, DOWNLOAD_DESCRIPTION, &format, url));
        }

        debug!(package = %name, resources = resources.len(), "assembled package");

        Ok(PackageDocument {
            name,
            title,
            owner_org: self.org.clone(),
            kind: "dataset".to_string(),
            private: None,
            notes: Some(notes),
            extras,
            resources,
            tags,
        })
    }
}

fn float_value(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::from)
}
