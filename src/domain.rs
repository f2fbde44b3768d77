use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;


/// Metadata field that carries the dataset description; its absence marks a
/// dataset that needs repair before assembly.
pub const NOTES_FIELD: &str = "metric_definition_and_relevance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFamily {
    Clm,
    Its,
}

impl DatasetFamily {
    pub fn prefix(self) -> &'static str {
        match self {
            DatasetFamily::Clm => "clm-",
            DatasetFamily::Its => "its-",
        }
    }

    pub fn owns(package_id: &str) -> bool {
        [DatasetFamily::Clm, DatasetFamily::Its]
            .iter()
            .any(|family| package_id.starts_with(family.prefix()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub name: String,
    #[serde(default)]
    pub text_value: Option<String>,
    #[serde(default)]
    pub float_value: Option<f64>,
}

impl MetadataEntry {
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            text_value: Some(value.to_string()),
            float_value: None,
        }
    }

    pub fn text_or_empty(&self) -> &str {
        self.text_value.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GisService {
    #[serde(default, deserialize_with = "null_as_default")]
    pub layer_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub service_type: String,
}

/// A dataset as listed by the RRK `DatasetCollection/{id}/Dataset` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub dataset_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dataset_metadata: Vec<MetadataEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gis_services: Vec<GisService>,
}

impl DatasetRecord {
    pub fn has_metadata(&self, name: &str) -> bool {
        self.dataset_metadata.iter().any(|entry| entry.name == name)
    }

    pub fn primary_service(&self) -> Option<&GisService> {
        self.gis_services.first()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One node of the RRK taxonomy hierarchy.
///
/// The API does not tag its nodes; a node is a category when it carries both
/// `taxonomy_item_name` and `children`, and a dataset leaf when it carries a
/// `dataset_id`. The distinction is made once here, at parse time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
pub enum CategoryNode {
    Category {
        name: String,
        key: String,
        label: String,
        children: Vec<CategoryNode>,
    },
    Dataset {
        dataset_id: i64,
        dataset_name: String,
    },
    Unknown,
}

impl CategoryNode {
    pub fn category(key: &str, label: &str, children: Vec<CategoryNode>) -> Self {
        CategoryNode::Category {
            name: label.to_string(),
            key: key.to_string(),
            label: label.to_string(),
            children,
        }
    }

    pub fn dataset(dataset_id: i64, dataset_name: &str) -> Self {
        CategoryNode::Dataset {
            dataset_id,
            dataset_name: dataset_name.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default)]
    taxonomy_item_name: Option<String>,
    #[serde(default)]
    children: Option<Vec<CategoryNode>>,
    #[serde(default)]
    key: Option<Value>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    dataset_id: Option<i64>,
    #[serde(default)]
    dataset_name: Option<String>,
}

impl From<RawNode> for CategoryNode {
    fn from(raw: RawNode) -> Self {
        match (raw.taxonomy_item_name, raw.children, raw.dataset_id) {
            (Some(name), Some(children), _) => CategoryNode::Category {
                name,
                key: raw.key.map(value_to_key).unwrap_or_default(),
                label: raw.label.unwrap_or_default(),
                children,
            },
            (_, _, Some(dataset_id)) => CategoryNode::Dataset {
                dataset_id,
                dataset_name: raw.dataset_name.unwrap_or_default(),
            },
            _ => CategoryNode::Unknown,
        }
    }
}

fn value_to_key(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The category that directly contains a dataset leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub key: String,
    pub label: String,
}

/// Geographic bounding box in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl Extent {
    pub fn from_corners(lower: (f64, f64), upper: (f64, f64)) -> Self {
        Self {
            lat_min: lower.0,
            lon_min: lower.1,
            lat_max: upper.0,
            lon_max: upper.1,
        }
    }

    /// `((lat_min, lon_min), (lat_max, lon_max))`
    pub fn corners(&self) -> ((f64, f64), (f64, f64)) {
        (
            (self.lat_min, self.lon_min),
            (self.lat_max, self.lon_max),
        )
    }

    /// Closed `[lon, lat]` ring traced clockwise from the lower-left corner.
    pub fn ring(&self) -> [[f64; 2]; 5] {
        [
            [self.lon_min, self.lat_min],
            [self.lon_max, self.lat_min],
            [self.lon_max, self.lat_max],
            [self.lon_min, self.lat_max],
            [self.lon_min, self.lat_min],
        ]
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_category_and_leaf_nodes() {
        let raw = r#"[{
            "taxonomy_item_name": "Fire Dynamics",
            "key": "0-1",
            "label": "Fire Dynamics",
            "children": [
                {"dataset_id": 7, "dataset_name": "Burn Probability", "key": "0-1-0"},
                {"label": "orphan"}
            ]
        }]"#;
        let forest: Vec<CategoryNode> = serde_json::from_str(raw).unwrap();
        let CategoryNode::Category { key, children, .. } = &forest[0] else {
            panic!("expected a category");
        };
        assert_eq!(key, "0-1");
        assert_matches!(children[0], CategoryNode::Dataset { dataset_id: 7, .. });
        assert_matches!(children[1], CategoryNode::Unknown);
    }

    #[test]
    fn numeric_keys_become_strings() {
        let raw = r#"{"taxonomy_item_name": "x", "key": 12, "label": "X", "children": []}"#;
        let node: CategoryNode = serde_json::from_str(raw).unwrap();
        assert_matches!(node, CategoryNode::Category { ref key, .. } if key == "12");
    }

    #[test]
    fn null_fields_default() {
        let raw = r#"{"dataset_id": 1, "name": "A", "file_path": null, "file_type": null,
                      "dataset_metadata": null, "gis_services": null}"#;
        let record: DatasetRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.file_path, "");
        assert!(record.dataset_metadata.is_empty());
        assert!(record.primary_service().is_none());
    }

    #[test]
    fn family_prefixes() {
        assert!(DatasetFamily::owns("clm-burn-probability"));
        assert!(DatasetFamily::owns("its-california"));
        assert!(!DatasetFamily::owns("other-package"));
    }

    #[test]
    fn ring_is_closed() {
        let extent = Extent::from_corners((32.0, -124.0), (42.0, -114.0));
        let ring = extent.ring();
        assert_eq!(ring[0], ring[4]);
        assert_eq!(ring[1], [-114.0, 32.0]);
    }
}
