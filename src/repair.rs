//! Hand-authored metadata for the legacy CLM datasets that RRK publishes
//! without a `metric_definition_and_relevance` entry.
//!
//! Keyed by exact dataset name. Any other dataset missing the field is left
//! alone and fails package assembly with [`SyncError::MissingNotes`].
//!
//! [`SyncError::MissingNotes`]: crate::error::SyncError::MissingNotes

use tracing::info;

use crate::domain::{DatasetRecord, MetadataEntry, NOTES_FIELD};

const MORTALITY_DEFINITION: &str = "The dead tree canopy cover fraction change from the Mortality Magnitude Index (MMI) for eDaRT events. This metric is provided to complement data (in terms of spatial resolution and canopy cover loss estimates) available from the Region 5 Insect and Disease Survey that performs aerial detection monitoring in support of tracking tree mortality that includes affected hosts and agents (available at: <https://www.fs.usda.gov/detail/r5/forest-grasslandhealth/?cid=fsbdev3_046696>). ";

const MORTALITY_CREATION: &str = "Insect- and disease-caused tree mortality was compiled at the 30 m scale from the Ecosystem Disturbance and Recovery Tracker (eDaRT; Koltunov et al. 2020), described in the [Introduction](https://docs.google.com/document/d/15tXCMkEzUEgQKHoXL74cftwtLuz3z-Rm/edit#heading=h.2s8eyo1). This metric represents the 2021 status of cumulative tree mortality occurring over the years 2017 to 2021. An additional version represents the mortality of the last 1 year (2021). Note that tree mortality which, since its occurrence, was affected by fire or land management activities has been removed. This data layer currently exists only for the Sierra Nevada region. Efforts are underway to explore development of these data for the rest of California.";

const DISTURBANCE_DEFINITION: &str = r#"The metric for time since disturbance ("tsd") was measured as time in years before 2021 since the most recent disturbance of at least 25% canopy cover loss per 30m pixel as defined by eDaRT Mortality Magnitude Index (MMI) layers. MMI values less than 25% were not considered. 

The most recent disturbance class ("dist_class") of the most recent
disturbance of 25% magnitude or greater detected by eDaRT and were prioritized
in the order: fire (1), treatment (2), eDaRT (3). For example, if a pixel
intersected a fire perimeter and a treatment polygon, that pixel would be
assigned a code of 1 (fire) rather than 2 (treatment). Note that while the
occurrence of and magnitude of a disturbance was determined using eDaRT,
disturbance class was determined first using fire perimeters and FACTS
activities, with remaining eDaRT disturbances collectively assigned to insect-
and disease-related tree mortality. This data layer currently exists only for
the Sierra Nevada region."#;

const DISTURBANCE_CREATION: &str = "Layers representing time since disturbance, most recent disturbance magnitude, and most recent disturbance class were produced using the Ecosystem Disturbance and Recovery Tracker (eDaRT), Forest Activities ([FACTS](https://data.fs.usda.gov/nrm/briefingpapers/FACTS.pdf)) and CAL FIRE Timber Harvesting Plan ([THP](https://www.fire.ca.gov/programs/resource-management/forest-practice/timber-harvesting/timber-harvesting-plan-thp/)) databases, and the CAL FIRE Fire and Resource Assessment Program ([FRAP](https://frap.fire.ca.gov/mapping/gis-data/)) fire perimeter dataset. All layers are complete for the entire area within the 300s and 400s eDaRT scenes as well as for scenes 103, 105, and 501. The reference year was set to 2021 since fire history and eDaRT only reported up through 2020. The earliest year assessed was 2010 since eDaRT data prior to 2010 was used for model training and is not reliable.  \n";

struct LegacyMetadata {
    definition: &'static str,
    units: &'static str,
    tier: &'static str,
    creation: &'static str,
    vintage: &'static str,
}

const LEGACY_DATASETS: [(&str, LegacyMetadata); 3] = [
    (
        "Tree Mortality - Past 1 Year",
        LegacyMetadata {
            definition: MORTALITY_DEFINITION,
            units: "Percent of 30m pixel (absolute, not relative, value)",
            tier: "2",
            creation: MORTALITY_CREATION,
            vintage: "2021",
        },
    ),
    (
        "Tree Mortality - Past 5 Years",
        LegacyMetadata {
            definition: MORTALITY_DEFINITION,
            units: "Percent of 30m pixel (absolute, not relative, value) ",
            tier: "2",
            creation: MORTALITY_CREATION,
            vintage: "2021",
        },
    ),
    (
        "Time Since Last Disturbance",
        LegacyMetadata {
            definition: DISTURBANCE_DEFINITION,
            units: "Years",
            tier: "2",
            creation: DISTURBANCE_CREATION,
            vintage: "2021",
        },
    ),
];

/// Replacement metadata block for a known legacy dataset.
pub fn legacy_metadata(dataset_name: &str) -> Option<Vec<MetadataEntry>> {
    LEGACY_DATASETS
        .iter()
        .find(|(name, _)| *name == dataset_name)
        .map(|(_, block)| {
            vec![
                MetadataEntry::text(NOTES_FIELD, block.definition),
                MetadataEntry::text("data_units", block.units),
                MetadataEntry::text("tier", block.tier),
                MetadataEntry::text("creation_method", block.creation),
                MetadataEntry::text("data_vintage", block.vintage),
            ]
        })
}

pub fn is_legacy(dataset_name: &str) -> bool {
    LEGACY_DATASETS.iter().any(|(name, _)| *name == dataset_name)
}

/// Replaces the metadata of a legacy dataset that lacks a description.
/// Returns whether anything changed.
pub fn apply(dataset: &mut DatasetRecord) -> bool {
    if dataset.has_metadata(NOTES_FIELD) {
        return false;
    }
    match legacy_metadata(&dataset.name) {
        Some(block) => {
            info!(dataset = %dataset.name, "substituting legacy metadata");
            dataset.dataset_metadata = block;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, metadata: Vec<MetadataEntry>) -> DatasetRecord {
        DatasetRecord {
            dataset_id: 1,
            name: name.to_string(),
            file_path: String::new(),
            file_type: String::new(),
            dataset_metadata: metadata,
            gis_services: Vec::new(),
        }
    }

    #[test]
    fn legacy_dataset_gets_description() {
        let mut dataset = record("Time Since Last Disturbance", Vec::new());
        assert!(apply(&mut dataset));
        assert!(dataset.has_metadata(NOTES_FIELD));
        assert_eq!(dataset.dataset_metadata.len(), 5);
        let definition = dataset
            .dataset_metadata
            .iter()
            .find(|entry| entry.name == NOTES_FIELD)
            .unwrap();
        assert!(
            definition
                .text_or_empty()
                .contains("were not considered. \n\nThe most recent")
        );
    }

    #[test]
    fn described_dataset_is_untouched() {
        let mut dataset = record(
            "Tree Mortality - Past 1 Year",
            vec![MetadataEntry::text(NOTES_FIELD, "already here")],
        );
        assert!(!apply(&mut dataset));
        assert_eq!(dataset.dataset_metadata[0].text_or_empty(), "already here");
    }

    #[test]
    fn unknown_dataset_is_not_repaired() {
        let mut dataset = record("Burn Probability", Vec::new());
        assert!(!apply(&mut dataset));
        assert!(!is_legacy("Burn Probability"));
    }
}
