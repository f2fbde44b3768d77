//! The Interagency Tracking System package. Unlike CLM it is not derived from
//! RRK: it is a single hand-maintained document.

use crate::domain::{DatasetFamily, Extent};
use crate::package::{Extra, PackageDocument, Resource, Tag, spatial_polygon};
use crate::text::slugify;

pub const ITS_TITLE: &str = "California Wildfire & Landscape Resilience Interagency Treatments";
pub const ITS_CRS: &str = "urn:ogc:def:crs:EPSG::3857";

const ITS_NOTES: &str = r#"
WildfireTaskForce.org

As California works toward ambitious wildfire and landscape resilience goals, transparency and effective planning tools are critical to success. The California Wildfire and Landscape Interagency Treatment Tracking System, for the first time ever in California, provides a single source for displaying recently completed forest and wildland projects from over a dozen different federal and state agencies.

What is the Wildfire & Landscape Resilience Interagency Treatment Tracking System and Dashboard?

The Interagency Treatment Tracking System is a first-of-its-kind database that catalogs the location and extent of federal and state wildfire and landscape resilience treatments throughout the state. The Wildfire & Landscape Resilience Interagency Treatment Dashboard (hereafter Dashboard) provides a highly interactive online tool by which users can explore these data, sorting treatments by region, county, land ownership, and more. By charting the work of what has been accomplished to date, this information can be used to guide practitioners on where to plan new projects.

What is included in the geodatabase download?

The geodatabase provided here provides treatment point, line, and polygon data from state and federal land management databases covering the State of California. Please see the documentation available at https://wildfiretaskforce.org/treatment-dashboard/ for information on the original data sources and processing procedures. The information in the geodatabase contains the data processed into the Interagency Treatment Tracking System schema. A subset of these data are included on the Dashboard, but the geodatabase includes activity types (such as some forms of timber harvest or ecological restoration) and years of data that are not included on the Dashboard. The additional data should not be considered complete and comprehensive because there are known gaps in the source data.
    "#;

const GDB_URL: &str = "https://portal.sparcal.sdsc.edu/arcgis/sharing/rest/content/items/382c2b34f6b9405594f7066118e240d5/data";
const FEATURE_SERVICE_ROOT: &str = "https://sparcal.sdsc.edu/arcgis/rest/services/Hosted";
const FEATURE_SERVICE_FORMAT: &str = "ArcGIS Feature Service";

const TAGS: [&str; 11] = [
    "ITS",
    "Million Acres",
    "Vegetation Management",
    "Interagency Tracking System",
    "Fuels Reduction",
    "Forest Resilience",
    "Forest",
    "Forest Health",
    "Fire",
    "California Wildfire and Forest Resilience Task Force",
    "California",
];

/// Statewide footprint in EPSG:3857 metres, in `(lat, lon)` corner order.
const FOOTPRINT: ((f64, f64), (f64, f64)) = (
    (-1383489.9179190733, 3836082.3922780156),
    (-12735118.01130016, 5161279.835675545),
);

pub fn its_package_name() -> String {
    slugify(&format!("{}{ITS_TITLE}", DatasetFamily::Its.prefix()))
}

pub fn its_package(org: &str) -> PackageDocument {
    let footprint = Extent::from_corners(FOOTPRINT.0, FOOTPRINT.1);

    let feature_service = |geometry: &str, label: &str| {
        let name = format!("ITS_V1_1_{geometry}_gdb");
        Resource::link(
            &name,
            &format!("{label} geometries from ITS_Geodatabase_V1.1"),
            FEATURE_SERVICE_FORMAT,
            &format!("{FEATURE_SERVICE_ROOT}/{name}/FeatureServer/0"),
        )
    };

    PackageDocument {
        name: its_package_name(),
        title: ITS_TITLE.to_string(),
        owner_org: org.to_string(),
        kind: "dataset".to_string(),
        private: Some(false),
        notes: Some(ITS_NOTES.to_string()),
        extras: vec![
            Extra::new("spatial", spatial_polygon(&footprint, Some(ITS_CRS))),
            Extra::new("EPSG", "3857"),
        ],
        resources: vec![
            Resource::link(
                "Interagency_Tracking_System_V1.1_output_data_only.gdb.zip",
                "Zipped Geodatabase containing Interagency Tracking System V1.1 output data",
                "GDB",
                GDB_URL,
            ),
            feature_service("points", "Point"),
            feature_service("lines", "Line"),
            feature_service("polygons", "Polygon"),
        ],
        tags: TAGS
            .iter()
            .map(|tag| Tag {
                name: tag.to_string(),
            })
            .collect(),
    }
}
