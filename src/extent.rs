use std::sync::OnceLock;

use serde::Serialize;
use tracing::{debug, warn};

use crate::crs::{self, CALIFORNIA_ALBERS, WGS84};
use crate::domain::Extent;
use crate::ogc::{self, CoverageEnvelope, OgcClient, WmsLayer};

/// Outcome of extent resolution for one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedExtent {
    pub extent: Option<Extent>,
    /// Present when the WCS described the layer as a coverage.
    pub coverage: Option<CoverageEnvelope>,
}

impl ResolvedExtent {
    pub fn has_coverage(&self) -> bool {
        self.coverage.is_some()
    }
}

/// Resolves layer extents against one WMS and one WCS endpoint.
///
/// The WMS capabilities document is fetched at most once per resolver. A
/// failed fetch is remembered as an empty layer list.
pub struct ExtentResolver<O> {
    client: O,
    wms_url: String,
    wcs_url: String,
    layers: OnceLock<Vec<WmsLayer>>,
}

impl<O: OgcClient> ExtentResolver<O> {
    pub fn new(client: O, wms_url: impl Into<String>, wcs_url: impl Into<String>) -> Self {
        Self {
            client,
            wms_url: wms_url.into(),
            wcs_url: wcs_url.into(),
            layers: OnceLock::new(),
        }
    }

    fn layers(&self) -> &[WmsLayer] {
        self.layers.get_or_init(|| {
            let fetched = self
                .client
                .get_capabilities(&self.wms_url)
                .and_then(|xml| ogc::parse_wms_layers(&xml));
            match fetched {
                Ok(layers) => {
                    debug!(count = layers.len(), "loaded WMS layers");
                    layers
                }
                Err(err) => {
                    warn!(url = %self.wms_url, error = %err, "WMS capabilities unavailable");
                    Vec::new()
                }
            }
        })
    }

    /// Bounding box of the first WMS layer whose name is a suffix of `layer`.
    ///
    /// The WMS box is taken as geographic: `minx`/`maxx` are longitudes.
    pub fn wms_extent(&self, layer: &str) -> Option<Extent> {
        self.layers()
            .iter()
            .filter(|entry| layer.ends_with(entry.name.as_str()))
            .find_map(|entry| entry.bbox)
            .map(|bbox| Extent::from_corners((bbox.miny, bbox.minx), (bbox.maxy, bbox.maxx)))
    }

    /// Native envelope of a WCS coverage, if the server describes it.
    pub fn wcs_extent(&self, coverage_id: &str) -> Option<CoverageEnvelope> {
        let described = self
            .client
            .describe_coverage(&self.wcs_url, coverage_id)
            .and_then(|xml| match xml {
                Some(xml) => ogc::parse_coverage_envelope(&xml),
                None => Ok(None),
            });
        match described {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(coverage_id, error = %err, "WCS coverage unavailable");
                None
            }
        }
    }

    /// WMS extent first; otherwise the WCS envelope reprojected to WGS84.
    /// The WCS is consulted either way.
    pub fn resolve(&self, layer: &str) -> ResolvedExtent {
        let wms = self.wms_extent(layer);
        let coverage = self.wcs_extent(layer);
        let extent = wms.or_else(|| coverage.as_ref().and_then(reproject_envelope));
        ResolvedExtent { extent, coverage }
    }
}

/// Geographic extent of a native envelope; EPSG:3310 when `srsName` is silent.
pub fn reproject_envelope(envelope: &CoverageEnvelope) -> Option<Extent> {
    let epsg = match envelope.epsg.as_deref() {
        Some(code) => match code.parse::<u32>() {
            Ok(code) => code,
            Err(_) => {
                warn!(code, "unreadable EPSG code");
                return None;
            }
        },
        None => CALIFORNIA_ALBERS,
    };
    match crs::reproject(envelope.lower, envelope.upper, epsg, WGS84) {
        Ok(extent) => Some(extent),
        Err(err) => {
            warn!(epsg, error = %err, "coverage envelope not reprojected");
            None
        }
    }
}
