//! OGC service access: WMS capabilities and WCS coverage descriptions.
//!
//! GeoServer answers with either namespaced (`wms:Layer`, `gml:Envelope`) or
//! bare element names depending on version and workspace, so every match here
//! is on the local name only.

use std::sync::LazyLock;
use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use tracing::debug;

use crate::error::SyncError;

pub const WMS_VERSION: &str = "1.3.0";
pub const WCS_VERSION: &str = "2.0.1";
pub const WFS_VERSION: &str = "1.1.0";

static EPSG_IN_SRS_NAME: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"EPSG/0/(\d+)"));

pub trait OgcClient: Send + Sync {
    fn get_capabilities(&self, wms_url: &str) -> Result<String, SyncError>;
    /// `Ok(None)` when the server answers with a non-success status.
    fn describe_coverage(&self, wcs_url: &str, coverage_id: &str)
    -> Result<Option<String>, SyncError>;
}

impl<T: OgcClient + ?Sized> OgcClient for &T {
    fn get_capabilities(&self, wms_url: &str) -> Result<String, SyncError> {
        (**self).get_capabilities(wms_url)
    }

    fn describe_coverage(
        &self,
        wcs_url: &str,
        coverage_id: &str,
    ) -> Result<Option<String>, SyncError> {
        (**self).describe_coverage(wcs_url, coverage_id)
    }
}

#[derive(Clone)]
pub struct OgcHttpClient {
    client: Client,
}

impl OgcHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rrk-ckan/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::OgcHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| SyncError::OgcHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl OgcClient for OgcHttpClient {
    fn get_capabilities(&self, wms_url: &str) -> Result<String, SyncError> {
        let response = self
            .client
            .get(wms_url)
            .query(&[
                ("service", "WMS"),
                ("version", WMS_VERSION),
                ("request", "GetCapabilities"),
            ])
            .send()
            .map_err(|err| SyncError::OgcHttp(err.to_string()))?;
        response
            .text()
            .map_err(|err| SyncError::OgcHttp(err.to_string()))
    }

    fn describe_coverage(
        &self,
        wcs_url: &str,
        coverage_id: &str,
    ) -> Result<Option<String>, SyncError> {
        let response = self
            .client
            .get(wcs_url)
            .query(&[
                ("service", "WCS"),
                ("version", WCS_VERSION),
                ("request", "DescribeCoverage"),
                ("coverageId", coverage_id),
            ])
            .send()
            .map_err(|err| SyncError::OgcHttp(err.to_string()))?;
        if !response.status().is_success() {
            debug!(
                coverage_id,
                status = response.status().as_u16(),
                "coverage not described"
            );
            return Ok(None);
        }
        response
            .text()
            .map(Some)
            .map_err(|err| SyncError::OgcHttp(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WmsLayer {
    pub name: String,
    pub title: Option<String>,
    pub bbox: Option<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageEnvelope {
    pub lower: [f64; 2],
    pub upper: [f64; 2],
    /// Numeric EPSG code taken from the envelope's `srsName`.
    pub epsg: Option<String>,
}

struct LayerFrame {
    depth: usize,
    slot: usize,
    name: Option<String>,
    title: Option<String>,
    bbox: Option<BoundingBox>,
}

enum TextTarget {
    Name,
    Title,
}

/// Every named `Layer` in a GetCapabilities document, in document order.
///
/// Only direct children of a layer describe it: a nested layer's `Name` never
/// leaks into its parent, and the first direct `BoundingBox` wins.
pub fn parse_wms_layers(xml: &str) -> Result<Vec<WmsLayer>, SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut slots: Vec<Option<WmsLayer>> = Vec::new();
    let mut frames: Vec<LayerFrame> = Vec::new();
    let mut depth = 0usize;
    let mut text_target: Option<TextTarget> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                depth += 1;
                let local = start.local_name();
                let is_direct_child = frames.last().is_some_and(|frame| frame.depth + 1 == depth);
                match local.as_ref() {
                    b"Layer" => {
                        slots.push(None);
                        frames.push(LayerFrame {
                            depth,
                            slot: slots.len() - 1,
                            name: None,
                            title: None,
                            bbox: None,
                        });
                    }
                    b"Name" if is_direct_child => text_target = Some(TextTarget::Name),
                    b"Title" if is_direct_child => text_target = Some(TextTarget::Title),
                    b"BoundingBox" if is_direct_child => record_bbox(&mut frames, &start)?,
                    _ => {}
                }
            }
            Ok(Event::Empty(start)) => {
                let is_direct_child = frames.last().is_some_and(|frame| frame.depth == depth);
                if start.local_name().as_ref() == b"BoundingBox" && is_direct_child {
                    record_bbox(&mut frames, &start)?;
                }
            }
            Ok(Event::Text(text)) => {
                if let (Some(target), Some(frame)) = (text_target.as_ref(), frames.last_mut()) {
                    let value = text
                        .unescape()
                        .map_err(|err| SyncError::OgcParse(err.to_string()))?
                        .into_owned();
                    match target {
                        TextTarget::Name => frame.name = Some(value),
                        TextTarget::Title => frame.title = Some(value),
                    }
                }
            }
            Ok(Event::End(end)) => {
                text_target = None;
                if end.local_name().as_ref() == b"Layer" {
                    if let Some(frame) = frames.pop() {
                        if let Some(name) = frame.name.filter(|name| !name.is_empty()) {
                            slots[frame.slot] = Some(WmsLayer {
                                name,
                                title: frame.title,
                                bbox: frame.bbox,
                            });
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(SyncError::OgcParse(format!(
                    "capabilities at byte {}: {err}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

fn record_bbox(frames: &mut [LayerFrame], start: &BytesStart) -> Result<(), SyncError> {
    let Some(frame) = frames.last_mut() else {
        return Ok(());
    };
    if frame.bbox.is_some() {
        return Ok(());
    }
    let coordinate = |key: &[u8]| -> Result<Option<f64>, SyncError> {
        let Some(attr) = start
            .try_get_attribute(key)
            .map_err(|err| SyncError::OgcParse(err.to_string()))?
        else {
            return Ok(None);
        };
        let value = attr
            .unescape_value()
            .map_err(|err| SyncError::OgcParse(err.to_string()))?;
        Ok(value.trim().parse::<f64>().ok())
    };
    if let (Some(minx), Some(miny), Some(maxx), Some(maxy)) = (
        coordinate(b"minx")?,
        coordinate(b"miny")?,
        coordinate(b"maxx")?,
        coordinate(b"maxy")?,
    ) {
        frame.bbox = Some(BoundingBox {
            minx,
            miny,
            maxx,
            maxy,
        });
    }
    Ok(())
}

/// Reads the first `Envelope` of a DescribeCoverage response.
///
/// `Ok(None)` when the document has no envelope.
pub fn parse_coverage_envelope(xml: &str) -> Result<Option<CoverageEnvelope>, SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_envelope = false;
    let mut srs_name: Option<String> = None;
    let mut corner: Option<&'static str> = None;
    let mut lower: Option<String> = None;
    let mut upper: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => match start.local_name().as_ref() {
                b"Envelope" if !in_envelope && lower.is_none() => {
                    in_envelope = true;
                    srs_name = start
                        .try_get_attribute("srsName")
                        .map_err(|err| SyncError::OgcParse(err.to_string()))?
                        .map(|attr| {
                            attr.unescape_value()
                                .map(|value| value.into_owned())
                                .map_err(|err| SyncError::OgcParse(err.to_string()))
                        })
                        .transpose()?;
                }
                b"lowerCorner" if in_envelope => corner = Some("lower"),
                b"upperCorner" if in_envelope => corner = Some("upper"),
                _ => {}
            },
            Ok(Event::Text(text)) => {
                if let Some(which) = corner {
                    let value = text
                        .unescape()
                        .map_err(|err| SyncError::OgcParse(err.to_string()))?
                        .into_owned();
                    if which == "lower" {
                        lower = Some(value);
                    } else {
                        upper = Some(value);
                    }
                }
            }
            Ok(Event::End(end)) => {
                corner = None;
                if end.local_name().as_ref() == b"Envelope" && in_envelope {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(SyncError::OgcParse(format!(
                    "coverage description at byte {}: {err}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    if !in_envelope {
        return Ok(None);
    }
    let lower = lower.ok_or_else(|| SyncError::OgcParse("envelope without lowerCorner".into()))?;
    let upper = upper.ok_or_else(|| SyncError::OgcParse("envelope without upperCorner".into()))?;

    Ok(Some(CoverageEnvelope {
        lower: parse_corner(&lower)?,
        upper: parse_corner(&upper)?,
        epsg: srs_name.as_deref().and_then(epsg_code),
    }))
}

fn parse_corner(text: &str) -> Result<[f64; 2], SyncError> {
    let values = text
        .split_whitespace()
        .map(|part| part.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| SyncError::OgcParse(format!("corner {text:?}: {err}")))?;
    match values.as_slice() {
        [x, y, ..] => Ok([*x, *y]),
        _ => Err(SyncError::OgcParse(format!(
            "corner {text:?} has fewer than two coordinates"
        ))),
    }
}

/// Digits following `EPSG/0/` in an OGC CRS URI.
pub fn epsg_code(srs_name: &str) -> Option<String> {
    let regex = EPSG_IN_SRS_NAME.as_ref().ok()?;
    regex
        .captures(srs_name)
        .and_then(|caps| caps.get(1))
        .map(|code| code.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_from_uri() {
        assert_eq!(
            epsg_code("http://www.opengis.net/def/crs/EPSG/0/3310").as_deref(),
            Some("3310")
        );
        assert_eq!(epsg_code("urn:ogc:def:crs:EPSG::3310"), None);
    }

    #[test]
    fn corner_requires_two_numbers() {
        assert_eq!(parse_corner("1.5 -2").unwrap(), [1.5, -2.0]);
        assert!(parse_corner("1.5").is_err());
        assert!(parse_corner("a b").is_err());
    }

    #[test]
    fn nested_layer_names_stay_with_their_layer() {
        let xml = r#"<WMS_Capabilities><Capability>
            <Layer><Title>root</Title>
              <Layer><Name>rrk:a</Name>
                <BoundingBox CRS="CRS:84" minx="-124" miny="32" maxx="-114" maxy="42"/>
                <BoundingBox CRS="EPSG:3310" minx="0" miny="0" maxx="1" maxy="1"/>
              </Layer>
            </Layer></Capability></WMS_Capabilities>"#;
        let layers = parse_wms_layers(xml).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "rrk:a");
        assert_eq!(layers[0].bbox.unwrap().minx, -124.0);
    }
}
