use proj4rs::Proj;
use proj4rs::transform::transform;

use crate::domain::Extent;
use crate::error::SyncError;

/// CRS of the RRK coverages when the envelope does not name one.
pub const CALIFORNIA_ALBERS: u32 = 3310;
pub const WGS84: u32 = 4326;

fn proj_definition(epsg: u32) -> Option<&'static str> {
    match epsg {
        3310 => Some(
            "+proj=aea +lat_0=0 +lon_0=-120 +lat_1=34 +lat_2=40.5 +x_0=0 +y_0=-4000000 \
             +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs",
        ),
        3857 => Some(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 \
             +units=m +no_defs",
        ),
        4269 => Some("+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs"),
        4326 => Some("+proj=longlat +datum=WGS84 +no_defs"),
        _ => None,
    }
}

pub fn projection(epsg: u32) -> Result<Proj, SyncError> {
    let definition =
        proj_definition(epsg).ok_or_else(|| SyncError::UnsupportedCrs(epsg.to_string()))?;
    Proj::from_proj_string(definition).map_err(|err| SyncError::Reprojection(err.to_string()))
}

/// Transforms one `(x, y)` point; geographic coordinates are in degrees on
/// both sides, longitude first.
pub fn transform_point(from: u32, to: u32, point: (f64, f64)) -> Result<(f64, f64), SyncError> {
    let src = projection(from)?;
    let dst = projection(to)?;
    let mut xy = if src.is_latlong() {
        (point.0.to_radians(), point.1.to_radians(), 0.0)
    } else {
        (point.0, point.1, 0.0)
    };
    transform(&src, &dst, &mut xy).map_err(|err| SyncError::Reprojection(err.to_string()))?;
    if dst.is_latlong() {
        Ok((xy.0.to_degrees(), xy.1.to_degrees()))
    } else {
        Ok((xy.0, xy.1))
    }
}

/// Reprojects a native-CRS envelope to a geographic [`Extent`].
///
/// Corners are read in `(x, y)` axis order, so the target must be geographic.
pub fn reproject(
    lower: [f64; 2],
    upper: [f64; 2],
    from_epsg: u32,
    to_epsg: u32,
) -> Result<Extent, SyncError> {
    let (lon_min, lat_min) = transform_point(from_epsg, to_epsg, (lower[0], lower[1]))?;
    let (lon_max, lat_max) = transform_point(from_epsg, to_epsg, (upper[0], upper[1]))?;
    Ok(Extent::from_corners((lat_min, lon_min), (lat_max, lon_max)))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn albers_origin_maps_to_projection_center() {
        let (lon, lat) = transform_point(CALIFORNIA_ALBERS, WGS84, (0.0, -4_000_000.0)).unwrap();
        assert!((lon + 120.0).abs() < 1e-6, "lon = {lon}");
        assert!(lat.abs() < 1e-6, "lat = {lat}");
    }

    #[test]
    fn unknown_epsg_is_rejected() {
        let err = projection(2000).unwrap_err();
        assert_matches!(err, SyncError::UnsupportedCrs(code) if code == "2000");
    }
}
