//! Spherical Web-Mercator projection (EPSG:3857).

use std::f64::consts::{FRAC_PI_4, PI};

/// Semi-major axis of the WGS84 ellipsoid in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude beyond which the projection is clamped, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Half the width of the projected world in meters.
pub const HALF_EXTENT_M: f64 = EARTH_RADIUS_M * PI;

/// Project WGS84 longitude and latitude in degrees to whole meters.
///
/// Latitude is clamped to [`MAX_LATITUDE`]. Returns `None` for non-finite
/// input.
#[allow(clippy::cast_possible_truncation)]
pub fn to_web_mercator(longitude: f64, latitude: f64) -> Option<(i32, i32)> {
    if !longitude.is_finite() || !latitude.is_finite() {
        return None;
    }
    let lon = longitude.clamp(-180.0, 180.0).to_radians();
    let lat = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = (EARTH_RADIUS_M * lon).clamp(-HALF_EXTENT_M, HALF_EXTENT_M);
    let y = (EARTH_RADIUS_M * lat.mul_add(0.5, FRAC_PI_4).tan().ln())
        .clamp(-HALF_EXTENT_M, HALF_EXTENT_M);
    Some((x.round() as i32, y.round() as i32))
}
