//! Great-circle distance on a spherical earth.

use crate::domain::{Coordinate, CoordinateError};

/// Mean earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two coordinates, in meters.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lng = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// The point reached by travelling `meters` from `origin` along `bearing_degrees`
/// (clockwise from north). Fails if a non-finite input yields an invalid coordinate.
pub fn destination(
    origin: Coordinate,
    bearing_degrees: f64,
    meters: f64,
) -> Result<Coordinate, CoordinateError> {
    let angular = meters / EARTH_RADIUS_METERS;
    let bearing = bearing_degrees.to_radians();
    let lat1 = origin.latitude().to_radians();
    let lng1 = origin.longitude().to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    let longitude = (lng2.to_degrees() + 540.0) % 360.0 - 180.0;
    Coordinate::new(lat2.to_degrees().clamp(-90.0, 90.0), longitude)
}
