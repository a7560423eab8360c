//! Great-circle distance between two coordinates via the Haversine formula.
//!
//! This is the distance the resolver ranks candidate stations by, so the
//! Earth radius constant is part of the output contract: changing it changes
//! every distance in every assignment table.

use crate::types::latlon::LatLon;

/// Mean Earth radius in meters used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_372_800.0;

/// Computes the great-circle surface distance between `a` and `b` in meters.
///
/// Uses the Haversine formula with [`EARTH_RADIUS_M`]. The formula degrades
/// gracefully to `0.0` for identical coordinates and stays finite for
/// antipodal points. Non-finite inputs propagate (NaN in, NaN out); they are
/// not treated as an error here.
///
/// # Examples
///
/// ```
/// use stationmatch::{distance, LatLon};
///
/// let schiphol = LatLon(52.3105, 4.7683);
/// let de_bilt = LatLon(52.0989, 5.1797);
///
/// let d = distance(schiphol, de_bilt);
/// assert!(d > 30_000.0 && d < 45_000.0);
/// assert_eq!(distance(schiphol, schiphol), 0.0);
/// ```
pub fn distance(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.0.to_radians();
    let phi2 = b.0.to_radians();
    let dphi = (b.0 - a.0).to_radians();
    let dlambda = (b.1 - a.1).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
