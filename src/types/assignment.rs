use crate::types::site::Site;
use crate::types::station::Station;

/// The resolver's output record: one site matched to its nearest candidate
/// station.
///
/// Invariant: among the candidate stations the resolver was given, none is
/// strictly closer to `site` than `station`; ties go to the candidate
/// encountered first in the caller-supplied order.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// The site that was matched.
    pub site: Site,
    /// The nearest candidate station.
    pub station: Station,
    /// Great-circle distance between the two, in meters. Never negative.
    pub distance_m: f64,
}
