use crate::types::latlon::LatLon;

/// An observation location to be matched against the candidate station list.
///
/// Sites are loaded from an external table, never mutated, and consumed once
/// per resolver run. A site whose source row had no usable coordinates
/// carries `location: None` and is reported (not silently dropped) by the
/// resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Unique name identifying the site in its source table.
    pub name: String,
    /// Geographical position, if the source row had one.
    pub location: Option<LatLon>,
}

impl Site {
    /// Creates a site with a known position.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            location: Some(LatLon(latitude, longitude)),
        }
    }
}
