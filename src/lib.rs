mod distance;
mod error;
mod resolve;
mod tables;
mod types;

pub use error::StationMatchError;

pub use distance::{distance, EARTH_RADIUS_M};

pub use types::assignment::Assignment;
pub use types::latlon::LatLon;
pub use types::site::Site;
pub use types::station::{candidate_stations, AnalysisPeriod, DateRange, Station};

pub use resolve::resolver::{Resolution, Resolver, SiteFailure, DEFAULT_WORKERS};

pub use tables::load::{load_sites, load_stations, load_stations_json};
pub use tables::write::write_assignments;

pub use resolve::error::{ResolveError, SiteError};
pub use tables::error::TableError;
