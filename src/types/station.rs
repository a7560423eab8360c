//! Defines the data structures representing candidate weather stations and
//! their validity windows, plus the caller-side filtering that produces the
//! candidate station list handed to the resolver.

use crate::types::latlon::LatLon;
use chrono::NaiveDate;
use log::debug;

/// A candidate weather station.
///
/// Stations come from an external metadata table. The `inventory` window is
/// the date range over which the station's readings are considered usable;
/// both bounds are optional because upstream metadata frequently omits them.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// The unique station identifier (e.g. "GHCND:USC00047916").
    pub id: String,
    /// Human-readable station name.
    pub name: String,
    /// Geographical location of the station.
    pub location: LatLon,
    /// The reported first and last dates with usable data.
    pub inventory: DateRange,
}

/// Represents a date range with optional start and end dates.
///
/// Used as a station's validity window. An absent bound means the metadata
/// did not report one, not that the range is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DateRange {
    /// The earliest date for which data is reported available, if known.
    pub start: Option<NaiveDate>,
    /// The latest date for which data is reported available, if known.
    pub end: Option<NaiveDate>,
}

/// Specifies the analysis period a station's validity window must cover for
/// the station to qualify as a match candidate.
///
/// Used with [`candidate_stations`] to drop stations whose reporting window
/// does not overlap the observations being matched (e.g. stations that
/// stopped reporting before the analysis cutoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisPeriod {
    /// No window requirement; every station qualifies.
    Any,
    /// The window must contain this date.
    Date(NaiveDate),
    /// The window must fully contain this range (inclusive on both ends).
    Range {
        /// The required start date (inclusive).
        start: NaiveDate,
        /// The required end date (inclusive).
        end: NaiveDate,
    },
    /// The window must cover the entire calendar year, January 1st through
    /// December 31st.
    Year(i32),
}

impl Station {
    /// Creates a station with no validity window.
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: LatLon(latitude, longitude),
            inventory: DateRange::default(),
        }
    }

    /// Returns `true` when this station's validity window covers `period`.
    ///
    /// [`AnalysisPeriod::Any`] always passes. Every dated check requires both
    /// window bounds to be present: a station that never reported a window
    /// cannot demonstrate coverage, so it fails.
    pub fn covers(&self, period: &AnalysisPeriod) -> bool {
        if matches!(period, AnalysisPeriod::Any) {
            return true;
        }
        let (Some(start), Some(end)) = (self.inventory.start, self.inventory.end) else {
            return false;
        };
        match period {
            AnalysisPeriod::Any => true,
            AnalysisPeriod::Date(date) => start <= *date && *date <= end,
            AnalysisPeriod::Range {
                start: req_start,
                end: req_end,
            } => start <= *req_start && end >= *req_end,
            AnalysisPeriod::Year(year) => {
                let (Some(jan1), Some(dec31)) = (
                    NaiveDate::from_ymd_opt(*year, 1, 1),
                    NaiveDate::from_ymd_opt(*year, 12, 31),
                ) else {
                    return false;
                };
                start <= jan1 && end >= dec31
            }
        }
    }
}

/// Filters `stations` down to the candidate station list for `period`.
///
/// The relative order of the retained stations is preserved; the resolver's
/// tie-break depends on it.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use stationmatch::{candidate_stations, AnalysisPeriod, DateRange, Station};
///
/// let mut open_ended = Station::new("S1", "Alpha", 37.0, -122.0);
/// let mut closed_2005 = Station::new("S2", "Bravo", 38.0, -121.0);
/// closed_2005.inventory = DateRange {
///     start: NaiveDate::from_ymd_opt(1950, 1, 1),
///     end: NaiveDate::from_ymd_opt(2005, 6, 30),
/// };
/// open_ended.inventory = DateRange {
///     start: NaiveDate::from_ymd_opt(1950, 1, 1),
///     end: NaiveDate::from_ymd_opt(2019, 12, 31),
/// };
///
/// let candidates = candidate_stations(
///     vec![open_ended, closed_2005],
///     &AnalysisPeriod::Year(2018),
/// );
/// assert_eq!(candidates.len(), 1);
/// assert_eq!(candidates[0].id, "S1");
/// ```
pub fn candidate_stations(stations: Vec<Station>, period: &AnalysisPeriod) -> Vec<Station> {
    let total = stations.len();
    let candidates: Vec<Station> = stations
        .into_iter()
        .filter(|station| station.covers(period))
        .collect();
    debug!(
        "{} of {} stations cover the analysis period {:?}",
        candidates.len(),
        total,
        period
    );
    candidates
}
