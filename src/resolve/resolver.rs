//! The nearest-station resolver: fans one unit of work per site across a
//! bounded worker pool and collects assignments in completion order.

use crate::distance::distance;
use crate::resolve::error::{ResolveError, SiteError};
use crate::types::assignment::Assignment;
use crate::types::site::Site;
use crate::types::station::Station;
use bon::bon;
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Worker pool size used when none is configured.
pub const DEFAULT_WORKERS: usize = 6;

/// Matches each site to its nearest candidate station.
///
/// Each site is an independently schedulable unit of work: a full scan of
/// the candidate list using the great-circle [`distance`] engine, keeping a
/// running minimum. Units run concurrently on a bounded pool; the candidate
/// list is shared read-only across all of them.
///
/// # Examples
///
/// ```
/// use stationmatch::{Resolver, Site, Station};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), stationmatch::ResolveError> {
/// let sites = vec![Site::new("A", 37.0, -122.0)];
/// let stations = vec![
///     Station::new("S1", "Near", 37.0, -122.1),
///     Station::new("S2", "Far", 40.0, -122.0),
/// ];
///
/// let resolution = Resolver::builder().build().resolve(sites, stations).await?;
/// assert_eq!(resolution.assignments.len(), 1);
/// assert_eq!(resolution.assignments[0].station.id, "S1");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    workers: usize,
}

/// A site the resolver skipped, with the reason it was skipped.
#[derive(Debug)]
pub struct SiteFailure {
    /// Name of the skipped site.
    pub site: String,
    /// Why resolution failed for it.
    pub error: SiteError,
}

/// The outcome of one resolver run.
///
/// Assignments arrive in worker completion order, which varies between
/// runs; call [`Resolution::sort_by_site`] when deterministic ordering is
/// needed. Sites that failed individually are listed in `failures` and
/// carry no assignment.
#[derive(Debug, Default)]
pub struct Resolution {
    /// One assignment per successfully resolved site.
    pub assignments: Vec<Assignment>,
    /// Sites that were skipped, with their errors.
    pub failures: Vec<SiteFailure>,
    complete: bool,
}

impl Resolution {
    /// `false` when at least one unit of work was abandoned before it
    /// finished (runtime shutdown mid-run). A partial result is usable but
    /// must not be presented as a complete one.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Sorts assignments and failures by site name for reproducible output.
    pub fn sort_by_site(&mut self) {
        self.assignments
            .sort_by(|a, b| a.site.name.cmp(&b.site.name));
        self.failures.sort_by(|a, b| a.site.cmp(&b.site));
    }
}

#[bon]
impl Resolver {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `.workers(usize)`: Optional. Bounded worker pool size. Defaults to
    ///   [`DEFAULT_WORKERS`]; values below 1 are raised to 1.
    #[builder]
    pub fn new(workers: Option<usize>) -> Self {
        Self {
            workers: workers.unwrap_or(DEFAULT_WORKERS).max(1),
        }
    }

    /// Resolves every site against the candidate station list.
    ///
    /// Produces one [`Assignment`] per site, except for sites that fail
    /// individually (missing or non-finite coordinates, a panicking unit of
    /// work); those are recorded in the returned [`Resolution`] and do not
    /// abort sibling units.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoCandidateStations`] when `stations` is
    /// empty: there is nothing a partial result could mean, so this is fatal
    /// for the whole invocation.
    pub async fn resolve(
        &self,
        sites: Vec<Site>,
        stations: Vec<Station>,
    ) -> Result<Resolution, ResolveError> {
        if stations.is_empty() {
            return Err(ResolveError::NoCandidateStations);
        }

        let total = sites.len();
        let stations = Arc::new(stations);
        let pool = Arc::new(Semaphore::new(self.workers));
        let mut pending = FuturesUnordered::new();

        for site in sites {
            // Submission blocks here until a pool slot frees up; the units
            // themselves never block.
            let permit = Arc::clone(&pool)
                .acquire_owned()
                .await
                .map_err(|_| ResolveError::PoolClosed)?;
            let stations = Arc::clone(&stations);
            let name = site.name.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                resolve_site(site, &stations)
            });
            pending.push(async move { (name, handle.await) });
        }

        let mut resolution = Resolution {
            complete: true,
            ..Resolution::default()
        };
        while let Some((site, joined)) = pending.next().await {
            match flatten(joined) {
                Ok(assignment) => resolution.assignments.push(assignment),
                Err(Some(error)) => {
                    warn!("skipping site '{site}': {error}");
                    resolution.failures.push(SiteFailure { site, error });
                }
                Err(None) => {
                    // Unit was cancelled before it ran to completion.
                    resolution.complete = false;
                }
            }
        }

        info!(
            "matched {} of {} sites to their nearest station ({} skipped)",
            resolution.assignments.len(),
            total,
            resolution.failures.len()
        );
        Ok(resolution)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Maps a joined unit-of-work result into the resolver's bookkeeping:
/// `Err(None)` marks a cancelled unit, `Err(Some(_))` a per-site failure.
fn flatten(
    joined: Result<Result<Assignment, SiteError>, JoinError>,
) -> Result<Assignment, Option<SiteError>> {
    match joined {
        Ok(Ok(assignment)) => Ok(assignment),
        Ok(Err(error)) => Err(Some(error)),
        Err(join_error) => {
            if join_error.is_cancelled() {
                return Err(None);
            }
            let reason = match join_error.try_into_panic() {
                Ok(payload) => {
                    if let Some(message) = payload.downcast_ref::<&str>() {
                        (*message).to_string()
                    } else if let Some(message) = payload.downcast_ref::<String>() {
                        message.clone()
                    } else {
                        "worker panicked".to_string()
                    }
                }
                Err(other) => other.to_string(),
            };
            Err(Some(SiteError::Worker { reason }))
        }
    }
}

/// One unit of work: scan the full candidate list and keep the closest
/// station. O(S) in the number of candidates; the deliberate brute force
/// keeps the iteration order (and therefore the tie-break) exactly the
/// order the caller supplied.
fn resolve_site(site: Site, stations: &[Station]) -> Result<Assignment, SiteError> {
    let origin = match site.location {
        Some(location) if location.is_finite() => location,
        _ => return Err(SiteError::InvalidCoordinate),
    };

    let mut best: Option<&Station> = None;
    let mut best_distance = f64::INFINITY;
    for station in stations.iter() {
        let d = distance(origin, station.location);
        // Strict `<` so the first candidate encountered wins ties.
        if d < best_distance {
            best_distance = d;
            best = Some(station);
        }
    }

    let station = best.ok_or_else(|| SiteError::Worker {
        reason: "no finite distance to any candidate station".to_string(),
    })?;
    Ok(Assignment {
        station: station.clone(),
        distance_m: best_distance,
        site,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn california_stations() -> Vec<Station> {
        vec![
            Station::new("S1", "Santa Cruz", 37.0, -122.1),
            Station::new("S2", "Redding", 40.0, -122.0),
            Station::new("S3", "Monterey", 36.6, -121.9),
        ]
    }

    #[tokio::test]
    async fn empty_candidate_list_is_fatal() {
        let resolver = Resolver::default();
        let result = resolver
            .resolve(vec![Site::new("A", 37.0, -122.0)], vec![])
            .await;
        assert!(matches!(result, Err(ResolveError::NoCandidateStations)));
    }

    #[tokio::test]
    async fn matches_site_to_nearest_station() {
        let sites = vec![Site::new("A", 37.0, -122.0)];
        let stations = vec![
            Station::new("S1", "Near", 37.0, -122.1),
            Station::new("S2", "Far", 40.0, -122.0),
        ];
        let resolution = Resolver::default().resolve(sites, stations).await.unwrap();

        assert!(resolution.is_complete());
        assert_eq!(resolution.assignments.len(), 1);
        let assignment = &resolution.assignments[0];
        assert_eq!(assignment.site.name, "A");
        assert_eq!(assignment.station.id, "S1");
        // 0.1 degrees of longitude at latitude 37.
        assert!((assignment.distance_m - 8_883.0).abs() < 5.0);
    }

    #[tokio::test]
    async fn assigned_distance_beats_every_other_candidate() {
        let stations = california_stations();
        let sites = vec![
            Site::new("A", 36.97, -122.03),
            Site::new("B", 39.5, -121.5),
            Site::new("C", 36.5, -121.5),
        ];
        let resolution = Resolver::default()
            .resolve(sites, stations.clone())
            .await
            .unwrap();

        assert_eq!(resolution.assignments.len(), 3);
        for assignment in &resolution.assignments {
            let origin = assignment.site.location.unwrap();
            for station in &stations {
                assert!(assignment.distance_m <= distance(origin, station.location));
            }
        }
    }

    #[tokio::test]
    async fn ties_go_to_the_first_candidate_in_order() {
        // Two stations at the same coordinates are exactly equidistant from
        // any site; the winner must be whichever comes first.
        let site = Site::new("Equator", 0.0, 0.0);
        let first = Station::new("E1", "East one", 0.0, 1.0);
        let second = Station::new("E2", "East two", 0.0, 1.0);

        let resolution = Resolver::default()
            .resolve(vec![site.clone()], vec![first.clone(), second.clone()])
            .await
            .unwrap();
        assert_eq!(resolution.assignments[0].station.id, "E1");

        let resolution = Resolver::default()
            .resolve(vec![site], vec![second, first])
            .await
            .unwrap();
        assert_eq!(resolution.assignments[0].station.id, "E2");
    }

    #[tokio::test]
    async fn invalid_site_is_skipped_without_aborting_the_run() {
        let sites = vec![
            Site::new("A", 36.97, -122.03),
            Site::new("B", f64::NAN, -121.5),
            Site {
                name: "C".to_string(),
                location: None,
            },
            Site::new("D", 36.5, -121.5),
        ];
        let resolution = Resolver::default()
            .resolve(sites, california_stations())
            .await
            .unwrap();

        assert!(resolution.is_complete());
        assert_eq!(resolution.assignments.len(), 2);
        assert_eq!(resolution.failures.len(), 2);
        for failure in &resolution.failures {
            assert!(matches!(failure.error, SiteError::InvalidCoordinate));
        }
    }

    #[tokio::test]
    async fn every_site_is_accounted_for_under_a_small_pool() {
        let stations = california_stations();
        let sites: Vec<Site> = (0..50)
            .map(|i| Site::new(format!("site-{i:02}"), 36.0 + (i as f64) * 0.05, -122.0))
            .collect();
        let expected: Vec<String> = sites.iter().map(|s| s.name.clone()).collect();

        let resolver = Resolver::builder().workers(2).build();
        let mut resolution = resolver.resolve(sites, stations).await.unwrap();

        assert!(resolution.is_complete());
        assert!(resolution.failures.is_empty());
        resolution.sort_by_site();
        let resolved: Vec<String> = resolution
            .assignments
            .iter()
            .map(|a| a.site.name.clone())
            .collect();
        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn no_sites_resolves_to_an_empty_complete_run() {
        let resolution = Resolver::default()
            .resolve(vec![], california_stations())
            .await
            .unwrap();
        assert!(resolution.is_complete());
        assert!(resolution.assignments.is_empty());
        assert!(resolution.failures.is_empty());
    }

    #[tokio::test]
    async fn sort_by_site_is_deterministic() {
        let stations = california_stations();
        let sites = vec![
            Site::new("delta", 36.9, -122.0),
            Site::new("alpha", 37.1, -122.0),
            Site::new("charlie", 36.8, -121.9),
        ];
        let mut resolution = Resolver::default().resolve(sites, stations).await.unwrap();
        resolution.sort_by_site();
        let names: Vec<&str> = resolution
            .assignments
            .iter()
            .map(|a| a.site.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "charlie", "delta"]);
    }
}
