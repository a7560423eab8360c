use thiserror::Error;

/// Errors that fail an entire resolver invocation.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("candidate station list is empty")]
    NoCandidateStations,

    #[error("worker pool closed before all sites were scheduled")]
    PoolClosed,
}

/// Errors that fail a single site's resolution.
///
/// These are recovered locally: the site is skipped and reported in the
/// run's [`crate::Resolution`], and sibling sites are unaffected.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("site coordinate is missing or non-finite")]
    InvalidCoordinate,

    #[error("worker failed: {reason}")]
    Worker { reason: String },
}
