use thiserror::Error;

use gramdelta_core::StoreError;
use gramdelta_upstream::UpstreamError;

/// Errors from search operations.
///
/// Upstream classification is preserved through [`SearchError::Upstream`] so
/// the routing layer can map rate limits, missing accounts, and provider
/// outages to distinct responses.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The operation requires an authenticated requester and none was given.
    #[error("this operation requires an authenticated requester")]
    Unauthorized,

    /// A request parameter failed validation before any upstream call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SearchError {
    /// Whether this failure came from an upstream rate limit. Used to pick
    /// the `rate_limited` history status.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            SearchError::Upstream(UpstreamError::RateLimited { .. })
        )
    }
}
