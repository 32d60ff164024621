use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaVerdict {
    Allowed,
    RateLimited,
    QuotaExceeded,
}

/// Rate limiting and quota accounting, owned by the surrounding gateway.
///
/// Implementations consume one unit of the session's allowance for the API
/// when they return [`QuotaVerdict::Allowed`] and are responsible for their
/// own synchronisation, since the admission core calls them concurrently.
pub trait QuotaTracker: Send + Sync {
    fn check_and_consume(&self, session: &SessionState, api_id: &str) -> QuotaVerdict;
}

/// A tracker that never throttles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmetered;

impl QuotaTracker for Unmetered {
    fn check_and_consume(&self, _session: &SessionState, _api_id: &str) -> QuotaVerdict {
        QuotaVerdict::Allowed
    }
}
