use thiserror::Error;

/// Errors surfaced by the scraping and sync engine.
///
/// Per-course JSON parse failures are deliberately absent: the fetcher
/// degrades a malformed course payload to an empty list and logs it, so one
/// broken endpoint never aborts a whole sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or TLS failure reaching the portal.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The CAS flow could not establish a session (missing tokens,
    /// unexpected status, or the portal kept serving the login page).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// CAS rejected the username/password pair. Callers should prompt for
    /// re-entry instead of retrying.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// A sync is already in flight for this session; the call was rejected
    /// rather than interleaving CAS state.
    #[error("a sync is already in flight")]
    Busy,
}
