//! Storage-related errors.

/// Errors surfaced by the durable analysis cache.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The cache file could not be opened or created. Fatal at startup.
    #[error("Failed to open analysis cache at '{0}'")]
    Open(String, #[source] rusqlite::Error),

    /// The storage stayed locked by a concurrent writer after the retry
    /// budget was exhausted. Affects the single operation only.
    #[error("Analysis cache locked after {0} attempts")]
    Contention(u32, #[source] rusqlite::Error),

    /// A query or mutation failed.
    #[error("Analysis cache query failed")]
    Query(#[source] rusqlite::Error),

    /// A persisted analysis payload could not be decoded.
    #[error("Malformed analysis payload for '{0}'")]
    Payload(String, #[source] serde_json::Error),
}
