use thiserror::Error;

/// Errors that can arise while operating on balances and their storage.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON store encoding errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, file locking, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when an explicit load finds no value under the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// Returned when a registry slot is read before anything was assigned to it.
    #[error("{0} balance not configured")]
    NotConfigured(&'static str),

    /// User supplied amount could not be parsed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Arithmetic result does not fit in the balance.
    #[error("overflow multiplying balance {identifier} by {factor}")]
    Overflow { identifier: String, factor: f64 },

    /// Internal error (poisoned locks, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}
