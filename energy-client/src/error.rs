/// Failures talking to the backing reading store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored timestamp out of range: {0} us")]
    TimestampOutOfRange(i64),
}

/// A reading rejected before it reaches the store.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing JSON")]
    MissingBody,
    #[error("invalid watts value")]
    InvalidWatts,
    #[error("watts must be non-negative")]
    NegativeWatts,
}
