use thiserror::Error;

/// Errors raised while normalizing a raw message into a `PriceEvent`.
///
/// A missing symbol is the only condition that drops a message outright;
/// every other malformed field degrades to a documented default instead.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("event has no symbol")]
    MissingSymbol,

    #[error("message is not a JSON object")]
    NotAnObject,
}

/// The backing store was unreachable or rejected a write entirely.
///
/// Fatal for the single event being processed, never for its siblings in
/// the same batch. A conditional write losing its race is NOT a store
/// error; that is `MergeOutcome::SkippedDueToRace`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("storage rejected write for {key}: {reason}")]
    Rejected { key: String, reason: String },
}

/// The alert sink could not be reached. Logged only; the anomaly is still
/// considered detected and recorded.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("alert delivery failed: {reason}")]
    DeliveryFailed { reason: String },
}

/// Per-event processing failure, reported in batch accounting.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Invalid(#[from] NormalizeError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
