use thiserror::Error;

/// Failures raised by a key-value backend or while (de)serializing the
/// values kept in it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on key {key}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize value for key {key}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored value under key {key} is not valid json")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage quota exceeded writing key {key} ({needed} bytes needed, {limit} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
}

/// Input rejected before any state transition happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("a reason is required to mark a task incomplete")]
    EmptyReason,

    #[error("invalid time {0:?}; expected HH:MM")]
    InvalidTime(String),

    #[error("invalid date key {0:?}; expected YYYY-MM-DD")]
    InvalidDateKey(String),

    #[error("unknown mode {0:?}; expected time or simple")]
    UnknownMode(String),

    #[error("unknown day {0:?}")]
    UnknownDay(String),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
