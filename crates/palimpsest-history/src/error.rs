use thiserror::Error;

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Failures surfaced at the fallible boundaries of the engine.
///
/// Time travel itself never returns these: inside `undo_to` every failure
/// degrades to a no-op plus the erroneous flag on the affected value.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to encode history value: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode history value: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "history-config")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid history config: {message}")]
    InvalidConfig { message: String },

    #[error("batch computed against revision {base}, document is at revision {current}")]
    StaleSubmission { base: u64, current: u64 },

    #[error("batch was cancelled")]
    Cancelled,

    #[error("batch worker panicked")]
    WorkerPanicked,
}

impl HistoryError {
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether retrying against fresh document state can succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StaleSubmission { .. } | Self::Cancelled)
    }
}
