use thiserror::Error;

/// Failures reported by a [`crate::location::LocationService`].
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable: {0}")]
    Unavailable(String),
}

/// Failures of a single weather request. Never surfaced past the fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather provider returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Malformed weather response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures writing a snapshot to persistent storage.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write weather record: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode weather record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Place name must not be empty")]
pub struct EmptyPlaceQuery;
