//! Error taxonomy for the event pipeline

use thiserror::Error;

/// Errors produced by the pipeline.
///
/// None of these ever escape to the public event-method surface: every
/// variant is either logged and swallowed at the point it occurs, or
/// surfaced exactly once through the fatal-config-error callback.
#[derive(Error, Debug)]
pub enum Error {
    /// The ingest channel was full; the event was dropped.
    #[error("ingest channel full, event dropped")]
    IngestFull,

    /// Enrichment failed for a single event; the event was dropped.
    #[error("enrichment failed: {0}")]
    EnrichFailure(String),

    /// A connection-level failure (DNS, refused, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 5xx, 408, or 429 response.
    #[error("transient HTTP error: status {status}")]
    TransientHttp { status: u16 },

    /// A 413 response; batch size may have been reduced.
    #[error("payload too large: status 413")]
    PayloadTooLarge,

    /// A 401, 403, or 404 response: misconfigured credentials or endpoint.
    #[error("fatal configuration error: status {status}")]
    FatalConfig { status: u16 },

    /// Any other 4xx response.
    #[error("client error: status {status}")]
    ClientError { status: u16 },

    /// The event queue dropped its oldest element to admit a new one.
    #[error("event queue overflow, oldest event dropped")]
    QueueOverflow,

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of classifying an HTTP response, used by the dispatcher to
/// decide what to do with the batch that produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// 200-299: batch delivered, discard it, keep flushing.
    Success,
    /// 5xx/408/429: requeue the batch and back off.
    Retryable { status: u16 },
    /// 413: batch too large for the endpoint.
    TooLarge,
    /// 401/403/404: stop the pipeline.
    Fatal { status: u16 },
    /// Any other 4xx, or an unrecognized status: drop the batch.
    NonRetryable { status: u16 },
}

impl ResponseOutcome {
    pub fn classify(status: u16) -> Self {
        match status {
            200..=299 => ResponseOutcome::Success,
            500..=599 | 408 | 429 => ResponseOutcome::Retryable { status },
            413 => ResponseOutcome::TooLarge,
            401 | 403 | 404 => ResponseOutcome::Fatal { status },
            _ => ResponseOutcome::NonRetryable { status },
        }
    }
}
