//! Pipeline configuration: [`ClientOptions`], validated at construction.

use bon::Builder;

use crate::error::{Error, Result};

/// Configuration consumed by the core pipeline.
#[derive(Debug, Clone, Builder)]
pub struct ClientOptions {
    pub write_key: String,
    pub ingestion_host: String,
    #[builder(default = 10)]
    pub flush_interval_seconds: u64,
    #[builder(default = 2000)]
    pub max_queue_events: usize,
    #[builder(default = 20)]
    pub auto_flush_threshold: usize,
    #[builder(default = 100)]
    pub initial_max_batch_size: usize,
    #[builder(default = 8000)]
    pub http_timeout_ms: u64,
    #[builder(default = String::from("/v1/batch"))]
    pub endpoint_path: String,
}

impl ClientOptions {
    /// Validate the invariants required of `Options`. Call before handing
    /// these to [`crate::client::AnalyticsClient::new`].
    pub fn validate(&self) -> Result<()> {
        if self.write_key.is_empty() {
            return Err(Error::Configuration("write_key must not be empty".into()));
        }
        let url = url_parts(&self.ingestion_host).ok_or_else(|| {
            Error::Configuration(format!(
                "ingestion_host must be a valid http(s) URL: {}",
                self.ingestion_host
            ))
        })?;
        if url.trailing_slash {
            return Err(Error::Configuration(
                "ingestion_host must not have a trailing slash".into(),
            ));
        }
        if self.flush_interval_seconds == 0 {
            return Err(Error::Configuration(
                "flush_interval_seconds must be > 0".into(),
            ));
        }
        if self.max_queue_events == 0 {
            return Err(Error::Configuration("max_queue_events must be > 0".into()));
        }
        if self.auto_flush_threshold == 0 {
            return Err(Error::Configuration(
                "auto_flush_threshold must be > 0".into(),
            ));
        }
        if self.initial_max_batch_size == 0 {
            return Err(Error::Configuration(
                "initial_max_batch_size must be > 0".into(),
            ));
        }
        if self.http_timeout_ms == 0 {
            return Err(Error::Configuration("http_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Build from environment variables:
    /// `WRITE_KEY`, `INGESTION_HOST`, and optional tuning knobs.
    pub fn from_env() -> Result<Self> {
        use std::env;

        let write_key = env::var("WRITE_KEY")
            .map_err(|_| Error::Configuration("WRITE_KEY environment variable not set".into()))?;
        let ingestion_host = env::var("INGESTION_HOST").map_err(|_| {
            Error::Configuration("INGESTION_HOST environment variable not set".into())
        })?;

        let mut builder = ClientOptions::builder()
            .write_key(write_key)
            .ingestion_host(ingestion_host);

        if let Ok(v) = env::var("FLUSH_INTERVAL_SECONDS") {
            if let Ok(v) = v.parse() {
                builder = builder.flush_interval_seconds(v);
            }
        }
        if let Ok(v) = env::var("MAX_QUEUE_EVENTS") {
            if let Ok(v) = v.parse() {
                builder = builder.max_queue_events(v);
            }
        }

        let options = builder.build();
        options.validate()?;
        Ok(options)
    }
}

struct UrlParts {
    trailing_slash: bool,
}

fn url_parts(raw: &str) -> Option<UrlParts> {
    if !(raw.starts_with("http://") || raw.starts_with("https://")) {
        return None;
    }
    Some(UrlParts {
        trailing_slash: raw.ends_with('/'),
    })
}
