//! # analytics-pipeline
//!
//! Event ingestion, enrichment, and resilient batch-delivery pipeline for
//! an analytics client SDK.
//!
//! This crate implements the HARD ENGINEERING CORE of a Segment-style
//! analytics client: a bounded producer→enricher ingest channel, a
//! single-consumer enrichment stage, a bounded FIFO event queue with
//! overflow semantics, a batching dispatcher with periodic and
//! threshold-driven flush, an HTTP response classifier with requeue and
//! backoff, and a three-state circuit breaker protecting the remote
//! ingestion endpoint.
//!
//! What this crate deliberately does NOT do: the public event-method
//! surface's option validation beyond what [`config::ClientOptions`]
//! checks, persistent identity storage, environment/device context
//! collection, a host-application proxy-of-calls pattern, or lifecycle
//! hooks tied to foreground/background transitions. Those are external
//! collaborators, consumed here only through the [`identity::IdentityStore`]
//! and [`context::ContextProvider`] trait seams.
//!
//! ## Quick start
//!
//! ```no_run
//! use analytics_pipeline::{AnalyticsClient, ClientOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClientOptions::builder()
//!     .write_key("wk_live_...")
//!     .ingestion_host("https://ingest.example.com")
//!     .build();
//!
//! let client = AnalyticsClient::new(options)?;
//! client.start().await;
//! client.track("signed_up", None);
//! client.flush().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Non-goals
//!
//! Persistent on-disk queue across process restarts, exactly-once
//! delivery, per-event priority, compression of batch payloads, and
//! multi-endpoint routing are all out of scope.

#![warn(rustdoc::broken_intra_doc_links)]

pub mod circuit;
pub mod client;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod enricher;
pub mod error;
pub mod event;
pub mod http;
pub mod identity;
pub mod ingest;
pub mod queue;
pub mod retry_after;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{AnalyticsClient, ClientDeps};
pub use config::ClientOptions;
pub use context::{Context, ContextProvider, StaticContextProvider};
pub use dispatcher::{DebugInfo, Dispatcher, FatalConfigCallback};
pub use error::{Error, Result};
pub use event::{BaseEvent, EnrichedEvent, EventType, PropertyMap, PropertyValue};
pub use identity::{IdentityStore, InMemoryIdentityStore};
