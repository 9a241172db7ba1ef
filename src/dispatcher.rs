//! Flush loop, batching, response classification, and retry scheduling.
//!
//! Drains a shared [`EventQueue`] on a periodic tick or an auto-flush
//! threshold, posts each batch through an [`HttpTransport`], classifies
//! the response, and routes the result to requeue, backoff, batch-size
//! reduction, or pipeline shutdown through the [`CircuitBreaker`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::config::ClientOptions;
use crate::error::ResponseOutcome;
use crate::event::{now_iso, Batch, EnrichedEvent};
use crate::http::HttpTransport;
use crate::queue::EventQueue;

/// Invoked exactly once per fatal (401/403/404) response.
pub type FatalConfigCallback = Arc<dyn Fn(u16) + Send + Sync>;

/// Snapshot returned by [`Dispatcher::debug_info`].
#[derive(Debug, Clone)]
pub struct DebugInfo {
    pub is_running: bool,
    pub max_batch_size: usize,
    pub pending_retry: bool,
    pub tracing_enabled: bool,
    pub circuit_state: CircuitState,
    pub remaining_cooldown_ms: u64,
}

struct RetryHandle {
    handle: JoinHandle<()>,
}

/// Orchestrates transmission: owns the flush loop, constructs batches,
/// calls the HTTP client, classifies responses, manages retries, and
/// interacts with the circuit breaker.
pub struct Dispatcher {
    queue: Arc<EventQueue>,
    transport: Arc<dyn HttpTransport>,
    circuit: Arc<CircuitBreaker>,
    host: String,
    endpoint_path: String,
    http_timeout: Duration,
    flush_interval: Duration,
    max_batch_size: Arc<AtomicUsize>,
    tracing_enabled: Arc<AtomicBool>,
    flush_lock: Arc<Mutex<()>>,
    periodic_task: Mutex<Option<JoinHandle<()>>>,
    retry_task: Mutex<Option<RetryHandle>>,
    on_fatal_config_error: Mutex<Option<FatalConfigCallback>>,
    fatal: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<EventQueue>,
        transport: Arc<dyn HttpTransport>,
        options: &ClientOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            transport,
            circuit: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
            host: options.ingestion_host.clone(),
            endpoint_path: options.endpoint_path.clone(),
            http_timeout: Duration::from_millis(options.http_timeout_ms),
            flush_interval: Duration::from_secs(options.flush_interval_seconds),
            max_batch_size: Arc::new(AtomicUsize::new(options.initial_max_batch_size)),
            tracing_enabled: Arc::new(AtomicBool::new(false)),
            flush_lock: Arc::new(Mutex::new(())),
            periodic_task: Mutex::new(None),
            retry_task: Mutex::new(None),
            on_fatal_config_error: Mutex::new(None),
            fatal: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn set_fatal_config_callback(&self, cb: FatalConfigCallback) {
        *self.on_fatal_config_error.lock().await = Some(cb);
    }

    pub fn set_tracing(&self, enabled: bool) {
        self.tracing_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.load(Ordering::SeqCst)
    }

    /// Launch the periodic flush loop. Idempotent: a prior loop, if any,
    /// is cancelled first.
    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.periodic_task.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        self.fatal.store(false, Ordering::SeqCst);

        let this = Arc::clone(self);
        let interval = self.flush_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // consume the immediate first tick
            loop {
                ticker.tick().await;
                this.flush().await;
            }
        });
        *guard = Some(handle);
    }

    /// Cancel the periodic task and any pending scheduled retry.
    pub async fn stop(&self) {
        if let Some(handle) = self.periodic_task.lock().await.take() {
            handle.abort();
        }
        if let Some(retry) = self.retry_task.lock().await.take() {
            retry.handle.abort();
        }
    }

    /// Post-enrichment entry point: enqueue, and schedule an immediate
    /// flush if the queue has crossed the auto-flush threshold.
    pub async fn offer(self: &Arc<Self>, event: EnrichedEvent, auto_flush_threshold: usize) {
        self.queue.enqueue(event).await;
        if self.queue.size().await >= auto_flush_threshold {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.flush().await;
            });
        }
    }

    /// Run one flush pass. No-op if another flush is already in progress
    /// (non-reentrant `try_lock`).
    pub async fn flush(self: &Arc<Self>) {
        let guard = match self.flush_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        self.process_until_empty().await;
        drop(guard);
    }

    async fn process_until_empty(self: &Arc<Self>) {
        loop {
            if self.fatal.load(Ordering::SeqCst) {
                return;
            }
            if self.queue.size().await == 0 {
                return;
            }

            let wait_ms = self.circuit.before_request().await;
            if wait_ms > 0 {
                self.schedule_retry(wait_ms).await;
                return;
            }

            let batch_size = self.max_batch_size.load(Ordering::SeqCst);
            let batch = self.queue.drain(batch_size).await;
            if batch.is_empty() {
                return;
            }

            match self.send_batch(batch).await {
                FlushStep::Continue => continue,
                FlushStep::Return => return,
            }
        }
    }

    async fn send_batch(self: &Arc<Self>, mut batch: Vec<EnrichedEvent>) -> FlushStep {
        let sent_at = now_iso();
        for event in &mut batch {
            event.stamp_sent_at(&sent_at);
        }
        let payload = match serde_json::to_value(Batch {
            batch: batch.clone(),
        }) {
            Ok(payload) => payload,
            Err(err) => {
                error!(error = %err, batch_size = batch.len(), "failed to serialize batch, dropping");
                return FlushStep::Continue;
            }
        };

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if self.tracing_enabled.load(Ordering::SeqCst) {
            headers.insert("Trace".to_string(), "true".to_string());
        }

        let url = format!("{}{}", self.host, self.endpoint_path);
        let result = self
            .transport
            .post_json(&url, &payload, self.http_timeout, &headers)
            .await;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "transport error sending batch, requeueing");
                self.queue.requeue_front(batch).await;
                self.circuit.on_failure().await;
                self.schedule_retry(1000).await;
                return FlushStep::Return;
            }
        };

        self.handle_response(response, batch).await
    }

    async fn handle_response(
        self: &Arc<Self>,
        response: crate::http::HttpResponse,
        batch: Vec<EnrichedEvent>,
    ) -> FlushStep {
        match ResponseOutcome::classify(response.status) {
            ResponseOutcome::Success => {
                self.circuit.on_success().await;
                FlushStep::Continue
            }
            ResponseOutcome::Retryable { status } => {
                self.circuit.on_failure().await;
                self.queue.requeue_front(batch).await;
                let retry_after_ms =
                    crate::retry_after::parse_retry_after(&response.headers, chrono::Utc::now())
                        .unwrap_or(0);
                let circuit_wait = self.circuit.before_request().await;
                let wait_ms = circuit_wait.max(retry_after_ms).max(1000);
                warn!(status, wait_ms, "transient HTTP error, scheduling retry");
                self.schedule_retry(wait_ms).await;
                FlushStep::Return
            }
            ResponseOutcome::TooLarge => {
                self.circuit.on_non_retryable().await;
                let current = self.max_batch_size.load(Ordering::SeqCst);
                if current > 1 {
                    let halved = (current / 2).max(1);
                    self.max_batch_size.store(halved, Ordering::SeqCst);
                    warn!(from = current, to = halved, "413 received, halving batch size");
                    self.queue.requeue_front(batch).await;
                    self.schedule_retry(500).await;
                } else {
                    warn!("413 received at batch size 1, dropping oversized batch");
                }
                FlushStep::Return
            }
            ResponseOutcome::Fatal { status } => {
                error!(status, "fatal configuration error, halting pipeline");
                self.fatal.store(true, Ordering::SeqCst);
                self.queue.clear().await;
                self.stop().await;
                if let Some(cb) = self.on_fatal_config_error.lock().await.as_ref() {
                    cb(status);
                }
                FlushStep::Return
            }
            ResponseOutcome::NonRetryable { status } => {
                self.circuit.on_non_retryable().await;
                warn!(status, "non-retryable client error, dropping batch");
                FlushStep::Continue
            }
        }
    }

    /// Cancel any prior scheduled retry, then arm a one-shot task that
    /// invokes `flush()` after `delay_ms`.
    async fn schedule_retry(self: &Arc<Self>, delay_ms: u64) {
        let mut guard = self.retry_task.lock().await;
        if let Some(prev) = guard.take() {
            prev.handle.abort();
        }
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            this.flush().await;
        });
        *guard = Some(RetryHandle { handle });
    }

    pub async fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            is_running: self.periodic_task.lock().await.is_some(),
            max_batch_size: self.max_batch_size(),
            pending_retry: self.retry_task.lock().await.is_some(),
            tracing_enabled: self.tracing_enabled.load(Ordering::SeqCst),
            circuit_state: self.circuit.state().await,
            remaining_cooldown_ms: self.circuit.remaining_cooldown_ms().await,
        }
    }
}

enum FlushStep {
    Continue,
    Return,
}
