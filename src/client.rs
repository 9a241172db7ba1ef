//! Public facade: construction, the event-producing methods, and
//! lifecycle control.

use std::sync::Arc;

use bon::Builder;

use crate::circuit::CircuitState;
use crate::config::ClientOptions;
use crate::context::{ContextProvider, StaticContextProvider};
use crate::dispatcher::{DebugInfo, Dispatcher, FatalConfigCallback};
use crate::enricher;
use crate::error::Result;
use crate::event::{BaseEvent, EventType, PropertyMap};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::identity::{IdentityStore, InMemoryIdentityStore};
use crate::ingest::{ingest_channel, IngestSender};
use crate::queue::EventQueue;

const SDK_NAME: &str = env!("CARGO_PKG_NAME");
const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collaborators an embedder can swap in; everything has a sensible
/// in-memory default so the client is runnable standalone.
#[derive(Builder)]
pub struct ClientDeps {
    #[builder(default = Arc::new(InMemoryIdentityStore::new()))]
    pub identity: Arc<dyn IdentityStore>,
    #[builder(default = Arc::new(StaticContextProvider::new(SDK_NAME, SDK_VERSION)))]
    pub context: Arc<dyn ContextProvider>,
    #[builder(default = Arc::new(ReqwestTransport::new()))]
    pub transport: Arc<dyn HttpTransport>,
}

impl Default for ClientDeps {
    fn default() -> Self {
        ClientDeps::builder().build()
    }
}

struct ClientDepsInner {
    identity: Arc<dyn IdentityStore>,
    context: Arc<dyn ContextProvider>,
    transport: Arc<dyn HttpTransport>,
}

/// The analytics client: wires the ingest channel, the enricher task, the
/// event queue, and the dispatcher together behind the public
/// `track`/`identify`/`group`/`screen`/`page`/`alias` surface.
pub struct AnalyticsClient {
    options: ClientOptions,
    deps: Arc<ClientDepsInner>,
    ingest: IngestSender,
    enricher_task: tokio::task::JoinHandle<()>,
    queue: Arc<EventQueue>,
    dispatcher: Arc<Dispatcher>,
}

impl AnalyticsClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        Self::with_deps(options, ClientDeps::default())
    }

    pub fn with_deps(options: ClientOptions, deps: ClientDeps) -> Result<Self> {
        options.validate()?;

        let deps = Arc::new(ClientDepsInner {
            identity: deps.identity,
            context: deps.context,
            transport: deps.transport,
        });

        let (ingest, receiver) = ingest_channel(options.max_queue_events);
        let queue = Arc::new(EventQueue::new(options.max_queue_events));
        let dispatcher = Dispatcher::new(queue.clone(), deps.transport.clone(), &options);

        let enricher_task = tokio::spawn(enricher::run(
            receiver,
            deps.identity.clone(),
            deps.context.clone(),
            dispatcher.clone(),
            options.write_key.clone(),
            options.auto_flush_threshold,
        ));

        Ok(Self {
            options,
            deps,
            ingest,
            enricher_task,
            queue,
            dispatcher,
        })
    }

    fn offer_base_event(&self, event: BaseEvent) {
        self.ingest.offer(event);
    }

    pub fn track(&self, event_name: impl Into<String>, properties: Option<PropertyMap>) {
        let mut e = BaseEvent::new(EventType::Track);
        e.event = Some(event_name.into());
        e.properties = properties;
        self.offer_base_event(e);
    }

    pub fn identify(&self, traits: Option<PropertyMap>) {
        let mut e = BaseEvent::new(EventType::Identify);
        e.traits = traits;
        self.offer_base_event(e);
    }

    pub fn group(&self, traits: Option<PropertyMap>) {
        let mut e = BaseEvent::new(EventType::Group);
        e.traits = traits;
        self.offer_base_event(e);
    }

    pub fn screen(&self, name: impl Into<String>, properties: Option<PropertyMap>) {
        let mut e = BaseEvent::new(EventType::Screen);
        e.event = Some(name.into());
        e.properties = properties;
        self.offer_base_event(e);
    }

    pub fn page(&self, name: impl Into<String>, properties: Option<PropertyMap>) {
        let mut e = BaseEvent::new(EventType::Page);
        e.event = Some(name.into());
        e.properties = properties;
        self.offer_base_event(e);
    }

    pub fn alias(&self, previous_id: impl Into<String>) {
        let mut e = BaseEvent::new(EventType::Alias);
        let mut traits = PropertyMap::new();
        traits.insert(
            "previousId".to_string(),
            crate::event::PropertyValue::String(previous_id.into()),
        );
        e.traits = Some(traits);
        self.offer_base_event(e);
    }

    /// Launch the periodic flush loop. Idempotent.
    pub async fn start(&self) {
        self.dispatcher.start().await;
    }

    /// Cancel the periodic loop and any pending retry.
    pub async fn stop(&self) {
        self.dispatcher.stop().await;
    }

    /// Run one flush pass; no-op if a flush is already in progress.
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    pub fn set_tracing(&self, enabled: bool) {
        self.dispatcher.set_tracing(enabled);
    }

    pub async fn debug_info(&self) -> DebugInfo {
        self.dispatcher.debug_info().await
    }

    pub async fn on_fatal_config_error(&self, callback: FatalConfigCallback) {
        self.dispatcher.set_fatal_config_callback(callback).await;
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.dispatcher.debug_info().await.circuit_state
    }

    /// Stop the dispatcher, drop the ingest channel and enricher task,
    /// clear the queue, and rebuild a fresh identity store and ingest
    /// pipeline. Equivalent to tearing the client down and rebuilding it
    /// in place, minus re-validating options.
    pub async fn reset(&mut self) -> Result<()> {
        self.dispatcher.stop().await;
        self.enricher_task.abort();
        self.queue.clear().await;

        let (ingest, receiver) = ingest_channel(self.options.max_queue_events);
        self.ingest = ingest;

        let fresh_identity: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        self.deps = Arc::new(ClientDepsInner {
            identity: fresh_identity,
            context: self.deps.context.clone(),
            transport: self.deps.transport.clone(),
        });

        self.enricher_task = tokio::spawn(enricher::run(
            receiver,
            self.deps.identity.clone(),
            self.deps.context.clone(),
            self.dispatcher.clone(),
            self.options.write_key.clone(),
            self.options.auto_flush_threshold,
        ));

        Ok(())
    }
}

impl Drop for AnalyticsClient {
    fn drop(&mut self) {
        self.enricher_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn post_json(
            &self,
            _url: &str,
            _body: &serde_json::Value,
            _timeout: Duration,
            _headers: &HashMap<String, String>,
        ) -> std::result::Result<crate::http::HttpResponse, crate::http::TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(crate::http::HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: None,
            })
        }
    }

    fn options() -> ClientOptions {
        ClientOptions::builder()
            .write_key("wk")
            .ingestion_host("http://localhost")
            .build()
    }

    #[tokio::test]
    async fn track_flows_through_to_a_flush() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let deps = ClientDeps::builder().transport(transport.clone()).build();
        let client = AnalyticsClient::with_deps(options(), deps).unwrap();

        client.track("signed_up", None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.flush().await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_clears_queue_and_keeps_client_usable() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let deps = ClientDeps::builder().transport(transport.clone()).build();
        let mut client = AnalyticsClient::with_deps(options(), deps).unwrap();

        client.track("e1", None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.reset().await.unwrap();

        client.track("e2", None);
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.flush().await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn debug_info_reports_defaults() {
        let client = AnalyticsClient::new(options()).unwrap();
        let info = client.debug_info().await;
        assert!(!info.is_running);
        assert_eq!(info.max_batch_size, 100);
        assert!(!info.tracing_enabled);
    }
}
