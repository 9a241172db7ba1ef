//! Single-consumer stage: attaches identity + context + metadata to each
//! [`BaseEvent`], producing an [`EnrichedEvent`] and handing it to the
//! dispatcher's post-enrichment entry point.

use std::sync::Arc;

use tracing::error;

use crate::context::ContextProvider;
use crate::dispatcher::Dispatcher;
use crate::event::{new_message_id, now_iso, EnrichedEvent};
use crate::identity::IdentityStore;
use crate::ingest::IngestReceiver;

/// Drain `receiver` until the ingest channel closes, enriching and handing
/// each event to [`Dispatcher::offer`] (which enqueues it and arms an
/// immediate flush once `auto_flush_threshold` is crossed). Any failure
/// while enriching a single event drops that event (logged) and the loop
/// continues — it never exits except when the channel closes.
pub async fn run(
    mut receiver: IngestReceiver,
    identity: Arc<dyn IdentityStore>,
    context: Arc<dyn ContextProvider>,
    dispatcher: Arc<Dispatcher>,
    write_key: String,
    auto_flush_threshold: usize,
) {
    while let Some(base) = receiver.recv().await {
        match enrich(&base, &identity, &context, &write_key).await {
            Ok(enriched) => dispatcher.offer(enriched, auto_flush_threshold).await,
            Err(err) => error!(error = %err, "enrichment failed, dropping event"),
        }
    }
}

async fn enrich(
    base: &crate::event::BaseEvent,
    identity: &Arc<dyn IdentityStore>,
    context: &Arc<dyn ContextProvider>,
    write_key: &str,
) -> Result<EnrichedEvent, String> {
    let anonymous_id = identity.anonymous_id().await;
    if anonymous_id.is_empty() {
        return Err("identity store returned an empty anonymous_id".to_string());
    }
    let user_id = identity.user_id().await;
    let group_id = identity.group_id().await;
    let advertising_id = identity.advertising_id().await;

    let ctx = context.snapshot(advertising_id.as_deref()).await;
    let timestamp = base.timestamp.clone().unwrap_or_else(now_iso);

    Ok(EnrichedEvent {
        event_type: base.event_type,
        event: base.event.clone(),
        properties: base.properties.clone(),
        traits: base.traits.clone(),
        anonymous_id,
        user_id,
        group_id,
        timestamp,
        context: ctx,
        message_id: new_message_id(),
        write_key: write_key.to_string(),
        sent_at: None,
    })
}
