//! End-to-end tests driving `AnalyticsClient` against a mock ingestion
//! endpoint, exercising the full ingest -> enrich -> queue -> dispatch path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use analytics_pipeline::{AnalyticsClient, ClientOptions};
use mockito::Server;

fn options_for(host: &str) -> ClientOptions {
    ClientOptions::builder()
        .write_key("wk-test")
        .ingestion_host(host)
        .flush_interval_seconds(3600)
        .build()
}

#[tokio::test]
async fn track_events_are_delivered_on_flush() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/batch")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let client = AnalyticsClient::new(options_for(&server.url())).unwrap();
    client.track("signed_up", None);
    client.track("viewed_page", None);

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.flush().await;

    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_requeues_events_for_the_next_flush() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/v1/batch")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let client = AnalyticsClient::new(options_for(&server.url())).unwrap();
    client.track("will_fail_then_succeed", None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.flush().await;
    failing.assert_async().await;

    // the 503 leaves the batch requeued; the next flush resends the same event.
    let succeeding = server
        .mock("POST", "/v1/batch")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    client.flush().await;
    succeeding.assert_async().await;
}

#[tokio::test]
async fn unauthorized_response_drops_the_batch_and_fires_callback() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/batch")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let client = AnalyticsClient::new(options_for(&server.url())).unwrap();

    let fired = Arc::new(AtomicBool::new(false));
    let fired_clone = fired.clone();
    client
        .on_fatal_config_error(Arc::new(move |_status| {
            fired_clone.store(true, Ordering::SeqCst);
        }))
        .await;

    client.track("never_delivered", None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.flush().await;

    mock.assert_async().await;
    assert!(fired.load(Ordering::SeqCst));

    // a 401 drops the batch rather than requeuing it: a second flush sees nothing to send.
    let info = client.debug_info().await;
    assert!(!info.pending_retry);
}

#[tokio::test]
async fn identify_and_alias_events_also_reach_the_queue() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/batch")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = AnalyticsClient::new(options_for(&server.url())).unwrap();
    client.identify(None);
    client.alias("previous-user-id");
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.flush().await;

    mock.assert_async().await;
}
