//! Minimal end-to-end run: construct a client from the environment,
//! track a couple of events, and flush once before exiting.

use analytics_pipeline::{AnalyticsClient, ClientOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let options = ClientOptions::from_env()?;
    let client = AnalyticsClient::new(options)?;
    client.start().await;

    client.track("demo_started", None);
    client.identify(None);

    client.flush().await;
    client.stop().await;

    println!("debug info: {:?}", client.debug_info().await);
    Ok(())
}
