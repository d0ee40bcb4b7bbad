//! Basic usage example for the Replit DB client
//!
//! Run with: REPLIT_DB_URL=<url> cargo run --example basic_usage

use repldb_client::Client;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let client = Client::from_env()?;
    info!("Using database at {}", client.endpoint());

    // Store a few values
    for (key, value) in [("example/hello", "Hello!"), ("example/bye", "Goodbye!"), ("other", "x")] {
        let stored = client.set(key, value).await?;
        info!("Stored '{}': {}", key, stored);
    }

    // Retrieve one
    match client.get("example/hello").await? {
        Some(text) => info!("Retrieved: {}", text),
        None => info!("Key not found"),
    }

    // List by prefix
    let keys = client.list_prefix("example/").await?;
    info!("Keys under 'example/': {:?}", keys);

    // Delete one key, then the rest of the prefix
    let deleted = client.delete("other").await?;
    info!("Deleted 'other': {}", deleted);

    let cleared = client.delete_prefix("example/").await?;
    info!("Cleared 'example/': {}", cleared);

    info!("Remaining keys: {:?}", client.list_all().await?);
    Ok(())
}
