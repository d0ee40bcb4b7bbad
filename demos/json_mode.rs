//! Storing structured values with the JSON mode
//!
//! Run with: REPLIT_DB_URL=<url> cargo run --example json_mode

use repldb_client::{ClientConfig, Mode, Store};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct Player {
    name: String,
    score: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store = Store::with_config(ClientConfig::from_env()?.with_mode(Mode::Json))?;

    let players = [
        Player { name: "alice".to_string(), score: 120 },
        Player { name: "bob".to_string(), score: 95 },
    ];
    for player in &players {
        store.set(&format!("players/{}", player.name), player).await?;
    }

    for key in store.list("players/").await? {
        let player: Option<Player> = store.get_as(&key).await?;
        info!("{} -> {:?}", key, player);
    }

    let cleared = store.delete_prefix("players/").await?;
    info!("Cleared players: {}", cleared);
    Ok(())
}
