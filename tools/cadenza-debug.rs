//! Live dump of every tracked player's position estimate.
//!
//! Connects to the session bus, then prints each player's identity and
//! extrapolated position ten times a second. Useful for eyeballing that
//! the estimate tracks what the player UI shows between change events.

use std::error::Error;
use std::time::Duration;

use cadenza::{PlayerRegistry, tracing_config};

fn format_timestamp(micros: i64) -> String {
    let seconds = micros / 1_000_000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    format!("{}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_config::init()?;

    let registry = PlayerRegistry::connect(Vec::new()).await?;
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    loop {
        ticker.tick().await;
        for player in registry.players().await {
            println!("{}  {}", player.id, format_timestamp(player.position()));
        }
    }
}
