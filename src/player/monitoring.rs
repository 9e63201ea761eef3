use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Player;
use crate::proxy::{PLAYER_INTERFACE, Seeked};
use crate::variant::{self, PlainValue};

/// Monitors one player's bus signals and drives reconciliation.
///
/// A single task consumes both signal streams, so one notification is
/// reconciled to completion (including its position re-fetch) before the
/// next is looked at; notifications apply in receipt order.
#[derive(Debug)]
pub(crate) struct PlayerMonitor {
    handle: JoinHandle<()>,
}

impl PlayerMonitor {
    /// Start monitoring. The task is aborted when the monitor is dropped.
    pub(crate) fn start(player: Arc<Player>) -> Self {
        let handle = tokio::spawn(async move {
            Self::run(player).await;
        });

        Self { handle }
    }

    async fn run(player: Arc<Player>) {
        let mut properties_changed = match player.properties_proxy.receive_properties_changed().await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to subscribe to PropertiesChanged for {}: {e}", player.id);
                return;
            }
        };

        let mut seeked = match player.player_proxy.receive_seeked().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to subscribe to Seeked for {}: {e}", player.id);
                return;
            }
        };

        loop {
            tokio::select! {
                Some(signal) = properties_changed.next() => {
                    Self::handle_properties_changed(&player, &signal).await;
                }

                Some(signal) = seeked.next() => {
                    Self::handle_seeked(&player, &signal);
                }

                else => {
                    debug!("Signal streams ended for player {}", player.id);
                    break;
                }
            }
        }
    }

    async fn handle_properties_changed(player: &Player, signal: &zbus::fdo::PropertiesChanged) {
        let Ok(args) = signal.args() else { return };
        if args.interface_name().as_str() != PLAYER_INTERFACE {
            return;
        }

        let entries: Vec<(String, PlainValue)> = args
            .changed_properties()
            .iter()
            .filter_map(|(name, value)| {
                variant::plain(value).map(|plain| ((*name).to_string(), plain))
            })
            .collect();
        if entries.is_empty() {
            return;
        }

        player.state.merge_changed(&entries);

        // Position is rarely part of the payload even when playback just
        // started; a fresh read gives the baseline the estimate
        // extrapolates from.
        match player.fetch_position().await {
            Ok(position) => player.state.finish_changed(&entries, position, Instant::now()),
            Err(e) => {
                debug!("Position re-fetch failed for {}, suppressing events: {e}", player.id);
            }
        }
    }

    fn handle_seeked(player: &Player, signal: &Seeked) {
        let Ok(args) = signal.args() else { return };
        player.state.apply_seeked(args.position, Instant::now());
    }
}

impl Drop for PlayerMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
