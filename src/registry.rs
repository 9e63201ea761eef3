use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt, future::join_all};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, instrument, warn};
use zbus::{Connection, fdo::DBusProxy};

use crate::error::MediaError;
use crate::player::Player;
use crate::types::PlayerId;

const PLAYER_CHANNEL_CAPACITY: usize = 32;

/// Tracks the set of live MPRIS players on the session bus.
///
/// Discovers the players advertised at startup, then follows bus
/// ownership changes to create and destroy [`Player`] instances over
/// time. At most one live instance exists per identity; an ownership
/// handoff tears the old instance down before the replacement is built.
pub struct PlayerRegistry {
    connection: Connection,
    players: Arc<RwLock<HashMap<PlayerId, Arc<Player>>>>,
    player_added_tx: broadcast::Sender<Arc<Player>>,
    player_list_tx: broadcast::Sender<Vec<Arc<Player>>>,
    ignored_players: Arc<Vec<String>>,
    monitor_handle: Option<JoinHandle<()>>,
}

impl PlayerRegistry {
    /// Connect to the session bus and start tracking players.
    ///
    /// Bus names matching any pattern in `ignored_players` (substring
    /// match) are skipped during discovery.
    ///
    /// # Errors
    /// Returns error if the D-Bus connection or initial discovery fails.
    pub async fn connect(ignored_players: Vec<String>) -> Result<Self, MediaError> {
        let connection = Connection::session().await.map_err(|e| {
            MediaError::InitializationFailed(format!("D-Bus connection failed: {e}"))
        })?;

        Self::new(connection, ignored_players).await
    }

    /// Start tracking players on an existing connection.
    ///
    /// Performs the initial discovery pass before subscribing to
    /// ownership changes, so the registry is fully populated when this
    /// returns.
    ///
    /// # Errors
    /// Returns error if name listing or signal subscription setup fails.
    pub async fn new(
        connection: Connection,
        ignored_players: Vec<String>,
    ) -> Result<Self, MediaError> {
        let (player_added_tx, _) = broadcast::channel(PLAYER_CHANNEL_CAPACITY);
        let (player_list_tx, _) = broadcast::channel(PLAYER_CHANNEL_CAPACITY);

        let mut registry = Self {
            connection,
            players: Arc::new(RwLock::new(HashMap::new())),
            player_added_tx,
            player_list_tx,
            ignored_players: Arc::new(ignored_players),
            monitor_handle: None,
        };

        registry.discover_existing_players().await?;
        registry.monitor_handle = Some(registry.spawn_name_monitoring());

        Ok(registry)
    }

    /// Discover the players currently advertised on the bus.
    ///
    /// Construction runs concurrently across identities; a player that
    /// vanishes mid-discovery is logged and skipped without aborting the
    /// others.
    #[instrument(skip(self))]
    async fn discover_existing_players(&self) -> Result<(), MediaError> {
        info!("Discovering MPRIS players on the bus");
        let dbus_proxy = DBusProxy::new(&self.connection)
            .await
            .map_err(|e| MediaError::InitializationFailed(format!("DBus proxy failed: {e}")))?;

        let names = dbus_proxy
            .list_names()
            .await
            .map_err(|e| MediaError::DbusError(e.into()))?;

        let ids: Vec<PlayerId> = names
            .iter()
            .filter_map(|name| PlayerId::from_bus_name(name.as_str()))
            .filter(|id| !self.should_ignore(&id.bus_name()))
            .collect();

        join_all(ids.into_iter().map(|id| self.add_player(id))).await;

        let count = self.players.read().await.len();
        info!("Initial discovery finished with {count} players");
        Ok(())
    }

    fn spawn_name_monitoring(&self) -> JoinHandle<()> {
        let registry = self.clone();

        tokio::spawn(async move {
            if let Err(e) = registry.monitor_name_owner_changes().await {
                warn!("Player discovery monitoring failed: {e}");
            }
        })
    }

    /// React to bus ownership changes.
    ///
    /// A released owner destroys the identity's instance, a new owner
    /// creates one; a handoff does both, destroy strictly first. The
    /// single consumer loop serializes registry mutations.
    async fn monitor_name_owner_changes(&self) -> Result<(), MediaError> {
        let dbus_proxy = DBusProxy::new(&self.connection)
            .await
            .map_err(|e| MediaError::InitializationFailed(format!("DBus proxy failed: {e}")))?;

        let mut name_owner_changed = dbus_proxy.receive_name_owner_changed().await.map_err(|e| {
            MediaError::InitializationFailed(format!("Signal subscription failed: {e}"))
        })?;

        while let Some(signal) = name_owner_changed.next().await {
            let Ok(args) = signal.args() else { continue };
            let Some(id) = PlayerId::from_bus_name(args.name().as_str()) else {
                continue;
            };

            if args.old_owner().is_some() {
                self.remove_player(&id).await;
            }

            if args.new_owner().is_some() && !self.should_ignore(args.name().as_str()) {
                self.add_player(id).await;
            }
        }

        Ok(())
    }

    /// Construct a player and insert it into the registry.
    ///
    /// Construction failure is expected when a player exits between being
    /// advertised and being resolved; it is logged, never propagated.
    #[instrument(skip(self))]
    async fn add_player(&self, id: PlayerId) {
        match Player::from_id(&self.connection, id.clone()).await {
            Ok(player) => {
                let displaced = {
                    let mut players = self.players.write().await;
                    players.insert(id.clone(), Arc::clone(&player))
                };
                // an unpaired create still leaves at most one live instance
                if let Some(old) = displaced {
                    old.cleanup();
                }

                let _ = self.player_added_tx.send(player);
                self.broadcast_player_list().await;
                info!("Player {id} added");
            }
            Err(e) => {
                warn!("Failed to add player {id}: {e}");
            }
        }
    }

    /// Tear down and remove a player. A no-op when the identity has no
    /// live instance.
    #[instrument(skip(self))]
    async fn remove_player(&self, id: &PlayerId) {
        let removed = { self.players.write().await.remove(id) };

        if let Some(player) = removed {
            player.cleanup();
            self.broadcast_player_list().await;
            info!("Player {id} removed");
        }
    }

    fn should_ignore(&self, bus_name: &str) -> bool {
        self.ignored_players
            .iter()
            .any(|pattern| bus_name.contains(pattern))
    }

    async fn broadcast_player_list(&self) {
        let list: Vec<Arc<Player>> = self.players.read().await.values().cloned().collect();
        let _ = self.player_list_tx.send(list);
    }

    /// Currently tracked players.
    pub async fn players(&self) -> Vec<Arc<Player>> {
        self.players.read().await.values().cloned().collect()
    }

    /// Look up one player by identity.
    pub async fn player(&self, id: &PlayerId) -> Option<Arc<Player>> {
        self.players.read().await.get(id).cloned()
    }

    /// Stream of players as they are discovered.
    pub fn player_added(&self) -> impl Stream<Item = Arc<Player>> + Send + use<> {
        BroadcastStream::new(self.player_added_tx.subscribe())
            .filter_map(|player| async move { player.ok() })
    }

    /// Live view of the player list.
    ///
    /// Yields the current set immediately, then again on every membership
    /// change.
    pub fn players_watch(&self) -> impl Stream<Item = Vec<Arc<Player>>> + Send + use<> {
        let players = Arc::clone(&self.players);
        let mut rx = self.player_list_tx.subscribe();

        stream! {
            let current: Vec<Arc<Player>> = {
                players.read().await.values().cloned().collect()
            };
            yield current;

            while let Ok(list) = rx.recv().await {
                yield list;
            }
        }
    }

    /// Stop monitoring and tear down every player.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
        }

        let players: Vec<Arc<Player>> = {
            let mut map = self.players.write().await;
            map.drain().map(|(_, player)| player).collect()
        };

        for player in players {
            player.cleanup();
        }
    }
}

impl Clone for PlayerRegistry {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            players: Arc::clone(&self.players),
            player_added_tx: self.player_added_tx.clone(),
            player_list_tx: self.player_list_tx.clone(),
            ignored_players: Arc::clone(&self.ignored_players),
            monitor_handle: None,
        }
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::types::PlayerId;

    #[test]
    fn discovery_filters_to_player_names() {
        let names = [
            "org.mpris.MediaPlayer2.spotify",
            "org.freedesktop.DBus",
            "org.mpris.MediaPlayer2.vlc",
            ":1.42",
        ];

        let ids: Vec<String> = names
            .iter()
            .filter_map(|name| PlayerId::from_bus_name(name))
            .map(|id| id.as_str().to_string())
            .collect();

        assert_eq!(ids, vec!["spotify".to_string(), "vlc".to_string()]);
    }
}
