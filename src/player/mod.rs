pub(crate) mod monitoring;
pub(crate) mod position;
pub(crate) mod state;

pub use state::PropertySnapshot;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::instrument;
use zbus::names::InterfaceName;
use zbus::zvariant::ObjectPath;
use zbus::{Connection, fdo::PropertiesProxy};

use crate::error::MediaError;
use crate::metadata::TrackMetadata;
use crate::proxy::{
    MPRIS_OBJECT_PATH, MediaPlayer2PlayerProxy, MediaPlayer2Proxy, PLAYER_INTERFACE,
};
use crate::types::{LoopStatus, PlaybackState, PlayerEvent, PlayerId};
use crate::variant::{self, PlainValue};

use monitoring::PlayerMonitor;
use state::PlayerStateTracker;

/// Live view of one MPRIS player.
///
/// Holds the player's proxy handles and its reconciled property snapshot.
/// The snapshot is kept current by a per-player monitoring task; read
/// accessors are synchronous and return the latest reconciled value.
/// Instances are created and destroyed by the
/// [`PlayerRegistry`](crate::registry::PlayerRegistry) and are never
/// reused after teardown.
#[derive(Debug)]
pub struct Player {
    /// Unique identifier for this player
    pub id: PlayerId,

    identity: String,
    desktop_entry: Option<String>,
    media_proxy: MediaPlayer2Proxy<'static>,
    player_proxy: MediaPlayer2PlayerProxy<'static>,
    properties_proxy: PropertiesProxy<'static>,
    player_interface: InterfaceName<'static>,
    state: PlayerStateTracker,
    monitor: Mutex<Option<PlayerMonitor>>,
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Player {
    /// Resolve the player's proxy handles, perform the initial full
    /// property fetch and start monitoring.
    ///
    /// The fetch completes before this returns, so callers never observe
    /// default values when real ones are obtainable.
    #[instrument(skip(connection))]
    pub(crate) async fn from_id(
        connection: &Connection,
        id: PlayerId,
    ) -> Result<Arc<Self>, MediaError> {
        let bus_name = id.bus_name();

        let media_proxy = MediaPlayer2Proxy::builder(connection)
            .destination(bus_name.clone())?
            .build()
            .await?;

        let player_proxy = MediaPlayer2PlayerProxy::builder(connection)
            .destination(bus_name.clone())?
            .build()
            .await?;

        let properties_proxy = PropertiesProxy::builder(connection)
            .destination(bus_name)?
            .path(MPRIS_OBJECT_PATH)?
            .build()
            .await?;

        let player_interface = InterfaceName::try_from(PLAYER_INTERFACE)
            .map_err(|e| MediaError::InitializationFailed(format!("invalid interface name: {e}")))?;

        let identity = media_proxy
            .identity()
            .await
            .unwrap_or_else(|_| id.to_string());
        let desktop_entry = media_proxy.desktop_entry().await.ok();

        let player = Arc::new(Self {
            id,
            identity,
            desktop_entry,
            media_proxy,
            player_proxy,
            properties_proxy,
            player_interface,
            state: PlayerStateTracker::new(Instant::now()),
            monitor: Mutex::new(None),
        });

        player.fetch_all_properties().await?;

        let monitor = PlayerMonitor::start(Arc::clone(&player));
        *player
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(monitor);

        Ok(player)
    }

    /// Fetch the full player property set and seed the snapshot.
    async fn fetch_all_properties(&self) -> Result<(), MediaError> {
        let properties = self
            .properties_proxy
            .get_all(self.player_interface.clone())
            .await
            .map_err(|e| MediaError::PropertyFetchFailed {
                property: "all properties".to_string(),
                source: e.into(),
            })?;

        let entries: Vec<(String, PlainValue)> = properties
            .iter()
            .filter_map(|(name, value)| variant::plain(value).map(|plain| (name.clone(), plain)))
            .collect();

        self.state.seed(&entries, Instant::now());
        Ok(())
    }

    /// Fresh read of the Position property, bypassing the local snapshot.
    pub(crate) async fn fetch_position(&self) -> Result<i64, MediaError> {
        let value = self
            .properties_proxy
            .get(self.player_interface.clone(), "Position")
            .await
            .map_err(|e| MediaError::PropertyFetchFailed {
                property: "Position".to_string(),
                source: e.into(),
            })?;

        i64::try_from(&value).map_err(|e| MediaError::PropertyFetchFailed {
            property: "Position".to_string(),
            source: e.into(),
        })
    }

    /// Human-readable name of the player application.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Desktop entry name, if the player reports one.
    pub fn desktop_entry(&self) -> Option<&str> {
        self.desktop_entry.as_deref()
    }

    /// Current playback status.
    pub fn playback_status(&self) -> PlaybackState {
        self.state.with_snapshot(|s| s.playback_status)
    }

    /// Loop setting; `LoopStatus::None` when the player never reported one.
    pub fn loop_status(&self) -> LoopStatus {
        self.state
            .with_snapshot(|s| s.loop_status.unwrap_or(LoopStatus::None))
    }

    /// Playback rate, 1.0 being normal speed.
    pub fn rate(&self) -> f64 {
        self.state.with_snapshot(|s| s.rate)
    }

    /// Shuffle flag; `false` when the player never reported one.
    pub fn shuffle(&self) -> bool {
        self.state.with_snapshot(|s| s.shuffle.unwrap_or(false))
    }

    /// Metadata of the current track.
    pub fn metadata(&self) -> TrackMetadata {
        self.state.with_snapshot(|s| s.metadata.clone())
    }

    /// Volume level.
    pub fn volume(&self) -> f64 {
        self.state.with_snapshot(|s| s.volume)
    }

    /// Playback position estimate in microseconds.
    ///
    /// The bus only reports position on discrete change events. While the
    /// player is playing this extrapolates from the last reported value
    /// using elapsed wall-clock time and the playback rate; while paused
    /// or stopped it returns the raw value unchanged.
    pub fn position(&self) -> i64 {
        self.state.position_at(Instant::now())
    }

    /// Position estimate at a caller-chosen instant.
    pub fn position_at(&self, now: Instant) -> i64 {
        self.state.position_at(now)
    }

    /// Slowest supported playback rate.
    pub fn minimum_rate(&self) -> f64 {
        self.state.with_snapshot(|s| s.minimum_rate)
    }

    /// Fastest supported playback rate.
    pub fn maximum_rate(&self) -> f64 {
        self.state.with_snapshot(|s| s.maximum_rate)
    }

    /// Whether a next track exists.
    pub fn can_go_next(&self) -> bool {
        self.state.with_snapshot(|s| s.can_go_next)
    }

    /// Whether a previous track exists.
    pub fn can_go_previous(&self) -> bool {
        self.state.with_snapshot(|s| s.can_go_previous)
    }

    /// Whether playback can be started.
    pub fn can_play(&self) -> bool {
        self.state.with_snapshot(|s| s.can_play)
    }

    /// Whether playback can be paused.
    pub fn can_pause(&self) -> bool {
        self.state.with_snapshot(|s| s.can_pause)
    }

    /// Whether seeking is supported.
    pub fn can_seek(&self) -> bool {
        self.state.with_snapshot(|s| s.can_seek)
    }

    /// Whether the player accepts control commands at all.
    pub fn can_control(&self) -> bool {
        self.state.with_snapshot(|s| s.can_control)
    }

    /// Clone of the full property snapshot.
    pub fn snapshot(&self) -> PropertySnapshot {
        self.state.with_snapshot(Clone::clone)
    }

    /// Subscribe to this player's typed events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.state.subscribe()
    }

    /// This player's typed events as a stream.
    pub fn events(&self) -> impl Stream<Item = PlayerEvent> + Send + use<> {
        BroadcastStream::new(self.subscribe()).filter_map(|event| async move { event.ok() })
    }

    /// Set the volume.
    ///
    /// The local snapshot is committed only once the remote write
    /// succeeds; players are not obligated to echo programmatic writes
    /// back as change notifications.
    ///
    /// # Errors
    /// Returns the D-Bus fault if the write is rejected; the snapshot is
    /// left unchanged in that case.
    pub async fn set_volume(&self, volume: f64) -> Result<(), MediaError> {
        self.player_proxy.set_volume(volume).await?;
        self.state.commit(|s| s.volume = volume);
        Ok(())
    }

    /// Set the playback rate.
    ///
    /// # Errors
    /// Returns the D-Bus fault if the write is rejected; the snapshot is
    /// left unchanged in that case.
    pub async fn set_rate(&self, rate: f64) -> Result<(), MediaError> {
        self.player_proxy.set_rate(rate).await?;
        self.state.commit(|s| s.rate = rate);
        Ok(())
    }

    /// Set the loop status.
    ///
    /// # Errors
    /// Returns the D-Bus fault if the write is rejected; the snapshot is
    /// left unchanged in that case.
    pub async fn set_loop_status(&self, status: LoopStatus) -> Result<(), MediaError> {
        self.player_proxy.set_loop_status(status.into()).await?;
        self.state.commit(|s| s.loop_status = Some(status));
        Ok(())
    }

    /// Set the shuffle flag.
    ///
    /// # Errors
    /// Returns the D-Bus fault if the write is rejected; the snapshot is
    /// left unchanged in that case.
    pub async fn set_shuffle(&self, shuffle: bool) -> Result<(), MediaError> {
        self.player_proxy.set_shuffle(shuffle).await?;
        self.state.commit(|s| s.shuffle = Some(shuffle));
        Ok(())
    }

    /// Skip to the next track.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn next(&self) -> Result<(), MediaError> {
        self.player_proxy.next().await?;
        Ok(())
    }

    /// Skip to the previous track.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn previous(&self) -> Result<(), MediaError> {
        self.player_proxy.previous().await?;
        Ok(())
    }

    /// Start playback.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn play(&self) -> Result<(), MediaError> {
        self.player_proxy.play().await?;
        Ok(())
    }

    /// Pause playback.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn pause(&self) -> Result<(), MediaError> {
        self.player_proxy.pause().await?;
        Ok(())
    }

    /// Toggle between playing and paused.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn play_pause(&self) -> Result<(), MediaError> {
        self.player_proxy.play_pause().await?;
        Ok(())
    }

    /// Stop playback.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn stop(&self) -> Result<(), MediaError> {
        self.player_proxy.stop().await?;
        Ok(())
    }

    /// Seek by a relative offset in microseconds. Negative offsets seek
    /// backward.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn seek(&self, offset_micros: i64) -> Result<(), MediaError> {
        self.player_proxy.seek(offset_micros).await?;
        Ok(())
    }

    /// Jump to an absolute position on the given track, in microseconds.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the track id is not a valid
    /// object path or the call fails.
    pub async fn set_position(
        &self,
        track_id: &str,
        position_micros: i64,
    ) -> Result<(), MediaError> {
        let track_path =
            ObjectPath::try_from(track_id).map_err(|e| MediaError::DbusError(e.into()))?;
        self.player_proxy
            .set_position(&track_path, position_micros)
            .await?;
        Ok(())
    }

    /// Open and play a URI.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn open_uri(&self, uri: &str) -> Result<(), MediaError> {
        self.player_proxy.open_uri(uri).await?;
        Ok(())
    }

    /// Bring the player window to the foreground.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn raise(&self) -> Result<(), MediaError> {
        self.media_proxy.raise().await?;
        Ok(())
    }

    /// Ask the player application to exit.
    ///
    /// # Errors
    /// Returns `MediaError::DbusError` if the call fails.
    pub async fn quit(&self) -> Result<(), MediaError> {
        self.media_proxy.quit().await?;
        Ok(())
    }

    /// Tear this instance down: emit the destroyed event, mark the state
    /// inert and stop the monitoring task.
    ///
    /// Called by the registry when the player's bus name is released;
    /// calling it again is a no-op.
    pub(crate) fn cleanup(&self) {
        self.state.close();
        drop(
            self.monitor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
    }
}
