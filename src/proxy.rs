#![allow(missing_docs)]

use std::collections::HashMap;

use zbus::{Result, proxy, zvariant::ObjectPath};

/// Object path shared by every MPRIS player.
pub(crate) const MPRIS_OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

/// Name of the playback-control interface.
pub(crate) const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Proxy for the base `org.mpris.MediaPlayer2` interface.
///
/// Carries the application-level surface of a player: its identity and the
/// ability to raise or quit it.
#[proxy(
    interface = "org.mpris.MediaPlayer2",
    default_service = "org.mpris.MediaPlayer2",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait MediaPlayer2 {
    /// Ask the player application to exit
    fn quit(&self) -> Result<()>;

    /// Bring the player window to the foreground
    fn raise(&self) -> Result<()>;

    /// Whether the player accepts Quit
    #[zbus(property)]
    fn can_quit(&self) -> Result<bool>;

    /// Whether the player accepts Raise
    #[zbus(property)]
    fn can_raise(&self) -> Result<bool>;

    /// Human-readable name of the player application
    #[zbus(property)]
    fn identity(&self) -> Result<String>;

    /// Desktop entry name, without the `.desktop` suffix
    #[zbus(property)]
    fn desktop_entry(&self) -> Result<String>;
}

/// Proxy for the `org.mpris.MediaPlayer2.Player` interface.
///
/// The playback-control surface: transport methods, the `Seeked` signal and
/// the property set the snapshot reconciles.
#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_service = "org.mpris.MediaPlayer2",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait MediaPlayer2Player {
    /// Start playback
    fn play(&self) -> Result<()>;

    /// Pause playback
    fn pause(&self) -> Result<()>;

    /// Toggle between playing and paused
    fn play_pause(&self) -> Result<()>;

    /// Stop playback
    fn stop(&self) -> Result<()>;

    /// Skip to the next track
    fn next(&self) -> Result<()>;

    /// Skip to the previous track
    fn previous(&self) -> Result<()>;

    /// Seek forward or backward by an offset in microseconds
    fn seek(&self, offset: i64) -> Result<()>;

    /// Jump to an absolute position on the given track, in microseconds
    fn set_position(&self, track_id: &ObjectPath<'_>, position: i64) -> Result<()>;

    /// Open and play a URI
    fn open_uri(&self, uri: &str) -> Result<()>;

    /// Emitted when the playback position jumps discontinuously
    #[zbus(signal)]
    fn seeked(&self, position: i64) -> Result<()>;

    /// Current playback status (Playing, Paused, Stopped)
    #[zbus(property)]
    fn playback_status(&self) -> Result<String>;

    /// Current loop setting (None, Track, Playlist)
    #[zbus(property)]
    fn loop_status(&self) -> Result<String>;

    /// Change the loop setting
    #[zbus(property)]
    fn set_loop_status(&self, status: &str) -> Result<()>;

    /// Playback rate, 1.0 being normal speed
    #[zbus(property)]
    fn rate(&self) -> Result<f64>;

    /// Change the playback rate
    #[zbus(property)]
    fn set_rate(&self, rate: f64) -> Result<()>;

    /// Whether shuffle is enabled
    #[zbus(property)]
    fn shuffle(&self) -> Result<bool>;

    /// Toggle shuffle
    #[zbus(property)]
    fn set_shuffle(&self, shuffle: bool) -> Result<()>;

    /// Metadata of the current track
    #[zbus(property)]
    fn metadata(&self) -> Result<HashMap<String, zbus::zvariant::OwnedValue>>;

    /// Volume level
    #[zbus(property)]
    fn volume(&self) -> Result<f64>;

    /// Change the volume level
    #[zbus(property)]
    fn set_volume(&self, volume: f64) -> Result<()>;

    /// Playback position in microseconds, as of the last change event
    #[zbus(property)]
    fn position(&self) -> Result<i64>;

    /// Slowest rate the player supports
    #[zbus(property)]
    fn minimum_rate(&self) -> Result<f64>;

    /// Fastest rate the player supports
    #[zbus(property)]
    fn maximum_rate(&self) -> Result<f64>;

    /// Whether a next track exists
    #[zbus(property)]
    fn can_go_next(&self) -> Result<bool>;

    /// Whether a previous track exists
    #[zbus(property)]
    fn can_go_previous(&self) -> Result<bool>;

    /// Whether playback can be started
    #[zbus(property)]
    fn can_play(&self) -> Result<bool>;

    /// Whether playback can be paused
    #[zbus(property)]
    fn can_pause(&self) -> Result<bool>;

    /// Whether seeking is supported
    #[zbus(property)]
    fn can_seek(&self) -> Result<bool>;

    /// Whether the player accepts control commands at all
    #[zbus(property)]
    fn can_control(&self) -> Result<bool>;
}
