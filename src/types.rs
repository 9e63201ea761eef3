use std::fmt;

use crate::metadata::TrackMetadata;

/// Well-known prefix carried by every MPRIS player bus name.
pub const MPRIS_BUS_PREFIX: &str = "org.mpris.MediaPlayer2.";

/// Unique identifier for a media player.
///
/// Derived from the player's bus name by stripping the MPRIS prefix, so
/// `org.mpris.MediaPlayer2.spotify` becomes `spotify`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerId(String);

impl PlayerId {
    /// Derive an identity from a bus name.
    ///
    /// Returns `None` for names that do not carry the MPRIS prefix.
    pub fn from_bus_name(bus_name: &str) -> Option<Self> {
        bus_name
            .strip_prefix(MPRIS_BUS_PREFIX)
            .map(|identity| Self(identity.to_string()))
    }

    /// Full bus name this identity was derived from.
    pub fn bus_name(&self) -> String {
        format!("{MPRIS_BUS_PREFIX}{}", self.0)
    }

    /// The identity as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current playback state of a media player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Player is currently playing
    Playing,

    /// Player is paused
    Paused,

    /// Player is stopped
    Stopped,
}

impl From<&str> for PlaybackState {
    fn from(status: &str) -> Self {
        match status {
            "Playing" => Self::Playing,
            "Paused" => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

impl From<PlaybackState> for &'static str {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
            PlaybackState::Stopped => "Stopped",
        }
    }
}

/// Loop setting for track or playlist repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// No looping
    None,

    /// Loop current track
    Track,

    /// Loop entire playlist
    Playlist,
}

impl From<&str> for LoopStatus {
    fn from(status: &str) -> Self {
        match status {
            "Track" => Self::Track,
            "Playlist" => Self::Playlist,
            _ => Self::None,
        }
    }
}

impl From<LoopStatus> for &'static str {
    fn from(status: LoopStatus) -> Self {
        match status {
            LoopStatus::None => "None",
            LoopStatus::Track => "Track",
            LoopStatus::Playlist => "Playlist",
        }
    }
}

/// Typed events emitted by a player as change notifications are reconciled.
///
/// One channel per player; events carry the freshly merged value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Track metadata changed
    MetadataChanged(TrackMetadata),

    /// Playback state changed
    PlaybackStateChanged(PlaybackState),

    /// Loop setting changed
    LoopStatusChanged(LoopStatus),

    /// Shuffle flag changed
    ShuffleChanged(bool),

    /// Playback rate changed
    RateChanged(f64),

    /// Volume changed
    VolumeChanged(f64),

    /// Playback position jumped
    Seeked {
        /// New position in microseconds
        position: i64,
        /// Estimated position immediately before the seek
        previous: i64,
    },

    /// The player left the bus and this instance is inert
    Destroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_strips_mpris_prefix() {
        let id = PlayerId::from_bus_name("org.mpris.MediaPlayer2.spotify");
        assert_eq!(id.map(|id| id.as_str().to_string()), Some("spotify".to_string()));
    }

    #[test]
    fn identity_rejects_foreign_names() {
        assert_eq!(PlayerId::from_bus_name("org.freedesktop.Notifications"), None);
        assert_eq!(PlayerId::from_bus_name(""), None);
    }

    #[test]
    fn bus_name_round_trips() {
        let id = PlayerId::from_bus_name("org.mpris.MediaPlayer2.vlc");
        assert_eq!(
            id.map(|id| id.bus_name()),
            Some("org.mpris.MediaPlayer2.vlc".to_string())
        );
    }

    #[test]
    fn playback_state_parses_known_statuses() {
        assert_eq!(PlaybackState::from("Playing"), PlaybackState::Playing);
        assert_eq!(PlaybackState::from("Paused"), PlaybackState::Paused);
        assert_eq!(PlaybackState::from("Stopped"), PlaybackState::Stopped);
        assert_eq!(PlaybackState::from("garbage"), PlaybackState::Stopped);
    }

    #[test]
    fn loop_status_parses_known_statuses() {
        assert_eq!(LoopStatus::from("None"), LoopStatus::None);
        assert_eq!(LoopStatus::from("Track"), LoopStatus::Track);
        assert_eq!(LoopStatus::from("Playlist"), LoopStatus::Playlist);
        assert_eq!(LoopStatus::from("garbage"), LoopStatus::None);
    }
}
