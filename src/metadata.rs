use std::collections::HashMap;

use crate::variant::PlainValue;

/// Track id players report when nothing is loaded.
pub const NO_TRACK: &str = "/org/mpris/MediaPlayer2/TrackList/NoTrack";

/// Metadata for the current track.
///
/// MPRIS metadata is an open-ended mapping: `mpris:trackid` is the only
/// mandatory key, everything else is optional and players are free to add
/// their own. The raw entries stay accessible through [`TrackMetadata::get`]
/// while the well-known keys get typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    entries: HashMap<String, PlainValue>,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "mpris:trackid".to_string(),
            PlainValue::Text(NO_TRACK.to_string()),
        );
        Self { entries }
    }
}

impl TrackMetadata {
    pub(crate) fn from_entries(entries: HashMap<String, PlainValue>) -> Self {
        Self { entries }
    }

    /// Track id; the no-track sentinel when the player reported none.
    pub fn track_id(&self) -> &str {
        self.text("mpris:trackid").unwrap_or(NO_TRACK)
    }

    /// Whether an actual track is loaded.
    pub fn has_track(&self) -> bool {
        self.track_id() != NO_TRACK
    }

    /// Track title.
    pub fn title(&self) -> Option<&str> {
        self.text("xesam:title")
    }

    /// Album name.
    pub fn album(&self) -> Option<&str> {
        self.text("xesam:album")
    }

    /// Track artists. Tolerates players that report a bare string
    /// instead of a list.
    pub fn artists(&self) -> Vec<String> {
        self.text_list("xesam:artist")
    }

    /// Album artists.
    pub fn album_artists(&self) -> Vec<String> {
        self.text_list("xesam:albumArtist")
    }

    /// Position of the track within its album.
    pub fn track_number(&self) -> Option<i64> {
        self.int("xesam:trackNumber")
    }

    /// Track length in microseconds.
    pub fn length_micros(&self) -> Option<i64> {
        self.int("mpris:length")
    }

    /// Artwork URL.
    pub fn art_url(&self) -> Option<&str> {
        self.text("mpris:artUrl")
    }

    /// Location of the media file or stream.
    pub fn url(&self) -> Option<&str> {
        self.text("xesam:url")
    }

    /// Raw access to any metadata entry, well-known or player-specific.
    pub fn get(&self, key: &str) -> Option<&PlainValue> {
        self.entries.get(key)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(PlainValue::as_str)
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(PlainValue::as_i64)
    }

    fn text_list(&self, key: &str) -> Vec<String> {
        self.entries
            .get(key)
            .and_then(PlainValue::as_text_list)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrackMetadata {
        let mut entries = HashMap::new();
        entries.insert(
            "mpris:trackid".to_string(),
            PlainValue::Text("/org/mpris/MediaPlayer2/Track/7".to_string()),
        );
        entries.insert(
            "xesam:title".to_string(),
            PlainValue::Text("Paranoid Android".to_string()),
        );
        entries.insert(
            "xesam:artist".to_string(),
            PlainValue::List(vec![PlainValue::Text("Radiohead".to_string())]),
        );
        entries.insert("mpris:length".to_string(), PlainValue::Int(386_000_000));
        entries.insert("xesam:trackNumber".to_string(), PlainValue::Int(2));
        TrackMetadata::from_entries(entries)
    }

    #[test]
    fn default_metadata_carries_no_track_sentinel() {
        let metadata = TrackMetadata::default();
        assert_eq!(metadata.track_id(), NO_TRACK);
        assert!(!metadata.has_track());
        assert_eq!(metadata.title(), None);
        assert!(metadata.artists().is_empty());
    }

    #[test]
    fn well_known_keys_have_typed_accessors() {
        let metadata = sample();
        assert!(metadata.has_track());
        assert_eq!(metadata.title(), Some("Paranoid Android"));
        assert_eq!(metadata.artists(), vec!["Radiohead".to_string()]);
        assert_eq!(metadata.length_micros(), Some(386_000_000));
        assert_eq!(metadata.track_number(), Some(2));
        assert_eq!(metadata.album(), None);
    }

    #[test]
    fn unknown_keys_stay_reachable() {
        let mut entries = HashMap::new();
        entries.insert(
            "spotify:popularity".to_string(),
            PlainValue::Int(83),
        );
        let metadata = TrackMetadata::from_entries(entries);
        assert_eq!(
            metadata.get("spotify:popularity"),
            Some(&PlainValue::Int(83))
        );
    }
}
