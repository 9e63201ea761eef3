use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::broadcast;

use super::position::PositionTracker;
use crate::metadata::TrackMetadata;
use crate::types::{LoopStatus, PlaybackState, PlayerEvent};
use crate::variant::PlainValue;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Locally cached copy of a player's reported state.
///
/// Fields default to the values a player that has never reported anything
/// is assumed to have: stopped, normal rate, full volume, no track, no
/// capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySnapshot {
    /// Current playback status
    pub playback_status: PlaybackState,

    /// Loop setting, if the player has ever reported one
    pub loop_status: Option<LoopStatus>,

    /// Playback rate, 1.0 being normal speed
    pub rate: f64,

    /// Shuffle flag, if the player has ever reported one
    pub shuffle: Option<bool>,

    /// Metadata of the current track
    pub metadata: TrackMetadata,

    /// Volume level
    pub volume: f64,

    /// Position in microseconds, accurate only as of the last update
    pub position: i64,

    /// Slowest supported playback rate
    pub minimum_rate: f64,

    /// Fastest supported playback rate
    pub maximum_rate: f64,

    /// Whether a next track exists
    pub can_go_next: bool,

    /// Whether a previous track exists
    pub can_go_previous: bool,

    /// Whether playback can be started
    pub can_play: bool,

    /// Whether playback can be paused
    pub can_pause: bool,

    /// Whether seeking is supported
    pub can_seek: bool,

    /// Whether the player accepts control commands at all
    pub can_control: bool,
}

impl Default for PropertySnapshot {
    fn default() -> Self {
        Self {
            playback_status: PlaybackState::Stopped,
            loop_status: None,
            rate: 1.0,
            shuffle: None,
            metadata: TrackMetadata::default(),
            volume: 1.0,
            position: 0,
            minimum_rate: 1.0,
            maximum_rate: 1.0,
            can_go_next: false,
            can_go_previous: false,
            can_play: false,
            can_pause: false,
            can_seek: false,
            can_control: false,
        }
    }
}

impl PropertySnapshot {
    /// Merge one decoded property over the snapshot.
    ///
    /// Unknown names and values of the wrong shape are ignored; fields not
    /// mentioned keep their prior value.
    fn apply(&mut self, name: &str, value: &PlainValue) {
        match name {
            "PlaybackStatus" => {
                if let Some(status) = value.as_str() {
                    self.playback_status = PlaybackState::from(status);
                }
            }
            "LoopStatus" => {
                if let Some(status) = value.as_str() {
                    self.loop_status = Some(LoopStatus::from(status));
                }
            }
            "Rate" => {
                if let Some(rate) = value.as_f64() {
                    self.rate = rate;
                }
            }
            "Shuffle" => {
                if let Some(shuffle) = value.as_bool() {
                    self.shuffle = Some(shuffle);
                }
            }
            "Metadata" => {
                if let PlainValue::Map(entries) = value {
                    self.metadata = TrackMetadata::from_entries(entries.clone());
                }
            }
            "Volume" => {
                if let Some(volume) = value.as_f64() {
                    self.volume = volume;
                }
            }
            "Position" => {
                if let Some(position) = value.as_i64() {
                    self.position = position;
                }
            }
            "MinimumRate" => {
                if let Some(rate) = value.as_f64() {
                    self.minimum_rate = rate;
                }
            }
            "MaximumRate" => {
                if let Some(rate) = value.as_f64() {
                    self.maximum_rate = rate;
                }
            }
            "CanGoNext" => {
                if let Some(can) = value.as_bool() {
                    self.can_go_next = can;
                }
            }
            "CanGoPrevious" => {
                if let Some(can) = value.as_bool() {
                    self.can_go_previous = can;
                }
            }
            "CanPlay" => {
                if let Some(can) = value.as_bool() {
                    self.can_play = can;
                }
            }
            "CanPause" => {
                if let Some(can) = value.as_bool() {
                    self.can_pause = can;
                }
            }
            "CanSeek" => {
                if let Some(can) = value.as_bool() {
                    self.can_seek = can;
                }
            }
            "CanControl" => {
                if let Some(can) = value.as_bool() {
                    self.can_control = can;
                }
            }
            _ => {}
        }
    }

    /// Event mapped to a changed field, carrying the merged value.
    ///
    /// Capability flags and the rate bounds have no mapping and update the
    /// snapshot silently.
    fn event_for(&self, name: &str) -> Option<PlayerEvent> {
        match name {
            "Metadata" => Some(PlayerEvent::MetadataChanged(self.metadata.clone())),
            "PlaybackStatus" => Some(PlayerEvent::PlaybackStateChanged(self.playback_status)),
            "LoopStatus" => Some(PlayerEvent::LoopStatusChanged(
                self.loop_status.unwrap_or(LoopStatus::None),
            )),
            "Shuffle" => Some(PlayerEvent::ShuffleChanged(self.shuffle.unwrap_or(false))),
            "Rate" => Some(PlayerEvent::RateChanged(self.rate)),
            "Volume" => Some(PlayerEvent::VolumeChanged(self.volume)),
            _ => None,
        }
    }
}

/// Reconciliation state for one player.
///
/// Owns the property snapshot, the position baseline and the event
/// channel. Holds no transport handles, so the full reconciliation logic
/// is exercisable without a bus.
///
/// The closed flag makes the tracker inert: once
/// [`close`](Self::close) has run, notifications that were already in
/// flight when the player was torn down mutate nothing and emit nothing.
#[derive(Debug)]
pub(crate) struct PlayerStateTracker {
    snapshot: RwLock<PropertySnapshot>,
    position: Mutex<PositionTracker>,
    events_tx: broadcast::Sender<PlayerEvent>,
    closed: AtomicBool,
}

impl PlayerStateTracker {
    pub(crate) fn new(now: Instant) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            snapshot: RwLock::new(PropertySnapshot::default()),
            position: Mutex::new(PositionTracker::new(now)),
            events_tx,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events_tx.subscribe()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Read the snapshot under the lock.
    pub(crate) fn with_snapshot<T>(&self, read: impl FnOnce(&PropertySnapshot) -> T) -> T {
        read(&read_lock(&self.snapshot))
    }

    /// Seed the snapshot and position baseline from the initial full
    /// property fetch. No events fire for the initial values.
    pub(crate) fn seed(&self, entries: &[(String, PlainValue)], now: Instant) {
        let mut snapshot = write_lock(&self.snapshot);
        for (name, value) in entries {
            snapshot.apply(name, value);
        }
        lock(&self.position).reset(snapshot.position, now);
    }

    /// First half of a change-payload reconciliation: merge the decoded
    /// entries over the snapshot. Fresh values win, unmentioned fields
    /// keep their prior value. No events fire yet.
    pub(crate) fn merge_changed(&self, entries: &[(String, PlainValue)]) {
        if self.is_closed() {
            return;
        }
        let mut snapshot = write_lock(&self.snapshot);
        for (name, value) in entries {
            snapshot.apply(name, value);
        }
    }

    /// Second half of a change-payload reconciliation, run once the
    /// position re-fetch succeeded: move the baseline, then emit the
    /// mapped event for every changed field in payload order.
    ///
    /// When the re-fetch fails this is never called, suppressing emission
    /// for the whole cycle rather than emitting against a stale baseline.
    pub(crate) fn finish_changed(
        &self,
        entries: &[(String, PlainValue)],
        position_micros: i64,
        now: Instant,
    ) {
        if self.is_closed() {
            return;
        }

        let events: Vec<PlayerEvent> = {
            let mut snapshot = write_lock(&self.snapshot);
            snapshot.position = position_micros;
            lock(&self.position).reset(position_micros, now);

            entries
                .iter()
                .filter_map(|(name, _)| snapshot.event_for(name))
                .collect()
        };

        for event in events {
            let _ = self.events_tx.send(event);
        }
    }

    /// Apply a seek notification: capture the pre-seek estimate, move the
    /// baseline, then emit. The capture must happen first so the event
    /// reports genuine pre-seek playback state.
    pub(crate) fn apply_seeked(&self, position_micros: i64, now: Instant) {
        if self.is_closed() {
            return;
        }

        let previous = self.position_at(now);
        {
            let mut snapshot = write_lock(&self.snapshot);
            snapshot.position = position_micros;
            lock(&self.position).reset(position_micros, now);
        }

        let _ = self.events_tx.send(PlayerEvent::Seeked {
            position: position_micros,
            previous,
        });
    }

    /// Position estimate at `now`, in microseconds.
    pub(crate) fn position_at(&self, now: Instant) -> i64 {
        let (state, rate) = self.with_snapshot(|snapshot| (snapshot.playback_status, snapshot.rate));
        lock(&self.position).position_at(now, state, rate)
    }

    /// Commit an optimistic write after the remote set succeeded.
    pub(crate) fn commit(&self, write: impl FnOnce(&mut PropertySnapshot)) {
        if self.is_closed() {
            return;
        }
        write(&mut write_lock(&self.snapshot));
    }

    /// Mark the tracker inert and emit the destroyed event.
    ///
    /// Only the first call emits; every later call is a no-op.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.events_tx.send(PlayerEvent::Destroyed);
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn changed(entries: &[(&str, PlainValue)]) -> Vec<(String, PlainValue)> {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    fn drain(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn volume_only_payload_emits_exactly_one_event() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        let before = tracker.with_snapshot(Clone::clone);
        let mut rx = tracker.subscribe();

        let payload = changed(&[("Volume", PlainValue::Float(0.5))]);
        tracker.merge_changed(&payload);
        tracker.finish_changed(&payload, 0, now);

        assert_eq!(drain(&mut rx), vec![PlayerEvent::VolumeChanged(0.5)]);

        let after = tracker.with_snapshot(Clone::clone);
        assert_eq!(after.volume, 0.5);
        assert_eq!(
            PropertySnapshot {
                volume: before.volume,
                ..after
            },
            before
        );
    }

    #[test]
    fn fresh_values_win_over_the_stale_snapshot() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        tracker.seed(&changed(&[("Volume", PlainValue::Float(1.0))]), now);

        let payload = changed(&[("Volume", PlainValue::Float(0.25))]);
        tracker.merge_changed(&payload);

        assert_eq!(tracker.with_snapshot(|s| s.volume), 0.25);
    }

    #[test]
    fn unmapped_fields_update_silently() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        let mut rx = tracker.subscribe();

        let payload = changed(&[
            ("CanSeek", PlainValue::Bool(true)),
            ("MaximumRate", PlainValue::Float(2.0)),
        ]);
        tracker.merge_changed(&payload);
        tracker.finish_changed(&payload, 0, now);

        assert!(drain(&mut rx).is_empty());
        assert!(tracker.with_snapshot(|s| s.can_seek));
        assert_eq!(tracker.with_snapshot(|s| s.maximum_rate), 2.0);
    }

    #[test]
    fn merge_without_finish_emits_nothing() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        let mut rx = tracker.subscribe();

        // position re-fetch failed, so the cycle never finishes
        tracker.merge_changed(&changed(&[("Volume", PlainValue::Float(0.7))]));

        assert!(drain(&mut rx).is_empty());
        assert_eq!(tracker.with_snapshot(|s| s.volume), 0.7);
    }

    #[test]
    fn seeked_reports_new_then_previous_position() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        tracker.seed(&changed(&[("Position", PlainValue::Int(5_000_000))]), now);
        let mut rx = tracker.subscribe();

        tracker.apply_seeked(9_000_000, now);

        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent::Seeked {
                position: 9_000_000,
                previous: 5_000_000,
            }]
        );
        assert_eq!(tracker.position_at(now), 9_000_000);
    }

    #[test]
    fn seeked_while_playing_captures_the_extrapolated_estimate() {
        let t0 = Instant::now();
        let tracker = PlayerStateTracker::new(t0);
        tracker.seed(
            &changed(&[
                ("PlaybackStatus", PlainValue::Text("Playing".to_string())),
                ("Position", PlainValue::Int(4_000_000)),
            ]),
            t0,
        );
        let mut rx = tracker.subscribe();

        let t1 = t0 + Duration::from_secs(1);
        tracker.apply_seeked(9_000_000, t1);

        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent::Seeked {
                position: 9_000_000,
                previous: 5_000_000,
            }]
        );
    }

    #[test]
    fn close_emits_destroyed_once() {
        let tracker = PlayerStateTracker::new(Instant::now());
        let mut rx = tracker.subscribe();

        tracker.close();
        tracker.close();

        assert_eq!(drain(&mut rx), vec![PlayerEvent::Destroyed]);
    }

    #[test]
    fn closed_tracker_is_inert() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        let mut rx = tracker.subscribe();
        tracker.close();
        drain(&mut rx);

        let payload = changed(&[("Volume", PlainValue::Float(0.1))]);
        tracker.merge_changed(&payload);
        tracker.finish_changed(&payload, 7_000_000, now);
        tracker.apply_seeked(3_000_000, now);
        tracker.commit(|s| s.volume = 0.9);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(tracker.with_snapshot(|s| s.volume), 1.0);
        assert_eq!(tracker.position_at(now), 0);
    }

    #[test]
    fn payload_order_drives_emission_order() {
        let now = Instant::now();
        let tracker = PlayerStateTracker::new(now);
        let mut rx = tracker.subscribe();

        let payload = changed(&[
            ("Rate", PlainValue::Float(1.5)),
            ("PlaybackStatus", PlainValue::Text("Playing".to_string())),
        ]);
        tracker.merge_changed(&payload);
        tracker.finish_changed(&payload, 0, now);

        assert_eq!(
            drain(&mut rx),
            vec![
                PlayerEvent::RateChanged(1.5),
                PlayerEvent::PlaybackStateChanged(PlaybackState::Playing),
            ]
        );
    }

    #[test]
    fn playback_starts_then_position_extrapolates() {
        let t0 = Instant::now();
        let tracker = PlayerStateTracker::new(t0);
        tracker.seed(&[], t0);

        assert_eq!(tracker.with_snapshot(|s| s.playback_status), PlaybackState::Stopped);
        assert_eq!(tracker.position_at(t0), 0);

        let mut rx = tracker.subscribe();
        let payload = changed(&[("PlaybackStatus", PlainValue::Text("Playing".to_string()))]);
        tracker.merge_changed(&payload);
        tracker.finish_changed(&payload, 1_230_000, t0);

        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent::PlaybackStateChanged(PlaybackState::Playing)]
        );

        let t1 = t0 + Duration::from_millis(2_000);
        assert_eq!(tracker.position_at(t1), 3_230_000);
    }
}
