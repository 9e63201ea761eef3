//! Cadenza - reactive MPRIS media player tracking over D-Bus.
//!
//! Cadenza discovers the media players advertising the MPRIS interface on
//! the session bus and keeps a live, locally-queryable snapshot of each
//! one: playback status, track metadata, volume, rate and a playback
//! position that extrapolates between the discrete updates the bus
//! delivers. Partial change notifications are reconciled into the
//! snapshot and re-emitted as typed per-player events.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cadenza::PlayerRegistry;
//!
//! # async fn run() -> Result<(), cadenza::MediaError> {
//! let registry = PlayerRegistry::connect(Vec::new()).await?;
//!
//! for player in registry.players().await {
//!     println!("{}: {} µs", player.identity(), player.position());
//! }
//! # Ok(())
//! # }
//! ```

/// Media operation error types.
pub mod error;
/// Track metadata map and typed accessors.
pub mod metadata;
/// Per-player state, reconciliation and control.
pub mod player;
/// D-Bus proxy trait definitions.
pub mod proxy;
/// Player discovery and lifecycle management.
pub mod registry;
/// Tracing subscriber initialization.
pub mod tracing_config;
/// Player identity, state enums and event types.
pub mod types;
/// Variant decoding into plain values.
pub mod variant;

pub use error::MediaError;
pub use metadata::{NO_TRACK, TrackMetadata};
pub use player::{Player, PropertySnapshot};
pub use registry::PlayerRegistry;
pub use types::{LoopStatus, MPRIS_BUS_PREFIX, PlaybackState, PlayerEvent, PlayerId};
pub use variant::PlainValue;
