//! Bridging the session clock to an external player.
//!
//! The player is only ever reached through [`PlaybackCapability`]. Commands
//! flow out from clock state; player notifications flow back in as
//! [`PlaybackEvent`]s, filtered through a [`SyncGuard`] so the player's
//! reaction to our own commands is never mistaken for the user.

mod capability;
mod guard;
mod sync;

pub use capability::{
    PlaybackCapability, PlaybackCommand, PlaybackEvent, PlayerCall, RecordingPlayer,
};
pub use guard::{SyncGuard, DEFAULT_ECHO_WINDOW_MS};
pub use sync::{PlaybackSynchronizer, SyncOutcome};
