//! # loopfocus Core Library
//!
//! Core logic for loopfocus, a work/break interval timer that keeps a looping
//! background video in step with the session: the video plays while work
//! time is running and pauses otherwise. Pausing or playing the video
//! directly pauses or starts the timer.
//!
//! ## Architecture
//!
//! - **Session clock**: A wall-clock-anchored state machine. The caller
//!   supplies the current time and invokes `tick()` for progress updates
//! - **Playback sync**: Maps clock state to player commands and player
//!   notifications back to clock commands, suppressing the player's echoes
//!   of our own commands
//! - **Runtime**: A tokio task that serializes ticks, commands and player
//!   notifications and owns the ticker
//! - **Storage**: TOML configuration and a SQLite key-value store for the
//!   watch history
//!
//! ## Key Components
//!
//! - [`SessionClock`]: Work/break cycle state machine
//! - [`PlaybackSynchronizer`]: Two-way player bridge with echo suppression
//! - [`FocusSession`]: Clock, synchronizer and time source wired together
//! - [`SessionRuntime`]: Async driver for a [`FocusSession`]
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod history;
pub mod media;
pub mod playback;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{
    ConfigError, CoreError, DatabaseError, MediaError, MetadataError, PlaybackError, Result,
};
pub use events::Event;
pub use history::{History, HistoryEntry, HistoryStore};
pub use media::{MediaId, MediaMetadata, MetadataClient};
pub use playback::{
    PlaybackCapability, PlaybackCommand, PlaybackEvent, PlaybackSynchronizer, SyncGuard,
    SyncOutcome,
};
pub use runtime::{Command, SessionHandle, SessionRuntime};
pub use session::FocusSession;
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{ClockView, ManualClock, Phase, SessionClock, SessionConfig, SystemClock, TimeSource};
