use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;
use crate::media::MediaId;

/// The minimal surface of an embedded player.
///
/// Commands are fire-and-forget: the caller logs a failure and moves on.
/// State changes come back separately, as [`PlaybackEvent`]s delivered to
/// the session.
pub trait PlaybackCapability {
    fn load(&mut self, media_id: &MediaId) -> Result<(), PlaybackError>;

    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Layout hint. Not part of the sync contract.
    fn resize(&mut self, _width: u32, _height: u32) -> Result<(), PlaybackError> {
        Ok(()) // default no-op
    }
}

impl<P: PlaybackCapability + ?Sized> PlaybackCapability for Box<P> {
    fn load(&mut self, media_id: &MediaId) -> Result<(), PlaybackError> {
        (**self).load(media_id)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        (**self).pause()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PlaybackError> {
        (**self).resize(width, height)
    }
}

/// What the synchronizer asked the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackCommand {
    Play,
    Pause,
}

/// Player notifications the core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackEvent {
    Ended,
    Played,
    Paused,
}

impl PlaybackEvent {
    /// Map an embedded player's raw state code.
    ///
    /// `0` ended, `1` playing, `2` paused. Buffering, cued and unstarted
    /// states carry no intent and map to `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Ended),
            1 => Some(Self::Played),
            2 => Some(Self::Paused),
            _ => None,
        }
    }
}

impl std::str::FromStr for PlaybackEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ended" => Ok(Self::Ended),
            "played" | "playing" | "play" => Ok(Self::Played),
            "paused" => Ok(Self::Paused),
            other => Err(format!("unknown playback event: {other}")),
        }
    }
}

/// One call made against a [`RecordingPlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Load(MediaId),
    Play,
    Pause,
    Resize(u32, u32),
}

/// A player that records every call and can be told to fail.
///
/// Clones share the same log, so a test can keep one handle while the
/// session owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    calls: Arc<Mutex<Vec<PlayerCall>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn last_call(&self) -> Option<PlayerCall> {
        self.calls.lock().ok().and_then(|c| c.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Make every subsequent command fail with [`PlaybackError::NotReady`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, call: PlayerCall) -> Result<(), PlaybackError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PlaybackError::NotReady);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        Ok(())
    }
}

impl PlaybackCapability for RecordingPlayer {
    fn load(&mut self, media_id: &MediaId) -> Result<(), PlaybackError> {
        self.record(PlayerCall::Load(media_id.clone()))
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.record(PlayerCall::Play)
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.record(PlayerCall::Pause)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PlaybackError> {
        self.record(PlayerCall::Resize(width, height))
    }
}
