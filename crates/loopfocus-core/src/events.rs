use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Every state change of the session clock produces an Event.
/// Renderers subscribe to them; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        phase: Phase,
        cycle_index: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase: Phase,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    /// A work period began after a break.
    WorkStarted {
        cycle_index: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// A work period ended and its break began.
    BreakStarted {
        cycle_index: u32,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// The final work period ended. Terminal until reset.
    SessionCompleted {
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        from: Phase,
        to: Phase,
        at: DateTime<Utc>,
    },
    ConfigUpdated {
        work_secs: u32,
        break_secs: u32,
        total_cycles: u32,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Whether this event marks a phase boundary (the "now playing" signal).
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            Event::WorkStarted { .. } | Event::BreakStarted { .. } | Event::SessionCompleted { .. }
        )
    }
}

/// Convert an epoch-millisecond instant into an event timestamp.
pub(crate) fn at(now_ms: u64) -> DateTime<Utc> {
    i64::try_from(now_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default()
}
