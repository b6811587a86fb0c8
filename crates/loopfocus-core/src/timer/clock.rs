//! Session clock implementation.
//!
//! The clock is a wall-clock-anchored state machine. It does not use
//! internal threads or read the time itself: every command receives `now`
//! in epoch milliseconds, and the caller is responsible for calling `tick()`
//! about once a second while the clock runs.
//!
//! ## State Transitions
//!
//! ```text
//! Work(n) -> Break(n) -> Work(n + 1) -> ... -> Work(last) -> Complete
//! ```
//!
//! The final work period goes straight to `Complete`; its break never runs.
//!
//! ## Anchoring
//!
//! Remaining time is always derived as `ceil((period_end - now) / 1000)`,
//! never decremented per tick, so a late or missing tick cannot introduce
//! drift. A single tick long after the period ended performs exactly one
//! transition.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use crate::events::{at, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Break => "break",
            Phase::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The observable state handed back to renderers after every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockView {
    pub phase: Phase,
    pub cycle_index: u32,
    pub total_cycles: u32,
    pub remaining_secs: u32,
    pub running: bool,
}

impl ClockView {
    /// `MM:SS` rendering of the remaining time.
    pub fn display_remaining(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }

    /// 1-based cycle label, e.g. `2/4`.
    pub fn cycle_label(&self) -> String {
        format!("{}/{}", self.cycle_index + 1, self.total_cycles)
    }
}

/// Core countdown state machine.
#[derive(Debug, Clone)]
pub struct SessionClock {
    config: SessionConfig,
    phase: Phase,
    cycle_index: u32,
    remaining_secs: u32,
    running: bool,
    /// Wall-clock anchors for the current period (epoch ms). Stale while paused.
    period_start_ms: u64,
    period_end_ms: u64,
}

impl SessionClock {
    /// Create an idle clock: first work period, full duration, not running.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Work,
            cycle_index: 0,
            remaining_secs: config.work_seconds(),
            running: false,
            period_start_ms: 0,
            period_end_ms: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle_index(&self) -> u32 {
        self.cycle_index
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn period_start_ms(&self) -> u64 {
        self.period_start_ms
    }

    pub fn period_end_ms(&self) -> u64 {
        self.period_end_ms
    }

    pub fn view(&self) -> ClockView {
        ClockView {
            phase: self.phase,
            cycle_index: self.cycle_index,
            total_cycles: self.config.total_cycles(),
            remaining_secs: self.remaining_secs,
            running: self.running,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume the countdown. Restarts from idle when complete.
    /// Idempotent while running: the anchors are left untouched.
    pub fn start(&mut self, now_ms: u64) -> Option<Event> {
        if self.running {
            return None;
        }
        if self.phase == Phase::Complete {
            self.reset_to_idle();
        }
        self.running = true;
        self.anchor(now_ms, self.remaining_secs);
        debug!(
            phase = %self.phase,
            cycle_index = self.cycle_index,
            remaining_secs = self.remaining_secs,
            "clock started"
        );
        Some(Event::SessionStarted {
            phase: self.phase,
            cycle_index: self.cycle_index,
            remaining_secs: self.remaining_secs,
            at: at(now_ms),
        })
    }

    /// Stop consuming wall-clock time. `remaining_secs` keeps the value of
    /// the last tick.
    pub fn pause(&mut self, now_ms: u64) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        debug!(phase = %self.phase, remaining_secs = self.remaining_secs, "clock paused");
        Some(Event::SessionPaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: at(now_ms),
        })
    }

    /// Return to idle regardless of the current phase.
    pub fn reset(&mut self, now_ms: u64) -> Option<Event> {
        self.reset_to_idle();
        debug!("clock reset");
        Some(Event::SessionReset { at: at(now_ms) })
    }

    /// Perform the next phase transition immediately, keeping the
    /// running/paused status. No-op once complete.
    pub fn skip(&mut self, now_ms: u64) -> Vec<Event> {
        let from = self.phase;
        let Some(boundary) = self.transition(now_ms) else {
            return Vec::new();
        };
        vec![
            Event::PhaseSkipped {
                from,
                to: self.phase,
                at: at(now_ms),
            },
            boundary,
        ]
    }

    /// Recompute the remaining time from the anchors and, when the period
    /// has run out, perform exactly one phase transition.
    pub fn tick(&mut self, now_ms: u64) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.recompute(now_ms);
        if self.remaining_secs > 0 {
            return None;
        }
        self.transition(now_ms)
    }

    /// Snap `remaining_secs` to the wall clock in one step after the host
    /// was suspended. Never advances the phase.
    pub fn reanchor(&mut self, now_ms: u64) {
        if self.running {
            self.recompute(now_ms);
        }
    }

    /// Replace the session configuration.
    ///
    /// Durations edited while paused apply to the displayed period at once
    /// when they belong to its phase; otherwise they wait until that phase is
    /// next entered. A running period is never stretched or shortened.
    /// The cycle count is never lowered below the cycle already in progress.
    pub fn update_config(&mut self, config: SessionConfig, now_ms: u64) -> Option<Event> {
        let previous = self.config;
        let mut config = config;

        if self.phase == Phase::Complete {
            self.config = config;
            self.cycle_index = config.total_cycles() - 1;
        } else {
            // A break always leads into another work period.
            let min_cycles = match self.phase {
                Phase::Break => self.cycle_index + 2,
                _ => self.cycle_index + 1,
            };
            if config.total_cycles() < min_cycles {
                debug!(
                    requested = config.total_cycles(),
                    cycle_index = self.cycle_index,
                    "cycle count raised to keep the current cycle"
                );
                config = config.with_total_cycles(i64::from(min_cycles));
            }
            self.config = config;

            if !self.running {
                let changed = match self.phase {
                    Phase::Work => previous.work_seconds() != config.work_seconds(),
                    Phase::Break => previous.break_seconds() != config.break_seconds(),
                    Phase::Complete => false,
                };
                if changed {
                    self.remaining_secs = config.duration_of(self.phase);
                }
            }
        }

        if previous == self.config {
            return None;
        }
        Some(Event::ConfigUpdated {
            work_secs: self.config.work_seconds(),
            break_secs: self.config.break_seconds(),
            total_cycles: self.config.total_cycles(),
            at: at(now_ms),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reset_to_idle(&mut self) {
        self.phase = Phase::Work;
        self.cycle_index = 0;
        self.remaining_secs = self.config.work_seconds();
        self.running = false;
        self.period_start_ms = 0;
        self.period_end_ms = 0;
    }

    fn anchor(&mut self, now_ms: u64, secs: u32) {
        self.remaining_secs = secs;
        self.period_start_ms = now_ms;
        self.period_end_ms = now_ms.saturating_add(u64::from(secs) * 1000);
    }

    fn recompute(&mut self, now_ms: u64) {
        if now_ms < self.period_start_ms {
            warn!(
                now_ms,
                period_start_ms = self.period_start_ms,
                "wall clock moved backwards; keeping remaining time"
            );
            return;
        }
        let left_ms = self.period_end_ms.saturating_sub(now_ms);
        self.remaining_secs = u32::try_from(left_ms.div_ceil(1000)).unwrap_or(u32::MAX);
    }

    /// Leave the current period. Returns the boundary event, or `None` when
    /// already complete.
    fn transition(&mut self, now_ms: u64) -> Option<Event> {
        match self.phase {
            Phase::Work if self.cycle_index + 1 >= self.config.total_cycles() => {
                self.phase = Phase::Complete;
                self.running = false;
                self.remaining_secs = 0;
                self.period_start_ms = now_ms;
                self.period_end_ms = now_ms;
                info!(total_cycles = self.config.total_cycles(), "session complete");
                Some(Event::SessionCompleted {
                    total_cycles: self.config.total_cycles(),
                    at: at(now_ms),
                })
            }
            Phase::Work => {
                self.phase = Phase::Break;
                self.anchor(now_ms, self.config.break_seconds());
                info!(cycle_index = self.cycle_index, "break started");
                Some(Event::BreakStarted {
                    cycle_index: self.cycle_index,
                    duration_secs: self.remaining_secs,
                    at: at(now_ms),
                })
            }
            Phase::Break => {
                self.phase = Phase::Work;
                self.cycle_index += 1;
                self.anchor(now_ms, self.config.work_seconds());
                info!(cycle_index = self.cycle_index, "work started");
                Some(Event::WorkStarted {
                    cycle_index: self.cycle_index,
                    duration_secs: self.remaining_secs,
                    at: at(now_ms),
                })
            }
            Phase::Complete => None,
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
