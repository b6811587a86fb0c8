use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::clock::Phase;

pub const WORK_SECONDS_RANGE: RangeInclusive<u32> = 1..=3600;
pub const BREAK_SECONDS_RANGE: RangeInclusive<u32> = 1..=1800;
pub const CYCLES_RANGE: RangeInclusive<u32> = 1..=20;

pub const DEFAULT_WORK_SECONDS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECONDS: u32 = 5 * 60;
pub const DEFAULT_TOTAL_CYCLES: u32 = 4;

/// Durations and cycle count for one session.
///
/// Every constructor clamps into the valid ranges, so a `SessionConfig`
/// is always usable as-is. User input is never rejected, only bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSessionConfig")]
pub struct SessionConfig {
    work_seconds: u32,
    break_seconds: u32,
    total_cycles: u32,
}

#[derive(Deserialize)]
struct RawSessionConfig {
    work_seconds: i64,
    break_seconds: i64,
    total_cycles: i64,
}

impl From<RawSessionConfig> for SessionConfig {
    fn from(raw: RawSessionConfig) -> Self {
        Self::new(raw.work_seconds, raw.break_seconds, raw.total_cycles)
    }
}

impl SessionConfig {
    pub fn new(work_seconds: i64, break_seconds: i64, total_cycles: i64) -> Self {
        Self {
            work_seconds: clamp_into(work_seconds, &WORK_SECONDS_RANGE),
            break_seconds: clamp_into(break_seconds, &BREAK_SECONDS_RANGE),
            total_cycles: clamp_into(total_cycles, &CYCLES_RANGE),
        }
    }

    /// Build from minute values as typed into the controls surface.
    pub fn from_minutes(work_minutes: i64, break_minutes: i64, total_cycles: i64) -> Self {
        Self::new(
            work_minutes.saturating_mul(60),
            break_minutes.saturating_mul(60),
            total_cycles,
        )
    }

    pub fn work_seconds(&self) -> u32 {
        self.work_seconds
    }

    pub fn break_seconds(&self) -> u32 {
        self.break_seconds
    }

    pub fn total_cycles(&self) -> u32 {
        self.total_cycles
    }

    pub fn with_work_seconds(self, seconds: i64) -> Self {
        Self {
            work_seconds: clamp_into(seconds, &WORK_SECONDS_RANGE),
            ..self
        }
    }

    pub fn with_break_seconds(self, seconds: i64) -> Self {
        Self {
            break_seconds: clamp_into(seconds, &BREAK_SECONDS_RANGE),
            ..self
        }
    }

    pub fn with_total_cycles(self, cycles: i64) -> Self {
        Self {
            total_cycles: clamp_into(cycles, &CYCLES_RANGE),
            ..self
        }
    }

    /// Length of a period of the given kind. `Complete` has no duration.
    pub fn duration_of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_seconds,
            Phase::Break => self.break_seconds,
            Phase::Complete => 0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_seconds: DEFAULT_WORK_SECONDS,
            break_seconds: DEFAULT_BREAK_SECONDS,
            total_cycles: DEFAULT_TOTAL_CYCLES,
        }
    }
}

fn clamp_into(value: i64, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(i64::from(*range.start()), i64::from(*range.end())) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_out_of_range_values() {
        let cfg = SessionConfig::new(0, 99_999, -3);
        assert_eq!(cfg.work_seconds(), 1);
        assert_eq!(cfg.break_seconds(), 1800);
        assert_eq!(cfg.total_cycles(), 1);

        let cfg = SessionConfig::new(7200, -1, 50);
        assert_eq!(cfg.work_seconds(), 3600);
        assert_eq!(cfg.break_seconds(), 1);
        assert_eq!(cfg.total_cycles(), 20);
    }

    #[test]
    fn from_minutes_converts_and_clamps() {
        let cfg = SessionConfig::from_minutes(25, 5, 4);
        assert_eq!(cfg, SessionConfig::default());

        let cfg = SessionConfig::from_minutes(90, 45, 4);
        assert_eq!(cfg.work_seconds(), 3600);
        assert_eq!(cfg.break_seconds(), 1800);
    }

    #[test]
    fn from_minutes_survives_overflow() {
        let cfg = SessionConfig::from_minutes(i64::MAX, i64::MIN, 4);
        assert_eq!(cfg.work_seconds(), 3600);
        assert_eq!(cfg.break_seconds(), 1);
    }

    #[test]
    fn duration_of_complete_is_zero() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.duration_of(Phase::Work), 1500);
        assert_eq!(cfg.duration_of(Phase::Break), 300);
        assert_eq!(cfg.duration_of(Phase::Complete), 0);
    }

    #[test]
    fn deserialize_clamps() {
        let cfg: SessionConfig = serde_json::from_str(
            r#"{"work_seconds": 0, "break_seconds": 10, "total_cycles": 100}"#,
        )
        .unwrap();
        assert_eq!(cfg.work_seconds(), 1);
        assert_eq!(cfg.break_seconds(), 10);
        assert_eq!(cfg.total_cycles(), 20);
    }
}
