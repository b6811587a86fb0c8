mod clock;
mod config;
mod time_source;

pub use clock::{ClockView, Phase, SessionClock};
pub use config::{
    SessionConfig, BREAK_SECONDS_RANGE, CYCLES_RANGE, DEFAULT_BREAK_SECONDS, DEFAULT_TOTAL_CYCLES,
    DEFAULT_WORK_SECONDS, WORK_SECONDS_RANGE,
};
pub use time_source::{now_ms, ManualClock, SystemClock, TimeSource};
