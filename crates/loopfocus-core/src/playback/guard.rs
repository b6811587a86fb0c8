/// How long after one of our own commands a player notification is
/// presumed to be its echo.
pub const DEFAULT_ECHO_WINDOW_MS: u64 = 100;

/// One-shot, self-expiring echo marker.
///
/// Armed right before a command is sent to the player; the next player
/// notification inside the window consumes it. An echo that never arrives
/// cannot leave suppression stuck on, because the mark expires on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncGuard {
    window_ms: u64,
    armed_until_ms: Option<u64>,
}

impl SyncGuard {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            armed_until_ms: None,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn arm(&mut self, now_ms: u64) {
        self.armed_until_ms = Some(now_ms.saturating_add(self.window_ms));
    }

    /// Armed and not yet expired at `now_ms`.
    pub fn is_armed(&self, now_ms: u64) -> bool {
        matches!(self.armed_until_ms, Some(until) if now_ms <= until)
    }

    /// Take the mark. Returns true when the notification at `now_ms` is an
    /// echo. An expired mark is discarded and reports false.
    pub fn consume(&mut self, now_ms: u64) -> bool {
        matches!(self.armed_until_ms.take(), Some(until) if now_ms <= until)
    }

    pub fn clear(&mut self) {
        self.armed_until_ms = None;
    }
}

impl Default for SyncGuard {
    fn default() -> Self {
        Self::new(DEFAULT_ECHO_WINDOW_MS)
    }
}
