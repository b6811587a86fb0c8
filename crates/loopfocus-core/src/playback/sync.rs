use tracing::{debug, warn};

use super::capability::{PlaybackCapability, PlaybackCommand, PlaybackEvent};
use super::guard::SyncGuard;
use crate::events::Event;
use crate::media::MediaId;
use crate::timer::{Phase, SessionClock};

/// What a player notification amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The video ended and was restarted.
    Looped,
    /// The notification was the player reacting to our own command.
    EchoSuppressed,
    /// A genuine user action on the player started or paused the clock.
    Clock(Event),
    /// Genuine, but the clock was already in the requested state.
    NoChange,
}

/// Keeps the player in step with the clock, and the clock in step with
/// what the user does on the player.
#[derive(Debug)]
pub struct PlaybackSynchronizer<P> {
    player: P,
    guard: SyncGuard,
    last_command: Option<PlaybackCommand>,
}

impl<P: PlaybackCapability> PlaybackSynchronizer<P> {
    pub fn new(player: P, guard: SyncGuard) -> Self {
        Self {
            player,
            guard,
            last_command: None,
        }
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    pub fn last_command(&self) -> Option<PlaybackCommand> {
        self.last_command
    }

    /// The clock's `(phase, running)` pair changed: play during running work
    /// periods, pause otherwise. The guard is armed before the command so the
    /// player's echo is recognised.
    pub fn on_clock_phase_changed(
        &mut self,
        phase: Phase,
        running: bool,
        now_ms: u64,
    ) -> PlaybackCommand {
        let command = if running && phase == Phase::Work {
            PlaybackCommand::Play
        } else {
            PlaybackCommand::Pause
        };
        debug!(%phase, running, ?command, "syncing player to clock");
        self.send(command, now_ms);
        command
    }

    /// React to a notification from the player.
    pub fn on_external_playback_event(
        &mut self,
        kind: PlaybackEvent,
        clock: &mut SessionClock,
        now_ms: u64,
    ) -> SyncOutcome {
        match kind {
            PlaybackEvent::Ended => {
                // Looping belongs to the player, not to the work/break cycle.
                self.send(PlaybackCommand::Play, now_ms);
                SyncOutcome::Looped
            }
            PlaybackEvent::Played | PlaybackEvent::Paused if self.guard.consume(now_ms) => {
                debug!(?kind, "ignoring player echo");
                SyncOutcome::EchoSuppressed
            }
            PlaybackEvent::Played => match clock.start(now_ms) {
                Some(event) => {
                    debug!("user pressed play on the player; clock started");
                    SyncOutcome::Clock(event)
                }
                None => SyncOutcome::NoChange,
            },
            PlaybackEvent::Paused => match clock.pause(now_ms) {
                Some(event) => {
                    debug!("user paused the player; clock paused");
                    SyncOutcome::Clock(event)
                }
                None => SyncOutcome::NoChange,
            },
        }
    }

    /// Load a new video. Fire-and-forget like every other command.
    pub fn load(&mut self, media_id: &MediaId) {
        if let Err(e) = self.player.load(media_id) {
            warn!(%media_id, error = %e, "player failed to load media");
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Err(e) = self.player.resize(width, height) {
            debug!(width, height, error = %e, "player resize failed");
        }
    }

    /// Forget any pending echo.
    pub fn clear_guard(&mut self) {
        self.guard.clear();
    }

    fn send(&mut self, command: PlaybackCommand, now_ms: u64) {
        self.guard.arm(now_ms);
        let result = match command {
            PlaybackCommand::Play => self.player.play(),
            PlaybackCommand::Pause => self.player.pause(),
        };
        match result {
            Ok(()) => self.last_command = Some(command),
            Err(e) => {
                // No command reached the player, so no echo is coming.
                self.guard.clear();
                warn!(?command, error = %e, "player command failed; clock stays authoritative");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{PlayerCall, RecordingPlayer};
    use crate::timer::SessionConfig;

    const T0: u64 = 1_700_000_000_000;

    fn setup() -> (PlaybackSynchronizer<RecordingPlayer>, RecordingPlayer, SessionClock) {
        let player = RecordingPlayer::new();
        let sync = PlaybackSynchronizer::new(player.clone(), SyncGuard::default());
        (sync, player, SessionClock::new(SessionConfig::new(60, 30, 2)))
    }

    #[test]
    fn running_work_plays_everything_else_pauses() {
        let (mut sync, player, _) = setup();
        assert_eq!(sync.on_clock_phase_changed(Phase::Work, true, T0), PlaybackCommand::Play);
        assert_eq!(sync.on_clock_phase_changed(Phase::Work, false, T0), PlaybackCommand::Pause);
        assert_eq!(sync.on_clock_phase_changed(Phase::Break, true, T0), PlaybackCommand::Pause);
        assert_eq!(sync.on_clock_phase_changed(Phase::Complete, false, T0), PlaybackCommand::Pause);
        assert_eq!(
            player.calls(),
            vec![PlayerCall::Play, PlayerCall::Pause, PlayerCall::Pause, PlayerCall::Pause]
        );
    }

    #[test]
    fn immediate_echo_is_ignored() {
        let (mut sync, _, mut clock) = setup();
        sync.on_clock_phase_changed(Phase::Work, true, T0);
        assert!(sync.guard().is_armed(T0));
        let outcome = sync.on_external_playback_event(PlaybackEvent::Played, &mut clock, T0 + 20);
        assert_eq!(outcome, SyncOutcome::EchoSuppressed);
        assert!(!clock.is_running());
    }

    #[test]
    fn late_play_is_genuine() {
        let (mut sync, _, mut clock) = setup();
        sync.on_clock_phase_changed(Phase::Work, false, T0);
        let outcome = sync.on_external_playback_event(PlaybackEvent::Played, &mut clock, T0 + 500);
        assert!(matches!(outcome, SyncOutcome::Clock(Event::SessionStarted { .. })));
        assert!(clock.is_running());
    }

    #[test]
    fn genuine_pause_pauses_running_clock() {
        let (mut sync, _, mut clock) = setup();
        clock.start(T0);
        let outcome = sync.on_external_playback_event(PlaybackEvent::Paused, &mut clock, T0 + 5_000);
        assert!(matches!(outcome, SyncOutcome::Clock(Event::SessionPaused { .. })));
        assert!(!clock.is_running());

        let outcome = sync.on_external_playback_event(PlaybackEvent::Paused, &mut clock, T0 + 6_000);
        assert_eq!(outcome, SyncOutcome::NoChange);
    }

    #[test]
    fn ended_always_loops() {
        let (mut sync, player, mut clock) = setup();
        clock.skip(T0);
        assert_eq!(clock.phase(), Phase::Break);
        assert!(!clock.is_running());

        // Even with a pending echo mark.
        sync.on_clock_phase_changed(Phase::Break, false, T0);
        player.clear();
        let outcome = sync.on_external_playback_event(PlaybackEvent::Ended, &mut clock, T0 + 10);
        assert_eq!(outcome, SyncOutcome::Looped);
        assert_eq!(player.calls(), vec![PlayerCall::Play]);
        assert!(!clock.is_running());
    }

    #[test]
    fn loop_restart_echo_does_not_start_clock() {
        let (mut sync, _, mut clock) = setup();
        sync.on_external_playback_event(PlaybackEvent::Ended, &mut clock, T0);
        let outcome = sync.on_external_playback_event(PlaybackEvent::Played, &mut clock, T0 + 30);
        assert_eq!(outcome, SyncOutcome::EchoSuppressed);
        assert!(!clock.is_running());
    }

    #[test]
    fn failed_command_is_swallowed_and_disarms() {
        let (mut sync, player, mut clock) = setup();
        player.set_failing(true);
        sync.on_clock_phase_changed(Phase::Work, true, T0);
        assert!(!sync.guard().is_armed(T0));
        assert_eq!(sync.last_command(), None);

        // With no echo pending, the user's play goes straight through.
        let outcome = sync.on_external_playback_event(PlaybackEvent::Played, &mut clock, T0 + 10);
        assert!(matches!(outcome, SyncOutcome::Clock(_)));
    }
}
