//! The controls surface: one clock, one synchronizer, one time source.
//!
//! Every command reads the time once, applies itself to the clock, and if
//! the clock's `(phase, running)` pair moved, tells the synchronizer so the
//! player follows. Each command returns the resulting [`ClockView`].

use std::sync::Arc;

use tracing::debug;

use crate::events::Event;
use crate::media::MediaId;
use crate::playback::{PlaybackCapability, PlaybackEvent, PlaybackSynchronizer, SyncGuard, SyncOutcome};
use crate::timer::{ClockView, Phase, SessionClock, SessionConfig, TimeSource};

pub struct FocusSession<P> {
    clock: SessionClock,
    sync: PlaybackSynchronizer<P>,
    time: Arc<dyn TimeSource>,
    media: Option<MediaId>,
    pending: Vec<Event>,
}

impl<P: PlaybackCapability> FocusSession<P> {
    pub fn new(config: SessionConfig, player: P, time: Arc<dyn TimeSource>) -> Self {
        Self::with_guard(config, player, time, SyncGuard::default())
    }

    pub fn with_guard(
        config: SessionConfig,
        player: P,
        time: Arc<dyn TimeSource>,
        guard: SyncGuard,
    ) -> Self {
        Self {
            clock: SessionClock::new(config),
            sync: PlaybackSynchronizer::new(player, guard),
            time,
            media: None,
            pending: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn view(&self) -> ClockView {
        self.clock.view()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn synchronizer(&self) -> &PlaybackSynchronizer<P> {
        &self.sync
    }

    pub fn player(&self) -> &P {
        self.sync.player()
    }

    pub fn media(&self) -> Option<&MediaId> {
        self.media.as_ref()
    }

    /// Take the events produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }

    // ── Controls ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> ClockView {
        self.apply(|clock, now| clock.start(now).into_iter().collect())
    }

    pub fn pause(&mut self) -> ClockView {
        self.apply(|clock, now| clock.pause(now).into_iter().collect())
    }

    pub fn toggle(&mut self) -> ClockView {
        if self.clock.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Back to idle. Any pending echo is forgotten along with the state.
    pub fn reset(&mut self) -> ClockView {
        self.sync.clear_guard();
        self.apply(|clock, now| clock.reset(now).into_iter().collect())
    }

    pub fn skip(&mut self) -> ClockView {
        self.apply(|clock, now| clock.skip(now))
    }

    pub fn set_work_minutes(&mut self, minutes: i64) -> ClockView {
        let config = self.clock.config().with_work_seconds(minutes.saturating_mul(60));
        self.update_config(config)
    }

    pub fn set_break_minutes(&mut self, minutes: i64) -> ClockView {
        let config = self.clock.config().with_break_seconds(minutes.saturating_mul(60));
        self.update_config(config)
    }

    pub fn set_total_cycles(&mut self, cycles: i64) -> ClockView {
        let config = self.clock.config().with_total_cycles(cycles);
        self.update_config(config)
    }

    pub fn set_preset(&mut self, work_minutes: i64, break_minutes: i64) -> ClockView {
        let config = self
            .clock
            .config()
            .with_work_seconds(work_minutes.saturating_mul(60))
            .with_break_seconds(break_minutes.saturating_mul(60));
        self.update_config(config)
    }

    pub fn update_config(&mut self, config: SessionConfig) -> ClockView {
        self.apply(|clock, now| clock.update_config(config, now).into_iter().collect())
    }

    // ── Stimuli ──────────────────────────────────────────────────────

    /// Periodic tick.
    pub fn tick(&mut self) -> ClockView {
        self.apply(|clock, now| clock.tick(now).into_iter().collect())
    }

    /// The host came back from background or sleep: snap to the wall clock
    /// in one step, then apply a boundary crossed meanwhile (at most one).
    pub fn on_visibility_regained(&mut self) -> ClockView {
        self.apply(|clock, now| {
            clock.reanchor(now);
            clock.tick(now).into_iter().collect()
        })
    }

    pub fn on_playback_event(&mut self, kind: PlaybackEvent) -> SyncOutcome {
        let now = self.time.now_ms();
        let before = self.phase_pair();
        let outcome = self.sync.on_external_playback_event(kind, &mut self.clock, now);
        if let SyncOutcome::Clock(event) = &outcome {
            self.pending.push(event.clone());
        }
        self.notify_if_changed(before, now);
        outcome
    }

    /// Raw state code from the player; codes without meaning are dropped.
    pub fn on_playback_state(&mut self, raw: i32) -> Option<SyncOutcome> {
        let kind = PlaybackEvent::from_raw(raw)?;
        Some(self.on_playback_event(kind))
    }

    /// Load a video and bring it in line with the current clock state.
    pub fn load_media(&mut self, media_id: MediaId) -> ClockView {
        let now = self.time.now_ms();
        debug!(%media_id, "loading media");
        self.sync.load(&media_id);
        self.media = Some(media_id);
        let (phase, running) = self.phase_pair();
        self.sync.on_clock_phase_changed(phase, running, now);
        self.clock.view()
    }

    pub fn resize_player(&mut self, width: u32, height: u32) {
        self.sync.resize(width, height);
    }

    /// Stop the clock and forget pending echoes. The player is left alone.
    pub fn teardown(&mut self) -> ClockView {
        let now = self.time.now_ms();
        if let Some(event) = self.clock.pause(now) {
            self.pending.push(event);
        }
        self.sync.clear_guard();
        self.clock.view()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn phase_pair(&self) -> (Phase, bool) {
        (self.clock.phase(), self.clock.is_running())
    }

    fn apply<F>(&mut self, op: F) -> ClockView
    where
        F: FnOnce(&mut SessionClock, u64) -> Vec<Event>,
    {
        let now = self.time.now_ms();
        let before = self.phase_pair();
        let events = op(&mut self.clock, now);
        self.pending.extend(events);
        self.notify_if_changed(before, now);
        self.clock.view()
    }

    fn notify_if_changed(&mut self, before: (Phase, bool), now: u64) {
        let after = self.phase_pair();
        if after != before {
            self.sync.on_clock_phase_changed(after.0, after.1, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{PlayerCall, RecordingPlayer};
    use crate::timer::ManualClock;

    const T0: u64 = 1_700_000_000_000;

    fn session(work: i64, brk: i64, cycles: i64) -> (FocusSession<RecordingPlayer>, RecordingPlayer, ManualClock) {
        let player = RecordingPlayer::new();
        let time = ManualClock::new(T0);
        let session = FocusSession::new(
            SessionConfig::new(work, brk, cycles),
            player.clone(),
            Arc::new(time.clone()),
        );
        (session, player, time)
    }

    #[test]
    fn start_plays_and_pause_pauses() {
        let (mut s, player, _) = session(60, 30, 2);
        let view = s.start();
        assert!(view.running);
        assert_eq!(player.last_call(), Some(PlayerCall::Play));

        s.pause();
        assert_eq!(player.last_call(), Some(PlayerCall::Pause));
    }

    #[test]
    fn repeated_start_sends_one_command() {
        let (mut s, player, _) = session(60, 30, 2);
        s.start();
        s.start();
        assert_eq!(player.calls(), vec![PlayerCall::Play]);
    }

    #[test]
    fn break_boundary_pauses_video() {
        let (mut s, player, time) = session(60, 30, 2);
        s.start();
        time.advance_secs(60);
        let view = s.tick();
        assert_eq!(view.phase, Phase::Break);
        assert!(view.running);
        assert_eq!(player.last_call(), Some(PlayerCall::Pause));

        time.advance_secs(30);
        s.tick();
        assert_eq!(player.last_call(), Some(PlayerCall::Play));
    }

    #[test]
    fn toggle_flips_running() {
        let (mut s, _, _) = session(60, 30, 2);
        assert!(s.toggle().running);
        assert!(!s.toggle().running);
    }

    #[test]
    fn reset_pauses_video_and_restores_idle() {
        let (mut s, player, time) = session(60, 30, 2);
        s.start();
        time.advance_secs(60);
        s.tick();
        let view = s.reset();
        assert_eq!(view.phase, Phase::Work);
        assert_eq!(view.remaining_secs, 60);
        assert!(!view.running);
        assert_eq!(player.last_call(), Some(PlayerCall::Pause));
    }

    #[test]
    fn user_play_on_player_starts_clock() {
        let (mut s, player, _) = session(60, 30, 2);
        let outcome = s.on_playback_event(PlaybackEvent::Played);
        assert!(matches!(outcome, SyncOutcome::Clock(Event::SessionStarted { .. })));
        assert!(s.is_running());
        // The synchronizer confirms the state it now expects.
        assert_eq!(player.last_call(), Some(PlayerCall::Play));
    }

    #[test]
    fn echo_of_start_is_ignored() {
        let (mut s, _, time) = session(60, 30, 2);
        s.start();
        s.pause();
        time.advance_ms(10);
        // The player reports "paused" in response to our own pause.
        assert_eq!(s.on_playback_event(PlaybackEvent::Paused), SyncOutcome::EchoSuppressed);
        assert!(!s.is_running());
    }

    #[test]
    fn set_minutes_clamps_and_updates_idle_display() {
        let (mut s, _, _) = session(60, 30, 2);
        let view = s.set_work_minutes(90);
        assert_eq!(view.remaining_secs, 3600);
        let view = s.set_break_minutes(0);
        assert_eq!(view.remaining_secs, 3600);
        assert_eq!(s.clock().config().break_seconds(), 1);
        let view = s.set_total_cycles(99);
        assert_eq!(view.total_cycles, 20);
    }

    #[test]
    fn set_preset_sets_both_durations() {
        let (mut s, _, _) = session(60, 30, 2);
        let view = s.set_preset(50, 10);
        assert_eq!(view.remaining_secs, 3000);
        assert_eq!(s.clock().config().break_seconds(), 600);
        let events = s.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::ConfigUpdated { work_secs: 3000, break_secs: 600, .. }));
    }

    #[test]
    fn visibility_regained_applies_single_transition() {
        let (mut s, _, time) = session(10, 5, 3);
        s.start();
        time.advance_secs(1_000);
        let view = s.on_visibility_regained();
        assert_eq!(view.phase, Phase::Break);
        assert_eq!(view.cycle_index, 0);
        assert_eq!(view.remaining_secs, 5);
    }

    #[test]
    fn load_media_syncs_player_to_clock() {
        let (mut s, player, _) = session(60, 30, 2);
        let id = MediaId::parse("dQw4w9WgXcQ").unwrap();
        s.load_media(id.clone());
        assert_eq!(player.calls(), vec![PlayerCall::Load(id.clone()), PlayerCall::Pause]);
        assert_eq!(s.media(), Some(&id));
    }

    #[test]
    fn raw_state_codes_route_through_sync() {
        let (mut s, _, _) = session(60, 30, 2);
        assert!(s.on_playback_state(3).is_none());
        assert!(matches!(s.on_playback_state(1), Some(SyncOutcome::Clock(_))));
    }

    #[test]
    fn teardown_stops_clock_and_clears_guard() {
        let (mut s, player, _) = session(60, 30, 2);
        s.start();
        player.clear();
        let view = s.teardown();
        assert!(!view.running);
        assert!(!s.synchronizer().guard().is_armed(T0));
        assert!(player.calls().is_empty());
    }

    #[test]
    fn events_are_collected_until_drained() {
        let (mut s, _, time) = session(10, 5, 1);
        s.start();
        time.advance_secs(10);
        s.tick();
        let events = s.drain_events();
        assert!(matches!(events[0], Event::SessionStarted { .. }));
        assert!(matches!(events[1], Event::SessionCompleted { total_cycles: 1, .. }));
        assert!(s.drain_events().is_empty());
    }
}
