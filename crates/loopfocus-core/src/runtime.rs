//! Session runtime.
//!
//! Owns a [`FocusSession`] on a single tokio task and feeds it one stimulus
//! at a time: ticks, user commands, player notifications and visibility
//! changes all go through the same unbounded queue, and each handler runs to
//! completion before the next is taken.
//!
//! The runtime also owns the periodic ticker. It is spawned when the session
//! starts running and aborted as soon as it stops, resets or shuts down, in
//! the same handler that changed the state. Ticks carry the generation of
//! the ticker that sent them, so a tick already queued by an aborted ticker
//! is dropped instead of applied.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::media::MediaId;
use crate::playback::{PlaybackCapability, PlaybackEvent};
use crate::session::FocusSession;
use crate::timer::ClockView;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 64;

/// User-facing commands accepted by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    Skip,
    SetWorkMinutes(i64),
    SetBreakMinutes(i64),
    SetTotalCycles(i64),
    SetPreset { work_minutes: i64, break_minutes: i64 },
    LoadMedia(MediaId),
    Resize { width: u32, height: u32 },
    Status,
}

enum Stimulus {
    Tick { generation: u64 },
    VisibilityRegained,
    Playback(PlaybackEvent),
    Command(Command, oneshot::Sender<ClockView>),
    Shutdown(oneshot::Sender<ClockView>),
}

/// Cheap, cloneable handle for talking to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Stimulus>,
    events: broadcast::Sender<Event>,
}

impl SessionHandle {
    /// Send a command and wait for the resulting view.
    ///
    /// # Errors
    /// Returns [`CoreError::RuntimeClosed`] if the runtime has stopped.
    pub async fn send(&self, command: Command) -> Result<ClockView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Stimulus::Command(command, reply))
            .map_err(|_| CoreError::RuntimeClosed)?;
        rx.await.map_err(|_| CoreError::RuntimeClosed)
    }

    pub async fn start(&self) -> Result<ClockView> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<ClockView> {
        self.send(Command::Pause).await
    }

    pub async fn toggle(&self) -> Result<ClockView> {
        self.send(Command::Toggle).await
    }

    pub async fn reset(&self) -> Result<ClockView> {
        self.send(Command::Reset).await
    }

    pub async fn skip(&self) -> Result<ClockView> {
        self.send(Command::Skip).await
    }

    pub async fn status(&self) -> Result<ClockView> {
        self.send(Command::Status).await
    }

    /// Deliver a player notification. Does not wait for it to be handled.
    pub fn playback_event(&self, kind: PlaybackEvent) -> Result<()> {
        self.tx
            .send(Stimulus::Playback(kind))
            .map_err(|_| CoreError::RuntimeClosed)
    }

    /// Deliver a raw player state code; meaningless codes are dropped here.
    pub fn playback_state(&self, raw: i32) -> Result<()> {
        match PlaybackEvent::from_raw(raw) {
            Some(kind) => self.playback_event(kind),
            None => Ok(()),
        }
    }

    /// The host is visible again after being backgrounded or suspended.
    pub fn visibility_regained(&self) -> Result<()> {
        self.tx
            .send(Stimulus::VisibilityRegained)
            .map_err(|_| CoreError::RuntimeClosed)
    }

    /// Subscribe to clock events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the ticker, tear the session down and end the runtime task.
    pub async fn shutdown(&self) -> Result<ClockView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Stimulus::Shutdown(reply))
            .map_err(|_| CoreError::RuntimeClosed)?;
        rx.await.map_err(|_| CoreError::RuntimeClosed)
    }
}

pub struct SessionRuntime<P> {
    session: FocusSession<P>,
    rx: mpsc::UnboundedReceiver<Stimulus>,
    /// Weak so that dropping every handle ends the runtime.
    tick_tx: mpsc::WeakUnboundedSender<Stimulus>,
    events: broadcast::Sender<Event>,
    tick_interval: Duration,
    ticker: Option<JoinHandle<()>>,
    generation: u64,
}

impl<P> SessionRuntime<P>
where
    P: PlaybackCapability + Send + 'static,
{
    /// Move `session` onto its own task. The task ends on shutdown or once
    /// every handle is dropped, handing the session back.
    pub fn spawn(
        session: FocusSession<P>,
        tick_interval: Duration,
    ) -> (SessionHandle, JoinHandle<FocusSession<P>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let runtime = Self {
            session,
            rx,
            tick_tx: tx.downgrade(),
            events: events.clone(),
            tick_interval,
            ticker: None,
            generation: 0,
        };
        let task = tokio::spawn(runtime.run());
        (SessionHandle { tx, events }, task)
    }

    async fn run(mut self) -> FocusSession<P> {
        debug!(interval_ms = self.tick_interval.as_millis() as u64, "session runtime started");
        while let Some(stimulus) = self.rx.recv().await {
            let shutdown = matches!(stimulus, Stimulus::Shutdown(_));
            let reply = self.handle(stimulus);
            self.publish();
            if !shutdown {
                self.sync_ticker();
            }
            if let Some((reply, view)) = reply {
                let _ = reply.send(view);
            }
            if shutdown {
                break;
            }
        }
        self.stop_ticker();
        debug!("session runtime stopped");
        self.session
    }

    fn handle(&mut self, stimulus: Stimulus) -> Option<(oneshot::Sender<ClockView>, ClockView)> {
        match stimulus {
            Stimulus::Tick { generation } if generation != self.generation => {
                trace!(generation, current = self.generation, "dropping stale tick");
                None
            }
            Stimulus::Tick { .. } => {
                self.session.tick();
                None
            }
            Stimulus::VisibilityRegained => {
                self.session.on_visibility_regained();
                None
            }
            Stimulus::Playback(kind) => {
                let outcome = self.session.on_playback_event(kind);
                trace!(?kind, ?outcome, "player notification handled");
                None
            }
            Stimulus::Command(command, reply) => {
                let view = self.apply(command);
                Some((reply, view))
            }
            Stimulus::Shutdown(reply) => {
                self.stop_ticker();
                let view = self.session.teardown();
                Some((reply, view))
            }
        }
    }

    fn apply(&mut self, command: Command) -> ClockView {
        trace!(?command, "command");
        match command {
            Command::Start => self.session.start(),
            Command::Pause => self.session.pause(),
            Command::Toggle => self.session.toggle(),
            Command::Reset => {
                // Cancel before the state changes so no tick of the old
                // generation can land on the fresh session.
                self.stop_ticker();
                self.session.reset()
            }
            Command::Skip => self.session.skip(),
            Command::SetWorkMinutes(n) => self.session.set_work_minutes(n),
            Command::SetBreakMinutes(n) => self.session.set_break_minutes(n),
            Command::SetTotalCycles(n) => self.session.set_total_cycles(n),
            Command::SetPreset {
                work_minutes,
                break_minutes,
            } => self.session.set_preset(work_minutes, break_minutes),
            Command::LoadMedia(id) => self.session.load_media(id),
            Command::Resize { width, height } => {
                self.session.resize_player(width, height);
                self.session.view()
            }
            Command::Status => self.session.view(),
        }
    }

    fn publish(&mut self) {
        for event in self.session.drain_events() {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn sync_ticker(&mut self) {
        match (self.session.is_running(), self.ticker.is_some()) {
            (true, false) => self.spawn_ticker(),
            (false, true) => self.stop_ticker(),
            _ => {}
        }
    }

    fn spawn_ticker(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tick_tx.clone();
        let period = self.tick_interval;
        debug!(generation, "ticker started");
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else { break };
                if tx.send(Stimulus::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            self.generation += 1;
            debug!(generation = self.generation, "ticker stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::playback::{PlayerCall, RecordingPlayer};
    use crate::timer::{ManualClock, Phase, SessionConfig};

    const T0: u64 = 1_700_000_000_000;

    fn spawn(
        work: i64,
        brk: i64,
        cycles: i64,
    ) -> (SessionHandle, JoinHandle<FocusSession<RecordingPlayer>>, RecordingPlayer, ManualClock) {
        let player = RecordingPlayer::new();
        let time = ManualClock::new(T0);
        let session = FocusSession::new(
            SessionConfig::new(work, brk, cycles),
            player.clone(),
            Arc::new(time.clone()),
        );
        let (handle, task) = SessionRuntime::spawn(session, DEFAULT_TICK_INTERVAL);
        (handle, task, player, time)
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_drives_phase_boundary() {
        let (handle, _task, player, time) = spawn(10, 5, 2);
        handle.start().await.unwrap();

        time.advance_secs(10);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let view = handle.status().await.unwrap();
        assert_eq!(view.phase, Phase::Break);
        assert!(view.running);
        assert_eq!(player.last_call(), Some(PlayerCall::Pause));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticks_are_dropped() {
        let (handle, _task, _, time) = spawn(10, 5, 2);
        handle.start().await.unwrap();
        time.advance_secs(10);

        // A tick from a generation that no longer exists.
        handle.tx.send(Stimulus::Tick { generation: 0 }).unwrap();
        let view = handle.status().await.unwrap();
        assert_eq!(view.phase, Phase::Work);
        assert_eq!(view.remaining_secs, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_session_receives_no_ticks() {
        let (handle, _task, _, time) = spawn(10, 5, 2);
        handle.start().await.unwrap();
        handle.pause().await.unwrap();

        time.advance_secs(60);
        tokio::time::sleep(Duration::from_secs(5)).await;

        let view = handle.status().await.unwrap();
        assert_eq!(view.phase, Phase::Work);
        assert!(!view.running);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_ticker() {
        let (handle, _task, _, time) = spawn(10, 5, 2);
        handle.start().await.unwrap();
        let view = handle.reset().await.unwrap();
        assert!(!view.running);

        time.advance_secs(30);
        tokio::time::sleep(Duration::from_secs(3)).await;
        let view = handle.status().await.unwrap();
        assert_eq!(view.remaining_secs, 10);
        assert_eq!(view.phase, Phase::Work);
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_regained_snaps_in_one_step() {
        let (handle, _task, _, time) = spawn(10, 5, 3);
        handle.start().await.unwrap();
        time.advance_secs(3_600);
        handle.visibility_regained().unwrap();
        let view = handle.status().await.unwrap();
        assert_eq!(view.phase, Phase::Break);
        assert_eq!(view.cycle_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_broadcast() {
        let (handle, _task, _, _) = spawn(10, 5, 1);
        let mut events = handle.subscribe();
        handle.skip().await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), Event::PhaseSkipped { .. }));
        assert!(matches!(
            events.recv().await.unwrap(),
            Event::SessionCompleted { total_cycles: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn player_play_starts_session() {
        let (handle, _task, _, _) = spawn(10, 5, 2);
        handle.playback_state(1).unwrap();
        let view = handle.status().await.unwrap();
        assert!(view.running);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_returns_session() {
        let (handle, task, _, _) = spawn(10, 5, 2);
        handle.start().await.unwrap();
        let view = handle.shutdown().await.unwrap();
        assert!(!view.running);
        let session = task.await.unwrap();
        assert!(!session.is_running());
        assert!(matches!(handle.status().await, Err(CoreError::RuntimeClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handles_ends_runtime() {
        let (handle, task, _, _) = spawn(10, 5, 2);
        handle.start().await.unwrap();
        drop(handle);
        let session = task.await.unwrap();
        assert!(session.is_running());
    }
}
