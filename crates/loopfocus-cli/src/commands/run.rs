use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use loopfocus_core::error::PlaybackError;
use loopfocus_core::{
    ClockView, Command, Config, Database, Event, FocusSession, HistoryEntry, HistoryStore,
    MediaId, MediaMetadata, Phase, PlaybackCapability, PlaybackEvent, SessionHandle,
    SessionRuntime, SyncGuard, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Args)]
pub struct RunArgs {
    /// Video to loop (URL or id). Defaults to playback.default_media
    #[arg(long)]
    media: Option<String>,
    /// Work minutes (overrides config)
    #[arg(long)]
    work: Option<i64>,
    /// Break minutes (overrides config)
    #[arg(long = "break")]
    break_minutes: Option<i64>,
    /// Number of work periods (overrides config)
    #[arg(long)]
    cycles: Option<i64>,
    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

/// Stands in for an embedded player: reports each command on stdout.
struct LoggingPlayer;

impl PlaybackCapability for LoggingPlayer {
    fn load(&mut self, media_id: &MediaId) -> Result<(), PlaybackError> {
        println!("player: load {}", media_id.watch_url());
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        println!("player: play");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        println!("player: pause");
        Ok(())
    }
}

/// One line of interactive input.
#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Player(PlaybackEvent),
    PlayerState(i32),
    Preset(String),
    Resume,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let arg = words.next();
    let number = |name: &str| -> Result<i64, String> {
        arg.ok_or_else(|| format!("usage: {name} N"))?
            .parse::<i64>()
            .map_err(|e| format!("{name}: {e}"))
    };

    let input = match verb.as_str() {
        "start" => Input::Command(Command::Start),
        "pause" => Input::Command(Command::Pause),
        "toggle" | "t" => Input::Command(Command::Toggle),
        "reset" => Input::Command(Command::Reset),
        "skip" => Input::Command(Command::Skip),
        "status" | "s" => Input::Command(Command::Status),
        "work" => Input::Command(Command::SetWorkMinutes(number("work")?)),
        "break" => Input::Command(Command::SetBreakMinutes(number("break")?)),
        "cycles" => Input::Command(Command::SetTotalCycles(number("cycles")?)),
        "load" => {
            let url = arg.ok_or("usage: load URL")?;
            Input::Command(Command::LoadMedia(
                MediaId::parse(url).map_err(|e| e.to_string())?,
            ))
        }
        "preset" => Input::Preset(arg.ok_or("usage: preset NAME")?.to_string()),
        "state" => Input::PlayerState(
            i32::try_from(number("state")?).map_err(|_| "state: code out of range".to_string())?,
        ),
        "played" | "paused" | "ended" => Input::Player(verb.parse()?),
        "resume" => Input::Resume,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(format!("unknown command: {other} (try 'help')")),
    };
    Ok(input)
}

const HELP: &str = "\
commands:
  start | pause | toggle | reset | skip | status
  work N | break N | cycles N | preset NAME | load URL
  played | paused | ended | state N   (simulate the player)
  resume                              (host visible again)
  quit";

fn status_line(view: &ClockView) -> String {
    let state = match (view.phase, view.running) {
        (Phase::Complete, _) => "done",
        (_, true) => "running",
        (_, false) => "paused",
    };
    format!(
        "{} {} {} {state}",
        view.phase,
        view.cycle_label(),
        view.display_remaining()
    )
}

fn describe(event: &Event) -> Option<String> {
    match event {
        Event::WorkStarted {
            cycle_index,
            duration_secs,
            ..
        } => Some(format!(
            "work started (cycle {}, {} min)",
            cycle_index + 1,
            duration_secs / 60
        )),
        Event::BreakStarted { duration_secs, .. } => {
            Some(format!("break started ({}:{:02})", duration_secs / 60, duration_secs % 60))
        }
        Event::SessionCompleted { total_cycles, .. } => {
            Some(format!("session complete: {total_cycles} cycles done"))
        }
        Event::PhaseSkipped { from, to, .. } => Some(format!("skipped {from} -> {to}")),
        _ => None,
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    rt.block_on(run_session(config, args))
}

async fn run_session(config: Config, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut session_config = config.session_config();
    if let Some(work) = args.work {
        session_config = session_config.with_work_seconds(work.saturating_mul(60));
    }
    if let Some(minutes) = args.break_minutes {
        session_config = session_config.with_break_seconds(minutes.saturating_mul(60));
    }
    if let Some(cycles) = args.cycles {
        session_config = session_config.with_total_cycles(cycles);
    }

    let media = match args.media.as_deref().or(config.playback.default_media.as_deref()) {
        Some(raw) => Some(MediaId::parse(raw)?),
        None => None,
    };

    let session = FocusSession::with_guard(
        session_config,
        LoggingPlayer,
        Arc::new(SystemClock),
        SyncGuard::new(config.playback.echo_window_ms),
    );
    let (handle, task) = SessionRuntime::spawn(session, config.tick_interval());
    let printer = tokio::spawn(print_events(handle.subscribe(), args.json));

    if let Some(id) = media {
        remember(&config, &id);
        handle.send(Command::LoadMedia(id)).await?;
    }
    println!("{}", status_line(&handle.status().await?));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(Input::Quit) => break,
            Ok(input) => dispatch(&handle, &config, input).await?,
            Err(msg) => eprintln!("{msg}"),
        }
    }

    let view = handle.shutdown().await?;
    debug!(phase = %view.phase, "session shut down");
    drop(handle);
    task.await?;
    printer.await?;
    println!("{}", status_line(&view));
    Ok(())
}

async fn dispatch(
    handle: &SessionHandle,
    config: &Config,
    input: Input,
) -> Result<(), Box<dyn std::error::Error>> {
    match input {
        Input::Command(command) => {
            let view = handle.send(command).await?;
            println!("{}", status_line(&view));
        }
        Input::Preset(name) => match config.preset(&name) {
            Some(preset) => {
                let view = handle
                    .send(Command::SetPreset {
                        work_minutes: i64::from(preset.work_minutes),
                        break_minutes: i64::from(preset.break_minutes),
                    })
                    .await?;
                println!("{}", status_line(&view));
            }
            None => eprintln!("unknown preset: {name}"),
        },
        Input::Player(kind) => {
            handle.playback_event(kind)?;
            println!("{}", status_line(&handle.status().await?));
        }
        Input::PlayerState(raw) => {
            handle.playback_state(raw)?;
            println!("{}", status_line(&handle.status().await?));
        }
        Input::Resume => {
            handle.visibility_regained()?;
            println!("{}", status_line(&handle.status().await?));
        }
        Input::Help => println!("{HELP}"),
        Input::Quit => {}
    }
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<Event>, json: bool) {
    loop {
        match events.recv().await {
            Ok(event) if json => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => debug!(error = %e, "could not serialize event"),
            },
            Ok(event) => {
                if let Some(text) = describe(&event) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => debug!(skipped = n, "event printer lagged"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Record the video in the watch history. Failures only cost the history entry.
fn remember(config: &Config, id: &MediaId) {
    let result = Database::open().map_err(|e| e.to_string()).and_then(|db| {
        let store = HistoryStore::new(db, config.history.max_entries);
        store
            .update(|h| {
                let entry = match h.get(id) {
                    Some(existing) => HistoryEntry {
                        added_at: Utc::now(),
                        ..existing.clone()
                    },
                    None => HistoryEntry::new(id.clone(), MediaMetadata::placeholder(id), Utc::now()),
                };
                h.add(entry);
            })
            .map_err(|e| e.to_string())
    });
    match result {
        Ok(_) => info!(%id, "added to history"),
        Err(e) => tracing::warn!(%id, error = %e, "could not update history"),
    }
}
