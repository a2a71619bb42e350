//! App — event loop and effect runner.
//!
//! Architecture:
//! - `Navigator` owns all screen state; `Dispatcher` turns keys into actions.
//! - A `tokio::mpsc` channel carries `AppMessage` events in from the key
//!   reader and from background remote calls.
//! - The loop draws a frame, awaits the next message, applies it, repeats.
//! - The navigator answers with `Effect`s; `Effects` starts the matching
//!   background work, which reports back on the same channel.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use spolist_api::client::{collect_playlists, Remote, RemoteError};
use spolist_api::config::Config;
use spolist_api::model::{Device, NowPlayingSnapshot, Playlist, TransportCommand};

use crate::action::Effect;
use crate::keymap::{Dispatcher, KeyMap};
use crate::monitor::{self, MonitorHandle, PlaybackSettings};
use crate::screen::Navigator;
use crate::ui;

/// How long quitting waits for the best-effort pause to go out.
const PAUSE_ON_EXIT_TIMEOUT: Duration = Duration::from_secs(2);

// ── Internal event bus ────────────────────────────────────────────────────────

pub enum AppMessage {
    Event(Event),
    Playlists {
        request: u64,
        result: Result<Vec<Playlist>, RemoteError>,
    },
    Devices {
        request: u64,
        result: Result<Vec<Device>, RemoteError>,
    },
    Polled {
        session: u64,
        result: Result<Option<NowPlayingSnapshot>, RemoteError>,
    },
    CommandDone {
        session: u64,
        command: TransportCommand,
        result: Result<(), RemoteError>,
    },
}

// ── Effects ───────────────────────────────────────────────────────────────────

/// Carries out navigator effects against the remote service.
pub struct Effects<R: Remote> {
    remote: Arc<R>,
    tx: mpsc::Sender<AppMessage>,
    poll_interval: Duration,
    monitor: Option<MonitorHandle>,
    pause: Option<JoinHandle<()>>,
    exit: bool,
}

impl<R: Remote> Effects<R> {
    pub fn new(remote: Arc<R>, tx: mpsc::Sender<AppMessage>, poll_interval: Duration) -> Self {
        Self {
            remote,
            tx,
            poll_interval,
            monitor: None,
            pause: None,
            exit: false,
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }

    pub fn run(&mut self, effect: Effect) {
        match effect {
            Effect::FetchPlaylists { request, source } => {
                let remote = self.remote.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = collect_playlists(remote.as_ref(), &source).await;
                    if let Err(e) = &result {
                        warn!("[app] playlist listing failed: {}", e);
                    }
                    let _ = tx.send(AppMessage::Playlists { request, result }).await;
                });
            }
            Effect::FetchDevices { request } => {
                let remote = self.remote.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = remote.list_devices().await;
                    if let Err(e) = &result {
                        warn!("[app] device listing failed: {}", e);
                    }
                    let _ = tx.send(AppMessage::Devices { request, result }).await;
                });
            }
            Effect::StartMonitor { session } => {
                if let Some(old) = self.monitor.take() {
                    old.stop();
                }
                self.monitor = Some(monitor::spawn(
                    self.remote.clone(),
                    session,
                    self.poll_interval,
                    self.tx.clone(),
                ));
            }
            Effect::EndPlayback { session, device_id } => match self.monitor.take() {
                Some(handle) if handle.session() == session => {
                    info!("[app] monitor for session {} stopped", session);
                    self.pause = handle.stop_with_pause(device_id);
                }
                other => {
                    debug!("[app] no monitor for ended session {}", session);
                    self.monitor = other;
                }
            },
            Effect::Transport {
                session,
                command,
                device_id,
            } => match &self.monitor {
                Some(handle) if handle.session() == session => handle.send(command, device_id),
                _ => debug!("[app] {} for ended session {} dropped", command.label(), session),
            },
            Effect::Exit => {
                self.exit = true;
            }
        }
    }

    /// Stop background work; give an outstanding pause a moment to land.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.monitor.take() {
            handle.stop();
        }
        if let Some(pause) = self.pause.take() {
            if tokio::time::timeout(PAUSE_ON_EXIT_TIMEOUT, pause).await.is_err() {
                warn!("[app] pause on exit timed out");
            }
        }
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App<R: Remote> {
    nav: Navigator,
    dispatcher: Dispatcher,
    effects: Effects<R>,
    rx: mpsc::Receiver<AppMessage>,
    tx: mpsc::Sender<AppMessage>,
    too_small: bool,
}

impl<R: Remote> App<R> {
    pub fn new(config: &Config, remote: R) -> Self {
        let (tx, rx) = mpsc::channel::<AppMessage>(1024);
        let settings = PlaybackSettings::from_config(&config.playback);
        Self {
            nav: Navigator::new(config.ui.page_size, settings),
            dispatcher: Dispatcher::new(KeyMap::from_config(&config.keys)),
            effects: Effects::new(Arc::new(remote), tx.clone(), settings.poll_interval),
            rx,
            tx,
            too_small: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let size = terminal.size()?;
        self.too_small = !ui::fits(size.width, size.height);
        debug!("run(): terminal created, size={:?}", size);

        // ── Background task: keyboard/resize events ───────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Main loop ─────────────────────────────────────────────────────────
        let result = self.event_loop(&mut terminal).await;

        // ── Teardown ──────────────────────────────────────────────────────────
        self.effects.shutdown().await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("spolist stopped");

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        loop {
            terminal.draw(|f| ui::draw(f, &self.nav, &self.dispatcher))?;

            if self.effects.exit_requested() || self.nav.exited() {
                return Ok(());
            }

            let Some(msg) = self.rx.recv().await else {
                return Ok(());
            };
            self.handle_message(msg);

            // Apply whatever else is already queued before redrawing.
            while let Ok(msg) = self.rx.try_recv() {
                self.handle_message(msg);
                if self.effects.exit_requested() {
                    break;
                }
            }
        }
    }

    // ── Message handler ───────────────────────────────────────────────────────

    fn handle_message(&mut self, msg: AppMessage) {
        let before = self.nav.kind();
        self.apply_message(msg);
        // Typed digits belong to the list they were typed on.
        if self.nav.kind() != before {
            self.dispatcher.reset();
        }
    }

    fn apply_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }
                if self.too_small {
                    if self.dispatcher.dispatch_minimal(key).is_some() {
                        let effects = self.nav.quit();
                        self.apply(effects);
                    }
                    return;
                }
                let kind = self.nav.kind();
                if let Some(action) = self.dispatcher.dispatch(kind, key) {
                    debug!("[app] {:?} on {:?}", action, kind);
                    let effects = self.nav.handle(action, Instant::now());
                    self.apply(effects);
                }
            }
            AppMessage::Event(Event::Resize(w, h)) => {
                self.too_small = !ui::fits(w, h);
            }
            AppMessage::Event(_) => {}
            AppMessage::Playlists { request, result } => self.nav.on_playlists(request, result),
            AppMessage::Devices { request, result } => self.nav.on_devices(request, result),
            AppMessage::Polled { session, result } => self.nav.on_poll(session, result),
            AppMessage::CommandDone {
                session,
                command,
                result,
            } => self.nav.on_command_done(session, &command, result),
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.effects.run(effect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ScreenKind;
    use crate::testing::{device, playlist, FakeRemote};
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use spolist_api::model::PlaylistSource;

    async fn next(rx: &mut mpsc::Receiver<AppMessage>) -> AppMessage {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("message within 2s")
            .expect("channel open")
    }

    fn press(app: &mut App<FakeRemote>, code: KeyCode) {
        app.handle_message(AppMessage::Event(Event::Key(KeyEvent::new(
            code,
            KeyModifiers::NONE,
        ))));
    }

    #[tokio::test]
    async fn test_digits_cleared_when_listing_changes_screen() {
        let mut app = App::new(&Config::default(), FakeRemote::new());
        for c in "jazz".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        app.handle_message(AppMessage::Playlists {
            request: 1,
            result: Ok(vec![playlist("a", 3), playlist("b", 2)]),
        });
        assert_eq!(app.nav.kind(), ScreenKind::ResultsList);

        // Pick a playlist, then type a digit while devices load.
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.dispatcher.pending_number(), "2");

        app.handle_message(AppMessage::Devices {
            request: 2,
            result: Ok(vec![device("d1"), device("d2")]),
        });
        assert_eq!(app.nav.kind(), ScreenKind::DeviceList);
        assert_eq!(app.dispatcher.pending_number(), "");
    }

    #[tokio::test]
    async fn test_own_playlists_effect_never_searches() {
        let remote = Arc::new(FakeRemote::new());
        *remote.playlists.lock().unwrap() = vec![playlist("small", 2), playlist("big", 9)];
        let (tx, mut rx) = mpsc::channel(16);
        let mut effects = Effects::new(remote.clone(), tx, Duration::from_secs(60));

        effects.run(Effect::FetchPlaylists {
            request: 7,
            source: PlaylistSource::Own,
        });
        match next(&mut rx).await {
            AppMessage::Playlists { request, result } => {
                assert_eq!(request, 7);
                let ids: Vec<String> = result.unwrap().into_iter().map(|p| p.id).collect();
                assert_eq!(ids, vec!["big", "small"]);
            }
            _ => panic!("expected playlists"),
        }
        assert_eq!(remote.calls(), vec!["own"]);
    }

    #[tokio::test]
    async fn test_monitor_polls_until_stopped() {
        let remote = Arc::new(FakeRemote::new());
        let (tx, mut rx) = mpsc::channel(64);
        let mut effects = Effects::new(remote.clone(), tx, Duration::from_millis(20));

        effects.run(Effect::StartMonitor { session: 3 });
        for _ in 0..2 {
            match next(&mut rx).await {
                AppMessage::Polled { session, result } => {
                    assert_eq!(session, 3);
                    assert!(result.unwrap().is_none());
                }
                _ => panic!("expected poll"),
            }
        }

        effects.run(Effect::EndPlayback {
            session: 3,
            device_id: Some("d".into()),
        });
        tokio::time::sleep(Duration::from_millis(60)).await;
        while rx.try_recv().is_ok() {}
        let polls = remote.count("now_playing");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(remote.count("now_playing"), polls);
        assert!(rx.try_recv().is_err());
        assert_eq!(remote.sent(), vec![TransportCommand::Pause]);
    }

    #[tokio::test]
    async fn test_commands_keep_order_and_trigger_early_poll() {
        let remote = Arc::new(FakeRemote::new());
        let (tx, mut rx) = mpsc::channel(64);
        // Long interval: only the immediate first tick and early polls happen.
        let mut effects = Effects::new(remote.clone(), tx, Duration::from_secs(60));

        effects.run(Effect::StartMonitor { session: 1 });
        for command in [TransportCommand::Next, TransportCommand::Previous] {
            effects.run(Effect::Transport {
                session: 1,
                command,
                device_id: Some("d".into()),
            });
        }
        // Commands for another session are dropped.
        effects.run(Effect::Transport {
            session: 9,
            command: TransportCommand::Pause,
            device_id: None,
        });

        let mut done = Vec::new();
        let mut polls = 0;
        while done.len() < 2 || polls < 2 {
            match next(&mut rx).await {
                AppMessage::CommandDone {
                    session, command, ..
                } => {
                    assert_eq!(session, 1);
                    done.push(command);
                }
                AppMessage::Polled { .. } => polls += 1,
                _ => panic!("unexpected message"),
            }
        }
        assert_eq!(done, vec![TransportCommand::Next, TransportCommand::Previous]);
        assert_eq!(
            remote.sent(),
            vec![TransportCommand::Next, TransportCommand::Previous]
        );
        effects.shutdown().await;
    }

    #[tokio::test]
    async fn test_pause_on_exit_is_awaited_and_errors_ignored() {
        let remote = Arc::new(FakeRemote::new());
        *remote.transport.lock().unwrap() = Err(RemoteError::Unavailable("down".into()));
        let (tx, _rx) = mpsc::channel(4);
        let mut effects = Effects::new(remote.clone(), tx, Duration::from_secs(60));

        effects.run(Effect::StartMonitor { session: 1 });
        effects.run(Effect::EndPlayback {
            session: 1,
            device_id: Some("d".into()),
        });
        effects.run(Effect::Exit);
        assert!(effects.exit_requested());
        effects.shutdown().await;
        assert_eq!(remote.sent(), vec![TransportCommand::Pause]);
    }

    #[tokio::test]
    async fn test_exit_pause_lands_after_play_in_flight() {
        let remote = Arc::new(FakeRemote::new());
        *remote.play_delay.lock().unwrap() = Duration::from_millis(100);
        let (tx, _rx) = mpsc::channel(16);
        let mut effects = Effects::new(remote.clone(), tx, Duration::from_secs(60));

        effects.run(Effect::StartMonitor { session: 1 });
        effects.run(Effect::Transport {
            session: 1,
            command: TransportCommand::Play {
                context_uri: Some("spotify:playlist:a".into()),
            },
            device_id: Some("d".into()),
        });
        // Leave while the play is still on the wire.
        tokio::time::sleep(Duration::from_millis(20)).await;
        effects.run(Effect::EndPlayback {
            session: 1,
            device_id: Some("d".into()),
        });
        effects.shutdown().await;

        assert_eq!(
            remote.sent(),
            vec![
                TransportCommand::Play {
                    context_uri: Some("spotify:playlist:a".into())
                },
                TransportCommand::Pause,
            ]
        );
    }

    #[tokio::test]
    async fn test_device_listing_round_trip() {
        let remote = Arc::new(FakeRemote::new());
        *remote.devices.lock().unwrap() = Ok(vec![device("a"), device("b")]);
        let (tx, mut rx) = mpsc::channel(4);
        let mut effects = Effects::new(remote.clone(), tx, Duration::from_secs(60));

        effects.run(Effect::FetchDevices { request: 2 });
        match next(&mut rx).await {
            AppMessage::Devices { request, result } => {
                assert_eq!(request, 2);
                assert_eq!(result.unwrap().len(), 2);
            }
            _ => panic!("expected devices"),
        }
    }
}
