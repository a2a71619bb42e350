//! Playback monitor.
//!
//! Two background tasks per playback session:
//! - the poller asks for the now-playing snapshot every interval, or
//!   immediately after a command completes;
//! - the command worker sends transport commands one at a time, in the order
//!   they were issued. Leaving playback queues a final pause behind them, so
//!   a play still in flight can never land after it.
//!
//! Results flow back to the app loop as `AppMessage`s tagged with the session
//! number. The app applies them to the `PlaybackView`, which is the only
//! place the snapshot lives; anything tagged with an older session is
//! dropped there.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use spolist_api::client::{Remote, RemoteError};
use spolist_api::config::PlaybackConfig;
use spolist_api::model::{Device, NowPlayingSnapshot, Playlist, TransportCommand, TransportKind};

use crate::action::TransportAction;
use crate::app::AppMessage;

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct PlaybackSettings {
    pub poll_interval: Duration,
    pub stale_after: u32,
    pub debounce: Duration,
    pub volume_step: u8,
}

impl PlaybackSettings {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(100)),
            stale_after: config.stale_after_failures.max(1),
            debounce: Duration::from_millis(config.debounce_ms),
            volume_step: config.volume_step.clamp(1, 100),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self::from_config(&PlaybackConfig::default())
    }
}

// ── Debounce ──────────────────────────────────────────────────────────────────

/// Drops a command when another of the same kind was issued less than
/// `window` ago. Holding a key therefore sends at most one command per window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last: HashMap<TransportKind, Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: HashMap::new(),
        }
    }

    /// Returns `true` and records `now` if the command may go out.
    pub fn admit(&mut self, kind: TransportKind, now: Instant) -> bool {
        if let Some(prev) = self.last.get(&kind) {
            if now.saturating_duration_since(*prev) < self.window {
                return false;
            }
        }
        self.last.insert(kind, now);
        true
    }
}

// ── Playback view ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NowPlaying {
    /// No poll has answered yet.
    Pending,
    /// The service reports nothing playing.
    Nothing,
    Track(NowPlayingSnapshot),
}

/// State of the playback screen.
#[derive(Debug, Clone)]
pub struct PlaybackView {
    pub session: u64,
    pub playlist: Playlist,
    pub device: Device,
    pub now: NowPlaying,
    /// Consecutive failed polls.
    pub failures: u32,
    pub stale: bool,
    pub needs_reauth: bool,
    /// Last command failure or refusal, cleared by the next success.
    pub notice: Option<String>,
    /// Kind of the last optimistic change not yet confirmed by a poll.
    pub pending: Option<TransportKind>,
    settings: PlaybackSettings,
    debouncer: Debouncer,
}

impl PlaybackView {
    pub fn new(session: u64, playlist: Playlist, device: Device, settings: PlaybackSettings) -> Self {
        Self {
            session,
            playlist,
            device,
            now: NowPlaying::Pending,
            failures: 0,
            stale: false,
            needs_reauth: false,
            notice: None,
            pending: None,
            debouncer: Debouncer::new(settings.debounce),
            settings,
        }
    }

    pub fn snapshot(&self) -> Option<&NowPlayingSnapshot> {
        match &self.now {
            NowPlaying::Track(s) => Some(s),
            _ => None,
        }
    }

    /// Device commands go to: wherever playback currently is, else the one
    /// picked from the list.
    pub fn target_device(&self) -> String {
        self.snapshot()
            .and_then(|s| s.device_id.clone())
            .unwrap_or_else(|| self.device.id.clone())
    }

    /// Apply one poll result. A successful answer replaces the snapshot as a
    /// whole, discarding any optimistic change.
    pub fn apply_poll(&mut self, result: Result<Option<NowPlayingSnapshot>, RemoteError>) {
        match result {
            Ok(answer) => {
                self.now = match answer {
                    Some(snapshot) => NowPlaying::Track(snapshot),
                    None => NowPlaying::Nothing,
                };
                self.failures = 0;
                self.stale = false;
                self.needs_reauth = false;
                self.pending = None;
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if e.is_auth() {
                    self.needs_reauth = true;
                }
                if self.failures >= self.settings.stale_after && !self.stale {
                    warn!(
                        "[monitor] {} consecutive poll failures, snapshot stale: {}",
                        self.failures, e
                    );
                    self.stale = true;
                } else {
                    debug!("[monitor] poll failed ({}): {}", self.failures, e);
                }
            }
        }
    }

    /// Turn a transport key into a command, or `None` when it is debounced or
    /// cannot be expressed. Predictable fields of the snapshot are updated
    /// locally right away.
    pub fn plan(&mut self, action: TransportAction, now: Instant) -> Option<TransportCommand> {
        let command = match action {
            TransportAction::PlayPause => {
                let playing = self.snapshot().is_some_and(|s| s.is_playing);
                if playing {
                    TransportCommand::Pause
                } else {
                    TransportCommand::Play { context_uri: None }
                }
            }
            TransportAction::Next => TransportCommand::Next,
            TransportAction::Previous => TransportCommand::Previous,
            TransportAction::Shuffle => {
                let shuffle = self.snapshot().is_some_and(|s| s.shuffle);
                TransportCommand::SetShuffle(!shuffle)
            }
            TransportAction::VolumeUp | TransportAction::VolumeDown => {
                let current = match self.current_volume() {
                    Ok(v) => v,
                    Err(reason) => {
                        self.notice = Some(reason.to_string());
                        return None;
                    }
                };
                let step = self.settings.volume_step;
                let target = if action == TransportAction::VolumeUp {
                    current.saturating_add(step).min(100)
                } else {
                    current.saturating_sub(step)
                };
                TransportCommand::SetVolume(target)
            }
        };

        if !self.debouncer.admit(command.kind(), now) {
            debug!("[monitor] debounced {}", command.label());
            return None;
        }

        if let NowPlaying::Track(snapshot) = &mut self.now {
            match &command {
                TransportCommand::Play { .. } => snapshot.is_playing = true,
                TransportCommand::Pause => snapshot.is_playing = false,
                TransportCommand::SetShuffle(on) => snapshot.shuffle = *on,
                TransportCommand::SetVolume(v) => snapshot.volume_percent = Some(*v),
                TransportCommand::Next | TransportCommand::Previous => {}
            }
            self.pending = Some(command.kind());
        }
        Some(command)
    }

    pub fn on_command_result(&mut self, command: &TransportCommand, result: Result<(), RemoteError>) {
        match result {
            Ok(()) => {
                self.notice = None;
            }
            Err(e) => {
                if e.is_auth() {
                    self.needs_reauth = true;
                }
                self.notice = Some(format!("{} failed: {}", command.label(), e.short()));
            }
        }
    }

    fn current_volume(&self) -> Result<u8, &'static str> {
        if !self.device.supports_volume {
            return Err("device does not support volume control");
        }
        self.snapshot()
            .and_then(|s| s.volume_percent)
            .or(self.device.volume_percent)
            .ok_or("volume not known yet")
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

/// Work for the command worker.
enum Job {
    Send(TransportCommand, Option<String>),
    /// Last job of a session: pause, then stop.
    Pause(Option<String>),
}

/// Handle to the tasks of one playback session.
pub struct MonitorHandle {
    session: u64,
    /// Ends the session: stops the poller, silences command results.
    ended: CancellationToken,
    /// Also drops queued commands.
    abort: CancellationToken,
    jobs: mpsc::UnboundedSender<Job>,
    worker: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Queue a command; commands of one session go out strictly in order.
    pub fn send(&self, command: TransportCommand, device_id: Option<String>) {
        if self.jobs.send(Job::Send(command, device_id)).is_err() {
            debug!("[monitor] session {} already stopped", self.session);
        }
    }

    /// Stop everything; queued commands are dropped.
    pub fn stop(&self) {
        self.ended.cancel();
        self.abort.cancel();
    }

    /// Stop polling and pause once the commands already queued have gone
    /// out. The returned task finishes after the pause.
    pub fn stop_with_pause(mut self, device_id: Option<String>) -> Option<JoinHandle<()>> {
        self.ended.cancel();
        if self.jobs.send(Job::Pause(device_id)).is_err() {
            debug!("[monitor] session {} worker gone, no pause", self.session);
            return None;
        }
        self.worker.take()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        // The worker is left to finish a queued pause.
        self.ended.cancel();
    }
}

pub fn spawn<R: Remote>(
    remote: Arc<R>,
    session: u64,
    interval: Duration,
    tx: mpsc::Sender<AppMessage>,
) -> MonitorHandle {
    let ended = CancellationToken::new();
    let abort = CancellationToken::new();
    let (wake_tx, wake_rx) = mpsc::channel::<()>(1);
    let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

    info!("[monitor] session {} started ({:?} interval)", session, interval);
    tokio::spawn(poll_loop(
        remote.clone(),
        session,
        interval,
        wake_rx,
        tx.clone(),
        ended.clone(),
    ));
    let worker = tokio::spawn(command_loop(
        remote,
        session,
        jobs_rx,
        wake_tx,
        tx,
        ended.clone(),
        abort.clone(),
    ));

    MonitorHandle {
        session,
        ended,
        abort,
        jobs: jobs_tx,
        worker: Some(worker),
    }
}

async fn poll_loop<R: Remote>(
    remote: Arc<R>,
    session: u64,
    interval: Duration,
    mut wake: mpsc::Receiver<()>,
    tx: mpsc::Sender<AppMessage>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(()) = wake.recv() => ticker.reset(),
            _ = ticker.tick() => {}
        }

        let result = remote.now_playing().await;
        // A poll that was in flight when the session ended is dropped here.
        if cancel.is_cancelled() {
            break;
        }
        if tx.send(AppMessage::Polled { session, result }).await.is_err() {
            break;
        }
    }
    debug!("[monitor] session {} poller stopped", session);
}

async fn command_loop<R: Remote>(
    remote: Arc<R>,
    session: u64,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    wake: mpsc::Sender<()>,
    tx: mpsc::Sender<AppMessage>,
    ended: CancellationToken,
    abort: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = abort.cancelled() => break,
            next = jobs.recv() => match next {
                Some(job) => job,
                None => break,
            },
        };

        let (command, device_id) = match job {
            Job::Send(command, device_id) => (command, device_id),
            Job::Pause(device_id) => {
                match remote
                    .send_transport(&TransportCommand::Pause, device_id.as_deref())
                    .await
                {
                    Ok(()) => debug!("[monitor] session {} paused on exit", session),
                    Err(e) => debug!("[monitor] pause on exit ignored: {}", e),
                }
                break;
            }
        };

        let result = remote.send_transport(&command, device_id.as_deref()).await;
        match &result {
            Ok(()) => debug!("[monitor] {} ok", command.label()),
            Err(e) => warn!("[monitor] {} failed: {}", command.label(), e),
        }
        // Once the session has ended keep draining towards the pause, but
        // nobody is listening for results any more.
        if ended.is_cancelled() {
            continue;
        }
        if result.is_ok() {
            // Early poll so the screen catches up without waiting a full
            // interval; a full channel means one is already queued.
            let _ = wake.try_send(());
        }
        if tx
            .send(AppMessage::CommandDone {
                session,
                command,
                result,
            })
            .await
            .is_err()
        {
            break;
        }
    }
    debug!("[monitor] session {} command worker stopped", session);
}
