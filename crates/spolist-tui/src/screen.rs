//! Screen state machine.
//!
//! `Navigator` owns the active `Screen` and is the only thing that changes
//! it. Every input is an `Action` (from the keyboard) or a completed remote
//! call (from a background task); the answer is a list of `Effect`s for the
//! app to carry out. No I/O happens here, so every transition can be tested
//! synchronously.
//!
//! ```text
//!  SearchPrompt ──submit──▶ ResultsList ──select──▶ DeviceList ──select──▶ Playback
//!       ▲                      │                       │                      │
//!       └──────── back ────────┴───────────────────────┴──────── back ────────┘
//!  any ──help──▶ Popup ──any key──▶ previous screen
//! ```

use std::time::Instant;

use tracing::{debug, info};
use tui_input::{backend::crossterm::EventHandler, Input};

use spolist_api::client::RemoteError;
use spolist_api::model::{Device, NowPlayingSnapshot, Playlist, PlaylistSource, TransportCommand};

use crate::action::{Action, Effect, ScreenKind};
use crate::monitor::{PlaybackSettings, PlaybackView};
use crate::widgets::paged_list::PagedList;

// ── Screens ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SearchPrompt {
    pub input: Input,
    /// Inline hint under the prompt (empty query, cancelled search, …).
    pub hint: Option<String>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub struct ResultsList {
    pub list: PagedList<Playlist>,
    pub query: String,
    /// Playlist whose device listing is in flight.
    pub pending: Option<Playlist>,
}

#[derive(Debug, Clone)]
pub struct DeviceList {
    pub list: PagedList<Device>,
    pub playlist: Playlist,
}

#[derive(Debug, Clone)]
pub struct Popup {
    pub ret: Box<Screen>,
}

#[derive(Debug, Clone)]
pub enum Screen {
    SearchPrompt(SearchPrompt),
    ResultsList(ResultsList),
    DeviceList(DeviceList),
    Playback(PlaybackView),
    Popup(Popup),
}

impl Screen {
    pub fn kind(&self) -> ScreenKind {
        match self {
            Self::SearchPrompt(_) => ScreenKind::SearchPrompt,
            Self::ResultsList(_) => ScreenKind::ResultsList,
            Self::DeviceList(_) => ScreenKind::DeviceList,
            Self::Playback(_) => ScreenKind::Playback,
            Self::Popup(_) => ScreenKind::Popup,
        }
    }
}

// ── Navigator ─────────────────────────────────────────────────────────────────

pub struct Navigator {
    screen: Screen,
    page_size: usize,
    settings: PlaybackSettings,
    /// Generation counter for search and device requests.
    request: u64,
    in_flight: Option<u64>,
    /// Generation counter for playback sessions.
    session: u64,
    /// Error from the last failed listing, shown until the next key.
    banner: Option<String>,
    exited: bool,
}

impl Navigator {
    pub fn new(page_size: usize, settings: PlaybackSettings) -> Self {
        Self {
            screen: Screen::SearchPrompt(SearchPrompt::default()),
            page_size: page_size.max(1),
            settings,
            request: 0,
            in_flight: None,
            session: 0,
            banner: None,
            exited: false,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn kind(&self) -> ScreenKind {
        self.screen.kind()
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn exited(&self) -> bool {
        self.exited
    }

    /// The screen under the popup, or the active one.
    fn base_mut(&mut self) -> &mut Screen {
        match &mut self.screen {
            Screen::Popup(p) => p.ret.as_mut(),
            other => other,
        }
    }

    fn base(&self) -> &Screen {
        match &self.screen {
            Screen::Popup(p) => p.ret.as_ref(),
            other => other,
        }
    }

    /// Replace the screen under any popup. Abandons in-flight listings.
    fn enter(&mut self, next: Screen) {
        self.in_flight = None;
        debug!("[screen] -> {:?}", next.kind());
        *self.base_mut() = next;
    }

    fn next_request(&mut self) -> u64 {
        self.request += 1;
        self.in_flight = Some(self.request);
        self.request
    }

    // ── Keyboard ──────────────────────────────────────────────────────────────

    pub fn handle(&mut self, action: Action, now: Instant) -> Vec<Effect> {
        if self.exited {
            return Vec::new();
        }
        if self.no_devices() && action != Action::Back {
            return Vec::new();
        }
        if !matches!(action, Action::Help | Action::DismissPopup) {
            self.banner = None;
        }

        match action {
            Action::Help => {
                if !matches!(self.screen, Screen::Popup(_)) {
                    let ret = std::mem::replace(
                        &mut self.screen,
                        Screen::SearchPrompt(SearchPrompt::default()),
                    );
                    self.screen = Screen::Popup(Popup { ret: Box::new(ret) });
                }
                return Vec::new();
            }
            Action::DismissPopup => {
                if let Screen::Popup(p) = &mut self.screen {
                    let ret = std::mem::replace(
                        p.ret.as_mut(),
                        Screen::SearchPrompt(SearchPrompt::default()),
                    );
                    self.screen = ret;
                }
                return Vec::new();
            }
            Action::Quit => return self.quit(),
            _ => {}
        }

        match self.kind() {
            ScreenKind::SearchPrompt => self.on_search_prompt(action),
            ScreenKind::ResultsList => self.on_results(action),
            ScreenKind::DeviceList => self.on_devices_screen(action),
            ScreenKind::Playback => self.on_playback(action, now),
            ScreenKind::Popup => Vec::new(),
        }
    }

    /// The device picker came back empty; only Back leaves it.
    fn no_devices(&self) -> bool {
        matches!(&self.screen, Screen::DeviceList(d) if d.list.is_empty())
    }

    /// Leave from any screen, pausing first if playback is running.
    pub fn quit(&mut self) -> Vec<Effect> {
        if self.exited {
            return Vec::new();
        }
        let mut effects = self.leave_playback();
        effects.push(Effect::Exit);
        self.exited = true;
        info!("[screen] exit requested");
        effects
    }

    fn leave_playback(&mut self) -> Vec<Effect> {
        match self.base() {
            Screen::Playback(view) => vec![Effect::EndPlayback {
                session: view.session,
                device_id: Some(view.target_device()),
            }],
            _ => Vec::new(),
        }
    }

    fn on_search_prompt(&mut self, action: Action) -> Vec<Effect> {
        let Screen::SearchPrompt(prompt) = &mut self.screen else {
            return Vec::new();
        };
        match action {
            Action::Input(key) => {
                if !prompt.loading {
                    prompt
                        .input
                        .handle_event(&ratatui::crossterm::event::Event::Key(key));
                    prompt.hint = None;
                }
                Vec::new()
            }
            Action::Submit => {
                if prompt.loading {
                    return Vec::new();
                }
                match PlaylistSource::from_query(prompt.input.value()) {
                    None => {
                        prompt.hint =
                            Some("type a search term, or 0 for your own playlists".to_string());
                        Vec::new()
                    }
                    Some(source) => {
                        prompt.loading = true;
                        prompt.hint = None;
                        let request = self.next_request();
                        info!("[screen] search #{}: {:?}", request, source);
                        vec![Effect::FetchPlaylists { request, source }]
                    }
                }
            }
            Action::Back => {
                if prompt.loading {
                    prompt.loading = false;
                    prompt.hint = Some("search cancelled".to_string());
                    self.in_flight = None;
                    Vec::new()
                } else {
                    self.quit()
                }
            }
            _ => Vec::new(),
        }
    }

    fn on_results(&mut self, action: Action) -> Vec<Effect> {
        if action == Action::Back {
            self.enter(Screen::SearchPrompt(SearchPrompt::default()));
            return Vec::new();
        }
        let Screen::ResultsList(results) = &mut self.screen else {
            return Vec::new();
        };
        let chosen = match action {
            Action::SelectUp => {
                results.list.move_selection(-1);
                None
            }
            Action::SelectDown => {
                results.list.move_selection(1);
                None
            }
            Action::NextPage => {
                results.list.next_page();
                None
            }
            Action::PrevPage => {
                results.list.prev_page();
                None
            }
            Action::Select => results.list.selected_item().cloned(),
            Action::JumpTo(n) => match results.list.jump_to(n) {
                Ok(p) => Some(p.clone()),
                Err(e) => {
                    debug!("[screen] {}", e);
                    None
                }
            },
            _ => None,
        };

        match chosen {
            Some(playlist) if results.pending.is_none() => {
                info!("[screen] playlist chosen: {}", playlist.name);
                results.pending = Some(playlist);
                let request = self.next_request();
                vec![Effect::FetchDevices { request }]
            }
            _ => Vec::new(),
        }
    }

    fn on_devices_screen(&mut self, action: Action) -> Vec<Effect> {
        if action == Action::Back {
            self.enter(Screen::SearchPrompt(SearchPrompt::default()));
            return Vec::new();
        }
        let Screen::DeviceList(devices) = &mut self.screen else {
            return Vec::new();
        };
        // With no devices only cancel does anything.
        if devices.list.is_empty() {
            return Vec::new();
        }
        let chosen = match action {
            Action::SelectUp => {
                devices.list.move_selection(-1);
                None
            }
            Action::SelectDown => {
                devices.list.move_selection(1);
                None
            }
            Action::NextPage => {
                devices.list.next_page();
                None
            }
            Action::PrevPage => {
                devices.list.prev_page();
                None
            }
            Action::Select => devices.list.selected_item().cloned(),
            Action::JumpTo(n) => devices.list.jump_to(n).ok().cloned(),
            _ => None,
        };
        let Some(device) = chosen else {
            return Vec::new();
        };

        let playlist = devices.playlist.clone();
        self.session += 1;
        let session = self.session;
        info!(
            "[screen] playback session {}: '{}' on '{}'",
            session, playlist.name, device.name
        );
        let effects = vec![
            Effect::StartMonitor { session },
            Effect::Transport {
                session,
                command: TransportCommand::Play {
                    context_uri: Some(playlist.uri.clone()),
                },
                device_id: Some(device.id.clone()),
            },
        ];
        self.enter(Screen::Playback(PlaybackView::new(
            session,
            playlist,
            device,
            self.settings,
        )));
        effects
    }

    fn on_playback(&mut self, action: Action, now: Instant) -> Vec<Effect> {
        if action == Action::Back {
            let effects = self.leave_playback();
            self.enter(Screen::SearchPrompt(SearchPrompt::default()));
            return effects;
        }
        let Screen::Playback(view) = &mut self.screen else {
            return Vec::new();
        };
        let Action::Transport(transport) = action else {
            return Vec::new();
        };
        match view.plan(transport, now) {
            Some(command) => vec![Effect::Transport {
                session: view.session,
                command,
                device_id: Some(view.target_device()),
            }],
            None => Vec::new(),
        }
    }

    // ── Remote results ────────────────────────────────────────────────────────

    fn accept(&mut self, request: u64) -> bool {
        if self.in_flight != Some(request) {
            debug!("[screen] dropping stale response #{}", request);
            return false;
        }
        self.in_flight = None;
        true
    }

    pub fn on_playlists(&mut self, request: u64, result: Result<Vec<Playlist>, RemoteError>) {
        if !self.accept(request) {
            return;
        }
        let page_size = self.page_size;
        let Screen::SearchPrompt(prompt) = self.base_mut() else {
            return;
        };
        prompt.loading = false;
        match result {
            Ok(playlists) => {
                let query = prompt.input.value().trim().to_string();
                info!("[screen] {} playlists for '{}'", playlists.len(), query);
                self.enter(Screen::ResultsList(ResultsList {
                    list: PagedList::with_items(page_size, playlists),
                    query,
                    pending: None,
                }));
            }
            Err(e) => {
                prompt.hint = Some(format!("search failed: {}", e.short()));
                self.banner = Some(e.short());
            }
        }
    }

    pub fn on_devices(&mut self, request: u64, result: Result<Vec<Device>, RemoteError>) {
        if !self.accept(request) {
            return;
        }
        let page_size = self.page_size;
        let Screen::ResultsList(results) = self.base_mut() else {
            return;
        };
        let Some(playlist) = results.pending.take() else {
            return;
        };
        let devices = match result {
            Ok(devices) => devices,
            Err(RemoteError::NotFound(_)) => Vec::new(),
            Err(e) => {
                self.banner = Some(format!("could not list devices: {}", e.short()));
                return;
            }
        };
        info!("[screen] {} devices", devices.len());
        self.enter(Screen::DeviceList(DeviceList {
            list: PagedList::with_items(page_size, devices),
            playlist,
        }));
    }

    pub fn on_poll(&mut self, session: u64, result: Result<Option<NowPlayingSnapshot>, RemoteError>) {
        match self.base_mut() {
            Screen::Playback(view) if view.session == session => view.apply_poll(result),
            _ => debug!("[screen] dropping poll for ended session {}", session),
        }
    }

    pub fn on_command_done(
        &mut self,
        session: u64,
        command: &TransportCommand,
        result: Result<(), RemoteError>,
    ) {
        match self.base_mut() {
            Screen::Playback(view) if view.session == session => {
                view.on_command_result(command, result)
            }
            _ => debug!(
                "[screen] dropping {} result for ended session {}",
                command.label(),
                session
            ),
        }
    }
}
