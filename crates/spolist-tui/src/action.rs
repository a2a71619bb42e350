//! Action and Effect enums.
//!
//! The dispatcher turns key events into `Action`s; the screen state machine
//! consumes them and answers with `Effect`s, which the app executes against
//! the remote service. Nothing in here performs I/O.

use spolist_api::model::{PlaylistSource, TransportCommand};

/// Which screen is active, used for per-screen key tables and help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    SearchPrompt,
    ResultsList,
    DeviceList,
    Playback,
    Popup,
}

/// Transport keys on the playback screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportAction {
    PlayPause,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    Shuffle,
}

/// Per-screen commands produced by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Text entry ───────────────────────────────────────────────────────────
    Input(ratatui::crossterm::event::KeyEvent),
    Submit,

    // ── Lists ────────────────────────────────────────────────────────────────
    SelectUp,
    SelectDown,
    NextPage,
    PrevPage,
    /// Choose the highlighted row.
    Select,
    /// Choose the row numbered `n` (1-based, as typed).
    JumpTo(usize),

    // ── Playback ─────────────────────────────────────────────────────────────
    Transport(TransportAction),

    // ── System ───────────────────────────────────────────────────────────────
    Back,
    Quit,
    Help,
    DismissPopup,
}

/// Side effects requested by the state machine.
///
/// `request` and `session` are generation tokens: results carrying an old
/// token are discarded when they arrive.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchPlaylists {
        request: u64,
        source: PlaylistSource,
    },
    FetchDevices {
        request: u64,
    },
    StartMonitor {
        session: u64,
    },
    /// Stop the session's monitor. Pause goes out on the session's command
    /// queue, after anything already queued, and its outcome never reaches
    /// the state machine.
    EndPlayback {
        session: u64,
        device_id: Option<String>,
    },
    Transport {
        session: u64,
        command: TransportCommand,
        device_id: Option<String>,
    },
    Exit,
}
