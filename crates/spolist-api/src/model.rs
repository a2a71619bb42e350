use serde::{Deserialize, Serialize};

/// A playlist as listed by search or by the user's own library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_count: u32,
    pub owner: String,
    /// Context URI used to start playback (`spotify:playlist:…`).
    pub uri: String,
}

/// A playback target reported by the device listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Device type tag ("Computer", "Smartphone", "Speaker", …).
    pub kind: String,
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u8>,
    #[serde(default)]
    pub supports_volume: bool,
}

/// Full view of remote now-playing state at one point in time.
///
/// Always replaced as a whole; never merged field by field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NowPlayingSnapshot {
    pub track: String,
    pub artists: Vec<String>,
    pub album: String,
    pub release_year: Option<u16>,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub shuffle: bool,
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub volume_percent: Option<u8>,
}

impl NowPlayingSnapshot {
    pub fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            "Unknown Artist".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// Opaque continuation for paged listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageToken {
    pub offset: u32,
}

/// One page of playlists plus the token for the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPage {
    pub items: Vec<Playlist>,
    pub next: Option<PageToken>,
}

/// Transport commands understood by the playback endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Resume, or start the given playlist context when `context_uri` is set.
    Play { context_uri: Option<String> },
    Pause,
    Next,
    Previous,
    SetShuffle(bool),
    /// Absolute target, 0–100.
    SetVolume(u8),
}

/// Command identity used for debouncing: play and pause are one toggle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    PlayPause,
    Next,
    Previous,
    Shuffle,
    Volume,
}

impl TransportCommand {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Play { .. } | Self::Pause => TransportKind::PlayPause,
            Self::Next => TransportKind::Next,
            Self::Previous => TransportKind::Previous,
            Self::SetShuffle(_) => TransportKind::Shuffle,
            Self::SetVolume(_) => TransportKind::Volume,
        }
    }

    /// Short label for log lines and status messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Pause => "pause",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::SetShuffle(_) => "shuffle",
            Self::SetVolume(_) => "volume",
        }
    }
}

/// Where a playlist listing comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSource {
    Search(String),
    Own,
}

/// Query typed at the search prompt that lists the user's own playlists.
pub const OWN_PLAYLISTS_SENTINEL: &str = "0";

impl PlaylistSource {
    /// Route a submitted query. `"0"` means "my playlists"; blank input is
    /// not a query at all.
    pub fn from_query(query: &str) -> Option<Self> {
        let q = query.trim();
        if q.is_empty() {
            None
        } else if q == OWN_PLAYLISTS_SENTINEL {
            Some(Self::Own)
        } else {
            Some(Self::Search(q.to_string()))
        }
    }
}
