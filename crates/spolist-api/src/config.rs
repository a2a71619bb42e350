use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub keys: KeyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    /// Market passed to now-playing queries ("from_token" = the user's own).
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Credentials used only to refresh an already-cached token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Overridden by `SPOTIPY_CLIENT_ID` when set.
    #[serde(default)]
    pub client_id: String,
    /// Overridden by `SPOTIPY_CLIENT_SECRET` when set.
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Consecutive failed polls before the snapshot is shown as stale.
    #[serde(default = "default_stale_after_failures")]
    pub stale_after_failures: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Percent added/removed per volume keypress.
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Key table. Each entry is a list of key names such as `"enter"`, `"p"`,
/// `"left"` or `"ctrl+c"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default = "default_play_pause")]
    pub play_pause: Vec<String>,
    #[serde(default = "default_next_track")]
    pub next_track: Vec<String>,
    #[serde(default = "default_prev_track")]
    pub prev_track: Vec<String>,
    #[serde(default = "default_volume_up")]
    pub volume_up: Vec<String>,
    #[serde(default = "default_volume_down")]
    pub volume_down: Vec<String>,
    #[serde(default = "default_shuffle")]
    pub shuffle: Vec<String>,
    #[serde(default = "default_back")]
    pub back: Vec<String>,
    #[serde(default = "default_quit")]
    pub quit: Vec<String>,
    #[serde(default = "default_help")]
    pub help: Vec<String>,
    #[serde(default = "default_next_page")]
    pub next_page: Vec<String>,
    #[serde(default = "default_prev_page")]
    pub prev_page: Vec<String>,
    #[serde(default = "default_select_down")]
    pub select_down: Vec<String>,
    #[serde(default = "default_select_up")]
    pub select_up: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            accounts_url: default_accounts_url(),
            market: default_market(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            cache_path: default_cache_path(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            stale_after_failures: default_stale_after_failures(),
            debounce_ms: default_debounce_ms(),
            volume_step: default_volume_step(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            play_pause: default_play_pause(),
            next_track: default_next_track(),
            prev_track: default_prev_track(),
            volume_up: default_volume_up(),
            volume_down: default_volume_down(),
            shuffle: default_shuffle(),
            back: default_back(),
            quit: default_quit(),
            help: default_help(),
            next_page: default_next_page(),
            prev_page: default_prev_page(),
            select_down: default_select_down(),
            select_up: default_select_up(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_market() -> String {
    "from_token".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_cache_path() -> PathBuf {
    platform::token_cache_path()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_stale_after_failures() -> u32 {
    3
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_volume_step() -> u8 {
    5
}

fn default_page_size() -> usize {
    10
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn default_play_pause() -> Vec<String> {
    keys(&["enter", "p"])
}

fn default_next_track() -> Vec<String> {
    keys(&["right", "l"])
}

fn default_prev_track() -> Vec<String> {
    keys(&["left", "h"])
}

fn default_volume_up() -> Vec<String> {
    keys(&["up", "k"])
}

fn default_volume_down() -> Vec<String> {
    keys(&["down", "j"])
}

fn default_shuffle() -> Vec<String> {
    keys(&["s"])
}

fn default_back() -> Vec<String> {
    keys(&["esc", "q"])
}

fn default_quit() -> Vec<String> {
    keys(&["x", "ctrl+c"])
}

fn default_help() -> Vec<String> {
    keys(&["?", "f1"])
}

fn default_next_page() -> Vec<String> {
    keys(&["right", "l"])
}

fn default_prev_page() -> Vec<String> {
    keys(&["left", "h"])
}

fn default_select_down() -> Vec<String> {
    keys(&["down", "j"])
}

fn default_select_up() -> Vec<String> {
    keys(&["up", "k"])
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Apply `SPOTIPY_CLIENT_ID` / `SPOTIPY_CLIENT_SECRET` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(id) = std::env::var("SPOTIPY_CLIENT_ID") {
            if !id.is_empty() {
                self.auth.client_id = id;
            }
        }
        if let Ok(secret) = std::env::var("SPOTIPY_CLIENT_SECRET") {
            if !secret.is_empty() {
                self.auth.client_secret = secret;
            }
        }
        self
    }
}
