mod action;
mod app;
mod components;
mod keymap;
mod monitor;
mod screen;
mod theme;
mod ui;
mod widgets;

#[cfg(test)]
mod testing;

use std::time::Duration;

use spolist_api::client::SpotifyClient;
use spolist_api::config::Config;
use spolist_api::session::TokenCacheSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = spolist_api::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = spolist_api::platform::log_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; HTTP client internals stay at warn.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("spolist log: {}", log_path.display());

    tracing::info!("spolist starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config unreadable, using defaults: {}", e);
            Config::default()
        }
    }
    .with_env_overrides();

    // ── Remote client ────────────────────────────────────────────────────────
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.request_timeout_secs))
        .build()?;
    let session = TokenCacheSession::from_config(http.clone(), &config);
    if !session.cache_path().exists() {
        anyhow::bail!(
            "no cached Spotify login at {}; sign in once with another Spotify Web API \
             client (for example spotipy) so the cache file exists, then start spolist again",
            session.cache_path().display()
        );
    }
    tracing::info!("token cache: {}", session.cache_path().display());
    let client = SpotifyClient::new(
        http,
        config.api.base_url.clone(),
        config.api.market.clone(),
        session,
    );

    app::App::new(&config, client).run().await
}
