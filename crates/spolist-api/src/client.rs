//! Web API client — typed calls for search, devices, now-playing and
//! transport commands.
//!
//! The client holds no state of its own beyond the HTTP connection pool and
//! the Session it borrows credentials from. Every failure is returned as a
//! `RemoteError`; a 401 triggers exactly one `Session::refresh` and one retry.

use std::future::Future;
use std::time::Duration;

use reqwest::{header, Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{
    Device, NowPlayingSnapshot, PageToken, Playlist, PlaylistPage, PlaylistSource,
    TransportCommand,
};
use crate::session::{Session, SessionError};

/// Page size used for playlist listings (the service maximum).
pub const PLAYLIST_PAGE_LIMIT: u32 = 50;

/// Upper bound on pages fetched for the user's own playlists.
pub const OWN_PLAYLISTS_MAX_PAGES: usize = 20;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("not authorized (credential invalid after refresh)")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Short text for banners and status lines.
    pub fn short(&self) -> String {
        match self {
            Self::Unauthorized => "needs re-auth".to_string(),
            Self::NotFound(what) => format!("not found: {}", what),
            Self::RateLimited {
                retry_after: Some(d),
            } => format!("rate limited, retry in {}s", d.as_secs()),
            Self::RateLimited { retry_after: None } => "rate limited".to_string(),
            Self::Rejected { message, .. } => message.clone(),
            Self::Unavailable(msg) => format!("unavailable: {}", msg),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<SessionError> for RemoteError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Network(e) => Self::Unavailable(e.to_string()),
            other => {
                warn!("session error: {}", other);
                Self::Unauthorized
            }
        }
    }
}

/// The remote catalog/playback capability the console drives.
pub trait Remote: Send + Sync + 'static {
    fn search_playlists(
        &self,
        query: &str,
        page: Option<PageToken>,
    ) -> impl Future<Output = Result<PlaylistPage, RemoteError>> + Send;

    fn list_own_playlists(
        &self,
        page: Option<PageToken>,
    ) -> impl Future<Output = Result<PlaylistPage, RemoteError>> + Send;

    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, RemoteError>> + Send;

    /// `Ok(None)` means nothing is playing anywhere.
    fn now_playing(
        &self,
    ) -> impl Future<Output = Result<Option<NowPlayingSnapshot>, RemoteError>> + Send;

    fn send_transport(
        &self,
        command: &TransportCommand,
        device_id: Option<&str>,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Fetch a complete playlist listing for `source`.
///
/// Search results stop after the first page; the user's own playlists are
/// followed until exhausted or `OWN_PLAYLISTS_MAX_PAGES` is reached. The
/// result is ordered by track count, largest first.
pub async fn collect_playlists<R: Remote>(
    remote: &R,
    source: &PlaylistSource,
) -> Result<Vec<Playlist>, RemoteError> {
    let mut out = Vec::new();
    match source {
        PlaylistSource::Search(query) => {
            let page = remote.search_playlists(query, None).await?;
            out.extend(page.items);
        }
        PlaylistSource::Own => {
            let mut token = None;
            for _ in 0..OWN_PLAYLISTS_MAX_PAGES {
                let page = remote.list_own_playlists(token).await?;
                out.extend(page.items);
                match page.next {
                    Some(next) => token = Some(next),
                    None => break,
                }
            }
        }
    }
    out.sort_by(|a, b| b.track_count.cmp(&a.track_count));
    Ok(out)
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    playlists: Option<PagingObject>,
}

#[derive(Debug, Deserialize)]
struct PagingObject {
    #[serde(default)]
    items: Vec<Option<PlaylistObject>>,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct PlaylistObject {
    id: String,
    name: String,
    #[serde(default)]
    uri: String,
    owner: Option<OwnerObject>,
    tracks: Option<TracksRef>,
}

#[derive(Debug, Deserialize)]
struct OwnerObject {
    display_name: Option<String>,
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct TracksRef {
    total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceObject>,
}

#[derive(Debug, Deserialize)]
struct DeviceObject {
    id: Option<String>,
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    is_active: bool,
    volume_percent: Option<u8>,
    #[serde(default)]
    supports_volume: bool,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    device: Option<DeviceObject>,
    #[serde(default)]
    shuffle_state: bool,
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<u64>,
    item: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album: Option<AlbumObject>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    name: String,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl PagingObject {
    fn into_page(self) -> PlaylistPage {
        let limit = if self.limit == 0 {
            PLAYLIST_PAGE_LIMIT
        } else {
            self.limit
        };
        let next = self.next.map(|_| PageToken {
            offset: self.offset + limit,
        });
        let items = self
            .items
            .into_iter()
            .flatten()
            .filter_map(PlaylistObject::into_playlist)
            .collect();
        PlaylistPage { items, next }
    }
}

impl PlaylistObject {
    /// Entries without a track total cannot be shown meaningfully.
    fn into_playlist(self) -> Option<Playlist> {
        let track_count = self.tracks?.total?;
        let owner = self
            .owner
            .map(|o| o.display_name.unwrap_or(o.id))
            .unwrap_or_default();
        Some(Playlist {
            id: self.id,
            name: self.name,
            track_count,
            owner,
            uri: self.uri,
        })
    }
}

impl DeviceObject {
    fn into_device(self) -> Option<Device> {
        Some(Device {
            id: self.id?,
            name: self.name,
            kind: self.kind,
            is_active: self.is_active,
            volume_percent: self.volume_percent,
            supports_volume: self.supports_volume,
        })
    }
}

impl PlayerResponse {
    fn into_snapshot(self) -> Option<NowPlayingSnapshot> {
        let item = self.item?;
        let (album, release_year) = match item.album {
            Some(a) => {
                let year = a
                    .release_date
                    .as_deref()
                    .and_then(|d| d.get(..4))
                    .and_then(|y| y.parse::<u16>().ok());
                (a.name, year)
            }
            None => (String::new(), None),
        };
        let (device_id, device_name, volume_percent) = match self.device {
            Some(d) => (
                d.id,
                Some(d.name),
                if d.supports_volume { d.volume_percent } else { None },
            ),
            None => (None, None, None),
        };
        Some(NowPlayingSnapshot {
            track: item.name,
            artists: item.artists.into_iter().map(|a| a.name).collect(),
            album,
            release_year,
            progress_ms: self.progress_ms.unwrap_or(0),
            duration_ms: item.duration_ms,
            is_playing: self.is_playing,
            shuffle: self.shuffle_state,
            device_id,
            device_name,
            volume_percent,
        })
    }
}

// ── HTTP client ───────────────────────────────────────────────────────────────

struct Request {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl Request {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            ..Self::get(path)
        }
    }

    fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    fn device(self, device_id: Option<&str>) -> Self {
        match device_id {
            Some(id) => self.query("device_id", id),
            None => self,
        }
    }

    fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct SpotifyClient<S> {
    http: reqwest::Client,
    base_url: String,
    market: String,
    session: S,
}

impl<S: Session> SpotifyClient<S> {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        market: impl Into<String>,
        session: S,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            market: market.into(),
            session,
        }
    }

    fn builder(&self, req: &Request, token: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, req.path);
        let mut builder = self
            .http
            .request(req.method.clone(), url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json");
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        match &req.body {
            Some(body) => builder.json(body),
            None if req.method != Method::GET => builder.header(header::CONTENT_LENGTH, 0),
            None => builder,
        }
    }

    /// Send `req`, refreshing the credential and retrying once on 401.
    async fn execute(&self, req: Request) -> Result<reqwest::Response, RemoteError> {
        let token = self.session.credential().await?;
        debug!("{} {}", req.method, req.path);
        let response = self.builder(&req, &token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        debug!("401 on {}, refreshing credential and retrying once", req.path);
        let token = self.session.refresh().await?;
        let response = self.builder(&req, &token).send().await?;
        check_status(response).await
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        req: Request,
    ) -> Result<T, RemoteError> {
        let response = self.execute(req).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("decode: {}", e)))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = response
        .json::<ErrorEnvelope>()
        .await
        .map(|e| e.error.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());

    warn!("remote returned {}: {}", status, message);
    Err(match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited { retry_after },
        s if s.is_server_error() => RemoteError::Unavailable(message),
        s => RemoteError::Rejected {
            status: s.as_u16(),
            message,
        },
    })
}

impl<S: Session + 'static> Remote for SpotifyClient<S> {
    async fn search_playlists(
        &self,
        query: &str,
        page: Option<PageToken>,
    ) -> Result<PlaylistPage, RemoteError> {
        let req = Request::get("/v1/search")
            .query("q", query)
            .query("type", "playlist")
            .query("limit", PLAYLIST_PAGE_LIMIT)
            .query("offset", page.unwrap_or_default().offset);
        let body: SearchResponse = self.fetch_json(req).await?;
        Ok(body
            .playlists
            .map(PagingObject::into_page)
            .unwrap_or_default())
    }

    async fn list_own_playlists(
        &self,
        page: Option<PageToken>,
    ) -> Result<PlaylistPage, RemoteError> {
        let req = Request::get("/v1/me/playlists")
            .query("limit", PLAYLIST_PAGE_LIMIT)
            .query("offset", page.unwrap_or_default().offset);
        let body: PagingObject = self.fetch_json(req).await?;
        Ok(body.into_page())
    }

    async fn list_devices(&self) -> Result<Vec<Device>, RemoteError> {
        let body: DevicesResponse = self.fetch_json(Request::get("/v1/me/player/devices")).await?;
        Ok(body
            .devices
            .into_iter()
            .filter_map(DeviceObject::into_device)
            .collect())
    }

    async fn now_playing(&self) -> Result<Option<NowPlayingSnapshot>, RemoteError> {
        let req = Request::get("/v1/me/player").query("market", &self.market);
        let response = self.execute(req).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body: PlayerResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("decode: {}", e)))?;
        Ok(body.into_snapshot())
    }

    async fn send_transport(
        &self,
        command: &TransportCommand,
        device_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        let req = match command {
            TransportCommand::Play { context_uri } => {
                let body = match context_uri {
                    Some(uri) => serde_json::json!({ "context_uri": uri }),
                    None => serde_json::json!({}),
                };
                Request::new(Method::PUT, "/v1/me/player/play").json(body)
            }
            TransportCommand::Pause => Request::new(Method::PUT, "/v1/me/player/pause"),
            TransportCommand::Next => Request::new(Method::POST, "/v1/me/player/next"),
            TransportCommand::Previous => Request::new(Method::POST, "/v1/me/player/previous"),
            TransportCommand::SetShuffle(on) => {
                Request::new(Method::PUT, "/v1/me/player/shuffle").query("state", on)
            }
            TransportCommand::SetVolume(percent) => {
                Request::new(Method::PUT, "/v1/me/player/volume")
                    .query("volume_percent", (*percent).min(100))
            }
        };
        self.execute(req.device(device_id)).await?;
        Ok(())
    }
}
