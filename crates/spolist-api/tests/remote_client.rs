//! Integration tests for the Web API client against an in-process mock
//! service.
//!
//! Each test binds an axum router on 127.0.0.1:0 and points the client's
//! base URL at it, so no real network access happens.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, RawQuery},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use spolist_api::client::{collect_playlists, Remote, RemoteError, SpotifyClient};
use spolist_api::model::{PlaylistSource, TransportCommand};
use spolist_api::session::{Session, SessionError};

/// Session stub: serves `initial` until refreshed, then `refreshed`.
struct StubSession {
    current: Mutex<String>,
    refreshed: String,
    refreshes: Arc<AtomicUsize>,
}

impl StubSession {
    fn new(initial: &str, refreshed: &str) -> (Self, Arc<AtomicUsize>) {
        let refreshes = Arc::new(AtomicUsize::new(0));
        let session = Self {
            current: Mutex::new(initial.to_string()),
            refreshed: refreshed.to_string(),
            refreshes: refreshes.clone(),
        };
        (session, refreshes)
    }
}

impl Session for StubSession {
    async fn credential(&self) -> Result<String, SessionError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn refresh(&self) -> Result<String, SessionError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap() = self.refreshed.clone();
        Ok(self.refreshed.clone())
    }
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str, session: StubSession) -> SpotifyClient<StubSession> {
    SpotifyClient::new(reqwest::Client::new(), base_url, "from_token", session)
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn playlist_json(id: &str, total: u32) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("list {}", id),
        "uri": format!("spotify:playlist:{}", id),
        "owner": {"display_name": "owner", "id": "o"},
        "tracks": {"total": total}
    })
}

#[tokio::test]
async fn test_search_hits_search_endpoint_and_sorts_by_track_count() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen_search = seen.clone();
    let router = Router::new()
        .route(
            "/v1/search",
            get(move |RawQuery(q): RawQuery| {
                let seen = seen_search.clone();
                async move {
                    seen.lock().unwrap().push(q.unwrap_or_default());
                    Json(json!({
                        "playlists": {
                            "items": [playlist_json("small", 3), null, playlist_json("big", 90)],
                            "next": null, "offset": 0, "limit": 50
                        }
                    }))
                }
            }),
        )
        .route(
            "/v1/me/playlists",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
    let base = spawn(router).await;
    let (session, _) = StubSession::new("t", "t");
    let remote = client(&base, session);

    let lists = collect_playlists(&remote, &PlaylistSource::Search("jazz".into()))
        .await
        .unwrap();
    let ids: Vec<&str> = lists.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["big", "small"]);

    let queries = seen.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].contains("q=jazz"));
    assert!(queries[0].contains("type=playlist"));
}

#[tokio::test]
async fn test_own_playlists_follow_next_pages() {
    #[derive(serde::Deserialize)]
    struct Paging {
        offset: u32,
    }
    let router = Router::new().route(
        "/v1/me/playlists",
        get(|Query(p): Query<Paging>| async move {
            if p.offset == 0 {
                Json(json!({
                    "items": [playlist_json("p1", 5)],
                    "next": "more", "offset": 0, "limit": 50
                }))
            } else {
                Json(json!({
                    "items": [playlist_json("p2", 8)],
                    "next": null, "offset": p.offset, "limit": 50
                }))
            }
        }),
    );
    let base = spawn(router).await;
    let (session, _) = StubSession::new("t", "t");
    let remote = client(&base, session);

    let lists = collect_playlists(&remote, &PlaylistSource::Own).await.unwrap();
    let ids: Vec<&str> = lists.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p2", "p1"]);
}

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_retries() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_route = hits.clone();
    let router = Router::new().route(
        "/v1/me/player/devices",
        get(move |headers: HeaderMap| {
            let hits = hits_route.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                if bearer(&headers) != "Bearer fresh" {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                Json(json!({"devices": [
                    {"id": "d1", "name": "Desk", "type": "Computer", "is_active": true,
                     "volume_percent": 30, "supports_volume": true},
                    {"id": null, "name": "Ghost", "type": "Speaker", "is_active": false}
                ]}))
                .into_response()
            }
        }),
    );
    let base = spawn(router).await;
    let (session, refreshes) = StubSession::new("stale", "fresh");
    let remote = client(&base, session);

    let devices = remote.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Desk");
    assert!(devices[0].supports_volume);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unauthorized_after_refresh_is_surfaced() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_route = hits.clone();
    let router = Router::new().route(
        "/v1/me/player",
        get(move || {
            let hits = hits_route.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::UNAUTHORIZED
            }
        }),
    );
    let base = spawn(router).await;
    let (session, refreshes) = StubSession::new("stale", "still-bad");
    let remote = client(&base, session);

    let err = remote.now_playing().await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_content_means_nothing_playing() {
    let router = Router::new().route("/v1/me/player", get(|| async { StatusCode::NO_CONTENT }));
    let base = spawn(router).await;
    let (session, _) = StubSession::new("t", "t");
    let remote = client(&base, session);

    assert!(remote.now_playing().await.unwrap().is_none());
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let router = Router::new().route(
        "/v1/me/player",
        get(|| async {
            let mut headers = HeaderMap::new();
            headers.insert("retry-after", "7".parse().unwrap());
            (StatusCode::TOO_MANY_REQUESTS, headers).into_response()
        }),
    );
    let base = spawn(router).await;
    let (session, _) = StubSession::new("t", "t");
    let remote = client(&base, session);

    match remote.now_playing().await {
        Err(RemoteError::RateLimited { retry_after }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(7)));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_codes_map_to_typed_errors() {
    let router = Router::new()
        .route(
            "/v1/me/player/pause",
            put(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": {"status": 404, "message": "Player command failed: No active device found"}})),
                )
            }),
        )
        .route(
            "/v1/me/player/next",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        )
        .route(
            "/v1/me/player/previous",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({"error": {"status": 403, "message": "Player command failed: Premium required"}})),
                )
            }),
        );
    let base = spawn(router).await;
    let (session, _) = StubSession::new("t", "t");
    let remote = client(&base, session);

    match remote.send_transport(&TransportCommand::Pause, Some("d1")).await {
        Err(RemoteError::NotFound(msg)) => assert!(msg.contains("No active device")),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(matches!(
        remote.send_transport(&TransportCommand::Next, None).await,
        Err(RemoteError::Unavailable(_))
    ));
    assert!(matches!(
        remote.send_transport(&TransportCommand::Previous, None).await,
        Err(RemoteError::Rejected { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_transport_requests_carry_device_and_parameters() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let record = |seen: Arc<Mutex<Vec<String>>>, label: &'static str| {
        move |RawQuery(q): RawQuery, body: String| {
            let seen = seen.clone();
            async move {
                seen.lock()
                    .unwrap()
                    .push(format!("{} {} {}", label, q.unwrap_or_default(), body));
                StatusCode::NO_CONTENT
            }
        }
    };
    let router = Router::new()
        .route("/v1/me/player/play", put(record(seen.clone(), "play")))
        .route("/v1/me/player/shuffle", put(record(seen.clone(), "shuffle")))
        .route("/v1/me/player/volume", put(record(seen.clone(), "volume")));
    let base = spawn(router).await;
    let (session, _) = StubSession::new("t", "t");
    let remote = client(&base, session);

    remote
        .send_transport(
            &TransportCommand::Play {
                context_uri: Some("spotify:playlist:abc".into()),
            },
            Some("dev1"),
        )
        .await
        .unwrap();
    remote
        .send_transport(&TransportCommand::SetShuffle(true), Some("dev1"))
        .await
        .unwrap();
    remote
        .send_transport(&TransportCommand::SetVolume(55), None)
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].starts_with("play device_id=dev1"));
    assert!(seen[0].contains("spotify:playlist:abc"));
    assert!(seen[1].contains("state=true"));
    assert!(seen[1].contains("device_id=dev1"));
    assert!(seen[2].contains("volume_percent=55"));
}
