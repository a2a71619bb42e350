//! Session — yields a valid bearer credential on demand.
//!
//! The console never sees refresh tokens or client secrets; it only calls
//! `credential()` before a request and `refresh()` once after a 401.
//! `TokenCacheSession` is the concrete implementation: it reads a
//! spotipy-format token cache, refreshes with the `refresh_token` grant and
//! writes refreshed tokens back to the same file.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Seconds of slack before `expires_at` at which a token counts as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no cached token at {0} (sign in once with a spotipy-compatible tool to create it)")]
    NoCachedToken(PathBuf),
    #[error("cached token has no refresh_token")]
    MissingRefreshToken,
    #[error("client id/secret not configured (set SPOTIPY_CLIENT_ID and SPOTIPY_CLIENT_SECRET)")]
    MissingClientCredentials,
    #[error("token refresh rejected with status {0}")]
    Rejected(u16),
    #[error("token refresh request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token cache I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("token cache is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The credential capability the Web API client depends on.
pub trait Session: Send + Sync {
    /// A bearer token, refreshed first if the cached one has expired.
    fn credential(&self) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Force one refresh regardless of the recorded expiry.
    fn refresh(&self) -> impl Future<Output = Result<String, SessionError>> + Send;
}

/// On-disk token layout (compatible with spotipy's cache file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl CachedToken {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS <= now
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

pub struct TokenCacheSession {
    http: reqwest::Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    cache_path: PathBuf,
    token: Mutex<Option<CachedToken>>,
}

impl TokenCacheSession {
    pub fn new(
        http: reqwest::Client,
        accounts_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            accounts_url: accounts_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cache_path: cache_path.into(),
            token: Mutex::new(None),
        }
    }

    pub fn from_config(http: reqwest::Client, config: &crate::config::Config) -> Self {
        Self::new(
            http,
            config.api.accounts_url.clone(),
            config.auth.client_id.clone(),
            config.auth.client_secret.clone(),
            config.auth.cache_path.clone(),
        )
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Load the cache file if it has not been read yet.
    async fn ensure_loaded(&self, slot: &mut Option<CachedToken>) -> Result<(), SessionError> {
        if slot.is_some() {
            return Ok(());
        }
        let raw = match tokio::fs::read_to_string(&self.cache_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NoCachedToken(self.cache_path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let token: CachedToken = serde_json::from_str(&raw)?;
        debug!("loaded token cache from {}", self.cache_path.display());
        *slot = Some(token);
        Ok(())
    }

    async fn refresh_locked(&self, slot: &mut Option<CachedToken>) -> Result<String, SessionError> {
        let refresh_token = slot
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .ok_or(SessionError::MissingRefreshToken)?;
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(SessionError::MissingClientCredentials);
        }

        let url = format!("{}/api/token", self.accounts_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("token refresh rejected: {}", response.status());
            return Err(SessionError::Rejected(response.status().as_u16()));
        }

        let body: RefreshResponse = response.json().await?;
        let now = chrono::Utc::now().timestamp();
        let token = CachedToken {
            access_token: body.access_token,
            token_type: body.token_type,
            expires_in: body.expires_in,
            scope: body.scope,
            expires_at: now + body.expires_in,
            // The accounts service only sometimes rotates the refresh token.
            refresh_token: body.refresh_token.or(Some(refresh_token)),
        };
        self.persist(&token).await;
        info!("access token refreshed, expires in {}s", token.expires_in);
        let access = token.access_token.clone();
        *slot = Some(token);
        Ok(access)
    }

    /// Write the token back to the cache file. Failure only costs a refresh
    /// on the next start, so it is logged rather than surfaced.
    async fn persist(&self, token: &CachedToken) {
        if let Some(parent) = self.cache_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("token cache dir {}: {}", parent.display(), e);
                return;
            }
        }
        match serde_json::to_vec(token) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&self.cache_path, bytes).await {
                    warn!("writing token cache {}: {}", self.cache_path.display(), e);
                }
            }
            Err(e) => warn!("encoding token cache: {}", e),
        }
    }
}

impl Session for TokenCacheSession {
    async fn credential(&self) -> Result<String, SessionError> {
        let mut slot = self.token.lock().await;
        self.ensure_loaded(&mut slot).await?;
        let now = chrono::Utc::now().timestamp();
        match slot.as_ref() {
            Some(token) if !token.is_expired(now) => Ok(token.access_token.clone()),
            _ => {
                debug!("cached token expired, refreshing");
                self.refresh_locked(&mut slot).await
            }
        }
    }

    async fn refresh(&self) -> Result<String, SessionError> {
        let mut slot = self.token.lock().await;
        self.ensure_loaded(&mut slot).await?;
        self.refresh_locked(&mut slot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_cache(dir: &Path, expires_at: i64, refresh: Option<&str>) -> PathBuf {
        let path = dir.join(".spotify_cache");
        let token = CachedToken {
            access_token: "cached-access".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            scope: None,
            expires_at,
            refresh_token: refresh.map(str::to_string),
        };
        std::fs::write(&path, serde_json::to_vec(&token).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_fresh_token_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let far_future = chrono::Utc::now().timestamp() + 3600;
        let path = write_cache(dir.path(), far_future, Some("r"));
        let session =
            TokenCacheSession::new(reqwest::Client::new(), "http://unused", "", "", path);
        assert_eq!(session.credential().await.unwrap(), "cached-access");
    }

    #[tokio::test]
    async fn test_missing_cache_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let session = TokenCacheSession::new(
            reqwest::Client::new(),
            "http://unused",
            "id",
            "secret",
            dir.path().join("absent"),
        );
        assert!(matches!(
            session.credential().await,
            Err(SessionError::NoCachedToken(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_without_client_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), 0, Some("r"));
        let session =
            TokenCacheSession::new(reqwest::Client::new(), "http://unused", "", "", path);
        assert!(matches!(
            session.credential().await,
            Err(SessionError::MissingClientCredentials)
        ));
    }

    #[test]
    fn test_expiry_margin() {
        let token = CachedToken {
            access_token: String::new(),
            token_type: default_token_type(),
            expires_in: 0,
            scope: None,
            expires_at: 1_000,
            refresh_token: None,
        };
        assert!(!token.is_expired(900));
        assert!(token.is_expired(940));
        assert!(token.is_expired(2_000));
    }
}
