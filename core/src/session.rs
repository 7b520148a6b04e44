//! Sign-in against the hosted auth service and the persisted session.
//!
//! Storage location: `<home>/session.json`, user-only permissions on Unix.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::backend::{ADMIN_ROLE, Backend, BackendError, error_message};
use crate::config::StoreConfig;

const SESSION_FILE: &str = "session.json";
/// Tokens this close to expiry are treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 5 * 60;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("not signed in")]
    NotSignedIn,

    #[error("session expired, sign in again")]
    Expired,

    #[error("auth not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Signed-in user and the tokens issued for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Session {
    /// Check if the access token is expired (with 5 minute buffer)
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now().timestamp() >= exp - EXPIRY_BUFFER_SECS)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Wire shape of the auth service's user object.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<serde_json::Value>,
}

impl From<AuthUser> for SessionUser {
    fn from(user: AuthUser) -> Self {
        let name = user
            .user_metadata
            .as_ref()
            .and_then(|meta| meta.get("name"))
            .and_then(|name| name.as_str())
            .map(str::to_string);
        Self {
            id: user.id,
            email: user.email,
            name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self.expires_at.or_else(|| {
            self.expires_in
                .map(|secs| Utc::now().timestamp() + secs)
        });
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Sign-up either signs the user straight in or waits on email confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(Session),
    ConfirmationRequired { user_id: String, email: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

/// Client for the hosted auth service at `{url}/auth/v1`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            anon_key: anon_key.into(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, SessionError> {
        match (config.backend_url.as_deref(), config.anon_key.as_deref()) {
            (Some(url), Some(key)) => Ok(Self::new(url, key)),
            _ => Err(SessionError::NotConfigured(
                "backend_url and anon_key are required".to_string(),
            )),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, SessionError> {
        let response = request.header("apikey", &self.anon_key).send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SessionError::Auth {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(text)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        let request = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email.trim(), "password": password }));
        let text = self.send(request).await?;
        let session = serde_json::from_str::<TokenResponse>(&text)?.into_session();
        tracing::info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, SessionError> {
        let request = self
            .client
            .post(format!("{}/signup", self.auth_url))
            .json(&json!({
                "email": email.trim(),
                "password": password,
                "data": { "name": name.trim() },
            }));
        let text = self.send(request).await?;
        match serde_json::from_str::<SignUpResponse>(&text)? {
            SignUpResponse::Session(response) => Ok(SignUpOutcome::SignedIn(response.into_session())),
            SignUpResponse::User(user) => Ok(SignUpOutcome::ConfirmationRequired {
                user_id: user.id,
                email: user.email.unwrap_or_else(|| email.trim().to_string()),
            }),
        }
    }

    /// Exchanges the refresh token for a fresh session.
    pub async fn refresh(&self, session: &Session) -> Result<Session, SessionError> {
        let refresh_token = session.refresh_token.as_deref().ok_or(SessionError::Expired)?;
        let request = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        let text = self.send(request).await?;
        Ok(serde_json::from_str::<TokenResponse>(&text)?.into_session())
    }

    pub async fn sign_out(&self, session: &Session) -> Result<(), SessionError> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .bearer_auth(&session.access_token);
        self.send(request).await?;
        Ok(())
    }
}

/// Persisted session file.
pub struct SessionStorage {
    file_path: PathBuf,
}

impl SessionStorage {
    /// Session file inside the storefront home directory.
    pub fn in_home(home: &Path) -> Self {
        Self::with_path(home.join(SESSION_FILE))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { file_path: path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.file_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.file_path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Loaded session, failing when there is none or it has expired.
    pub fn require(&self) -> Result<Session, SessionError> {
        let session = self.load()?.ok_or(SessionError::NotSignedIn)?;
        if session.is_expired() {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.file_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.file_path, permissions)?;
        }

        Ok(())
    }

    /// Returns whether a session file was removed.
    pub fn clear(&self) -> Result<bool, SessionError> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SessionError::Io(e)),
        }
    }
}

/// Whether the session's user holds the admin role.
pub async fn is_admin(backend: &dyn Backend, session: &Session) -> Result<bool, BackendError> {
    backend.has_role(session.user_id(), ADMIN_ROLE).await
}
