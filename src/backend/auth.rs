//! Admin authentication: password login against GoTrue, a session file, and
//! the gate that catalog mutations must pass.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::backend::SupabaseClient;
use crate::error::{ConsultError, ConsultResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens of a signed-in admin, as persisted in the session file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now.timestamp())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Build from a GoTrue token response, deriving `expires_at` from
    /// `expires_in` when the server omits it.
    fn from_token_response(value: Value) -> Option<Self> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            refresh_token: Option<String>,
            expires_at: Option<i64>,
            expires_in: Option<i64>,
            user: AuthUser,
        }
        let token: TokenResponse = serde_json::from_value(value).ok()?;
        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Some(Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        })
    }
}

/// What a signup produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SignupOutcome {
    /// Signed in immediately
    SignedIn(AuthSession),
    /// The project requires email confirmation before login
    ConfirmationRequired { email: String },
}

/// JSON file holding the current admin session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> ConsultResult<Option<AuthSession>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConsultError::io("read session", e).with_path(self.path.display().to_string())),
        };
        match serde_json::from_str(&text) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, session: &AuthSession) -> ConsultResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConsultError::io("create session dir", e).with_path(parent.display().to_string()))?;
        }
        let text = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| ConsultError::io("write session", e).with_path(self.path.display().to_string()))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Delete the file; a missing file is fine.
    pub async fn clear(&self) -> ConsultResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConsultError::io("delete session", e).with_path(self.path.display().to_string())),
        }
    }
}

/// Proof of an admin session; catalog mutations go through [`AdminGate::require`].
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    session: Option<AuthSession>,
}

impl AdminGate {
    pub fn locked() -> Self {
        Self::default()
    }

    pub fn unlocked(session: AuthSession) -> Self {
        Self { session: Some(session) }
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.as_ref().is_some_and(|s| !s.is_expired())
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    /// The live session, or an auth error.
    pub fn require(&self) -> ConsultResult<&AuthSession> {
        match &self.session {
            Some(session) if !session.is_expired() => Ok(session),
            Some(_) => Err(ConsultError::auth("admin", "phiên đăng nhập đã hết hạn, vui lòng đăng nhập lại")),
            None => Err(ConsultError::auth("admin", "cần đăng nhập quản trị")),
        }
    }
}

/// Login, signup, logout and restore against the auth backend.
pub struct AuthService {
    backend: SupabaseClient,
    store: SessionStore,
}

impl AuthService {
    pub fn new(backend: SupabaseClient, store: SessionStore) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn login(&self, email: &str, password: &str) -> ConsultResult<AdminGate> {
        let builder = self
            .backend
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let value: Value = self
            .backend
            .send_json("login", "auth", builder)
            .await
            .map_err(into_auth_error("login"))?;
        let session = AuthSession::from_token_response(value)
            .ok_or_else(|| ConsultError::auth("login", "phản hồi đăng nhập không có access token"))?;
        self.store.save(&session).await?;
        info!(user = %session.user.id, "admin signed in");
        Ok(AdminGate::unlocked(session))
    }

    pub async fn signup(&self, email: &str, password: &str) -> ConsultResult<SignupOutcome> {
        if password.chars().count() < 6 {
            return Err(ConsultError::validation("password", "tối thiểu 6 ký tự", ""));
        }
        let builder = self
            .backend
            .request(Method::POST, "/auth/v1/signup", None)
            .json(&json!({ "email": email, "password": password }));
        let value: Value = self
            .backend
            .send_json("signup", "auth", builder)
            .await
            .map_err(into_auth_error("signup"))?;
        match AuthSession::from_token_response(value) {
            Some(session) => {
                self.store.save(&session).await?;
                info!(user = %session.user.id, "admin signed up");
                Ok(SignupOutcome::SignedIn(session))
            }
            None => {
                info!(email, "signup awaiting email confirmation");
                Ok(SignupOutcome::ConfirmationRequired {
                    email: email.to_string(),
                })
            }
        }
    }

    /// Load the saved session and confirm it with the backend.
    ///
    /// Expired or rejected sessions are deleted and yield a locked gate.
    /// Transport failures, rate limits and server errors propagate; the file
    /// is kept for the next attempt.
    pub async fn restore(&self) -> ConsultResult<AdminGate> {
        let Some(session) = self.store.load().await? else {
            return Ok(AdminGate::locked());
        };
        if session.is_expired() {
            debug!("saved session expired");
            self.store.clear().await?;
            return Ok(AdminGate::locked());
        }
        let builder = self
            .backend
            .request(Method::GET, "/auth/v1/user", Some(&session.access_token));
        match self.backend.send_json::<AuthUser>("restore session", "auth", builder).await {
            Ok(user) => {
                debug!(user = %user.id, "session restored");
                Ok(AdminGate::unlocked(AuthSession { user, ..session }))
            }
            Err(error) if is_credential_rejection(&error) => {
                warn!(category = error.category(), "saved session rejected");
                self.store.clear().await?;
                Ok(AdminGate::locked())
            }
            Err(error) => {
                warn!(category = error.category(), %error, "session check failed; keeping saved session");
                Err(error)
            }
        }
    }

    /// Revoke the session server-side and delete the session file.
    ///
    /// A failed revocation is logged; the local session is removed regardless.
    pub async fn logout(&self, gate: AdminGate) -> ConsultResult<()> {
        if let Some(session) = gate.session {
            let builder = self
                .backend
                .request(Method::POST, "/auth/v1/logout", Some(&session.access_token));
            if let Err(error) = self.backend.send("logout", "auth", builder).await {
                warn!(category = error.category(), %error, "logout not acknowledged by backend");
            }
        }
        self.store.clear().await?;
        info!("admin signed out");
        Ok(())
    }
}

/// Whether the auth backend refused the token itself, as opposed to being
/// unreachable, rate limited or failing internally.
fn is_credential_rejection(error: &ConsultError) -> bool {
    match error {
        ConsultError::Backend { .. } | ConsultError::Auth { .. } => true,
        ConsultError::Api { status, .. } => (400..500).contains(status) && *status != 429,
        _ => false,
    }
}

/// Turn credential rejections into [`ConsultError::Auth`]; keep transport errors.
fn into_auth_error(operation: &'static str) -> impl Fn(ConsultError) -> ConsultError {
    move |error| match error {
        ConsultError::Api { message, .. } | ConsultError::Backend { message, .. } => {
            ConsultError::auth(operation, message)
        }
        other => other,
    }
}
