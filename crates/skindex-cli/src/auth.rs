//! Email/password auth against the hosted auth API, and the session file
//! that keeps the user signed in between runs.

use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use skindex_core::auth::{AuthError, Credentials, User};

use crate::client::{ApiConfig, ClientError, error_message};

/// Refresh a little before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ─── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
  pub access_token:  String,
  pub refresh_token: String,
  /// Unix seconds.
  pub expires_at:    i64,
  pub user:          User,
}

impl StoredSession {
  pub fn is_expired(&self, now: i64) -> bool { now + EXPIRY_MARGIN_SECS >= self.expires_at }
}

/// Token response of the auth API.
#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token:  String,
  refresh_token: String,
  #[serde(default)]
  expires_in:    Option<i64>,
  #[serde(default)]
  expires_at:    Option<i64>,
  user:          UserBody,
}

#[derive(Debug, Deserialize)]
struct UserBody {
  id:    String,
  #[serde(default)]
  email: Option<String>,
}

impl From<UserBody> for User {
  fn from(u: UserBody) -> Self { User::new(u.id, u.email) }
}

impl TokenResponse {
  fn into_session(self) -> StoredSession {
    let expires_at = self
      .expires_at
      .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
    StoredSession {
      access_token: self.access_token,
      refresh_token: self.refresh_token,
      expires_at,
      user: self.user.into(),
    }
  }
}

/// Result of a sign-up.
#[derive(Debug)]
pub enum SignUp {
  /// Email confirmation is off: the user is signed in right away.
  SignedIn(StoredSession),
  /// A confirmation email was sent.
  ConfirmationSent,
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub struct AuthClient {
  client:      Client,
  config:      ApiConfig,
  redirect_to: String,
}

/// Turn a failed auth response into a classified [`AuthError`].
async fn auth_failure(resp: Response) -> ClientError {
  let (status, message) = error_message(resp).await;
  tracing::debug!(status, %message, "auth request rejected");
  ClientError::Auth(AuthError::classify(message))
}

impl AuthClient {
  pub fn new(config: ApiConfig, redirect_to: impl Into<String>) -> Result<Self, ClientError> {
    Ok(Self { client: config.http_client()?, config, redirect_to: redirect_to.into() })
  }

  fn url(&self, path: &str) -> String { format!("{}/auth/v1{path}", self.config.base_url) }

  fn post(&self, path: &str) -> reqwest::RequestBuilder {
    self
      .client
      .post(self.url(path))
      .header("apikey", &self.config.anon_key)
  }

  async fn token(&self, grant: &str, body: serde_json::Value) -> Result<StoredSession, ClientError> {
    let resp = self
      .post("/token")
      .query(&[("grant_type", grant)])
      .json(&body)
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(auth_failure(resp).await);
    }
    let token: TokenResponse = resp.json().await?;
    Ok(token.into_session())
  }

  /// `POST /auth/v1/token?grant_type=password`
  pub async fn sign_in(&self, creds: &Credentials) -> Result<StoredSession, ClientError> {
    let session = self
      .token("password", json!({ "email": creds.email, "password": creds.password }))
      .await?;
    tracing::info!(user_id = %session.user.id, "signed in");
    Ok(session)
  }

  /// `POST /auth/v1/signup`
  pub async fn sign_up(&self, creds: &Credentials) -> Result<SignUp, ClientError> {
    let resp = self
      .post("/signup")
      .query(&[("redirect_to", self.redirect_to.as_str())])
      .json(&json!({ "email": creds.email, "password": creds.password }))
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(auth_failure(resp).await);
    }

    // With confirmation enabled the body is the bare user; otherwise it is a
    // full token response.
    let body: serde_json::Value = resp.json().await?;
    if body.get("access_token").is_some() {
      let token: TokenResponse = serde_json::from_value(body)?;
      return Ok(SignUp::SignedIn(token.into_session()));
    }
    Ok(SignUp::ConfirmationSent)
  }

  /// `POST /auth/v1/resend`
  pub async fn resend_confirmation(&self, email: &str) -> Result<(), ClientError> {
    let email = email.trim();
    if email.is_empty() {
      return Err(ClientError::Auth(AuthError::classify("email required")));
    }
    let resp = self
      .post("/resend")
      .query(&[("redirect_to", self.redirect_to.as_str())])
      .json(&json!({ "type": "signup", "email": email }))
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(auth_failure(resp).await);
    }
    Ok(())
  }

  /// `POST /auth/v1/token?grant_type=refresh_token`
  pub async fn refresh(&self, session: &StoredSession) -> Result<StoredSession, ClientError> {
    self
      .token("refresh_token", json!({ "refresh_token": session.refresh_token }))
      .await
  }

  /// `POST /auth/v1/logout`
  pub async fn sign_out(&self, session: &StoredSession) -> Result<(), ClientError> {
    let resp = self
      .post("/logout")
      .bearer_auth(&session.access_token)
      .send()
      .await?;
    if !resp.status().is_success() {
      return Err(auth_failure(resp).await);
    }
    Ok(())
  }
}

// ─── Session file ─────────────────────────────────────────────────────────────

/// JSON file holding the current [`StoredSession`].
pub struct SessionFile {
  path: PathBuf,
}

impl SessionFile {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  pub fn path(&self) -> &Path { &self.path }

  /// The stored session; `None` when there is none or it cannot be read.
  pub fn load(&self) -> Option<StoredSession> {
    let raw = std::fs::read_to_string(&self.path).ok()?;
    match serde_json::from_str(&raw) {
      Ok(session) => Some(session),
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
        None
      }
    }
  }

  pub fn save(&self, session: &StoredSession) -> Result<(), ClientError> {
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
    Ok(())
  }

  pub fn clear(&self) -> Result<(), ClientError> {
    match std::fs::remove_file(&self.path) {
      Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
      _ => Ok(()),
    }
  }
}

/// The stored session, refreshed when expired. A session that cannot be
/// refreshed is dropped and the user is treated as signed out.
pub async fn current_session(auth: &AuthClient, file: &SessionFile) -> Option<StoredSession> {
  let session = file.load()?;
  if !session.is_expired(Utc::now().timestamp()) {
    return Some(session);
  }

  match auth.refresh(&session).await {
    Ok(fresh) => {
      if let Err(e) = file.save(&fresh) {
        tracing::warn!(error = %e, "could not store refreshed session");
      }
      Some(fresh)
    }
    Err(e) => {
      tracing::warn!(error = %e, "session refresh failed; signing out");
      let _ = file.clear();
      None
    }
  }
}
