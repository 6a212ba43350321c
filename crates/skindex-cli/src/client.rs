//! Async HTTP client for the hosted backend: PostgREST tables and the public
//! image bucket.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use skindex_core::{
  auth::AuthError,
  catalog::SkinRow,
  profile::PublicProfile,
  store::{Backend, ProfileQuery},
};
use thiserror::Error;

/// Image bucket name.
pub const BUCKET: &str = "skins";

const SKIN_COLUMNS: &str = "id,name,brawler,category,rarity,img_path,updated_at";
const PROFILE_COLUMNS: &str = "user_id,display_name,bio,is_public,show_owned,updated_at";

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// Non-success response; `message` is the server's own text.
  #[error("{message}")]
  Api { status: u16, message: String },

  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Error bodies differ between PostgREST (`message`) and the auth API
/// (`msg`, `error_description`, `error`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
  message:           Option<String>,
  msg:               Option<String>,
  error_description: Option<String>,
  error:             Option<String>,
}

impl ErrorBody {
  fn into_message(self) -> Option<String> {
    self
      .message
      .or(self.msg)
      .or(self.error_description)
      .or(self.error)
  }
}

/// The server message of a failed response.
pub async fn error_message(resp: Response) -> (u16, String) {
  let status = resp.status();
  let text = resp.text().await.unwrap_or_default();
  let message = serde_json::from_str::<ErrorBody>(&text)
    .ok()
    .and_then(ErrorBody::into_message)
    .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_owned()))
    .unwrap_or_else(|| status.to_string());
  (status.as_u16(), message)
}

async fn check(resp: Response) -> Result<Response, ClientError> {
  if resp.status().is_success() {
    return Ok(resp);
  }
  let (status, message) = error_message(resp).await;
  tracing::debug!(status, %message, "request rejected");
  Err(ClientError::Api { status, message })
}

// ─── Config ───────────────────────────────────────────────────────────────────

/// Connection settings shared by the data and auth clients.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub anon_key: String,
}

impl ApiConfig {
  pub fn new(base_url: &str, anon_key: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_owned(),
      anon_key: anon_key.to_owned(),
    }
  }

  pub fn http_client(&self) -> Result<Client, ClientError> {
    Ok(Client::builder().timeout(Duration::from_secs(30)).build()?)
  }
}

// ─── Backend ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SkinLink<'a> {
  user_id: &'a str,
  skin_id: &'a str,
}

#[derive(Deserialize)]
struct SkinIdRow {
  skin_id: Option<String>,
}

/// [`Backend`] over the hosted REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RestBackend {
  client:       Client,
  config:       ApiConfig,
  access_token: Option<String>,
}

impl RestBackend {
  pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
    Ok(Self { client: config.http_client()?, config, access_token: None })
  }

  /// Act as the user owning `token`; without one, requests carry the anon
  /// key and row-level security restricts them to public data.
  pub fn with_access_token(mut self, token: Option<String>) -> Self {
    self.access_token = token;
    self
  }

  fn table(&self, name: &str) -> String { format!("{}/rest/v1/{name}", self.config.base_url) }

  fn request(&self, method: Method, url: String) -> RequestBuilder {
    let bearer = self.access_token.as_deref().unwrap_or(&self.config.anon_key);
    self
      .client
      .request(method, url)
      .header("apikey", &self.config.anon_key)
      .bearer_auth(bearer)
  }

  fn upsert(&self, table: &str, on_conflict: &str) -> RequestBuilder {
    self
      .request(Method::POST, self.table(table))
      .query(&[("on_conflict", on_conflict)])
      .header("Prefer", "resolution=merge-duplicates,return=minimal")
  }

  async fn skin_ids(&self, table: &str, user_id: &str) -> Result<Vec<String>, ClientError> {
    let filter = format!("eq.{user_id}");
    let resp = self
      .request(Method::GET, self.table(table))
      .query(&[("select", "skin_id"), ("user_id", filter.as_str())])
      .send()
      .await?;
    let rows: Vec<SkinIdRow> = check(resp).await?.json().await?;
    Ok(rows.into_iter().filter_map(|r| r.skin_id).collect())
  }
}

impl Backend for RestBackend {
  type Error = ClientError;

  async fn list_skins(&self) -> Result<Vec<SkinRow>, ClientError> {
    let resp = self
      .request(Method::GET, self.table("skins"))
      .query(&[("select", SKIN_COLUMNS), ("order", "brawler.asc,name.asc")])
      .send()
      .await?;
    Ok(check(resp).await?.json().await?)
  }

  fn public_image_url(&self, path: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    (!path.is_empty()).then(|| {
      format!("{}/storage/v1/object/public/{BUCKET}/{path}", self.config.base_url)
    })
  }

  async fn owned_skin_ids(&self, user_id: &str) -> Result<Vec<String>, ClientError> {
    self.skin_ids("user_skins", user_id).await
  }

  async fn upsert_owned(&self, user_id: &str, skin_id: &str) -> Result<(), ClientError> {
    let resp = self
      .upsert("user_skins", "user_id,skin_id")
      .json(&[SkinLink { user_id, skin_id }])
      .send()
      .await?;
    check(resp).await?;
    Ok(())
  }

  async fn delete_owned(&self, user_id: &str, skin_id: &str) -> Result<(), ClientError> {
    let resp = self
      .request(Method::DELETE, self.table("user_skins"))
      .query(&[("user_id", format!("eq.{user_id}")), ("skin_id", format!("eq.{skin_id}"))])
      .send()
      .await?;
    check(resp).await?;
    Ok(())
  }

  async fn get_profile(&self, user_id: &str) -> Result<Option<PublicProfile>, ClientError> {
    let filter = format!("eq.{user_id}");
    let resp = self
      .request(Method::GET, self.table("public_profiles"))
      .query(&[("select", PROFILE_COLUMNS), ("user_id", filter.as_str()), ("limit", "1")])
      .send()
      .await?;
    let rows: Vec<PublicProfile> = check(resp).await?.json().await?;
    Ok(rows.into_iter().next())
  }

  async fn upsert_profile(&self, profile: &PublicProfile) -> Result<(), ClientError> {
    let resp = self
      .upsert("public_profiles", "user_id")
      .json(&[profile])
      .send()
      .await?;
    check(resp).await?;
    Ok(())
  }

  async fn search_profiles(
    &self,
    query: &ProfileQuery,
  ) -> Result<Vec<PublicProfile>, ClientError> {
    let resp = self
      .request(Method::GET, self.table("public_profiles"))
      .query(&[
        ("select", PROFILE_COLUMNS.to_owned()),
        ("is_public", "eq.true".to_owned()),
        ("display_name", format!("ilike.*{}*", ilike_needle(&query.name))),
        ("order", "updated_at.desc".to_owned()),
        ("limit", query.limit.to_string()),
      ])
      .send()
      .await?;
    Ok(check(resp).await?.json().await?)
  }

  async fn public_skin_ids(&self, user_id: &str) -> Result<Vec<String>, ClientError> {
    self.skin_ids("public_user_skins", user_id).await
  }

  async fn clear_public_skins(&self, user_id: &str) -> Result<(), ClientError> {
    let resp = self
      .request(Method::DELETE, self.table("public_user_skins"))
      .query(&[("user_id", format!("eq.{user_id}"))])
      .send()
      .await?;
    check(resp).await?;
    Ok(())
  }

  async fn upsert_public_skins(
    &self,
    user_id: &str,
    skin_ids: &[String],
  ) -> Result<(), ClientError> {
    let rows: Vec<SkinLink<'_>> = skin_ids
      .iter()
      .map(|skin_id| SkinLink { user_id, skin_id })
      .collect();
    let resp = self
      .upsert("public_user_skins", "user_id,skin_id")
      .json(&rows)
      .send()
      .await?;
    check(resp).await?;
    Ok(())
  }
}

/// `name` as the body of a PostgREST `ilike` pattern, matched literally.
/// PostgREST turns every `*` into `%` before Postgres sees it, so a literal
/// `*` cannot be escaped and becomes the single-character wildcard `_`.
fn ilike_needle(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  for c in name.trim().chars() {
    match c {
      '\\' | '%' | '_' => {
        out.push('\\');
        out.push(c);
      }
      '*' => out.push('_'),
      c => out.push(c),
    }
  }
  out
}
