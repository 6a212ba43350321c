//! Configuration: optional TOML file, overridden by flags and environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// Page that renders a public profile from its `u` parameter.
pub const DEFAULT_PROFILE_PAGE: &str = "https://brawlstar-site.vercel.app/pages/public.html";

/// Where confirmation emails send the user back to.
pub const DEFAULT_EMAIL_REDIRECT: &str = "https://brawlstar-site.vercel.app/pages/mybrawl.html";

/// User id the SQLite backend acts as.
pub const DEFAULT_LOCAL_USER: &str = "local";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
  /// Hosted REST + auth API.
  #[default]
  Rest,
  /// Local SQLite file; no sign-in.
  Sqlite,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
  pub backend:           Option<BackendKind>,
  pub url:               Option<String>,
  pub anon_key:          Option<String>,
  pub sqlite_path:       Option<PathBuf>,
  pub local_user:        Option<String>,
  pub image_base_url:    Option<String>,
  pub profile_page_url:  Option<String>,
  pub email_redirect_to: Option<String>,
}

impl ConfigFile {
  /// Read `path`. A missing file at the default location is not an error;
  /// a missing file that was asked for explicitly is.
  pub fn load(path: &Path, explicit: bool) -> Result<Self> {
    let raw = match std::fs::read_to_string(path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
        return Ok(Self::default());
      }
      Err(e) => {
        return Err(e).with_context(|| format!("reading config file {}", path.display()));
      }
    };
    toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
  }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
  pub backend:     Option<BackendKind>,
  pub url:         Option<String>,
  pub anon_key:    Option<String>,
  pub sqlite_path: Option<PathBuf>,
}

// ─── Resolved config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
  pub backend:           BackendKind,
  pub url:               Option<String>,
  pub anon_key:          Option<String>,
  pub sqlite_path:       PathBuf,
  pub local_user:        String,
  pub image_base_url:    Option<String>,
  pub profile_page_url:  String,
  pub email_redirect_to: String,
  /// Session, preferences and log file live here.
  pub data_dir:          PathBuf,
}

fn non_empty(s: Option<String>) -> Option<String> {
  s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl Config {
  /// Flags override the file, which overrides defaults.
  pub fn resolve(file: ConfigFile, ov: Overrides, data_dir: PathBuf) -> Self {
    Self {
      backend: ov.backend.or(file.backend).unwrap_or_default(),
      url: non_empty(ov.url).or_else(|| non_empty(file.url)),
      anon_key: non_empty(ov.anon_key).or_else(|| non_empty(file.anon_key)),
      sqlite_path: ov
        .sqlite_path
        .or(file.sqlite_path)
        .unwrap_or_else(|| data_dir.join("skindex.db")),
      local_user: non_empty(file.local_user).unwrap_or_else(|| DEFAULT_LOCAL_USER.to_owned()),
      image_base_url: non_empty(file.image_base_url),
      profile_page_url: non_empty(file.profile_page_url)
        .unwrap_or_else(|| DEFAULT_PROFILE_PAGE.to_owned()),
      email_redirect_to: non_empty(file.email_redirect_to)
        .unwrap_or_else(|| DEFAULT_EMAIL_REDIRECT.to_owned()),
      data_dir,
    }
  }

  /// Load from `path` (or the default location) and apply `ov`.
  pub fn load(path: Option<&Path>, ov: Overrides) -> Result<Self> {
    let file = match path {
      Some(p) => ConfigFile::load(p, true)?,
      None => match default_config_path() {
        Some(p) => ConfigFile::load(&p, false)?,
        None => ConfigFile::default(),
      },
    };
    Ok(Self::resolve(file, ov, default_data_dir()))
  }

  /// Startup guard: refuse to run any feature against an unconfigured
  /// backend.
  pub fn check(&self) -> Result<()> {
    match self.backend {
      BackendKind::Rest => {
        if self.url.is_none() || self.anon_key.is_none() {
          bail!(
            "backend not configured: set `url` and `anon_key` in the config file \
             or SKINDEX_URL / SKINDEX_ANON_KEY"
          );
        }
        let url = self.url.as_deref().unwrap_or_default();
        url::Url::parse(url).with_context(|| format!("invalid backend url {url:?}"))?;
      }
      BackendKind::Sqlite => {
        if self.sqlite_path.as_os_str().is_empty() {
          bail!("backend not configured: set `sqlite_path` or SKINDEX_DB");
        }
      }
    }
    Ok(())
  }

  pub fn session_path(&self) -> PathBuf { self.data_dir.join("session.json") }

  pub fn prefs_path(&self) -> PathBuf { self.data_dir.join("collapsed.json") }

  pub fn log_path(&self) -> PathBuf { self.data_dir.join("skindex.log") }
}

/// `<config dir>/skindex/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|d| d.join("skindex").join("config.toml"))
}

/// `<data dir>/skindex`, or `./.skindex` when the platform has none.
pub fn default_data_dir() -> PathBuf {
  dirs::data_dir()
    .map(|d| d.join("skindex"))
    .unwrap_or_else(|| PathBuf::from(".skindex"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn file(toml: &str) -> ConfigFile { toml::from_str(toml).unwrap() }

  #[test]
  fn flags_override_file_which_overrides_defaults() {
    let f = file(
      r#"
        backend = "rest"
        url = "https://file.example.com"
        anon_key = "file-key"
        profile_page_url = "https://me.example.com/p.html"
      "#,
    );
    let ov = Overrides { url: Some("https://flag.example.com".into()), ..Default::default() };
    let cfg = Config::resolve(f, ov, PathBuf::from("/data"));

    assert_eq!(cfg.url.as_deref(), Some("https://flag.example.com"));
    assert_eq!(cfg.anon_key.as_deref(), Some("file-key"));
    assert_eq!(cfg.profile_page_url, "https://me.example.com/p.html");
    assert_eq!(cfg.email_redirect_to, DEFAULT_EMAIL_REDIRECT);
    assert_eq!(cfg.sqlite_path, PathBuf::from("/data/skindex.db"));
    assert_eq!(cfg.local_user, DEFAULT_LOCAL_USER);
  }

  #[test]
  fn startup_guard_requires_url_and_key_for_rest() {
    let cfg = Config::resolve(ConfigFile::default(), Overrides::default(), "/d".into());
    assert_eq!(cfg.backend, BackendKind::Rest);
    assert!(cfg.check().is_err());

    let ov = Overrides {
      url: Some("https://x.supabase.co".into()),
      anon_key: Some("  ".into()),
      ..Default::default()
    };
    let cfg = Config::resolve(ConfigFile::default(), ov, "/d".into());
    assert!(cfg.check().is_err());

    let ov = Overrides {
      url: Some("https://x.supabase.co".into()),
      anon_key: Some("k".into()),
      ..Default::default()
    };
    assert!(Config::resolve(ConfigFile::default(), ov, "/d".into()).check().is_ok());
  }

  #[test]
  fn sqlite_backend_needs_no_remote_settings() {
    let ov = Overrides { backend: Some(BackendKind::Sqlite), ..Default::default() };
    let cfg = Config::resolve(ConfigFile::default(), ov, "/d".into());
    assert!(cfg.check().is_ok());
  }

  #[test]
  fn missing_default_file_is_fine_missing_explicit_is_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(ConfigFile::load(&path, false).is_ok());
    assert!(ConfigFile::load(&path, true).is_err());

    std::fs::write(&path, "backend = \"sqlite\"\nsqlite_path = \"/tmp/x.db\"\n").unwrap();
    let f = ConfigFile::load(&path, true).unwrap();
    assert_eq!(f.backend, Some(BackendKind::Sqlite));
  }
}
