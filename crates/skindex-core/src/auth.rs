//! Signed-in identity and the auth error taxonomy.
//!
//! The auth provider itself is external; this module only models who is
//! signed in and turns provider error strings into distinct user-facing
//! messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── User ────────────────────────────────────────────────────────────────────

/// The authenticated identity every ownership and profile call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:    String,
  #[serde(default)]
  pub email: Option<String>,
}

impl User {
  pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
    Self { id: id.into(), email }
  }

  fn email_local_part(&self) -> Option<&str> {
    self
      .email
      .as_deref()
      .and_then(|e| e.split('@').next())
      .filter(|local| !local.is_empty())
  }

  /// Badge name: email local part, else the first 8 characters of the id.
  pub fn short_name(&self) -> String {
    match self.email_local_part() {
      Some(local) => local.to_owned(),
      None => self.id.chars().take(8).collect(),
    }
  }

  /// Display name proposed for a user who has not saved a profile yet.
  pub fn default_display_name(&self) -> String {
    self.email_local_part().unwrap_or("Me").to_owned()
  }

  /// Email if known, otherwise the id.
  pub fn label(&self) -> &str { self.email.as_deref().unwrap_or(&self.id) }
}

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Email + password pair, checked for presence before any remote call.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

impl Credentials {
  pub fn new(email: &str, password: &str) -> crate::Result<Self> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
      return Err(crate::Error::invalid("email and password are required"));
    }
    Ok(Self { email: email.to_owned(), password: password.to_owned() })
  }
}

// ─── AuthError ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
  BadCredentials,
  EmailNotConfirmed,
  AlreadyRegistered,
  WeakPassword,
  RateLimited,
  Other,
}

/// A failure reported by the auth provider, classified from its message.
#[derive(Debug, Clone, Error)]
#[error("{}", self.user_message())]
pub struct AuthError {
  pub kind: AuthErrorKind,
  /// The provider's original message.
  pub raw:  String,
}

impl AuthError {
  pub fn classify(raw: impl Into<String>) -> Self {
    let raw = raw.into();
    let low = raw.to_lowercase();

    let kind = if low.contains("invalid login credentials") {
      AuthErrorKind::BadCredentials
    } else if low.contains("email not confirmed") {
      AuthErrorKind::EmailNotConfirmed
    } else if low.contains("user already registered") {
      AuthErrorKind::AlreadyRegistered
    } else if low.contains("password should be at least") {
      AuthErrorKind::WeakPassword
    } else if low.contains("rate limit") {
      AuthErrorKind::RateLimited
    } else {
      AuthErrorKind::Other
    };

    Self { kind, raw }
  }

  pub fn title(&self) -> &'static str {
    match self.kind {
      AuthErrorKind::BadCredentials | AuthErrorKind::EmailNotConfirmed => "Sign in",
      AuthErrorKind::AlreadyRegistered | AuthErrorKind::WeakPassword => "Sign up",
      AuthErrorKind::RateLimited => "Too many attempts",
      AuthErrorKind::Other => "Error",
    }
  }

  pub fn user_message(&self) -> String {
    match self.kind {
      AuthErrorKind::BadCredentials => "Wrong email or password.".into(),
      AuthErrorKind::EmailNotConfirmed => {
        "Email not confirmed. Use `resend` to get a new confirmation email.".into()
      }
      AuthErrorKind::AlreadyRegistered => {
        "An account already exists for this email. Try signing in.".into()
      }
      AuthErrorKind::WeakPassword => "Password too short.".into(),
      AuthErrorKind::RateLimited => "Try again in a few minutes.".into(),
      AuthErrorKind::Other if self.raw.is_empty() => "Something went wrong.".into(),
      AuthErrorKind::Other => self.raw.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_provider_messages() {
    let cases = [
      ("Invalid login credentials", AuthErrorKind::BadCredentials),
      ("Email not confirmed", AuthErrorKind::EmailNotConfirmed),
      ("User already registered", AuthErrorKind::AlreadyRegistered),
      (
        "Password should be at least 6 characters.",
        AuthErrorKind::WeakPassword,
      ),
      ("email rate limit exceeded", AuthErrorKind::RateLimited),
      ("database exploded", AuthErrorKind::Other),
    ];
    for (raw, kind) in cases {
      assert_eq!(AuthError::classify(raw).kind, kind, "{raw}");
    }
  }

  #[test]
  fn distinct_messages_per_kind() {
    let bad = AuthError::classify("Invalid login credentials");
    let unconfirmed = AuthError::classify("Email not confirmed");
    assert_ne!(bad.user_message(), unconfirmed.user_message());
    assert_eq!(AuthError::classify("boom").to_string(), "boom");
  }

  #[test]
  fn user_names() {
    let u = User::new("0123456789abcdef", Some("colt@example.com".into()));
    assert_eq!(u.short_name(), "colt");
    assert_eq!(u.default_display_name(), "colt");

    let anon = User::new("0123456789abcdef", None);
    assert_eq!(anon.short_name(), "01234567");
    assert_eq!(anon.default_display_name(), "Me");
    assert_eq!(anon.label(), "0123456789abcdef");
  }

  #[test]
  fn credentials_require_both_fields() {
    assert!(Credentials::new("  ", "pw").is_err());
    assert!(Credentials::new("a@b.c", "").is_err());
    let c = Credentials::new(" a@b.c ", "pw").unwrap();
    assert_eq!(c.email, "a@b.c");
  }
}
