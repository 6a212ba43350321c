//! Last-request-wins guard for async reloads.
//!
//! Every reload takes a [`Ticket`] before its first remote call and checks it
//! before touching state. Issuing a newer ticket (or invalidating) makes all
//! older tickets stale; their results are dropped rather than applied.
//! In-flight calls are never cancelled.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct RequestGuard {
  latest: AtomicU64,
}

/// Proof of which request a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl RequestGuard {
  pub fn issue(&self) -> Ticket { Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1) }

  /// The latest ticket, without superseding it. Used to tie work to a
  /// generation that only [`invalidate`](Self::invalidate) ends.
  pub fn current(&self) -> Ticket { Ticket(self.latest.load(Ordering::SeqCst)) }

  pub fn is_current(&self, ticket: &Ticket) -> bool {
    self.latest.load(Ordering::SeqCst) == ticket.0
  }

  /// Make every outstanding ticket stale.
  pub fn invalidate(&self) { self.latest.fetch_add(1, Ordering::SeqCst); }

  /// Pass `value` through if `ticket` is still current, else
  /// [`Error::Stale`].
  pub fn accept<T>(&self, ticket: &Ticket, value: T) -> Result<T> {
    if self.is_current(ticket) {
      Ok(value)
    } else {
      tracing::debug!(ticket = ticket.0, "dropping stale response");
      Err(Error::Stale)
    }
  }
}
