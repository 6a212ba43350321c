//! Core types for the skindex catalog and ownership tracker.
//!
//! This crate has no HTTP or database dependencies. Data access goes through
//! the [`store::Backend`] trait, implemented by `skindex-store-sqlite` and by
//! the REST client of `skindex-cli`.

// Native `async fn` in trait impls; the trait itself spells out `Send`
// futures.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod catalog;
pub mod collapse;
pub mod collate;
pub mod error;
pub mod facet;
pub mod guard;
pub mod ownership;
pub mod profile;
pub mod publish;
pub mod rarity;
pub mod session;
pub mod store;
pub mod view;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
