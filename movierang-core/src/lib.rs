//! # Movierang Core
//!
//! Core library for Movierang, the box-office and movie catalog aggregator.
//!
//! Two independent external sources feed the platform: a daily ranked
//! box-office feed whose rows carry only free-text titles, and a movie
//! catalog with stable document ids. This crate holds the pieces that have
//! to be correct under drift and under concurrency:
//!
//! - [`domain::reconcile`]: matches box-office entries to catalog records
//!   with an exact-title pass followed by a whitespace-insensitive
//!   alternate-title pass, disambiguating duplicates by release-year
//!   proximity.
//! - [`domain::stats`]: per-movie view/wishlist counters updated with a
//!   version-checked compare-and-swap and a bounded retry loop.
//! - [`domain::wishlist`]: idempotent wishlist toggles over a
//!   uniqueness-constrained membership table, each flip committed together
//!   with its counter update.
//! - [`box_office`]: decoding of the KOBIS daily feed and assembly of the
//!   daily board shown to users.
//!
//! ## Feature Flags
//!
//! - `database` (default): PostgreSQL adapters and embedded migrations.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use movierang_core::database::infrastructure::memory::InMemoryMovieStore;
//! use movierang_core::domain::wishlist::WishlistService;
//! use movierang_core::config::CoreConfig;
//! use movierang_model::prelude::*;
//!
//! async fn toggle_twice() -> movierang_core::error::Result<()> {
//!     let store = Arc::new(InMemoryMovieStore::new());
//!     store.insert_movie(MovieIdentity::new(MovieId(1), "K00001", "Parasite"));
//!
//!     let config = CoreConfig::default();
//!     let wishlist = WishlistService::new(store.clone(), store, config.counter, config.toggle);
//!
//!     assert!(wishlist.toggle(UserId(10), MovieId(1)).await?);
//!     assert!(!wishlist.toggle(UserId(10), MovieId(1)).await?);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// KOBIS feed decoding and daily board assembly
pub mod box_office;

/// Tunables shared by the domain services
pub mod config;

/// Repository ports and their in-memory / PostgreSQL adapters
pub mod database;

/// Reconciliation, counter and wishlist services
pub mod domain;

/// Error types and error handling utilities
pub mod error;

#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use error::{MovieError, Result};
