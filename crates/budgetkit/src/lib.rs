//! # budgetkit
//!
//! Blocking client for the budgeteer API-key service.
//!
//! This crate provides:
//! - Typed records for the key listing, create and update endpoints
//! - An authenticated HTTP backend built on `ureq`
//! - An in-memory [`MockBackend`] for tests and offline runs
//! - A typed error taxonomy (transport, decode, rejection, cancellation)
//!
//! ## Example
//!
//! ```no_run
//! use budgetkit::{ClientConfig, HttpBackend, KeyApi};
//! use declarative::CancelToken;
//!
//! let config = ClientConfig::new("https://budget.example.com", "admin-token")
//!     .expect("valid config");
//! let backend = HttpBackend::new(config);
//! let cancel = CancelToken::new();
//!
//! let created = backend.create_key(&cancel, "svc-a", 1000).expect("create failed");
//! backend.update_key_budget(&cancel, created.id, 2000).expect("update failed");
//! ```
//!
//! The client holds no caches and never retries: every call is one request,
//! and its failure is the caller's to handle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::http::HttpBackend;
pub use backend::{Call, KeyApi, MockBackend};
pub use config::ClientConfig;
pub use error::{Error, ErrorCategory, Result};
pub use types::{CreatedKey, KeyPatch, KeyRecord, NewKey, Operation, UNLIMITED_BUDGET};
