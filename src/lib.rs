//! Matrimony profile search host.
//!
//! Serves federated profile search over newline-delimited JSON on
//! stdin/stdout.
//!
//! # Architecture
//!
//! - **Config**: TOML [`AppConfig`] embedding the engine's `SearchConfig`
//! - **Fixtures**: JSON seed data loaded into the in-memory document store
//! - **Engine**: [`profile_search::FederatedSearchEngine`] over both collections
//! - **Bridge**: request/response loop in [`host::stdio`]

pub mod app_dirs;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod host;
pub mod startup;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use fixtures::FixtureSet;
