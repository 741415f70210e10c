//! Coinlens - client core of a crypto market-analysis web app
//!
//! Everything a market-analysis single-page app needs except the rendering:
//! the API client, the session gate, the view-model builders, and the data
//! shaping helpers pages use. Runs natively (tests, tooling) and in the
//! browser through a `wasm-bindgen` surface.
//!
//! # Architecture
//! - `SessionContext` gates protected routes with a server round trip
//! - `ViewModelBuilder` fans out per-symbol fetches and merges the results
//! - `ViewScope` ties every fetch to the lifetime of the view that issued it
//! - `RemoteApi` abstracts the REST API; `ApiClient` is the reqwest backend
//!
//! # Features
//! - Partial-failure tolerant analysis lists (failed symbols are dropped)
//! - Cookie sessions with an optional verdict cache TTL
//! - Compact number, currency and date formatting
//! - Chart configs in the charting library's JSON shape

// Clippy configuration for view-model code patterns
#![allow(clippy::cast_precision_loss)] // Float casts OK for display
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::doc_markdown)] // Doc style flexibility
#![allow(clippy::map_unwrap_or)] // Explicit fallback preference
#![allow(clippy::if_not_else)] // Readability preference
#![allow(clippy::future_not_send)] // Single-threaded browser event loop

pub mod aggregate;
pub mod auth;
pub mod chart;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod insight;
pub mod logging;
pub mod profile;
pub mod router;
pub mod scope;
pub mod session;
pub mod types;

#[cfg(target_arch = "wasm32")]
#[allow(unsafe_code)] // wasm-bindgen glue
mod web;

#[cfg(test)]
mod testing;

pub use aggregate::{BatchReport, CoinAnalysis, ComparisonSelection, ViewModelBuilder};
pub use auth::{Credentials, RegistrationForm, RegistrationRequest};
pub use client::{ApiClient, RemoteApi};
pub use config::Config;
pub use error::{LensError, Result};
pub use format::compact_number;
pub use router::{Navigation, Navigator, Route};
pub use scope::ViewScope;
pub use session::{GateDecision, Redirect, Session, SessionContext, SessionState};
pub use types::*;

#[cfg(target_arch = "wasm32")]
pub use web::WebApp;
