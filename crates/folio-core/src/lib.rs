//! # Folio
//!
//! Backend for a personal portfolio site.
//!
//! Folio answers chat messages from site visitors, preferring a hosted
//! language model and falling back to a keyword-matched table of canned
//! answers, keeps in-memory usage analytics, and relays contact form
//! submissions by email.
//!
//! ## Architecture
//!
//! - **Chat**: completion client, canned response table and the resolver
//!   choosing between them
//! - **Analytics**: request counters, token and cost tracking, latency window,
//!   sticky alerts
//! - **Contact**: form validation and mail relay
//! - **API**: axum HTTP server exposing all of the above
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the server
//! folio serve
//!
//! # Ask a single question from the terminal
//! folio ask "What are your skills?"
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod analytics;
pub mod api;
pub mod chat;
pub mod config;
pub mod contact;
pub mod error;
pub mod models;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::analytics::MetricsAggregator;
    pub use crate::chat::{ChatService, ResponseResolver};
    pub use crate::config::Config;
    pub use crate::contact::ContactService;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}
