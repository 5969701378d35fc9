//! Data models for Folio

mod analytics;
mod chat;
mod contact;

pub use analytics::*;
pub use chat::*;
pub use contact::*;
