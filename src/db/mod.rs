//! Database context - named schemas, request dispatch and persistence.
//!
//! - [`Database`] - Registry of databases, each behind its own lock
//! - [`Request`] / [`Response`] - JSON request and response envelopes
//! - Background flusher - writes dirty state once writes go quiet

mod database;
mod flusher;
mod handler;
mod request;

pub use database::Database;
pub use request::{Action, OrderBy, Request, Response};
