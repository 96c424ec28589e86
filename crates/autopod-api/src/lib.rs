//! REST API for the AutoPod orchestrator.
//!
//! The only contract between the core and the presentation layer. Success
//! responses follow `{"success": true, "data": ...}`, failures
//! `{"success": false, "error": ...}`; the webhook endpoint alone uses the
//! `{"status", "message", "data"?}` envelope webhook senders expect.

pub mod api;
pub mod error;
pub mod handlers;
pub mod server;
pub mod trace;
pub mod types;

pub use api::{create_router, AppState};
pub use error::{ApiError, Result};
pub use server::{ApiServer, ServerConfig};
