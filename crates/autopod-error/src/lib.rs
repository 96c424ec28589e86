//! Common error types for AutoPod.
//!
//! This crate provides the unified error taxonomy shared across AutoPod
//! crates, so that every component reports failures in the same vocabulary
//! and the API layer can map them to HTTP statuses in one place.
//!
//! # Usage
//!
//! ```rust
//! use autopod_error::CommonError;
//!
//! fn example() -> Result<(), CommonError> {
//!     Err(CommonError::NotFound("container web".to_string()))
//! }
//! ```
//!
//! # Crate-Specific Errors
//!
//! Each crate can define its own error type that wraps `CommonError`:
//!
//! ```rust,ignore
//! use autopod_error::CommonError;
//! use thiserror::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum MyError {
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//!
//!     #[error("my specific error: {0}")]
//!     Specific(String),
//! }
//! ```

mod common;

pub use common::CommonError;

/// Result type alias using `CommonError`.
pub type Result<T> = std::result::Result<T, CommonError>;
