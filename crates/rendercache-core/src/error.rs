//! Error types for `RenderCache`.
//!
//! Builder failures are not represented here: they keep their caller-chosen
//! error type and flow through [`MemoCache::get_or_build`](crate::MemoCache::get_or_build)
//! untouched. This module covers the cache's own failure modes.

use thiserror::Error;

/// Result type alias for `RenderCache` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `RenderCache` operations.
///
/// Error codes follow the pattern `RCACHE-XXX` for easy debugging.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (RCACHE-001).
    #[error("[RCACHE-001] Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Internal error (RCACHE-002).
    ///
    /// Indicates a broken internal invariant. Please report if encountered.
    #[error("[RCACHE-002] Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g., "RCACHE-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "RCACHE-001",
            Self::Internal(_) => "RCACHE-002",
        }
    }

    /// Returns true if this error is recoverable.
    ///
    /// Internal consistency errors are not recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
