//! Unified error types for the relay.

use std::fmt::Display;

use thiserror::Error;

/// Top-level error type for the relay application.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration file could not be resolved, read, or parsed.
    #[error("config: {0}")]
    Config(String),

    /// An outbound provider call failed (network error, non-2xx status, or
    /// malformed response).
    #[error("upstream: {0}")]
    Upstream(String),

    /// Server bind or runtime error.
    #[error("server: {0}")]
    Server(String),
}

impl RelayError {
    /// Configuration error from a message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Configuration error wrapping an underlying cause.
    pub fn config_with(msg: impl Display, cause: impl Display) -> Self {
        Self::Config(format!("{msg}: {cause}"))
    }

    /// Upstream error from a message.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Upstream error naming the provider that failed.
    pub fn upstream_with(provider: &str, cause: impl Display) -> Self {
        Self::Upstream(format!("{provider}: {cause}"))
    }

    /// Server error wrapping an underlying cause.
    pub fn server_with(msg: impl Display, cause: impl Display) -> Self {
        Self::Server(format!("{msg}: {cause}"))
    }
}
