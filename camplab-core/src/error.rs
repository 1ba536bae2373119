//! Error types for camplab-core

use thiserror::Error;

/// Main error type for the camplab-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Assistant gateway failure (transport, non-2xx, or undecodable reply).
    ///
    /// `status` is `None` when no HTTP response was received.
    #[error("gateway error{}: {message}", status_suffix(.status))]
    Gateway {
        status: Option<u16>,
        message: String,
    },

    /// Assistant gateway call did not complete within the configured timeout
    #[error("gateway timed out after {0}s")]
    GatewayTimeout(u64),

    /// Conversation archive error
    #[error("archive error: {0}")]
    Archive(String),

    /// Knowledge base could not be loaded
    #[error("knowledge base error: {0}")]
    Knowledge(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl Error {
    /// Build a gateway error for a request that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Gateway {
            status: None,
            message: message.into(),
        }
    }

    /// True for failures worth retrying: no response, a timeout, or a 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Gateway { status: None, .. } => true,
            Error::Gateway {
                status: Some(status),
                ..
            } => *status >= 500,
            Error::GatewayTimeout(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for camplab-core
pub type Result<T> = std::result::Result<T, Error>;
