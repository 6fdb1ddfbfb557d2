//! Error types.

use thiserror::Error;

/// Failure delivering a request or reading the duplex stream.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {}{}", .status, reason_suffix(.status_text))]
    Status {
        status: u16,
        /// Canonical reason phrase for `status`, if the code has one.
        status_text: Option<String>,
    },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response body: {0}")]
    Body(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

fn reason_suffix(status_text: &Option<String>) -> String {
    match status_text {
        Some(text) if !text.is_empty() => format!(": {text}"),
        _ => String::new(),
    }
}

/// Invalid client configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Unknown transport mode: {0} (expected 'http' or 'duplex')")]
    UnknownTransport(String),

    #[error("Unknown route style: {0} (expected 'routed' or 'legacy')")]
    UnknownRouteStyle(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
}

/// Failure refreshing the agent directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Health probe failed: {0}")]
    Probe(#[from] ChannelError),

    #[error("Health payload has no components mapping")]
    MissingComponents,
}

// ============================================================================
// TESTS
// ============================================================================
