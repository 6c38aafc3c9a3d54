use thiserror::Error;

/// Top-level error type for the `arrowcast-api` crate.
///
/// Covers the transport surfaces only: snapshot requests over HTTP and the
/// push channel. `arrowcast-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-success HTTP status from the server.
    #[error("Server returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    // ── Push channel ────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for failures a later attempt may not hit
    /// (connection drops, timeouts, 5xx responses).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            Self::InvalidUrl(_) | Self::Deserialization { .. } => false,
        }
    }
}
