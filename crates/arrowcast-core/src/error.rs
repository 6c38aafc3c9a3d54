// ── Core error types ──
//
// Errors surfaced by decoders, accessors and replica mutations. Consumers
// never see HTTP status codes or JSON parse failures directly; the
// `From<arrowcast_api::Error>` impl folds transport failures into `Fetch`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Decode errors ────────────────────────────────────────────────
    /// A raw record was structurally unusable (missing id, unknown kind).
    #[error("Cannot decode {entity}: {message}")]
    Decode {
        entity: &'static str,
        message: String,
    },

    // ── Replica lookups ──────────────────────────────────────────────
    #[error("Tournament not found: {id}")]
    TournamentNotFound { id: String },

    #[error("Match {index} not found in tournament {tournament}")]
    MatchNotFound { tournament: String, index: usize },

    #[error("Player {index} not found in match {match_index} of tournament {tournament}")]
    PlayerNotFound {
        tournament: String,
        match_index: usize,
        index: usize,
    },

    /// The match list cannot be split into playoffs, semis and a final.
    #[error("Tournament {tournament} has an invalid structure: {message}")]
    InvalidStructure { tournament: String, message: String },

    // ── Transport (wrapped, not exposed raw) ─────────────────────────
    #[error("Snapshot fetch failed: {message}")]
    Fetch {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
        transient: bool,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn decode(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            entity,
            message: message.into(),
        }
    }

    pub(crate) fn tournament_not_found(id: impl Into<String>) -> Self {
        Self::TournamentNotFound { id: id.into() }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<arrowcast_api::Error> for CoreError {
    fn from(err: arrowcast_api::Error) -> Self {
        let transient = err.is_transient();
        match err {
            arrowcast_api::Error::Status { status, path } => CoreError::Fetch {
                message: format!("HTTP {status} for {path}"),
                status: Some(status),
                transient,
            },
            arrowcast_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid server URL: {e}"),
            },
            other => CoreError::Fetch {
                message: other.to_string(),
                status: None,
                transient,
            },
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::decode("payload", err.to_string())
    }
}
