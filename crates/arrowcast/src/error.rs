//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use arrowcast_config::ConfigError;
use arrowcast_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not fetch snapshots from the server: {message}")]
    #[diagnostic(
        code(arrowcast::fetch_failed),
        help(
            "Check that the server is running and reachable.\n\
             Try: arrowcast --server http://localhost:42001 tournaments list"
        )
    )]
    FetchFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(arrowcast::not_found),
        help("Run: arrowcast {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No tournament is running")]
    #[diagnostic(
        code(arrowcast::nothing_running),
        help("Pass a tournament id: arrowcast watch <ID>")
    )]
    NothingRunning,

    // ── Data ─────────────────────────────────────────────────────────

    #[error("The server sent unusable data: {message}")]
    #[diagnostic(code(arrowcast::bad_data))]
    BadData { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(arrowcast::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(arrowcast::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: arrowcast config add <NAME> --server <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(arrowcast::no_config),
        help(
            "Create a profile with: arrowcast config add default --server <URL>\n\
             Or pass --server / set ARROWCAST_SERVER.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(arrowcast::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(arrowcast::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(arrowcast::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FetchFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::NothingRunning => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fetch { message, .. } => CliError::FetchFailed { message },

            CoreError::TournamentNotFound { id } => CliError::NotFound {
                resource_type: "tournament".into(),
                identifier: id,
                list_command: "tournaments list".into(),
            },

            CoreError::MatchNotFound { tournament, index } => CliError::NotFound {
                resource_type: "match".into(),
                identifier: format!("{tournament}/{index}"),
                list_command: format!("tournaments get {tournament}"),
            },

            CoreError::PlayerNotFound {
                tournament,
                match_index,
                index,
            } => CliError::NotFound {
                resource_type: "player".into(),
                identifier: format!("{tournament}/{match_index}/{index}"),
                list_command: format!("tournaments get {tournament}"),
            },

            CoreError::Decode { entity, message } => CliError::BadData {
                message: format!("{entity}: {message}"),
            },

            CoreError::InvalidStructure {
                tournament,
                message,
            } => CliError::BadData {
                message: format!("{tournament}: {message}"),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "server".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let missing: CliError = CoreError::TournamentNotFound { id: "df-9".into() }.into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let fetch: CliError = CoreError::Fetch {
            message: "HTTP 503".into(),
            status: Some(503),
            transient: true,
        }
        .into();
        assert_eq!(fetch.exit_code(), exit_code::CONNECTION);

        let bad: CliError = CoreError::Config {
            message: "invalid server URL".into(),
        }
        .into();
        assert_eq!(bad.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn unknown_profile_is_a_usage_error() {
        let err: CliError = ConfigError::UnknownProfile {
            profile: "prod".into(),
        }
        .into();
        assert!(matches!(err, CliError::ProfileNotFound { ref name, .. } if name == "prod"));
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
