//! Command handlers.
//!
//! One-shot commands load a snapshot, render it and disconnect; `watch`
//! keeps the push channel open until interrupted.

pub mod config_cmd;
pub mod stats;
pub mod tournaments;
pub mod watch;

use arrowcast_core::{Controller, ReplicaConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a server-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    config: ReplicaConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Tournaments(args) => tournaments::handle(config, args, global).await,
        Command::Stats(args) => stats::handle(config, args, global).await,
        Command::Watch(args) => watch::handle(Controller::new(config), args, global).await,
        Command::Config(_) => Err(CliError::Internal(
            "config commands are handled before dispatch".into(),
        )),
    }
}
