//! CLI configuration: thin wrapper around `arrowcast_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--server, --timeout).

use std::time::Duration;

use arrowcast_core::ReplicaConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use arrowcast_config::{Config, Profile, config_path, load_config, save_config, to_toml};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ReplicaConfig` from the config file, profile, and CLI overrides.
///
/// `--server` wins over the profile's URL; with no matching profile the
/// flag alone is enough.
pub fn build_replica_config(global: &GlobalOpts) -> Result<ReplicaConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.server.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }

    let mut replica = profile.to_replica_config(&cfg.defaults)?;
    if let Some(secs) = global.timeout {
        replica.timeout = Duration::from_secs(secs);
    }
    Ok(replica)
}
