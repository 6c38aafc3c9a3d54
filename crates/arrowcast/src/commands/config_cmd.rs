//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;
use crate::output;

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let text = config::to_toml(&cfg)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| text.trim_end().to_owned(),
                |c| c.default_profile.clone().unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let active = config::active_profile_name(global, &cfg);
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            let out = names
                .iter()
                .map(|name| {
                    if **name == active {
                        format!("* {name}")
                    } else {
                        format!("  {name}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Add {
            name,
            server,
            no_websocket,
        } => {
            let mut cfg = config::load_config()?;
            let profile = Profile {
                server,
                websocket: no_websocket.then_some(false),
                ..Profile::default()
            };
            // Validate before writing anything.
            profile.to_replica_config(&cfg.defaults)?;

            if cfg.profiles.is_empty() {
                cfg.default_profile = Some(name.clone());
            }
            cfg.profiles.insert(name.clone(), profile);
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Profile '{name}' saved to {}", config::config_path().display());
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
                names.sort();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: names.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}
