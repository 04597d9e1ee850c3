//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, ClientEntry, Config};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::resolve_path(global);

    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config_from(&path)?;
            let out = output::render_single(
                &global.format(),
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# unrenderable: {e}")),
                |_| path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config_to(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("Config written to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::AddClient { id, path: snapshot, disabled } => {
            let mut cfg = config::load_config_from(&path)?;
            if cfg.clients.iter().any(|c| c.id == id) {
                return Err(CliError::Validation {
                    field: "id".into(),
                    reason: format!("client {id} is already configured"),
                });
            }
            cfg.clients.push(ClientEntry {
                id,
                path: snapshot,
                enabled: disabled.then_some(false),
            });
            config::save_config_to(&cfg, &path)?;
            if !global.quiet {
                eprintln!("Client {id} added");
            }
            Ok(())
        }

        ConfigCommand::RemoveClient { id } => {
            let mut cfg = config::load_config_from(&path)?;
            let before = cfg.clients.len();
            cfg.clients.retain(|c| c.id != id);
            if cfg.clients.len() == before {
                return Err(CliError::NotFound {
                    resource_type: "client".into(),
                    identifier: id.to_string(),
                    list_command: "config show".into(),
                });
            }
            config::save_config_to(&cfg, &path)?;
            if !global.quiet {
                eprintln!("Client {id} removed");
            }
            Ok(())
        }
    }
}
