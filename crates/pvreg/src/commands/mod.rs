//! Command dispatch: bridges CLI args -> registry operations -> output formatting.

pub mod config_cmd;
pub mod media;
pub mod providers;
pub mod refresh;
pub mod util;

use pvreg_core::RegistryHost;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a registry-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    host: &RegistryHost,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Refresh(args) => refresh::handle(host, args, global).await,
        Command::Providers(args) => providers::handle(host, args, global).await,
        Command::Media(args) => media::handle(host, args, global).await,
        // Handled before a host is built
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not use the registries".into(),
        )),
    }
}
