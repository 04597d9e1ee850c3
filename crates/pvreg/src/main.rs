mod cli;
mod commands;
mod config;
mod error;
mod output;
mod source;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so structured output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(mut cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without loading registries
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "pvreg", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let path = config::resolve_path(&cli.global);
            let cfg = config::load_config_from(&path)?;
            config::apply_defaults(&mut cli.global, &cfg);
            let host = config::open_host(&cfg, &path).await?;

            tracing::debug!(command = ?cmd, clients = cfg.clients.len(), "dispatching command");
            let result = commands::dispatch(cmd, &host, &cli.global).await;
            host.shutdown().await;
            result
        }
    }
}
