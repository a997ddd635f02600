mod cli;
mod cmd;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, ConfigAction};
use std::process;

use vitalsync::logging;
use vitalsync::models::config::Config;
use vitalsync::output;

fn main() {
    let cli = Cli::parse();
    let command = cli.command.name();

    // Logging is best effort; a broken log dir must not block a sync.
    let log_config = Config::load().map(|c| c.logging).unwrap_or_default();
    let _log_guard = logging::init(&log_config, &Config::log_dir()).ok();

    let result = match cli.command {
        Commands::Init { force } => cmd::init::run(force),
        Commands::Sync { kind } => cmd::sync::run(kind.as_deref(), cli.human),
        Commands::Backfill => cmd::sync::run_backfill(cli.human),
        Commands::Latest { kind, refresh } => cmd::latest::run(&kind, refresh, cli.human),
        Commands::Record { kind, value, date } => {
            cmd::record::run(&kind, value, date.as_deref(), cli.human)
        }
        Commands::Show { kind, last } => cmd::show::run(&kind, last, cli.human),
        Commands::Delete { kind, from, to } => cmd::delete::run(&kind, from, to, cli.human),
        Commands::Watch { seconds } => cmd::watch::run(seconds, cli.human),
        Commands::Status => cmd::status::run(cli.human),
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd::config::run_show(cli.human),
            ConfigAction::Set { key, value } => cmd::config::run_set(&key, &value),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "vitalsync", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(command, error = %format!("{e:#}"), "Command failed");
        let err = output::error_from(command, &e);
        eprintln!("{}", err);
        process::exit(1);
    }
}
