use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod backend;
mod commands;
mod prompt;
mod render;

use commands::{
    run_autoupdate_command, run_install_command, run_list_command, run_remove_command,
    run_repo_command,
};
use render::TerminalRenderer;

#[derive(Parser, Debug)]
#[command(name = "pakt")]
#[command(about = "Binary package installer", long_about = None)]
struct Cli {
    /// Installation prefix (defaults to $PAKT_PREFIX, then ~/.pakt).
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,
    /// Use this repository directory instead of the configured list.
    #[arg(long, global = true)]
    repository: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install a package and its dependencies.
    Install {
        name: String,
        /// Do not ask for confirmation.
        #[arg(short, long)]
        force: bool,
        /// Replace the installed version with the newest available.
        #[arg(short, long)]
        update: bool,
    },
    /// Update every installed package.
    Autoupdate {
        #[arg(short, long)]
        force: bool,
    },
    /// Show installed packages.
    List,
    /// Remove an installed package.
    Remove { name: String },
    #[command(subcommand)]
    Repo(RepoCommands),
}

#[derive(Subcommand, Debug)]
enum RepoCommands {
    Add {
        name: String,
        location: PathBuf,
        #[arg(long, default_value_t = 0)]
        priority: u32,
    },
    List,
    Remove {
        name: String,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run_cli(cli) {
        Ok(code) => code,
        Err(err) => {
            TerminalRenderer::current().print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<ExitCode> {
    let prefix = cli.prefix;
    let repository = cli.repository;

    match cli.command {
        Commands::Install {
            name,
            force,
            update,
        } => run_install_command(prefix, repository, &name, force, update),
        Commands::Autoupdate { force } => run_autoupdate_command(prefix, repository, force),
        Commands::List => run_list_command(prefix).map(|()| ExitCode::SUCCESS),
        Commands::Remove { name } => run_remove_command(prefix, &name).map(|()| ExitCode::SUCCESS),
        Commands::Repo(command) => run_repo_command(prefix, command).map(|()| ExitCode::SUCCESS),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PAKT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests;
