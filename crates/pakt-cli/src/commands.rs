use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use pakt_installer::{
    default_user_prefix, find_installed_receipt, read_install_receipts, remove_package,
    ActiveTransaction, InstallReceipt, PrefixLayout,
};
use pakt_registry::{RepositoryIndex, RepositoryPool, RepositoryRecord, RepositoryStore};
use pakt_transaction::{install_package, update_all, TransactionError, TransactionOutcome};
use tracing::info;

use crate::backend::PrefixBackend;
use crate::render::{format_outcome_line, ConsoleFrontend, TerminalRenderer};
use crate::RepoCommands;

/// Name given to a repository passed with `--repository`.
const OVERRIDE_REPOSITORY_NAME: &str = "command-line";

pub(crate) fn resolve_layout(prefix: Option<PathBuf>) -> Result<PrefixLayout> {
    let prefix = match prefix {
        Some(prefix) => prefix,
        None => default_user_prefix()?,
    };
    Ok(PrefixLayout::new(prefix))
}

fn repository_store(layout: &PrefixLayout) -> RepositoryStore {
    RepositoryStore::new(layout.state_dir())
}

pub(crate) fn select_repository_pool(
    layout: &PrefixLayout,
    repository: Option<PathBuf>,
) -> Result<RepositoryPool> {
    if let Some(root) = repository {
        return Ok(RepositoryPool::new(vec![RepositoryIndex::open(
            OVERRIDE_REPOSITORY_NAME,
            root,
        )]));
    }

    let records = repository_store(layout).list_repositories()?;
    let pool = RepositoryPool::from_records(&records);
    if pool.is_empty() {
        return Err(anyhow!(
            "no repositories configured; add one with `pakt repo add <name> <location>` or pass --repository"
        ));
    }
    Ok(pool)
}

pub(crate) fn run_install_command(
    prefix: Option<PathBuf>,
    repository: Option<PathBuf>,
    name: &str,
    force: bool,
    update: bool,
) -> Result<ExitCode> {
    let layout = resolve_layout(prefix)?;
    let pool = select_repository_pool(&layout, repository)?;
    let operation = if update { "update" } else { "install" };
    let mut backend = PrefixBackend::open(layout, pool, operation)?;
    let renderer = TerminalRenderer::current();
    let mut frontend = ConsoleFrontend::new(renderer);

    let result = install_package(&mut backend, &mut frontend, name, force, update);
    finish_transaction(renderer, result)
}

pub(crate) fn run_autoupdate_command(
    prefix: Option<PathBuf>,
    repository: Option<PathBuf>,
    force: bool,
) -> Result<ExitCode> {
    let layout = resolve_layout(prefix)?;
    let pool = select_repository_pool(&layout, repository)?;
    let mut backend = PrefixBackend::open(layout, pool, "autoupdate")?;
    let renderer = TerminalRenderer::current();
    let mut frontend = ConsoleFrontend::new(renderer);

    let result = update_all(&mut backend, &mut frontend, force);
    finish_transaction(renderer, result)
}

fn finish_transaction(
    renderer: TerminalRenderer,
    result: Result<TransactionOutcome, TransactionError>,
) -> Result<ExitCode> {
    let outcome = result?;
    info!(?outcome, "transaction finished");
    if let Some((status, line)) = format_outcome_line(&outcome) {
        renderer.print_status(status, &line);
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn run_list_command(prefix: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(prefix)?;
    let receipts = read_install_receipts(&layout)?;
    if receipts.is_empty() {
        println!("No packages currently installed.");
        return Ok(());
    }
    for line in format_installed_lines(&receipts) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn format_installed_lines(receipts: &[InstallReceipt]) -> Vec<String> {
    receipts
        .iter()
        .map(|receipt| {
            format!(
                "{}-{} ({}, {})",
                receipt.name,
                receipt.version,
                receipt.install_status.as_str(),
                receipt.install_reason.as_str()
            )
        })
        .collect()
}

pub(crate) fn run_remove_command(prefix: Option<PathBuf>, name: &str) -> Result<()> {
    let layout = resolve_layout(prefix)?;
    layout.ensure_base_dirs()?;
    let lock = ActiveTransaction::acquire(&layout, "remove")?;

    let receipt = find_installed_receipt(&layout, name)?
        .ok_or_else(|| anyhow!("package '{name}' is not installed"))?;
    let removed = remove_package(&layout, name, &receipt.version, false)
        .with_context(|| format!("failed to remove {name}-{}", receipt.version))?;
    lock.release()?;

    TerminalRenderer::current().print_status(
        "ok",
        &format!(
            "removed {name}-{} ({} file(s))",
            receipt.version,
            removed.len()
        ),
    );
    Ok(())
}

pub(crate) fn run_repo_command(prefix: Option<PathBuf>, command: RepoCommands) -> Result<()> {
    let layout = resolve_layout(prefix)?;
    let store = repository_store(&layout);
    let renderer = TerminalRenderer::current();

    match command {
        RepoCommands::Add {
            name,
            location,
            priority,
        } => {
            let location = location
                .canonicalize()
                .with_context(|| format!("repository location {} is not accessible", location.display()))?;
            store.add_repository(RepositoryRecord {
                name: name.clone(),
                location,
                enabled: true,
                priority,
            })?;
            renderer.print_status("ok", &format!("added repository {name}"));
        }
        RepoCommands::List => {
            let records = store.list_repositories()?;
            if records.is_empty() {
                println!("No repositories configured.");
            }
            for line in format_repository_lines(&records) {
                println!("{line}");
            }
        }
        RepoCommands::Remove { name } => {
            store.remove_repository(&name)?;
            renderer.print_status("ok", &format!("removed repository {name}"));
        }
    }
    Ok(())
}

pub(crate) fn format_repository_lines(records: &[RepositoryRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let state = if record.enabled { "" } else { " (disabled)" };
            format!(
                "{} priority={} {}{}",
                record.name,
                record.priority,
                record.location.display(),
                state
            )
        })
        .collect()
}
