use super::*;
use crate::backend::PrefixBackend;
use crate::commands::{format_installed_lines, format_repository_lines, select_repository_pool};
use crate::prompt::parse_answer;
use crate::render::{
    format_outcome_line, missing_dependency_lines, render_progress_line, render_status_line,
    resolve_output_style, unpacking_message, OutputStyle,
};
use ed25519_dalek::{Signer, SigningKey};
use pakt_core::{LifecycleState, PackageEntry};
use pakt_installer::{
    find_installed_receipt, read_install_receipts, InstallReason, InstallReceipt, InstallStatus,
    PrefixLayout,
};
use pakt_registry::{RepositoryPool, RepositoryRecord, RepositoryStore};
use pakt_security::sha256_hex_file;
use pakt_transaction::{
    install_package, update_all, MissingRequirement, TransactionError, TransactionEvent,
    TransactionFrontend, TransactionMode, TransactionOutcome,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Default)]
struct ScriptedFrontend {
    answer: bool,
    prompts: usize,
    events: Vec<String>,
}

impl TransactionFrontend for ScriptedFrontend {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.prompts += 1;
        self.answer
    }

    fn report(&mut self, event: TransactionEvent<'_>) {
        match event {
            TransactionEvent::Unpacking { entry } => self.events.push(unpacking_message(entry)),
            TransactionEvent::Removing { name, version } => {
                self.events.push(format!("removing {name}-{version}"))
            }
            TransactionEvent::Configuring { name, version } => {
                self.events.push(format!("configuring {name}-{version}"))
            }
            _ => {}
        }
    }
}

#[test]
fn resolve_output_style_honors_override_then_terminal() {
    assert_eq!(resolve_output_style(true, None), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false, None), OutputStyle::Plain);
    assert_eq!(resolve_output_style(true, Some("plain")), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, Some("rich")), OutputStyle::Rich);
    assert_eq!(resolve_output_style(false, Some("fancy")), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "installed 2 package(s)"),
        "installed 2 package(s)"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "installed 2 package(s)"),
        "[OK] installed 2 package(s)"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "err", "error: boom"),
        "[ERR] error: boom"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "step", "Configuring package a-1 ..."),
        "[..] Configuring package a-1 ..."
    );
}

#[test]
fn render_progress_line_is_hidden_in_plain_mode() {
    assert!(render_progress_line(OutputStyle::Plain, "unpack", 1, 2, None).is_none());
    let line = render_progress_line(OutputStyle::Rich, "unpack", 1, 2, None)
        .expect("rich mode must render");
    assert!(line.contains(" 50% 1/2"));
}

#[test]
fn parse_answer_accepts_only_explicit_yes() {
    assert!(parse_answer("y\n"));
    assert!(parse_answer("  YES "));
    assert!(!parse_answer("\n"));
    assert!(!parse_answer("no"));
    assert!(!parse_answer("yep"));
}

#[test]
fn outcome_lines_cover_benign_results() {
    assert_eq!(
        format_outcome_line(&TransactionOutcome::Completed {
            mode: TransactionMode::Bulk,
            packages: 3
        }),
        Some(("ok", "updated 3 package(s)".to_string()))
    );
    assert_eq!(
        format_outcome_line(&TransactionOutcome::AlreadyInstalled {
            name: "zlib".to_string()
        }),
        Some(("info", "Package 'zlib' is already installed.".to_string()))
    );
    assert_eq!(
        format_outcome_line(&TransactionOutcome::NothingToDo),
        Some(("info", "All packages are up-to-date.".to_string()))
    );
    assert_eq!(format_outcome_line(&TransactionOutcome::Declined), None);
}

#[test]
fn missing_dependency_lines_list_each_requirement() {
    let missing = vec![
        MissingRequirement {
            name: "libfoo".to_string(),
            requirement: ">=1.2".to_string(),
        },
        MissingRequirement {
            name: "libbar".to_string(),
            requirement: "^2".to_string(),
        },
    ];
    assert_eq!(
        missing_dependency_lines("app", &missing),
        vec![
            "Unable to locate some required packages for app:",
            "  * Missing binary package for: libfoo >=1.2",
            "  * Missing binary package for: libbar ^2",
        ]
    );
}

#[test]
fn unpacking_message_names_the_artifact() {
    let entry = PackageEntry {
        name: "zlib".to_string(),
        version: "1.3.1".to_string(),
        artifact_size: 1,
        installed_size: 1,
        artifact_location: PathBuf::from("/srv/repo/packages"),
        artifact_filename: "zlib-1.3.1.tar.gz".to_string(),
        artifact_sha256: "0".repeat(64),
        essential: false,
        conf_files: Vec::new(),
        lifecycle_state: LifecycleState::NotUnpacked,
    };
    assert_eq!(
        unpacking_message(&entry),
        "Unpacking zlib-1.3.1 (from .../zlib-1.3.1.tar.gz) ..."
    );
}

#[test]
fn installed_and_repository_lines_are_stable() {
    let receipt = InstallReceipt {
        name: "zlib".to_string(),
        version: "1.3.1".to_string(),
        essential: false,
        repository: Some("main".to_string()),
        files: Vec::new(),
        conf_files: Vec::new(),
        install_reason: InstallReason::Dependency,
        install_status: InstallStatus::Installed,
        installed_at_unix: 1,
    };
    assert_eq!(
        format_installed_lines(&[receipt]),
        vec!["zlib-1.3.1 (installed, dependency)"]
    );

    let record = RepositoryRecord {
        name: "main".to_string(),
        location: PathBuf::from("/srv/pakt/main"),
        enabled: false,
        priority: 5,
    };
    assert_eq!(
        format_repository_lines(&[record]),
        vec!["main priority=5 /srv/pakt/main (disabled)"]
    );
}

#[test]
fn cli_parses_install_flags_and_global_prefix() {
    let cli = Cli::try_parse_from(["pakt", "install", "zlib", "--force", "--prefix", "/tmp/p"])
        .expect("must parse");
    assert_eq!(cli.prefix, Some(PathBuf::from("/tmp/p")));
    match cli.command {
        Commands::Install {
            name,
            force,
            update,
        } => {
            assert_eq!(name, "zlib");
            assert!(force);
            assert!(!update);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["pakt", "repo", "add", "main", "/srv/main", "--priority", "3"])
        .expect("must parse");
    assert!(matches!(
        cli.command,
        Commands::Repo(RepoCommands::Add { priority: 3, .. })
    ));
}

#[test]
fn repository_pool_requires_configuration_or_override() {
    let root = test_root("pool");
    let layout = PrefixLayout::new(root.join("prefix"));

    let err = select_repository_pool(&layout, None).expect_err("empty config must fail");
    assert!(err.to_string().contains("no repositories configured"));

    let pool = select_repository_pool(&layout, Some(root.join("repo"))).expect("override");
    assert_eq!(pool.repositories()[0].name(), "command-line");

    RepositoryStore::new(layout.state_dir())
        .add_repository(RepositoryRecord {
            name: "main".to_string(),
            location: root.join("repo"),
            enabled: true,
            priority: 0,
        })
        .expect("must add repository");
    let pool = select_repository_pool(&layout, None).expect("configured pool");
    assert_eq!(pool.repositories()[0].name(), "main");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn install_places_package_and_dependency_then_releases_prefix() {
    let root = test_root("install");
    let repo = TestRepository::create(&root.join("repo"));
    repo.publish("lib", "1.0.0", &[("usr/lib/libdemo.so", "lib v1")], "", "");
    repo.publish(
        "app",
        "1.0.0",
        &[("usr/bin/app", "app v1")],
        "",
        "[dependencies]\nlib = \">=1.0\"\n",
    );
    let layout = PrefixLayout::new(root.join("prefix"));
    let mut backend = open_backend(&layout, &repo, "install");
    let mut frontend = ScriptedFrontend {
        answer: true,
        ..ScriptedFrontend::default()
    };

    let outcome = install_package(&mut backend, &mut frontend, "app", false, false)
        .expect("install must succeed");

    assert_eq!(
        outcome,
        TransactionOutcome::Completed {
            mode: TransactionMode::SingleOrigin,
            packages: 2
        }
    );
    assert_eq!(frontend.prompts, 1);
    assert_eq!(
        fs::read_to_string(layout.root_dir().join("usr/bin/app")).expect("read"),
        "app v1"
    );
    let receipts = read_install_receipts(&layout).expect("must read receipts");
    let summary = receipts
        .iter()
        .map(|receipt| {
            (
                receipt.name.as_str(),
                receipt.install_reason,
                receipt.install_status,
            )
        })
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("app", InstallReason::Root, InstallStatus::Installed),
            ("lib", InstallReason::Dependency, InstallStatus::Installed),
        ]
    );
    assert_eq!(receipts[0].repository.as_deref(), Some("test"));
    assert!(!layout.transaction_active_path().exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn autoupdate_replaces_package_and_keeps_edited_configuration() {
    let root = test_root("autoupdate");
    let repo = TestRepository::create(&root.join("repo"));
    repo.publish(
        "app",
        "1.0.0",
        &[("usr/bin/app", "app v1"), ("etc/app.conf", "default v1")],
        "conf_files = [\"etc/app.conf\"]\n",
        "",
    );
    let layout = PrefixLayout::new(root.join("prefix"));
    let mut backend = open_backend(&layout, &repo, "install");
    install_package(&mut backend, &mut ScriptedFrontend::default(), "app", true, false)
        .expect("initial install must succeed");
    fs::write(layout.root_dir().join("etc/app.conf"), "edited").expect("must edit conf");

    repo.publish(
        "app",
        "1.1.0",
        &[("usr/bin/app", "app v2"), ("etc/app.conf", "default v2")],
        "conf_files = [\"etc/app.conf\"]\n",
        "",
    );
    let mut backend = open_backend(&layout, &repo, "autoupdate");
    let mut frontend = ScriptedFrontend::default();

    let outcome = update_all(&mut backend, &mut frontend, true).expect("update must succeed");

    assert_eq!(
        outcome,
        TransactionOutcome::Completed {
            mode: TransactionMode::Bulk,
            packages: 1
        }
    );
    assert_eq!(
        frontend.events,
        vec![
            "removing app-1.0.0",
            "Unpacking app-1.1.0 (from .../app-1.1.0.tar.gz) ...",
            "configuring app-1.1.0",
        ]
    );
    assert_eq!(
        fs::read_to_string(layout.root_dir().join("usr/bin/app")).expect("read"),
        "app v2"
    );
    assert_eq!(
        fs::read_to_string(layout.root_dir().join("etc/app.conf")).expect("read"),
        "edited"
    );
    let receipt = find_installed_receipt(&layout, "app")
        .expect("must read")
        .expect("receipt must exist");
    assert_eq!(receipt.version, "1.1.0");

    let mut backend = open_backend(&layout, &repo, "autoupdate");
    let outcome = update_all(&mut backend, &mut ScriptedFrontend::default(), true)
        .expect("second update must succeed");
    assert_eq!(outcome, TransactionOutcome::NothingToDo);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn install_with_outdated_installed_dependency_aborts_before_changes() {
    let root = test_root("outdated-dep");
    let repo = TestRepository::create(&root.join("repo"));
    repo.publish("lib", "1.0.0", &[("usr/lib/libdemo.so", "lib v1")], "", "");
    let layout = PrefixLayout::new(root.join("prefix"));
    let mut backend = open_backend(&layout, &repo, "install");
    install_package(&mut backend, &mut ScriptedFrontend::default(), "lib", true, false)
        .expect("initial install must succeed");

    repo.publish("lib", "2.0.0", &[("usr/lib/libdemo.so", "lib v2")], "", "");
    repo.publish(
        "app",
        "1.0.0",
        &[("usr/bin/app", "app v1")],
        "",
        "[dependencies]\nlib = \">=2.0\"\n",
    );
    let mut backend = open_backend(&layout, &repo, "install");
    let mut frontend = ScriptedFrontend::default();

    let err = install_package(&mut backend, &mut frontend, "app", true, false)
        .expect_err("outdated dependency must abort the install");

    match err {
        TransactionError::UnresolvedDependencies { origin, missing } => {
            assert_eq!(origin, "app");
            assert_eq!(
                missing.iter().map(ToString::to_string).collect::<Vec<_>>(),
                vec!["lib >=2.0"]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(frontend.events.is_empty());
    let receipts = read_install_receipts(&layout)
        .expect("must read receipts")
        .into_iter()
        .map(|receipt| (receipt.name, receipt.version))
        .collect::<Vec<_>>();
    assert_eq!(receipts, vec![("lib".to_string(), "1.0.0".to_string())]);
    assert_eq!(
        fs::read_to_string(layout.root_dir().join("usr/lib/libdemo.so")).expect("read"),
        "lib v1"
    );
    assert!(!layout.root_dir().join("usr/bin/app").exists());
    assert!(!layout.transaction_active_path().exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn tampered_artifact_leaves_prefix_untouched() {
    let root = test_root("tampered");
    let repo = TestRepository::create(&root.join("repo"));
    repo.publish("app", "1.0.0", &[("usr/bin/app", "app v1")], "", "");
    fs::write(repo.root.join("packages/app-1.0.0.tar.gz"), "not the archive")
        .expect("must tamper artifact");
    let layout = PrefixLayout::new(root.join("prefix"));
    let mut backend = open_backend(&layout, &repo, "install");

    let err = install_package(&mut backend, &mut ScriptedFrontend::default(), "app", true, false)
        .expect_err("tampered artifact must fail");

    assert!(matches!(err, TransactionError::IntegrityMismatch { ref name, .. } if name == "app"));
    assert!(read_install_receipts(&layout).expect("read").is_empty());
    assert!(!layout.root_dir().join("usr").exists());
    assert!(!layout.transaction_active_path().exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn second_backend_cannot_claim_a_busy_prefix() {
    let root = test_root("busy");
    let repo = TestRepository::create(&root.join("repo"));
    let layout = PrefixLayout::new(root.join("prefix"));
    let _held = open_backend(&layout, &repo, "install");

    let err = PrefixBackend::open(layout.clone(), repo.pool(), "autoupdate")
        .err()
        .expect("second session must fail");
    assert!(err.to_string().contains("another transaction is active"));

    let _ = fs::remove_dir_all(&root);
}

struct TestRepository {
    root: PathBuf,
    key: SigningKey,
}

impl TestRepository {
    fn create(root: &Path) -> Self {
        let key = SigningKey::from_bytes(&[9_u8; 32]);
        fs::create_dir_all(root.join("index")).expect("must create index");
        fs::create_dir_all(root.join("packages")).expect("must create packages");
        fs::write(
            root.join("repository.pub"),
            hex::encode(key.verifying_key().to_bytes()),
        )
        .expect("must write public key");
        Self {
            root: root.to_path_buf(),
            key,
        }
    }

    fn pool(&self) -> RepositoryPool {
        RepositoryPool::new(vec![pakt_registry::RepositoryIndex::open(
            "test", &self.root,
        )])
    }

    /// Builds a tar.gz artifact from `files` and publishes a signed manifest
    /// for it. `top` goes before any table, `tables` after the top-level keys.
    fn publish(&self, name: &str, version: &str, files: &[(&str, &str)], top: &str, tables: &str) {
        let staging = self.root.join("staging").join(format!("{name}-{version}"));
        for (rel, contents) in files {
            let path = staging.join(rel);
            fs::create_dir_all(path.parent().expect("parent")).expect("must create dir");
            fs::write(path, contents).expect("must write payload file");
        }

        let filename = format!("{name}-{version}.tar.gz");
        let artifact = self.root.join("packages").join(&filename);
        let status = Command::new("tar")
            .arg("-czf")
            .arg(&artifact)
            .arg("-C")
            .arg(&staging)
            .arg(".")
            .status()
            .expect("tar must run");
        assert!(status.success(), "tar must succeed");
        let sha256 = sha256_hex_file(&artifact).expect("must hash artifact");
        let size = fs::metadata(&artifact).expect("artifact metadata").len();

        let manifest = format!(
            "name = \"{name}\"\nversion = \"{version}\"\ninstalled_size = 64\n{top}{tables}\n[artifact]\nfilename = \"{filename}\"\nsha256 = \"{sha256}\"\nsize = {size}\n"
        );
        let dir = self.root.join("index").join(name);
        fs::create_dir_all(&dir).expect("must create package index dir");
        let manifest_path = dir.join(format!("{version}.toml"));
        fs::write(&manifest_path, manifest.as_bytes()).expect("must write manifest");
        let signature = self.key.sign(manifest.as_bytes());
        fs::write(
            dir.join(format!("{version}.toml.sig")),
            hex::encode(signature.to_bytes()),
        )
        .expect("must write signature");
    }
}

fn open_backend(layout: &PrefixLayout, repo: &TestRepository, operation: &str) -> PrefixBackend {
    PrefixBackend::open(layout.clone(), repo.pool(), operation).expect("must open backend")
}

fn test_root(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "pakt-cli-{tag}-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ))
}
