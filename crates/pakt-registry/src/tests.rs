use super::*;
use ed25519_dalek::{Signer, SigningKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

const ARTIFACT_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[test]
fn store_add_rejects_duplicate_name() {
    let root = test_root("store");
    let store = RepositoryStore::new(&root);

    store
        .add_repository(record("main", 10))
        .expect("must add repository");
    let err = store
        .add_repository(record("main", 5))
        .expect_err("must reject duplicate repository name");
    assert!(err.to_string().contains("already exists"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn store_add_rejects_invalid_name() {
    let root = test_root("store");
    let store = RepositoryStore::new(&root);

    for name in ["bad name", "-lead", "_lead", "Upper", ""] {
        let err = store
            .add_repository(record(name, 1))
            .expect_err("must reject invalid repository name");
        assert!(err.to_string().contains("invalid repository name"));
    }
    let too_long = "a".repeat(65);
    assert!(store.add_repository(record(&too_long, 1)).is_err());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn store_lists_by_priority_then_name() {
    let root = test_root("store");
    let store = RepositoryStore::new(&root);

    store.add_repository(record("testing", 20)).expect("add");
    store.add_repository(record("nonfree", 10)).expect("add");
    store.add_repository(record("main", 10)).expect("add");

    let names = store
        .list_repositories()
        .expect("must list")
        .into_iter()
        .map(|record| record.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["main", "nonfree", "testing"]);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn store_remove_unknown_repository_fails() {
    let root = test_root("store");
    let store = RepositoryStore::new(&root);
    store.add_repository(record("main", 1)).expect("add");

    store.remove_repository("main").expect("must remove");
    assert!(store.list_repositories().expect("must list").is_empty());

    let err = store
        .remove_repository("main")
        .expect_err("second removal must fail");
    assert!(err.to_string().contains("not found"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn store_defaults_enabled_when_field_missing() {
    let root = test_root("store");
    fs::create_dir_all(&root).expect("must create root");
    fs::write(
        root.join("repositories.toml"),
        "[[repositories]]\nname = \"main\"\nlocation = \"/srv/main\"\n",
    )
    .expect("must write state file");

    let records = RepositoryStore::new(&root)
        .list_repositories()
        .expect("must list");
    assert_eq!(records.len(), 1);
    assert!(records[0].enabled);
    assert_eq!(records[0].priority, 0);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn index_returns_signed_versions_newest_first() {
    let root = test_root("index");
    let key = signing_key();
    init_repository(&root, &key);
    write_signed_manifest(&root, &key, "zlib", "1.2.13", "");
    write_signed_manifest(&root, &key, "zlib", "1.3.1", "");

    let index = RepositoryIndex::open("main", &root);
    let versions = index.package_versions("zlib").expect("must load versions");
    let rendered = versions
        .iter()
        .map(|manifest| manifest.version.to_string())
        .collect::<Vec<_>>();
    assert_eq!(rendered, vec!["1.3.1", "1.2.13"]);
    assert_eq!(index.package_names().expect("names"), vec!["zlib"]);
    assert_eq!(index.artifact_dir(), root.join("packages"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn index_rejects_tampered_manifest() {
    let root = test_root("index");
    let key = signing_key();
    init_repository(&root, &key);
    let path = write_signed_manifest(&root, &key, "zlib", "1.3.1", "");
    let mut content = fs::read_to_string(&path).expect("read manifest");
    content.push_str("\n# tampered\n");
    fs::write(&path, content).expect("rewrite manifest");

    let err = RepositoryIndex::open("main", &root)
        .package_versions("zlib")
        .expect_err("tampered manifest must fail");
    assert!(err.to_string().contains("invalid manifest signature"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn index_rejects_manifest_stored_under_other_name() {
    let root = test_root("index");
    let key = signing_key();
    init_repository(&root, &key);
    let path = write_signed_manifest(&root, &key, "zlib", "1.3.1", "");
    let misplaced_dir = root.join("index").join("libz");
    fs::create_dir_all(&misplaced_dir).expect("create dir");
    fs::rename(&path, misplaced_dir.join("1.3.1.toml")).expect("move manifest");
    fs::rename(
        path.with_extension("toml.sig"),
        misplaced_dir.join("1.3.1.toml.sig"),
    )
    .expect("move signature");

    let err = RepositoryIndex::open("main", &root)
        .package_versions("libz")
        .expect_err("misplaced manifest must fail");
    assert!(err.to_string().contains("is stored under 'libz'"));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn index_without_package_returns_empty() {
    let root = test_root("index");
    let index = RepositoryIndex::open("main", &root);
    assert!(index.package_versions("zlib").expect("load").is_empty());
    assert!(index.package_names().expect("names").is_empty());
}

#[test]
fn pool_prefers_first_repository_carrying_package() {
    let first = test_root("pool-first");
    let second = test_root("pool-second");
    let key = signing_key();
    init_repository(&first, &key);
    init_repository(&second, &key);
    write_signed_manifest(&first, &key, "zlib", "1.2.13", "");
    write_signed_manifest(&second, &key, "zlib", "1.3.1", "");
    write_signed_manifest(&second, &key, "xz", "5.4.6", "");

    let mut first_record = record("first", 1);
    first_record.location = first.clone();
    let mut second_record = record("second", 2);
    second_record.location = second.clone();
    let pool = RepositoryPool::from_records(&[first_record, second_record]);

    let zlib = pool.package_versions("zlib").expect("load zlib");
    assert_eq!(zlib.len(), 1);
    assert_eq!(zlib[0].version.to_string(), "1.2.13");
    assert_eq!(pool.locate("xz").map(RepositoryIndex::name), Some("second"));
    assert!(pool.package_versions("missing").expect("load").is_empty());

    let _ = fs::remove_dir_all(&first);
    let _ = fs::remove_dir_all(&second);
}

#[test]
fn pool_skips_disabled_repositories() {
    let mut disabled = record("disabled", 1);
    disabled.enabled = false;
    let pool = RepositoryPool::from_records(&[disabled, record("main", 2)]);
    let names = pool
        .repositories()
        .iter()
        .map(RepositoryIndex::name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["main"]);
    assert!(!pool.is_empty());
}

fn record(name: &str, priority: u32) -> RepositoryRecord {
    RepositoryRecord {
        name: name.to_string(),
        location: PathBuf::from(format!("/srv/pakt/{name}")),
        enabled: true,
        priority,
    }
}

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[42_u8; 32])
}

fn init_repository(root: &Path, key: &SigningKey) {
    fs::create_dir_all(root.join("index")).expect("must create index");
    fs::create_dir_all(root.join("packages")).expect("must create packages");
    fs::write(
        root.join("repository.pub"),
        hex::encode(key.verifying_key().to_bytes()),
    )
    .expect("must write public key");
}

fn write_signed_manifest(
    root: &Path,
    key: &SigningKey,
    name: &str,
    version: &str,
    extra: &str,
) -> PathBuf {
    let dir = root.join("index").join(name);
    fs::create_dir_all(&dir).expect("must create package dir");
    let content = format!(
        "name = \"{name}\"\nversion = \"{version}\"\n{extra}\n[artifact]\nfilename = \"{name}-{version}.tar.gz\"\nsha256 = \"{ARTIFACT_SHA256}\"\nsize = 1\n"
    );
    let path = dir.join(format!("{version}.toml"));
    fs::write(&path, &content).expect("must write manifest");
    let signature = key.sign(content.as_bytes());
    fs::write(
        path.with_extension("toml.sig"),
        hex::encode(signature.to_bytes()),
    )
    .expect("must write signature");
    path
}

fn test_root(tag: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let counter = TEST_ROOT_COUNTER.fetch_add(1, Ordering::SeqCst);
    path.push(format!(
        "pakt-registry-{tag}-{}-{}-{}",
        std::process::id(),
        nanos,
        counter
    ));
    path
}
