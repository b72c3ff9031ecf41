use assert_cmd::Command;
use coverart_core::{CacheKey, DiskCache};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated config, cache and cover directories for one test
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("data/cache")
    }

    fn covers_dir(&self) -> PathBuf {
        self.dir.path().join("data/covers")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("coverart").unwrap();
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("COVERART_PATHS__CACHE_DIR", self.cache_dir())
            .env("COVERART_PATHS__COVERS_DIR", self.covers_dir())
            .env("NO_COLOR", "1")
            .env_remove("COVERART_ARTWORK__URL_TEMPLATE");
        cmd
    }

    async fn seed(&self, key: &str, data: &[u8]) {
        let cache = DiskCache::open(self.cache_dir(), 1024 * 1024).await.unwrap();
        let mut editor = cache.open_editor(&CacheKey::new(key).unwrap()).unwrap();
        editor.write_all(data).await.unwrap();
        editor.commit().await.unwrap().close();
    }

    fn seed_cover(&self, relative: &str, data: &[u8]) -> PathBuf {
        let path = self.covers_dir().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }
}

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("coverart").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_fetch_from_disk_cache() {
    let sandbox = Sandbox::new();
    sandbox.seed("movie:42:w500", PNG).await;

    sandbox
        .cmd()
        .args(["fetch", "movie", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disk"))
        .stdout(predicate::str::contains("movie:42:w500"))
        .stdout(predicate::str::contains("png"));
}

#[tokio::test]
async fn test_fetch_json_and_output_file() {
    let sandbox = Sandbox::new();
    sandbox.seed("show:7:original", PNG).await;
    let out = sandbox.dir.path().join("poster.png");

    let assert = sandbox
        .cmd()
        .args(["fetch", "show", "7", "--size", "original", "--format", "json"])
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(json["source"], "disk");
    assert_eq!(json["bytes"], PNG.len());
    assert_eq!(std::fs::read(&out).unwrap(), PNG);
}

#[test]
fn test_fetch_library_cover() {
    let sandbox = Sandbox::new();
    sandbox.seed_cover("book/3-w500.img", PNG);

    sandbox
        .cmd()
        .args(["fetch", "book", "3", "--library", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"source\": \"disk\""));
}

#[test]
fn test_fetch_without_url_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["fetch", "movie", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No artwork URL"));
}

#[tokio::test]
async fn test_no_disk_read_skips_cache() {
    let sandbox = Sandbox::new();
    sandbox.seed("movie:42:w500", PNG).await;

    sandbox
        .cmd()
        .args(["fetch", "movie", "42", "--no-disk-read"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No artwork URL"));
}

#[test]
fn test_unknown_kind_is_rejected() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["fetch", "podcast", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kind"));
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let sandbox = Sandbox::new();
    sandbox.seed("movie:1:w500", PNG).await;
    sandbox.seed("movie:2:w500", PNG).await;
    let cover = sandbox.seed_cover("movie/1-w500.img", PNG);

    let assert = sandbox
        .cmd()
        .args(["cache", "stats", "--format", "json"])
        .assert()
        .success();
    let stats: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(stats["cache_entries"], 2);
    assert_eq!(stats["cover_files"], 1);

    sandbox
        .cmd()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed 2 cache entries"));
    assert!(cover.exists());

    sandbox
        .cmd()
        .args(["cache", "clear", "--covers"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Removed 1 cover files"));
    assert!(!sandbox.covers_dir().exists());
}

#[test]
fn test_config_roundtrip() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    sandbox
        .cmd()
        .args(["config", "set", "network.timeout_seconds", "12"])
        .assert()
        .success();
    sandbox
        .cmd()
        .args(["config", "get", "network.timeout_seconds"])
        .assert()
        .success()
        .stdout(predicate::str::diff("12\n"));

    let config_file = sandbox.dir.path().join("config/coverart/config.toml");
    assert!(Path::new(&config_file).exists());
}

#[test]
fn test_config_get_unknown_key() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "get", "nope.missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_env_overrides_config_file() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "get", "paths.cache_dir"])
        .assert()
        .success()
        .stdout(predicate::str::contains(sandbox.cache_dir().to_string_lossy().as_ref()));
}

#[tokio::test]
async fn test_configured_default_size_applies_without_flag() {
    let sandbox = Sandbox::new();
    sandbox.seed("movie:42:w92", PNG).await;

    sandbox
        .cmd()
        .env("COVERART_ARTWORK__DEFAULT_SIZE", "w92")
        .args(["fetch", "movie", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("movie:42:w92"));
}

#[tokio::test]
async fn test_explicit_size_beats_configured_default() {
    let sandbox = Sandbox::new();
    sandbox.seed("movie:42:w500", PNG).await;

    sandbox
        .cmd()
        .env("COVERART_ARTWORK__DEFAULT_SIZE", "w92")
        .args(["fetch", "movie", "42", "--size", "w500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("movie:42:w500"));
}
