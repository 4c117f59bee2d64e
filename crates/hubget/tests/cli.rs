use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PROXY_VARS: [&str; 8] = [
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

fn hubget(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hubget").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("HF_TOKEN")
        .env_remove("HF_ENDPOINT")
        .env_remove("RUST_LOG");
    for var in PROXY_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_flags() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--repo-id"))
        .stdout(predicate::str::contains("--allow"))
        .stdout(predicate::str::contains("--jobs"));
}

#[test]
fn test_missing_repo_id_is_usage_error() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--repo-type", "model"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--repo-id"));
}

#[test]
fn test_unknown_repo_type_is_usage_error() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--repo-id", "a/b", "--repo-type", "collection"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("collection"));
}

#[test]
fn test_zero_timeout_is_usage_error() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--repo-id", "a/b", "--repo-type", "model", "--timeout", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_jobs_conflicts_with_repo_id() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--jobs", "jobs.toml", "--repo-id", "a/b"])
        .assert()
        .code(2);
}

#[test]
fn test_malformed_repo_id_fails() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--repo-id", "no-owner", "--repo-type", "model", "--no-progress"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no-owner"));
    assert!(!dir.path().join("downloads").exists());
}

#[test]
fn test_missing_job_file_fails() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--jobs", "absent.toml", "--no-progress"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn test_invalid_pattern_fails() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args(["--repo-id", "a/b", "--repo-type", "model", "--allow", "a[b", "--no-progress"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("a[b"));
}

#[test]
fn test_unreachable_endpoint_fails() {
    let dir = TempDir::new().unwrap();
    hubget(&dir)
        .args([
            "--repo-id",
            "a/b",
            "--repo-type",
            "dataset",
            "--endpoint",
            "http://127.0.0.1:1",
            "--retries",
            "1",
            "--timeout",
            "5",
            "--no-progress",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("download failed"));
    assert!(!dir.path().join("downloads").exists());
}
