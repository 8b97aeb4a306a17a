use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn cli_version() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .args(["-V"])
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_default_run_counts_every_job() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .assert()
        .success()
        .stdout(contains("executed 10000 of 10000 jobs"));
}

#[test]
fn cli_spin_policy() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .args(["-t", "2", "-p", "3", "-j", "50", "--wait", "spin", "--spins", "8"])
        .assert()
        .success()
        .stdout(contains("executed 150 of 150 jobs"));
}

#[test]
fn cli_rayon_pool() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .args(["--pool", "rayon", "-p", "2", "-j", "100"])
        .assert()
        .success()
        .stdout(contains("executed 200 of 200 jobs"));
}

#[test]
fn cli_config_file() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("pool.json");
    fs::write(&path, r#"{ "threads": 2, "thread_name": "bench" }"#).unwrap();

    Command::cargo_bin("workq-bench")
        .unwrap()
        .args(["-c", path.to_str().unwrap(), "-p", "1", "-j", "10"])
        .assert()
        .success()
        .stdout(contains("executed 10 of 10 jobs"));
}

#[test]
fn cli_missing_config_fails() {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    Command::cargo_bin("workq-bench")
        .unwrap()
        .args(["-c", temp_dir.path().join("nope.json").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("io error"));
}

#[test]
fn cli_invalid_pool() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .args(["--pool", "tokio"])
        .assert()
        .failure();
}

#[test]
fn cli_spins_alone_selects_spin_policy() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .env("RUST_LOG", "info")
        .args(["-t", "2", "-p", "1", "-j", "10", "--spins", "8"])
        .assert()
        .success()
        .stderr(contains("SpinThenBlock { spins: 8 }"));
}

#[test]
fn cli_default_policy_blocks() {
    Command::cargo_bin("workq-bench")
        .unwrap()
        .env("RUST_LOG", "info")
        .args(["-t", "2", "-p", "1", "-j", "10"])
        .assert()
        .success()
        .stderr(contains("wait_policy: Block"));
}
