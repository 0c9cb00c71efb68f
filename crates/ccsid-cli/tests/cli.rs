//! End-to-end tests of the ccsid-dump binary
//!
//! These never reach IBM i: every run either stops at argument or
//! configuration errors, or fails to load the PASE libc member.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Binary isolated from the caller's home directory and environment
fn ccsid_dump(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ccsid-dump").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("CCSID_DUMP_OUTPUT_DIR")
        .env_remove("CCSID_DUMP_LIBC")
        .env_remove("CCSID_DUMP_HTML");
    cmd
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    ccsid_dump(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--ccsid"))
        .stdout(predicate::str::contains("CCSID_DUMP_LIBC"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    ccsid_dump(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ccsid-dump"));
}

#[test]
fn test_missing_libc_from_env() {
    let dir = TempDir::new().unwrap();
    ccsid_dump(&dir)
        .env("CCSID_DUMP_LIBC", dir.path().join("missing.a"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load the PASE runtime"))
        .stderr(predicate::str::contains("missing.a"));
}

#[test]
fn test_missing_libc_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[bridge]\nlibc = \"/nonexistent/libc.a(shr_64.o)\"\n").unwrap();

    ccsid_dump(&dir)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/libc.a"));

    assert!(!dir.path().join("IBM-037.txt").exists());
}

#[test]
fn test_config_found_in_working_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("ccsid-dump.toml"),
        "[scan]\nfirst = 500\nlast = 37\n",
    )
    .unwrap();

    ccsid_dump(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_unknown_config_key() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[scan]\nstep = 2\n").unwrap();

    ccsid_dump(&dir)
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom.toml"));
}

#[test]
fn test_reversed_range_flags() {
    let dir = TempDir::new().unwrap();
    ccsid_dump(&dir)
        .args(["--first", "500", "--last", "37"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid command-line settings"));
}

#[test]
fn test_ccsid_zero_rejected() {
    let dir = TempDir::new().unwrap();
    ccsid_dump(&dir)
        .args(["--ccsid", "0"])
        .assert()
        .failure()
        .code(2);
}
