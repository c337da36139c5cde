//! CLI smoke tests over the built binary.

use assert_cmd::Command;
use predicates::prelude::*;

const CATALOG: &str = r#"
sources:
  - name: fake
    install: "true {package_list}"
packages:
  - name: git
    source: fake
custom_packages:
  - name: tool
    get_installed_version: echo 1.0.0
    install: echo install
"#;

fn write_catalog(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let file = dir.join("catalog.yaml");
    std::fs::write(&file, content).unwrap();
    file
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("unipak")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn validate_accepts_a_well_formed_catalog() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_catalog(tmp.path(), CATALOG);
    Command::cargo_bin("unipak")
        .unwrap()
        .args(["--config", file.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("catalog valid"));
}

#[test]
fn validate_rejects_duplicate_packages() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.yaml"), "custom_packages:\n  - name: dup\n").unwrap();
    std::fs::write(tmp.path().join("b.yaml"), "custom_packages:\n  - name: dup\n").unwrap();
    let probe = tmp.path().join("a.yaml");
    Command::cargo_bin("unipak")
        .unwrap()
        .args(["--config", probe.to_str().unwrap(), "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate package"));
}

#[test]
fn list_shows_installed_versions() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_catalog(tmp.path(), CATALOG);
    Command::cargo_bin("unipak")
        .unwrap()
        .args(["--config", file.to_str().unwrap(), "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tool (1.0.0)"))
        .stdout(predicate::str::contains("git (not installed)"));
}

#[test]
fn install_plan_shows_resolved_entries_without_executing() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_catalog(tmp.path(), CATALOG);
    Command::cargo_bin("unipak")
        .unwrap()
        .args(["--config", file.to_str().unwrap(), "install", "--plan", "tool"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skip (already installed): custom/tool 1.0.0"));
}

#[test]
fn unknown_package_fails_with_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let file = write_catalog(tmp.path(), CATALOG);
    Command::cargo_bin("unipak")
        .unwrap()
        .args(["--config", file.to_str().unwrap(), "install", "--plan", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown package"));
}
