use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn mvs_cmd() -> Command {
    Command::cargo_bin("mvs").unwrap()
}

const TABLE: &str = r#"
target = "A@1"

[modules]
"A@1" = ["B@1", "C@1"]
"B@1" = ["C@2"]
"B@2" = ["C@3"]
"C@1" = []
"C@2" = []
"C@3" = []
"D@1" = []
"#;

fn write_table(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("reqs.toml");
    fs::write(&path, TABLE).unwrap();
    path
}

#[test]
fn test_upgrade_single_module() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("upgrade")
        .arg(&table)
        .arg("B@2")
        .assert()
        .success()
        .stdout("A@1\nB@2\nC@3\n")
        .stderr(predicate::str::contains("B 1 -> 2"));
}

#[test]
fn test_upgrade_all() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .args(["upgrade", "--all"])
        .arg(&table)
        .assert()
        .success()
        .stdout("A@1\nB@2\nC@3\n");
}

#[test]
fn test_upgrade_requires_modules_or_all() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("upgrade")
        .arg(&table)
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to upgrade"));
}

#[test]
fn test_downgrade_removes_requirer() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("downgrade")
        .arg(&table)
        .arg("C@1")
        .assert()
        .success()
        .stdout("A@1\nC@1\n")
        .stderr(predicate::str::contains("B 1 -> none"));
}

#[test]
fn test_edit_add_prints_lock_summary() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("edit")
        .arg(&table)
        .args(["--add", "D@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"D@1\""))
        .stdout(predicate::str::contains("pruning = \"unpruned\""))
        .stderr(predicate::str::contains("D none -> 1"));
}

#[test]
fn test_edit_conflicting_pin_fails() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("edit")
        .arg(&table)
        .args(["--pin", "C@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("version constraints conflict"))
        .stderr(predicate::str::contains("A@1 indirectly requires C@2, but C@1 is requested"));
}

#[test]
fn test_invalid_module_argument() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("downgrade")
        .arg(&table)
        .arg("C")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid module `C`"));
}
