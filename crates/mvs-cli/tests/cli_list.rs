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
"C@1" = []
"C@2" = []
"#;

fn write_table(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("reqs.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_list_prints_build_list() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp, TABLE);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("list")
        .arg(&table)
        .assert()
        .success()
        .stdout("A@1\nB@1\nC@2\n")
        .stderr(predicate::str::contains("Resolved"));
}

#[test]
fn test_tree_shows_superseded_versions() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp, TABLE);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("tree")
        .arg(&table)
        .assert()
        .success()
        .stdout(predicate::str::contains("└── C@1 -> 2"));

    mvs_cmd()
        .current_dir(tmp.path())
        .args(["tree", "--depth", "1"])
        .arg(&table)
        .assert()
        .success()
        .stdout("A@1\n├── B@1\n└── C@1 -> 2\n");
}

#[test]
fn test_why_prints_chain() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp, TABLE);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("why")
        .arg(&table)
        .arg("C")
        .assert()
        .success()
        .stdout("A@1\n  B@1\n    C@2\n");

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("why")
        .arg(&table)
        .arg("Z")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the build list"));
}

#[test]
fn test_why_lists_other_requirers() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(
        &tmp,
        r#"
target = "A@1"

[modules]
"A@1" = ["B@1", "D@1"]
"B@1" = ["C@2"]
"D@1" = ["C@2"]
"C@2" = []
"#,
    );

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("why")
        .arg(&table)
        .arg("C")
        .assert()
        .success()
        .stdout("A@1\n  B@1\n    C@2\nalso required by D@1\n");
}

#[test]
fn test_minimize_drops_implied_requirement() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp, TABLE);

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("minimize")
        .arg(&table)
        .assert()
        .success()
        .stdout("B@1\n");

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("minimize")
        .arg(&table)
        .args(["--base", "C"])
        .assert()
        .success()
        .stdout("B@1\nC@2\n");
}

#[test]
fn test_missing_module_fails_with_chain() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(
        &tmp,
        r#"
target = "A@1"
[modules]
"A@1" = ["B@1"]
[failing]
"B@1" = "checksum mismatch"
"#,
    );

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("list")
        .arg(&table)
        .assert()
        .failure()
        .stderr(predicate::str::contains("A@1 requires B@1: checksum mismatch"));
}

#[test]
fn test_table_without_target_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp, "[modules]\n\"A@1\" = []\n");

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("list")
        .arg(&table)
        .assert()
        .failure()
        .stderr(predicate::str::contains("names no target module"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let table = write_table(&tmp, TABLE);
    fs::write(tmp.path().join("mvs.toml"), "[resolver]\njobs = 0\n").unwrap();

    mvs_cmd()
        .current_dir(tmp.path())
        .arg("list")
        .arg(&table)
        .assert()
        .failure()
        .stderr(predicate::str::contains("resolver.jobs must be at least 1"));
}
