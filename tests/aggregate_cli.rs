use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn aggregate() -> Command {
    Command::cargo_bin("aggregate").unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn mean_of_copies_returns_the_file() {
    let dir = TempDir::new().unwrap();
    let file = "x\ty\n1.0\t2.5\n3.0\t-4.0\n";
    let a = write(&dir, "a.txt", file);
    let b = write(&dir, "b.txt", file);
    aggregate().arg(&a).arg(&b).assert().success().stdout(file);
}

#[test]
fn sums_across_files() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.txt", "1\t2\n");
    let b = write(&dir, "b.txt", "10\t20\n");
    aggregate()
        .args(["-F", "sum"])
        .arg(&a)
        .arg(&b)
        .assert()
        .success()
        .stdout("11.0\t22.0\n");
}

#[test]
fn column_mode_with_output_delimiter() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.txt", "a\tb\n1\t10\n3\t30\n");
    aggregate()
        .args(["-m", "column", "-D", ","])
        .arg(&a)
        .assert()
        .success()
        .stdout("a,b\n2.0,20.0\n");
}

#[test]
fn non_numeric_data_fails() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.txt", "1\n2\n");
    let b = write(&dir, "b.txt", "1\nxx\n");
    aggregate()
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .stderr(predicate::str::contains("aggregate: error:").and(predicate::str::contains("xx")));
}

#[test]
fn needs_an_input_file() {
    aggregate().assert().failure();
}

#[test]
fn rejects_unknown_functions() {
    aggregate().args(["-F", "mode", "-"]).assert().failure();
}
