use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn remap() -> Command {
    Command::cargo_bin("remap").unwrap()
}

fn mapping(dir: &TempDir) -> String {
    let path = dir.path().join("map.txt");
    fs::write(&path, "a\tA\nb\tB\n").unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn remaps_stdin_with_mapping_file() {
    let dir = TempDir::new().unwrap();
    remap()
        .args(["-m", &mapping(&dir)])
        .write_stdin("a\tb\tc\nb\ta\n")
        .assert()
        .success()
        .stdout("A\tB\tc\nB\tA\n");
}

#[test]
fn blank_lines_pass_through() {
    let dir = TempDir::new().unwrap();
    remap()
        .args(["-m", &mapping(&dir)])
        .write_stdin("a\tb\n\nb\n")
        .assert()
        .success()
        .stdout("A\tB\n\nB\n");
}

#[test]
fn remaps_selected_fields_only() {
    let dir = TempDir::new().unwrap();
    remap()
        .args(["-m", &mapping(&dir), "-f", "2"])
        .write_stdin("a\ta\n")
        .assert()
        .success()
        .stdout("a\tA\n");
}

#[test]
fn strict_mode_fails_on_unknown_ids() {
    let dir = TempDir::new().unwrap();
    remap()
        .args(["-s", "-m", &mapping(&dir)])
        .write_stdin("a\tq\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("remap: error:").and(predicate::str::contains("q")));
}

#[test]
fn mapping_expressions() {
    remap()
        .args(["--mapping-expr", "x.upper() + '!'"])
        .write_stdin("ab\tc\n")
        .assert()
        .success()
        .stdout("AB!\tC!\n");
}

#[test]
fn requires_a_mapping() {
    remap().write_stdin("a\n").assert().failure();
}

#[test]
fn custom_delimiters() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("map.csv");
    fs::write(&path, "a,1\n").unwrap();
    remap()
        .args(["-d", ";", "-D", ",", "-m", path.to_str().unwrap()])
        .write_stdin("a;b\n")
        .assert()
        .success()
        .stdout("1;b\n");
}
