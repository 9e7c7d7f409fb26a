use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn qplot() -> Command {
    Command::cargo_bin("qplot").unwrap()
}

#[test]
fn help_lists_option_groups() {
    qplot()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Input settings")
                .and(predicate::str::contains("Output settings"))
                .and(predicate::str::contains("Axis settings"))
                .and(predicate::str::contains("Heatmap settings")),
        );
}

#[test]
fn rejects_bad_legend_location() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("plot.png");
    qplot()
        .args(["--legend", "somewhere", "-o"])
        .arg(&out)
        .write_stdin("1\t2\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("legend"));
}

#[test]
fn rejects_bad_ranges_and_sizes() {
    qplot().args(["--xrange", "5:1"]).assert().failure();
    qplot().args(["-s", "8x6ft"]).assert().failure();
    qplot().args(["--grid-size", "1x1"]).assert().failure();
}

#[test]
fn rejects_unsupported_output_format() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("plot.pdf");
    qplot()
        .arg("-o")
        .arg(&out)
        .write_stdin("1\t2\n2\t3\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format"));
}

#[test]
fn three_d_plots_without_triples_fail() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("plot.svg");
    qplot()
        .args(["-t", "surface", "-o"])
        .arg(&out)
        .write_stdin("1\t2\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no X, Y, Z triples"));
}

// Text rendering needs a system font, which headless machines may lack.
#[test]
#[ignore]
fn writes_png_and_svg() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("data.txt");
    fs::write(&input, "x\ta [[r--]]\tb\n0\t1\t2\n1\t2\t1\n2\t4\t0\n").unwrap();
    for name in ["plot.png", "plot.svg"] {
        let out = dir.path().join(name);
        qplot()
            .args(["--twin", "--legend", "upper_left", "-o"])
            .arg(&out)
            .arg(&input)
            .assert()
            .success();
        assert!(fs::metadata(&out).unwrap().len() > 0);
    }
}

#[test]
#[ignore]
fn writes_heatmap_with_contours() {
    let dir = TempDir::new().unwrap();
    let mut data = String::new();
    for x in 0..6 {
        for y in 0..6 {
            data.push_str(&format!("{x}\t{y}\t{}\n", x * y));
        }
    }
    let out = dir.path().join("heat.png");
    qplot()
        .args(["-t", "heatmap", "--contour-labels", "--grid-size", "20x20", "-o"])
        .arg(&out)
        .write_stdin(data)
        .assert()
        .success();
    assert!(out.exists());
}
