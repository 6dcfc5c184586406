//! Command-line behaviour of the dopscreen binary

mod common;

use std::fs;
use std::process::{Command, Output};

use common::{scaled, write_panel, Acquisitions, PEAK};

fn dopscreen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dopscreen"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn path_str(path: &std::path::Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_run_with_wrong_argument_count_exits_1() {
    let output = dopscreen(&["run", "a.mzML", "b.mzML", "c.mzML"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));

    let output = dopscreen(&["run", "a.mzML", "b.mzML", "c.mzML", "d.mzML", "e.mzML"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_help_exits_0() {
    let output = dopscreen(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("batch"));
}

#[test]
fn test_panel_prints_embedded_table() {
    let output = dopscreen(&["panel"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("IS_Propil"));
    assert!(stdout.contains("7 internal standards"));
}

#[test]
fn test_run_missing_file_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.mzML");
    let m = path_str(&missing);
    let output = dopscreen(&["run", m, m, m, m]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_run_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let panel = write_panel(dir.path());
    let files = Acquisitions::write(dir.path(), "A123.mzML", (&PEAK, &PEAK), (&PEAK, &PEAK));

    let output = dopscreen(&[
        "run",
        path_str(&files.sample),
        path_str(&files.control),
        path_str(&files.control_reinj),
        path_str(&files.control_negative),
        "--panel",
        path_str(&panel),
        "--no-figures",
        "--json",
    ]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["gate"]["status"], "passed");
    assert_eq!(report["outcomes"][0]["result"]["r2"], 1.0);
}

#[test]
fn test_gate_abort_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    let panel = write_panel(dir.path());
    let shifted = scaled(50.0);
    let files = Acquisitions::write(dir.path(), "A123.mzML", (&PEAK, &PEAK), (&shifted, &PEAK));

    let output = dopscreen(&[
        "run",
        path_str(&files.sample),
        path_str(&files.control),
        path_str(&files.control_reinj),
        path_str(&files.control_negative),
        "--panel",
        path_str(&panel),
    ]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("standard retention time shifted"));
}

#[test]
fn test_batch_rejects_extension_and_processes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let files = Acquisitions::write(dir.path(), "A123.mzML", (&PEAK, &PEAK), (&PEAK, &PEAK));
    let raw = dir.path().join("A124.raw");
    fs::write(&raw, "vendor").unwrap();
    let summary = dir.path().join("summary.json");

    let output = dopscreen(&[
        "batch",
        "--control",
        path_str(&files.control),
        "--control-reinj",
        path_str(&files.control_reinj),
        "--control-negative",
        path_str(&files.control_negative),
        "--summary",
        path_str(&summary),
        path_str(&files.sample),
        path_str(&raw),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("File type not allowed"));
    assert!(!summary.exists());
}

#[test]
fn test_batch_lists_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let panel = write_panel(dir.path());
    let files = Acquisitions::write(dir.path(), "A123.mzML", (&PEAK, &PEAK), (&PEAK, &PEAK));
    let second = common::write_mzml(
        dir.path(),
        "A124.mzML",
        &common::trace_scans(&PEAK, &scaled(0.5)),
        false,
    );
    let stage = dir.path().join("staged");
    let summary = dir.path().join("summary.json");

    let output = dopscreen(&[
        "batch",
        "--control",
        path_str(&files.control),
        "--control-reinj",
        path_str(&files.control_reinj),
        "--control-negative",
        path_str(&files.control_negative),
        "--panel",
        path_str(&panel),
        "--stage-dir",
        path_str(&stage),
        "--summary",
        path_str(&summary),
        "--no-figures",
        path_str(&files.sample),
        path_str(&second),
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("A123.mzML"));
    assert!(stdout.contains("A124.mzML"));
    assert!(stdout.contains("2 samples, 0 failed"));
    assert!(stage.join("A124.mzML").is_file());

    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&summary).unwrap()).unwrap();
    let samples = summary["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|s| s["success"] == true));
    assert_eq!(samples[0]["report"]["gate"]["status"], "passed");
}
