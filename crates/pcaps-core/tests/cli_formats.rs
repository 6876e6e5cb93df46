//! Output format tests for getpcaps against a fake procfs tree.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn getpcaps(proc_root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("getpcaps").expect("getpcaps binary should exist");
    for key in ["PCAPS_SOURCE", "PCAPS_JOBS", "PCAPS_LOG", "RUST_LOG"] {
        cmd.env_remove(key);
    }
    cmd.env("PCAPS_PROC_ROOT", proc_root);
    cmd
}

fn write_status(root: &Path, pid: u32, inh: &str, prm: &str, eff: &str) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).unwrap();
    let status = format!(
        "Name:\tfake\nState:\tS (sleeping)\nPid:\t{pid}\nCapInh:\t{inh}\nCapPrm:\t{prm}\nCapEff:\t{eff}\nCapBnd:\t000001ffffffffff\nCapAmb:\t0000000000000000\n"
    );
    fs::write(dir.join("status"), status).unwrap();
}

/// pid 100: chown=ep kill=i; pid 200: empty; pid 300: full root;
/// pid 400: chown,kill=ep.
fn fake_proc() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_status(dir.path(), 100, "0000000000000020", "0000000000000001", "0000000000000001");
    write_status(dir.path(), 200, "0000000000000000", "0000000000000000", "0000000000000000");
    write_status(dir.path(), 300, "0000000000000000", "000001ffffffffff", "000001ffffffffff");
    write_status(dir.path(), 400, "0000000000000000", "0000000000000021", "0000000000000021");
    dir
}

#[test]
fn text_output_line_per_pid() {
    let proc = fake_proc();
    getpcaps(proc.path())
        .args(["100", "200"])
        .assert()
        .success()
        .stdout("Capabilities for `100': chown=ep kill=i\nCapabilities for `200': =\n");
}

#[test]
fn shared_flags_grouped_without_prefix() {
    let proc = fake_proc();
    getpcaps(proc.path())
        .arg("400")
        .assert()
        .success()
        .stdout("Capabilities for `400': chown,kill=ep\n");
}

#[test]
fn token_echoed_verbatim() {
    let proc = fake_proc();
    getpcaps(proc.path())
        .arg(" 100")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Capabilities for ` 100': "));
}

#[test]
fn full_set_is_single_group() {
    let proc = fake_proc();
    let output = getpcaps(proc.path()).arg("300").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Capabilities for `300': chown,dac_override,"));
    assert!(stdout.trim_end().ends_with(",checkpoint_restore=ep"));
}

#[test]
fn partial_failure_keeps_going() {
    let proc = fake_proc();
    getpcaps(proc.path())
        .args(["100", "999", "200"])
        .assert()
        .code(1)
        .stdout("Capabilities for `100': chown=ep kill=i\nCapabilities for `200': =\n")
        .stderr(predicate::str::contains("Failed to get capabilities for `999'"));
}

#[test]
fn parallel_jobs_keep_input_order() {
    let proc = fake_proc();
    getpcaps(proc.path())
        .args(["--jobs", "4", "300", "200", "100", "200"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Capabilities for `300'"))
        .stdout(predicate::str::ends_with(
            "Capabilities for `100': chown=ep kill=i\nCapabilities for `200': =\n",
        ));
}

#[test]
fn json_summary() {
    let proc = fake_proc();
    let output = getpcaps(proc.path())
        .args(["--format", "json", "100", "nope"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["summary"]["total"], 2);
    assert_eq!(doc["succeeded"][0]["pid"], 100);
    assert_eq!(doc["succeeded"][0]["text"], "chown=ep kill=i");
    assert_eq!(doc["succeeded"][0]["inheritable"], "0000000000000020");
    assert_eq!(doc["failed"][0]["item_id"], "nope");
    assert_eq!(doc["failed"][0]["error"]["code"], 10);
}

#[test]
fn jsonl_one_record_per_pid() {
    let proc = fake_proc();
    let output = getpcaps(proc.path())
        .args(["--format", "jsonl", "200", "404"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["ok"], true);
    assert_eq!(records[0]["result"]["text"], "=");
    assert_eq!(records[1]["ok"], false);
    assert_eq!(records[1]["token"], "404");
    assert_eq!(records[1]["error"]["code"], 40);
}

#[test]
fn list_names_text() {
    let proc = fake_proc();
    let output = getpcaps(proc.path()).arg("--list-names").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 41);
    assert_eq!(lines[0], " 0 chown");
    assert_eq!(lines[40], "40 checkpoint_restore");
}

#[test]
fn jsonl_logs_stay_off_stdout() {
    let proc = fake_proc();
    let output = getpcaps(proc.path())
        .args(["-vv", "--log-format", "jsonl", "100"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Capabilities for `100': chown=ep kill=i\n"
    );
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.lines().any(|line| line.contains("query.finished")));
}
