//! CLI error handling tests for getpcaps.
//!
//! Invalid arguments, bad pid tokens and rejected capability text must
//! produce a diagnostic on stderr and a stable exit code.

use assert_cmd::Command;
use predicates::prelude::*;

fn getpcaps() -> Command {
    let mut cmd = Command::cargo_bin("getpcaps").expect("getpcaps binary should exist");
    for key in [
        "PCAPS_SOURCE",
        "PCAPS_PROC_ROOT",
        "PCAPS_JOBS",
        "PCAPS_LOG",
        "PCAPS_LOG_FORMAT",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Argument Errors
// ============================================================================

mod arguments {
    use super::*;

    #[test]
    fn no_pids_is_usage_error() {
        getpcaps()
            .assert()
            .code(10)
            .stderr(predicate::str::contains("PID"));
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        getpcaps()
            .args(["--bogus", "1"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn help_exits_cleanly() {
        getpcaps()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("getpcaps"));
    }

    #[test]
    fn list_names_conflicts_with_pids() {
        getpcaps().args(["--list-names", "1"]).assert().code(10);
    }

    #[test]
    fn zero_jobs_rejected() {
        getpcaps()
            .args(["--jobs", "0", "1"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("jobs"));
    }

    #[test]
    fn bad_jobs_env_rejected() {
        getpcaps()
            .env("PCAPS_JOBS", "many")
            .arg("1")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("PCAPS_JOBS"));
    }
}

// ============================================================================
// Pid Tokens
// ============================================================================

mod pid_tokens {
    use super::*;
    use tempfile::TempDir;

    fn empty_proc() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn zero_pid_reported_and_all_failed() {
        let proc = empty_proc();
        getpcaps()
            .args(["--source", "procfs", "--proc-root"])
            .arg(proc.path())
            .arg("0")
            .assert()
            .code(2)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains(
                "Failed to get capabilities for `0': invalid process id '0'",
            ));
    }

    #[test]
    fn negative_and_garbage_tokens_reported() {
        let proc = empty_proc();
        getpcaps()
            .args(["--source", "procfs", "--proc-root"])
            .arg(proc.path())
            .args(["-5", "abc"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("`-5'"))
            .stderr(predicate::str::contains("`abc'"));
    }

    #[test]
    fn missing_process_reported() {
        let proc = empty_proc();
        getpcaps()
            .args(["--source", "procfs", "--proc-root"])
            .arg(proc.path())
            .arg("4242")
            .assert()
            .code(2)
            .stderr(predicate::str::contains(
                "Failed to get capabilities for `4242': process 4242 not found",
            ));
    }
}

// ============================================================================
// Canonicalize
// ============================================================================

mod canonicalize {
    use super::*;

    #[test]
    fn reorders_and_groups() {
        getpcaps()
            .args(["--canonicalize", "kill=i chown=ep"])
            .assert()
            .success()
            .stdout("chown=ep kill=i\n");
    }

    #[test]
    fn empty_marker() {
        getpcaps()
            .args(["--canonicalize", "="])
            .assert()
            .success()
            .stdout("=\n");
    }

    #[test]
    fn unknown_name_rejected() {
        getpcaps()
            .args(["--canonicalize", "bogus=ep"])
            .assert()
            .code(10)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("unknown capability name 'bogus'"));
    }

    #[test]
    fn malformed_text_rejected() {
        getpcaps()
            .args(["--canonicalize", "chown=pe"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("malformed capability text"));
    }

    #[test]
    fn json_error_on_stdout() {
        let output = getpcaps()
            .args(["--format", "json", "--canonicalize", "chown"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(10));
        let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(doc["error"]["code"], 30);
    }
}
