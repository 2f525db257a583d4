#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use mutant_worker::dispatch::{DispatchError, DispatchOptions, dispatch_worker};
use mutant_worker::tasks::{GREETING_TASK, TaskRegistry, WORKER_TASK};
use mutant_worker::{MutationRequest, OperatorKind, TestStatus};
use tempfile::TempDir;

fn worker_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mutant-worker"))
}

/// A project whose "test suite" fails unless `calc.py` is untouched.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("calc.py"), "def total(a, b, c):\n    return a + b + c\n").unwrap();
    std::fs::write(dir.path().join("check.sh"), "grep -q 'a + b + c' calc.py\n").unwrap();
    dir
}

fn options(root: &Path, test_cmd: &str) -> DispatchOptions {
    DispatchOptions {
        root: Some(root.to_path_buf()),
        test_cmd: Some(test_cmd.to_string()),
        in_place: false,
        deadline: None,
    }
}

fn request(occurrence: usize) -> MutationRequest {
    MutationRequest::new("calc.py", OperatorKind::Arithmetic, occurrence)
}

#[test]
fn dispatched_worker_reports_killed_mutant() {
    let dir = project();
    let (record, outcome) = dispatch_worker(&worker_bin(), &request(1), &options(dir.path(), "sh check.sh"))
        .unwrap()
        .unwrap();

    assert_eq!(record.original, "+");
    assert_eq!(record.mutated, "-");
    assert_eq!(record.location.line, 2);
    assert_eq!(outcome.status, TestStatus::Killed);
}

#[test]
fn dispatched_worker_reports_empty_result() {
    let dir = project();
    let result = dispatch_worker(&worker_bin(), &request(7), &options(dir.path(), "sh check.sh")).unwrap();
    assert!(result.is_none());
}

#[test]
fn worker_failure_is_a_dispatch_error() {
    let dir = project();
    let missing = MutationRequest::new("gone.py", OperatorKind::Arithmetic, 0);
    let err = dispatch_worker(&worker_bin(), &missing, &options(dir.path(), "sh check.sh")).unwrap_err();
    match err {
        DispatchError::ExitStatus { code, stderr } => {
            assert_eq!(code, Some(2));
            assert!(stderr.contains("gone.py"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn non_json_output_is_malformed() {
    let err = dispatch_worker(Path::new("echo"), &request(0), &DispatchOptions::default()).unwrap_err();
    assert!(matches!(err, DispatchError::MalformedOutput { .. }));
}

#[test]
fn unspawnable_program_is_a_spawn_error() {
    let err = dispatch_worker(Path::new("/nonexistent/mutant-worker"), &request(0), &DispatchOptions::default())
        .unwrap_err();
    assert!(matches!(err, DispatchError::Spawn { .. }));
}

#[test]
fn slow_worker_is_killed_at_deadline() {
    let dir = project();
    let mut opts = options(dir.path(), "sleep 5");
    opts.deadline = Some(Duration::from_millis(300));

    let err = dispatch_worker(&worker_bin(), &request(0), &opts).unwrap_err();
    assert!(matches!(err, DispatchError::DeadlineExceeded(d) if d == Duration::from_millis(300)));
}

#[test]
fn worker_task_returns_wire_record() {
    let dir = project();
    let registry = TaskRegistry::with_default_tasks(worker_bin(), options(dir.path(), "sh check.sh"));

    let args: Vec<String> = ["calc.py", "arithmetic", "0"].iter().map(|s| s.to_string()).collect();
    let value = registry.invoke(WORKER_TASK, &args).unwrap();
    assert_eq!(value["outcome"], "killed");
    assert_eq!(value["occurrence"], 0);

    let args: Vec<String> = ["calc.py", "arithmetic", "5"].iter().map(|s| s.to_string()).collect();
    assert!(registry.invoke(WORKER_TASK, &args).unwrap().is_null());

    assert!(registry.invoke(GREETING_TASK, &[]).unwrap().is_string());
}
