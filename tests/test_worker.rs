use std::cell::Cell;
use std::path::Path;

use mutant_worker::operators::{MutationSite, Operator};
use mutant_worker::{
    Isolation, MutationRequest, OperatorKind, TestRun, TestStatus, WorkerConfig, WorkerError, count_sites, execute,
    safety, worker,
};
use tempfile::TempDir;

const CALC: &str = "\
def total(a, b, c):
    return a + b + c


def double(x):
    return x + x
";

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("calc.py"), CALC).unwrap();
    std::fs::write(dir.path().join("test_calc.py"), "from calc import total\n").unwrap();
    dir
}

fn config(dir: &TempDir) -> WorkerConfig {
    WorkerConfig::default()
        .with_project_root(dir.path())
        .with_session("test")
}

fn request(occurrence: usize) -> MutationRequest {
    MutationRequest::new("calc.py", OperatorKind::Arithmetic, occurrence)
}

/// Fails whenever the installed module differs from the original.
fn strict_runner(root: &Path) -> TestRun {
    let installed = std::fs::read_to_string(root.join("calc.py")).unwrap();
    if installed == CALC {
        TestRun::passed("3 passed")
    } else {
        TestRun::failed("1 failed, 2 passed")
    }
}

#[test]
fn selected_occurrence_is_mutated_and_killed() {
    let dir = project();
    let (record, outcome) = worker(&request(1), &config(&dir), &strict_runner).unwrap().unwrap();

    assert_eq!(record.module_name, "calc.py");
    assert_eq!(record.operator_kind, OperatorKind::Arithmetic);
    assert_eq!(record.occurrence_index, 1);
    assert_eq!(record.original, "+");
    assert_eq!(record.mutated, "-");
    assert_eq!((record.location.line, record.location.column), (2, 18));
    assert_eq!(outcome.status, TestStatus::Killed);
    assert_eq!(outcome.diagnostics, "1 failed, 2 passed");
    assert_eq!(std::fs::read_to_string(dir.path().join("calc.py")).unwrap(), CALC);
}

#[test]
fn runner_sees_only_the_selected_mutation() {
    let dir = project();
    let runner = |root: &Path| {
        let installed = std::fs::read_to_string(root.join("calc.py")).unwrap();
        assert!(installed.contains("return a + b + c"));
        assert!(installed.contains("return x - x"));
        assert!(root.join("test_calc.py").exists());
        TestRun::passed("ok")
    };
    let (_, outcome) = worker(&request(2), &config(&dir), &runner).unwrap().unwrap();
    assert_eq!(outcome.status, TestStatus::Survived);
}

#[test]
fn missing_occurrence_is_empty_and_runs_nothing() {
    let dir = project();
    let calls = Cell::new(0);
    let runner = |_: &Path| {
        calls.set(calls.get() + 1);
        TestRun::passed("")
    };
    assert!(worker(&request(5), &config(&dir), &runner).unwrap().is_none());
    assert_eq!(calls.get(), 0);
}

#[test]
fn errored_run_is_incompetent() {
    let dir = project();
    let runner = |_: &Path| TestRun::errored("ImportError: cannot import name 'total'");
    let (_, outcome) = worker(&request(0), &config(&dir), &runner).unwrap().unwrap();
    assert_eq!(outcome.status, TestStatus::Incompetent);
    assert!(outcome.diagnostics.contains("ImportError"));
}

struct Scramble;

impl Operator for Scramble {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Arithmetic
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        site.kind() == "+" && site.parent_kind() == Some("binary_operator")
    }

    fn transform(&self, _site: &MutationSite) -> String {
        ")(".to_string()
    }
}

#[test]
fn unloadable_mutant_is_incompetent_without_running_tests() {
    let dir = project();
    let calls = Cell::new(0);
    let runner = |_: &Path| {
        calls.set(calls.get() + 1);
        TestRun::passed("")
    };
    let (record, outcome) = execute(&request(0), &Scramble, &config(&dir), &runner).unwrap().unwrap();

    assert_eq!(record.mutated, ")(");
    assert_eq!(outcome.status, TestStatus::Incompetent);
    assert!(outcome.diagnostics.starts_with("mutant does not compile"));
    assert_eq!(calls.get(), 0);
    assert_eq!(std::fs::read_to_string(dir.path().join("calc.py")).unwrap(), CALC);
}

#[test]
fn repeated_runs_give_the_same_result() {
    let dir = project();
    let cfg = config(&dir);
    let first = worker(&request(1), &cfg, &strict_runner).unwrap().unwrap();
    let second = worker(&request(1), &cfg, &strict_runner).unwrap().unwrap();
    assert_eq!(first.0, second.0);
    assert_eq!(first.1.status, second.1.status);
}

#[test]
fn in_place_run_restores_module() {
    let dir = project();
    let cfg = config(&dir).with_isolation(Isolation::InPlace);
    let runner = |root: &Path| {
        assert_eq!(root, dir.path());
        assert!(safety::backup_path(&root.join("calc.py")).exists());
        strict_runner(root)
    };

    let (_, outcome) = worker(&request(0), &cfg, &runner).unwrap().unwrap();

    assert_eq!(outcome.status, TestStatus::Killed);
    assert_eq!(std::fs::read_to_string(dir.path().join("calc.py")).unwrap(), CALC);
    assert!(!safety::backup_path(&dir.path().join("calc.py")).exists());
}

#[test]
fn panicking_runner_is_incompetent_and_module_restored() {
    let dir = project();
    let cfg = config(&dir).with_isolation(Isolation::InPlace);
    let runner = |_: &Path| -> TestRun { panic!("runner exploded") };

    let (_, outcome) = worker(&request(0), &cfg, &runner).unwrap().unwrap();

    assert_eq!(outcome.status, TestStatus::Incompetent);
    assert!(outcome.diagnostics.contains("runner exploded"));
    assert_eq!(std::fs::read_to_string(dir.path().join("calc.py")).unwrap(), CALC);
}

#[test]
fn interrupted_in_place_run_is_recovered_first() {
    let dir = project();
    let module = dir.path().join("calc.py");
    std::fs::write(&module, CALC.replace("a + b + c", "a - b + c")).unwrap();
    safety::write_backup(&module, CALC).unwrap();

    let cfg = config(&dir).with_isolation(Isolation::InPlace);
    assert!(worker(&request(9), &cfg, &strict_runner).unwrap().is_none());

    assert_eq!(std::fs::read_to_string(&module).unwrap(), CALC);
    assert!(safety::check_interrupted_run(&module).is_none());
}

#[test]
fn copy_tree_run_recovers_leftover_backup_first() {
    let dir = project();
    let module = dir.path().join("calc.py");
    std::fs::write(&module, CALC.replace("a + b + c", "a - b + c")).unwrap();
    safety::write_backup(&module, CALC).unwrap();

    let (record, outcome) = worker(&request(0), &config(&dir), &strict_runner).unwrap().unwrap();

    assert_eq!(record.original, "+");
    assert_eq!(outcome.status, TestStatus::Killed);
    assert_eq!(std::fs::read_to_string(&module).unwrap(), CALC);
    assert!(safety::check_interrupted_run(&module).is_none());
}

#[test]
fn count_sites_recovers_leftover_backup_first() {
    let dir = project();
    let module = dir.path().join("calc.py");
    std::fs::write(&module, CALC.replace("x + x", "x")).unwrap();
    safety::write_backup(&module, CALC).unwrap();

    assert_eq!(count_sites(&config(&dir), "calc.py", OperatorKind::Arithmetic).unwrap(), 3);
    assert_eq!(std::fs::read_to_string(&module).unwrap(), CALC);
}

#[test]
fn missing_module_is_an_import_error() {
    let dir = project();
    let err = worker(
        &MutationRequest::new("nope.py", OperatorKind::Arithmetic, 0),
        &config(&dir),
        &strict_runner,
    )
    .unwrap_err();
    assert!(matches!(err, WorkerError::Import { ref module, .. } if module == "nope.py"));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn module_outside_root_is_an_import_error() {
    let dir = project();
    let err = worker(
        &MutationRequest::new("../calc.py", OperatorKind::Arithmetic, 0),
        &config(&dir),
        &strict_runner,
    )
    .unwrap_err();
    assert!(matches!(err, WorkerError::Import { .. }));
}

#[test]
fn unsupported_file_is_a_parse_error() {
    let dir = project();
    std::fs::write(dir.path().join("notes.txt"), "a + b").unwrap();
    let err = worker(
        &MutationRequest::new("notes.txt", OperatorKind::Arithmetic, 0),
        &config(&dir),
        &strict_runner,
    )
    .unwrap_err();
    assert!(matches!(err, WorkerError::Parse { .. }));
}

#[test]
fn count_sites_matches_addressable_occurrences() {
    let dir = project();
    let cfg = config(&dir);
    assert_eq!(count_sites(&cfg, "calc.py", OperatorKind::Arithmetic).unwrap(), 3);
    assert_eq!(count_sites(&cfg, "calc.py", OperatorKind::BooleanFlip).unwrap(), 0);
    assert!(worker(&request(2), &cfg, &strict_runner).unwrap().is_some());
    assert!(worker(&request(3), &cfg, &strict_runner).unwrap().is_none());
}

#[test]
fn baseline_runs_against_unmutated_copy() {
    let dir = project();
    let run = mutant_worker::baseline(&config(&dir), &strict_runner).unwrap();
    assert_eq!(run, TestRun::passed("3 passed"));
}
