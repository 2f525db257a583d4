use mutant_worker::safety;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn backup_path_is_hidden_sibling() {
    let path = safety::backup_path(Path::new("/tmp/foo.py"));
    assert_eq!(path, Path::new("/tmp/.foo.py.mutant-worker.bak"));
}

#[test]
fn backup_path_nested() {
    let path = safety::backup_path(Path::new("/home/user/project/src/app.rs"));
    assert_eq!(path, Path::new("/home/user/project/src/.app.rs.mutant-worker.bak"));
}

#[test]
fn clean_module_has_no_interrupted_run() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("calc.py");
    std::fs::write(&source, "pass").unwrap();
    assert!(safety::check_interrupted_run(&source).is_none());
    assert!(!safety::recover_interrupted(&source).unwrap());
}

#[test]
fn leftover_backup_is_detected() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("calc.py");
    let backup = dir.path().join(".calc.py.mutant-worker.bak");
    std::fs::write(&source, "mutated").unwrap();
    std::fs::write(&backup, "original").unwrap();
    assert_eq!(safety::check_interrupted_run(&source), Some(backup));
}

#[test]
fn recover_restores_original_and_removes_backup() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("calc.py");
    std::fs::write(&source, "x = 1 - 2\n").unwrap();
    safety::write_backup(&source, "x = 1 + 2\n").unwrap();

    assert!(safety::recover_interrupted(&source).unwrap());
    assert_eq!(std::fs::read_to_string(&source).unwrap(), "x = 1 + 2\n");
    assert!(!safety::backup_path(&source).exists());
}

#[test]
fn discard_missing_backup_is_ok() {
    let dir = TempDir::new().unwrap();
    safety::discard_backup(&dir.path().join("calc.py")).unwrap();
}
