use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestVerdict {
    Passed,
    Failed,
    /// The suite could not run the code at all (syntax/import/compile error,
    /// missing test command, ...).
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub verdict: TestVerdict,
    pub diagnostics: String,
}

impl TestRun {
    pub fn passed(diagnostics: impl Into<String>) -> Self {
        Self { verdict: TestVerdict::Passed, diagnostics: diagnostics.into() }
    }

    pub fn failed(diagnostics: impl Into<String>) -> Self {
        Self { verdict: TestVerdict::Failed, diagnostics: diagnostics.into() }
    }

    pub fn errored(diagnostics: impl Into<String>) -> Self {
        Self { verdict: TestVerdict::Errored, diagnostics: diagnostics.into() }
    }
}

/// Runs the test suite against whatever is currently installed in `workspace`.
pub trait TestRunner {
    fn run(&self, workspace: &Path) -> TestRun;
}

impl<F> TestRunner for F
where
    F: Fn(&Path) -> TestRun,
{
    fn run(&self, workspace: &Path) -> TestRun {
        self(workspace)
    }
}

/// Output fragments that mean the code never loaded, as opposed to a test
/// failing.
const LOAD_FAILURE_MARKERS: &[&str] = &[
    "SyntaxError",
    "IndentationError",
    "ImportError",
    "ModuleNotFoundError",
    "error[E",
    "could not compile",
];

/// Runs an external test command (`pytest -x -q`, `cargo test`, ...) from the
/// workspace root.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    program: String,
    args: Vec<String>,
}

impl CommandTestRunner {
    pub fn new(test_cmd: &str) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let (program, args) = parse_test_cmd(test_cmd);
        Self {
            program: resolve_cmd(&program, &cwd),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl TestRunner for CommandTestRunner {
    fn run(&self, workspace: &Path) -> TestRun {
        tracing::debug!(program = %self.program, args = ?self.args, workspace = %workspace.display(), "running tests");
        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(workspace)
            .env("OBJC_DISABLE_INITIALIZE_FORK_SAFETY", "YES")
            .output();

        match output {
            Ok(o) => {
                let stdout = String::from_utf8_lossy(&o.stdout);
                let stderr = String::from_utf8_lossy(&o.stderr);
                let diagnostics = format!("{}{}", stdout, stderr);
                classify(o.status.success(), diagnostics)
            }
            Err(e) => TestRun::errored(format!("Failed to run {}: {}", self.program, e)),
        }
    }
}

pub fn classify(success: bool, diagnostics: String) -> TestRun {
    if success {
        TestRun::passed(diagnostics)
    } else if LOAD_FAILURE_MARKERS.iter().any(|m| diagnostics.contains(m)) {
        TestRun::errored(diagnostics)
    } else {
        TestRun::failed(diagnostics)
    }
}

pub fn parse_test_cmd(cmd: &str) -> (String, Vec<String>) {
    let mut parts = cmd.split_whitespace().map(str::to_string);
    let program = parts.next().unwrap_or_default();
    (program, parts.collect())
}

/// Relative command paths (`.venv/bin/pytest`) are pinned to the invoking
/// directory so they still resolve from a copied workspace. Bare commands are
/// left to `PATH`.
fn resolve_cmd(cmd: &str, cwd: &Path) -> String {
    let p = Path::new(cmd);
    if p.is_absolute() || !cmd.contains('/') {
        return cmd.to_string();
    }
    let from_cwd = cwd.join(p);
    if from_cwd.exists() {
        return from_cwd.to_string_lossy().to_string();
    }
    cmd.to_string()
}
