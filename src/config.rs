//! Worker configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TEST_CMD: &str = "pytest -x -q";

/// Where the mutant gets installed while the tests run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Install into a filtered copy of the project in a temp dir.
    #[default]
    CopyTree,
    /// Install into the project tree itself, restoring it afterwards.
    InPlace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Project root; module names are resolved relative to it.
    pub project_root: PathBuf,
    /// Test command, run from the workspace root.
    pub test_cmd: String,
    pub isolation: Isolation,
    /// Session id used to name the isolated workspace.
    pub session: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            test_cmd: DEFAULT_TEST_CMD.to_string(),
            isolation: Isolation::default(),
            session: None,
        }
    }
}

impl WorkerConfig {
    pub fn with_project_root(mut self, project_root: impl Into<PathBuf>) -> Self {
        self.project_root = project_root.into();
        self
    }

    pub fn with_test_cmd(mut self, test_cmd: impl Into<String>) -> Self {
        self.test_cmd = test_cmd.into();
        self
    }

    pub fn with_isolation(mut self, isolation: Isolation) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// The configured session id, or a fresh random one.
    pub fn session_id(&self) -> String {
        self.session
            .clone()
            .unwrap_or_else(|| format!("{:08x}", fastrand::u32(..)))
    }
}
