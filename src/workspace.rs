//! The directory a worker installs its mutant into and runs tests from.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Isolation, WorkerConfig};
use crate::error::{Result, WorkerError};
use crate::installer::FsRegistry;
use crate::safety::BACKUP_SUFFIX;

const SKIP_NAMES: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "target",
    "dist",
    "build",
    ".next",
    ".nuxt",
];

const SKIP_SUFFIXES: &[&str] = &[BACKUP_SUFFIX, ".pyc", ".pyo"];

fn should_skip(name: &str) -> bool {
    SKIP_NAMES.contains(&name) || SKIP_SUFFIXES.iter().any(|s| name.ends_with(s))
}

fn copy_dir_filtered(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if should_skip(&name.to_string_lossy()) {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        let ft = entry.file_type()?;
        if ft.is_dir() {
            copy_dir_filtered(&src_path, &dst_path)?;
        } else if ft.is_file() {
            fs::copy(&src_path, &dst_path)?;
        }
        // symlinks and special files are left behind
    }
    Ok(())
}

pub struct Workspace {
    root: PathBuf,
    isolation: Isolation,
    // Deleted when the workspace is dropped.
    _temp_dir: Option<tempfile::TempDir>,
}

impl Workspace {
    pub fn prepare(config: &WorkerConfig) -> Result<Self> {
        match config.isolation {
            Isolation::InPlace => Ok(Self {
                root: config.project_root.clone(),
                isolation: Isolation::InPlace,
                _temp_dir: None,
            }),
            Isolation::CopyTree => {
                let temp_dir = tempfile::Builder::new()
                    .prefix(&format!("mutant-worker-{}-", config.session_id()))
                    .tempdir()
                    .map_err(|source| WorkerError::Workspace {
                        context: "creating temp directory".to_string(),
                        source,
                    })?;
                copy_dir_filtered(&config.project_root, temp_dir.path()).map_err(|source| {
                    WorkerError::Workspace {
                        context: format!("copying {}", config.project_root.display()),
                        source,
                    }
                })?;
                tracing::debug!(from = %config.project_root.display(), to = %temp_dir.path().display(), "copied project tree");
                Ok(Self {
                    root: temp_dir.path().to_path_buf(),
                    isolation: Isolation::CopyTree,
                    _temp_dir: Some(temp_dir),
                })
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> FsRegistry {
        match self.isolation {
            Isolation::InPlace => FsRegistry::in_place(&self.root),
            Isolation::CopyTree => FsRegistry::isolated(&self.root),
        }
    }
}
