//! Scoped, reversible installation of a mutant into a module registry.

use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Language;
use crate::error::{Result, WorkerError};
use crate::mutants::ActivationRecord;
use crate::parser::{self, SourceModule};
use crate::safety;

/// Where modules live while tests run. Only the installer writes to it.
pub trait ModuleRegistry {
    /// Directory the test runner should run in.
    fn root(&self) -> &Path;

    fn get(&self, module_name: &str) -> std::io::Result<String>;

    fn set(&mut self, module_name: &str, contents: &str) -> std::io::Result<()>;

    /// Persist the original before a mutant replaces it.
    fn stash(&mut self, _module_name: &str, _original: &str) -> std::io::Result<()> {
        Ok(())
    }

    /// Drop whatever `stash` persisted, once the original is back.
    fn discard_stash(&mut self, _module_name: &str) -> std::io::Result<()> {
        Ok(())
    }
}

/// A project directory on disk.
pub struct FsRegistry {
    root: PathBuf,
    backups: bool,
}

impl FsRegistry {
    /// Registry over a scratch copy nobody else reads.
    pub fn isolated(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), backups: false }
    }

    /// Registry over the real project tree; keeps crash-recovery backups.
    pub fn in_place(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), backups: true }
    }

    fn path(&self, module_name: &str) -> std::io::Result<PathBuf> {
        parser::module_path(&self.root, module_name).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid module name `{module_name}`"))
        })
    }
}

impl ModuleRegistry for FsRegistry {
    fn root(&self) -> &Path {
        &self.root
    }

    fn get(&self, module_name: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.path(module_name)?)
    }

    fn set(&mut self, module_name: &str, contents: &str) -> std::io::Result<()> {
        let path = self.path(module_name)?;
        std::fs::write(&path, contents)?;
        clear_pycache(&path);
        Ok(())
    }

    fn stash(&mut self, module_name: &str, original: &str) -> std::io::Result<()> {
        if self.backups {
            safety::write_backup(&self.path(module_name)?, original)?;
        }
        Ok(())
    }

    fn discard_stash(&mut self, module_name: &str) -> std::io::Result<()> {
        if self.backups {
            safety::discard_backup(&self.path(module_name)?)?;
        }
        Ok(())
    }
}

/// Remove `__pycache__` bytecode for a Python file so the next import
/// re-reads the source.
pub fn clear_pycache(source_file: &Path) {
    if source_file.extension().and_then(|e| e.to_str()) != Some("py") {
        return;
    }
    let (Some(parent), Some(stem)) = (source_file.parent(), source_file.file_stem()) else {
        return;
    };
    let cache_dir = parent.join("__pycache__");
    let Ok(entries) = std::fs::read_dir(&cache_dir) else {
        return;
    };
    let stem = stem.to_string_lossy();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&format!("{stem}.")) && name.ends_with(".pyc") {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("mutant does not compile: {0}")]
pub struct CompileError(pub String);

/// The original module with one site's text replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutantModule {
    pub name: String,
    pub language: Language,
    pub source: String,
    /// Byte range of the replacement text within `source`.
    pub span: Range<usize>,
    /// Syntax errors the unmutated module already had.
    pub original_errors: usize,
}

impl MutantModule {
    pub fn build(module: &SourceModule, record: &ActivationRecord) -> Self {
        let start = record.location.start_byte;
        Self {
            name: module.name.clone(),
            language: module.language,
            source: apply_mutation(&module.source, record),
            span: start..start + record.mutated.len(),
            original_errors: parser::syntax_errors(&module.tree).len(),
        }
    }

    /// Re-parse the mutated source. The mutant is unloadable if it has more
    /// syntax errors than the original, or an error touching the mutated span.
    /// Errors the original module already carried are not held against it.
    pub fn compile(&self) -> std::result::Result<(), CompileError> {
        let tree = parser::parse_source(self.language, &self.source)
            .ok_or_else(|| CompileError("parser produced no syntax tree".to_string()))?;
        let errors = parser::syntax_errors(&tree);
        let touching = errors
            .iter()
            .find(|n| n.start_byte() <= self.span.end && self.span.start <= n.end_byte());
        let introduced = touching.or(errors.first().filter(|_| errors.len() > self.original_errors));
        match introduced {
            Some(node) => Err(CompileError(parser::describe_syntax_error(*node))),
            None => Ok(()),
        }
    }
}

pub fn apply_mutation(source: &str, record: &ActivationRecord) -> String {
    let span = record.location;
    let mut result = String::with_capacity(source.len() + record.mutated.len());
    result.push_str(&source[..span.start_byte]);
    result.push_str(&record.mutated);
    result.push_str(&source[span.end_byte..]);
    result
}

/// A mutant sitting in a registry slot. The original goes back on
/// `uninstall`, or on drop if the scope is left by unwinding.
pub struct InstalledMutant<'r, R: ModuleRegistry + ?Sized> {
    registry: &'r mut R,
    module_name: String,
    original: Option<String>,
}

impl<'r, R: ModuleRegistry + ?Sized> InstalledMutant<'r, R> {
    pub fn install(registry: &'r mut R, mutant: &MutantModule) -> Result<Self> {
        let install_err = |source| WorkerError::Install {
            module: mutant.name.clone(),
            source,
        };
        let original = registry.get(&mutant.name).map_err(install_err)?;
        registry.stash(&mutant.name, &original).map_err(install_err)?;

        let mut installed = Self {
            registry,
            module_name: mutant.name.clone(),
            original: Some(original),
        };
        // A partial write is rolled back by the drop of `installed`.
        installed
            .registry
            .set(&mutant.name, &mutant.source)
            .map_err(install_err)?;
        tracing::debug!(module = %mutant.name, root = %installed.registry.root().display(), "installed mutant");
        Ok(installed)
    }

    pub fn workspace(&self) -> &Path {
        self.registry.root()
    }

    pub fn uninstall(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        let restore_err = |source| WorkerError::Restore {
            module: self.module_name.clone(),
            source,
        };
        self.registry.set(&self.module_name, &original).map_err(restore_err)?;
        self.registry.discard_stash(&self.module_name).map_err(restore_err)?;
        tracing::debug!(module = %self.module_name, "restored original module");
        Ok(())
    }
}

impl<R: ModuleRegistry + ?Sized> Drop for InstalledMutant<'_, R> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::error!(%err, "could not restore original module");
        }
    }
}

/// Install `mutant`, run `scope` against the registry root, then put the
/// original back however `scope` exits.
pub fn using_mutant<R, T, F>(registry: &mut R, mutant: &MutantModule, scope: F) -> Result<T>
where
    R: ModuleRegistry + ?Sized,
    F: FnOnce(&Path) -> T,
{
    let installed = InstalledMutant::install(registry, mutant)?;
    let value = scope(installed.workspace());
    installed.uninstall()?;
    Ok(value)
}
