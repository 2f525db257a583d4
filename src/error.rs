use thiserror::Error;

use crate::selector::ActivationError;

pub type Result<T, E = WorkerError> = std::result::Result<T, E>;

/// Failures allowed to escape a worker invocation.
///
/// Anything that goes wrong with the mutant itself is folded into the
/// `TestOutcome` instead and never shows up here.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("cannot import module `{module}`: {source}")]
    Import {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse module `{module}`: {reason}")]
    Parse { module: String, reason: String },

    #[error("unknown mutation operator `{0}`")]
    UnknownOperator(String),

    #[error("failed to prepare workspace: {context}: {source}")]
    Workspace {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install mutant of `{module}`: {source}")]
    Install {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to restore module `{module}`: {source}")]
    Restore {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Activation(#[from] ActivationError),
}

impl WorkerError {
    /// Process exit code used by the CLI for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerError::Import { .. } | WorkerError::Parse { .. } | WorkerError::UnknownOperator(_) => 2,
            _ => 3,
        }
    }
}
