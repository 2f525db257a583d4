pub mod config;
pub mod dispatch;
pub mod error;
pub mod installer;
pub mod logging;
pub mod mutants;
pub mod operators;
pub mod output;
pub mod parser;
pub mod runner;
pub mod safety;
pub mod selector;
pub mod tasks;
pub mod visitor;
pub mod worker;
pub mod workspace;

pub use config::{Isolation, WorkerConfig};
pub use error::{Result, WorkerError};
pub use mutants::{ActivationRecord, Location, MutationRequest, TestOutcome, TestStatus, WorkerResult};
pub use operators::{Operator, OperatorKind};
pub use runner::{CommandTestRunner, TestRun, TestRunner, TestVerdict};
pub use worker::{baseline, count_sites, execute, worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    /// True for the JavaScript family, which shares one set of node kinds.
    pub fn is_js_family(self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript | Language::Tsx)
    }
}

pub fn detect_language(path: &std::path::Path) -> Option<Language> {
    match path.extension()?.to_str()? {
        "py" => Some(Language::Python),
        "rs" => Some(Language::Rust),
        "js" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "mts" | "cts" => Some(Language::TypeScript),
        "tsx" | "jsx" => Some(Language::Tsx),
        _ => None,
    }
}
