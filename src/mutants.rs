use std::time::Duration;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::operators::OperatorKind;

/// Which site to mutate: the `occurrence_index`-th eligible site (zero-based)
/// for `operator_kind` in `module_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub module_name: String,
    pub operator_kind: OperatorKind,
    pub occurrence_index: usize,
}

impl MutationRequest {
    pub fn new(module_name: impl Into<String>, operator_kind: OperatorKind, occurrence_index: usize) -> Self {
        Self {
            module_name: module_name.into(),
            operator_kind,
            occurrence_index,
        }
    }
}

/// Source span of a mutation site. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Location {
    pub fn of(node: Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            line: start.row + 1,
            column: start.column + 1,
            end_line: end.row + 1,
            end_column: end.column + 1,
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }
}

/// Exactly which mutation was applied, where, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub module_name: String,
    pub operator_kind: OperatorKind,
    pub occurrence_index: usize,
    pub location: Location,
    pub original: String,
    pub mutated: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The tests detected the mutation.
    Killed,
    /// The tests passed against the mutant.
    Survived,
    /// The mutant could not be meaningfully executed.
    Incompetent,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestStatus::Killed => "killed",
            TestStatus::Survived => "survived",
            TestStatus::Incompetent => "incompetent",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub status: TestStatus,
    pub diagnostics: String,
    pub duration: Duration,
}

impl TestOutcome {
    pub fn incompetent(diagnostics: impl Into<String>, duration: Duration) -> Self {
        Self {
            status: TestStatus::Incompetent,
            diagnostics: diagnostics.into(),
            duration,
        }
    }
}

/// `None` when the requested occurrence does not exist in the module.
pub type WorkerResult = Option<(ActivationRecord, TestOutcome)>;

/// Flat record carried across the process boundary. An empty
/// `WorkerResult` travels as JSON `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub module: String,
    pub operator: OperatorKind,
    pub occurrence: usize,
    pub location: Location,
    pub original: String,
    pub mutated: String,
    pub outcome: TestStatus,
    pub diagnostics: String,
    pub duration_ms: u64,
}

impl WorkerRecord {
    pub fn new(record: &ActivationRecord, outcome: &TestOutcome) -> Self {
        Self {
            module: record.module_name.clone(),
            operator: record.operator_kind,
            occurrence: record.occurrence_index,
            location: record.location,
            original: record.original.clone(),
            mutated: record.mutated.clone(),
            outcome: outcome.status,
            diagnostics: outcome.diagnostics.clone(),
            duration_ms: outcome.duration.as_millis() as u64,
        }
    }

    pub fn into_parts(self) -> (ActivationRecord, TestOutcome) {
        let record = ActivationRecord {
            module_name: self.module,
            operator_kind: self.operator,
            occurrence_index: self.occurrence,
            location: self.location,
            original: self.original,
            mutated: self.mutated,
        };
        let outcome = TestOutcome {
            status: self.outcome,
            diagnostics: self.diagnostics,
            duration: Duration::from_millis(self.duration_ms),
        };
        (record, outcome)
    }
}

pub fn to_wire(result: &WorkerResult) -> Option<WorkerRecord> {
    result
        .as_ref()
        .map(|(record, outcome)| WorkerRecord::new(record, outcome))
}

pub fn from_wire(record: Option<WorkerRecord>) -> WorkerResult {
    record.map(WorkerRecord::into_parts)
}
