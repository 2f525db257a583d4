//! One mutation, one test run.
//!
//! A worker parses a module, lets an operator walk it, and if the requested
//! occurrence exists installs the mutant, runs the tests and reports. It is
//! meant to run once per short-lived process.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, info, info_span};

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::installer::{self, MutantModule};
use crate::mutants::{MutationRequest, TestOutcome, TestStatus, WorkerResult};
use crate::operators::{Operator, OperatorKind};
use crate::parser;
use crate::runner::{TestRun, TestRunner, TestVerdict};
use crate::safety;
use crate::selector::Selector;
use crate::visitor;
use crate::workspace::Workspace;

/// Mutate the requested occurrence with the catalog operator named in the
/// request, run the tests and report.
///
/// Returns `Ok(None)` when the module has no such occurrence. Only
/// import/parse, workspace and restoration failures come back as errors.
pub fn worker(request: &MutationRequest, config: &WorkerConfig, test_runner: &dyn TestRunner) -> Result<WorkerResult> {
    let operator = request.operator_kind.operator();
    execute(request, operator.as_ref(), config, test_runner)
}

/// Same as [`worker`], with the operator supplied by the caller.
pub fn execute(
    request: &MutationRequest,
    operator: &dyn Operator,
    config: &WorkerConfig,
    test_runner: &dyn TestRunner,
) -> Result<WorkerResult> {
    let _span = info_span!(
        "worker",
        module = %request.module_name,
        operator = %request.operator_kind,
        occurrence = request.occurrence_index
    )
    .entered();

    recover_interrupted(config, &request.module_name)?;

    let module = parser::load_module(&config.project_root, &request.module_name)?;
    debug!("parsed");

    let mut selector = Selector::new(request);
    visitor::visit(&module, operator, &mut selector)?;
    let sites = selector.sites_seen();
    let Some(record) = selector.into_activation_record() else {
        info!(sites, "no eligible site at this occurrence");
        return Ok(None);
    };
    debug!(sites, line = record.location.line, original = %record.original, mutated = %record.mutated, "matched");

    let mutant = MutantModule::build(&module, &record);
    if let Err(err) = mutant.compile() {
        info!(%err, "mutant is incompetent");
        return Ok(Some((record, TestOutcome::incompetent(err.to_string(), Default::default()))));
    }

    let workspace = Workspace::prepare(config)?;
    let mut registry = workspace.registry();
    let outcome = installer::using_mutant(&mut registry, &mutant, |root| {
        debug!("installed");
        let outcome = run_tests(test_runner, root);
        debug!(status = %outcome.status, "tests run");
        outcome
    })?;
    debug!("uninstalled");

    info!(status = %outcome.status, duration_ms = outcome.duration.as_millis() as u64, "mutation tested");
    Ok(Some((record, outcome)))
}

fn run_tests(test_runner: &dyn TestRunner, root: &std::path::Path) -> TestOutcome {
    let start = Instant::now();
    let run = panic::catch_unwind(AssertUnwindSafe(|| test_runner.run(root)));
    let duration = start.elapsed();

    match run {
        Ok(run) => {
            let status = match run.verdict {
                TestVerdict::Passed => TestStatus::Survived,
                TestVerdict::Failed => TestStatus::Killed,
                TestVerdict::Errored => TestStatus::Incompetent,
            };
            TestOutcome {
                status,
                diagnostics: run.diagnostics,
                duration,
            }
        }
        Err(payload) => TestOutcome::incompetent(format!("test runner panicked: {}", panic_message(payload.as_ref())), duration),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Put back a module left mutated by a killed in-place worker, whichever
/// isolation this run uses.
fn recover_interrupted(config: &WorkerConfig, module_name: &str) -> Result<()> {
    let Some(path) = parser::module_path(&config.project_root, module_name) else {
        return Ok(());
    };
    safety::recover_interrupted(&path).map_err(|source| WorkerError::Restore {
        module: module_name.to_string(),
        source,
    })?;
    Ok(())
}

/// Number of eligible sites for `operator_kind` in `module_name`; occurrence
/// indices `0..count` address them all.
pub fn count_sites(config: &WorkerConfig, module_name: &str, operator_kind: OperatorKind) -> Result<usize> {
    recover_interrupted(config, module_name)?;
    let module = parser::load_module(&config.project_root, module_name)?;
    let operator = operator_kind.operator();
    Ok(visitor::count_eligible(&module, operator.as_ref()))
}

/// Run the suite against the unmutated project.
pub fn baseline(config: &WorkerConfig, test_runner: &dyn TestRunner) -> Result<TestRun> {
    let workspace = Workspace::prepare(config)?;
    let start = Instant::now();
    let run = test_runner.run(workspace.root());
    info!(verdict = ?run.verdict, duration_ms = start.elapsed().as_millis() as u64, "baseline finished");
    Ok(run)
}
