//! Running a worker as a child process and reading its result back.
//!
//! Everything that goes wrong on this side of the process boundary is a
//! `DispatchError`, kept apart from legitimate worker results (including the
//! empty one).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::mutants::{self, MutationRequest, WorkerRecord, WorkerResult};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn worker `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker exited with {}: {stderr}", exit_label(.code))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("worker produced malformed output ({reason}): {stdout:?}")]
    MalformedOutput { reason: String, stdout: String },

    #[error("worker exceeded its deadline of {0:?} and was killed")]
    DeadlineExceeded(Duration),

    #[error("unknown task `{0}`")]
    UnknownTask(String),

    #[error("invalid task arguments: {0}")]
    InvalidArguments(String),

    #[error("io error while supervising worker: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

/// Options forwarded to the child worker, plus the supervisor's deadline.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub root: Option<PathBuf>,
    pub test_cmd: Option<String>,
    pub in_place: bool,
    pub deadline: Option<Duration>,
}

/// Command-line arguments for `<program> worker ...`.
pub fn worker_args(request: &MutationRequest, options: &DispatchOptions) -> Vec<String> {
    let mut args = vec![
        "worker".to_string(),
        request.module_name.clone(),
        request.operator_kind.to_string(),
        request.occurrence_index.to_string(),
    ];
    if let Some(root) = &options.root {
        args.push("--root".to_string());
        args.push(root.to_string_lossy().to_string());
    }
    if let Some(cmd) = &options.test_cmd {
        args.push("--test-cmd".to_string());
        args.push(cmd.clone());
    }
    if options.in_place {
        args.push("--in-place".to_string());
    }
    args
}

/// Parse a worker's stdout: a `WorkerRecord` or `null`.
pub fn parse_worker_output(stdout: &str) -> Result<WorkerResult, DispatchError> {
    let record: Option<WorkerRecord> =
        serde_json::from_str(stdout.trim()).map_err(|e| DispatchError::MalformedOutput {
            reason: e.to_string(),
            stdout: stdout.to_string(),
        })?;
    Ok(mutants::from_wire(record))
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

/// Best effort: the child may already have exited.
fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Run one mutation in a child `program worker ...` process.
///
/// With a deadline, the child is killed once it expires.
pub fn dispatch_worker(program: &Path, request: &MutationRequest, options: &DispatchOptions) -> Result<WorkerResult, DispatchError> {
    let args = worker_args(request, options);
    tracing::debug!(program = %program.display(), ?args, "dispatching worker");

    let mut child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| DispatchError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        let polled = match child.try_wait() {
            Ok(polled) => polled,
            Err(err) => {
                kill_and_reap(&mut child);
                return Err(DispatchError::Io(err));
            }
        };
        match polled {
            Some(status) => break status,
            None => {
                if let Some(deadline) = options.deadline {
                    if start.elapsed() > deadline {
                        kill_and_reap(&mut child);
                        tracing::warn!(?deadline, module = %request.module_name, "worker killed after deadline");
                        return Err(DispatchError::DeadlineExceeded(deadline));
                    }
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    if !status.success() {
        return Err(DispatchError::ExitStatus {
            code: status.code(),
            stderr: stderr.trim().to_string(),
        });
    }
    parse_worker_output(&stdout)
}
