//! Named capabilities a queue integration can register with its broker.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::dispatch::{self, DispatchError, DispatchOptions};
use crate::mutants::{self, MutationRequest};
use crate::operators::OperatorKind;

pub const GREETING_TASK: &str = "mutant_worker.greeting";
pub const WORKER_TASK: &str = "mutant_worker.worker";

pub type TaskFn = Box<dyn Fn(&[String]) -> Result<serde_json::Value, DispatchError> + Send + Sync>;

#[derive(Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, TaskFn>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The greeting and worker tasks, with workers run as `program worker ...`.
    pub fn with_default_tasks(program: PathBuf, options: DispatchOptions) -> Self {
        let mut registry = Self::new();
        registry.register(GREETING_TASK, |args| Ok(serde_json::Value::String(greeting(args))));
        registry.register(WORKER_TASK, move |args| {
            let request = request_from_args(args)?;
            let result = dispatch::dispatch_worker(&program, &request, &options)?;
            serde_json::to_value(mutants::to_wire(&result)).map_err(|e| DispatchError::MalformedOutput {
                reason: e.to_string(),
                stdout: String::new(),
            })
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, task: F)
    where
        F: Fn(&[String]) -> Result<serde_json::Value, DispatchError> + Send + Sync + 'static,
    {
        self.tasks.insert(name.to_string(), Box::new(task));
    }

    pub fn invoke(&self, name: &str, args: &[String]) -> Result<serde_json::Value, DispatchError> {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTask(name.to_string()))?;
        tracing::debug!(task = name, ?args, "invoking task");
        task(args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }
}

pub fn greeting(args: &[String]) -> String {
    format!("Hello, {:?}, I hope you like mutation testing!", args)
}

/// Positional `module operator occurrence`, as a direct worker call takes them.
pub fn request_from_args(args: &[String]) -> Result<MutationRequest, DispatchError> {
    let [module, operator, occurrence] = args else {
        return Err(DispatchError::InvalidArguments(format!(
            "expected <module> <operator> <occurrence>, got {} argument(s)",
            args.len()
        )));
    };
    let operator_kind: OperatorKind = operator
        .parse()
        .map_err(|e: crate::error::WorkerError| DispatchError::InvalidArguments(e.to_string()))?;
    let occurrence_index = occurrence
        .parse()
        .map_err(|_| DispatchError::InvalidArguments(format!("occurrence must be a non-negative integer, got `{occurrence}`")))?;
    Ok(MutationRequest::new(module.clone(), operator_kind, occurrence_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_tasks_are_registered_under_stable_names() {
        let registry = TaskRegistry::with_default_tasks(PathBuf::from("mutant-worker"), DispatchOptions::default());
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec![GREETING_TASK, WORKER_TASK]);
    }

    #[test]
    fn greeting_echoes_args() {
        let registry = TaskRegistry::with_default_tasks(PathBuf::from("mutant-worker"), DispatchOptions::default());
        let value = registry.invoke(GREETING_TASK, &args(&["a", "b"])).unwrap();
        assert_eq!(value.as_str().unwrap(), "Hello, [\"a\", \"b\"], I hope you like mutation testing!");
    }

    #[test]
    fn unknown_task_is_a_dispatch_error() {
        let registry = TaskRegistry::new();
        assert!(matches!(registry.invoke("nope", &[]), Err(DispatchError::UnknownTask(_))));
    }

    #[test]
    fn request_args_are_validated() {
        let request = request_from_args(&args(&["calc.py", "arithmetic", "2"])).unwrap();
        assert_eq!(request, MutationRequest::new("calc.py", OperatorKind::Arithmetic, 2));

        assert!(matches!(request_from_args(&args(&["calc.py"])), Err(DispatchError::InvalidArguments(_))));
        assert!(matches!(
            request_from_args(&args(&["calc.py", "bogus", "0"])),
            Err(DispatchError::InvalidArguments(_))
        ));
        assert!(matches!(
            request_from_args(&args(&["calc.py", "arithmetic", "-1"])),
            Err(DispatchError::InvalidArguments(_))
        ));
    }
}
