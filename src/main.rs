use mutant_worker::config::{DEFAULT_TEST_CMD, Isolation, WorkerConfig};
use mutant_worker::dispatch::{self, DispatchError, DispatchOptions};
use mutant_worker::mutants::{self, MutationRequest, WorkerResult};
use mutant_worker::operators::OperatorKind;
use mutant_worker::runner::{CommandTestRunner, TestVerdict};
use mutant_worker::tasks::TaskRegistry;
use mutant_worker::{WorkerError, logging, output, worker};

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mutant-worker", version, about = "Apply one mutation, run the tests, report the outcome")]
struct Cli {
    /// Log filter, e.g. `info` or `mutant_worker=debug`. Logs go to stderr.
    #[arg(short, long, global = true, env = "MUTANT_WORKER_LOG", default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ProjectArgs {
    /// Project root; module names are relative to it (default: current directory)
    #[arg(long, env = "MUTANT_WORKER_ROOT")]
    root: Option<PathBuf>,
    /// Test command, run from the workspace root
    #[arg(long, env = "MUTANT_WORKER_TEST_CMD", default_value = DEFAULT_TEST_CMD)]
    test_cmd: String,
    /// Install the mutant into the project itself instead of a temp copy
    #[arg(long)]
    in_place: bool,
    /// Session id used to name the temp copy (default: random)
    #[arg(long)]
    session: Option<String>,
}

impl ProjectArgs {
    fn config(&self) -> anyhow::Result<WorkerConfig> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let root = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd,
        };
        let isolation = if self.in_place { Isolation::InPlace } else { Isolation::CopyTree };
        let mut config = WorkerConfig::default()
            .with_project_root(root)
            .with_test_cmd(self.test_cmd.clone())
            .with_isolation(isolation);
        if let Some(session) = &self.session {
            config = config.with_session(session.clone());
        }
        Ok(config)
    }

    fn dispatch_options(&self, deadline_secs: Option<u64>) -> anyhow::Result<DispatchOptions> {
        let config = self.config()?;
        Ok(DispatchOptions {
            root: Some(config.project_root),
            test_cmd: Some(config.test_cmd),
            in_place: self.in_place,
            deadline: deadline_secs.map(Duration::from_secs),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Mutate one occurrence, run the tests, print the result as JSON (`null` if no such occurrence)
    Worker {
        /// Module path relative to the project root (e.g. pkg/calc.py)
        module: String,
        /// Mutation operator (see `operators`)
        operator: String,
        /// Zero-based occurrence index among the operator's eligible sites
        occurrence: usize,
        #[command(flatten)]
        project: ProjectArgs,
        /// Human-readable output instead of JSON
        #[arg(long)]
        human: bool,
    },
    /// Count the eligible sites for an operator in a module
    Count {
        module: String,
        operator: String,
        #[arg(long, env = "MUTANT_WORKER_ROOT")]
        root: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List mutation operators
    Operators {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the test suite against the unmutated project
    Baseline {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Run a worker in a child process, optionally killing it after a deadline
    Dispatch {
        module: String,
        operator: String,
        occurrence: usize,
        #[command(flatten)]
        project: ProjectArgs,
        /// Kill the worker after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
        #[arg(long)]
        human: bool,
    },
    /// Invoke a registered queue task by name
    Task {
        #[command(flatten)]
        project: ProjectArgs,
        #[arg(long)]
        deadline_secs: Option<u64>,
        /// Task name (e.g. mutant_worker.worker)
        name: String,
        /// Positional task arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::setup_for_cli(&cli.verbosity);

    let result = match cli.command {
        Commands::Worker {
            module,
            operator,
            occurrence,
            project,
            human,
        } => cmd_worker(module, operator, occurrence, project, human),
        Commands::Count { module, operator, root, json } => cmd_count(module, operator, root, json),
        Commands::Operators { json } => cmd_operators(json),
        Commands::Baseline { project } => cmd_baseline(project),
        Commands::Dispatch {
            module,
            operator,
            occurrence,
            project,
            deadline_secs,
            human,
        } => cmd_dispatch(module, operator, occurrence, project, deadline_secs, human),
        Commands::Task {
            project,
            deadline_secs,
            name,
            args,
        } => cmd_task(name, args, project, deadline_secs),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            output::print_error(&format!("{:#}", err));
            exit_code_for(&err)
        }
    };
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(err) = err.downcast_ref::<WorkerError>() {
        err.exit_code()
    } else if err.downcast_ref::<DispatchError>().is_some() {
        4
    } else {
        3
    }
}

fn print_result(result: &WorkerResult, human: bool) -> anyhow::Result<()> {
    if human {
        output::print_worker_result(result);
    } else {
        println!("{}", serde_json::to_string(&mutants::to_wire(result))?);
    }
    Ok(())
}

fn cmd_worker(module: String, operator: String, occurrence: usize, project: ProjectArgs, human: bool) -> anyhow::Result<i32> {
    let operator_kind: OperatorKind = operator.parse()?;
    let config = project.config()?;
    let request = MutationRequest::new(module, operator_kind, occurrence);
    let test_runner = CommandTestRunner::new(&config.test_cmd);

    let result = worker(&request, &config, &test_runner)?;
    print_result(&result, human)?;
    Ok(0)
}

fn cmd_count(module: String, operator: String, root: Option<PathBuf>, json: bool) -> anyhow::Result<i32> {
    let operator_kind: OperatorKind = operator.parse()?;
    let project = ProjectArgs {
        root,
        test_cmd: DEFAULT_TEST_CMD.to_string(),
        in_place: false,
        session: None,
    };
    let config = project.config()?;
    let count = mutant_worker::count_sites(&config, &module, operator_kind)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "module": module, "operator": operator_kind, "count": count })
        );
    } else {
        output::print_count(&module, operator_kind, count);
    }
    Ok(0)
}

fn cmd_operators(json: bool) -> anyhow::Result<i32> {
    if json {
        println!("{}", serde_json::to_string(&OperatorKind::ALL)?);
    } else {
        output::print_operators();
    }
    Ok(0)
}

fn cmd_baseline(project: ProjectArgs) -> anyhow::Result<i32> {
    let config = project.config()?;
    let test_runner = CommandTestRunner::new(&config.test_cmd);
    let run = mutant_worker::baseline(&config, &test_runner)?;
    output::print_baseline(&run);
    Ok(if run.verdict == TestVerdict::Passed { 0 } else { 1 })
}

fn cmd_dispatch(
    module: String,
    operator: String,
    occurrence: usize,
    project: ProjectArgs,
    deadline_secs: Option<u64>,
    human: bool,
) -> anyhow::Result<i32> {
    let operator_kind: OperatorKind = operator.parse()?;
    let request = MutationRequest::new(module, operator_kind, occurrence);
    let options = project.dispatch_options(deadline_secs)?;
    let program = std::env::current_exe().context("cannot locate own executable")?;

    let result = dispatch::dispatch_worker(&program, &request, &options)?;
    print_result(&result, human)?;
    Ok(0)
}

fn cmd_task(name: String, args: Vec<String>, project: ProjectArgs, deadline_secs: Option<u64>) -> anyhow::Result<i32> {
    let options = project.dispatch_options(deadline_secs)?;
    let program = std::env::current_exe().context("cannot locate own executable")?;
    let registry = TaskRegistry::with_default_tasks(program, options);

    let value = registry.invoke(&name, &args)?;
    println!("{}", value);
    Ok(0)
}
