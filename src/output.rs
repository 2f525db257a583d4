use console::Style;

use crate::mutants::{TestStatus, WorkerResult};
use crate::operators::OperatorKind;
use crate::runner::{TestRun, TestVerdict};

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

/// Line diff between an original and a mutated fragment.
pub fn fragment_diff(original: &str, mutated: &str) -> String {
    use similar::{ChangeTag, TextDiff};
    let diff = TextDiff::from_lines(original, mutated);
    let mut output = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => continue,
        };
        output.push_str(&format!("{} {}", sign, change));
        if change.missing_newline() {
            output.push('\n');
        }
    }
    output
}

pub fn print_worker_result(result: &WorkerResult) {
    let Some((record, outcome)) = result else {
        let dim = Style::new().dim();
        println!("{} no eligible site at that occurrence", dim.apply_to("·"));
        return;
    };

    let (mark, style) = match outcome.status {
        TestStatus::Killed => ("✓", Style::new().green().bold()),
        TestStatus::Survived => ("!", Style::new().yellow().bold()),
        TestStatus::Incompetent => ("?", Style::new().dim().bold()),
    };
    println!(
        "{} {}:{}:{} [{} #{}] {} in {:.1}s",
        style.apply_to(mark),
        record.module_name,
        record.location.line,
        record.location.column,
        record.operator_kind,
        record.occurrence_index,
        style.apply_to(outcome.status),
        outcome.duration.as_secs_f64(),
    );

    for line in fragment_diff(&record.original, &record.mutated).lines() {
        let line_style = if line.starts_with('-') {
            Style::new().red()
        } else {
            Style::new().green()
        };
        println!("  {}", line_style.apply_to(line));
    }

    if outcome.status == TestStatus::Incompetent && !outcome.diagnostics.is_empty() {
        let dim = Style::new().dim();
        for line in outcome.diagnostics.lines().take(10) {
            println!("  {}", dim.apply_to(line));
        }
    }
}

pub fn print_count(module: &str, operator: OperatorKind, count: usize) {
    println!("{} {}: {} eligible site(s)", module, operator, count);
}

pub fn print_operators() {
    let name_style = Style::new().cyan().bold();
    for kind in OperatorKind::ALL {
        println!("  {} {}", name_style.apply_to(format!("{:<22}", kind.as_str())), kind.description());
    }
}

pub fn print_baseline(run: &TestRun) {
    match run.verdict {
        TestVerdict::Passed => print_success("Baseline passed."),
        TestVerdict::Failed | TestVerdict::Errored => {
            print_error(&format!(
                "Tests fail before mutation. Fix failing tests first.\n{}",
                run.diagnostics
            ));
        }
    }
}
