//! Deterministic pre-order traversal that drives an operator over a module.

use std::convert::Infallible;

use tree_sitter::Node;

use crate::Language;
use crate::operators::{MutationSite, Operator};
use crate::parser::SourceModule;
use crate::selector::{ActivationError, Selector};

/// Walk the whole module, asking the selector about every eligible site and
/// transforming only the one it selects.
///
/// The walk always runs to completion, so `selector.sites_seen()` afterwards
/// is the number of eligible sites in the module.
pub fn visit(module: &SourceModule, operator: &dyn Operator, selector: &mut Selector) -> Result<(), ActivationError> {
    walk::<_, ActivationError>(module.root_node(), module, operator, &mut |site| {
        if selector.consider(&site) {
            let mutated = operator.transform(&site);
            selector.record_activation(site.location(), site.text(), mutated)?;
        }
        Ok(())
    })
}

/// Number of sites `operator` is eligible for in `module`.
pub fn count_eligible(module: &SourceModule, operator: &dyn Operator) -> usize {
    let mut count = 0;
    let Ok(()) = walk::<_, Infallible>(module.root_node(), module, operator, &mut |_| {
        count += 1;
        Ok(())
    });
    count
}

fn walk<'t, F, E>(node: Node<'t>, module: &'t SourceModule, operator: &dyn Operator, on_site: &mut F) -> Result<(), E>
where
    F: FnMut(MutationSite<'t>) -> Result<(), E>,
{
    if is_noise(node, &module.source, module.language) {
        return Ok(());
    }

    let site = MutationSite {
        node,
        source: &module.source,
        language: module.language,
    };
    if operator.is_eligible(&site) {
        on_site(site)?;
    }

    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            walk(child, module, operator, on_site)?;
        }
    }
    Ok(())
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Subtrees that aren't business logic: docstrings and logging/printing calls.
fn is_noise(node: Node, source: &str, language: Language) -> bool {
    if node.kind() == "expression_statement" && node.child_count() == 1 {
        if let Some(child) = node.child(0) {
            if child.kind() == "string" {
                return true;
            }
        }
    }

    match language {
        Language::Python => {
            if node.kind() != "call" {
                return false;
            }
            let Some(func) = node.child_by_field_name("function") else {
                return false;
            };
            let text = node_text(func, source);
            text == "print" || text.starts_with("logging.") || text.starts_with("log.") || text.starts_with("logger.")
        }
        Language::Rust => {
            if node.kind() != "macro_invocation" {
                return false;
            }
            let Some(mac) = node.child_by_field_name("macro") else {
                return false;
            };
            let name = node_text(mac, source);
            let name = name
                .strip_prefix("log::")
                .or_else(|| name.strip_prefix("tracing::"))
                .unwrap_or(name);
            matches!(
                name,
                "println" | "eprintln" | "print" | "eprint" | "dbg" | "format" | "trace" | "debug" | "info" | "warn" | "error"
            )
        }
        _ => {
            if node.kind() != "call_expression" {
                return false;
            }
            node.child_by_field_name("function")
                .is_some_and(|func| node_text(func, source).starts_with("console."))
        }
    }
}
