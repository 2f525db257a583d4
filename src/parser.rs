//! Syntax tree provider: turns a module on disk into a tree-sitter tree.

use std::path::{Component, Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Result, WorkerError};
use crate::{Language, detect_language};

pub struct SourceModule {
    pub name: String,
    pub path: PathBuf,
    pub language: Language,
    pub source: String,
    pub tree: Tree,
}

impl SourceModule {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

pub fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    }
}

/// Parse `source` with the grammar for `language`.
///
/// Returns `None` only if the grammar can't be loaded or the parser gives up;
/// source with syntax errors still yields a tree.
pub fn parse_source(language: Language, source: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&grammar(language)).ok()?;
    parser.parse(source, None)
}

/// Map a module name to its file under `root`. Names must stay inside the root.
pub fn module_path(root: &Path, module_name: &str) -> Option<PathBuf> {
    let rel = Path::new(module_name);
    if module_name.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(root.join(rel))
}

pub fn load_module(root: &Path, module_name: &str) -> Result<SourceModule> {
    let path = module_path(root, module_name).ok_or_else(|| WorkerError::Import {
        module: module_name.to_string(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "module name must be a relative path inside the project root",
        ),
    })?;

    let source = std::fs::read_to_string(&path).map_err(|source| WorkerError::Import {
        module: module_name.to_string(),
        source,
    })?;

    let language = detect_language(&path).ok_or_else(|| WorkerError::Parse {
        module: module_name.to_string(),
        reason: "unsupported file type (supported: .py, .rs, .js, .ts, .tsx, .jsx)".to_string(),
    })?;

    let tree = parse_source(language, &source).ok_or_else(|| WorkerError::Parse {
        module: module_name.to_string(),
        reason: "parser produced no syntax tree".to_string(),
    })?;

    tracing::debug!(module = module_name, ?language, bytes = source.len(), "parsed module");

    Ok(SourceModule {
        name: module_name.to_string(),
        path,
        language,
        source,
        tree,
    })
}

/// First syntax error in `tree`, as a human-readable message.
pub fn first_syntax_error(tree: &Tree) -> Option<String> {
    syntax_errors(tree).first().map(|node| describe_syntax_error(*node))
}

/// Error and missing nodes of `tree` in source order. Nodes nested inside an
/// error are not reported separately.
pub fn syntax_errors(tree: &Tree) -> Vec<Node<'_>> {
    let mut errors = Vec::new();
    collect_errors(tree.root_node(), &mut errors);
    errors
}

pub fn describe_syntax_error(node: Node) -> String {
    let pos = node.start_position();
    let what = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        "syntax error".to_string()
    };
    format!("{} at line {}, column {}", what, pos.row + 1, pos.column + 1)
}

fn collect_errors<'t>(node: Node<'t>, errors: &mut Vec<Node<'t>>) {
    if node.is_error() || node.is_missing() {
        errors.push(node);
        return;
    }
    if !node.has_error() {
        return;
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_errors(child, errors);
        }
    }
}
