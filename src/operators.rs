//! Mutation operators.
//!
//! An operator answers two questions about a syntax node: is it a place this
//! kind of mutation applies to, and what should its text become. Traversal and
//! site selection live elsewhere (`visitor`, `selector`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::Language;
use crate::error::WorkerError;
use crate::mutants::Location;

/// A node under consideration during traversal. Only lives as long as the tree.
#[derive(Clone, Copy)]
pub struct MutationSite<'t> {
    pub node: Node<'t>,
    pub source: &'t str,
    pub language: Language,
}

impl<'t> MutationSite<'t> {
    pub fn text(&self) -> &'t str {
        self.text_of(self.node)
    }

    pub fn text_of(&self, node: Node) -> &'t str {
        &self.source[node.start_byte()..node.end_byte()]
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    pub fn parent_kind(&self) -> Option<&'static str> {
        self.node.parent().map(|p| p.kind())
    }

    pub fn location(&self) -> Location {
        Location::of(self.node)
    }

    /// Whether this node is the operator token of a binary expression.
    fn in_binary_expression(&self) -> bool {
        let expected = match self.language {
            Language::Python => "binary_operator",
            _ => "binary_expression",
        };
        self.parent_kind() == Some(expected)
    }

    fn in_comparison(&self) -> bool {
        match self.language {
            Language::Python => self.parent_kind() == Some("comparison_operator"),
            _ => self.in_binary_expression(),
        }
    }

    /// Whether this node is the `consequence` body of its parent `if`.
    fn is_if_consequence(&self, if_kind: &str) -> bool {
        match self.node.parent() {
            Some(parent) if parent.kind() == if_kind => {
                parent.child_by_field_name("consequence") == Some(self.node)
            }
            _ => false,
        }
    }
}

pub trait Operator {
    fn kind(&self) -> OperatorKind;

    fn is_eligible(&self, site: &MutationSite) -> bool;

    /// Replacement text for an eligible site.
    fn transform(&self, site: &MutationSite) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Arithmetic,
    ComparisonBoundary,
    ComparisonNegate,
    LogicalFlip,
    BooleanFlip,
    NegateRemove,
    ReturnValue,
    BlockRemove,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 8] = [
        OperatorKind::Arithmetic,
        OperatorKind::ComparisonBoundary,
        OperatorKind::ComparisonNegate,
        OperatorKind::LogicalFlip,
        OperatorKind::BooleanFlip,
        OperatorKind::NegateRemove,
        OperatorKind::ReturnValue,
        OperatorKind::BlockRemove,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperatorKind::Arithmetic => "arithmetic",
            OperatorKind::ComparisonBoundary => "comparison_boundary",
            OperatorKind::ComparisonNegate => "comparison_negate",
            OperatorKind::LogicalFlip => "logical_flip",
            OperatorKind::BooleanFlip => "boolean_flip",
            OperatorKind::NegateRemove => "negate_remove",
            OperatorKind::ReturnValue => "return_value",
            OperatorKind::BlockRemove => "block_remove",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OperatorKind::Arithmetic => "swap arithmetic operators (+ to -, * to /, ...)",
            OperatorKind::ComparisonBoundary => "shift comparison boundaries (< to <=, > to >=, ...)",
            OperatorKind::ComparisonNegate => "negate comparisons (> to <=, == to !=, in to not in, ...)",
            OperatorKind::LogicalFlip => "flip logical connectives (and/or, &&/||)",
            OperatorKind::BooleanFlip => "flip boolean literals",
            OperatorKind::NegateRemove => "drop a logical negation",
            OperatorKind::ReturnValue => "return a default value instead",
            OperatorKind::BlockRemove => "empty the body of an if",
        }
    }

    /// Build the operator implementation for this kind.
    pub fn operator(self) -> Box<dyn Operator> {
        match self {
            OperatorKind::Arithmetic => Box::new(ArithmeticSwap),
            OperatorKind::ComparisonBoundary => Box::new(ComparisonBoundary),
            OperatorKind::ComparisonNegate => Box::new(ComparisonNegate),
            OperatorKind::LogicalFlip => Box::new(LogicalFlip),
            OperatorKind::BooleanFlip => Box::new(BooleanFlip),
            OperatorKind::NegateRemove => Box::new(NegateRemove),
            OperatorKind::ReturnValue => Box::new(ReturnValue),
            OperatorKind::BlockRemove => Box::new(BlockRemove),
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatorKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        OperatorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| WorkerError::UnknownOperator(s.to_string()))
    }
}

fn arithmetic_replacement(op: &str) -> Option<&'static str> {
    match op {
        "+" => Some("-"),
        "-" => Some("+"),
        "*" => Some("/"),
        "/" => Some("*"),
        "//" => Some("/"),
        "%" => Some("/"),
        "**" => Some("*"),
        _ => None,
    }
}

fn boundary_replacement(op: &str) -> Option<&'static str> {
    match op {
        ">" => Some(">="),
        ">=" => Some(">"),
        "<" => Some("<="),
        "<=" => Some("<"),
        _ => None,
    }
}

fn negation_replacement(op: &str) -> Option<&'static str> {
    match op {
        ">" => Some("<="),
        ">=" => Some("<"),
        "<" => Some(">="),
        "<=" => Some(">"),
        "==" => Some("!="),
        "!=" => Some("=="),
        "===" => Some("!=="),
        "!==" => Some("==="),
        "is" => Some("is not"),
        "is not" => Some("is"),
        "in" => Some("not in"),
        "not in" => Some("in"),
        _ => None,
    }
}

fn logical_replacement(op: &str) -> Option<&'static str> {
    match op {
        "and" => Some("or"),
        "or" => Some("and"),
        "&&" => Some("||"),
        "||" => Some("&&"),
        "??" => Some("||"),
        _ => None,
    }
}

fn boolean_replacement(literal: &str) -> Option<&'static str> {
    match literal {
        "True" => Some("False"),
        "False" => Some("True"),
        "true" => Some("false"),
        "false" => Some("true"),
        _ => None,
    }
}

/// Replace via a lookup table; eligibility already guarantees a hit.
fn table_transform(site: &MutationSite, table: fn(&str) -> Option<&'static str>) -> String {
    table(site.text()).map_or_else(|| site.text().to_string(), str::to_string)
}

pub struct ArithmeticSwap;

impl ArithmeticSwap {
    fn is_string_concat(site: &MutationSite) -> bool {
        if site.kind() != "+" {
            return false;
        }
        let left = site.node.parent().and_then(|p| p.child_by_field_name("left"));
        matches!(
            left.map(|n| n.kind()),
            Some("string" | "concatenated_string" | "template_string" | "string_literal")
        )
    }
}

impl Operator for ArithmeticSwap {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Arithmetic
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        site.in_binary_expression()
            && arithmetic_replacement(site.kind()).is_some()
            && !Self::is_string_concat(site)
    }

    fn transform(&self, site: &MutationSite) -> String {
        table_transform(site, arithmetic_replacement)
    }
}

pub struct ComparisonBoundary;

impl Operator for ComparisonBoundary {
    fn kind(&self) -> OperatorKind {
        OperatorKind::ComparisonBoundary
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        site.in_comparison() && boundary_replacement(site.kind()).is_some()
    }

    fn transform(&self, site: &MutationSite) -> String {
        table_transform(site, boundary_replacement)
    }
}

pub struct ComparisonNegate;

impl Operator for ComparisonNegate {
    fn kind(&self) -> OperatorKind {
        OperatorKind::ComparisonNegate
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        // Only Python has `not in` / `is not` spellings.
        let word_operator = matches!(site.kind(), "is" | "is not" | "in" | "not in");
        site.in_comparison()
            && negation_replacement(site.kind()).is_some()
            && (!word_operator || site.language == Language::Python)
    }

    fn transform(&self, site: &MutationSite) -> String {
        // "is not" / "not in" may be spaced oddly in the source; normalise via the kind.
        negation_replacement(site.kind()).map_or_else(|| site.text().to_string(), str::to_string)
    }
}

pub struct LogicalFlip;

impl Operator for LogicalFlip {
    fn kind(&self) -> OperatorKind {
        OperatorKind::LogicalFlip
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        let in_logical = match site.language {
            Language::Python => site.parent_kind() == Some("boolean_operator"),
            _ => site.in_binary_expression(),
        };
        in_logical && logical_replacement(site.kind()).is_some()
    }

    fn transform(&self, site: &MutationSite) -> String {
        table_transform(site, logical_replacement)
    }
}

pub struct BooleanFlip;

impl Operator for BooleanFlip {
    fn kind(&self) -> OperatorKind {
        OperatorKind::BooleanFlip
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        let is_literal = match site.language {
            Language::Rust => site.kind() == "boolean_literal",
            _ => matches!(site.kind(), "true" | "false"),
        };
        // Returned literals belong to `return_value`.
        let returned = matches!(site.parent_kind(), Some("return_statement" | "return_expression"));
        is_literal && !returned && boolean_replacement(site.text()).is_some()
    }

    fn transform(&self, site: &MutationSite) -> String {
        table_transform(site, boolean_replacement)
    }
}

pub struct NegateRemove;

impl NegateRemove {
    fn operand<'t>(site: &MutationSite<'t>) -> Option<Node<'t>> {
        match site.language {
            Language::Python if site.kind() == "not_operator" => site.node.child_by_field_name("argument"),
            Language::Python => None,
            _ if site.kind() == "unary_expression" => {
                let op = site.node.child(0)?;
                if op.kind() != "!" {
                    return None;
                }
                site.node.child(site.node.child_count().checked_sub(1)?)
            }
            _ => None,
        }
    }
}

impl Operator for NegateRemove {
    fn kind(&self) -> OperatorKind {
        OperatorKind::NegateRemove
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        Self::operand(site).is_some()
    }

    fn transform(&self, site: &MutationSite) -> String {
        Self::operand(site).map_or_else(|| site.text().to_string(), |n| site.text_of(n).to_string())
    }
}

pub struct ReturnValue;

impl ReturnValue {
    /// The returned expression, if the node is a return with a value.
    fn returned<'t>(site: &MutationSite<'t>) -> Option<Node<'t>> {
        let expected = match site.language {
            Language::Rust => "return_expression",
            _ => "return_statement",
        };
        if site.kind() != expected {
            return None;
        }
        (0..site.node.child_count())
            .filter_map(|i| site.node.child(i))
            .find(|c| c.kind() != "return" && c.kind() != ";")
    }

    fn replacement(language: Language, value: &str) -> Option<&'static str> {
        let value = value.trim();
        match language {
            Language::Python => Some(match value {
                "None" => "return \"\"",
                "True" => "return False",
                "False" => "return True",
                "0" => "return 1",
                v if v.starts_with(['"', '\'']) || v.starts_with("f\"") || v.starts_with("f'") => {
                    if v.len() <= 2 { "return \"mutant\"" } else { "return \"\"" }
                }
                v if v.starts_with('[') => "return []",
                v if v.starts_with('{') => "return {}",
                v if v.parse::<f64>().is_ok() => "return 0",
                _ => "return None",
            }),
            Language::Rust => match value {
                "()" | "None" | "Ok(())" => None,
                "true" => Some("return false"),
                "false" => Some("return true"),
                "0" => Some("return 1"),
                v if v.starts_with('"') => Some("return \"\".to_string()"),
                v if v.starts_with("vec!") || v.starts_with("Vec::") => Some("return vec![]"),
                _ => Some("return Default::default()"),
            },
            _ => Some(match value {
                "true" => "return false;",
                "false" => "return true;",
                "null" | "undefined" => "return \"\";",
                "0" => "return 1;",
                v if v.starts_with(['"', '\'', '`']) => "return \"\";",
                v if v.starts_with('[') => "return [];",
                "{}" => "return null;",
                v if v.starts_with('{') => "return {};",
                v if v.parse::<f64>().is_ok() => "return 0;",
                _ => "return null;",
            }),
        }
    }
}

impl Operator for ReturnValue {
    fn kind(&self) -> OperatorKind {
        OperatorKind::ReturnValue
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        Self::returned(site)
            .and_then(|value| Self::replacement(site.language, site.text_of(value)))
            .is_some()
    }

    fn transform(&self, site: &MutationSite) -> String {
        Self::returned(site)
            .and_then(|value| Self::replacement(site.language, site.text_of(value)))
            .map_or_else(|| site.text().to_string(), str::to_string)
    }
}

pub struct BlockRemove;

impl Operator for BlockRemove {
    fn kind(&self) -> OperatorKind {
        OperatorKind::BlockRemove
    }

    fn is_eligible(&self, site: &MutationSite) -> bool {
        let text = site.text().trim();
        match site.language {
            Language::Python => {
                site.kind() == "block" && site.is_if_consequence("if_statement") && text != "pass"
            }
            Language::Rust => {
                site.kind() == "block" && site.is_if_consequence("if_expression") && !is_empty_braces(text)
            }
            _ => {
                site.kind() == "statement_block"
                    && site.is_if_consequence("if_statement")
                    && !is_empty_braces(text)
            }
        }
    }

    fn transform(&self, site: &MutationSite) -> String {
        match site.language {
            Language::Python => "pass".to_string(),
            _ => "{}".to_string(),
        }
    }
}

fn is_empty_braces(text: &str) -> bool {
    text.strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .is_some_and(|inner| inner.trim().is_empty())
}
