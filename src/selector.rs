//! Picks the one mutation site a worker invocation is allowed to touch.

use thiserror::Error;

use crate::mutants::{ActivationRecord, Location, MutationRequest};
use crate::operators::{MutationSite, OperatorKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActivationError {
    #[error("activation recorded before any site was selected")]
    NotSelected,
    #[error("activation already recorded for occurrence {0}")]
    AlreadyRecorded(usize),
}

/// Counts eligible sites in traversal order and fires for exactly one of them.
///
/// Once `consider` has returned `true` it returns `false` forever, even if an
/// operator revisits a site and the count lines up again.
#[derive(Debug)]
pub struct Selector {
    module_name: String,
    operator_kind: OperatorKind,
    target: usize,
    count: usize,
    selected: bool,
    activation: Option<ActivationRecord>,
}

impl Selector {
    pub fn new(request: &MutationRequest) -> Self {
        Self {
            module_name: request.module_name.clone(),
            operator_kind: request.operator_kind,
            target: request.occurrence_index,
            count: 0,
            selected: false,
            activation: None,
        }
    }

    pub fn consider(&mut self, site: &MutationSite) -> bool {
        self.count += 1;
        if self.selected || self.count - 1 != self.target {
            return false;
        }
        self.selected = true;
        tracing::debug!(
            occurrence = self.target,
            line = site.node.start_position().row + 1,
            kind = site.node.kind(),
            "selected mutation site"
        );
        true
    }

    pub fn record_activation(
        &mut self,
        location: Location,
        original: impl Into<String>,
        mutated: impl Into<String>,
    ) -> Result<&ActivationRecord, ActivationError> {
        if !self.selected {
            return Err(ActivationError::NotSelected);
        }
        if self.activation.is_some() {
            return Err(ActivationError::AlreadyRecorded(self.target));
        }
        Ok(self.activation.insert(ActivationRecord {
            module_name: self.module_name.clone(),
            operator_kind: self.operator_kind,
            occurrence_index: self.target,
            location,
            original: original.into(),
            mutated: mutated.into(),
        }))
    }

    /// Number of eligible sites seen so far.
    pub fn sites_seen(&self) -> usize {
        self.count
    }

    pub fn activation_record(&self) -> Option<&ActivationRecord> {
        self.activation.as_ref()
    }

    pub fn into_activation_record(self) -> Option<ActivationRecord> {
        self.activation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Language;
    use crate::parser::parse_source;

    fn with_site<F: FnOnce(&MutationSite)>(f: F) {
        let source = "x = 1\n";
        let tree = parse_source(Language::Python, source).unwrap();
        let site = MutationSite {
            node: tree.root_node(),
            source,
            language: Language::Python,
        };
        f(&site);
    }

    fn request(index: usize) -> MutationRequest {
        MutationRequest::new("m.py", OperatorKind::Arithmetic, index)
    }

    #[test]
    fn fires_only_on_target_count() {
        with_site(|site| {
            let mut selector = Selector::new(&request(2));
            let hits: Vec<bool> = (0..5).map(|_| selector.consider(site)).collect();
            assert_eq!(hits, vec![false, false, true, false, false]);
            assert_eq!(selector.sites_seen(), 5);
        });
    }

    #[test]
    fn never_fires_when_target_out_of_range() {
        with_site(|site| {
            let mut selector = Selector::new(&request(5));
            assert!((0..2).all(|_| !selector.consider(site)));
            assert!(selector.into_activation_record().is_none());
        });
    }

    #[test]
    fn record_requires_selection() {
        let mut selector = Selector::new(&request(0));
        let location = Location {
            line: 1,
            column: 1,
            end_line: 1,
            end_column: 2,
            start_byte: 0,
            end_byte: 1,
        };
        assert_eq!(
            selector.record_activation(location, "+", "-").unwrap_err(),
            ActivationError::NotSelected
        );
    }

    #[test]
    fn record_is_populated_once() {
        with_site(|site| {
            let mut selector = Selector::new(&request(0));
            assert!(selector.consider(site));
            let location = Location::of(site.node);
            let record = selector.record_activation(location, "+", "-").unwrap();
            assert_eq!(record.occurrence_index, 0);
            assert_eq!(record.original, "+");
            assert_eq!(
                selector.record_activation(location, "+", "*").unwrap_err(),
                ActivationError::AlreadyRecorded(0)
            );
            assert_eq!(selector.activation_record().unwrap().mutated, "-");
        });
    }
}
