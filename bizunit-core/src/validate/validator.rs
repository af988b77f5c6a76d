use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::block::BlockFactory;
use crate::error::{ValidationError, Violation};
use crate::plan::PlanDocument;

use super::rules;

pub(crate) static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid"));

pub struct Validator {
    violations: Vec<Violation>,
    operator_ids: HashSet<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            operator_ids: HashSet::new(),
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_document(&mut self, doc: &PlanDocument, factory: &BlockFactory) {
        rules::document::validate_document(self, doc, factory);
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    pub(crate) fn len(&self) -> usize {
        self.violations.len()
    }

    /// False if `id` was already claimed elsewhere in the plan.
    pub(crate) fn claim_operator_id(&mut self, id: &str) -> bool {
        self.operator_ids.insert(id.to_string())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
