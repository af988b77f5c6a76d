mod rules;
mod validator;

use crate::block::BlockFactory;
use crate::error::ValidationError;
use crate::plan::PlanDocument;
use validator::Validator;

/// Check a plan document against the registered block families, collecting every violation.
pub fn validate_plan(doc: &PlanDocument, factory: &BlockFactory) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.validate_document(doc, factory);
    v.finish()
}
