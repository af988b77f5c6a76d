use crate::block::BlockFactory;
use crate::plan::PlanDocument;
use crate::validate::rules::blocks;
use crate::validate::validator::Validator;

pub(crate) fn validate_document(v: &mut Validator, doc: &PlanDocument, factory: &BlockFactory) {
    if doc.name.trim().is_empty() {
        v.push("$.name", "must not be empty");
    }
    if doc.blocks.is_empty() {
        v.push("$.blocks", "must have at least one entry");
    }

    for (idx, raw) in doc.blocks.iter().enumerate() {
        blocks::validate_block(v, raw, &format!("$.blocks[{idx}]"), factory);
    }
}
