use serde_json::{Map, Value as JsonValue};

use crate::block::BlockFactory;
use crate::template::{ChildOutline, ChildShape};
use crate::validate::validator::{Validator, ID_RE};

/// Operator actions that register their output under an author-assigned id.
const ID_BEARING: &[(&str, &str)] = &[("operator", "request"), ("operator", "restful")];

pub(crate) fn validate_block(v: &mut Validator, raw: &JsonValue, path: &str, factory: &BlockFactory) {
    let Some(obj) = raw.as_object() else {
        v.push(path, "block must be an object");
        return;
    };
    let r#type = obj.get("type").and_then(JsonValue::as_str);
    let action = obj.get("action").and_then(JsonValue::as_str);
    let (Some(r#type), Some(action)) = (r#type, action) else {
        if r#type.is_none() {
            v.push(format!("{path}.type"), "must be a non-empty string");
        }
        if action.is_none() {
            v.push(format!("{path}.action"), "must be a non-empty string");
        }
        return;
    };
    let before = v.len();
    let known = factory.contains(r#type, action);
    if !known {
        v.push(path, format!("unknown block `{type}.{action}`"));
    }
    if let Some(extra) = obj.get("extra") {
        if !extra.is_object() && !extra.is_null() {
            v.push(format!("{path}.extra"), "must be an object");
        }
    }

    let empty = Map::new();
    let template = match obj.get("template") {
        None | Some(JsonValue::Null) => &empty,
        Some(JsonValue::Object(t)) => t,
        Some(_) => {
            v.push(format!("{path}.template"), "must be an object");
            return;
        }
    };

    if ID_BEARING.iter().any(|&(t, a)| t == r#type && a == action) {
        let id_path = format!("{path}.template.id");
        match template.get("id").and_then(JsonValue::as_str) {
            None => v.push(id_path, "operator id is required"),
            Some(id) if !ID_RE.is_match(id) => v.push(id_path, "must match regex [A-Za-z0-9_\\-]+"),
            Some(id) => {
                if !v.claim_operator_id(id) {
                    v.push(id_path, format!("operator id `{id}` is already used"));
                }
            }
        }
    }
    if !known {
        return;
    }

    // The block's own constructor says which fields hold children; everything else is data.
    let outline = ChildOutline::new();
    if let Err(e) = factory.outline(raw, &outline) {
        if v.len() == before {
            v.push(path, e.to_string());
        }
    }
    for child in outline.into_fields() {
        let child_path = format!("{path}.template.{}", child.path);
        match child.shape {
            ChildShape::Single => validate_block(v, &child.raw, &child_path, factory),
            ChildShape::List => {
                for (idx, item) in child.raw.as_array().into_iter().flatten().enumerate() {
                    validate_block(v, item, &format!("{child_path}[{idx}]"), factory);
                }
            }
            ChildShape::Map => {
                for (name, item) in child.raw.as_object().into_iter().flatten() {
                    validate_block(v, item, &format!("{child_path}.{name}"), factory);
                }
            }
        }
    }
}
