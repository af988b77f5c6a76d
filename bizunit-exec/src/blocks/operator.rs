//! Operators shape what flows in from the origin request and what goes back out.

use async_trait::async_trait;
use bizunit_core::{
    resolve, resolve_as, Block, BlockError, BlockFamily, BlockHeader, BlockNode, BlockResult,
    BlockStorage, BlockTemplate, Flow, FromTemplate, PlanResponse, PlanStorage, ProtocolContext,
    ProtocolExchange, TemplateReader, TemplateWriter, Value,
};
use serde_json::{Map, Value as JsonValue};

use super::support::{intersect_body, intersect_header};

pub const REQUEST_STORAGE: &str = "RequestOperatorStorage";
pub const RESPONSE_STORAGE: &str = "ResponseOperatorStorage";
pub const RESTFUL_STORAGE: &str = "RestfulOperatorStorage";

pub fn family() -> BlockFamily {
    BlockFamily::new("operator")
        .action::<RequestOperator>("request")
        .action::<ResponseOperator>("response")
        .action::<RestfulOperator>("restful")
        .action::<ResponseShape>("response-shape")
}

/// Filters the origin request down to the declared header and body fields and registers the
/// result under `id`.
#[derive(Debug)]
pub struct RequestOperator {
    header: BlockHeader,
    id: String,
    allow_header: Vec<String>,
    allow_body: Vec<String>,
}

impl FromTemplate for RequestOperator {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            id: reader.string("id")?,
            allow_header: reader.strings("header")?,
            allow_body: reader.strings("body")?,
        })
    }
}

#[async_trait]
impl Block for RequestOperator {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("id", &self.id)
            .strings("header", &self.allow_header)
            .strings("body", &self.allow_body)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let origin = plan.origin();
        let context = ProtocolContext::new(
            intersect_header(&origin.header, &self.allow_header),
            intersect_body(&origin.body, &self.allow_body),
            None,
        );
        let value = Value::from(context);
        plan.add_operator_storage(self.id.clone(), value.clone());
        storage
            .section_mut(REQUEST_STORAGE)
            .insert(self.id.clone(), value.clone());
        Ok(Flow::Continue(value))
    }
}

/// Ends the plan with the response described by a resolved context. An exchange responds with
/// its response side.
#[derive(Debug)]
pub struct ResponseOperator {
    header: BlockHeader,
    id: Option<String>,
    context: BlockNode,
}

impl FromTemplate for ResponseOperator {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            id: reader.optional_string("id")?,
            context: reader.block("context")?,
        })
    }
}

#[async_trait]
impl Block for ResponseOperator {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .optional_string("id", self.id.as_deref())
            .block("context", &self.context)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let context = match resolve!(self.context.run(plan, storage).await?) {
            Value::Context(ctx) => *ctx,
            Value::Exchange(ex) => ex.response,
            other => {
                return Err(self.header.key.invalid_argument(
                    "context",
                    format!("expected context or exchange, got {}", other.type_name()),
                ))
            }
        };
        if let Some(id) = &self.id {
            storage
                .section_mut(RESPONSE_STORAGE)
                .insert(id.clone(), Value::from(context.clone()));
        }
        let status = context.status_code.unwrap_or(200);
        Ok(Flow::Respond(PlanResponse::new(status, context.header, context.body)))
    }
}

/// One candidate response of a restful operator. A null `statusCode` matches any status.
#[derive(Debug, Clone)]
pub struct ResponseShape {
    header: BlockHeader,
    status: Option<u16>,
    allow_header: Vec<String>,
    allow_body: Vec<String>,
}

impl ResponseShape {
    fn matches(&self, status: Option<u16>) -> bool {
        self.status.is_none() || self.status == status
    }

    fn reshape(&self, response: &ProtocolContext) -> ProtocolContext {
        ProtocolContext::new(
            intersect_header(&response.header, &self.allow_header),
            intersect_body(&response.body, &self.allow_body),
            response.status_code,
        )
    }

    fn to_json(&self) -> JsonValue {
        BlockTemplate {
            r#type: self.header.key.r#type.clone(),
            action: self.header.key.action.clone(),
            extra: self.header.extra.clone(),
            template: self.template(),
        }
        .to_json()
    }
}

impl FromTemplate for ResponseShape {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            status: reader.optional_status("statusCode")?,
            allow_header: reader.strings("header")?,
            allow_body: reader.strings("body")?,
        })
    }
}

#[async_trait]
impl Block for ResponseShape {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .status("statusCode", self.status)
            .strings("header", &self.allow_header)
            .strings("body", &self.allow_body)
            .finish()
    }

    /// On its own a shape only describes itself.
    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Continue(Value::from_json(JsonValue::Object(self.template()))))
    }
}

/// Runs a protocol unit and keeps the reshaped exchange of the first candidate whose status
/// matches, in declared order. With no match the stored exchange is empty.
#[derive(Debug)]
pub struct RestfulOperator {
    header: BlockHeader,
    id: String,
    protocol: BlockNode,
    responses: Vec<ResponseShape>,
}

impl FromTemplate for RestfulOperator {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let raw = match reader.value("responses") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items.clone(),
            Some(_) => return Err(reader.key().template_error("`responses` must be a list")),
        };
        let mut responses = Vec::with_capacity(raw.len());
        for (idx, item) in raw.iter().enumerate() {
            let template = BlockTemplate::from_json(item)?;
            if template.r#type != "operator" || template.action != "response-shape" {
                return Err(reader.key().template_error(format!(
                    "`responses` entries must be operator.response-shape blocks, got {}",
                    template.key()
                )));
            }
            let key = template.key();
            let field = format!("responses[{idx}].template");
            let shape_reader = reader.nested(&field, &key, &template.template);
            responses.push(ResponseShape::from_template(
                BlockHeader::new(key.clone(), template.extra.clone()),
                &shape_reader,
            )?);
        }
        Ok(Self {
            header,
            id: reader.string("id")?,
            protocol: reader.block("protocol")?,
            responses,
        })
    }
}

#[async_trait]
impl Block for RestfulOperator {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .string("id", &self.id)
            .block("protocol", &self.protocol)
            .value(
                "responses",
                JsonValue::Array(self.responses.iter().map(ResponseShape::to_json).collect()),
            )
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let exchange: ProtocolExchange =
            resolve_as!(self.header.key, "protocol", self.protocol, plan, storage);
        let status = exchange.response.status_code;
        let selected = match self.responses.iter().find(|shape| shape.matches(status)) {
            Some(shape) => ProtocolExchange::new(exchange.request.clone(), shape.reshape(&exchange.response)),
            None => ProtocolExchange::empty(),
        };
        let value = Value::from(selected);
        plan.add_operator_storage(self.id.clone(), value.clone());
        storage
            .section_mut(RESTFUL_STORAGE)
            .insert(self.id.clone(), value.clone());
        Ok(Flow::Continue(value))
    }
}
