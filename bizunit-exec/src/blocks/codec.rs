use async_trait::async_trait;
use bizunit_core::{
    resolve, resolve_as, Block, BlockError, BlockFamily, BlockHeader, BlockNode, BlockResult,
    BlockStorage, Flow, FromTemplate, PlanStorage, TemplateReader, TemplateWriter, Value,
};
use serde_json::{Map, Value as JsonValue};

use crate::xml;

pub fn family() -> BlockFamily {
    BlockFamily::new("codec")
        .action::<JsonEncode>("json-encode")
        .action::<JsonDecode>("json-decode")
        .action::<XmlEncode>("xml-encode")
        .action::<XmlDecode>("xml-decode")
}

#[derive(Debug)]
pub struct JsonEncode {
    header: BlockHeader,
    value: BlockNode,
    pretty: bool,
}

impl FromTemplate for JsonEncode {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let pretty = match reader.value("pretty") {
            None | Some(JsonValue::Null) => false,
            Some(JsonValue::Bool(b)) => *b,
            Some(_) => return Err(reader.key().template_error("`pretty` must be a boolean")),
        };
        Ok(Self {
            header,
            value: reader.block("value")?,
            pretty,
        })
    }
}

#[async_trait]
impl Block for JsonEncode {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("value", &self.value)
            .value("pretty", JsonValue::Bool(self.pretty))
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let json = resolve!(self.value.run(plan, storage).await?).to_json();
        let text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(Flow::value(text))
    }
}

#[derive(Debug)]
pub struct JsonDecode {
    header: BlockHeader,
    value: BlockNode,
}

impl FromTemplate for JsonDecode {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.block("value")?,
        })
    }
}

#[async_trait]
impl Block for JsonDecode {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block("value", &self.value).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let text: String = resolve_as!(key, "value", self.value, plan, storage);
        let json: JsonValue = serde_json::from_str(&text)
            .map_err(|e| key.invalid_argument("value", format!("invalid JSON: {e}")))?;
        Ok(Flow::Continue(Value::from_json(json)))
    }
}

/// A single-entry map names its own root element; anything else is wrapped in `root`.
#[derive(Debug)]
pub struct XmlEncode {
    header: BlockHeader,
    value: BlockNode,
    root: String,
}

impl FromTemplate for XmlEncode {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.block("value")?,
            root: reader
                .optional_string("root")?
                .unwrap_or_else(|| "root".to_string()),
        })
    }
}

#[async_trait]
impl Block for XmlEncode {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("value", &self.value)
            .string("root", &self.root)
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let value = resolve!(self.value.run(plan, storage).await?);
        let text = xml::encode(&value, &self.root).map_err(|e| key.invalid_argument("value", e.to_string()))?;
        Ok(Flow::value(text))
    }
}

#[derive(Debug)]
pub struct XmlDecode {
    header: BlockHeader,
    value: BlockNode,
}

impl FromTemplate for XmlDecode {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.block("value")?,
        })
    }
}

#[async_trait]
impl Block for XmlDecode {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new().block("value", &self.value).finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let text: String = resolve_as!(key, "value", self.value, plan, storage);
        let value = xml::decode(&text).map_err(|e| key.invalid_argument("value", e.to_string()))?;
        Ok(Flow::Continue(value))
    }
}
