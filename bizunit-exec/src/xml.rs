//! XML <-> `Value` mapping shared by the codec blocks and the SOAP executor.
//!
//! Elements become map entries keyed by local name (namespace prefixes and declarations are
//! dropped). Attributes are stored as `@name`, mixed text as `#text`, repeated siblings as a list, and an
//! element with neither children nor attributes becomes its text (or null when empty).

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use bizunit_core::{Value, ValueMap};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum XmlError {
    #[error("invalid XML: {0}")]
    Parse(String),
    #[error("document has no root element")]
    Empty,
    #[error("unbalanced closing tag")]
    Unbalanced,
    #[error("invalid element name `{0}`")]
    InvalidName(String),
    #[error("cannot encode {0} as XML")]
    Unsupported(&'static str),
}

struct Frame {
    name: String,
    children: ValueMap,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut children = ValueMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::Parse(e.to_string()))?;
            children.insert(format!("@{key}"), Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            children,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Frame {
            name,
            mut children,
            text,
        } = self;
        let value = if children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !text.is_empty() {
                children.insert("#text".into(), Value::String(text));
            }
            Value::Map(children)
        };
        (name, value)
    }
}

fn push_child(map: &mut ValueMap, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::List(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::take(existing);
            *existing = Value::List(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Parse a document into `{rootName: value}`.
pub fn decode(input: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root = ValueMap::new();

    loop {
        match reader.read_event().map_err(|e| XmlError::Parse(e.to_string()))? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start)?.close();
                match stack.last_mut() {
                    Some(parent) => push_child(&mut parent.children, name, value),
                    None => push_child(&mut root, name, value),
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| XmlError::Parse(e.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let (name, value) = stack.pop().ok_or(XmlError::Unbalanced)?.close();
                match stack.last_mut() {
                    Some(parent) => push_child(&mut parent.children, name, value),
                    None => push_child(&mut root, name, value),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Unbalanced);
    }
    if root.is_empty() {
        return Err(XmlError::Empty);
    }
    Ok(Value::Map(root))
}

/// Render `value` as an XML fragment. A single-entry map names its own root element;
/// anything else is wrapped in `root`.
pub fn encode(value: &Value, root: &str) -> Result<String, XmlError> {
    let mut out = String::new();
    match value.as_map() {
        Some(map) if map.len() == 1 && !map.keys().any(|k| k.starts_with('@') || k == "#text") => {
            for (name, child) in map {
                write_element(&mut out, name, child)?;
            }
        }
        _ => write_element(&mut out, root, value)?,
    }
    Ok(out)
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn write_element(out: &mut String, name: &str, value: &Value) -> Result<(), XmlError> {
    if !valid_name(name) {
        return Err(XmlError::InvalidName(name.to_string()));
    }
    match value {
        Value::List(items) => {
            for item in items {
                write_element(out, name, item)?;
            }
        }
        Value::Map(map) => {
            out.push('<');
            out.push_str(name);
            for (k, v) in map.iter().filter(|(k, _)| k.starts_with('@')) {
                let attr = &k[1..];
                if !valid_name(attr) {
                    return Err(XmlError::InvalidName(k.clone()));
                }
                let v = v.to_scalar_string().ok_or(XmlError::Unsupported("non-scalar attribute"))?;
                out.push_str(&format!(" {attr}=\"{}\"", escape(v.as_str())));
            }
            out.push('>');
            for (k, v) in map {
                if k == "#text" {
                    let text = v.to_scalar_string().ok_or(XmlError::Unsupported("non-scalar text"))?;
                    out.push_str(&escape(text.as_str()));
                } else if !k.starts_with('@') {
                    write_element(out, k, v)?;
                }
            }
            out.push_str(&format!("</{name}>"));
        }
        Value::Null => out.push_str(&format!("<{name}/>")),
        Value::Context(_) | Value::Exchange(_) | Value::Handle(_) => {
            return Err(XmlError::Unsupported(value.type_name()))
        }
        scalar => {
            let text = scalar.to_scalar_string().unwrap_or_default();
            out.push_str(&format!("<{name}>{}</{name}>", escape(text.as_str())));
        }
    }
    Ok(())
}
