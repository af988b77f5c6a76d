//! Date-time values travel between blocks as an opaque [`DateTimeSupport`] handle.

use std::any::Any;
use std::fmt::Write as _;

use async_trait::async_trait;
use bizunit_core::{
    resolve, resolve_as, Block, BlockError, BlockFamily, BlockHeader, BlockKey, BlockNode,
    BlockResult, BlockStorage, Flow, FromTemplate, Handle, HandleObject, PlanStorage,
    TemplateReader, TemplateWriter, Value,
};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDateTime, Offset, Utc};
use serde_json::{Map, Value as JsonValue};

pub fn family() -> BlockFamily {
    BlockFamily::new("datetime")
        .action::<NowBlock>("now")
        .action::<ParseBlock>("parse")
        .action::<FormatBlock>("format")
        .action::<ModifyBlock>("modify")
        .action::<DiffBlock>("diff")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeSupport(pub DateTime<FixedOffset>);

impl DateTimeSupport {
    pub fn into_value(self) -> Value {
        Value::Handle(Handle::new(self))
    }
}

impl HandleObject for DateTimeSupport {
    fn kind(&self) -> &'static str {
        "datetime"
    }

    fn to_json(&self) -> JsonValue {
        JsonValue::String(self.0.to_rfc3339())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "second" | "seconds" => Unit::Seconds,
            "minute" | "minutes" => Unit::Minutes,
            "hour" | "hours" => Unit::Hours,
            "day" | "days" => Unit::Days,
            "week" | "weeks" => Unit::Weeks,
            "month" | "months" => Unit::Months,
            "year" | "years" => Unit::Years,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Unit::Seconds => "seconds",
            Unit::Minutes => "minutes",
            Unit::Hours => "hours",
            Unit::Days => "days",
            Unit::Weeks => "weeks",
            Unit::Months => "months",
            Unit::Years => "years",
        }
    }

    fn seconds(self) -> Option<i64> {
        match self {
            Unit::Seconds => Some(1),
            Unit::Minutes => Some(60),
            Unit::Hours => Some(3_600),
            Unit::Days => Some(86_400),
            Unit::Weeks => Some(604_800),
            Unit::Months | Unit::Years => None,
        }
    }
}

fn unit_field(reader: &TemplateReader<'_>, field: &str) -> Result<Unit, BlockError> {
    let raw = reader.string(field)?;
    Unit::parse(&raw).ok_or_else(|| reader.key().template_error(format!("unknown {field} `{raw}`")))
}

fn format_field(reader: &TemplateReader<'_>, field: &str) -> Result<Option<String>, BlockError> {
    let format = reader.optional_string(field)?;
    if let Some(f) = &format {
        if StrftimeItems::new(f).any(|item| matches!(item, Item::Error)) {
            return Err(reader.key().template_error(format!("invalid {field} `{f}`")));
        }
    }
    Ok(format)
}

fn offset_of(key: &BlockKey, raw: &str) -> Result<FixedOffset, BlockError> {
    if raw.eq_ignore_ascii_case("utc") || raw == "Z" {
        return Ok(Utc.fix());
    }
    raw.parse::<FixedOffset>()
        .map_err(|_| key.template_error(format!("invalid offset `{raw}`")))
}

/// The current instant, in UTC or at a fixed `offset` such as `+09:00`.
#[derive(Debug)]
pub struct NowBlock {
    header: BlockHeader,
    offset: Option<String>,
    tz: FixedOffset,
}

impl FromTemplate for NowBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let offset = reader.optional_string("offset")?;
        let tz = match &offset {
            Some(raw) => offset_of(reader.key(), raw)?,
            None => Utc.fix(),
        };
        Ok(Self { header, offset, tz })
    }
}

#[async_trait]
impl Block for NowBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .optional_string("offset", self.offset.as_deref())
            .finish()
    }

    async fn execute(&self, _plan: &mut PlanStorage, _storage: &mut BlockStorage) -> BlockResult {
        Ok(Flow::Continue(
            DateTimeSupport(Utc::now().with_timezone(&self.tz)).into_value(),
        ))
    }
}

/// Parses RFC 3339 by default. With a `format`, inputs without an offset are read as UTC.
#[derive(Debug)]
pub struct ParseBlock {
    header: BlockHeader,
    value: BlockNode,
    format: Option<String>,
}

impl FromTemplate for ParseBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            value: reader.block("value")?,
            format: format_field(reader, "format")?,
        })
    }
}

#[async_trait]
impl Block for ParseBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("value", &self.value)
            .optional_string("format", self.format.as_deref())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let raw: String = resolve_as!(key, "value", self.value, plan, storage);
        let parsed = match &self.format {
            None => DateTime::parse_from_rfc3339(&raw).ok(),
            Some(fmt) => DateTime::parse_from_str(&raw, fmt).ok().or_else(|| {
                NaiveDateTime::parse_from_str(&raw, fmt)
                    .ok()
                    .map(|naive| naive.and_utc().fixed_offset())
            }),
        };
        let parsed = parsed.ok_or_else(|| {
            key.invalid_argument("value", format!("`{raw}` is not a valid date-time"))
        })?;
        Ok(Flow::Continue(DateTimeSupport(parsed).into_value()))
    }
}

#[derive(Debug)]
pub struct FormatBlock {
    header: BlockHeader,
    datetime: BlockNode,
    format: Option<String>,
}

impl FromTemplate for FormatBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            datetime: reader.block("datetime")?,
            format: format_field(reader, "format")?,
        })
    }
}

#[async_trait]
impl Block for FormatBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("datetime", &self.datetime)
            .optional_string("format", self.format.as_deref())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let value = resolve!(self.datetime.run(plan, storage).await?);
        let DateTimeSupport(dt) = key.expect_handle("datetime", value)?;
        let Some(fmt) = &self.format else {
            return Ok(Flow::value(dt.to_rfc3339()));
        };
        let mut out = String::new();
        write!(out, "{}", dt.format(fmt))
            .map_err(|_| key.invalid_argument("format", format!("cannot render `{fmt}`")))?;
        Ok(Flow::value(out))
    }
}

/// Shifts a date-time by `amount` units. Month arithmetic clamps to the end of the month.
#[derive(Debug)]
pub struct ModifyBlock {
    header: BlockHeader,
    datetime: BlockNode,
    amount: BlockNode,
    unit: Unit,
}

impl FromTemplate for ModifyBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        Ok(Self {
            header,
            datetime: reader.block("datetime")?,
            amount: reader.block("amount")?,
            unit: unit_field(reader, "unit")?,
        })
    }
}

fn shift(dt: DateTime<FixedOffset>, amount: i64, unit: Unit) -> Option<DateTime<FixedOffset>> {
    let months = |n: i64| -> Option<DateTime<FixedOffset>> {
        let m = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
        if n >= 0 {
            dt.checked_add_months(m)
        } else {
            dt.checked_sub_months(m)
        }
    };
    match unit {
        Unit::Months => months(amount),
        Unit::Years => months(amount.checked_mul(12)?),
        other => {
            let secs = amount.checked_mul(other.seconds()?)?;
            dt.checked_add_signed(Duration::try_seconds(secs)?)
        }
    }
}

#[async_trait]
impl Block for ModifyBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("datetime", &self.datetime)
            .block("amount", &self.amount)
            .string("unit", self.unit.as_str())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let value = resolve!(self.datetime.run(plan, storage).await?);
        let DateTimeSupport(dt) = key.expect_handle("datetime", value)?;
        let amount: i64 = resolve_as!(key, "amount", self.amount, plan, storage);
        let shifted = shift(dt, amount, self.unit)
            .ok_or_else(|| key.invalid_argument("amount", format!("{amount} {} is out of range", self.unit.as_str())))?;
        Ok(Flow::Continue(DateTimeSupport(shifted).into_value()))
    }
}

/// Whole units elapsed from `from` to `to`, truncated toward zero. Negative when `to` is
/// earlier.
#[derive(Debug)]
pub struct DiffBlock {
    header: BlockHeader,
    from: BlockNode,
    to: BlockNode,
    unit: Unit,
}

impl FromTemplate for DiffBlock {
    fn from_template(header: BlockHeader, reader: &TemplateReader<'_>) -> Result<Self, BlockError> {
        let unit = unit_field(reader, "unit")?;
        if unit.seconds().is_none() {
            return Err(reader
                .key()
                .template_error(format!("diff does not support {}", unit.as_str())));
        }
        Ok(Self {
            header,
            from: reader.block("from")?,
            to: reader.block("to")?,
            unit,
        })
    }
}

#[async_trait]
impl Block for DiffBlock {
    fn header(&self) -> &BlockHeader {
        &self.header
    }

    fn template(&self) -> Map<String, JsonValue> {
        TemplateWriter::new()
            .block("from", &self.from)
            .block("to", &self.to)
            .string("unit", self.unit.as_str())
            .finish()
    }

    async fn execute(&self, plan: &mut PlanStorage, storage: &mut BlockStorage) -> BlockResult {
        let key = &self.header.key;
        let from = resolve!(self.from.run(plan, storage).await?);
        let DateTimeSupport(from) = key.expect_handle("from", from)?;
        let to = resolve!(self.to.run(plan, storage).await?);
        let DateTimeSupport(to) = key.expect_handle("to", to)?;
        let per_unit = self.unit.seconds().unwrap_or(1);
        Ok(Flow::value((to - from).num_seconds() / per_unit))
    }
}
