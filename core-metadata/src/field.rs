//! Metadata fields
//!
//! A [`MetadataField`] describes one editable property of a catalog: how it
//! is read from the catalog (`input_id`), how it is exposed as JSON
//! (`output_id`), its type and its current value.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::str::FromStr;
use tracing::warn;

use crate::error::{MetadataError, Result};
use crate::period::decode_date;

const DEFAULT_DATE_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const DEFAULT_TIME_PATTERN: &str = "%H:%M";

// =============================================================================
// Types
// =============================================================================

/// How a field's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetadataFieldType {
    Boolean,
    Date,
    Duration,
    IterableText,
    MixedText,
    OrderedText,
    Long,
    StartDate,
    StartTime,
    Text,
    TextLong,
}

impl MetadataFieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataFieldType::Boolean => "BOOLEAN",
            MetadataFieldType::Date => "DATE",
            MetadataFieldType::Duration => "DURATION",
            MetadataFieldType::IterableText => "ITERABLE_TEXT",
            MetadataFieldType::MixedText => "MIXED_TEXT",
            MetadataFieldType::OrderedText => "ORDERED_TEXT",
            MetadataFieldType::Long => "LONG",
            MetadataFieldType::StartDate => "START_DATE",
            MetadataFieldType::StartTime => "START_TIME",
            MetadataFieldType::Text => "TEXT",
            MetadataFieldType::TextLong => "TEXT_LONG",
        }
    }

    /// JSON presentation used for this field type.
    pub fn json_type(&self) -> JsonType {
        match self {
            MetadataFieldType::Boolean => JsonType::Boolean,
            MetadataFieldType::Date | MetadataFieldType::StartDate => JsonType::Date,
            MetadataFieldType::StartTime => JsonType::Time,
            MetadataFieldType::Long => JsonType::Number,
            MetadataFieldType::MixedText => JsonType::MixedText,
            MetadataFieldType::OrderedText => JsonType::OrderedText,
            MetadataFieldType::TextLong => JsonType::TextLong,
            MetadataFieldType::Duration
            | MetadataFieldType::IterableText
            | MetadataFieldType::Text => JsonType::Text,
        }
    }

    /// Whether the value holds several texts.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            MetadataFieldType::IterableText | MetadataFieldType::MixedText
        )
    }

    /// Whether the value is part of the temporal period.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            MetadataFieldType::StartDate | MetadataFieldType::StartTime | MetadataFieldType::Duration
        )
    }
}

impl fmt::Display for MetadataFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataFieldType {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        [
            MetadataFieldType::Boolean,
            MetadataFieldType::Date,
            MetadataFieldType::Duration,
            MetadataFieldType::IterableText,
            MetadataFieldType::MixedText,
            MetadataFieldType::OrderedText,
            MetadataFieldType::Long,
            MetadataFieldType::StartDate,
            MetadataFieldType::StartTime,
            MetadataFieldType::Text,
            MetadataFieldType::TextLong,
        ]
        .into_iter()
        .find(|t| t.as_str() == normalized)
        .ok_or_else(|| MetadataError::Configuration(format!("Unknown field type: {}", s)))
    }
}

/// Type name shown to JSON clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonType {
    Boolean,
    Date,
    MixedText,
    OrderedText,
    Number,
    Text,
    TextLong,
    Time,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Boolean => "boolean",
            JsonType::Date => "date",
            JsonType::MixedText => "mixed_text",
            JsonType::OrderedText => "ordered_text",
            JsonType::Number => "number",
            JsonType::Text => "text",
            JsonType::TextLong => "text_long",
            JsonType::Time => "time",
        }
    }
}

/// Value of a field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Boolean(bool),
    Date(DateTime<Utc>),
    /// Milliseconds
    Duration(u64),
    Long(i64),
    Text(String),
    TextList(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::TextList(texts) => texts.iter().all(|t| t.trim().is_empty()),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            FieldValue::Date(date) => Some(date),
            _ => None,
        }
    }
}

// =============================================================================
// Field
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataField {
    input_id: String,
    output_id: Option<String>,
    label: String,
    field_type: MetadataFieldType,
    value: FieldValue,
    read_only: bool,
    required: bool,
    translatable: bool,
    collection: Option<BTreeMap<String, String>>,
    collection_id: Option<String>,
    pattern: Option<String>,
    delimiter: Option<String>,
    order: Option<i32>,
    namespace: Option<String>,
    updated: bool,
}

impl MetadataField {
    pub fn new(
        input_id: impl Into<String>,
        label: impl Into<String>,
        field_type: MetadataFieldType,
    ) -> Self {
        Self {
            input_id: input_id.into(),
            output_id: None,
            label: label.into(),
            field_type,
            value: FieldValue::Empty,
            read_only: false,
            required: false,
            translatable: false,
            collection: None,
            collection_id: None,
            pattern: None,
            delimiter: None,
            order: None,
            namespace: None,
            updated: false,
        }
    }

    pub fn boolean(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::Boolean)
    }

    pub fn date(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::Date)
    }

    pub fn duration(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::Duration)
    }

    pub fn iterable_text(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::IterableText)
    }

    pub fn mixed_text(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::MixedText)
    }

    pub fn ordered_text(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::OrderedText)
    }

    pub fn long(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::Long)
    }

    pub fn start_date(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::StartDate)
    }

    pub fn start_time(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::StartTime)
    }

    pub fn text(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::Text)
    }

    pub fn text_long(input_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(input_id, label, MetadataFieldType::TextLong)
    }

    /// Builds a field from `property.<name>.<key>` style settings, where
    /// `settings` holds the `<key> -> <value>` part. `type` and `label` are
    /// required; input and output id default to `name`.
    pub fn from_config(name: &str, settings: &BTreeMap<String, String>) -> Result<Self> {
        let field_type: MetadataFieldType = settings
            .get("type")
            .ok_or_else(|| {
                MetadataError::Configuration(format!("Property '{}' has no type", name))
            })?
            .parse()?;
        let label = settings.get("label").ok_or_else(|| {
            MetadataError::Configuration(format!("Property '{}' has no label", name))
        })?;

        let mut field = Self::new(name, label.trim(), field_type).with_output_id(name);
        for (key, value) in settings {
            if key != "type" && key != "label" {
                field.apply_config(key, value)?;
            }
        }
        Ok(field)
    }

    /// Applies one configuration setting.
    pub fn apply_config(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let flag = || -> Result<bool> {
            value.parse::<bool>().map_err(|_| {
                MetadataError::Configuration(format!("'{}' of {} is not a boolean", value, key))
            })
        };
        match key {
            "inputID" => self.input_id = value.to_string(),
            "outputID" => self.output_id = Some(value.to_string()),
            "label" => self.label = value.to_string(),
            "type" => {
                self.field_type = value.parse()?;
            }
            "readOnly" => self.read_only = flag()?,
            "required" => self.required = flag()?,
            "translatable" => self.translatable = flag()?,
            "collectionID" | "listprovider" => self.collection_id = Some(value.to_string()),
            "pattern" => {
                if StrftimeItems::new(value).any(|item| matches!(item, Item::Error)) {
                    return Err(MetadataError::Configuration(format!(
                        "Invalid date pattern: {}",
                        value
                    )));
                }
                self.pattern = Some(value.to_string())
            }
            "delimiter" => self.delimiter = Some(value.to_string()),
            "namespace" => self.namespace = Some(value.to_string()),
            "order" => {
                self.order = Some(value.parse().map_err(|_| {
                    MetadataError::Configuration(format!("Order '{}' is not a number", value))
                })?)
            }
            other => warn!(field = %self.input_id, key = other, "Ignoring unknown field setting"),
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    pub fn with_output_id(mut self, output_id: impl Into<String>) -> Self {
        self.output_id = Some(output_id.into());
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_translatable(mut self, translatable: bool) -> Self {
        self.translatable = translatable;
        self
    }

    pub fn with_collection(mut self, collection: BTreeMap<String, String>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn with_collection_id(mut self, collection_id: impl Into<String>) -> Self {
        self.collection_id = Some(collection_id.into());
        self
    }

    /// chrono format string used for date values in JSON.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Loads a value without marking the field as updated.
    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = value;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    /// JSON id; the input id unless configured otherwise.
    pub fn output_id(&self) -> &str {
        self.output_id.as_deref().unwrap_or(&self.input_id)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn field_type(&self) -> MetadataFieldType {
        self.field_type
    }

    pub fn json_type(&self) -> JsonType {
        self.field_type.json_type()
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_translatable(&self) -> bool {
        self.translatable
    }

    pub fn collection(&self) -> Option<&BTreeMap<String, String>> {
        self.collection.as_ref()
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    pub fn order(&self) -> Option<i32> {
        self.order
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn set_updated(&mut self, updated: bool) {
        self.updated = updated;
    }

    /// Sets a new value and marks the field as updated.
    pub fn set_value(&mut self, value: FieldValue) -> Result<()> {
        let value = self.coerce(value)?;
        self.value = value;
        self.updated = true;
        Ok(())
    }

    fn coerce(&self, value: FieldValue) -> Result<FieldValue> {
        use MetadataFieldType as T;
        let accepted = match (&self.field_type, value) {
            (_, FieldValue::Empty) => FieldValue::Empty,
            (T::Boolean, v @ FieldValue::Boolean(_)) => v,
            (T::Date | T::StartDate | T::StartTime, v @ FieldValue::Date(_)) => v,
            (T::Duration, v @ FieldValue::Duration(_)) => v,
            (T::Long, v @ FieldValue::Long(_)) => v,
            (T::Text | T::TextLong | T::OrderedText, v @ FieldValue::Text(_)) => v,
            (T::IterableText | T::MixedText, v @ FieldValue::TextList(_)) => v,
            (T::IterableText | T::MixedText, FieldValue::Text(text)) => FieldValue::TextList(vec![text]),
            (field_type, other) => {
                return Err(self.invalid(format!("{:?} is not a {} value", other, field_type)))
            }
        };
        Ok(accepted)
    }

    fn invalid(&self, message: impl Into<String>) -> MetadataError {
        MetadataError::InvalidValue {
            field: self.output_id().to_string(),
            message: message.into(),
        }
    }

    // -------------------------------------------------------------------------
    // JSON
    // -------------------------------------------------------------------------

    fn date_pattern(&self) -> &str {
        match (&self.pattern, self.field_type) {
            (Some(pattern), _) => pattern,
            (None, MetadataFieldType::StartTime) => DEFAULT_TIME_PATTERN,
            (None, _) => DEFAULT_DATE_PATTERN,
        }
    }

    fn json_value(&self) -> Result<Value> {
        let value = match &self.value {
            FieldValue::Empty if self.field_type.is_list() => json!([]),
            FieldValue::Empty => json!(""),
            FieldValue::Boolean(b) => json!(b),
            FieldValue::Date(date) => {
                let mut formatted = String::new();
                write!(formatted, "{}", date.format(self.date_pattern())).map_err(|_| {
                    self.invalid(format!("Cannot format date with pattern '{}'", self.date_pattern()))
                })?;
                json!(formatted)
            }
            FieldValue::Duration(ms) => json!(format_duration(*ms)),
            FieldValue::Long(n) => json!(n),
            FieldValue::Text(text) => json!(text),
            FieldValue::TextList(texts) => json!(texts),
        };
        Ok(value)
    }

    /// JSON projection of the field.
    ///
    /// # Errors
    ///
    /// Fails when a date value cannot be rendered with the field's pattern.
    pub fn to_json(&self) -> Result<Value> {
        let mut object = Map::new();
        object.insert("id".to_string(), json!(self.output_id()));
        object.insert("label".to_string(), json!(self.label));
        object.insert("type".to_string(), json!(self.json_type().as_str()));
        object.insert("value".to_string(), self.json_value()?);
        object.insert("readOnly".to_string(), json!(self.read_only));
        object.insert("required".to_string(), json!(self.required));
        object.insert("translatable".to_string(), json!(self.translatable));
        if let Some(collection) = &self.collection {
            object.insert("collection".to_string(), json!(collection));
        }
        if let Some(delimiter) = &self.delimiter {
            object.insert("delimiter".to_string(), json!(delimiter));
        }
        Ok(Value::Object(object))
    }

    /// Reads a JSON value into the field, marking it as updated.
    pub fn from_json(&mut self, value: &Value) -> Result<()> {
        let parsed = self.parse_json_value(value)?;
        self.set_value(parsed)
    }

    fn parse_json_value(&self, value: &Value) -> Result<FieldValue> {
        use MetadataFieldType as T;

        if value.is_null() {
            return Ok(FieldValue::Empty);
        }
        if let Value::String(s) = value {
            if s.trim().is_empty() && !matches!(self.field_type, T::Text | T::TextLong) {
                return Ok(FieldValue::Empty);
            }
        }

        match self.field_type {
            T::Boolean => match value {
                Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(FieldValue::Boolean)
                    .map_err(|_| self.invalid(format!("'{}' is not a boolean", s))),
                other => Err(self.invalid(format!("{} is not a boolean", other))),
            },
            T::Date | T::StartDate => {
                let s = self.expect_string(value)?;
                self.parse_date(s).map(FieldValue::Date)
            }
            T::StartTime => {
                let s = self.expect_string(value)?;
                let time = NaiveTime::parse_from_str(s.trim(), self.date_pattern())
                    .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
                    .map_err(|_| self.invalid(format!("'{}' is not a time", s)))?;
                let day = self
                    .value
                    .as_date()
                    .map(|d| d.date_naive())
                    .unwrap_or_else(|| Utc::now().date_naive());
                Ok(FieldValue::Date(Utc.from_utc_datetime(&day.and_time(time))))
            }
            T::Duration => match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(FieldValue::Duration)
                    .ok_or_else(|| self.invalid(format!("{} is not a duration", n))),
                Value::String(s) => parse_duration(s)
                    .map(FieldValue::Duration)
                    .ok_or_else(|| self.invalid(format!("'{}' is not a duration", s))),
                other => Err(self.invalid(format!("{} is not a duration", other))),
            },
            T::Long => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(FieldValue::Long)
                    .ok_or_else(|| self.invalid(format!("{} is not an integer", n))),
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(FieldValue::Long)
                    .map_err(|_| self.invalid(format!("'{}' is not an integer", s))),
                other => Err(self.invalid(format!("{} is not an integer", other))),
            },
            T::Text | T::TextLong | T::OrderedText => match value {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
                Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
                other => Err(self.invalid(format!("{} is not a text", other))),
            },
            T::IterableText | T::MixedText => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(s.clone()),
                        other => Err(self.invalid(format!("{} is not a text", other))),
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(FieldValue::TextList),
                Value::String(s) => Ok(FieldValue::TextList(self.split(s))),
                other => Err(self.invalid(format!("{} is not a list of texts", other))),
            },
        }
    }

    fn expect_string<'a>(&self, value: &'a Value) -> Result<&'a str> {
        value
            .as_str()
            .ok_or_else(|| self.invalid(format!("{} is not a string", value)))
    }

    fn parse_date(&self, s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(s) {
            return Ok(date.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDateTime::parse_from_str(s, self.date_pattern()) {
            return Ok(Utc.from_utc_datetime(&date));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(s, self.date_pattern())
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
        {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
        decode_date(s).map_err(|_| self.invalid(format!("'{}' is not a date", s)))
    }

    fn split(&self, s: &str) -> Vec<String> {
        match &self.delimiter {
            Some(delimiter) => s
                .split(delimiter.as_str())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![s.to_string()],
        }
    }
}

/// `HH:MM:SS`
fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// `HH:MM:SS`, `MM:SS` or plain milliseconds
fn parse_duration(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Some(ms);
    }
    let parts: Vec<u64> = s
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let seconds = match parts.as_slice() {
        [h, m, s] => h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(*s)?,
        [m, s] => m.checked_mul(60)?.checked_add(*s)?,
        _ => return None,
    };
    seconds.checked_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_field_type_parsing() {
        assert_eq!("start_date".parse::<MetadataFieldType>().unwrap(), MetadataFieldType::StartDate);
        assert_eq!("TEXT_LONG".parse::<MetadataFieldType>().unwrap(), MetadataFieldType::TextLong);
        assert!("colour".parse::<MetadataFieldType>().is_err());
        assert_eq!(MetadataFieldType::Long.json_type(), JsonType::Number);
    }

    #[test]
    fn test_from_config() {
        let field = MetadataField::from_config(
            "title",
            &settings(&[
                ("type", "TEXT"),
                ("label", "EVENTS.TITLE"),
                ("outputID", "eventTitle"),
                ("required", "true"),
                ("order", "2"),
            ]),
        )
        .unwrap();

        assert_eq!(field.input_id(), "title");
        assert_eq!(field.output_id(), "eventTitle");
        assert_eq!(field.label(), "EVENTS.TITLE");
        assert!(field.is_required());
        assert_eq!(field.order(), Some(2));
    }

    #[test]
    fn test_from_config_requires_type_and_label() {
        assert!(MetadataField::from_config("title", &settings(&[("label", "x")])).is_err());
        assert!(MetadataField::from_config("title", &settings(&[("type", "TEXT")])).is_err());
        assert!(MetadataField::from_config(
            "title",
            &settings(&[("type", "TEXT"), ("label", "x"), ("readOnly", "maybe")])
        )
        .is_err());
    }

    #[test]
    fn test_set_value_checks_type() {
        let mut field = MetadataField::long("count", "Count");
        assert!(field.set_value(FieldValue::Text("1".to_string())).is_err());
        assert!(!field.is_updated());

        field.set_value(FieldValue::Long(3)).unwrap();
        assert!(field.is_updated());
        assert_eq!(field.value(), &FieldValue::Long(3));

        let mut subjects = MetadataField::iterable_text("subject", "Subjects");
        subjects.set_value(FieldValue::Text("rust".to_string())).unwrap();
        assert_eq!(subjects.value(), &FieldValue::TextList(vec!["rust".to_string()]));
    }

    #[test]
    fn test_to_json() {
        let field = MetadataField::text("title", "Title")
            .with_output_id("title")
            .with_required(true)
            .with_value(FieldValue::Text("Lecture".to_string()));
        let json = field.to_json().unwrap();

        assert_eq!(json["id"], "title");
        assert_eq!(json["type"], "text");
        assert_eq!(json["value"], "Lecture");
        assert_eq!(json["required"], true);
        assert!(!field.is_updated());

        let empty_list = MetadataField::mixed_text("creator", "Creators").to_json().unwrap();
        assert_eq!(empty_list["value"], json!([]));
        assert_eq!(empty_list["type"], "mixed_text");
    }

    #[test]
    fn test_json_date_and_time() {
        let mut field = MetadataField::start_date("temporal", "Start");
        field.from_json(&json!("2024-03-01T10:15:00.000Z")).unwrap();
        let start = *field.value().as_date().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap());
        assert_eq!(field.to_json().unwrap()["value"], "2024-03-01T10:15:00.000Z");

        let mut time = MetadataField::start_time("temporal", "Time")
            .with_value(FieldValue::Date(start));
        time.from_json(&json!("14:30")).unwrap();
        assert_eq!(
            time.value(),
            &FieldValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap())
        );
        assert_eq!(time.to_json().unwrap()["value"], "14:30");
    }

    #[test]
    fn test_json_duration_and_lists() {
        let mut duration = MetadataField::duration("temporal", "Duration");
        duration.from_json(&json!("01:30:00")).unwrap();
        assert_eq!(duration.value(), &FieldValue::Duration(5_400_000));
        assert_eq!(duration.to_json().unwrap()["value"], "01:30:00");

        let mut creators = MetadataField::mixed_text("creator", "Creators").with_delimiter(";");
        creators.from_json(&json!("Ada; Grace")).unwrap();
        assert_eq!(
            creators.value(),
            &FieldValue::TextList(vec!["Ada".to_string(), "Grace".to_string()])
        );
        creators.from_json(&json!(["Linus"])).unwrap();
        assert_eq!(creators.value(), &FieldValue::TextList(vec!["Linus".to_string()]));

        assert!(creators.from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_duration_overflow_is_invalid() {
        let mut duration = MetadataField::duration("temporal", "Duration");
        assert!(matches!(
            duration.from_json(&json!("9999999999999999:00:00")),
            Err(MetadataError::InvalidValue { .. })
        ));
        assert!(duration.from_json(&json!("18446744073709551615:00")).is_err());
        assert_eq!(duration.value(), &FieldValue::Empty);
        assert!(!duration.is_updated());
    }

    #[test]
    fn test_unrenderable_date_pattern_is_an_error() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        let field = MetadataField::date("created", "Created")
            .with_pattern("%Q")
            .with_value(FieldValue::Date(start));
        assert!(matches!(field.to_json(), Err(MetadataError::InvalidValue { .. })));
    }

    #[test]
    fn test_json_empty_values() {
        let mut date = MetadataField::date("created", "Created");
        date.from_json(&json!("")).unwrap();
        assert!(date.value().is_empty());
        assert!(date.is_updated());

        let mut flag = MetadataField::boolean("hidden", "Hidden");
        flag.from_json(&json!("true")).unwrap();
        assert_eq!(flag.value(), &FieldValue::Boolean(true));
        assert!(flag.from_json(&json!(5)).is_err());
    }
}
