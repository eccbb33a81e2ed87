//! Format type schema model.
//!
//! # Responsibility
//! - Define the closed set of field kinds and their canonical text forms.
//! - Coerce caller-supplied JSON scalars into typed field values.
//!
//! # Invariants
//! - Field names are unique within one `FormatType`.
//! - `FieldValue::to_text()` re-coerces into an equal value of the same kind.
//! - Arrays and objects never coerce into any kind.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical pattern for `FieldKind::Date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical pattern for `FieldKind::Time`.
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// Canonical pattern for `FieldKind::DateTime`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TRUTHY_TOKENS: &[&str] = &["true", "yes", "y", "on", "1"];
const FALSY_TOKENS: &[&str] = &["false", "no", "n", "off", "0"];

static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").expect("valid decimal regex"));

/// Kind of one format type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Time,
    DateTime,
    Boolean,
    #[serde(rename = "URL")]
    Url,
    Picture,
    Math,
}

impl FieldKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [FieldKind; 9] = [
        FieldKind::Text,
        FieldKind::Number,
        FieldKind::Date,
        FieldKind::Time,
        FieldKind::DateTime,
        FieldKind::Boolean,
        FieldKind::Url,
        FieldKind::Picture,
        FieldKind::Math,
    ];

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::DateTime => "DateTime",
            Self::Boolean => "Boolean",
            Self::Url => "URL",
            Self::Picture => "Picture",
            Self::Math => "Math",
        }
    }

    /// Parses a kind name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(normalized))
    }

    /// Coerces one JSON value into this kind's typed representation.
    ///
    /// Returns `None` when the value cannot be represented. `null` is not
    /// handled here; callers treat it as "unset".
    pub fn coerce(self, value: &Value) -> Option<FieldValue> {
        match self {
            Self::Text => scalar_text(value).map(FieldValue::Text),
            Self::Math => scalar_text(value).map(FieldValue::Math),
            Self::Picture => scalar_text(value).map(FieldValue::Picture),
            Self::Url => {
                let text = scalar_text(value)?;
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
                    return None;
                }
                Some(FieldValue::Url(trimmed.to_string()))
            }
            Self::Number => coerce_number(value).map(FieldValue::Number),
            Self::Boolean => match value {
                Value::Bool(flag) => Some(FieldValue::Boolean(*flag)),
                other => parse_bool(&scalar_text(other)?).map(FieldValue::Boolean),
            },
            Self::Date => {
                let text = value.as_str()?;
                NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                    .ok()
                    .map(FieldValue::Date)
            }
            Self::Time => {
                let text = value.as_str()?;
                NaiveTime::parse_from_str(text.trim(), TIME_FORMAT)
                    .ok()
                    .map(FieldValue::Time)
            }
            Self::DateTime => {
                let text = value.as_str()?;
                NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
                    .ok()
                    .map(FieldValue::DateTime)
            }
        }
    }
}

/// Typed value stored in a node's data map.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Boolean(bool),
    Url(String),
    Picture(String),
    Math(String),
}

impl FieldValue {
    /// Kind this value was coerced into.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::Number(_) => FieldKind::Number,
            Self::Date(_) => FieldKind::Date,
            Self::Time(_) => FieldKind::Time,
            Self::DateTime(_) => FieldKind::DateTime,
            Self::Boolean(_) => FieldKind::Boolean,
            Self::Url(_) => FieldKind::Url,
            Self::Picture(_) => FieldKind::Picture,
            Self::Math(_) => FieldKind::Math,
        }
    }

    /// Canonical textual representation.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(value) | Self::Url(value) | Self::Picture(value) | Self::Math(value) => {
                value.clone()
            }
            Self::Number(value) => format!("{value}"),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Time(value) => value.format(TIME_FORMAT).to_string(),
            Self::DateTime(value) => value.format(DATETIME_FORMAT).to_string(),
            Self::Boolean(value) => value.to_string(),
        }
    }
}

/// One (name, kind) field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Named, user-defined record schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatType {
    /// Unique registry key.
    pub name: String,
    /// Ordered field definitions.
    pub fields: Vec<FieldDef>,
}

impl FormatType {
    /// Returns one field definition by exact name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

/// Renders a JSON scalar as text. Returns `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parses one boolean token from the fixed truthy/falsy vocabulary.
pub fn parse_bool(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    if TRUTHY_TOKENS.contains(&normalized.as_str()) {
        return Some(true);
    }
    if FALSY_TOKENS.contains(&normalized.as_str()) {
        return Some(false);
    }
    None
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let trimmed = text.trim();
            if !DECIMAL_RE.is_match(trimmed) {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}
