//! In-process format type registry and field conformance checks.
//!
//! # Responsibility
//! - Store user-defined format types keyed by unique name.
//! - Normalize the accepted field-list shapes into ordered field definitions.
//! - Validate node data against one format type with a single generic checker.
//!
//! # Invariants
//! - Registered names are trimmed, non-empty and unique.
//! - Re-creating an existing name is rejected; there is no implicit update.
//! - Field names are unique within one format type.

use crate::model::format::{scalar_text, FieldDef, FieldKind, FieldValue, FormatType};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by registry operations.
pub type FormatRegistryResult<T> = Result<T, FormatRegistryError>;

/// Validated data patch. `None` means the field is explicitly unset.
pub type FieldPatch = BTreeMap<String, Option<FieldValue>>;

/// Registry, field-spec and conformance errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatRegistryError {
    InvalidFormatName(String),
    DuplicateFormatType(String),
    UnknownFormatType(String),
    /// `fields` does not match any accepted shape.
    InvalidFieldSpec(String),
    DuplicateField(String),
    UnknownFieldKind { field: String, kind: String },
    UnknownField { format_type: String, field: String },
    FieldTypeMismatch {
        field: String,
        kind: FieldKind,
        value: String,
    },
}

impl Display for FormatRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormatName(value) => write!(f, "format type name is invalid: `{value}`"),
            Self::DuplicateFormatType(name) => write!(f, "format type already exists: {name}"),
            Self::UnknownFormatType(name) => write!(f, "unknown format type: {name}"),
            Self::InvalidFieldSpec(message) => write!(f, "invalid field list: {message}"),
            Self::DuplicateField(name) => write!(f, "field is declared twice: {name}"),
            Self::UnknownFieldKind { field, kind } => write!(
                f,
                "field `{field}` has unsupported kind `{kind}`; expected one of {}",
                supported_kind_names()
            ),
            Self::UnknownField { format_type, field } => {
                write!(f, "format type `{format_type}` has no field `{field}`")
            }
            Self::FieldTypeMismatch { field, kind, value } => write!(
                f,
                "value `{value}` for field `{field}` is not a valid {}",
                kind.as_str()
            ),
        }
    }
}

impl Error for FormatRegistryError {}

/// Runtime registry of format types.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<String, FormatType>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Returns one format type by name.
    pub fn get(&self, name: &str) -> Option<&FormatType> {
        self.formats.get(name.trim())
    }

    /// Returns one format type or `UnknownFormatType`.
    pub fn require(&self, name: &str) -> FormatRegistryResult<&FormatType> {
        self.get(name)
            .ok_or_else(|| FormatRegistryError::UnknownFormatType(name.trim().to_string()))
    }

    /// Returns all format types sorted by name.
    pub fn list(&self) -> Vec<&FormatType> {
        self.formats.values().collect()
    }

    /// Registers one format type from normalized field definitions.
    pub fn create_format_type(
        &mut self,
        name: &str,
        fields: Vec<FieldDef>,
    ) -> FormatRegistryResult<&FormatType> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(FormatRegistryError::InvalidFormatName(name));
        }
        if self.formats.contains_key(&name) {
            return Err(FormatRegistryError::DuplicateFormatType(name));
        }
        ensure_unique_fields(&fields)?;

        let format = FormatType {
            name: name.clone(),
            fields,
        };
        Ok(&*self.formats.entry(name).or_insert(format))
    }

    /// Registers one format type from a raw `fields` value.
    ///
    /// See [`normalize_fields`] for the accepted shapes.
    pub fn create_from_spec(
        &mut self,
        name: &str,
        fields: &Value,
    ) -> FormatRegistryResult<&FormatType> {
        let normalized = normalize_fields(fields)?;
        self.create_format_type(name, normalized)
    }

    /// Validates `data` against format type `format_name`.
    ///
    /// Every key must be declared by the format type and every non-null value
    /// must coerce into the declared kind. `null` values are kept as unset.
    pub fn validate_fields(
        &self,
        format_name: &str,
        data: &Map<String, Value>,
    ) -> FormatRegistryResult<FieldPatch> {
        let format = self.require(format_name)?;
        let mut patch = FieldPatch::new();
        for (name, value) in data {
            let field = format
                .field(name)
                .ok_or_else(|| FormatRegistryError::UnknownField {
                    format_type: format.name.clone(),
                    field: name.clone(),
                })?;
            if value.is_null() {
                patch.insert(name.clone(), None);
                continue;
            }
            let typed = field
                .kind
                .coerce(value)
                .ok_or_else(|| FormatRegistryError::FieldTypeMismatch {
                    field: name.clone(),
                    kind: field.kind,
                    value: render_value(value),
                })?;
            patch.insert(name.clone(), Some(typed));
        }
        Ok(patch)
    }
}

/// Validates data for a node without a format type.
///
/// Any key is allowed; values are stored as `Text`.
pub fn validate_untyped_fields(data: &Map<String, Value>) -> FormatRegistryResult<FieldPatch> {
    let mut patch = FieldPatch::new();
    for (name, value) in data {
        if name.trim().is_empty() {
            return Err(FormatRegistryError::InvalidFieldSpec(
                "field names must not be blank".to_string(),
            ));
        }
        if value.is_null() {
            patch.insert(name.clone(), None);
            continue;
        }
        let text = scalar_text(value).ok_or_else(|| FormatRegistryError::FieldTypeMismatch {
            field: name.clone(),
            kind: FieldKind::Text,
            value: render_value(value),
        })?;
        patch.insert(name.clone(), Some(FieldValue::Text(text)));
    }
    Ok(patch)
}

/// Normalizes the accepted `fields` shapes into ordered field definitions.
///
/// Accepted shapes:
/// - list of names: `["Name", "Email"]` (all `Text`)
/// - list of pairs: `[["Name", "Text"], {"name": "Age", "kind": "Number"}]`
/// - mapping of name to kind: `{"Name": "Text", "Age": "Number"}`
pub fn normalize_fields(fields: &Value) -> FormatRegistryResult<Vec<FieldDef>> {
    let normalized = match fields {
        Value::Array(items) => items
            .iter()
            .map(normalize_list_item)
            .collect::<FormatRegistryResult<Vec<_>>>()?,
        Value::Object(map) => map
            .iter()
            .map(|(name, kind)| match kind {
                Value::Null => field_def(name, None),
                Value::String(kind) => field_def(name, Some(kind)),
                other => Err(FormatRegistryError::UnknownFieldKind {
                    field: name.clone(),
                    kind: render_value(other),
                }),
            })
            .collect::<FormatRegistryResult<Vec<_>>>()?,
        other => {
            return Err(FormatRegistryError::InvalidFieldSpec(format!(
                "expected a list or a mapping, got {}",
                json_type_name(other)
            )));
        }
    };

    if normalized.is_empty() {
        return Err(FormatRegistryError::InvalidFieldSpec(
            "at least one field is required".to_string(),
        ));
    }
    ensure_unique_fields(&normalized)?;
    Ok(normalized)
}

fn normalize_list_item(item: &Value) -> FormatRegistryResult<FieldDef> {
    match item {
        Value::String(name) => field_def(name, None),
        Value::Array(pair) => match pair.as_slice() {
            [Value::String(name)] => field_def(name, None),
            [Value::String(name), Value::String(kind)] => field_def(name, Some(kind)),
            _ => Err(FormatRegistryError::InvalidFieldSpec(format!(
                "field pair must be [name, kind], got {}",
                render_value(item)
            ))),
        },
        Value::Object(map) => {
            let name = map.get("name").and_then(Value::as_str).ok_or_else(|| {
                FormatRegistryError::InvalidFieldSpec(format!(
                    "field object requires a string `name`, got {}",
                    render_value(item)
                ))
            })?;
            let kind = map
                .get("kind")
                .or_else(|| map.get("type"))
                .and_then(Value::as_str);
            field_def(name, kind)
        }
        other => Err(FormatRegistryError::InvalidFieldSpec(format!(
            "unsupported field entry {}",
            render_value(other)
        ))),
    }
}

fn field_def(name: &str, kind: Option<&str>) -> FormatRegistryResult<FieldDef> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormatRegistryError::InvalidFieldSpec(
            "field names must not be blank".to_string(),
        ));
    }
    let kind = match kind {
        None => FieldKind::Text,
        Some(raw) => FieldKind::parse(raw).ok_or_else(|| FormatRegistryError::UnknownFieldKind {
            field: name.to_string(),
            kind: raw.to_string(),
        })?,
    };
    Ok(FieldDef::new(name, kind))
}

fn ensure_unique_fields(fields: &[FieldDef]) -> FormatRegistryResult<()> {
    let mut seen = BTreeSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(FormatRegistryError::DuplicateField(field.name.clone()));
        }
    }
    Ok(())
}

fn supported_kind_names() -> String {
    FieldKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_fields, validate_untyped_fields, FormatRegistry, FormatRegistryError};
    use crate::model::format::{FieldDef, FieldKind, FieldValue};
    use serde_json::json;

    #[test]
    fn normalizes_all_three_field_shapes() {
        let names = normalize_fields(&json!(["Name", "Email"])).expect("names");
        assert_eq!(
            names,
            vec![
                FieldDef::new("Name", FieldKind::Text),
                FieldDef::new("Email", FieldKind::Text)
            ]
        );

        let pairs = normalize_fields(&json!([["Age", "Number"], {"name": "Due", "type": "Date"}]))
            .expect("pairs");
        assert_eq!(
            pairs,
            vec![
                FieldDef::new("Age", FieldKind::Number),
                FieldDef::new("Due", FieldKind::Date)
            ]
        );

        let mapping = normalize_fields(&json!({"Site": "url", "Done": "Boolean"})).expect("map");
        assert_eq!(
            mapping,
            vec![
                FieldDef::new("Site", FieldKind::Url),
                FieldDef::new("Done", FieldKind::Boolean)
            ]
        );
    }

    #[test]
    fn rejects_bad_field_specs() {
        assert!(matches!(
            normalize_fields(&json!("Name")),
            Err(FormatRegistryError::InvalidFieldSpec(_))
        ));
        assert!(matches!(
            normalize_fields(&json!([])),
            Err(FormatRegistryError::InvalidFieldSpec(_))
        ));
        assert_eq!(
            normalize_fields(&json!(["Name", "Name"])),
            Err(FormatRegistryError::DuplicateField("Name".to_string()))
        );
        assert!(matches!(
            normalize_fields(&json!({"Price": "Currency"})),
            Err(FormatRegistryError::UnknownFieldKind { .. })
        ));
    }

    #[test]
    fn duplicate_name_is_rejected_and_first_definition_kept() {
        let mut registry = FormatRegistry::new();
        registry
            .create_from_spec("Contact", &json!(["Name"]))
            .expect("first create");
        let err = registry
            .create_from_spec(" Contact ", &json!(["Other"]))
            .expect_err("duplicate must fail");
        assert_eq!(
            err,
            FormatRegistryError::DuplicateFormatType("Contact".to_string())
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("Contact").expect("kept").field_names(),
            vec!["Name"]
        );
    }

    #[test]
    fn validate_fields_checks_names_and_kinds() {
        let mut registry = FormatRegistry::new();
        registry
            .create_from_spec("Task", &json!({"Title": "Text", "Done": "Boolean"}))
            .expect("create");

        let patch = registry
            .validate_fields(
                "Task",
                json!({"Done": "yes", "Title": null}).as_object().unwrap(),
            )
            .expect("valid data");
        assert_eq!(patch["Done"], Some(FieldValue::Boolean(true)));
        assert_eq!(patch["Title"], None);

        let unknown = registry
            .validate_fields("Task", json!({"Owner": "x"}).as_object().unwrap())
            .expect_err("unknown field");
        assert!(matches!(unknown, FormatRegistryError::UnknownField { .. }));

        let mismatch = registry
            .validate_fields("Task", json!({"Done": "perhaps"}).as_object().unwrap())
            .expect_err("bad boolean");
        assert!(matches!(
            mismatch,
            FormatRegistryError::FieldTypeMismatch {
                kind: FieldKind::Boolean,
                ..
            }
        ));

        let missing_type = registry
            .validate_fields("Ghost", json!({}).as_object().unwrap())
            .expect_err("unknown type");
        assert_eq!(
            missing_type,
            FormatRegistryError::UnknownFormatType("Ghost".to_string())
        );
    }

    #[test]
    fn untyped_data_is_stored_as_text() {
        let patch = validate_untyped_fields(json!({"Note": 5}).as_object().unwrap())
            .expect("untyped data");
        assert_eq!(patch["Note"], Some(FieldValue::Text("5".to_string())));
        assert!(validate_untyped_fields(json!({"Note": [1]}).as_object().unwrap()).is_err());
    }
}
