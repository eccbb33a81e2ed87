//! Action parameter validation.
//!
//! # Responsibility
//! - Check one action's parameters for shape and completeness before any
//!   reference is resolved or any store is touched.
//! - Coerce loosely typed agent input (numbers as strings, boolean tokens)
//!   into the types handlers expect.
//!
//! # Invariants
//! - Unknown parameter keys are rejected, never ignored.
//! - A top-level `null` is treated as an omitted parameter.
//! - Every failure here is `InvalidParameter` except data conformance,
//!   which keeps the registry's error kinds.

use crate::action::request::ActionKind;
use crate::action::result::ActionError;
use crate::model::format::{parse_bool, scalar_text};
use crate::repo::format_registry::{validate_untyped_fields, FieldPatch, FormatRegistry};
use serde_json::{Map, Value};

type ParamResult<T> = Result<T, ActionError>;

/// Validated view over one action's parameter object.
pub struct Params<'a> {
    kind: ActionKind,
    values: Option<&'a Map<String, Value>>,
}

impl<'a> Params<'a> {
    /// Wraps `parameters` after checking its shape and key set.
    pub fn new(kind: ActionKind, parameters: &'a Value) -> ParamResult<Self> {
        let values = match parameters {
            Value::Null => None,
            Value::Object(map) => Some(map),
            other => {
                return Err(ActionError::invalid_parameter(format!(
                    "{} parameters must be an object, got {other}",
                    kind.as_str()
                )))
            }
        };

        if let Some(map) = values {
            let allowed = kind.parameter_names();
            if let Some(unknown) = map.keys().find(|key| !allowed.contains(&key.as_str())) {
                return Err(ActionError::invalid_parameter(format!(
                    "{} does not accept parameter `{unknown}`; expected one of [{}]",
                    kind.as_str(),
                    allowed.join(", ")
                )));
            }
        }
        Ok(Self { kind, values })
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.values
            .and_then(|map| map.get(name))
            .filter(|value| !value.is_null())
    }

    fn missing(&self, name: &str) -> ActionError {
        ActionError::invalid_parameter(format!(
            "{} requires parameter `{name}`",
            self.kind.as_str()
        ))
    }

    fn wrong_type(&self, name: &str, expected: &str, value: &Value) -> ActionError {
        ActionError::invalid_parameter(format!(
            "parameter `{name}` must be {expected}, got {value}"
        ))
    }

    /// Returns scalar text without trimming. Arrays and objects fail.
    pub fn optional_text(&self, name: &str) -> ParamResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => scalar_text(value)
                .map(Some)
                .ok_or_else(|| self.wrong_type(name, "a string", value)),
        }
    }

    /// Returns a trimmed, non-blank title.
    pub fn required_title(&self, name: &str) -> ParamResult<String> {
        self.optional_title(name)?
            .ok_or_else(|| self.missing(name))
    }

    /// Returns a trimmed title when present. A present but blank title fails.
    pub fn optional_title(&self, name: &str) -> ParamResult<Option<String>> {
        match self.optional_text(name)? {
            None => Ok(None),
            Some(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(ActionError::invalid_parameter(format!(
                        "parameter `{name}` cannot be blank"
                    )));
                }
                Ok(Some(trimmed.to_string()))
            }
        }
    }

    /// Returns a trimmed reference or name. Blank counts as omitted.
    pub fn optional_reference(&self, name: &str) -> ParamResult<Option<String>> {
        Ok(self
            .optional_text(name)?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    /// Parses a flag from a JSON boolean, a boolean token or `0`/`1`.
    pub fn optional_bool(&self, name: &str, default: bool) -> ParamResult<bool> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let parsed = match value {
            Value::Bool(flag) => Some(*flag),
            Value::String(text) => parse_bool(text),
            Value::Number(number) => match number.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        };
        parsed.ok_or_else(|| self.wrong_type(name, "a boolean", value))
    }

    /// Parses a child index. Negative values clamp to the first slot.
    pub fn optional_position(&self, name: &str) -> ParamResult<Option<usize>> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let index = integer(value).ok_or_else(|| self.wrong_type(name, "an integer", value))?;
        Ok(Some(usize::try_from(index.max(0)).unwrap_or(usize::MAX)))
    }

    /// Parses a depth in `0..=max_depth`.
    pub fn optional_depth(&self, name: &str, default: usize, max_depth: usize) -> ParamResult<usize> {
        let Some(value) = self.get(name) else {
            return Ok(default);
        };
        let depth = integer(value)
            .and_then(|depth| usize::try_from(depth).ok())
            .ok_or_else(|| self.wrong_type(name, "a non-negative integer", value))?;
        if depth > max_depth {
            return Err(ActionError::invalid_parameter(format!(
                "parameter `{name}` is {depth}, above the limit of {max_depth}"
            )));
        }
        Ok(depth)
    }

    /// Returns an object parameter when present.
    pub fn optional_object(&self, name: &str) -> ParamResult<Option<&'a Map<String, Value>>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(self.wrong_type(name, "an object", other)),
        }
    }

    /// Returns a raw parameter value or `InvalidParameter` when absent.
    pub fn required_value(&self, name: &str) -> ParamResult<&'a Value> {
        self.get(name).ok_or_else(|| self.missing(name))
    }
}

/// Validates node data for a typed or untyped node.
pub fn validate_data(
    registry: &FormatRegistry,
    format_type: Option<&str>,
    data: &Map<String, Value>,
) -> ParamResult<FieldPatch> {
    let patch = match format_type {
        Some(name) => registry.validate_fields(name, data)?,
        None => validate_untyped_fields(data)?,
    };
    Ok(patch)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0 && float.is_finite())
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}
