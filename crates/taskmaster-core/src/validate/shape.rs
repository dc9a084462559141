//! Structural checks over untyped JSON objects.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use super::{ROOT_PATH, ValidationErrors, ValidationResult};
use crate::schema::{
    DESCRIPTION_MAX_LENGTH, SchemaEnum, TITLE_MAX_LENGTH, TITLE_MIN_LENGTH, messages,
};

/// How a key may appear in the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Presence {
    /// Must be present and non-null.
    Required,
    /// May be absent; `null` is rejected.
    Optional,
    /// Must be present; `null` is accepted.
    Nullable,
}

/// Outcome of a single field check: a normalized value, or `None` to treat the
/// field as unset.
pub(super) type Check = Result<Option<Value>, String>;

/// Accumulates errors and the normalized object for one validation pass.
pub(super) struct Shape<'a> {
    object: Option<&'a Map<String, Value>>,
    known: Vec<&'static str>,
    normalized: Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Shape<'a> {
    pub(super) fn new(raw: &'a Value) -> Self {
        let mut errors = Vec::new();
        let object = raw.as_object();
        if object.is_none() {
            errors.push(format!("{ROOT_PATH}: Expected object, received {}", kind_of(raw)));
        }
        Self {
            object,
            known: Vec::new(),
            normalized: Map::new(),
            errors,
        }
    }

    /// Check one key, recording either its normalized value or an error.
    pub(super) fn field(
        &mut self,
        key: &'static str,
        presence: Presence,
        check: impl FnOnce(&Value) -> Check,
    ) -> &mut Self {
        self.known.push(key);
        let Some(object) = self.object else {
            return self;
        };

        match (object.get(key), presence) {
            (None, Presence::Optional) => {}
            (None, Presence::Required | Presence::Nullable) => {
                self.errors.push(format!("{key}: Required"));
            }
            (Some(Value::Null), Presence::Nullable) => {
                self.normalized.insert(key.to_owned(), Value::Null);
            }
            (Some(Value::Null), Presence::Required | Presence::Optional) => {
                self.errors
                    .push(format!("{key}: Expected a value, received null"));
            }
            (Some(value), _) => match check(value) {
                Ok(Some(normalized)) => {
                    self.normalized.insert(key.to_owned(), normalized);
                }
                Ok(None) if presence == Presence::Nullable => {
                    self.normalized.insert(key.to_owned(), Value::Null);
                }
                Ok(None) => {}
                Err(message) => self.errors.push(format!("{key}: {message}")),
            },
        }
        self
    }

    /// Fill `key` with `value` when the input left it out.
    pub(super) fn default_value(&mut self, key: &'static str, value: Value) -> &mut Self {
        if self.object.is_some_and(|object| !object.contains_key(key)) {
            self.normalized.insert(key.to_owned(), value);
        }
        self
    }

    /// Reject unknown keys and build the typed value.
    pub(super) fn finish<T: DeserializeOwned>(self) -> ValidationResult<T> {
        let Self {
            object,
            known,
            normalized,
            mut errors,
        } = self;

        if let Some(object) = object {
            let unknown: Vec<String> = object
                .keys()
                .filter(|key| !known.contains(&key.as_str()))
                .map(|key| format!("'{key}'"))
                .collect();
            if !unknown.is_empty() {
                errors.push(format!(
                    "{ROOT_PATH}: Unrecognized key(s) in object: {}",
                    unknown.join(", ")
                ));
            }
        }

        ValidationErrors::check(errors)?;
        serde_json::from_value(Value::Object(normalized))
            .map_err(|err| ValidationErrors::single(format!("{ROOT_PATH}: {err}")))
    }
}

pub(super) fn title(value: &Value) -> Check {
    let trimmed = string(value)?.trim();
    let len = trimmed.chars().count();
    if len < TITLE_MIN_LENGTH {
        return Err(messages::title_too_short());
    }
    if len > TITLE_MAX_LENGTH {
        return Err(messages::title_too_long());
    }
    Ok(Some(Value::String(trimmed.to_owned())))
}

pub(super) fn description(value: &Value) -> Check {
    let trimmed = string(value)?.trim();
    if trimmed.chars().count() > DESCRIPTION_MAX_LENGTH {
        return Err(messages::description_too_long());
    }
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::String(trimmed.to_owned())))
}

pub(super) fn boolean(value: &Value) -> Check {
    match value {
        Value::Bool(_) => Ok(Some(value.clone())),
        other => Err(expected("boolean", other)),
    }
}

pub(super) fn timestamp(value: &Value) -> Check {
    let trimmed = string(value)?.trim();
    parse_timestamp(trimmed)
        .map(|_| Some(Value::String(trimmed.to_owned())))
        .ok_or_else(|| "Must be a valid ISO 8601 datetime string".to_owned())
}

pub(super) fn positive_id(value: &Value) -> Check {
    let Value::Number(number) = value else {
        return Err(expected("number", value));
    };
    match number.as_u64() {
        Some(0) => Err("Number must be greater than 0".to_owned()),
        Some(_) => Ok(Some(value.clone())),
        None if number.as_i64().is_some() => Err("Number must be greater than 0".to_owned()),
        None => Err("Expected integer, received float".to_owned()),
    }
}

pub(super) fn uuid(value: &Value) -> Check {
    let raw = string(value)?;
    Uuid::parse_str(raw)
        .map(|_| Some(value.clone()))
        .map_err(|_| "Must be a valid UUID".to_owned())
}

pub(super) fn one_of<T: SchemaEnum>(value: &Value) -> Check {
    let raw = string(value)?;
    if T::contains(raw) {
        Ok(Some(value.clone()))
    } else {
        Err(messages::one_of::<T>())
    }
}

/// Lenient RFC 3339 parse shared with raw business-rule extraction.
pub(super) fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

fn string(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| expected("string", value))
}

fn expected(kind: &str, value: &Value) -> String {
    format!("Expected {kind}, received {}", kind_of(value))
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
