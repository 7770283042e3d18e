//! Form state handed back to clients for display or re-display

use std::collections::BTreeMap;

use std::borrow::Cow;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors};

/// Outcome of a submitted form: persisted, or rejected with field errors
#[derive(Debug)]
pub enum Submission<T> {
    Saved(T),
    Invalid(ValidationErrors),
}

impl<T> Submission<T> {
    pub fn is_saved(&self) -> bool {
        matches!(self, Submission::Saved(_))
    }
}

/// A form as the client should render it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormState {
    /// Editable fields, in display order
    pub fields: Vec<String>,
    /// Values pre-filled on an unbound form
    #[schema(value_type = Object)]
    pub initial: Value,
    /// Values submitted (or stored) for a bound form
    #[schema(value_type = Object)]
    pub data: Value,
    /// Messages keyed by field; `__all__` holds form-wide errors
    pub errors: BTreeMap<String, Vec<String>>,
}

impl FormState {
    /// Blank form with pre-filled values
    pub fn unbound(fields: &[&str], initial: Value) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            initial,
            data: Value::Object(Map::new()),
            errors: BTreeMap::new(),
        }
    }

    /// Form bound to existing values, without errors
    pub fn bound<T: Serialize>(fields: &[&str], data: &T) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            initial: Value::Object(Map::new()),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
            errors: BTreeMap::new(),
        }
    }

    /// Form bound to submitted values, carrying validation messages
    pub fn invalid<T: Serialize>(fields: &[&str], data: &T, errors: &ValidationErrors) -> Self {
        let mut state = Self::bound(fields, data);
        state.errors = error_messages(errors);
        state
    }
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Name of the field in a serde "missing field" error
fn missing_field(error: &serde_json::Error) -> Option<String> {
    let message = error.to_string();
    let rest = message.strip_prefix("missing field `")?;
    rest.split('`').next().map(str::to_string)
}

/// Read a submitted body into a form.
///
/// Values that cannot be read are reported against their field, the same
/// way rule violations are, so the caller can re-render the form. A missing
/// field is named by serde; otherwise a field is blamed when dropping it from
/// the submission clears the error.
pub fn bind<T: DeserializeOwned>(
    fields: &[&'static str],
    data: &Value,
) -> Result<T, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(submitted) = data.as_object() else {
        errors.add(
            "__all__",
            field_error("invalid", "Submitted form data must be an object"),
        );
        return Err(errors);
    };

    let error = match serde_json::from_value::<T>(data.clone()) {
        Ok(form) => return Ok(form),
        Err(e) => e,
    };

    if let Some(missing) = missing_field(&error) {
        if let Some(&field) = fields.iter().find(|f| **f == missing) {
            errors.add(field, field_error("required", "This field is required."));
            return Err(errors);
        }
    }

    for (&field, value) in fields
        .iter()
        .filter_map(|f| submitted.get(*f).map(|value| (f, value)))
    {
        let mut rest = submitted.clone();
        rest.remove(field);
        let cleared = match serde_json::from_value::<T>(Value::Object(rest)) {
            Ok(_) => true,
            Err(e) => missing_field(&e).as_deref() == Some(field),
        };
        if !cleared {
            continue;
        }
        let err = if value.is_null() {
            field_error("required", "This field is required.")
        } else {
            field_error("invalid", "Enter a valid value.")
        };
        errors.add(field, err);
    }

    if errors.is_empty() {
        errors.add("__all__", field_error("invalid", "Submitted form data is not valid"));
    }
    Err(errors)
}

/// Flatten validator errors into `field -> [message]`
pub fn error_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let key = field.to_string();
            let key = if key == "__all__" || key.is_empty() {
                "__all__".to_string()
            } else {
                key
            };
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (key, messages)
        })
        .collect()
}
