//! Forms generated from model descriptions
//!
//! A [`Form`] is a plain ordered collection of [`FormField`]s. Forms are
//! assembled explicitly, usually by [`model_form`] from a [`ModelSchema`], and
//! can process submitted values, render stored values back into inputs and
//! render themselves as HTML.
//!
//! # Example
//! ```rust,ignore
//! let contact = ModelSchema::new("Contact")
//!     .property(Property::new("name", PropertyKind::String).required())
//!     .property(Property::new("age", PropertyKind::Integer));
//!
//! let form = ModelFormBuilder::new(contact).only(["age"]).build()?;
//! assert_eq!(form.name(), "ContactForm");
//! ```

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

pub mod builder;
pub mod converter;
pub mod model;
pub mod validators;

pub use builder::{model_form, ModelFormBuilder};
pub use converter::{ConvertFn, ModelConverter};
pub use model::{DataModel, ModelSchema, Property, PropertyKind};
pub use validators::Validator;

/// Input widget and value type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    TextArea,
    Integer,
    Boolean,
    /// Date and/or time parsed with a `chrono` format string
    DateTime { format: String },
    /// `(value, label)` pairs
    Select { choices: Vec<(String, String)> },
    File,
    /// One item per line in a textarea
    StringList,
}

/// Constructor arguments shared by every field kind
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArgs {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub validators: Vec<Validator>,
}

impl FieldArgs {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            description: None,
            default: None,
            validators: Vec::new(),
        }
    }

    /// Replace the arguments the caller provided
    pub fn apply(&mut self, overrides: &FieldOverrides) {
        if let Some(label) = &overrides.label {
            self.label = label.clone();
        }
        if let Some(description) = &overrides.description {
            self.description = Some(description.clone());
        }
        if let Some(default) = &overrides.default {
            self.default = Some(default.clone());
        }
        if let Some(validators) = &overrides.validators {
            self.validators = validators.clone();
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn into_field(self, kind: FieldKind) -> FormField {
        FormField {
            name: self.name,
            label: self.label,
            description: self.description,
            kind,
            validators: self.validators,
            default: self.default,
        }
    }
}

/// Caller-supplied field arguments, keyed by property name in [`model_form`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOverrides {
    pub label: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    /// Replaces the validator list; `Required` is still added for required properties
    pub validators: Option<Vec<Validator>>,
}

impl FieldOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validators(mut self, validators: Vec<Validator>) -> Self {
        self.validators = Some(validators);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: FieldKind,
    pub validators: Vec<Validator>,
    pub default: Option<Value>,
}

impl FormField {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        FieldArgs::new(name).into_field(kind)
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn is_required(&self) -> bool {
        self.validators.iter().any(Validator::is_required)
    }

    /// Validate and coerce one submitted value
    fn process(&self, raw: Option<&str>) -> std::result::Result<Value, Vec<String>> {
        let messages: Vec<String> = self
            .validators
            .iter()
            .filter_map(|v| v.validate(raw).err())
            .collect();
        if !messages.is_empty() {
            return Err(messages);
        }

        let raw = raw.unwrap_or_default();
        let trimmed = raw.trim();

        let value = match &self.kind {
            FieldKind::Text | FieldKind::TextArea | FieldKind::File => {
                Value::String(raw.to_string())
            }
            FieldKind::Boolean => Value::Bool(!matches!(
                trimmed.to_lowercase().as_str(),
                "" | "false" | "0" | "off" | "no"
            )),
            FieldKind::Integer if trimmed.is_empty() => Value::Null,
            FieldKind::Integer => match trimmed.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => return Err(vec!["Not a valid integer value".to_string()]),
            },
            FieldKind::DateTime { .. } if trimmed.is_empty() => Value::Null,
            FieldKind::DateTime { format } => {
                if !parses_with_format(trimmed, format) {
                    return Err(vec!["Not a valid datetime value".to_string()]);
                }
                Value::String(trimmed.to_string())
            }
            FieldKind::Select { .. } if trimmed.is_empty() => Value::Null,
            FieldKind::Select { choices } => {
                if !choices.iter().any(|(value, _)| value == trimmed) {
                    return Err(vec!["Not a valid choice".to_string()]);
                }
                Value::String(trimmed.to_string())
            }
            FieldKind::StringList => Value::Array(
                raw.lines()
                    .map(|line| Value::String(line.to_string()))
                    .collect(),
            ),
        };

        Ok(value)
    }

    /// Render a stored value as a form input value
    fn display_value(&self, value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) if self.kind == FieldKind::StringList => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            other => Some(other.to_string()),
        }
    }
}

/// True when `raw` parses as a datetime, a date or a time under `format`
fn parses_with_format(raw: &str, format: &str) -> bool {
    chrono::NaiveDateTime::parse_from_str(raw, format).is_ok()
        || chrono::NaiveDate::parse_from_str(raw, format).is_ok()
        || chrono::NaiveTime::parse_from_str(raw, format).is_ok()
}

/// Validation messages per field, in field order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    errors: IndexMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for FormErrors {}

/// Ordered set of fields with a name
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    name: String,
    fields: IndexMap<String, FormField>,
}

impl Form {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.add_field(field);
        self
    }

    /// Add a field; a field with the same name is replaced in place
    pub fn add_field(&mut self, field: FormField) {
        self.fields.insert(field.name.clone(), field);
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this form's fields under a new name
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: self.fields.clone(),
        }
    }

    /// Validate submitted values and coerce them per field kind
    ///
    /// Returns [`Error::InvalidForm`] with every failing field when any check
    /// fails. Inputs without a matching field are ignored.
    pub fn process(&self, input: &HashMap<String, String>) -> Result<Map<String, Value>> {
        let mut values = Map::new();
        let mut errors = FormErrors::new();

        for field in self.fields.values() {
            match field.process(input.get(&field.name).map(String::as_str)) {
                Ok(value) => {
                    values.insert(field.name.clone(), value);
                }
                Err(messages) => {
                    for message in messages {
                        errors.add(&field.name, message);
                    }
                }
            }
        }

        if !errors.is_empty() {
            log::debug!("{} rejected: {}", self.name, errors);
            return Err(Error::InvalidForm(errors));
        }

        Ok(values)
    }

    /// Form values for a stored object, falling back to field defaults
    pub fn values_from(&self, obj: &Map<String, Value>) -> HashMap<String, String> {
        self.fields
            .values()
            .filter_map(|field| {
                obj.get(&field.name)
                    .or(field.default.as_ref())
                    .and_then(|value| field.display_value(value))
                    .map(|value| (field.name.clone(), value))
            })
            .collect()
    }

    /// Generate the complete HTML form
    pub fn render(
        &self,
        action: &str,
        method: &str,
        values: &HashMap<String, String>,
        errors: Option<&FormErrors>,
    ) -> String {
        let multipart = self.fields().any(|f| f.kind == FieldKind::File);
        let mut html = format!(
            r#"<form action="{}" method="{}"{}>"#,
            html_escape(action),
            method.to_uppercase(),
            if multipart {
                r#" enctype="multipart/form-data""#
            } else {
                ""
            }
        );

        for field in self.fields.values() {
            html.push_str(&render_field(field, values, errors));
        }

        html.push_str("</form>");
        html
    }
}

/// Render a single form field
fn render_field(
    field: &FormField,
    values: &HashMap<String, String>,
    errors: Option<&FormErrors>,
) -> String {
    let mut html = String::new();
    let name = html_escape(&field.name);

    html.push_str(r#"<div class="form-field">"#);

    html.push_str(&format!(
        r#"<label for="{}">{}{}</label>"#,
        name,
        html_escape(&field.label),
        if field.is_required() { " *" } else { "" }
    ));

    let default_value = field
        .default
        .as_ref()
        .and_then(|d| field.display_value(d))
        .unwrap_or_default();
    let value = values.get(&field.name).unwrap_or(&default_value);
    let field_errors = errors.and_then(|e| e.get(&field.name));
    let error_class = if field_errors.is_some() { " error" } else { "" };
    let required = if field.is_required() { " required" } else { "" };

    match &field.kind {
        FieldKind::TextArea | FieldKind::StringList => {
            html.push_str(&format!(
                r#"<textarea name="{}" id="{}" class="form-control{}"{}>{}</textarea>"#,
                name,
                name,
                error_class,
                required,
                html_escape(value)
            ));
        }
        FieldKind::Select { choices } => {
            html.push_str(&format!(
                r#"<select name="{}" id="{}" class="form-control{}"{}>"#,
                name, name, error_class, required
            ));
            for (choice, label) in choices {
                html.push_str(&format!(
                    r#"<option value="{}"{}>{}</option>"#,
                    html_escape(choice),
                    if choice == value { " selected" } else { "" },
                    html_escape(label)
                ));
            }
            html.push_str("</select>");
        }
        FieldKind::Boolean => {
            let checked = value == "true" || value == "1" || value == "on";
            html.push_str(&format!(
                r#"<input type="checkbox" name="{}" id="{}" value="1" class="form-control{}"{}>"#,
                name,
                name,
                error_class,
                if checked { " checked" } else { "" }
            ));
        }
        FieldKind::File => {
            html.push_str(&format!(
                r#"<input type="file" name="{}" id="{}" class="form-control{}"{}>"#,
                name, name, error_class, required
            ));
        }
        kind => {
            let input_type = if *kind == FieldKind::Integer {
                "number"
            } else {
                "text"
            };
            html.push_str(&format!(
                r#"<input type="{}" name="{}" id="{}" value="{}" class="form-control{}"{}>"#,
                input_type,
                name,
                name,
                html_escape(value),
                error_class,
                required
            ));
        }
    }

    if let Some(description) = &field.description {
        html.push_str(&format!(
            r#"<div class="form-description">{}</div>"#,
            html_escape(description)
        ));
    }

    for error in field_errors.unwrap_or_default() {
        html.push_str(&format!(
            r#"<div class="form-error">{}</div>"#,
            html_escape(error)
        ));
    }

    html.push_str("</div>");
    html
}

/// Utility function to escape HTML content
fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
