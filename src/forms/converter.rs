use crate::error::{Error, Result};
use crate::forms::model::{ModelSchema, Property, PropertyKind};
use crate::forms::{FieldArgs, FieldKind, FieldOverrides, FormField, Validator};
use std::collections::HashMap;

/// Conversion function for one property kind
///
/// Returns `Ok(None)` to leave the property out of the form.
pub type ConvertFn = fn(&ModelSchema, &Property, FieldArgs) -> Result<Option<FormField>>;

/// Datastore limit for indexed string properties
pub const MAX_STRING_LENGTH: usize = 500;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H-%M-%S";

/// Converts model properties to form fields through an explicit table
///
/// ```rust,ignore
/// let mut table = ModelConverter::default_converters();
/// table.insert(PropertyKind::GeoPt, convert_not_implemented);
/// let converter = ModelConverter::new(table);
/// ```
#[derive(Clone)]
pub struct ModelConverter {
    converters: HashMap<PropertyKind, ConvertFn>,
}

impl Default for ModelConverter {
    fn default() -> Self {
        Self::new(Self::default_converters())
    }
}

impl ModelConverter {
    pub fn new(converters: HashMap<PropertyKind, ConvertFn>) -> Self {
        Self { converters }
    }

    /// Register or replace the function for `kind`
    pub fn with_converter(mut self, kind: PropertyKind, convert: ConvertFn) -> Self {
        self.converters.insert(kind, convert);
        self
    }

    pub fn has_converter(&self, kind: &PropertyKind) -> bool {
        self.converters.contains_key(kind)
    }

    /// Table used when the caller brings none
    ///
    /// Lists, references, users, geo points, IM handles and reverse
    /// references have no entry and are left out of generated forms.
    pub fn default_converters() -> HashMap<PropertyKind, ConvertFn> {
        let mut table: HashMap<PropertyKind, ConvertFn> = HashMap::new();
        table.insert(PropertyKind::String, convert_string);
        table.insert(PropertyKind::ByteString, convert_text_field);
        table.insert(PropertyKind::Boolean, convert_boolean);
        table.insert(PropertyKind::Integer, convert_integer);
        table.insert(PropertyKind::Float, convert_text_field);
        table.insert(PropertyKind::DateTime, convert_datetime);
        table.insert(PropertyKind::Date, convert_date);
        table.insert(PropertyKind::Time, convert_time);
        table.insert(PropertyKind::StringList, convert_string_list);
        table.insert(PropertyKind::Blob, convert_blob);
        table.insert(PropertyKind::Text, convert_text);
        table.insert(PropertyKind::Category, convert_text_field);
        table.insert(PropertyKind::Link, convert_link);
        table.insert(PropertyKind::Email, convert_email);
        table.insert(PropertyKind::PhoneNumber, convert_text_field);
        table.insert(PropertyKind::PostalAddress, convert_text_field);
        table.insert(PropertyKind::Rating, convert_rating);
        table
    }

    /// Form field for a single model property, if it converts to one
    pub fn convert(
        &self,
        model: &ModelSchema,
        property: &Property,
        overrides: Option<&FieldOverrides>,
    ) -> Result<Option<FormField>> {
        let mut args = FieldArgs::new(&property.name);
        args.default = property.default.clone();
        if let Some(overrides) = overrides {
            args.apply(overrides);
        }

        if property.required {
            args.validators.push(Validator::Required);
        }

        if let Some(choices) = property.choices.as_ref().filter(|c| !c.is_empty()) {
            let choices = choices.iter().map(|c| (c.clone(), c.clone())).collect();
            return Ok(Some(args.into_field(FieldKind::Select { choices })));
        }

        match self.converters.get(&property.kind) {
            Some(convert) => convert(model, property, args),
            None => {
                log::debug!(
                    "{}.{}: no converter for {}, skipped",
                    model.kind,
                    property.name,
                    property.kind
                );
                Ok(None)
            }
        }
    }
}

/// Text input capped at the datastore string limit
pub fn text_field(args: FieldArgs) -> FormField {
    args.with_validator(Validator::max_length(MAX_STRING_LENGTH))
        .into_field(FieldKind::Text)
}

pub fn convert_text_field(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(text_field(args)))
}

pub fn convert_string(
    _model: &ModelSchema,
    property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    if property.multiline {
        Ok(Some(
            args.with_validator(Validator::max_length(MAX_STRING_LENGTH))
                .into_field(FieldKind::TextArea),
        ))
    } else {
        Ok(Some(text_field(args)))
    }
}

pub fn convert_boolean(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(args.into_field(FieldKind::Boolean)))
}

pub fn convert_integer(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(
        args.with_validator(Validator::number_range(i64::MIN, i64::MAX))
            .into_field(FieldKind::Integer),
    ))
}

fn temporal_field(property: &Property, args: FieldArgs, format: &str) -> Option<FormField> {
    if property.kind.is_temporal() && property.is_auto_populated() {
        return None;
    }
    Some(args.into_field(FieldKind::DateTime {
        format: format.to_string(),
    }))
}

pub fn convert_datetime(
    _model: &ModelSchema,
    property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(temporal_field(property, args, DATETIME_FORMAT))
}

pub fn convert_date(
    _model: &ModelSchema,
    property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(temporal_field(property, args, DATE_FORMAT))
}

pub fn convert_time(
    _model: &ModelSchema,
    property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(temporal_field(property, args, TIME_FORMAT))
}

pub fn convert_string_list(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(args.into_field(FieldKind::StringList)))
}

pub fn convert_blob(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(args.into_field(FieldKind::File)))
}

pub fn convert_text(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(args.into_field(FieldKind::TextArea)))
}

pub fn convert_link(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(text_field(args.with_validator(Validator::Url))))
}

pub fn convert_email(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(text_field(args.with_validator(Validator::Email))))
}

pub fn convert_rating(
    _model: &ModelSchema,
    _property: &Property,
    args: FieldArgs,
) -> Result<Option<FormField>> {
    Ok(Some(
        args.with_validator(Validator::number_range(0, 100))
            .into_field(FieldKind::Integer),
    ))
}

/// For kinds that must never convert silently
pub fn convert_not_implemented(
    _model: &ModelSchema,
    property: &Property,
    _args: FieldArgs,
) -> Result<Option<FormField>> {
    Err(Error::not_implemented(property.kind.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::Form;
    use serde_json::json;

    fn model() -> ModelSchema {
        ModelSchema::new("Contact")
    }

    fn convert(property: Property) -> Option<FormField> {
        ModelConverter::default()
            .convert(&model(), &property, None)
            .unwrap()
    }

    #[test]
    fn test_required_string() {
        let field = convert(Property::new("name", PropertyKind::String).required()).unwrap();
        assert_eq!(field.kind, FieldKind::Text);
        assert_eq!(field.label, "name");
        assert_eq!(
            field.validators,
            vec![Validator::Required, Validator::max_length(500)]
        );
    }

    #[test]
    fn test_multiline_string() {
        let field = convert(Property::new("bio", PropertyKind::String).multiline()).unwrap();
        assert_eq!(field.kind, FieldKind::TextArea);
        assert_eq!(field.validators, vec![Validator::max_length(500)]);
    }

    #[test]
    fn test_integer_and_rating_ranges() {
        let age = convert(Property::new("age", PropertyKind::Integer)).unwrap();
        assert_eq!(age.kind, FieldKind::Integer);
        assert_eq!(
            age.validators,
            vec![Validator::number_range(i64::MIN, i64::MAX)]
        );

        let rating = convert(Property::new("stars", PropertyKind::Rating)).unwrap();
        assert_eq!(rating.validators, vec![Validator::number_range(0, 100)]);
    }

    #[test]
    fn test_temporal_fields() {
        assert!(convert(Property::new("created", PropertyKind::DateTime).auto_now_add()).is_none());
        assert!(convert(Property::new("updated", PropertyKind::Date).auto_now()).is_none());

        let field = convert(Property::new("at", PropertyKind::Time)).unwrap();
        assert_eq!(
            field.kind,
            FieldKind::DateTime {
                format: "%H-%M-%S".to_string()
            }
        );
    }

    #[test]
    fn test_choices_take_precedence() {
        let field = convert(
            Property::new("city", PropertyKind::String)
                .required()
                .choices(["Lisbon", "Porto"]),
        )
        .unwrap();

        assert_eq!(
            field.kind,
            FieldKind::Select {
                choices: vec![
                    ("Lisbon".to_string(), "Lisbon".to_string()),
                    ("Porto".to_string(), "Porto".to_string()),
                ]
            }
        );
        assert_eq!(field.validators, vec![Validator::Required]);
    }

    #[test]
    fn test_empty_choices_fall_through_to_type() {
        let property = Property::new("age", PropertyKind::Integer).choices(Vec::<String>::new());
        let field = convert(property).unwrap();
        assert_eq!(field.kind, FieldKind::Integer);

        let form = Form::new("ContactForm").field(field);
        let values = form
            .process(&[("age".to_string(), "5".to_string())].into_iter().collect())
            .unwrap();
        assert_eq!(values.get("age"), Some(&json!(5)));
    }

    #[test]
    fn test_link_and_email_validators() {
        let link = convert(Property::new("site", PropertyKind::Link)).unwrap();
        assert_eq!(
            link.validators,
            vec![Validator::Url, Validator::max_length(500)]
        );

        let email = convert(Property::new("email", PropertyKind::Email)).unwrap();
        assert!(email.validators.contains(&Validator::Email));
    }

    #[test]
    fn test_unregistered_kinds_are_skipped() {
        for kind in [
            PropertyKind::List,
            PropertyKind::Reference,
            PropertyKind::SelfReference,
            PropertyKind::User,
            PropertyKind::GeoPt,
            PropertyKind::IM,
            PropertyKind::ReverseReference,
            PropertyKind::Custom("MoneyProperty".to_string()),
        ] {
            assert!(convert(Property::new("x", kind)).is_none());
        }
    }

    #[test]
    fn test_caller_registered_not_implemented() {
        let converter =
            ModelConverter::default().with_converter(PropertyKind::GeoPt, convert_not_implemented);
        let err = converter
            .convert(&model(), &Property::new("where", PropertyKind::GeoPt), None)
            .unwrap_err();
        assert_eq!(err.error_code(), "E_NOT_IMPLEMENTED");
        assert!(err.to_string().contains("GeoPtProperty"));
    }

    #[test]
    fn test_overrides() {
        let overrides = FieldOverrides::new()
            .label("Age")
            .description("In years")
            .default_value(18)
            .validators(vec![Validator::number_range(14, 99)]);

        let field = ModelConverter::default()
            .convert(
                &model(),
                &Property::new("age", PropertyKind::Integer).required(),
                Some(&overrides),
            )
            .unwrap()
            .unwrap();

        assert_eq!(field.label, "Age");
        assert_eq!(field.description.as_deref(), Some("In years"));
        assert_eq!(field.default, Some(json!(18)));
        assert_eq!(
            field.validators,
            vec![
                Validator::number_range(14, 99),
                Validator::Required,
                Validator::number_range(i64::MIN, i64::MAX),
            ]
        );
    }

    #[test]
    fn test_custom_table() {
        let mut table: HashMap<PropertyKind, ConvertFn> = HashMap::new();
        table.insert(PropertyKind::Custom("MoneyProperty".to_string()), convert_text_field);
        let converter = ModelConverter::new(table);

        assert!(converter.has_converter(&PropertyKind::Custom("MoneyProperty".to_string())));
        assert!(!converter.has_converter(&PropertyKind::String));
        assert!(converter
            .convert(&model(), &Property::new("name", PropertyKind::String), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_auto_flags_only_skip_temporal_kinds() {
        let stamp = PropertyKind::Custom("StampProperty".to_string());
        let converter =
            ModelConverter::default().with_converter(stamp.clone(), convert_datetime);

        let field = converter
            .convert(&model(), &Property::new("stamp", stamp).auto_now(), None)
            .unwrap()
            .unwrap();
        assert_eq!(
            field.kind,
            FieldKind::DateTime {
                format: DATETIME_FORMAT.to_string()
            }
        );
    }
}
