use crate::error::Result;
use crate::forms::converter::ModelConverter;
use crate::forms::model::{DataModel, ModelSchema};
use crate::forms::{FieldOverrides, Form};
use std::collections::HashMap;

/// Build a form for `model`
///
/// Field selection: `only` (in its own order, unknown names dropped) when
/// non-empty, otherwise every property minus `exclude`, otherwise every
/// property in declaration order. The form is named `<Kind>Form` and starts
/// with the fields of `base`; a model field replaces a base field of the
/// same name. Properties the converter declines are left out.
pub fn model_form(
    model: &ModelSchema,
    base: Option<&Form>,
    only: Option<&[&str]>,
    exclude: Option<&[&str]>,
    field_overrides: &HashMap<String, FieldOverrides>,
    converter: Option<&ModelConverter>,
) -> Result<Form> {
    let default_converter;
    let converter = match converter {
        Some(converter) => converter,
        None => {
            default_converter = ModelConverter::default();
            &default_converter
        }
    };

    let field_names: Vec<&str> = match (only, exclude) {
        (Some(only), _) if !only.is_empty() => only
            .iter()
            .copied()
            .filter(|name| model.contains(name))
            .collect(),
        (_, Some(exclude)) if !exclude.is_empty() => model
            .property_names()
            .filter(|name| !exclude.contains(name))
            .collect(),
        _ => model.property_names().collect(),
    };

    let form_name = format!("{}Form", model.kind);
    let mut form = match base {
        Some(base) => base.renamed(&form_name),
        None => Form::new(&form_name),
    };

    for name in field_names {
        let Some(property) = model.get(name) else {
            continue;
        };
        if let Some(field) = converter.convert(model, property, field_overrides.get(name))? {
            form.add_field(field);
        }
    }

    log::debug!("Built {} with {} fields", form.name(), form.len());
    Ok(form)
}

/// Builder over [`model_form`]
pub struct ModelFormBuilder {
    model: ModelSchema,
    base: Option<Form>,
    only: Vec<String>,
    exclude: Vec<String>,
    field_overrides: HashMap<String, FieldOverrides>,
    converter: Option<ModelConverter>,
}

impl ModelFormBuilder {
    pub fn new(model: ModelSchema) -> Self {
        Self {
            model,
            base: None,
            only: Vec::new(),
            exclude: Vec::new(),
            field_overrides: HashMap::new(),
            converter: None,
        }
    }

    pub fn for_model<M: DataModel>() -> Self {
        Self::new(M::schema())
    }

    /// Form whose fields come first in the generated form
    pub fn base(mut self, base: Form) -> Self {
        self.base = Some(base);
        self
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn field_args(mut self, name: &str, overrides: FieldOverrides) -> Self {
        self.field_overrides.insert(name.to_string(), overrides);
        self
    }

    pub fn converter(mut self, converter: ModelConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn build(&self) -> Result<Form> {
        let only: Vec<&str> = self.only.iter().map(String::as_str).collect();
        let exclude: Vec<&str> = self.exclude.iter().map(String::as_str).collect();

        model_form(
            &self.model,
            self.base.as_ref(),
            Some(only.as_slice()),
            Some(exclude.as_slice()),
            &self.field_overrides,
            self.converter.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::converter::convert_not_implemented;
    use crate::forms::model::{Property, PropertyKind};
    use crate::forms::{FieldKind, FormField};

    fn contact() -> ModelSchema {
        ModelSchema::new("Contact")
            .property(Property::new("name", PropertyKind::String).required())
            .property(Property::new("city", PropertyKind::String))
            .property(Property::new("age", PropertyKind::Integer).required())
            .property(Property::new("is_admin", PropertyKind::Boolean).default_value(false))
            .property(Property::new("created", PropertyKind::DateTime).auto_now_add())
            .property(Property::new("owner", PropertyKind::User))
    }

    fn names(form: &Form) -> Vec<&str> {
        form.field_names().collect()
    }

    #[test]
    fn test_all_properties_in_declared_order() {
        let form = model_form(&contact(), None, None, None, &HashMap::new(), None).unwrap();
        assert_eq!(form.name(), "ContactForm");
        assert_eq!(names(&form), ["name", "city", "age", "is_admin"]);
    }

    #[test]
    fn test_only_keeps_its_order_and_drops_unknown() {
        let form = model_form(
            &contact(),
            None,
            Some(&["age", "missing", "name"][..]),
            Some(&["age"][..]),
            &HashMap::new(),
            None,
        )
        .unwrap();
        assert_eq!(names(&form), ["age", "name"]);
    }

    #[test]
    fn test_exclude() {
        let form = ModelFormBuilder::new(contact())
            .exclude(["city", "is_admin"])
            .build()
            .unwrap();
        assert_eq!(names(&form), ["name", "age"]);
    }

    #[test]
    fn test_base_fields_come_first() {
        let base = Form::new("BaseContactForm")
            .field(FormField::new("subscribe_to_news", FieldKind::Boolean))
            .field(FormField::new("age", FieldKind::Text));

        let form = ModelFormBuilder::new(contact())
            .base(base.clone())
            .only(["name", "age"])
            .build()
            .unwrap();

        assert_eq!(names(&form), ["subscribe_to_news", "age", "name"]);
        assert_eq!(form.get("age").unwrap().kind, FieldKind::Integer);
        assert_eq!(base.get("age").unwrap().kind, FieldKind::Text);
    }

    #[test]
    fn test_field_args_and_converter_errors() {
        let form = ModelFormBuilder::new(contact())
            .only(["name"])
            .field_args("name", FieldOverrides::new().label("Full name"))
            .build()
            .unwrap();
        assert_eq!(form.get("name").unwrap().label, "Full name");

        let strict = ModelConverter::default()
            .with_converter(PropertyKind::User, convert_not_implemented);
        let err = ModelFormBuilder::new(contact())
            .converter(strict)
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "E_NOT_IMPLEMENTED");
    }
}
