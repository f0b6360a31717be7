//! Model descriptions consumed by the form converter
//!
//! A [`ModelSchema`] lists a record kind's properties in declaration order.
//! Schemas are built by hand, deserialized from JSON or TOML, or provided by
//! a [`DataModel`] implementation.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Declared type of a model property
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    String,
    ByteString,
    Boolean,
    Integer,
    Float,
    DateTime,
    Date,
    Time,
    List,
    StringList,
    Reference,
    SelfReference,
    User,
    Blob,
    Text,
    Category,
    Link,
    Email,
    GeoPt,
    IM,
    PhoneNumber,
    PostalAddress,
    Rating,
    /// Back-reference collection; never convertible
    ReverseReference,
    /// Application-defined type, convertible only through a registered function
    Custom(String),
}

impl PropertyKind {
    /// Type name as reported in conversion errors
    pub fn type_name(&self) -> String {
        match self {
            Self::Custom(name) => name.clone(),
            Self::ReverseReference => "_ReverseReferenceProperty".to_string(),
            other => format!("{:?}Property", other),
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::DateTime | Self::Date | Self::Time)
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// One property of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    /// Fixed set of allowed values
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub multiline: bool,
    /// Set on every write by the datastore
    #[serde(default)]
    pub auto_now: bool,
    /// Set on creation by the datastore
    #[serde(default)]
    pub auto_now_add: bool,
}

impl Property {
    pub fn new(name: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            default: None,
            choices: None,
            multiline: false,
            auto_now: false,
            auto_now_add: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    /// True when the datastore fills the value itself
    pub fn is_auto_populated(&self) -> bool {
        self.auto_now || self.auto_now_add
    }
}

/// Ordered description of a record kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub kind: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ModelSchema {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Record type that can describe itself to the form converter
pub trait DataModel {
    /// Kind name, used to name generated forms
    fn kind() -> &'static str;

    fn properties() -> Vec<Property>;

    fn schema() -> ModelSchema {
        ModelSchema {
            kind: Self::kind().to_string(),
            properties: Self::properties(),
        }
    }

    /// Property values of this record, keyed by property name
    fn to_values(&self) -> Result<Map<String, Value>>
    where
        Self: Serialize,
    {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Contact {
        name: String,
        age: i64,
    }

    impl DataModel for Contact {
        fn kind() -> &'static str {
            "Contact"
        }

        fn properties() -> Vec<Property> {
            vec![
                Property::new("name", PropertyKind::String).required(),
                Property::new("age", PropertyKind::Integer).required(),
            ]
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(PropertyKind::String.type_name(), "StringProperty");
        assert_eq!(PropertyKind::GeoPt.type_name(), "GeoPtProperty");
        assert_eq!(
            PropertyKind::ReverseReference.type_name(),
            "_ReverseReferenceProperty"
        );
        assert_eq!(
            PropertyKind::Custom("MoneyProperty".to_string()).to_string(),
            "MoneyProperty"
        );
    }

    #[test]
    fn test_schema_from_json() {
        let schema = ModelSchema::from_json(
            r#"{
                "kind": "Contact",
                "properties": [
                    {"name": "name", "kind": "String", "required": true},
                    {"name": "created", "kind": "DateTime", "auto_now_add": true}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.property_names().collect::<Vec<_>>(), ["name", "created"]);
        assert!(schema.get("name").unwrap().required);
        assert!(schema.get("created").unwrap().is_auto_populated());
        assert!(!schema.contains("age"));
    }

    #[test]
    fn test_data_model_schema_and_values() {
        let schema = Contact::schema();
        assert_eq!(schema.kind, "Contact");
        assert_eq!(schema.properties.len(), 2);

        let contact = Contact {
            name: "Test Name".to_string(),
            age: 17,
        };
        let values = contact.to_values().unwrap();
        assert_eq!(values.get("age"), Some(&json!(17)));
    }
}
