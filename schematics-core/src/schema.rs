//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type and data source. A schema
//! fixes attribute names, types and whether each attribute is required,
//! optional or computed by the remote service.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Attributes, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Floating point number
    Float,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// String with a length range (inclusive)
    BoundedString { min: usize, max: usize },
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block (a single optional sub-object)
    Block(Box<BlockSchema>),
}

impl AttributeType {
    /// Shorthand for an enum of string literals
    pub fn enumeration(variants: &[&str]) -> Self {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    /// Shorthand for a list of strings
    pub fn string_list() -> Self {
        AttributeType::List(Box::new(AttributeType::String))
    }

    /// Shorthand for a list of nested blocks
    pub fn block_list(block: BlockSchema) -> Self {
        AttributeType::List(Box::new(AttributeType::Block(Box::new(block))))
    }

    /// Shorthand for a single nested block
    pub fn block(block: BlockSchema) -> Self {
        AttributeType::Block(Box::new(block))
    }

    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            // Integers are accepted where floats are expected
            (AttributeType::Float, Value::Float(_) | Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::BoundedString { min, max }, Value::String(s)) => {
                let len = s.chars().count();
                if len < *min || len > *max {
                    Err(TypeError::LengthOutOfRange {
                        len,
                        min: *min,
                        max: *max,
                    })
                } else {
                    Ok(())
                }
            }

            (AttributeType::Custom { validate, base, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), Value::Map(map)) => {
                match validate_attributes(&block.attributes, map).into_iter().next() {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name().to_string(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Float => "Float".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::BoundedString { min, max } => format!("String[{}..={}]", min, max),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Length {len} is outside the allowed range {min}..={max}")]
    LengthOutOfRange { len: usize, min: usize, max: usize },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' allows at most {max} items, got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Whether an attribute is supplied by the operator, the remote service, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeMode {
    /// Must be set by the operator
    Required,
    /// May be set by the operator
    Optional,
    /// May be set by the operator; filled in by the service when unset
    OptionalComputed,
    /// Set only by the service
    Computed,
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub mode: AttributeMode,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Value must not be printed
    pub sensitive: bool,
    /// Never returned by the service; the last applied value is kept in state
    pub local_only: bool,
    /// Upper bound on the number of list items
    pub max_items: Option<usize>,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            mode: AttributeMode::Optional,
            force_new: false,
            sensitive: false,
            local_only: false,
            max_items: None,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.mode = AttributeMode::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.mode = AttributeMode::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.mode = AttributeMode::OptionalComputed;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.mode == AttributeMode::Required
    }

    /// True if the service fills in this attribute (computed or optional+computed)
    pub fn is_computed(&self) -> bool {
        matches!(
            self.mode,
            AttributeMode::Computed | AttributeMode::OptionalComputed
        )
    }

    /// True if the operator may set this attribute
    pub fn is_settable(&self) -> bool {
        self.mode != AttributeMode::Computed
    }
}

/// Attributes of a nested block
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: HashMap<String, AttributeSchema>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Attributes sorted by name, for display
    pub fn sorted_attributes(&self) -> Vec<&AttributeSchema> {
        let mut attrs: Vec<_> = self.attributes.values().collect();
        attrs.sort_by(|a, b| a.name.cmp(&b.name));
        attrs
    }

    /// Derive a read-only data source schema
    ///
    /// Every attribute becomes computed and local-only attributes are dropped;
    /// `lookup` attributes are the inputs the operator supplies to select the
    /// remote object.
    pub fn into_data_source(mut self, lookup: Vec<AttributeSchema>) -> Self {
        self.attributes.retain(|_, attr| !attr.local_only);
        for attr in self.attributes.values_mut() {
            attr.mode = AttributeMode::Computed;
            attr.force_new = false;
        }
        for attr in lookup {
            self.attributes.insert(attr.name.clone(), attr);
        }
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &Attributes) -> Result<(), Vec<TypeError>> {
        let errors = validate_attributes(&self.attributes, attributes);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn validate_attributes(
    schemas: &HashMap<String, AttributeSchema>,
    attributes: &Attributes,
) -> Vec<TypeError> {
    let mut errors = Vec::new();

    // Check required attributes
    for (name, schema) in schemas {
        if schema.is_required() && !attributes.contains_key(name) && schema.default.is_none() {
            errors.push(TypeError::MissingRequired { name: name.clone() });
        }
    }

    for (name, value) in attributes {
        let Some(schema) = schemas.get(name) else {
            errors.push(TypeError::UnknownAttribute { name: name.clone() });
            continue;
        };

        if !schema.is_settable() {
            errors.push(TypeError::ComputedAttribute { name: name.clone() });
            continue;
        }

        if let (Some(max), Value::List(items)) = (schema.max_items, value)
            && items.len() > max
        {
            errors.push(TypeError::TooManyItems {
                name: name.clone(),
                max,
                got: items.len(),
            });
        }

        if let Err(e) = schema.attr_type.validate(value) {
            errors.push(TypeError::AttributeError {
                name: name.clone(),
                inner: Box::new(e),
            });
        }
    }

    errors
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Non-negative integer type
    pub fn non_negative_int() -> AttributeType {
        AttributeType::Custom {
            name: "NonNegativeInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| match value {
                Value::Int(n) if *n >= 0 => Ok(()),
                Value::Int(_) => Err("Value must not be negative".to_string()),
                _ => Err("Expected integer".to_string()),
            },
        }
    }

    /// Map of free-form string values
    pub fn string_map() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::from("hello")).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::enumeration(&["draft", "live"]);
        assert!(t.validate(&Value::from("draft")).is_ok());
        assert!(t.validate(&Value::from("locked")).is_err());
    }

    #[test]
    fn validate_bounded_string() {
        let t = AttributeType::BoundedString { min: 3, max: 5 };
        assert!(t.validate(&Value::from("abc")).is_ok());
        assert!(t.validate(&Value::from("abcde")).is_ok());
        assert!(matches!(
            t.validate(&Value::from("ab")),
            Err(TypeError::LengthOutOfRange { len: 2, .. })
        ));
        assert!(t.validate(&Value::from("abcdef")).is_err());
    }

    #[test]
    fn float_accepts_int() {
        assert!(AttributeType::Float.validate(&Value::Int(3)).is_ok());
        assert!(AttributeType::Float.validate(&Value::Float(0.5)).is_ok());
        assert!(AttributeType::Int.validate(&Value::Float(0.5)).is_err());
    }

    #[test]
    fn validate_non_negative_int() {
        let t = types::non_negative_int();
        assert!(t.validate(&Value::Int(0)).is_ok());
        assert!(t.validate(&Value::Int(7)).is_ok());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::from("1")).is_err());
    }

    fn agent_like_schema() -> ResourceSchema {
        ResourceSchema::new("agent")
            .attribute(AttributeSchema::new("name", AttributeType::String).required())
            .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
            .attribute(
                AttributeSchema::new(
                    "user_state",
                    AttributeType::block(
                        BlockSchema::new()
                            .attribute(AttributeSchema::new(
                                "state",
                                AttributeType::enumeration(&["enable", "disable"]),
                            ))
                            .attribute(
                                AttributeSchema::new("set_by", AttributeType::String).computed(),
                            ),
                    ),
                )
                .optional_computed(),
            )
            .attribute(AttributeSchema::new("agent_crn", AttributeType::String).computed())
            .attribute(AttributeSchema::new("run_destroy_resources", AttributeType::Int).local_only())
            .attribute(
                AttributeSchema::new(
                    "metadata",
                    AttributeType::block_list(
                        BlockSchema::new()
                            .attribute(AttributeSchema::new("name", AttributeType::String)),
                    ),
                )
                .max_items(2),
            )
    }

    #[test]
    fn validate_resource_schema() {
        let schema = agent_like_schema();
        let mut user_state = Attributes::new();
        user_state.insert("state".to_string(), Value::from("enable"));

        let attributes = attrs(&[
            ("name", Value::from("agent-1")),
            ("tags", Value::List(vec![Value::from("env:dev")])),
            ("user_state", Value::Map(user_state)),
        ]);

        assert!(schema.validate(&attributes).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = agent_like_schema();
        let errors = schema.validate(&Attributes::new()).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, TypeError::MissingRequired { name } if name == "name"))
        );
    }

    #[test]
    fn computed_attribute_cannot_be_set() {
        let schema = agent_like_schema();
        let attributes = attrs(&[
            ("name", Value::from("a")),
            ("agent_crn", Value::from("crn:v1:...")),
        ]);
        let errors = schema.validate(&attributes).unwrap_err();
        assert!(matches!(&errors[0], TypeError::ComputedAttribute { name } if name == "agent_crn"));
    }

    #[test]
    fn nested_block_errors_are_reported() {
        let schema = agent_like_schema();
        let mut user_state = Attributes::new();
        user_state.insert("state".to_string(), Value::from("paused"));
        let attributes = attrs(&[
            ("name", Value::from("a")),
            ("user_state", Value::Map(user_state)),
        ]);

        let errors = schema.validate(&attributes).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("user_state"));
        assert!(errors[0].to_string().contains("paused"));
    }

    #[test]
    fn list_max_items_is_enforced() {
        let schema = agent_like_schema();
        let item = Value::Map(attrs(&[("name", Value::from("m"))]));
        let attributes = attrs(&[
            ("name", Value::from("a")),
            (
                "metadata",
                Value::List(vec![item.clone(), item.clone(), item]),
            ),
        ]);

        let errors = schema.validate(&attributes).unwrap_err();
        assert!(matches!(
            errors[0],
            TypeError::TooManyItems { max: 2, got: 3, .. }
        ));
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let schema = agent_like_schema();
        let attributes = attrs(&[("name", Value::from("a")), ("nme", Value::from("typo"))]);
        let errors = schema.validate(&attributes).unwrap_err();
        assert!(matches!(&errors[0], TypeError::UnknownAttribute { name } if name == "nme"));
    }

    #[test]
    fn data_source_schema_makes_everything_computed() {
        let schema = agent_like_schema().into_data_source(vec![
            AttributeSchema::new("agent_id", AttributeType::String).required(),
        ]);

        assert!(!schema.attributes["name"].is_settable());
        assert!(!schema.attributes.contains_key("run_destroy_resources"));
        assert!(schema.attributes["agent_id"].is_required());
        assert!(
            schema
                .validate(&attrs(&[("agent_id", Value::from("x"))]))
                .is_ok()
        );
    }
}
