//! VariableData blocks shared by agent, job and action inputs

use schematics_core::provider::ProviderResult;
use schematics_core::resource::Attributes;
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema};

use crate::convert::{AttrReader, AttrWriter};
use crate::models::{VariableData, VariableMetadata};

const VARIABLE_TYPES: &[&str] = &[
    "array", "boolean", "complex", "date", "integer", "link", "list", "map", "string",
];

fn metadata_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("type", AttributeType::enumeration(VARIABLE_TYPES))
                .with_description("Type of the variable"),
        )
        .attribute(AttributeSchema::new("aliases", AttributeType::string_list()))
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(AttributeSchema::new("cloud_data_type", AttributeType::String))
        .attribute(AttributeSchema::new("default_value", AttributeType::String))
        .attribute(AttributeSchema::new(
            "link_status",
            AttributeType::enumeration(&["broken", "normal"]),
        ))
        .attribute(AttributeSchema::new("secure", AttributeType::Bool))
        .attribute(AttributeSchema::new("immutable", AttributeType::Bool))
        .attribute(AttributeSchema::new("hidden", AttributeType::Bool))
        .attribute(AttributeSchema::new("required", AttributeType::Bool))
        .attribute(AttributeSchema::new("options", AttributeType::string_list()))
        .attribute(AttributeSchema::new("min_value", AttributeType::Int))
        .attribute(AttributeSchema::new("max_value", AttributeType::Int))
        .attribute(AttributeSchema::new("min_length", AttributeType::Int))
        .attribute(AttributeSchema::new("max_length", AttributeType::Int))
        .attribute(AttributeSchema::new("matches", AttributeType::String))
        .attribute(AttributeSchema::new("position", AttributeType::Int))
        .attribute(AttributeSchema::new("group_by", AttributeType::String))
        .attribute(AttributeSchema::new("source", AttributeType::String))
}

/// A name/value variable with optional metadata
pub fn variable_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("value", AttributeType::String))
        .attribute(AttributeSchema::new("use_default", AttributeType::Bool))
        .attribute(AttributeSchema::new(
            "metadata",
            AttributeType::block(metadata_block()),
        ))
        .attribute(
            AttributeSchema::new("link", AttributeType::String)
                .computed()
                .with_description("Reference link to the variable value"),
        )
}

pub fn variable_list() -> AttributeType {
    AttributeType::block_list(variable_block())
}

pub fn read_variable(r: &AttrReader<'_>) -> ProviderResult<VariableData> {
    Ok(VariableData {
        name: r.string("name")?,
        value: r.string("value")?,
        use_default: r.bool("use_default")?,
        metadata: r.block("metadata", read_metadata)?,
        // computed by the service
        link: None,
    })
}

fn read_metadata(r: &AttrReader<'_>) -> ProviderResult<VariableMetadata> {
    Ok(VariableMetadata {
        type_: r.string("type")?,
        aliases: r.strings("aliases")?,
        description: r.string("description")?,
        cloud_data_type: r.string("cloud_data_type")?,
        default_value: r.string("default_value")?,
        link_status: r.string("link_status")?,
        secure: r.bool("secure")?,
        immutable: r.bool("immutable")?,
        hidden: r.bool("hidden")?,
        required: r.bool("required")?,
        options: r.strings("options")?,
        min_value: r.int("min_value")?,
        max_value: r.int("max_value")?,
        min_length: r.int("min_length")?,
        max_length: r.int("max_length")?,
        matches: r.string("matches")?,
        position: r.int("position")?,
        group_by: r.string("group_by")?,
        source: r.string("source")?,
    })
}

pub fn write_variable(v: &VariableData) -> Attributes {
    AttrWriter::new()
        .string("name", &v.name)
        .string("value", &v.value)
        .bool("use_default", v.use_default)
        .block("metadata", &v.metadata, write_metadata)
        .string("link", &v.link)
        .finish()
}

fn write_metadata(m: &VariableMetadata) -> Attributes {
    AttrWriter::new()
        .string("type", &m.type_)
        .strings("aliases", &m.aliases)
        .string("description", &m.description)
        .string("cloud_data_type", &m.cloud_data_type)
        .string("default_value", &m.default_value)
        .string("link_status", &m.link_status)
        .bool("secure", m.secure)
        .bool("immutable", m.immutable)
        .bool("hidden", m.hidden)
        .bool("required", m.required)
        .strings("options", &m.options)
        .int("min_value", m.min_value)
        .int("max_value", m.max_value)
        .int("min_length", m.min_length)
        .int("max_length", m.max_length)
        .string("matches", &m.matches)
        .int("position", m.position)
        .string("group_by", &m.group_by)
        .string("source", &m.source)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    #[test]
    fn link_is_never_sent() {
        let attrs = write_variable(&VariableData {
            name: Some("region".to_string()),
            value: Some("us-south".to_string()),
            link: Some("ref://x".to_string()),
            ..Default::default()
        });
        assert_eq!(attrs.get("link"), Some(&Value::from("ref://x")));

        let back = read_variable(&AttrReader::new(&attrs)).unwrap();
        assert_eq!(back.name.as_deref(), Some("region"));
        assert!(back.link.is_none());
    }

    #[test]
    fn metadata_type_is_renamed_on_the_wire() {
        let var = VariableData {
            name: Some("count".to_string()),
            metadata: Some(VariableMetadata {
                type_: Some("integer".to_string()),
                secure: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(json["metadata"]["type"], "integer");
        assert!(json["metadata"].get("aliases").is_none());

        let attrs = write_variable(&var);
        let back = read_variable(&AttrReader::new(&attrs)).unwrap();
        assert_eq!(back, var);
    }
}
