//! Resource files: one desired resource or data source lookup per JSON file
//!
//! ```json
//! {
//!   "type": "ibm_schematics_inventory",
//!   "name": "web_hosts",
//!   "attributes": { "name": "web-hosts", "location": "us-south" }
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use schematics_core::resource::{Resource, attributes_from_json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let manifest: Manifest =
            serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;
        if manifest.name.is_empty() {
            return Err("'name' must not be empty".to_string());
        }
        Ok(manifest)
    }

    /// Desired resource; `null` attributes count as unset
    pub fn into_resource(self, read_only: bool) -> Result<Resource, String> {
        let attributes = attributes_from_json(&serde_json::Value::Object(self.attributes))
            .ok_or_else(|| "'attributes' must be a JSON object".to_string())?;
        Ok(Resource::new(self.resource_type, self.name)
            .with_attributes(attributes)
            .with_read_only(read_only))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    #[test]
    fn parses_nested_attributes() {
        let manifest = Manifest::parse(
            r#"{
                "type": "ibm_schematics_agent",
                "name": "a",
                "attributes": {
                    "name": "agent-1",
                    "agent_infrastructure": {"infra_type": "ibm_kubernetes"},
                    "tags": ["env:dev"],
                    "description": null
                }
            }"#,
        )
        .unwrap();
        let resource = manifest.into_resource(false).unwrap();

        assert_eq!(resource.id.resource_type, "ibm_schematics_agent");
        assert_eq!(
            resource.attributes.get("tags"),
            Some(&Value::List(vec![Value::from("env:dev")]))
        );
        assert!(resource.attributes["agent_infrastructure"].as_map().is_some());
        assert!(!resource.attributes.contains_key("description"));
    }

    #[test]
    fn attributes_default_to_empty() {
        let resource = Manifest::parse(r#"{"type": "ibm_schematics_policies", "name": "all"}"#)
            .unwrap()
            .into_resource(true)
            .unwrap();
        assert!(resource.attributes.is_empty());
        assert!(resource.read_only);
    }

    #[test]
    fn rejects_unknown_keys_and_empty_names() {
        assert!(Manifest::parse(r#"{"type": "t", "name": "n", "attrs": {}}"#).is_err());
        assert!(Manifest::parse(r#"{"type": "t", "name": ""}"#).is_err());
    }
}
