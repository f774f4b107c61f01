//! ibm_schematics_policy - agent assignment policies

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};

use super::LOCATIONS;
use crate::convert::{AttrReader, AttrWriter, select_fields};
use crate::models::{Policy, PolicyObjectSelector, PolicyParameter, PolicyState, PolicyTarget};
use crate::provider::{SchematicsProvider, api_error, unchanged};

pub const RESOURCE_TYPE: &str = "ibm_schematics_policy";

const SCOPE_KINDS: &[&str] = &[
    "action",
    "agent",
    "environment",
    "install_config",
    "system",
    "workspace",
];

// =============================================================================
// Schema
// =============================================================================

fn target_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("selector_kind", AttributeType::enumeration(&["ids", "scoped"]))
                .with_description("Static ids or a dynamic scope"),
        )
        .attribute(AttributeSchema::new("selector_ids", AttributeType::string_list()))
        .attribute(AttributeSchema::new(
            "selector_scope",
            AttributeType::block_list(
                BlockSchema::new()
                    .attribute(AttributeSchema::new(
                        "kind",
                        AttributeType::enumeration(SCOPE_KINDS),
                    ))
                    .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
                    .attribute(AttributeSchema::new(
                        "resource_groups",
                        AttributeType::string_list(),
                    ))
                    .attribute(AttributeSchema::new(
                        "locations",
                        AttributeType::List(Box::new(AttributeType::enumeration(LOCATIONS))),
                    )),
            ),
        ))
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A policy that selects the agent for workspaces and actions")
        .attribute(
            AttributeSchema::new("name", AttributeType::BoundedString { min: 1, max: 128 })
                .required(),
        )
        .attribute(AttributeSchema::new(
            "description",
            AttributeType::BoundedString { min: 0, max: 2048 },
        ))
        .attribute(AttributeSchema::new("resource_group", AttributeType::String).optional_computed())
        .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
        .attribute(
            AttributeSchema::new("location", AttributeType::enumeration(LOCATIONS))
                .optional_computed(),
        )
        .attribute(
            AttributeSchema::new(
                "state",
                AttributeType::block(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new(
                            "state",
                            AttributeType::enumeration(&["disable", "draft", "live", "locked"]),
                        ))
                        .attribute(AttributeSchema::new("set_by", AttributeType::String).computed())
                        .attribute(AttributeSchema::new("set_at", AttributeType::String).computed()),
                ),
            )
            .optional_computed()
            .with_description("User defined lifecycle state of the policy"),
        )
        .attribute(
            AttributeSchema::new(
                "policy_kind",
                AttributeType::enumeration(&["agent_assignment_policy"]),
            )
            .optional_computed(),
        )
        .attribute(AttributeSchema::new(
            "policy_target",
            AttributeType::block(target_block()),
        ))
        .attribute(AttributeSchema::new(
            "policy_parameter",
            AttributeType::block(BlockSchema::new().attribute(AttributeSchema::new(
                "agent_assignment_policy_parameter",
                AttributeType::block(target_block()),
            ))),
        ))
        .attribute(AttributeSchema::new("crn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("account", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_by", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
}

// =============================================================================
// Converters
// =============================================================================

fn read_target(r: &AttrReader<'_>) -> ProviderResult<PolicyTarget> {
    Ok(PolicyTarget {
        selector_kind: r.string("selector_kind")?,
        selector_ids: r.strings("selector_ids")?,
        selector_scope: r.blocks("selector_scope", |s| {
            Ok(PolicyObjectSelector {
                kind: s.string("kind")?,
                tags: s.strings("tags")?,
                resource_groups: s.strings("resource_groups")?,
                locations: s.strings("locations")?,
            })
        })?,
    })
}

fn write_target(t: &PolicyTarget) -> Attributes {
    AttrWriter::new()
        .string("selector_kind", &t.selector_kind)
        .strings("selector_ids", &t.selector_ids)
        .blocks("selector_scope", &t.selector_scope, |s| {
            AttrWriter::new()
                .string("kind", &s.kind)
                .strings("tags", &s.tags)
                .strings("resource_groups", &s.resource_groups)
                .strings("locations", &s.locations)
                .finish()
        })
        .finish()
}

pub fn to_request(attrs: &Attributes) -> ProviderResult<Policy> {
    let r = AttrReader::new(attrs);
    Ok(Policy {
        name: r.string("name")?,
        description: r.string("description")?,
        resource_group: r.string("resource_group")?,
        tags: r.strings("tags")?,
        location: r.string("location")?,
        state: r.block("state", |b| {
            Ok(PolicyState {
                state: b.string("state")?,
                ..Default::default()
            })
        })?,
        policy_kind: r.string("policy_kind")?,
        policy_target: r.block("policy_target", read_target)?,
        policy_parameter: r.block("policy_parameter", |b| {
            Ok(PolicyParameter {
                agent_assignment_policy_parameter: b
                    .block("agent_assignment_policy_parameter", read_target)?,
            })
        })?,
        ..Default::default()
    })
}

pub fn from_response(policy: &Policy) -> Attributes {
    AttrWriter::new()
        .string("name", &policy.name)
        .string("description", &policy.description)
        .string("resource_group", &policy.resource_group)
        .strings("tags", &policy.tags)
        .string("location", &policy.location)
        .block("state", &policy.state, |s| {
            AttrWriter::new()
                .string("state", &s.state)
                .string("set_by", &s.set_by)
                .string("set_at", &s.set_at)
                .finish()
        })
        .string("policy_kind", &policy.policy_kind)
        .block("policy_target", &policy.policy_target, write_target)
        .block("policy_parameter", &policy.policy_parameter, |p| {
            AttrWriter::new()
                .block(
                    "agent_assignment_policy_parameter",
                    &p.agent_assignment_policy_parameter,
                    write_target,
                )
                .finish()
        })
        .string("crn", &policy.crn)
        .string("account", &policy.account)
        .string("created_at", &policy.created_at)
        .string("created_by", &policy.created_by)
        .string("updated_at", &policy.updated_at)
        .finish()
}

// =============================================================================
// Operations
// =============================================================================

impl SchematicsProvider {
    pub(crate) async fn read_policy(&self, id: &ResourceId, policy_id: &str) -> ProviderResult<State> {
        match self.client.get_policy(&self.endpoint(), policy_id).await {
            Ok(policy) => {
                Ok(State::existing(id.clone(), from_response(&policy)).with_identifier(policy_id))
            }
            Err(e) if e.is_not_found() => {
                log::debug!("policy {} is gone", policy_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetPolicy", id, e)),
        }
    }

    pub(crate) async fn create_policy(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let created = self
            .client
            .create_policy(&self.endpoint(), &request)
            .await
            .map_err(|e| api_error("CreatePolicy", id, e))?;
        let policy_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no policy id")
                .for_resource(id.clone())
                .during("CreatePolicy")
        })?;
        log::info!("created policy {} ({})", id.name, policy_id);

        self.read_policy(id, &policy_id).await
    }

    /// PATCH carrying only the changed fields
    pub(crate) async fn update_policy(
        &self,
        id: &ResourceId,
        policy_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let changed = self.patch_changes(&schema(), id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, policy_id, from));
        }

        let desired = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let fields: Vec<&str> = changed.iter().map(String::as_str).collect();
        let patch = select_fields(&desired, &fields)?;
        self.client
            .update_policy(&self.endpoint(), policy_id, &patch)
            .await
            .map_err(|e| api_error("UpdatePolicy", id, e))?;

        self.read_policy(id, policy_id).await
    }

    pub(crate) async fn delete_policy(&self, id: &ResourceId, policy_id: &str) -> ProviderResult<()> {
        self.client
            .delete_policy(&self.endpoint(), policy_id)
            .await
            .map_err(|e| api_error("DeletePolicy", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    fn target(kind: &str) -> Value {
        let mut scope = Attributes::new();
        scope.insert("kind".to_string(), Value::from(kind));
        scope.insert("tags".to_string(), Value::List(vec![Value::from("env:prod")]));
        scope.insert("locations".to_string(), Value::List(vec![Value::from("us-east")]));

        let mut target = Attributes::new();
        target.insert("selector_kind".to_string(), Value::from("scoped"));
        target.insert("selector_scope".to_string(), Value::List(vec![Value::Map(scope)]));
        Value::Map(target)
    }

    fn desired() -> Attributes {
        let mut state = Attributes::new();
        state.insert("state".to_string(), Value::from("live"));
        let mut parameter = Attributes::new();
        parameter.insert("agent_assignment_policy_parameter".to_string(), target("agent"));

        [
            ("name", Value::from("assign-prod")),
            ("description", Value::from("prod workspaces")),
            ("location", Value::from("us-south")),
            ("state", Value::Map(state)),
            ("policy_kind", Value::from("agent_assignment_policy")),
            ("policy_target", target("workspace")),
            ("policy_parameter", Value::Map(parameter)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn schema_accepts_desired_attributes() {
        assert!(schema().validate(&desired()).is_ok());
    }

    #[test]
    fn round_trip_restores_settable_attributes() {
        let attrs = desired();
        assert_eq!(from_response(&to_request(&attrs).unwrap()), attrs);
    }

    #[test]
    fn rejects_unknown_lifecycle_state() {
        let mut attrs = desired();
        let mut state = Attributes::new();
        state.insert("state".to_string(), Value::from("archived"));
        attrs.insert("state".to_string(), Value::Map(state));
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn patch_contains_only_changed_fields() {
        let desired = to_request(&desired()).unwrap();
        let patch = select_fields(&desired, &["description"]).unwrap();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"description": "prod workspaces"}));
    }
}
