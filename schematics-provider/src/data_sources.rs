//! Read-only lookups of existing Schematics objects
//!
//! Single-object data sources reuse the resource schemas with every attribute
//! computed. Unlike a resource read, a lookup that finds nothing is an error.

use schematics_core::provider::{ErrorKind, ProviderError, ProviderResult, ResourceType};
use schematics_core::resource::{Attributes, Resource, ResourceId, State, Value};
use schematics_core::schema::{
    AttributeMode, AttributeSchema, AttributeType, BlockSchema, ResourceSchema,
};

use crate::convert::AttrReader;
use crate::provider::{SchematicsProvider, api_error, log_error};
use crate::resources::{action, agent, inventory, job, policy, resource_query, workspace};

pub const POLICIES_TYPE: &str = "ibm_schematics_policies";

fn lookup(name: &str, description: &str) -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new(name, AttributeType::String)
            .required()
            .with_description(description),
    ]
}

pub fn agent_schema() -> ResourceSchema {
    agent::schema().into_data_source(lookup("agent_id", "Agent ID to get the details of agent"))
}

pub fn policy_schema() -> ResourceSchema {
    policy::schema().into_data_source(lookup("policy_id", "ID to get a policy"))
}

pub fn job_schema() -> ResourceSchema {
    job::schema().into_data_source(lookup("job_id", "Job Id. Use `GET /v2/jobs` API to look up the Job Ids"))
}

pub fn inventory_schema() -> ResourceSchema {
    inventory::schema().into_data_source(lookup("inventory_id", "Resource Inventory Id"))
}

pub fn resource_query_schema() -> ResourceSchema {
    resource_query::schema().into_data_source(lookup("query_id", "Resource query Id"))
}

pub fn action_schema() -> ResourceSchema {
    action::schema().into_data_source(lookup("action_id", "Action Id. Use `GET /v2/actions` API to look up the Action Ids"))
}

pub fn workspace_schema() -> ResourceSchema {
    workspace::schema().into_data_source(lookup("workspace_id", "The ID of the workspace"))
}

/// Every policy attribute plus its id, all computed
fn policy_item() -> BlockSchema {
    let mut block = BlockSchema::new()
        .attribute(AttributeSchema::new("id", AttributeType::String).computed());
    for mut attr in policy::schema().attributes.into_values() {
        attr.mode = AttributeMode::Computed;
        attr.force_new = false;
        block = block.attribute(attr);
    }
    block
}

pub fn policies_schema() -> ResourceSchema {
    ResourceSchema::new(POLICIES_TYPE)
        .with_description("Lists Schematics policies")
        .attribute(
            AttributeSchema::new(
                "policy_kind",
                AttributeType::enumeration(&["agent_assignment_policy"]),
            )
            .with_description("Only list policies of this kind"),
        )
        .attribute(AttributeSchema::new("total_count", AttributeType::Int).computed())
        .attribute(
            AttributeSchema::new("policies", AttributeType::block_list(policy_item())).computed(),
        )
}

macro_rules! define_data_source_type {
    ($name:ident, $type_name:expr, $schema:expr) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema
            }
        }
    };
}

define_data_source_type!(AgentDataSource, agent::RESOURCE_TYPE, agent_schema());
define_data_source_type!(PolicyDataSource, policy::RESOURCE_TYPE, policy_schema());
define_data_source_type!(PoliciesDataSource, POLICIES_TYPE, policies_schema());
define_data_source_type!(JobDataSource, job::RESOURCE_TYPE, job_schema());
define_data_source_type!(InventoryDataSource, inventory::RESOURCE_TYPE, inventory_schema());
define_data_source_type!(
    ResourceQueryDataSource,
    resource_query::RESOURCE_TYPE,
    resource_query_schema()
);
define_data_source_type!(ActionDataSource, action::RESOURCE_TYPE, action_schema());
define_data_source_type!(WorkspaceDataSource, workspace::RESOURCE_TYPE, workspace_schema());

/// Returns all data sources supported by this provider
pub fn data_source_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(AgentDataSource),
        Box::new(PolicyDataSource),
        Box::new(PoliciesDataSource),
        Box::new(JobDataSource),
        Box::new(InventoryDataSource),
        Box::new(ResourceQueryDataSource),
        Box::new(ActionDataSource),
        Box::new(WorkspaceDataSource),
    ]
}

fn required_lookup(r: &AttrReader<'_>, id: &ResourceId, key: &str) -> ProviderResult<String> {
    r.string(key)
        .map_err(|e| e.for_resource(id.clone()))?
        .ok_or_else(|| {
            ProviderError::new(format!("'{}' is required", key))
                .kind(ErrorKind::Validation)
                .for_resource(id.clone())
        })
}

impl SchematicsProvider {
    /// Look up an existing object
    pub async fn read_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        self.lookup_data_source(resource)
            .await
            .inspect_err(log_error)
    }

    async fn lookup_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let r = AttrReader::new(&resource.attributes);
        let endpoint = self.endpoint();

        let (key, identifier, mut attrs) = match id.resource_type.as_str() {
            agent::RESOURCE_TYPE => {
                let agent_id = required_lookup(&r, id, "agent_id")?;
                let found = self
                    .client
                    .get_agent(&endpoint, &agent_id)
                    .await
                    .map_err(|e| api_error("GetAgent", id, e))?;
                ("agent_id", agent_id, agent::from_response(&found))
            }
            policy::RESOURCE_TYPE => {
                let policy_id = required_lookup(&r, id, "policy_id")?;
                let found = self
                    .client
                    .get_policy(&endpoint, &policy_id)
                    .await
                    .map_err(|e| api_error("GetPolicy", id, e))?;
                ("policy_id", policy_id, policy::from_response(&found))
            }
            job::RESOURCE_TYPE => {
                let job_id = required_lookup(&r, id, "job_id")?;
                let found = self
                    .client
                    .get_job(&self.config.endpoint_for_id(&job_id), &job_id)
                    .await
                    .map_err(|e| api_error("GetJob", id, e))?;
                ("job_id", job_id, job::from_response(&found))
            }
            inventory::RESOURCE_TYPE => {
                let inventory_id = required_lookup(&r, id, "inventory_id")?;
                let found = self
                    .client
                    .get_inventory(&endpoint, &inventory_id)
                    .await
                    .map_err(|e| api_error("GetInventory", id, e))?;
                ("inventory_id", inventory_id, inventory::from_response(&found))
            }
            resource_query::RESOURCE_TYPE => {
                let query_id = required_lookup(&r, id, "query_id")?;
                let found = self
                    .client
                    .get_resource_query(&endpoint, &query_id)
                    .await
                    .map_err(|e| api_error("GetResourceQuery", id, e))?;
                ("query_id", query_id, resource_query::from_response(&found))
            }
            action::RESOURCE_TYPE => {
                let action_id = required_lookup(&r, id, "action_id")?;
                let found = self
                    .client
                    .get_action(&self.config.endpoint_for_id(&action_id), &action_id)
                    .await
                    .map_err(|e| api_error("GetAction", id, e))?;
                ("action_id", action_id, action::from_response(&found))
            }
            workspace::RESOURCE_TYPE => {
                let workspace_id = required_lookup(&r, id, "workspace_id")?;
                let found = self
                    .client
                    .get_workspace(&self.config.endpoint_for_id(&workspace_id), &workspace_id)
                    .await
                    .map_err(|e| api_error("GetWorkspace", id, e))?;
                ("workspace_id", workspace_id, workspace::from_response(&found))
            }
            POLICIES_TYPE => return self.list_policies(id, &r).await,
            _ => {
                return Err(ProviderError::unsupported(format!(
                    "Unknown data source: {}",
                    id.resource_type
                ))
                .for_resource(id.clone()));
            }
        };

        attrs.insert(key.to_string(), Value::String(identifier.clone()));
        Ok(State::existing(id.clone(), attrs).with_identifier(identifier))
    }

    async fn list_policies(&self, id: &ResourceId, r: &AttrReader<'_>) -> ProviderResult<State> {
        let policy_kind = r.string("policy_kind").map_err(|e| e.for_resource(id.clone()))?;
        let list = self
            .client
            .list_policies(&self.endpoint(), policy_kind.as_deref())
            .await
            .map_err(|e| api_error("ListPolicies", id, e))?;

        let policies = list
            .policies
            .iter()
            .map(|p| {
                let mut item: Attributes = policy::from_response(p);
                if let Some(ref policy_id) = p.id {
                    item.insert("id".to_string(), Value::String(policy_id.clone()));
                }
                Value::Map(item)
            })
            .collect();

        let mut attrs = Attributes::new();
        if let Some(kind) = policy_kind {
            attrs.insert("policy_kind".to_string(), Value::String(kind));
        }
        if let Some(total) = list.total_count {
            attrs.insert("total_count".to_string(), Value::Int(total));
        }
        attrs.insert("policies".to_string(), Value::List(policies));

        // A listing has no remote identity of its own
        let identifier = chrono::Utc::now().to_rfc3339();
        Ok(State::existing(id.clone(), attrs).with_identifier(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_the_only_settable_attributes() {
        let schema = agent_schema();
        let settable: Vec<_> = schema
            .attributes
            .values()
            .filter(|a| a.is_settable())
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(settable, vec!["agent_id"]);
        assert!(!schema.attributes.contains_key("run_destroy_resources"));
    }

    #[test]
    fn job_data_source_drops_command_parameter() {
        assert!(!job_schema().attributes.contains_key("command_parameter"));
        assert!(job_schema().attributes["job_id"].is_required());
    }

    #[test]
    fn github_token_is_not_exposed_by_lookups() {
        for schema in [action_schema(), workspace_schema()] {
            assert!(!schema.attributes.contains_key("x_github_token"));
        }
        assert!(action_schema().attributes["action_id"].is_required());
        assert!(!workspace_schema().attributes["template_type"].is_settable());
    }

    #[test]
    fn policies_list_items_carry_an_id() {
        let schema = policies_schema();
        let AttributeType::List(inner) = &schema.attributes["policies"].attr_type else {
            panic!("policies should be a list");
        };
        let AttributeType::Block(block) = inner.as_ref() else {
            panic!("policies should hold blocks");
        };
        assert!(block.attributes.contains_key("id"));
        assert!(block.attributes.values().all(|a| !a.is_settable()));
    }

    #[test]
    fn data_source_names_are_unique() {
        let mut names: Vec<_> = data_source_types().iter().map(|t| t.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
