//! ibm_schematics_agent - register and manage a Schematics agent

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};
use schematics_core::wait;

use super::variable::{read_variable, variable_list, write_variable};
use crate::convert::{AttrReader, AttrWriter, overlay_fields, select_fields};
use crate::job_status;
use crate::models::{
    Agent, AgentConnectionState, AgentInfrastructure, AgentKpi, AgentMetadataInfo,
    AgentSystemState, RecentAgentJob, UserState,
};
use crate::provider::{SchematicsProvider, api_error, poll_error, unchanged, with_local};

pub const RESOURCE_TYPE: &str = "ibm_schematics_agent";

/// Fields copied from the current agent into an update request
const UPDATE_BASE_FIELDS: &[&str] = &[
    "name",
    "resource_group",
    "version",
    "schematics_location",
    "agent_location",
    "agent_infrastructure",
    "description",
    "tags",
    "agent_metadata",
    "agent_inputs",
    "user_state",
    "agent_kpi",
];

// =============================================================================
// Schema
// =============================================================================

fn infrastructure_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("infra_type", AttributeType::String)
                .with_description("Type of target agent infrastructure"),
        )
        .attribute(AttributeSchema::new("cluster_id", AttributeType::String))
        .attribute(AttributeSchema::new("cluster_resource_group", AttributeType::String))
        .attribute(AttributeSchema::new("cos_instance_name", AttributeType::String))
        .attribute(AttributeSchema::new("cos_bucket_name", AttributeType::String))
        .attribute(AttributeSchema::new("cos_bucket_region", AttributeType::String))
}

fn user_state_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("state", AttributeType::enumeration(&["disable", "enable"]))
                .optional_computed(),
        )
        .attribute(AttributeSchema::new("set_by", AttributeType::String).computed())
        .attribute(AttributeSchema::new("set_at", AttributeType::String).computed())
}

fn kpi_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("availability_indicator", AttributeType::String))
        .attribute(AttributeSchema::new("lifecycle_indicator", AttributeType::String))
        .attribute(AttributeSchema::new("percent_usage_indicator", AttributeType::String))
        .attribute(AttributeSchema::new(
            "application_indicators",
            AttributeType::List(Box::new(types::string_map())),
        ))
        .attribute(AttributeSchema::new(
            "infra_indicators",
            AttributeType::List(Box::new(types::string_map())),
        ))
}

fn recent_job_block(with_redeploy: bool) -> BlockSchema {
    let block = BlockSchema::new()
        .attribute(AttributeSchema::new("agent_id", AttributeType::String))
        .attribute(AttributeSchema::new("job_id", AttributeType::String))
        .attribute(AttributeSchema::new("updated_at", AttributeType::String))
        .attribute(AttributeSchema::new("updated_by", AttributeType::String))
        .attribute(AttributeSchema::new("agent_version", AttributeType::String))
        .attribute(AttributeSchema::new("status_code", AttributeType::String))
        .attribute(AttributeSchema::new("status_message", AttributeType::String))
        .attribute(AttributeSchema::new("log_url", AttributeType::String));
    if with_redeploy {
        block.attribute(AttributeSchema::new("is_redeployed", AttributeType::Bool))
    } else {
        block
    }
}

fn computed_block(name: &str, block: BlockSchema) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::block(block)).computed()
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A Schematics agent that runs jobs in the operator's infrastructure")
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .with_description("The name of the agent"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("resource_group", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("version", AttributeType::String)
                .required()
                .with_description("Agent version"),
        )
        .attribute(AttributeSchema::new("schematics_location", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("agent_location", AttributeType::String)
                .required()
                .with_description("The location where the agent is deployed in the user environment"),
        )
        .attribute(
            AttributeSchema::new(
                "agent_infrastructure",
                AttributeType::block(infrastructure_block()),
            )
            .required(),
        )
        .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
        .attribute(AttributeSchema::new(
            "agent_metadata",
            AttributeType::block_list(
                BlockSchema::new()
                    .attribute(AttributeSchema::new("name", AttributeType::String))
                    .attribute(AttributeSchema::new("value", AttributeType::string_list())),
            ),
        ))
        .attribute(AttributeSchema::new("agent_inputs", variable_list()).force_new())
        .attribute(
            AttributeSchema::new("user_state", AttributeType::block(user_state_block()))
                .optional_computed()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("run_destroy_resources", types::non_negative_int())
                .local_only()
                .with_description(
                    "Change this value to destroy the resources created by the agent deployment",
                ),
        )
        .attribute(computed_block("agent_kpi", kpi_block()))
        .attribute(computed_block(
            "system_state",
            BlockSchema::new()
                .attribute(AttributeSchema::new("status_code", AttributeType::String))
                .attribute(AttributeSchema::new("status_message", AttributeType::String)),
        ))
        .attribute(computed_block(
            "connection_state",
            BlockSchema::new()
                .attribute(AttributeSchema::new("state", AttributeType::String))
                .attribute(AttributeSchema::new("checked_at", AttributeType::String)),
        ))
        .attribute(AttributeSchema::new("agent_crn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("creation_by", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_by", AttributeType::String).computed())
        .attribute(computed_block("recent_prs_job", recent_job_block(false)))
        .attribute(computed_block("recent_deploy_job", recent_job_block(true)))
        .attribute(computed_block("recent_health_job", recent_job_block(false)))
        .attribute(computed_block("recent_destroy_job", recent_job_block(false)))
}

// =============================================================================
// Converters
// =============================================================================

pub fn to_request(attrs: &Attributes) -> ProviderResult<Agent> {
    let r = AttrReader::new(attrs);
    Ok(Agent {
        name: r.string("name")?,
        description: r.string("description")?,
        resource_group: r.string("resource_group")?,
        version: r.string("version")?,
        schematics_location: r.string("schematics_location")?,
        agent_location: r.string("agent_location")?,
        agent_infrastructure: r.block("agent_infrastructure", |b| {
            Ok(AgentInfrastructure {
                infra_type: b.string("infra_type")?,
                cluster_id: b.string("cluster_id")?,
                cluster_resource_group: b.string("cluster_resource_group")?,
                cos_instance_name: b.string("cos_instance_name")?,
                cos_bucket_name: b.string("cos_bucket_name")?,
                cos_bucket_region: b.string("cos_bucket_region")?,
            })
        })?,
        tags: r.strings("tags")?,
        agent_metadata: r.blocks("agent_metadata", |b| {
            Ok(AgentMetadataInfo {
                name: b.string("name")?,
                value: b.strings("value")?,
            })
        })?,
        agent_inputs: r.blocks("agent_inputs", read_variable)?,
        user_state: r.block("user_state", |b| {
            Ok(UserState {
                state: b.string("state")?,
                ..Default::default()
            })
        })?,
        ..Default::default()
    })
}

fn write_recent_job(job: &RecentAgentJob) -> Attributes {
    AttrWriter::new()
        .string("agent_id", &job.agent_id)
        .string("job_id", &job.job_id)
        .string("updated_at", &job.updated_at)
        .string("updated_by", &job.updated_by)
        .string("agent_version", &job.agent_version)
        .bool("is_redeployed", job.is_redeployed)
        .string("status_code", &job.status_code)
        .string("status_message", &job.status_message)
        .string("log_url", &job.log_url)
        .finish()
}

pub fn from_response(agent: &Agent) -> Attributes {
    AttrWriter::new()
        .string("name", &agent.name)
        .string("description", &agent.description)
        .string("resource_group", &agent.resource_group)
        .string("version", &agent.version)
        .string("schematics_location", &agent.schematics_location)
        .string("agent_location", &agent.agent_location)
        .block("agent_infrastructure", &agent.agent_infrastructure, |i| {
            AttrWriter::new()
                .string("infra_type", &i.infra_type)
                .string("cluster_id", &i.cluster_id)
                .string("cluster_resource_group", &i.cluster_resource_group)
                .string("cos_instance_name", &i.cos_instance_name)
                .string("cos_bucket_name", &i.cos_bucket_name)
                .string("cos_bucket_region", &i.cos_bucket_region)
                .finish()
        })
        .strings("tags", &agent.tags)
        .blocks("agent_metadata", &agent.agent_metadata, |m| {
            AttrWriter::new()
                .string("name", &m.name)
                .strings("value", &m.value)
                .finish()
        })
        .blocks("agent_inputs", &agent.agent_inputs, write_variable)
        .block("user_state", &agent.user_state, |s| {
            AttrWriter::new()
                .string("state", &s.state)
                .string("set_by", &s.set_by)
                .string("set_at", &s.set_at)
                .finish()
        })
        .block("agent_kpi", &agent.agent_kpi, |k: &AgentKpi| {
            AttrWriter::new()
                .string("availability_indicator", &k.availability_indicator)
                .string("lifecycle_indicator", &k.lifecycle_indicator)
                .string("percent_usage_indicator", &k.percent_usage_indicator)
                .json_list("application_indicators", &k.application_indicators)
                .json_list("infra_indicators", &k.infra_indicators)
                .finish()
        })
        .block("system_state", &agent.system_state, |s: &AgentSystemState| {
            AttrWriter::new()
                .string("status_code", &s.status_code)
                .string("status_message", &s.status_message)
                .finish()
        })
        .block(
            "connection_state",
            &agent.connection_state,
            |s: &AgentConnectionState| {
                AttrWriter::new()
                    .string("state", &s.state)
                    .string("checked_at", &s.checked_at)
                    .finish()
            },
        )
        .string("agent_crn", &agent.agent_crn)
        .string("created_at", &agent.created_at)
        .string("creation_by", &agent.creation_by)
        .string("updated_at", &agent.updated_at)
        .string("updated_by", &agent.updated_by)
        .block("recent_prs_job", &agent.recent_prs_job, write_recent_job)
        .block("recent_deploy_job", &agent.recent_deploy_job, write_recent_job)
        .block("recent_health_job", &agent.recent_health_job, write_recent_job)
        .block("recent_destroy_job", &agent.recent_destroy_job, write_recent_job)
        .finish()
}

/// Wire fields sent when `changed` attributes are updated
fn update_fields(changed: &[String]) -> Vec<&'static str> {
    let mut fields = Vec::new();
    for attr in changed {
        match attr.as_str() {
            // The service validates the two locations together
            "schematics_location" | "agent_location" => {
                fields.extend(["schematics_location", "agent_location"])
            }
            "name" => fields.push("name"),
            "version" => fields.push("version"),
            "agent_infrastructure" => fields.push("agent_infrastructure"),
            "description" => fields.push("description"),
            "tags" => fields.push("tags"),
            "agent_metadata" => fields.push("agent_metadata"),
            _ => {}
        }
    }
    fields.sort_unstable();
    fields.dedup();
    fields
}

// =============================================================================
// Operations
// =============================================================================

impl SchematicsProvider {
    pub(crate) async fn read_agent(&self, id: &ResourceId, agent_id: &str) -> ProviderResult<State> {
        match self.client.get_agent(&self.endpoint(), agent_id).await {
            Ok(agent) => {
                Ok(State::existing(id.clone(), from_response(&agent)).with_identifier(agent_id))
            }
            Err(e) if e.is_not_found() => {
                log::debug!("agent {} is gone", agent_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetAgent", id, e)),
        }
    }

    pub(crate) async fn create_agent(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;

        let created = self
            .client
            .create_agent(&self.endpoint(), &request)
            .await
            .map_err(|e| api_error("CreateAgent", id, e))?;
        let agent_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no agent id")
                .for_resource(id.clone())
                .during("CreateAgent")
        })?;
        log::info!("created agent {} ({})", id.name, agent_id);

        let state = self.read_agent(id, &agent_id).await?;
        Ok(with_local(&schema(), state, &resource.attributes))
    }

    pub(crate) async fn update_agent(
        &self,
        id: &ResourceId,
        agent_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let schema = schema();
        let changed = self.changes(&schema, id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, agent_id, from));
        }

        let endpoint = self.endpoint();
        let current = match self.client.get_agent(&endpoint, agent_id).await {
            Ok(agent) => agent,
            Err(e) if e.is_not_found() => return Ok(State::not_found(id.clone())),
            Err(e) => return Err(api_error("GetAgent", id, e)),
        };

        if changed.iter().any(|c| c == "run_destroy_resources") {
            self.destroy_agent_resources(id, agent_id, self.config.timeouts.update)
                .await;
        }

        let fields = update_fields(&changed);
        if !fields.is_empty() {
            let desired = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;
            let base = select_fields(&current, UPDATE_BASE_FIELDS)?;
            let request = overlay_fields(&base, &desired, &fields)?;
            self.client
                .update_agent(&endpoint, agent_id, &request)
                .await
                .map_err(|e| api_error("UpdateAgent", id, e))?;
        }

        let state = self.read_agent(id, agent_id).await?;
        Ok(with_local(&schema, state, &to.attributes))
    }

    pub(crate) async fn delete_agent(&self, id: &ResourceId, agent_id: &str) -> ProviderResult<()> {
        self.destroy_agent_resources(id, agent_id, self.config.timeouts.delete)
            .await;

        self.client
            .delete_agent(&self.endpoint(), agent_id)
            .await
            .map_err(|e| api_error("DeleteAgent", id, e))
    }

    /// Destroy what the agent deployment created and wait for the destroy job
    ///
    /// Failures are logged and otherwise ignored.
    async fn destroy_agent_resources(
        &self,
        id: &ResourceId,
        agent_id: &str,
        timeout: std::time::Duration,
    ) {
        let endpoint = self.endpoint();
        if let Err(e) = self.client.delete_agent_resources(&endpoint, agent_id).await {
            log::warn!("{}", api_error("DeleteAgentResources", id, e));
            return;
        }

        log::info!("waiting for resources of agent {} to be destroyed", agent_id);
        let waited = wait::poll(
            || self.client.get_agent(&endpoint, agent_id),
            |agent| job_status::classify(job_status::destroy_status(agent)),
            &self.config.poll_options(timeout),
            &self.cancel,
        )
        .await;
        if let Err(e) = waited {
            log::warn!("{}", poll_error("WaitForAgentDestroyResources", id, e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    fn desired() -> Attributes {
        let mut infra = Attributes::new();
        infra.insert("infra_type".to_string(), Value::from("ibm_kubernetes"));
        infra.insert("cluster_id".to_string(), Value::from("cl-1"));

        let mut user_state = Attributes::new();
        user_state.insert("state".to_string(), Value::from("enable"));

        let mut metadata = Attributes::new();
        metadata.insert("name".to_string(), Value::from("purpose"));
        metadata.insert(
            "value".to_string(),
            Value::List(vec![Value::from("git"), Value::from("terraform")]),
        );

        let mut input = Attributes::new();
        input.insert("name".to_string(), Value::from("region"));
        input.insert("value".to_string(), Value::from("us-south"));

        [
            ("name", Value::from("agent-1")),
            ("resource_group", Value::from("Default")),
            ("version", Value::from("1.0.0")),
            ("schematics_location", Value::from("us-south")),
            ("agent_location", Value::from("eu-de")),
            ("agent_infrastructure", Value::Map(infra)),
            ("tags", Value::List(vec![Value::from("env:dev")])),
            ("agent_metadata", Value::List(vec![Value::Map(metadata)])),
            ("agent_inputs", Value::List(vec![Value::Map(input)])),
            ("user_state", Value::Map(user_state)),
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
        let back = from_response(&to_request(&attrs).unwrap());
        assert_eq!(back, attrs);
    }

    #[test]
    fn unset_attributes_are_not_sent() {
        let mut attrs = Attributes::new();
        attrs.insert("name".to_string(), Value::from("agent-1"));
        let json = serde_json::to_value(to_request(&attrs).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"name": "agent-1"}));
    }

    #[test]
    fn run_destroy_resources_is_never_sent() {
        let mut attrs = desired();
        attrs.insert("run_destroy_resources".to_string(), Value::Int(1));
        let json = serde_json::to_value(to_request(&attrs).unwrap()).unwrap();
        assert!(json.get("run_destroy_resources").is_none());
    }

    #[test]
    fn locations_are_updated_together() {
        let fields = update_fields(&["agent_location".to_string(), "name".to_string()]);
        assert_eq!(fields, vec!["agent_location", "name", "schematics_location"]);
        assert!(update_fields(&["run_destroy_resources".to_string()]).is_empty());
    }

    #[test]
    fn computed_blocks_are_read_back() {
        let agent: Agent = serde_json::from_value(serde_json::json!({
            "id": "agent-1234",
            "name": "agent-1",
            "system_state": {"status_code": "error", "status_message": "down"},
            "recent_deploy_job": {"job_id": "j1", "is_redeployed": false, "status_code": "job_finished"},
            "agent_kpi": {"availability_indicator": "available", "infra_indicators": [{"cpu": "low"}]}
        }))
        .unwrap();

        let attrs = from_response(&agent);
        let deploy = attrs["recent_deploy_job"].as_map().unwrap();
        assert_eq!(deploy["status_code"], Value::from("job_finished"));
        assert_eq!(deploy["is_redeployed"], Value::Bool(false));
        let kpi = attrs["agent_kpi"].as_map().unwrap();
        assert_eq!(kpi["infra_indicators"].as_list().unwrap().len(), 1);
        assert!(!attrs.contains_key("id"));
    }
}
