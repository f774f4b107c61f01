//! Agent job triggers: ibm_schematics_agent_deploy, _health and _prs
//!
//! Creating one of these resources starts the job on the agent and waits for
//! it to reach a terminal status. The resource identity is `agentID/jobID`.
//! There is nothing to delete remotely.

use std::time::Duration;

use schematics_core::provider::{ErrorKind, ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use schematics_core::wait;

use crate::convert::{AttrReader, AttrWriter};
use crate::job_status;
use crate::models::{AgentJob, AgentJobKind};
use crate::provider::{SchematicsProvider, api_error, poll_error, unchanged, with_local};

pub const DEPLOY_TYPE: &str = "ibm_schematics_agent_deploy";
pub const HEALTH_TYPE: &str = "ibm_schematics_agent_health";
pub const PRS_TYPE: &str = "ibm_schematics_agent_prs";

/// The job kind behind a resource type name
pub fn kind_of(resource_type: &str) -> Option<AgentJobKind> {
    match resource_type {
        DEPLOY_TYPE => Some(AgentJobKind::Deploy),
        HEALTH_TYPE => Some(AgentJobKind::Health),
        PRS_TYPE => Some(AgentJobKind::Prs),
        _ => None,
    }
}

fn resource_type(kind: AgentJobKind) -> &'static str {
    match kind {
        AgentJobKind::Deploy => DEPLOY_TYPE,
        AgentJobKind::Health => HEALTH_TYPE,
        AgentJobKind::Prs => PRS_TYPE,
    }
}

/// (trigger, wait) operation names used in errors
fn operations(kind: AgentJobKind) -> (&'static str, &'static str) {
    match kind {
        AgentJobKind::Deploy => ("DeployAgentJob", "WaitForAgentDeploy"),
        AgentJobKind::Health => ("HealthCheckAgentJob", "WaitForAgentHealthCheck"),
        AgentJobKind::Prs => ("PrsAgentJob", "WaitForAgentPrs"),
    }
}

pub fn schema(kind: AgentJobKind) -> ResourceSchema {
    let description = match kind {
        AgentJobKind::Deploy => "Deploys an agent",
        AgentJobKind::Health => "Runs a health check on an agent",
        AgentJobKind::Prs => "Runs the prerequisite scan of an agent",
    };
    let computed = |name: &str| AttributeSchema::new(name, AttributeType::String).computed();

    let schema = ResourceSchema::new(resource_type(kind))
        .with_description(description)
        .attribute(
            AttributeSchema::new("agent_id", AttributeType::String)
                .required()
                .with_description("Agent ID to run the job on"),
        )
        .attribute(
            AttributeSchema::new("force", AttributeType::Bool)
                .local_only()
                .with_description("Run the job even if the agent is in a failed state"),
        )
        .attribute(computed("job_id"))
        .attribute(computed("agent_version"))
        .attribute(computed("status_code"))
        .attribute(computed("status_message"))
        .attribute(computed("log_url"))
        .attribute(computed("updated_at"))
        .attribute(computed("updated_by"));

    match kind {
        AgentJobKind::Deploy => schema.attribute(
            AttributeSchema::new("is_redeployed", AttributeType::Bool).computed(),
        ),
        _ => schema,
    }
}

pub fn from_response(agent_id: &str, job: &AgentJob) -> Attributes {
    let mut attrs = AttrWriter::new()
        .string("job_id", &job.job_identity().map(str::to_string))
        .string("agent_version", &job.agent_version)
        .bool("is_redeployed", job.is_redeployed)
        .string("status_code", &job.status_code)
        .string("status_message", &job.status_message)
        .string("log_url", &job.log_url)
        .string("updated_at", &job.updated_at)
        .string("updated_by", &job.updated_by)
        .finish();
    attrs.insert("agent_id".to_string(), agent_id.into());
    attrs
}

/// Split an `agentID/jobID` identity
fn agent_of(identifier: &str) -> &str {
    identifier
        .split_once('/')
        .map_or(identifier, |(agent_id, _)| agent_id)
}

impl SchematicsProvider {
    pub(crate) async fn read_agent_job(
        &self,
        id: &ResourceId,
        kind: AgentJobKind,
        identifier: &str,
    ) -> ProviderResult<State> {
        let agent_id = agent_of(identifier);
        match self
            .client
            .get_agent_job(&self.endpoint(), agent_id, kind)
            .await
        {
            Ok(job) => Ok(State::existing(id.clone(), from_response(agent_id, &job))
                .with_identifier(identifier)),
            Err(e) if e.is_not_found() => {
                log::debug!("{} job of agent {} is gone", kind.segment(), agent_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error(&format!("Get{}", operations(kind).0), id, e)),
        }
    }

    pub(crate) async fn trigger_agent_job(
        &self,
        resource: &Resource,
        kind: AgentJobKind,
    ) -> ProviderResult<State> {
        self.run_agent_job(&resource.id, kind, &resource.attributes, self.config.timeouts.create)
            .await
    }

    /// Any change to `agent_id` or `force` runs the job again
    pub(crate) async fn retrigger_agent_job(
        &self,
        id: &ResourceId,
        identifier: &str,
        kind: AgentJobKind,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let changed = self.changes(&schema(kind), id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, identifier, from));
        }
        self.run_agent_job(id, kind, &to.attributes, self.config.timeouts.update)
            .await
    }

    async fn run_agent_job(
        &self,
        id: &ResourceId,
        kind: AgentJobKind,
        desired: &Attributes,
        timeout: Duration,
    ) -> ProviderResult<State> {
        let (trigger_op, wait_op) = operations(kind);
        let r = AttrReader::new(desired);
        let agent_id = r
            .string("agent_id")
            .map_err(|e| e.for_resource(id.clone()))?
            .ok_or_else(|| {
                ProviderError::new("agent_id is required")
                    .kind(ErrorKind::Validation)
                    .for_resource(id.clone())
            })?;
        let force = r.bool("force").map_err(|e| e.for_resource(id.clone()))?;

        let endpoint = self.endpoint();
        let triggered = self
            .client
            .trigger_agent_job(&endpoint, &agent_id, kind, force)
            .await
            .map_err(|e| api_error(trigger_op, id, e))?;
        let job_id = triggered.job_identity().ok_or_else(|| {
            ProviderError::new("trigger response carried no job id")
                .for_resource(id.clone())
                .during(trigger_op)
        })?;
        let identifier = format!("{}/{}", agent_id, job_id);
        log::info!("started {} job {}", kind.segment(), identifier);

        let job = wait::poll(
            || self.client.get_agent_job(&endpoint, &agent_id, kind),
            |job| job_status::classify(job_status::trigger_status(job)),
            &self.config.poll_options(timeout),
            &self.cancel,
        )
        .await
        .map_err(|e| poll_error(wait_op, id, e))?;
        log::info!(
            "{} job {} finished with status '{}'",
            kind.segment(),
            identifier,
            job_status::trigger_status(&job)
        );

        let state =
            State::existing(id.clone(), from_response(&agent_id, &job)).with_identifier(identifier);
        Ok(with_local(&schema(kind), state, desired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    #[test]
    fn resource_types_map_to_kinds() {
        assert_eq!(kind_of("ibm_schematics_agent_deploy"), Some(AgentJobKind::Deploy));
        assert_eq!(kind_of("ibm_schematics_agent_prs"), Some(AgentJobKind::Prs));
        assert_eq!(kind_of("ibm_schematics_agent"), None);
    }

    #[test]
    fn only_deploy_reports_redeploys() {
        assert!(schema(AgentJobKind::Deploy).attributes.contains_key("is_redeployed"));
        assert!(!schema(AgentJobKind::Health).attributes.contains_key("is_redeployed"));
    }

    #[test]
    fn identity_is_agent_slash_job() {
        assert_eq!(agent_of("agent-1/job-9"), "agent-1");
        assert_eq!(agent_of("agent-1"), "agent-1");
    }

    #[test]
    fn response_keeps_agent_id_settable() {
        let job = AgentJob {
            job_id: Some("job-9".to_string()),
            status_code: Some("job_finished".to_string()),
            ..Default::default()
        };
        let attrs = from_response("agent-1", &job);
        assert_eq!(attrs["agent_id"], Value::from("agent-1"));
        assert_eq!(attrs["job_id"], Value::from("job-9"));
        assert!(!attrs.contains_key("log_url"));
        assert!(schema(AgentJobKind::Prs).validate(&{
            let mut desired = Attributes::new();
            desired.insert("agent_id".to_string(), Value::from("agent-1"));
            desired.insert("force".to_string(), Value::Bool(true));
            desired
        })
        .is_ok());
    }
}
