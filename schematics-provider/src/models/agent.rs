use serde::{Deserialize, Serialize};

use super::variable::VariableData;

/// Agent registration, as sent on create/update and returned by get
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schematics_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_infrastructure: Option<AgentInfrastructure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_metadata: Option<Vec<AgentMetadataInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_inputs: Option<Vec<VariableData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_state: Option<UserState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_kpi: Option<AgentKpi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_state: Option<AgentSystemState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_state: Option<AgentConnectionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_crn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_prs_job: Option<RecentAgentJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_deploy_job: Option<RecentAgentJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_health_job: Option<RecentAgentJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_destroy_job: Option<RecentAgentJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentInfrastructure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infra_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cos_instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cos_bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cos_bucket_region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetadataInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<String>>,
}

/// State set by the operator on an agent or action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentKpi {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_indicator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_indicator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_usage_indicator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_indicators: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infra_indicators: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSystemState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConnectionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<String>,
}

/// Summary of the latest deploy / health / prs / destroy job of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentAgentJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    /// Deploy jobs only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_redeployed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}

/// Jobs that can be triggered on an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentJobKind {
    Deploy,
    Health,
    /// Prerequisite scan
    Prs,
}

impl AgentJobKind {
    /// Path segment under `/v2/agents/{id}/`
    pub fn segment(self) -> &'static str {
        match self {
            AgentJobKind::Deploy => "deploy",
            AgentJobKind::Health => "health",
            AgentJobKind::Prs => "prs",
        }
    }
}

/// Response of a deploy, health-check or prerequisite-scan trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_redeployed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl AgentJob {
    /// The job identity; older responses only carry `job_id`
    pub fn job_identity(&self) -> Option<&str> {
        self.job_id.as_deref().or(self.id.as_deref())
    }
}
