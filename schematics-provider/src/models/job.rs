use serde::{Deserialize, Serialize};

use super::variable::VariableData;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<VariableData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<VariableData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JobData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bastion: Option<Bastion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_summary: Option<JobLogSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_store_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_store_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Per-kind status; only the record matching the command object is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_job_status: Option<JobStatusRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_job_status: Option<JobStatusRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_job_status: Option<JobStatusRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_job_status: Option<JobStatusRecord>,
}

/// Status of one job kind
///
/// The service names the status fields after the kind (`status_code` for
/// workspaces and flows, `action_status_code` for actions,
/// `system_status_code` for system jobs); all variants are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatusRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    #[serde(
        alias = "action_status_code",
        alias = "system_status_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_code: Option<String>,
    #[serde(
        alias = "action_status_message",
        alias = "system_status_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bastion_status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets_status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_job_data: Option<JobDataRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_job_data: Option<JobDataRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_job_data: Option<JobDataRecord>,
}

/// Inputs, outputs and settings captured for one job kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<VariableData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<VariableData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Vec<VariableData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bastion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobLogSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_start_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_analyzed_till: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_errors: Option<Vec<JobLogError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_download_job: Option<RepoDownloadJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_job: Option<WorkspaceJobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_job: Option<ActionJobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_job: Option<SystemJobSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobLogError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoDownloadJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_file_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantined_file_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_filetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs_count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceJobSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_add: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_modify: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_destroy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionJobSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recap: Option<ActionJobRecap>,
}

/// Playbook recap counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionJobRecap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unreachable: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemJobSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<f64>,
}
