//! ibm_schematics_job - run a command against a workspace, action or environment
//!
//! Jobs are regional. Create targets the endpoint of the job's `location`;
//! afterwards the region is taken from the job id (`us-east.JOB.name.1a2b3c`).

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};

use super::LOCATIONS;
use super::variable::{read_variable, variable_list, write_variable};
use crate::convert::{AttrReader, AttrWriter};
use crate::models::{
    ActionJobRecap, ActionJobSummary, Bastion, Job, JobData, JobDataRecord, JobLogError,
    JobLogSummary, JobStatus, JobStatusRecord, RepoDownloadJob, SystemJobSummary,
    WorkspaceJobSummary,
};
use crate::provider::{SchematicsProvider, api_error, unchanged, with_local};

pub const RESOURCE_TYPE: &str = "ibm_schematics_job";

const COMMAND_OBJECTS: &[&str] = &["action", "environment", "system", "workspace"];

const COMMAND_NAMES: &[&str] = &[
    "ansible_playbook_check",
    "ansible_playbook_run",
    "create_action",
    "create_cart",
    "create_environment",
    "create_workspace",
    "delete_action",
    "delete_environment",
    "delete_workspace",
    "environment_init",
    "environment_install",
    "environment_uninstall",
    "patch_action",
    "patch_workspace",
    "put_action",
    "put_environment",
    "put_workspace",
    "repository_process",
    "system_key_delete",
    "system_key_disable",
    "system_key_enable",
    "system_key_restore",
    "system_key_rotate",
    "workspace_apply",
    "workspace_destroy",
    "workspace_plan",
    "workspace_refresh",
];

// =============================================================================
// Schema
// =============================================================================

fn strings(block: BlockSchema, names: &[&str]) -> BlockSchema {
    names.iter().fold(block, |b, name| {
        b.attribute(AttributeSchema::new(*name, AttributeType::String))
    })
}

fn numbers(block: BlockSchema, names: &[&str]) -> BlockSchema {
    names.iter().fold(block, |b, name| {
        b.attribute(AttributeSchema::new(*name, AttributeType::Float))
    })
}

fn status_block() -> BlockSchema {
    let record = || {
        AttributeType::block(strings(
            BlockSchema::new(),
            &[
                "workspace_name",
                "action_name",
                "flow_id",
                "flow_name",
                "status_code",
                "status_message",
                "bastion_status_code",
                "targets_status_code",
                "updated_at",
            ],
        ))
    };
    BlockSchema::new()
        .attribute(AttributeSchema::new("workspace_job_status", record()))
        .attribute(AttributeSchema::new("action_job_status", record()))
        .attribute(AttributeSchema::new("system_job_status", record()))
        .attribute(AttributeSchema::new("flow_job_status", record()))
}

fn data_block() -> BlockSchema {
    let record = || {
        let block = strings(
            BlockSchema::new(),
            &[
                "workspace_name",
                "action_name",
                "flow_id",
                "flow_name",
                "key_id",
                "updated_at",
            ],
        );
        AttributeType::block(
            block
                .attribute(AttributeSchema::new("inputs", variable_list()))
                .attribute(AttributeSchema::new("outputs", variable_list()))
                .attribute(AttributeSchema::new("settings", variable_list())),
        )
    };
    BlockSchema::new()
        .attribute(AttributeSchema::new("job_type", AttributeType::String))
        .attribute(AttributeSchema::new("workspace_job_data", record()))
        .attribute(AttributeSchema::new("action_job_data", record()))
        .attribute(AttributeSchema::new("system_job_data", record()))
}

fn log_summary_block() -> BlockSchema {
    let summary = strings(
        BlockSchema::new(),
        &["job_id", "job_type", "log_start_at", "log_analyzed_till"],
    );
    numbers(summary, &["elapsed_time"])
        .attribute(AttributeSchema::new(
            "log_errors",
            AttributeType::block_list(numbers(
                strings(BlockSchema::new(), &["error_code", "error_msg"]),
                &["error_count"],
            )),
        ))
        .attribute(AttributeSchema::new(
            "repo_download_job",
            AttributeType::block(numbers(
                strings(
                    BlockSchema::new(),
                    &["detected_filetype", "inputs_count", "outputs_count"],
                ),
                &["scanned_file_count", "quarantined_file_count"],
            )),
        ))
        .attribute(AttributeSchema::new(
            "workspace_job",
            AttributeType::block(numbers(
                BlockSchema::new(),
                &["resources_add", "resources_modify", "resources_destroy"],
            )),
        ))
        .attribute(AttributeSchema::new(
            "action_job",
            AttributeType::block(
                numbers(BlockSchema::new(), &["target_count", "task_count", "play_count"])
                    .attribute(AttributeSchema::new(
                        "recap",
                        AttributeType::block(
                            numbers(
                                BlockSchema::new(),
                                &["ok", "changed", "failed", "skipped", "unreachable"],
                            )
                            .attribute(AttributeSchema::new("target", AttributeType::string_list())),
                        ),
                    )),
            ),
        ))
        .attribute(AttributeSchema::new(
            "system_job",
            AttributeType::block(numbers(
                BlockSchema::new(),
                &["target_count", "success", "failed"],
            )),
        ))
}

pub fn schema() -> ResourceSchema {
    let computed = |name: &str| AttributeSchema::new(name, AttributeType::String).computed();

    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A Schematics job")
        .attribute(
            AttributeSchema::new("command_object", AttributeType::enumeration(COMMAND_OBJECTS))
                .required()
                .with_description("Name of the Schematics automation resource"),
        )
        .attribute(
            AttributeSchema::new("command_object_id", AttributeType::String)
                .required()
                .with_description("Job command object id (workspace-id, action-id)"),
        )
        .attribute(
            AttributeSchema::new("command_name", AttributeType::enumeration(COMMAND_NAMES))
                .required(),
        )
        .attribute(
            AttributeSchema::new("command_parameter", AttributeType::String)
                .local_only()
                .with_description("Schematics job command parameter (playbook-name)"),
        )
        .attribute(AttributeSchema::new("command_options", AttributeType::string_list()))
        .attribute(AttributeSchema::new("job_inputs", variable_list()))
        .attribute(AttributeSchema::new("job_env_settings", variable_list()))
        .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
        .attribute(
            AttributeSchema::new("location", AttributeType::enumeration(LOCATIONS))
                .optional_computed(),
        )
        .attribute(AttributeSchema::new(
            "bastion",
            AttributeType::block(strings(BlockSchema::new(), &["name", "host"])),
        ))
        .attribute(AttributeSchema::new("status", AttributeType::block(status_block())).computed())
        .attribute(AttributeSchema::new("data", AttributeType::block(data_block())).computed())
        .attribute(
            AttributeSchema::new("log_summary", AttributeType::block(log_summary_block()))
                .computed(),
        )
        .attribute(computed("name"))
        .attribute(computed("description"))
        .attribute(computed("resource_group"))
        .attribute(computed("submitted_at"))
        .attribute(computed("submitted_by"))
        .attribute(computed("start_at"))
        .attribute(computed("end_at"))
        .attribute(computed("duration"))
        .attribute(computed("log_store_url"))
        .attribute(computed("state_store_url"))
        .attribute(computed("results_url"))
        .attribute(computed("updated_at"))
}

// =============================================================================
// Converters
// =============================================================================

pub fn to_request(attrs: &Attributes) -> ProviderResult<Job> {
    let r = AttrReader::new(attrs);
    Ok(Job {
        command_object: r.string("command_object")?,
        command_object_id: r.string("command_object_id")?,
        command_name: r.string("command_name")?,
        command_parameter: r.string("command_parameter")?,
        command_options: r.strings("command_options")?,
        inputs: r.blocks("job_inputs", read_variable)?,
        settings: r.blocks("job_env_settings", read_variable)?,
        tags: r.strings("tags")?,
        location: r.string("location")?,
        bastion: r.block("bastion", |b| {
            Ok(Bastion {
                name: b.string("name")?,
                host: b.string("host")?,
            })
        })?,
        ..Default::default()
    })
}

fn write_status_record(s: &JobStatusRecord) -> Attributes {
    AttrWriter::new()
        .string("workspace_name", &s.workspace_name)
        .string("action_name", &s.action_name)
        .string("flow_id", &s.flow_id)
        .string("flow_name", &s.flow_name)
        .string("status_code", &s.status_code)
        .string("status_message", &s.status_message)
        .string("bastion_status_code", &s.bastion_status_code)
        .string("targets_status_code", &s.targets_status_code)
        .string("updated_at", &s.updated_at)
        .finish()
}

fn write_status(s: &JobStatus) -> Attributes {
    AttrWriter::new()
        .block("workspace_job_status", &s.workspace_job_status, write_status_record)
        .block("action_job_status", &s.action_job_status, write_status_record)
        .block("system_job_status", &s.system_job_status, write_status_record)
        .block("flow_job_status", &s.flow_job_status, write_status_record)
        .finish()
}

fn write_data_record(d: &JobDataRecord) -> Attributes {
    AttrWriter::new()
        .string("workspace_name", &d.workspace_name)
        .string("action_name", &d.action_name)
        .string("flow_id", &d.flow_id)
        .string("flow_name", &d.flow_name)
        .string("key_id", &d.key_id)
        .blocks("inputs", &d.inputs, write_variable)
        .blocks("outputs", &d.outputs, write_variable)
        .blocks("settings", &d.settings, write_variable)
        .string("updated_at", &d.updated_at)
        .finish()
}

fn write_data(d: &JobData) -> Attributes {
    AttrWriter::new()
        .string("job_type", &d.job_type)
        .block("workspace_job_data", &d.workspace_job_data, write_data_record)
        .block("action_job_data", &d.action_job_data, write_data_record)
        .block("system_job_data", &d.system_job_data, write_data_record)
        .finish()
}

fn write_log_summary(l: &JobLogSummary) -> Attributes {
    AttrWriter::new()
        .string("job_id", &l.job_id)
        .string("job_type", &l.job_type)
        .string("log_start_at", &l.log_start_at)
        .string("log_analyzed_till", &l.log_analyzed_till)
        .float("elapsed_time", l.elapsed_time)
        .blocks("log_errors", &l.log_errors, |e: &JobLogError| {
            AttrWriter::new()
                .string("error_code", &e.error_code)
                .string("error_msg", &e.error_msg)
                .float("error_count", e.error_count)
                .finish()
        })
        .block("repo_download_job", &l.repo_download_job, |r: &RepoDownloadJob| {
            AttrWriter::new()
                .float("scanned_file_count", r.scanned_file_count)
                .float("quarantined_file_count", r.quarantined_file_count)
                .string("detected_filetype", &r.detected_filetype)
                .string("inputs_count", &r.inputs_count)
                .string("outputs_count", &r.outputs_count)
                .finish()
        })
        .block("workspace_job", &l.workspace_job, |w: &WorkspaceJobSummary| {
            AttrWriter::new()
                .float("resources_add", w.resources_add)
                .float("resources_modify", w.resources_modify)
                .float("resources_destroy", w.resources_destroy)
                .finish()
        })
        .block("action_job", &l.action_job, |a: &ActionJobSummary| {
            AttrWriter::new()
                .float("target_count", a.target_count)
                .float("task_count", a.task_count)
                .float("play_count", a.play_count)
                .block("recap", &a.recap, |r: &ActionJobRecap| {
                    AttrWriter::new()
                        .strings("target", &r.target)
                        .float("ok", r.ok)
                        .float("changed", r.changed)
                        .float("failed", r.failed)
                        .float("skipped", r.skipped)
                        .float("unreachable", r.unreachable)
                        .finish()
                })
                .finish()
        })
        .block("system_job", &l.system_job, |s: &SystemJobSummary| {
            AttrWriter::new()
                .float("target_count", s.target_count)
                .float("success", s.success)
                .float("failed", s.failed)
                .finish()
        })
        .finish()
}

pub fn from_response(job: &Job) -> Attributes {
    AttrWriter::new()
        .string("command_object", &job.command_object)
        .string("command_object_id", &job.command_object_id)
        .string("command_name", &job.command_name)
        .string("command_parameter", &job.command_parameter)
        .strings("command_options", &job.command_options)
        .blocks("job_inputs", &job.inputs, write_variable)
        .blocks("job_env_settings", &job.settings, write_variable)
        .strings("tags", &job.tags)
        .string("location", &job.location)
        .block("bastion", &job.bastion, |b| {
            AttrWriter::new()
                .string("name", &b.name)
                .string("host", &b.host)
                .finish()
        })
        .block("status", &job.status, write_status)
        .block("data", &job.data, write_data)
        .block("log_summary", &job.log_summary, write_log_summary)
        .string("name", &job.name)
        .string("description", &job.description)
        .string("resource_group", &job.resource_group)
        .string("submitted_at", &job.submitted_at)
        .string("submitted_by", &job.submitted_by)
        .string("start_at", &job.start_at)
        .string("end_at", &job.end_at)
        .string("duration", &job.duration)
        .string("log_store_url", &job.log_store_url)
        .string("state_store_url", &job.state_store_url)
        .string("results_url", &job.results_url)
        .string("updated_at", &job.updated_at)
        .finish()
}

// =============================================================================
// Operations
// =============================================================================

impl SchematicsProvider {
    pub(crate) async fn read_job(&self, id: &ResourceId, job_id: &str) -> ProviderResult<State> {
        let endpoint = self.config.endpoint_for_id(job_id);
        match self.client.get_job(&endpoint, job_id).await {
            Ok(job) => Ok(State::existing(id.clone(), from_response(&job)).with_identifier(job_id)),
            Err(e) if e.is_not_found() => {
                log::debug!("job {} is gone", job_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetJob", id, e)),
        }
    }

    pub(crate) async fn create_job(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let endpoint = self.config.endpoint_for(request.location.as_deref());

        let created = self
            .client
            .create_job(&endpoint, &request)
            .await
            .map_err(|e| api_error("CreateJob", id, e))?;
        let job_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no job id")
                .for_resource(id.clone())
                .during("CreateJob")
        })?;
        log::info!("created job {} ({})", id.name, job_id);

        let state = self.read_job(id, &job_id).await?;
        Ok(with_local(&schema(), state, &resource.attributes))
    }

    /// Replace the job definition when any settable attribute changed
    pub(crate) async fn update_job(
        &self,
        id: &ResourceId,
        job_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let schema = schema();
        let changed = self.changes(&schema, id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, job_id, from));
        }

        let request = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;
        self.client
            .update_job(&self.config.endpoint_for_id(job_id), job_id, &request)
            .await
            .map_err(|e| api_error("UpdateJob", id, e))?;

        let state = self.read_job(id, job_id).await?;
        Ok(with_local(&schema, state, &to.attributes))
    }

    pub(crate) async fn delete_job(&self, id: &ResourceId, job_id: &str) -> ProviderResult<()> {
        self.client
            .delete_job(&self.config.endpoint_for_id(job_id), job_id)
            .await
            .map_err(|e| api_error("DeleteJob", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    fn desired() -> Attributes {
        let mut input = Attributes::new();
        input.insert("name".to_string(), Value::from("dry_run"));
        input.insert("value".to_string(), Value::from("true"));
        let mut bastion = Attributes::new();
        bastion.insert("name".to_string(), Value::from("jump"));
        bastion.insert("host".to_string(), Value::from("10.0.0.4"));

        [
            ("command_object", Value::from("action")),
            ("command_object_id", Value::from("us-east.ACTION.deploy.1a2b")),
            ("command_name", Value::from("ansible_playbook_run")),
            ("command_parameter", Value::from("site.yml")),
            ("command_options", Value::List(vec![Value::from("--check")])),
            ("job_inputs", Value::List(vec![Value::Map(input)])),
            ("location", Value::from("us-east")),
            ("bastion", Value::Map(bastion)),
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
    fn rejects_unknown_command_name() {
        let mut attrs = desired();
        attrs.insert("command_name".to_string(), Value::from("workspace_import"));
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn round_trip_restores_settable_attributes() {
        let attrs = desired();
        assert_eq!(from_response(&to_request(&attrs).unwrap()), attrs);
    }

    #[test]
    fn attribute_names_map_to_wire_names() {
        let json = serde_json::to_value(to_request(&desired()).unwrap()).unwrap();
        assert!(json.get("inputs").is_some());
        assert!(json.get("job_inputs").is_none());
        assert!(json.get("settings").is_none());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn status_and_log_summary_are_read_back() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "us-east.JOB.deploy.5f6e",
            "status": {"action_job_status": {"action_name": "deploy", "status_code": "job_finished"}},
            "log_summary": {"elapsed_time": 12.5, "action_job": {"play_count": 1, "recap": {"ok": 3}}}
        }))
        .unwrap();

        let attrs = from_response(&job);
        let status = attrs["status"].as_map().unwrap()["action_job_status"]
            .as_map()
            .unwrap();
        assert_eq!(status["status_code"], Value::from("job_finished"));
        let summary = attrs["log_summary"].as_map().unwrap();
        assert_eq!(summary["elapsed_time"], Value::Float(12.5));
    }
}
