//! ibm_schematics_workspace - Terraform workspaces
//!
//! The flat attribute set maps onto three nested wire objects: the first
//! `template_data` entry, `template_repo` and `workspace_status`. Updates
//! take one of three routes, chosen by what changed:
//!
//! - template source (repository, folder, engine version): PUT the whole
//!   workspace
//! - metadata (name, tags, shared data, freeze and lock flags): PATCH
//! - template inputs (values, variables, environment): PUT the values of
//!   the workspace's template

use regex::Regex;
use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State, Value};
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use super::LOCATIONS;
use crate::convert::{AttrReader, AttrWriter, select_fields};
use crate::models::{
    CatalogRef, SharedTargetData, TemplateRepo, TemplateRuntimeData, TemplateSourceData,
    Workspace, WorkspaceInputs, WorkspaceStatus, WorkspaceVariable,
};
use crate::provider::{SchematicsProvider, api_error, reject_unset, unchanged, with_local};

pub const RESOURCE_TYPE: &str = "ibm_schematics_workspace";

const NAME_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9_ -]*$";

const TEMPLATE_TYPE_PATTERN: &str = r"^terraform_v(?:1\.4|1\.5|1\.6|1\.7|1\.8|1\.9)(?:\.\d+)?$";

/// Attributes carried in the first `template_data` entry
const TEMPLATE_DATA_ATTRS: &[&str] = &[
    "template_env_settings",
    "template_git_folder",
    "template_init_state_file",
    "template_type",
    "template_uninstall_script_name",
    "template_values",
    "template_inputs",
];

/// Attributes carried in `template_repo`
const TEMPLATE_REPO_ATTRS: &[&str] = &[
    "template_git_branch",
    "template_git_release",
    "template_git_repo_sha_value",
    "template_git_repo_url",
    "template_git_url",
    "template_git_has_uploadedgitrepotar",
];

/// Attributes carried in `workspace_status`
const STATUS_ATTRS: &[&str] = &[
    "frozen",
    "frozen_at",
    "frozen_by",
    "locked",
    "locked_by",
    "locked_time",
];

/// Changes that replace the whole workspace
const REPLACE_ATTRS: &[&str] = &[
    "catalog_ref",
    "template_git_branch",
    "template_git_folder",
    "template_git_has_uploadedgitrepotar",
    "template_git_release",
    "template_git_repo_sha_value",
    "template_git_repo_url",
    "template_git_url",
    "template_init_state_file",
    "template_ref",
    "template_type",
    "template_uninstall_script_name",
];

/// Changes sent as a PATCH
const METADATA_ATTRS: &[&str] = &[
    "applied_shareddata_ids",
    "description",
    "frozen",
    "frozen_at",
    "frozen_by",
    "locked",
    "locked_by",
    "locked_time",
    "name",
    "shared_data",
    "tags",
];

/// Changes sent to the template values endpoint
const INPUT_ATTRS: &[&str] = &["template_env_settings", "template_inputs", "template_values"];

// =============================================================================
// Schema
// =============================================================================

fn matches_pattern(pattern: &str, value: &Value) -> Result<(), String> {
    let Value::String(s) = value else {
        return Ok(());
    };
    let re = Regex::new(pattern).map_err(|e| e.to_string())?;
    if re.is_match(s) {
        Ok(())
    } else {
        Err(format!("'{}' does not match {}", s, pattern))
    }
}

fn workspace_name() -> AttributeType {
    AttributeType::Custom {
        name: "WorkspaceName".to_string(),
        base: Box::new(AttributeType::BoundedString { min: 1, max: 128 }),
        validate: |value| matches_pattern(NAME_PATTERN, value),
    }
}

fn template_type() -> AttributeType {
    AttributeType::Custom {
        name: "TemplateType".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| matches_pattern(TEMPLATE_TYPE_PATTERN, value),
    }
}

fn map_list() -> AttributeType {
    AttributeType::List(Box::new(types::string_map()))
}

fn catalog_ref_block() -> BlockSchema {
    [
        "owning_account",
        "item_icon_url",
        "item_id",
        "item_name",
        "item_readme_url",
        "item_url",
        "launch_url",
        "offering_version",
    ]
    .into_iter()
    .fold(
        BlockSchema::new().attribute(AttributeSchema::new("dry_run", AttributeType::Bool)),
        |b, name| b.attribute(AttributeSchema::new(name, AttributeType::String)),
    )
}

fn shared_data_block() -> BlockSchema {
    [
        "cluster_created_on",
        "cluster_id",
        "cluster_name",
        "cluster_type",
        "namespace",
        "region",
        "resource_group_id",
        "worker_machine_type",
    ]
    .into_iter()
    .fold(BlockSchema::new(), |b, name| {
        b.attribute(AttributeSchema::new(name, AttributeType::String))
    })
    .attribute(AttributeSchema::new("entitlement_keys", map_list()))
    .attribute(AttributeSchema::new("worker_count", types::non_negative_int()))
}

fn template_input_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(AttributeSchema::new("value", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("type", AttributeType::String)
                .required()
                .with_description("Terraform data type of the variable"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(AttributeSchema::new("secure", AttributeType::Bool))
        .attribute(AttributeSchema::new("use_default", AttributeType::Bool))
}

fn runtime_data_block() -> BlockSchema {
    [
        "id",
        "engine_cmd",
        "engine_name",
        "engine_version",
        "log_store_url",
        "state_store_url",
    ]
    .into_iter()
    .fold(BlockSchema::new(), |b, name| {
        b.attribute(AttributeSchema::new(name, AttributeType::String))
    })
    .attribute(AttributeSchema::new("output_values", map_list()))
    .attribute(AttributeSchema::new(
        "resources",
        AttributeType::List(Box::new(map_list())),
    ))
}

pub fn schema() -> ResourceSchema {
    let string = |name: &str| AttributeSchema::new(name, AttributeType::String);
    let computed = |name: &str| AttributeSchema::new(name, AttributeType::String).computed();

    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A Schematics workspace running a Terraform template")
        .attribute(
            AttributeSchema::new("name", workspace_name())
                .required()
                .with_description("The name of the workspace"),
        )
        .attribute(AttributeSchema::new(
            "description",
            AttributeType::BoundedString { min: 0, max: 2048 },
        ))
        .attribute(
            AttributeSchema::new("location", AttributeType::enumeration(LOCATIONS))
                .optional_computed()
                .force_new(),
        )
        .attribute(string("resource_group").optional_computed().force_new())
        .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
        .attribute(AttributeSchema::new("applied_shareddata_ids", AttributeType::string_list()))
        .attribute(AttributeSchema::new("catalog_ref", AttributeType::block(catalog_ref_block())))
        .attribute(AttributeSchema::new("shared_data", AttributeType::block(shared_data_block())))
        .attribute(
            AttributeSchema::new("template_env_settings", map_list())
                .with_description("Environment variables passed to the template"),
        )
        .attribute(string("template_git_folder"))
        .attribute(string("template_init_state_file"))
        .attribute(
            AttributeSchema::new("template_type", template_type())
                .required()
                .with_description("Terraform version, e.g. terraform_v1.5"),
        )
        .attribute(string("template_uninstall_script_name"))
        .attribute(string("template_values").with_description("Input values in HCL format"))
        .attribute(AttributeSchema::new("template_values_metadata", map_list()).computed())
        .attribute(AttributeSchema::new(
            "template_inputs",
            AttributeType::block_list(template_input_block()),
        ))
        .attribute(string("template_ref"))
        .attribute(string("template_git_branch"))
        .attribute(string("template_git_release"))
        .attribute(string("template_git_repo_sha_value"))
        .attribute(string("template_git_repo_url"))
        .attribute(string("template_git_url"))
        .attribute(
            AttributeSchema::new("template_git_has_uploadedgitrepotar", AttributeType::Bool)
                .optional_computed(),
        )
        .attribute(AttributeSchema::new("frozen", AttributeType::Bool).optional_computed())
        .attribute(string("frozen_at").optional_computed())
        .attribute(string("frozen_by").optional_computed())
        .attribute(AttributeSchema::new("locked", AttributeType::Bool).optional_computed())
        .attribute(string("locked_by").optional_computed())
        .attribute(string("locked_time").optional_computed())
        .attribute(
            string("x_github_token")
                .local_only()
                .sensitive()
                .with_description("Personal access token for a private GitHub or GitLab repository"),
        )
        .attribute(
            AttributeSchema::new("runtime_data", AttributeType::block_list(runtime_data_block()))
                .computed(),
        )
        .attribute(computed("status"))
        .attribute(computed("status_code"))
        .attribute(computed("status_msg"))
        .attribute(computed("crn"))
        .attribute(computed("last_health_check_at"))
        .attribute(computed("created_at"))
        .attribute(computed("created_by"))
        .attribute(computed("updated_at"))
        .attribute(computed("updated_by"))
}

// =============================================================================
// Converters
// =============================================================================

fn any_set(attrs: &Attributes, names: &[&str]) -> bool {
    names.iter().any(|name| attrs.contains_key(*name))
}

fn read_input(r: &AttrReader<'_>) -> ProviderResult<WorkspaceVariable> {
    Ok(WorkspaceVariable {
        name: r.string("name")?,
        value: r.string("value")?,
        type_: r.string("type")?,
        description: r.string("description")?,
        secure: r.bool("secure")?,
        use_default: r.bool("use_default")?,
    })
}

fn write_input(v: &WorkspaceVariable) -> Attributes {
    AttrWriter::new()
        .string("name", &v.name)
        .string("value", &v.value)
        .string("type", &v.type_)
        .string("description", &v.description)
        .bool("secure", v.secure)
        .bool("use_default", v.use_default)
        .finish()
}

fn read_template_data(r: &AttrReader<'_>) -> ProviderResult<TemplateSourceData> {
    Ok(TemplateSourceData {
        env_values: r.json_list("template_env_settings")?,
        folder: r.string("template_git_folder")?,
        init_state_file: r.string("template_init_state_file")?,
        type_: r.string("template_type")?,
        uninstall_script_name: r.string("template_uninstall_script_name")?,
        values: r.string("template_values")?,
        variablestore: r.blocks("template_inputs", read_input)?,
        ..Default::default()
    })
}

pub fn to_request(attrs: &Attributes) -> ProviderResult<Workspace> {
    let r = AttrReader::new(attrs);

    let template_data = if any_set(attrs, TEMPLATE_DATA_ATTRS) {
        Some(vec![read_template_data(&r)?])
    } else {
        None
    };
    let template_repo = if any_set(attrs, TEMPLATE_REPO_ATTRS) {
        Some(TemplateRepo {
            branch: r.string("template_git_branch")?,
            release: r.string("template_git_release")?,
            repo_sha_value: r.string("template_git_repo_sha_value")?,
            repo_url: r.string("template_git_repo_url")?,
            url: r.string("template_git_url")?,
            has_uploadedgitrepotar: r.bool("template_git_has_uploadedgitrepotar")?,
        })
    } else {
        None
    };
    let workspace_status = if any_set(attrs, STATUS_ATTRS) {
        Some(WorkspaceStatus {
            frozen: r.bool("frozen")?,
            frozen_at: r.string("frozen_at")?,
            frozen_by: r.string("frozen_by")?,
            locked: r.bool("locked")?,
            locked_by: r.string("locked_by")?,
            locked_time: r.string("locked_time")?,
        })
    } else {
        None
    };

    Ok(Workspace {
        name: r.string("name")?,
        description: r.string("description")?,
        location: r.string("location")?,
        resource_group: r.string("resource_group")?,
        tags: r.strings("tags")?,
        applied_shareddata_ids: r.strings("applied_shareddata_ids")?,
        catalog_ref: r.block("catalog_ref", |c| {
            Ok(CatalogRef {
                dry_run: c.bool("dry_run")?,
                owning_account: c.string("owning_account")?,
                item_icon_url: c.string("item_icon_url")?,
                item_id: c.string("item_id")?,
                item_name: c.string("item_name")?,
                item_readme_url: c.string("item_readme_url")?,
                item_url: c.string("item_url")?,
                launch_url: c.string("launch_url")?,
                offering_version: c.string("offering_version")?,
            })
        })?,
        shared_data: r.block("shared_data", |s| {
            Ok(SharedTargetData {
                cluster_created_on: s.string("cluster_created_on")?,
                cluster_id: s.string("cluster_id")?,
                cluster_name: s.string("cluster_name")?,
                cluster_type: s.string("cluster_type")?,
                entitlement_keys: s.json_list("entitlement_keys")?,
                namespace: s.string("namespace")?,
                region: s.string("region")?,
                resource_group_id: s.string("resource_group_id")?,
                worker_count: s.int("worker_count")?,
                worker_machine_type: s.string("worker_machine_type")?,
            })
        })?,
        type_: r.string("template_type")?.map(|t| vec![t]),
        template_data,
        template_ref: r.string("template_ref")?,
        template_repo,
        workspace_status,
        ..Default::default()
    })
}

fn write_shared_data(s: &SharedTargetData) -> Attributes {
    AttrWriter::new()
        .string("cluster_created_on", &s.cluster_created_on)
        .string("cluster_id", &s.cluster_id)
        .string("cluster_name", &s.cluster_name)
        .string("cluster_type", &s.cluster_type)
        .json_list("entitlement_keys", &s.entitlement_keys)
        .string("namespace", &s.namespace)
        .string("region", &s.region)
        .string("resource_group_id", &s.resource_group_id)
        .int("worker_count", s.worker_count)
        .string("worker_machine_type", &s.worker_machine_type)
        .finish()
}

fn write_runtime_data(d: &TemplateRuntimeData) -> Attributes {
    AttrWriter::new()
        .string("id", &d.id)
        .string("engine_cmd", &d.engine_cmd)
        .string("engine_name", &d.engine_name)
        .string("engine_version", &d.engine_version)
        .string("log_store_url", &d.log_store_url)
        .json_list("output_values", &d.output_values)
        .json_list("resources", &d.resources)
        .string("state_store_url", &d.state_store_url)
        .finish()
}

pub fn from_response(ws: &Workspace) -> Attributes {
    let template = ws.template_data.as_ref().and_then(|t| t.first()).cloned().unwrap_or_default();
    let repo = ws.template_repo.clone().unwrap_or_default();
    let status = ws.workspace_status.clone().unwrap_or_default();
    let status_msg = ws.workspace_status_msg.clone().unwrap_or_default();
    let template_type = template
        .type_
        .clone()
        .or_else(|| ws.type_.as_ref().and_then(|t| t.first().cloned()));

    AttrWriter::new()
        .string("name", &ws.name)
        .string("description", &ws.description)
        .string("location", &ws.location)
        .string("resource_group", &ws.resource_group)
        .strings("tags", &ws.tags)
        .strings("applied_shareddata_ids", &ws.applied_shareddata_ids)
        .block("catalog_ref", &ws.catalog_ref, |c| {
            AttrWriter::new()
                .bool("dry_run", c.dry_run)
                .string("owning_account", &c.owning_account)
                .string("item_icon_url", &c.item_icon_url)
                .string("item_id", &c.item_id)
                .string("item_name", &c.item_name)
                .string("item_readme_url", &c.item_readme_url)
                .string("item_url", &c.item_url)
                .string("launch_url", &c.launch_url)
                .string("offering_version", &c.offering_version)
                .finish()
        })
        .block("shared_data", &ws.shared_data, write_shared_data)
        .json_list("template_env_settings", &template.env_values)
        .string("template_git_folder", &template.folder)
        .string("template_init_state_file", &template.init_state_file)
        .string("template_type", &template_type)
        .string("template_uninstall_script_name", &template.uninstall_script_name)
        .string("template_values", &template.values)
        .json_list("template_values_metadata", &template.values_metadata)
        .blocks("template_inputs", &template.variablestore, write_input)
        .string("template_ref", &ws.template_ref)
        .string("template_git_branch", &repo.branch)
        .string("template_git_release", &repo.release)
        .string("template_git_repo_sha_value", &repo.repo_sha_value)
        .string("template_git_repo_url", &repo.repo_url)
        .string("template_git_url", &repo.url)
        .bool("template_git_has_uploadedgitrepotar", repo.has_uploadedgitrepotar)
        .bool("frozen", status.frozen)
        .string("frozen_at", &status.frozen_at)
        .string("frozen_by", &status.frozen_by)
        .bool("locked", status.locked)
        .string("locked_by", &status.locked_by)
        .string("locked_time", &status.locked_time)
        .blocks("runtime_data", &ws.runtime_data, write_runtime_data)
        .string("status", &ws.status)
        .string("status_code", &status_msg.status_code)
        .string("status_msg", &status_msg.status_msg)
        .string("crn", &ws.crn)
        .string("last_health_check_at", &ws.last_health_check_at)
        .string("created_at", &ws.created_at)
        .string("created_by", &ws.created_by)
        .string("updated_at", &ws.updated_at)
        .string("updated_by", &ws.updated_by)
        .finish()
}

/// Wire fields of a metadata PATCH
fn patch_fields(changed: &[&str]) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = changed
        .iter()
        .filter_map(|attr| match *attr {
            "name" => Some("name"),
            "description" => Some("description"),
            "tags" => Some("tags"),
            "applied_shareddata_ids" => Some("applied_shareddata_ids"),
            "shared_data" => Some("shared_data"),
            a if STATUS_ATTRS.iter().any(|s| *s == a) => Some("workspace_status"),
            _ => None,
        })
        .collect();
    fields.sort_unstable();
    fields.dedup();
    fields
}

fn of_class<'a>(changed: &'a [String], class: &[&str]) -> Vec<&'a str> {
    changed
        .iter()
        .map(String::as_str)
        .filter(|attr| class.iter().any(|c| c == attr))
        .collect()
}

// =============================================================================
// Operations
// =============================================================================

impl SchematicsProvider {
    pub(crate) async fn read_workspace(
        &self,
        id: &ResourceId,
        workspace_id: &str,
    ) -> ProviderResult<State> {
        let endpoint = self.config.endpoint_for_id(workspace_id);
        match self.client.get_workspace(&endpoint, workspace_id).await {
            Ok(ws) => Ok(State::existing(id.clone(), from_response(&ws)).with_identifier(workspace_id)),
            Err(e) if e.is_not_found() => {
                log::debug!("workspace {} is gone", workspace_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetWorkspace", id, e)),
        }
    }

    pub(crate) async fn create_workspace(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let github_token = AttrReader::new(&resource.attributes)
            .string("x_github_token")
            .map_err(|e| e.for_resource(id.clone()))?;
        let endpoint = self.config.endpoint_for(request.location.as_deref());

        let created = self
            .client
            .create_workspace(&endpoint, &request, github_token.as_deref())
            .await
            .map_err(|e| api_error("CreateWorkspace", id, e))?;
        let workspace_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no workspace id")
                .for_resource(id.clone())
                .during("CreateWorkspace")
        })?;
        log::info!("created workspace {} ({})", id.name, workspace_id);

        let state = self.read_workspace(id, &workspace_id).await?;
        Ok(with_local(&schema(), state, &resource.attributes))
    }

    pub(crate) async fn update_workspace(
        &self,
        id: &ResourceId,
        workspace_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let schema = schema();
        let changed = self.changes(&schema, id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, workspace_id, from));
        }

        let endpoint = self.config.endpoint_for_id(workspace_id);
        let desired = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;

        if !of_class(&changed, REPLACE_ATTRS).is_empty() {
            self.client
                .replace_workspace(&endpoint, workspace_id, &desired)
                .await
                .map_err(|e| api_error("ReplaceWorkspace", id, e))?;
        } else {
            let metadata = of_class(&changed, METADATA_ATTRS);
            if !metadata.is_empty() {
                let metadata_owned: Vec<String> = metadata.iter().map(|a| a.to_string()).collect();
                reject_unset(&schema, id, &metadata_owned, to)?;
                let patch = select_fields(&desired, &patch_fields(&metadata))?;
                self.client
                    .update_workspace(&endpoint, workspace_id, &patch)
                    .await
                    .map_err(|e| api_error("UpdateWorkspace", id, e))?;
            }

            if !of_class(&changed, INPUT_ATTRS).is_empty() {
                self.replace_workspace_inputs(id, workspace_id, &endpoint, &desired)
                    .await?;
            }
        }

        let state = self.read_workspace(id, workspace_id).await?;
        Ok(with_local(&schema, state, &to.attributes))
    }

    /// Send the desired inputs to the template the workspace runs
    async fn replace_workspace_inputs(
        &self,
        id: &ResourceId,
        workspace_id: &str,
        endpoint: &str,
        desired: &Workspace,
    ) -> ProviderResult<()> {
        let current = self
            .client
            .get_workspace(endpoint, workspace_id)
            .await
            .map_err(|e| api_error("GetWorkspace", id, e))?;
        let template_id = current
            .template_data
            .as_ref()
            .and_then(|t| t.first())
            .and_then(|t| t.id.clone())
            .or_else(|| {
                current
                    .runtime_data
                    .as_ref()
                    .and_then(|r| r.first())
                    .and_then(|r| r.id.clone())
            })
            .ok_or_else(|| {
                ProviderError::state("workspace has no template to receive inputs")
                    .for_resource(id.clone())
                    .during("ReplaceWorkspaceInputs")
            })?;

        let template = desired
            .template_data
            .as_ref()
            .and_then(|t| t.first())
            .cloned()
            .unwrap_or_default();
        let inputs = WorkspaceInputs {
            env_values: template.env_values,
            values: template.values,
            variablestore: template.variablestore,
        };
        log::debug!("replacing inputs of template {} in {}", template_id, workspace_id);
        self.client
            .replace_workspace_inputs(endpoint, workspace_id, &template_id, &inputs)
            .await
            .map_err(|e| api_error("ReplaceWorkspaceInputs", id, e))
    }

    pub(crate) async fn delete_workspace(
        &self,
        id: &ResourceId,
        workspace_id: &str,
    ) -> ProviderResult<()> {
        self.client
            .delete_workspace(&self.config.endpoint_for_id(workspace_id), workspace_id)
            .await
            .map_err(|e| api_error("DeleteWorkspace", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn desired() -> Attributes {
        let input = block(&[
            ("name", Value::from("region")),
            ("value", Value::from("us-south")),
            ("type", Value::from("string")),
            ("secure", Value::Bool(false)),
        ]);
        let env = block(&[("TF_LOG", Value::from("DEBUG"))]);

        [
            ("name", Value::from("web infra")),
            ("description", Value::from("Web tier")),
            ("location", Value::from("us-south")),
            ("resource_group", Value::from("Default")),
            ("tags", Value::List(vec![Value::from("web")])),
            (
                "shared_data",
                block(&[
                    ("cluster_id", Value::from("cl-1")),
                    ("worker_count", Value::Int(3)),
                    (
                        "entitlement_keys",
                        Value::List(vec![block(&[("key", Value::from("abc"))])]),
                    ),
                ]),
            ),
            ("template_type", Value::from("terraform_v1.5")),
            ("template_git_folder", Value::from("infra")),
            ("template_values", Value::from("count = 2")),
            ("template_inputs", Value::List(vec![input])),
            ("template_env_settings", Value::List(vec![env])),
            ("template_git_url", Value::from("https://github.com/acme/infra")),
            ("template_git_branch", Value::from("main")),
            ("frozen", Value::Bool(true)),
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
    fn flat_attributes_nest_on_the_wire() {
        let json = serde_json::to_value(to_request(&desired()).unwrap()).unwrap();
        assert_eq!(json["type"], serde_json::json!(["terraform_v1.5"]));
        assert_eq!(json["template_data"][0]["type"], "terraform_v1.5");
        assert_eq!(json["template_data"][0]["folder"], "infra");
        assert_eq!(json["template_data"][0]["variablestore"][0]["type"], "string");
        assert_eq!(json["template_repo"]["branch"], "main");
        assert_eq!(json["workspace_status"]["frozen"], true);
        assert!(json.get("template_git_branch").is_none());
    }

    #[test]
    fn name_must_start_with_alphanumeric() {
        let mut attrs = desired();
        attrs.insert("name".to_string(), Value::from("-web"));
        assert!(schema().validate(&attrs).is_err());

        attrs.insert("name".to_string(), Value::from("web_infra-2 prod"));
        assert!(schema().validate(&attrs).is_ok());

        attrs.insert("name".to_string(), Value::from("x".repeat(129)));
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn template_type_names_a_terraform_version() {
        let mut attrs = desired();
        for accepted in ["terraform_v1.4", "terraform_v1.9", "terraform_v1.5.7"] {
            attrs.insert("template_type".to_string(), Value::from(accepted));
            assert!(schema().validate(&attrs).is_ok(), "{}", accepted);
        }
        for rejected in ["terraform_v0.12", "terraform_v1.3", "terraform_v1.5-beta"] {
            attrs.insert("template_type".to_string(), Value::from(rejected));
            assert!(schema().validate(&attrs).is_err(), "{}", rejected);
        }
    }

    #[test]
    fn status_flags_patch_as_one_object() {
        assert_eq!(
            patch_fields(&["locked", "frozen", "name"]),
            vec!["name", "workspace_status"]
        );
        assert!(patch_fields(&["template_values"]).is_empty());
    }

    #[test]
    fn template_id_is_read_back() {
        let ws: Workspace = serde_json::from_value(serde_json::json!({
            "id": "us-south.workspace.web.1a2b",
            "type": ["terraform_v1.5"],
            "template_data": [{"id": "tmpl-1", "folder": "infra"}],
            "runtime_data": [{"id": "tmpl-1", "engine_name": "terraform"}],
            "workspace_status_msg": {"status_code": "200", "status_msg": "ok"}
        }))
        .unwrap();

        let attrs = from_response(&ws);
        assert_eq!(attrs["template_type"], Value::from("terraform_v1.5"));
        assert_eq!(attrs["status_msg"], Value::from("ok"));
        let runtime = attrs["runtime_data"].as_list().unwrap();
        assert_eq!(runtime[0].as_map().unwrap()["id"], Value::from("tmpl-1"));
    }
}
