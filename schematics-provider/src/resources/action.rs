//! ibm_schematics_action - Ansible playbooks run by Schematics jobs
//!
//! Actions are regional like jobs: create targets the endpoint of
//! `location`, later calls follow the region prefix of the action id.

use schematics_core::provider::{ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};

use super::LOCATIONS;
use super::variable::{read_variable, variable_block, variable_list, write_variable};
use crate::convert::{AttrReader, AttrWriter, select_fields};
use crate::models::{
    Action, ActionState, Bastion, CatalogSource, ExternalSource, GitSource, SystemLock, UserState,
};
use crate::provider::{SchematicsProvider, api_error, unchanged, with_local};

pub const RESOURCE_TYPE: &str = "ibm_schematics_action";

const SOURCE_TYPES: &[&str] = &[
    "cos_bucket",
    "external_scm",
    "git_hub",
    "git_hub_enterprise",
    "git_lab",
    "ibm_git_lab",
    "ibm_schematics_action_catalog",
    "local",
];

// =============================================================================
// Schema
// =============================================================================

fn git_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("computed_git_repo_url", AttributeType::String)
                .optional_computed()
                .with_description("URL computed from the repository url, folder and branch"),
        )
        .attribute(AttributeSchema::new("git_repo_url", AttributeType::String))
        .attribute(AttributeSchema::new("git_token", AttributeType::String).sensitive())
        .attribute(AttributeSchema::new("git_repo_folder", AttributeType::String))
        .attribute(AttributeSchema::new("git_release", AttributeType::String))
        .attribute(AttributeSchema::new("git_branch", AttributeType::String))
}

fn catalog_block() -> BlockSchema {
    [
        "catalog_name",
        "offering_name",
        "offering_version",
        "offering_kind",
        "offering_id",
        "offering_version_id",
        "offering_repo_url",
    ]
    .into_iter()
    .fold(BlockSchema::new(), |b, name| {
        b.attribute(AttributeSchema::new(name, AttributeType::String))
    })
}

fn source_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("source_type", AttributeType::enumeration(SOURCE_TYPES))
                .required(),
        )
        .attribute(AttributeSchema::new("git", AttributeType::block(git_block())))
        .attribute(AttributeSchema::new("catalog", AttributeType::block(catalog_block())))
}

fn user_state_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new(
            "state",
            AttributeType::enumeration(&["disable", "draft", "live", "locked"]),
        ))
        .attribute(AttributeSchema::new("set_by", AttributeType::String).computed())
        .attribute(AttributeSchema::new("set_at", AttributeType::String).computed())
}

fn state_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("status_code", AttributeType::String))
        .attribute(AttributeSchema::new("status_job_id", AttributeType::String))
        .attribute(AttributeSchema::new("status_message", AttributeType::String))
}

fn sys_lock_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("sys_locked", AttributeType::Bool))
        .attribute(AttributeSchema::new("sys_locked_by", AttributeType::String))
        .attribute(AttributeSchema::new("sys_locked_at", AttributeType::String))
}

pub fn schema() -> ResourceSchema {
    let computed = |name: &str| AttributeSchema::new(name, AttributeType::String).computed();

    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("A Schematics action that runs Ansible playbooks")
        .attribute(
            AttributeSchema::new("name", AttributeType::BoundedString { min: 1, max: 65 })
                .required()
                .with_description("The unique name of the action"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("location", AttributeType::enumeration(LOCATIONS))
                .optional_computed()
                .force_new(),
        )
        .attribute(AttributeSchema::new("resource_group", AttributeType::String).optional_computed())
        .attribute(AttributeSchema::new("tags", AttributeType::string_list()))
        .attribute(
            AttributeSchema::new("user_state", AttributeType::block(user_state_block()))
                .optional_computed(),
        )
        .attribute(AttributeSchema::new("source_readme_url", AttributeType::String))
        .attribute(AttributeSchema::new("source", AttributeType::block(source_block())))
        .attribute(
            AttributeSchema::new("source_type", AttributeType::enumeration(SOURCE_TYPES))
                .with_description("Type of source for the playbooks"),
        )
        .attribute(
            AttributeSchema::new("command_parameter", AttributeType::String)
                .with_description("Playbook name"),
        )
        .attribute(
            AttributeSchema::new("inventory", AttributeType::String)
                .with_description("Target inventory record id"),
        )
        .attribute(AttributeSchema::new("credentials", variable_list()).sensitive())
        .attribute(AttributeSchema::new(
            "bastion",
            AttributeType::block(
                BlockSchema::new()
                    .attribute(AttributeSchema::new("name", AttributeType::String))
                    .attribute(AttributeSchema::new("host", AttributeType::String)),
            ),
        ))
        .attribute(
            AttributeSchema::new("bastion_credential", AttributeType::block(variable_block()))
                .sensitive(),
        )
        .attribute(AttributeSchema::new("targets_ini", AttributeType::String))
        .attribute(AttributeSchema::new("action_inputs", variable_list()))
        .attribute(AttributeSchema::new("action_outputs", variable_list()))
        .attribute(AttributeSchema::new("settings", variable_list()))
        .attribute(
            AttributeSchema::new("x_github_token", AttributeType::String)
                .local_only()
                .sensitive()
                .with_description("Personal access token for a private GitHub or GitLab repository"),
        )
        .attribute(AttributeSchema::new("state", AttributeType::block(state_block())).computed())
        .attribute(
            AttributeSchema::new("sys_lock", AttributeType::block(sys_lock_block())).computed(),
        )
        .attribute(AttributeSchema::new("playbook_names", AttributeType::string_list()).computed())
        .attribute(computed("crn"))
        .attribute(computed("account"))
        .attribute(computed("source_created_at"))
        .attribute(computed("source_created_by"))
        .attribute(computed("source_updated_at"))
        .attribute(computed("source_updated_by"))
        .attribute(computed("created_at"))
        .attribute(computed("created_by"))
        .attribute(computed("updated_at"))
        .attribute(computed("updated_by"))
}

// =============================================================================
// Converters
// =============================================================================

fn read_source(r: &AttrReader<'_>) -> ProviderResult<ExternalSource> {
    Ok(ExternalSource {
        source_type: r.string("source_type")?,
        git: r.block("git", |g| {
            Ok(GitSource {
                computed_git_repo_url: g.string("computed_git_repo_url")?,
                git_repo_url: g.string("git_repo_url")?,
                git_token: g.string("git_token")?,
                git_repo_folder: g.string("git_repo_folder")?,
                git_release: g.string("git_release")?,
                git_branch: g.string("git_branch")?,
            })
        })?,
        catalog: r.block("catalog", |c| {
            Ok(CatalogSource {
                catalog_name: c.string("catalog_name")?,
                offering_name: c.string("offering_name")?,
                offering_version: c.string("offering_version")?,
                offering_kind: c.string("offering_kind")?,
                offering_id: c.string("offering_id")?,
                offering_version_id: c.string("offering_version_id")?,
                offering_repo_url: c.string("offering_repo_url")?,
            })
        })?,
    })
}

fn write_source(s: &ExternalSource) -> Attributes {
    AttrWriter::new()
        .string("source_type", &s.source_type)
        .block("git", &s.git, |g| {
            AttrWriter::new()
                .string("computed_git_repo_url", &g.computed_git_repo_url)
                .string("git_repo_url", &g.git_repo_url)
                .string("git_token", &g.git_token)
                .string("git_repo_folder", &g.git_repo_folder)
                .string("git_release", &g.git_release)
                .string("git_branch", &g.git_branch)
                .finish()
        })
        .block("catalog", &s.catalog, |c| {
            AttrWriter::new()
                .string("catalog_name", &c.catalog_name)
                .string("offering_name", &c.offering_name)
                .string("offering_version", &c.offering_version)
                .string("offering_kind", &c.offering_kind)
                .string("offering_id", &c.offering_id)
                .string("offering_version_id", &c.offering_version_id)
                .string("offering_repo_url", &c.offering_repo_url)
                .finish()
        })
        .finish()
}

pub fn to_request(attrs: &Attributes) -> ProviderResult<Action> {
    let r = AttrReader::new(attrs);
    Ok(Action {
        name: r.string("name")?,
        description: r.string("description")?,
        location: r.string("location")?,
        resource_group: r.string("resource_group")?,
        tags: r.strings("tags")?,
        user_state: r.block("user_state", |b| {
            Ok(UserState {
                state: b.string("state")?,
                ..Default::default()
            })
        })?,
        source_readme_url: r.string("source_readme_url")?,
        source: r.block("source", read_source)?,
        source_type: r.string("source_type")?,
        command_parameter: r.string("command_parameter")?,
        inventory: r.string("inventory")?,
        credentials: r.blocks("credentials", read_variable)?,
        bastion: r.block("bastion", |b| {
            Ok(Bastion {
                name: b.string("name")?,
                host: b.string("host")?,
            })
        })?,
        bastion_credential: r.block("bastion_credential", read_variable)?,
        targets_ini: r.string("targets_ini")?,
        inputs: r.blocks("action_inputs", read_variable)?,
        outputs: r.blocks("action_outputs", read_variable)?,
        settings: r.blocks("settings", read_variable)?,
        ..Default::default()
    })
}

pub fn from_response(action: &Action) -> Attributes {
    AttrWriter::new()
        .string("name", &action.name)
        .string("description", &action.description)
        .string("location", &action.location)
        .string("resource_group", &action.resource_group)
        .strings("tags", &action.tags)
        .block("user_state", &action.user_state, |u: &UserState| {
            AttrWriter::new()
                .string("state", &u.state)
                .string("set_by", &u.set_by)
                .string("set_at", &u.set_at)
                .finish()
        })
        .string("source_readme_url", &action.source_readme_url)
        .block("source", &action.source, write_source)
        .string("source_type", &action.source_type)
        .string("command_parameter", &action.command_parameter)
        .string("inventory", &action.inventory)
        .blocks("credentials", &action.credentials, write_variable)
        .block("bastion", &action.bastion, |b| {
            AttrWriter::new()
                .string("name", &b.name)
                .string("host", &b.host)
                .finish()
        })
        .block("bastion_credential", &action.bastion_credential, write_variable)
        .string("targets_ini", &action.targets_ini)
        .blocks("action_inputs", &action.inputs, write_variable)
        .blocks("action_outputs", &action.outputs, write_variable)
        .blocks("settings", &action.settings, write_variable)
        .block("state", &action.state, |s: &ActionState| {
            AttrWriter::new()
                .string("status_code", &s.status_code)
                .string("status_job_id", &s.status_job_id)
                .string("status_message", &s.status_message)
                .finish()
        })
        .block("sys_lock", &action.sys_lock, |l: &SystemLock| {
            AttrWriter::new()
                .bool("sys_locked", l.sys_locked)
                .string("sys_locked_by", &l.sys_locked_by)
                .string("sys_locked_at", &l.sys_locked_at)
                .finish()
        })
        .strings("playbook_names", &action.playbook_names)
        .string("crn", &action.crn)
        .string("account", &action.account)
        .string("source_created_at", &action.source_created_at)
        .string("source_created_by", &action.source_created_by)
        .string("source_updated_at", &action.source_updated_at)
        .string("source_updated_by", &action.source_updated_by)
        .string("created_at", &action.created_at)
        .string("created_by", &action.created_by)
        .string("updated_at", &action.updated_at)
        .string("updated_by", &action.updated_by)
        .finish()
}

/// Wire fields of a PATCH for the changed attributes
fn patch_fields(changed: &[String]) -> Vec<&str> {
    changed
        .iter()
        .filter_map(|attr| match attr.as_str() {
            "action_inputs" => Some("inputs"),
            "action_outputs" => Some("outputs"),
            "x_github_token" => None,
            other => Some(other),
        })
        .collect()
}

// =============================================================================
// Operations
// =============================================================================

impl SchematicsProvider {
    pub(crate) async fn read_action(
        &self,
        id: &ResourceId,
        action_id: &str,
    ) -> ProviderResult<State> {
        let endpoint = self.config.endpoint_for_id(action_id);
        match self.client.get_action(&endpoint, action_id).await {
            Ok(action) => {
                Ok(State::existing(id.clone(), from_response(&action)).with_identifier(action_id))
            }
            Err(e) if e.is_not_found() => {
                log::debug!("action {} is gone", action_id);
                Ok(State::not_found(id.clone()))
            }
            Err(e) => Err(api_error("GetAction", id, e)),
        }
    }

    pub(crate) async fn create_action(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let request = to_request(&resource.attributes).map_err(|e| e.for_resource(id.clone()))?;
        let github_token = AttrReader::new(&resource.attributes)
            .string("x_github_token")
            .map_err(|e| e.for_resource(id.clone()))?;
        let endpoint = self.config.endpoint_for(request.location.as_deref());

        let created = self
            .client
            .create_action(&endpoint, &request, github_token.as_deref())
            .await
            .map_err(|e| api_error("CreateAction", id, e))?;
        let action_id = created.id.ok_or_else(|| {
            ProviderError::new("create response carried no action id")
                .for_resource(id.clone())
                .during("CreateAction")
        })?;
        log::info!("created action {} ({})", id.name, action_id);

        let state = self.read_action(id, &action_id).await?;
        Ok(with_local(&schema(), state, &resource.attributes))
    }

    /// PATCH the changed fields; credentials can only be set at create
    pub(crate) async fn update_action(
        &self,
        id: &ResourceId,
        action_id: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let schema = schema();
        let changed = self.patch_changes(&schema, id, from, to)?;
        if changed.is_empty() {
            return Ok(unchanged(id, action_id, from));
        }
        if changed.iter().any(|c| c == "credentials") {
            return Err(ProviderError::unsupported(
                "updating the credentials of an action is not supported; recreate the action instead",
            )
            .for_resource(id.clone())
            .during("Update"));
        }

        let fields = patch_fields(&changed);
        if !fields.is_empty() {
            let desired = to_request(&to.attributes).map_err(|e| e.for_resource(id.clone()))?;
            let patch = select_fields(&desired, &fields)?;
            self.client
                .update_action(&self.config.endpoint_for_id(action_id), action_id, &patch)
                .await
                .map_err(|e| api_error("UpdateAction", id, e))?;
        }

        let state = self.read_action(id, action_id).await?;
        Ok(with_local(&schema, state, &to.attributes))
    }

    pub(crate) async fn delete_action(&self, id: &ResourceId, action_id: &str) -> ProviderResult<()> {
        self.client
            .delete_action(&self.config.endpoint_for_id(action_id), action_id)
            .await
            .map_err(|e| api_error("DeleteAction", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schematics_core::resource::Value;

    fn block(pairs: &[(&str, Value)]) -> Value {
        Value::Map(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    fn desired() -> Attributes {
        let git = block(&[
            ("git_repo_url", Value::from("https://github.com/acme/playbooks")),
            ("git_branch", Value::from("main")),
        ]);
        let source = block(&[("source_type", Value::from("git_hub")), ("git", git)]);
        let credential = block(&[
            ("name", Value::from("ssh_key")),
            ("value", Value::from("-----BEGIN KEY-----")),
            ("metadata", block(&[("secure", Value::Bool(true))])),
        ]);
        let input = block(&[("name", Value::from("env")), ("value", Value::from("prod"))]);

        [
            ("name", Value::from("deploy")),
            ("description", Value::from("Deploy web tier")),
            ("location", Value::from("us-east")),
            ("tags", Value::List(vec![Value::from("web")])),
            ("user_state", block(&[("state", Value::from("live"))])),
            ("source", source),
            ("source_type", Value::from("git_hub")),
            ("command_parameter", Value::from("site.yml")),
            ("inventory", Value::from("us-east.INVENTORY.hosts.1a2b")),
            ("credentials", Value::List(vec![credential])),
            (
                "bastion",
                block(&[("name", Value::from("jump")), ("host", Value::from("10.0.0.4"))]),
            ),
            ("action_inputs", Value::List(vec![input])),
            ("targets_ini", Value::from("[web]\n10.0.0.5\n")),
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
    fn source_type_is_a_fixed_set() {
        let mut attrs = desired();
        attrs.insert("source_type".to_string(), Value::from("svn"));
        assert!(schema().validate(&attrs).is_err());

        let mut attrs = desired();
        attrs.insert(
            "source".to_string(),
            block(&[("source_type", Value::from("bitbucket"))]),
        );
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn name_length_is_bounded() {
        let mut attrs = desired();
        attrs.insert("name".to_string(), Value::from("x".repeat(66)));
        assert!(schema().validate(&attrs).is_err());
    }

    #[test]
    fn inputs_and_outputs_use_wire_names() {
        let json = serde_json::to_value(to_request(&desired()).unwrap()).unwrap();
        assert_eq!(json["inputs"][0]["name"], "env");
        assert!(json.get("action_inputs").is_none());
        assert_eq!(json["source"]["git"]["git_branch"], "main");
        assert!(json.get("x_github_token").is_none());
    }

    #[test]
    fn patch_fields_follow_wire_names() {
        let changed = vec![
            "action_inputs".to_string(),
            "description".to_string(),
            "x_github_token".to_string(),
        ];
        assert_eq!(patch_fields(&changed), vec!["inputs", "description"]);
    }
}
