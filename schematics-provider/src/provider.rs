//! SchematicsProvider - dispatches lifecycle hooks to the resource modules

use tokio_util::sync::CancellationToken;

use schematics_core::differ;
use schematics_core::provider::{ErrorKind, ProviderError, ProviderResult};
use schematics_core::resource::{Attributes, Resource, ResourceId, State};
use schematics_core::schema::ResourceSchema;
use schematics_core::wait::PollError;

use crate::client::{ApiError, SchematicsClient};
use crate::config::ProviderConfig;
use crate::resources::{
    action, agent, agent_jobs, inventory, job, policy, resource_query, workspace,
};

/// Provider for Schematics agents, actions, workspaces, jobs, policies, inventories
/// and resource queries
#[derive(Debug, Clone)]
pub struct SchematicsProvider {
    pub(crate) client: SchematicsClient,
    pub(crate) config: ProviderConfig,
    pub(crate) cancel: CancellationToken,
}

impl SchematicsProvider {
    /// Create a provider; fails when no IAM access token is configured
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = SchematicsClient::new(&config)?;
        Ok(Self {
            client,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort job waits when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Endpoint of the configured region
    pub(crate) fn endpoint(&self) -> String {
        self.config.endpoint_for(None)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its remote identifier
    ///
    /// A resource that no longer exists reads as [`State::not_found`].
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        let result = match id.resource_type.as_str() {
            agent::RESOURCE_TYPE => self.read_agent(id, identifier).await,
            policy::RESOURCE_TYPE => self.read_policy(id, identifier).await,
            job::RESOURCE_TYPE => self.read_job(id, identifier).await,
            inventory::RESOURCE_TYPE => self.read_inventory(id, identifier).await,
            resource_query::RESOURCE_TYPE => self.read_resource_query(id, identifier).await,
            action::RESOURCE_TYPE => self.read_action(id, identifier).await,
            workspace::RESOURCE_TYPE => self.read_workspace(id, identifier).await,
            other => match agent_jobs::kind_of(other) {
                Some(kind) => self.read_agent_job(id, kind, identifier).await,
                None => Err(unknown_type(id)),
            },
        };
        result.inspect_err(log_error)
    }

    /// Create a resource and return its freshly read state
    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let result = match id.resource_type.as_str() {
            agent::RESOURCE_TYPE => self.create_agent(resource).await,
            policy::RESOURCE_TYPE => self.create_policy(resource).await,
            job::RESOURCE_TYPE => self.create_job(resource).await,
            inventory::RESOURCE_TYPE => self.create_inventory(resource).await,
            resource_query::RESOURCE_TYPE => self.create_resource_query(resource).await,
            action::RESOURCE_TYPE => self.create_action(resource).await,
            workspace::RESOURCE_TYPE => self.create_workspace(resource).await,
            other => match agent_jobs::kind_of(other) {
                Some(kind) => self.trigger_agent_job(resource, kind).await,
                None => Err(unknown_type(id)),
            },
        };
        result.inspect_err(log_error)
    }

    /// Apply the attributes of `to` that differ from `from`
    ///
    /// Nothing is sent when no settable attribute changed.
    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let result = match id.resource_type.as_str() {
            agent::RESOURCE_TYPE => self.update_agent(id, identifier, from, to).await,
            policy::RESOURCE_TYPE => self.update_policy(id, identifier, from, to).await,
            job::RESOURCE_TYPE => self.update_job(id, identifier, from, to).await,
            inventory::RESOURCE_TYPE => self.update_inventory(id, identifier, from, to).await,
            resource_query::RESOURCE_TYPE => {
                self.update_resource_query(id, identifier, from, to).await
            }
            action::RESOURCE_TYPE => self.update_action(id, identifier, from, to).await,
            workspace::RESOURCE_TYPE => self.update_workspace(id, identifier, from, to).await,
            other => match agent_jobs::kind_of(other) {
                Some(kind) => self.retrigger_agent_job(id, identifier, kind, from, to).await,
                None => Err(unknown_type(id)),
            },
        };
        result.inspect_err(log_error)
    }

    /// Delete a resource
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let result = match id.resource_type.as_str() {
            agent::RESOURCE_TYPE => self.delete_agent(id, identifier).await,
            policy::RESOURCE_TYPE => self.delete_policy(id, identifier).await,
            job::RESOURCE_TYPE => self.delete_job(id, identifier).await,
            inventory::RESOURCE_TYPE => self.delete_inventory(id, identifier).await,
            resource_query::RESOURCE_TYPE => self.delete_resource_query(id, identifier).await,
            action::RESOURCE_TYPE => self.delete_action(id, identifier).await,
            workspace::RESOURCE_TYPE => self.delete_workspace(id, identifier).await,
            other => match agent_jobs::kind_of(other) {
                // Triggered jobs have no remote delete
                Some(_) => {
                    log::debug!("removing {} from state only", identifier);
                    Ok(())
                }
                None => Err(unknown_type(id)),
            },
        };
        result.inspect_err(log_error)
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    /// Settable attributes that changed between `from` and `to`
    ///
    /// A change to a `force_new` attribute cannot be applied in place and is
    /// reported as an `Unsupported` error before any call is made.
    pub(crate) fn changes(
        &self,
        schema: &ResourceSchema,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<Vec<String>> {
        let changed = differ::changed_attributes(schema, &to.attributes, &from.attributes);
        let replacements = differ::replacement_attributes(schema, &changed);
        if !replacements.is_empty() {
            return Err(ProviderError::unsupported(format!(
                "changing {} requires replacement",
                replacements.join(", ")
            ))
            .for_resource(id.clone())
            .during("Update"));
        }
        if !changed.is_empty() {
            log::debug!("{}.{} changed: {}", id.resource_type, id.name, changed.join(", "));
        }
        Ok(changed)
    }

    /// [`changes`](Self::changes) for updates that PATCH only the changed fields
    pub(crate) fn patch_changes(
        &self,
        schema: &ResourceSchema,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<Vec<String>> {
        let changed = self.changes(schema, id, from, to)?;
        reject_unset(schema, id, &changed, to)?;
        Ok(changed)
    }
}

/// A PATCH body can only set fields, so an attribute the operator removed is
/// reported as an `Unsupported` error instead of being left out of the body
/// and re-diffed on every later update.
pub(crate) fn reject_unset(
    schema: &ResourceSchema,
    id: &ResourceId,
    changed: &[String],
    to: &Resource,
) -> ProviderResult<()> {
    let removed: Vec<&str> = changed
        .iter()
        .filter(|name| !to.attributes.contains_key(*name))
        .filter(|name| !schema.attributes.get(*name).is_some_and(|a| a.local_only))
        .map(String::as_str)
        .collect();
    if removed.is_empty() {
        return Ok(());
    }
    Err(ProviderError::unsupported(format!(
        "{} cannot be unset in place; set an explicit value instead",
        removed.join(", ")
    ))
    .for_resource(id.clone())
    .during("Update"))
}

/// State returned by an update that had nothing to send
pub(crate) fn unchanged(id: &ResourceId, identifier: &str, from: &State) -> State {
    State::existing(id.clone(), from.attributes.clone()).with_identifier(identifier)
}

/// Keep the desired local-only attributes in a freshly read state
pub(crate) fn with_local(schema: &ResourceSchema, mut state: State, desired: &Attributes) -> State {
    if state.exists {
        differ::carry_over_local(schema, desired, &mut state.attributes);
    }
    state
}

/// Wrap a failed API call with its operation and resource
pub(crate) fn api_error(operation: &str, id: &ResourceId, err: ApiError) -> ProviderError {
    let kind = if err.is_not_found() {
        ErrorKind::NotFound
    } else {
        ErrorKind::Remote
    };
    ProviderError::new(err.to_string())
        .kind(kind)
        .for_resource(id.clone())
        .during(operation)
        .with_cause(err)
}

/// Wrap a failed job wait
pub(crate) fn poll_error(operation: &str, id: &ResourceId, err: PollError<ApiError>) -> ProviderError {
    let kind = match &err {
        PollError::Fetch(e) if e.is_not_found() => ErrorKind::NotFound,
        PollError::Fetch(_) | PollError::UnexpectedStatus(_) => ErrorKind::Remote,
        PollError::Timeout { .. } => ErrorKind::Timeout,
        PollError::Cancelled => ErrorKind::Cancelled,
    };
    ProviderError::new(err.to_string())
        .kind(kind)
        .for_resource(id.clone())
        .during(operation)
        .with_cause(err)
}

fn unknown_type(id: &ResourceId) -> ProviderError {
    ProviderError::unsupported(format!("Unknown resource type: {}", id.resource_type))
        .for_resource(id.clone())
}

pub(crate) fn log_error(err: &ProviderError) {
    log::debug!("{} ({})", err, err.kind);
}
