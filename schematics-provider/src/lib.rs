//! IBM Cloud Schematics provider
//!
//! Manages Schematics agents, agent job triggers, actions, workspaces,
//! policies, jobs, inventories and resource queries over the Schematics
//! REST API.
//!
//! ## Module Structure
//!
//! - `config` - Region, endpoint, IAM tokens and timeouts
//! - `client` - HTTP client for the Schematics API
//! - `models` - Wire types
//! - `convert` - Attribute map readers and writers
//! - `resources` - Schemas and CRUD operations per resource type
//! - `data_sources` - Read-only lookups
//! - `job_status` - Agent job status classification
//! - `provider` - SchematicsProvider dispatch

pub mod client;
pub mod config;
pub mod convert;
pub mod data_sources;
pub mod job_status;
pub mod models;
pub mod provider;
pub mod resources;

// Re-export main types
pub use config::ProviderConfig;
pub use provider::SchematicsProvider;

use schematics_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use schematics_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for SchematicsProvider {
    fn name(&self) -> &'static str {
        "schematics"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        data_sources::data_source_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { SchematicsProvider::read_data_source(self, &resource).await })
    }
}
