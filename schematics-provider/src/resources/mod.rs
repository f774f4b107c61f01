//! Resource types served by the Schematics provider
//!
//! Each module pairs a schema with the converters between attribute maps and
//! wire types, and adds the CRUD operations to `SchematicsProvider`.

use schematics_core::provider::ResourceType;
use schematics_core::schema::ResourceSchema;

use crate::models::AgentJobKind;

pub mod action;
pub mod agent;
pub mod agent_jobs;
pub mod inventory;
pub mod job;
pub mod policy;
pub mod resource_query;
pub mod variable;
pub mod workspace;

/// Regions that host the Schematics service
pub(crate) const LOCATIONS: &[&str] = &["eu-de", "eu-gb", "us-east", "us-south"];

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
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

define_resource_type!(AgentType, agent::RESOURCE_TYPE, agent::schema());
define_resource_type!(
    AgentDeployType,
    agent_jobs::DEPLOY_TYPE,
    agent_jobs::schema(AgentJobKind::Deploy)
);
define_resource_type!(
    AgentHealthType,
    agent_jobs::HEALTH_TYPE,
    agent_jobs::schema(AgentJobKind::Health)
);
define_resource_type!(
    AgentPrsType,
    agent_jobs::PRS_TYPE,
    agent_jobs::schema(AgentJobKind::Prs)
);
define_resource_type!(PolicyType, policy::RESOURCE_TYPE, policy::schema());
define_resource_type!(JobType, job::RESOURCE_TYPE, job::schema());
define_resource_type!(InventoryType, inventory::RESOURCE_TYPE, inventory::schema());
define_resource_type!(
    ResourceQueryType,
    resource_query::RESOURCE_TYPE,
    resource_query::schema()
);
define_resource_type!(ActionType, action::RESOURCE_TYPE, action::schema());
define_resource_type!(WorkspaceType, workspace::RESOURCE_TYPE, workspace::schema());

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(AgentType),
        Box::new(AgentDeployType),
        Box::new(AgentHealthType),
        Box::new(AgentPrsType),
        Box::new(PolicyType),
        Box::new(JobType),
        Box::new(InventoryType),
        Box::new(ResourceQueryType),
        Box::new(ActionType),
        Box::new(WorkspaceType),
    ]
}
