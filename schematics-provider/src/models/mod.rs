//! Wire types of the Schematics REST API
//!
//! Every field is optional and omitted from JSON when unset, so a request
//! built from a partial attribute map never overwrites server defaults.

mod action;
mod agent;
mod inventory;
mod job;
mod policy;
mod resource_query;
mod variable;
mod workspace;

pub use action::*;
pub use agent::*;
pub use inventory::*;
pub use job::*;
pub use policy::*;
pub use resource_query::*;
pub use variable::*;
pub use workspace::*;
