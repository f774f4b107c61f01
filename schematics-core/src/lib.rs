//! Schematics Core
//!
//! Host framework seam for the Schematics provider: attribute values and
//! state, schemas, attribute diffing, the provider hook trait and the job
//! status poller.

pub mod differ;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod wait;
