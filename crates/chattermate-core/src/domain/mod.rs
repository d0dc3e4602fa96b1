//! Domain layer
//!
//! Contains the tenant-scoped entities and their repositories.

pub mod agents;
pub mod groups;
pub mod organizations;
