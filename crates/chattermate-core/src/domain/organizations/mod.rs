//! Organization domain module
//!
//! Organizations are the tenants of ChatterMate. Every agent and user group
//! belongs to exactly one organization.

pub mod entity;
pub mod repository;

pub use entity::Organization;
pub use repository::OrganizationRepository;
