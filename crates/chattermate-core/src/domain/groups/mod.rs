//! User group domain module
//!
//! Groups of users inside an organization. Agents are assigned to groups,
//! which is the `groups` relationship loaded by
//! [`AgentRepository::get_by_agent_id`](crate::domain::agents::AgentRepository::get_by_agent_id).

pub mod entity;
pub mod repository;

pub use entity::UserGroup;
pub use repository::UserGroupRepository;
