//! ChatterMate Core Library
//!
//! This crate provides the core functionality for ChatterMate, including:
//! - Storage (SQLite connection pool + versioned migrations)
//! - Organizations, user groups and agents (domain entities and repositories)
//! - The async API layer consumed by the HTTP surface and the CLI
//! - Configuration management

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::agents::{Agent, AgentRepository, AgentType, AgentUpdate, NewAgent};
    pub use crate::domain::organizations::{Organization, OrganizationRepository};
    pub use crate::error::{Error, Result};
    pub use crate::storage::Database;
}
