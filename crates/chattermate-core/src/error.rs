//! Error types for ChatterMate

use thiserror::Error;

/// Result type alias using ChatterMate's Error
pub type Result<T> = std::result::Result<T, Error>;

/// ChatterMate error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Agent '{0}' not found. Run `chattermate agents list <org>` to see all agents.")]
    AgentNotFound(String),

    #[error("Organization '{0}' not found. Run `chattermate orgs list` to see all organizations.")]
    OrganizationNotFound(String),

    #[error("An agent named '{0}' already exists in this organization.")]
    AgentNameTaken(String),

    // Input errors (E100-E199)
    #[error("Invalid identifier '{0}': expected a UUID")]
    InvalidIdentifier(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Failed to parse stored data: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_) => "E001",
            Self::OrganizationNotFound(_) => "E002",
            Self::AgentNameTaken(_) => "E003",
            Self::InvalidIdentifier(_) => "E100",
            Self::InvalidInput(_) => "E101",
            Self::DatabaseError(_) => "E400",
            Self::Parse(_) => "E401",
            Self::Serialization(_) => "E402",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether this error means the requested entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AgentNotFound(_) | Self::OrganizationNotFound(_))
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::AgentNotFound(_) => Some("chattermate agents list <org>".to_string()),
            Self::OrganizationNotFound(_) => Some("chattermate orgs list".to_string()),
            Self::AgentNameTaken(name) => Some(format!(
                "chattermate agents update <id> --name '{} (copy)'",
                name
            )),
            Self::ConfigError(_) => Some("chattermate config list".to_string()),
            _ => None,
        }
    }
}
