//! Health API
//!
//! Service identity, liveness and diagnostics.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::Config;
use crate::storage::{CURRENT_VERSION, Database};

/// Service identity returned by the root endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Liveness reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pong {
    pub status: String,
    pub message: String,
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Health status enum, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Warning,
    Error,
}

/// Overall system health report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: String,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: Some(message.into()),
        }
    }
}

/// Service identity from configuration
pub fn service_info(config: &Config) -> ServiceInfo {
    ServiceInfo {
        name: config.service.name.clone(),
        version: config.service.version.clone(),
        description: config.service.description.clone(),
    }
}

/// Liveness probe; never touches the database
pub fn ping() -> Pong {
    Pong {
        status: "pong".to_string(),
        message: "Service is alive!".to_string(),
    }
}

/// Run all health checks (doctor command)
pub async fn doctor(db: &Database, config: &Config) -> Result<HealthReport> {
    let checks = vec![
        check_database(db).await,
        check_schema(db).await,
        check_config(config),
    ];

    let overall_status = checks
        .iter()
        .map(|c| c.status)
        .max()
        .unwrap_or(HealthStatus::Ok);

    Ok(HealthReport {
        overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn check_database(db: &Database) -> HealthCheck {
    match db.health_check().await {
        Ok(()) => HealthCheck::new(
            "Database",
            HealthStatus::Ok,
            format!("Connected at {}", db.path().display()),
        ),
        Err(e) => HealthCheck::new("Database", HealthStatus::Error, format!("Query failed: {:#}", e)),
    }
}

async fn check_schema(db: &Database) -> HealthCheck {
    match db.migration_status().await {
        Ok(status) if status.current_version >= CURRENT_VERSION => HealthCheck::new(
            "Schema",
            HealthStatus::Ok,
            format!("At version {}", status.current_version),
        ),
        Ok(status) => HealthCheck::new(
            "Schema",
            HealthStatus::Warning,
            format!(
                "At version {} of {} (run `chattermate db migrate`)",
                status.current_version, CURRENT_VERSION
            ),
        ),
        Err(e) => HealthCheck::new("Schema", HealthStatus::Error, format!("{:#}", e)),
    }
}

fn check_config(config: &Config) -> HealthCheck {
    if let Err(e) = config.validate() {
        return HealthCheck::new("Configuration", HealthStatus::Error, e.to_string());
    }

    match Config::config_path() {
        Ok(path) if path.exists() => HealthCheck::new(
            "Configuration",
            HealthStatus::Ok,
            format!("Found at {}", path.display()),
        ),
        Ok(path) => HealthCheck::new(
            "Configuration",
            HealthStatus::Warning,
            format!("Not found at {} (using defaults)", path.display()),
        ),
        Err(e) => HealthCheck::new("Configuration", HealthStatus::Warning, e.to_string()),
    }
}
