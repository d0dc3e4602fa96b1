//! Organization entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant of the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    /// Human-readable name
    pub name: String,
    /// Unique domain the organization is reachable under (e.g. `acme.com`)
    pub domain: String,
    /// IANA timezone name used for reporting
    pub timezone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new active organization in the UTC timezone
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domain: domain.into(),
            timezone: "UTC".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the timezone
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }
}
