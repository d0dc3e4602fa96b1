//! Organization repository for database operations

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::entity::Organization;
use crate::error::{Error, Result};
use crate::storage::Database;

const SELECT_COLUMNS: &str =
    "SELECT id, name, domain, timezone, is_active, created_at, updated_at FROM organizations";

/// Organization repository for database operations
pub struct OrganizationRepository<'a> {
    db: &'a Database,
}

impl<'a> OrganizationRepository<'a> {
    /// Create a new organization repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new organization
    pub async fn create(&self, org: &Organization) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, domain, timezone, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(org.id.to_string())
        .bind(&org.name)
        .bind(&org.domain)
        .bind(&org.timezone)
        .bind(org.is_active)
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(self.db.pool())
        .await?;

        info!(organization_id = %org.id, domain = %org.domain, "Created organization");
        Ok(())
    }

    /// Get an organization by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<Organization>> {
        let row: Option<OrganizationRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        debug!(organization_id = %id, found = row.is_some(), "Loaded organization");
        row.map(OrganizationRow::into_organization).transpose()
    }

    /// Get an organization by its unique domain
    pub async fn get_by_domain(&self, domain: &str) -> Result<Option<Organization>> {
        let row: Option<OrganizationRow> =
            sqlx::query_as(&format!("{} WHERE domain = ?", SELECT_COLUMNS))
                .bind(domain)
                .fetch_optional(self.db.pool())
                .await?;

        row.map(OrganizationRow::into_organization).transpose()
    }

    /// List all organizations, ordered by name
    pub async fn list(&self) -> Result<Vec<Organization>> {
        let rows: Vec<OrganizationRow> =
            sqlx::query_as(&format!("{} ORDER BY name", SELECT_COLUMNS))
                .fetch_all(self.db.pool())
                .await?;

        rows.into_iter()
            .map(OrganizationRow::into_organization)
            .collect()
    }

    /// Count all organizations
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }
}

/// Database row for an organization
#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    name: String,
    domain: String,
    timezone: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self) -> Result<Organization> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid organization ID: {}", e)))?;

        Ok(Organization {
            id,
            name: self.name,
            domain: self.domain,
            timezone: self.timezone,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
