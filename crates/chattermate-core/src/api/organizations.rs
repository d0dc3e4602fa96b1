//! Organizations API
//!
//! High-level async functions for organization operations.

use serde::{Deserialize, Serialize};

use super::{require_text, resolve_organization};
use crate::domain::organizations::{Organization, OrganizationRepository};
use crate::storage::Database;
use crate::{Error, Result};

/// Organization summary DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub timezone: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Organization> for OrganizationSummary {
    fn from(o: Organization) -> Self {
        Self {
            id: o.id.to_string(),
            name: o.name,
            domain: o.domain,
            timezone: o.timezone,
            is_active: o.is_active,
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
        }
    }
}

/// Create organization request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Whether the installation has been set up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupStatus {
    /// `setup` or `not_setup`
    pub status: String,
    pub organization_count: i64,
}

impl SetupStatus {
    pub fn is_setup(&self) -> bool {
        self.status == "setup"
    }
}

/// Create a new organization
pub async fn create(db: &Database, request: CreateOrganizationRequest) -> Result<OrganizationSummary> {
    require_text("name", &request.name)?;
    require_text("domain", &request.domain)?;

    let repo = OrganizationRepository::new(db);
    let domain = request.domain.trim().to_lowercase();

    if repo.get_by_domain(&domain).await?.is_some() {
        return Err(Error::InvalidInput(format!(
            "Organization with domain '{}' already exists",
            domain
        )));
    }

    let mut org = Organization::new(request.name.trim(), domain);
    if let Some(tz) = request.timezone.filter(|tz| !tz.trim().is_empty()) {
        org = org.with_timezone(tz.trim());
    }

    repo.create(&org).await?;
    Ok(OrganizationSummary::from(org))
}

/// Get an organization by ID or domain
pub async fn get(db: &Database, key: &str) -> Result<OrganizationSummary> {
    resolve_organization(db, key).await.map(OrganizationSummary::from)
}

/// List all organizations
pub async fn list(db: &Database) -> Result<Vec<OrganizationSummary>> {
    let orgs = OrganizationRepository::new(db).list().await?;
    Ok(orgs.into_iter().map(OrganizationSummary::from).collect())
}

/// Setup status, derived from whether any organization exists
pub async fn setup_status(db: &Database) -> Result<SetupStatus> {
    let count = OrganizationRepository::new(db).count().await?;
    let status = if count > 0 { "setup" } else { "not_setup" };

    Ok(SetupStatus {
        status: status.to_string(),
        organization_count: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, domain: &str) -> CreateOrganizationRequest {
        CreateOrganizationRequest {
            name: name.to_string(),
            domain: domain.to_string(),
            timezone: None,
        }
    }

    #[tokio::test]
    async fn test_setup_status_follows_store() {
        let db = Database::in_memory().await.unwrap();

        let before = setup_status(&db).await.unwrap();
        assert_eq!(before.status, "not_setup");
        assert!(!before.is_setup());

        create(&db, request("Acme", "acme.com")).await.unwrap();

        let after = setup_status(&db).await.unwrap();
        assert_eq!(after.status, "setup");
        assert_eq!(after.organization_count, 1);
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let db = Database::in_memory().await.unwrap();

        let created = create(
            &db,
            CreateOrganizationRequest {
                name: "  Acme  ".into(),
                domain: "ACME.com".into(),
                timezone: Some("Europe/Paris".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.name, "Acme");
        assert_eq!(created.domain, "acme.com");
        assert_eq!(created.timezone, "Europe/Paris");

        let dup = create(&db, request("Other", "acme.com")).await;
        assert!(matches!(dup, Err(Error::InvalidInput(_))));

        let blank = create(&db, request(" ", "blank.com")).await;
        assert!(matches!(blank, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let db = Database::in_memory().await.unwrap();
        let created = create(&db, request("Globex", "globex.io")).await.unwrap();

        assert_eq!(get(&db, &created.id).await.unwrap().domain, "globex.io");
        assert_eq!(get(&db, "globex.io").await.unwrap().id, created.id);
        assert!(get(&db, "missing.io").await.unwrap_err().is_not_found());
        assert_eq!(list(&db).await.unwrap().len(), 1);
    }
}
