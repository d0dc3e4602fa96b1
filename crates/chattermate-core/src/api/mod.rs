//! API Module
//!
//! Async functions the outer surfaces (HTTP handlers, the CLI) call. Each
//! function borrows a caller-owned [`Database`], validates its input and
//! translates domain entities to DTOs suitable for serialization.

pub mod agents;
pub mod health;
pub mod organizations;

use crate::domain::organizations::{Organization, OrganizationRepository};
use crate::storage::Database;
use crate::{Error, Result};
use uuid::Uuid;

/// Resolve an organization from its ID or its domain
pub async fn resolve_organization(db: &Database, key: &str) -> Result<Organization> {
    let repo = OrganizationRepository::new(db);
    let key = key.trim();

    let found = match Uuid::parse_str(key) {
        Ok(id) => repo.get(id).await?,
        Err(_) => repo.get_by_domain(key).await?,
    };

    found.ok_or_else(|| Error::OrganizationNotFound(key.to_string()))
}

/// Reject blank required text fields
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_organization_by_id_or_domain() {
        let db = Database::in_memory().await.unwrap();
        let org = Organization::new("Acme", "acme.com");
        OrganizationRepository::new(&db).create(&org).await.unwrap();

        let by_id = resolve_organization(&db, &org.id.to_string()).await.unwrap();
        let by_domain = resolve_organization(&db, "acme.com").await.unwrap();
        assert_eq!(by_id.id, org.id);
        assert_eq!(by_domain.id, org.id);

        let missing = resolve_organization(&db, "nowhere.org").await;
        assert!(matches!(missing, Err(Error::OrganizationNotFound(_))));
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("name", "Support").is_ok());
        assert!(matches!(
            require_text("name", "   "),
            Err(Error::InvalidInput(msg)) if msg == "name must not be empty"
        ));
    }
}
