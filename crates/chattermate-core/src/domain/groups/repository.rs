//! User group repository for database operations

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::entity::UserGroup;
use crate::error::{Error, Result};
use crate::storage::Database;

/// User group repository for database operations
pub struct UserGroupRepository<'a> {
    db: &'a Database,
}

impl<'a> UserGroupRepository<'a> {
    /// Create a new user group repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new group
    pub async fn create(&self, group: &UserGroup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (id, organization_id, name, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(group.id.to_string())
        .bind(group.organization_id.to_string())
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.created_at)
        .execute(self.db.pool())
        .await?;

        debug!(group_id = %group.id, organization_id = %group.organization_id, "Created user group");
        Ok(())
    }

    /// Get a group by ID
    pub async fn get(&self, id: Uuid) -> Result<Option<UserGroup>> {
        let row: Option<UserGroupRow> = sqlx::query_as(
            "SELECT id, organization_id, name, description, created_at FROM user_groups WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(UserGroupRow::into_group).transpose()
    }

    /// Assign an agent to a group of its own organization. Assigning twice
    /// is a no-op.
    pub async fn assign_agent(&self, group_id: Uuid, agent_id: Uuid) -> Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO agent_groups (agent_id, group_id)
            SELECT a.id, g.id
            FROM agents a
            JOIN user_groups g ON g.organization_id = a.organization_id
            WHERE a.id = ? AND g.id = ?
            "#,
        )
        .bind(agent_id.to_string())
        .bind(group_id.to_string())
        .execute(self.db.pool())
        .await?
        .rows_affected();

        if inserted == 0 && !self.is_assigned(group_id, agent_id).await? {
            return Err(Error::InvalidInput(format!(
                "Agent '{}' and group '{}' must exist in the same organization",
                agent_id, group_id
            )));
        }

        debug!(group_id = %group_id, agent_id = %agent_id, "Assigned agent to group");
        Ok(())
    }

    async fn is_assigned(&self, group_id: Uuid, agent_id: Uuid) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM agent_groups WHERE agent_id = ? AND group_id = ?")
                .bind(agent_id.to_string())
                .bind(group_id.to_string())
                .fetch_one(self.db.pool())
                .await?;
        Ok(count > 0)
    }

    /// List the groups an agent is assigned to, ordered by name
    pub async fn list_for_agent(&self, agent_id: Uuid) -> Result<Vec<UserGroup>> {
        let rows: Vec<UserGroupRow> = sqlx::query_as(
            r#"
            SELECT g.id, g.organization_id, g.name, g.description, g.created_at
            FROM user_groups g
            JOIN agent_groups ag ON ag.group_id = g.id
            WHERE ag.agent_id = ?
            ORDER BY g.name
            "#,
        )
        .bind(agent_id.to_string())
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(UserGroupRow::into_group).collect()
    }
}

/// Database row for a user group
#[derive(sqlx::FromRow)]
struct UserGroupRow {
    id: String,
    organization_id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserGroupRow {
    fn into_group(self) -> Result<UserGroup> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid group ID: {}", e)))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| Error::Parse(format!("Invalid organization ID: {}", e)))?;

        Ok(UserGroup {
            id,
            organization_id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agents::{AgentRepository, NewAgent};
    use crate::domain::organizations::{Organization, OrganizationRepository};

    async fn setup() -> (Database, Uuid) {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        let org = Organization::new("Acme", "acme.com");
        OrganizationRepository::new(&db).create(&org).await.unwrap();
        (db, org.id)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (db, org_id) = setup().await;
        let repo = UserGroupRepository::new(&db);

        let group = UserGroup::new(org_id, "Tier 1").with_description("Front line support");
        repo.create(&group).await.unwrap();

        let found = repo.get(group.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Tier 1");
        assert_eq!(found.description.as_deref(), Some("Front line support"));
        assert_eq!(found.organization_id, org_id);
    }

    #[tokio::test]
    async fn test_assign_agent_is_idempotent() {
        let (db, org_id) = setup().await;
        let repo = UserGroupRepository::new(&db);
        let agent = AgentRepository::new(&db)
            .create(NewAgent::new(org_id, "Helper"))
            .await
            .unwrap();

        let billing = UserGroup::new(org_id, "Billing");
        let admins = UserGroup::new(org_id, "Admins");
        repo.create(&billing).await.unwrap();
        repo.create(&admins).await.unwrap();

        repo.assign_agent(billing.id, agent.id).await.unwrap();
        repo.assign_agent(billing.id, agent.id).await.unwrap();
        repo.assign_agent(admins.id, agent.id).await.unwrap();

        let groups = repo.list_for_agent(agent.id).await.unwrap();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Admins", "Billing"]);
    }

    #[tokio::test]
    async fn test_assign_agent_rejects_group_of_other_organization() {
        let (db, org_id) = setup().await;
        let repo = UserGroupRepository::new(&db);
        let agent = AgentRepository::new(&db)
            .create(NewAgent::new(org_id, "Helper"))
            .await
            .unwrap();

        let other = Organization::new("Globex", "globex.io");
        OrganizationRepository::new(&db).create(&other).await.unwrap();
        let foreign = UserGroup::new(other.id, "Globex only");
        repo.create(&foreign).await.unwrap();

        let result = repo.assign_agent(foreign.id, agent.id).await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(repo.list_for_agent(agent.id).await.unwrap().is_empty());

        let details = AgentRepository::new(&db)
            .get_by_agent_id(agent.id)
            .await
            .unwrap()
            .unwrap();
        assert!(details.groups.is_empty());
    }

    #[tokio::test]
    async fn test_assign_agent_rejects_unknown_agent_or_group() {
        let (db, org_id) = setup().await;
        let repo = UserGroupRepository::new(&db);
        let group = UserGroup::new(org_id, "Tier 2");
        repo.create(&group).await.unwrap();

        let missing_agent = repo.assign_agent(group.id, Uuid::new_v4()).await;
        assert!(matches!(missing_agent, Err(Error::InvalidInput(_))));

        let agent = AgentRepository::new(&db)
            .create(NewAgent::new(org_id, "Helper"))
            .await
            .unwrap();
        let missing_group = repo.assign_agent(Uuid::new_v4(), agent.id).await;
        assert!(matches!(missing_group, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_for_unassigned_agent_is_empty() {
        let (db, _) = setup().await;
        let repo = UserGroupRepository::new(&db);

        assert!(repo.list_for_agent(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
