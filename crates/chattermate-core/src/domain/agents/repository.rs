//! Agent repository
//!
//! The only reader and writer of agent rows. Besides plain CRUD it owns the
//! field normalization rules for instructions and tools and keeps at most one
//! default agent per organization when agents are updated.
//!
//! Creating an agent with `is_default = true` does NOT clear an existing
//! default; only [`AgentRepository::update`] reassigns the default.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::entity::{
    Agent, AgentDetails, AgentType, AgentUpdate, InstructionsInput, NewAgent, decode_instructions,
    decode_tools,
};
use crate::domain::groups::UserGroupRepository;
use crate::domain::organizations::OrganizationRepository;
use crate::error::{Error, Result};
use crate::storage::Database;

const SELECT_COLUMNS: &str = r#"
    SELECT id, organization_id, name, display_name, description, agent_type,
           instructions, tools, transfer_to_human, is_default, is_active,
           created_at, updated_at
    FROM agents
"#;

/// An agent identifier in native or textual form
pub trait AgentKey {
    /// Resolve to the native identifier, failing on malformed text
    fn into_agent_id(self) -> Result<Uuid>;
}

impl AgentKey for Uuid {
    fn into_agent_id(self) -> Result<Uuid> {
        Ok(self)
    }
}

impl AgentKey for &Uuid {
    fn into_agent_id(self) -> Result<Uuid> {
        Ok(*self)
    }
}

impl AgentKey for &str {
    fn into_agent_id(self) -> Result<Uuid> {
        Uuid::parse_str(self.trim()).map_err(|_| Error::InvalidIdentifier(self.to_string()))
    }
}

impl AgentKey for &String {
    fn into_agent_id(self) -> Result<Uuid> {
        self.as_str().into_agent_id()
    }
}

impl AgentKey for String {
    fn into_agent_id(self) -> Result<Uuid> {
        self.as_str().into_agent_id()
    }
}

/// Encode tools on create: text is taken as already encoded.
fn encode_tools_for_create(tools: &Value) -> Result<String> {
    match tools {
        Value::String(encoded) => Ok(encoded.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// Lenient instruction coercion used by updates. Never fails.
///
/// Text holding a JSON array becomes that list; any other text, including
/// malformed JSON and JSON scalars or objects, becomes a one-item list.
pub fn coerce_instructions(input: InstructionsInput) -> Vec<String> {
    match input {
        InstructionsInput::List(list) => list,
        InstructionsInput::Text(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
            _ => vec![text],
        },
    }
}

/// Agent repository for database operations
pub struct AgentRepository<'a> {
    db: &'a Database,
}

impl<'a> AgentRepository<'a> {
    /// Create a new agent repository over a caller-owned database handle
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create and persist a new agent.
    ///
    /// The owning organization must exist; a foreign-key violation is
    /// returned as [`Error::DatabaseError`]. Names are not checked for
    /// uniqueness here.
    pub async fn create(&self, new: NewAgent) -> Result<Agent> {
        let tools = new.tools.as_ref().map(encode_tools_for_create).transpose()?;
        let agent = Agent::from_new(new);

        sqlx::query(
            r#"
            INSERT INTO agents (
                id, organization_id, name, display_name, description, agent_type,
                instructions, tools, transfer_to_human, is_default, is_active,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(agent.id.to_string())
        .bind(agent.organization_id.to_string())
        .bind(&agent.name)
        .bind(&agent.display_name)
        .bind(&agent.description)
        .bind(agent.agent_type.as_str())
        .bind(agent.encoded_instructions()?)
        .bind(&tools)
        .bind(agent.transfer_to_human)
        .bind(agent.is_default)
        .bind(agent.is_active)
        .bind(agent.created_at)
        .bind(agent.updated_at)
        .execute(self.db.pool())
        .await?;

        info!(
            agent_id = %agent.id,
            organization_id = %agent.organization_id,
            name = %agent.name,
            is_default = agent.is_default,
            "Created agent"
        );

        self.get_agent(agent.id)
            .await?
            .ok_or_else(|| Error::AgentNotFound(agent.id.to_string()))
    }

    /// Get an agent by name within an organization
    pub async fn get_by_name(&self, name: &str, organization_id: Uuid) -> Result<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(&format!(
            "{} WHERE name = ? AND organization_id = ? ORDER BY created_at, rowid LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(name)
        .bind(organization_id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(AgentRow::into_agent).transpose()
    }

    /// Get an agent by ID, regardless of organization
    pub async fn get_agent(&self, agent_id: Uuid) -> Result<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(agent_id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        debug!(agent_id = %agent_id, found = row.is_some(), "Loaded agent");
        row.map(AgentRow::into_agent).transpose()
    }

    /// Get an agent by ID, regardless of organization
    pub async fn get_by_id(&self, agent_id: Uuid) -> Result<Option<Agent>> {
        self.get_agent(agent_id).await
    }

    /// Get an agent with its groups and organization loaded.
    ///
    /// Accepts the identifier as a [`Uuid`] or as text; malformed text fails
    /// with [`Error::InvalidIdentifier`].
    pub async fn get_by_agent_id(&self, agent_id: impl AgentKey) -> Result<Option<AgentDetails>> {
        let agent_id = agent_id.into_agent_id()?;

        let Some(agent) = self.get_agent(agent_id).await? else {
            return Ok(None);
        };

        let groups = UserGroupRepository::new(self.db)
            .list_for_agent(agent.id)
            .await?;
        let organization = OrganizationRepository::new(self.db)
            .get(agent.organization_id)
            .await?;

        Ok(Some(AgentDetails {
            agent,
            groups,
            organization,
        }))
    }

    /// Agents of an organization, optionally excluding soft-deleted ones
    pub async fn get_org_agents(
        &self,
        organization_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Agent>> {
        let sql = if active_only {
            format!(
                "{} WHERE organization_id = ? AND is_active = 1 ORDER BY created_at, rowid",
                SELECT_COLUMNS
            )
        } else {
            format!(
                "{} WHERE organization_id = ? ORDER BY created_at, rowid",
                SELECT_COLUMNS
            )
        };

        let rows: Vec<AgentRow> = sqlx::query_as(&sql)
            .bind(organization_id.to_string())
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(AgentRow::into_agent).collect()
    }

    /// All agents of an organization, active or not
    pub async fn get_all_agents(&self, organization_id: Uuid) -> Result<Vec<Agent>> {
        self.get_org_agents(organization_id, false).await
    }

    /// Active agents of an organization
    pub async fn get_active_agents(&self, organization_id: Uuid) -> Result<Vec<Agent>> {
        self.get_org_agents(organization_id, true).await
    }

    /// Every agent across all organizations
    pub async fn get_all(&self) -> Result<Vec<Agent>> {
        let rows: Vec<AgentRow> =
            sqlx::query_as(&format!("{} ORDER BY created_at, rowid", SELECT_COLUMNS))
                .fetch_all(self.db.pool())
                .await?;

        rows.into_iter().map(AgentRow::into_agent).collect()
    }

    /// The active default agent of an organization
    pub async fn get_default_agents(&self, organization_id: Uuid) -> Result<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(&format!(
            "{} WHERE organization_id = ? AND is_default = 1 AND is_active = 1 ORDER BY created_at, rowid LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(organization_id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(AgentRow::into_agent).transpose()
    }

    /// Apply a partial update. Returns `None` when the agent does not exist.
    ///
    /// Clearing other defaults and writing this agent happen in one
    /// transaction. Its first statement is a write, so the write lock is held
    /// before the row is read and concurrent updates queue behind it.
    pub async fn update(&self, agent_id: Uuid, update: AgentUpdate) -> Result<Option<Agent>> {
        let mut tx = self.db.pool().begin().await?;

        let touched = sqlx::query("UPDATE agents SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(agent_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if touched == 0 {
            tx.rollback().await?;
            debug!(agent_id = %agent_id, "Update skipped, agent not found");
            return Ok(None);
        }

        let row: AgentRow = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(agent_id.to_string())
            .fetch_one(&mut *tx)
            .await?;

        let stored_tools = row.tools.clone();
        let mut agent = row.into_agent()?;

        if let Some(instructions) = update.instructions.clone() {
            agent.instructions = coerce_instructions(instructions);
        }

        let tools = match &update.tools {
            Some(value) => Some(serde_json::to_string(value)?),
            None => stored_tools,
        };

        if update.sets_default() {
            let cleared = clear_other_defaults(&mut tx, agent.organization_id, agent.id).await?;
            if cleared > 0 {
                info!(
                    organization_id = %agent.organization_id,
                    agent_id = %agent.id,
                    cleared,
                    "Reassigned default agent"
                );
            }
        }

        update.apply_plain_fields(&mut agent);
        agent.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE agents SET
                name = ?,
                display_name = ?,
                description = ?,
                agent_type = ?,
                instructions = ?,
                tools = ?,
                transfer_to_human = ?,
                is_default = ?,
                is_active = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&agent.name)
        .bind(&agent.display_name)
        .bind(&agent.description)
        .bind(agent.agent_type.as_str())
        .bind(agent.encoded_instructions()?)
        .bind(&tools)
        .bind(agent.transfer_to_human)
        .bind(agent.is_default)
        .bind(agent.is_active)
        .bind(agent.updated_at)
        .bind(agent.id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(agent_id = %agent.id, "Updated agent");

        self.get_agent(agent.id).await
    }

    /// Soft delete: mark the agent inactive.
    ///
    /// Returns `false` only when no such agent exists; deleting an already
    /// inactive agent returns `true`.
    pub async fn delete(&self, agent_id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE agents SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(agent_id.to_string())
            .execute(self.db.pool())
            .await?;

        let found = result.rows_affected() > 0;
        if found {
            info!(agent_id = %agent_id, "Deactivated agent");
        }
        Ok(found)
    }

    /// Count all agents of an organization, including soft-deleted ones
    pub async fn count_by_organization(&self, organization_id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM agents WHERE organization_id = ?")
            .bind(organization_id.to_string())
            .fetch_one(self.db.pool())
            .await?;

        Ok(row.0)
    }
}

async fn clear_other_defaults(
    tx: &mut Transaction<'_, Sqlite>,
    organization_id: Uuid,
    keep: Uuid,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE agents SET is_default = 0, updated_at = ?
        WHERE organization_id = ? AND is_default = 1 AND id != ?
        "#,
    )
    .bind(Utc::now())
    .bind(organization_id.to_string())
    .bind(keep.to_string())
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// Database row for an agent
#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    organization_id: String,
    name: String,
    display_name: Option<String>,
    description: Option<String>,
    agent_type: String,
    instructions: String,
    tools: Option<String>,
    transfer_to_human: bool,
    is_default: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AgentRow {
    fn into_agent(self) -> Result<Agent> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| Error::Parse(format!("Invalid agent ID: {}", e)))?;
        let organization_id = Uuid::parse_str(&self.organization_id)
            .map_err(|e| Error::Parse(format!("Invalid organization ID: {}", e)))?;
        let agent_type = AgentType::parse(&self.agent_type)
            .ok_or_else(|| Error::Parse(format!("Invalid agent type: {}", self.agent_type)))?;
        let instructions = decode_instructions(&self.instructions)?;
        let tools = self.tools.as_deref().map(decode_tools);

        Ok(Agent {
            id,
            organization_id,
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            agent_type,
            instructions,
            tools,
            transfer_to_human: self.transfer_to_human,
            is_default: self.is_default,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
