//! Agents API
//!
//! High-level async functions for agent operations. Input is validated here;
//! the repository itself accepts whatever it is handed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::organizations::OrganizationSummary;
use super::{require_text, resolve_organization};
use crate::domain::agents::{
    Agent, AgentDetails, AgentKey, AgentRepository, AgentType, AgentUpdate, InstructionsInput,
    NewAgent,
};
use crate::domain::groups::UserGroup;
use crate::storage::Database;
use crate::{Error, Result};

/// Agent summary DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub agent_type: String,
    pub instructions: Vec<String>,
    pub tools: Option<Value>,
    pub transfer_to_human: bool,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Agent> for AgentSummary {
    fn from(a: Agent) -> Self {
        Self {
            id: a.id.to_string(),
            organization_id: a.organization_id.to_string(),
            name: a.name,
            display_name: a.display_name,
            description: a.description,
            agent_type: a.agent_type.as_str().to_string(),
            instructions: a.instructions,
            tools: a.tools,
            transfer_to_human: a.transfer_to_human,
            is_default: a.is_default,
            is_active: a.is_active,
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

/// Group membership as shown with an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<UserGroup> for GroupSummary {
    fn from(g: UserGroup) -> Self {
        Self {
            id: g.id.to_string(),
            name: g.name,
            description: g.description,
        }
    }
}

/// Agent with its groups and organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDetail {
    #[serde(flatten)]
    pub agent: AgentSummary,
    pub groups: Vec<GroupSummary>,
    pub organization: Option<OrganizationSummary>,
}

impl From<AgentDetails> for AgentDetail {
    fn from(d: AgentDetails) -> Self {
        Self {
            agent: AgentSummary::from(d.agent),
            groups: d.groups.into_iter().map(GroupSummary::from).collect(),
            organization: d.organization.map(OrganizationSummary::from),
        }
    }
}

/// Create agent request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentRequest {
    /// Organization ID or domain; `org_id` is accepted for older clients
    #[serde(alias = "org_id")]
    pub organization: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub instructions: Option<InstructionsInput>,
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub transfer_to_human: bool,
    #[serde(default)]
    pub is_default: bool,
}

impl CreateAgentRequest {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
            display_name: None,
            description: None,
            agent_type: None,
            instructions: None,
            tools: None,
            transfer_to_human: false,
            is_default: false,
        }
    }
}

/// Update agent request; unknown fields are rejected when deserializing
pub type UpdateAgentRequest = AgentUpdate;

fn parse_agent_type(value: &str) -> Result<AgentType> {
    AgentType::parse(value.trim()).ok_or_else(|| {
        let allowed: Vec<&str> = AgentType::ALL.iter().map(AgentType::as_str).collect();
        Error::InvalidInput(format!(
            "Unknown agent type '{}'. Expected one of: {}",
            value,
            allowed.join(", ")
        ))
    })
}

/// Create a new agent
pub async fn create(db: &Database, request: CreateAgentRequest) -> Result<AgentSummary> {
    require_text("name", &request.name)?;
    let org = resolve_organization(db, &request.organization).await?;
    let repo = AgentRepository::new(db);

    let name = request.name.trim().to_string();
    if repo.get_by_name(&name, org.id).await?.is_some() {
        return Err(Error::AgentNameTaken(name));
    }

    let mut new = NewAgent::new(org.id, name);
    new.display_name = request.display_name;
    new.description = request.description;
    if let Some(agent_type) = request.agent_type.as_deref() {
        new.agent_type = parse_agent_type(agent_type)?;
    }
    new.instructions = request.instructions;
    new.tools = request.tools;
    new.transfer_to_human = request.transfer_to_human;
    new.is_default = request.is_default;

    let agent = repo.create(new).await?;
    Ok(AgentSummary::from(agent))
}

/// Get an agent by ID, with its groups and organization
pub async fn get(db: &Database, id: &str) -> Result<AgentDetail> {
    AgentRepository::new(db)
        .get_by_agent_id(id)
        .await?
        .map(AgentDetail::from)
        .ok_or_else(|| Error::AgentNotFound(id.to_string()))
}

/// List the agents of an organization
pub async fn list(
    db: &Database,
    organization: &str,
    include_inactive: bool,
) -> Result<Vec<AgentSummary>> {
    let org = resolve_organization(db, organization).await?;
    let agents = AgentRepository::new(db)
        .get_org_agents(org.id, !include_inactive)
        .await?;

    Ok(agents.into_iter().map(AgentSummary::from).collect())
}

/// Update an agent
pub async fn update(
    db: &Database,
    id: &str,
    mut request: UpdateAgentRequest,
) -> Result<AgentSummary> {
    if request.is_empty() {
        return Err(Error::InvalidInput("No fields to update".to_string()));
    }
    if let Some(name) = request.name.take() {
        require_text("name", &name)?;
        request.name = Some(name.trim().to_string());
    }

    let agent_id = id.into_agent_id()?;
    let repo = AgentRepository::new(db);

    if let Some(name) = request.name.as_deref() {
        let current = repo
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| Error::AgentNotFound(id.to_string()))?;
        if let Some(other) = repo.get_by_name(name, current.organization_id).await? {
            if other.id != agent_id {
                return Err(Error::AgentNameTaken(name.to_string()));
            }
        }
    }

    repo.update(agent_id, request)
        .await?
        .map(AgentSummary::from)
        .ok_or_else(|| Error::AgentNotFound(id.to_string()))
}

/// Deactivate an agent
pub async fn delete(db: &Database, id: &str) -> Result<()> {
    let agent_id = id.into_agent_id()?;
    if AgentRepository::new(db).delete(agent_id).await? {
        Ok(())
    } else {
        Err(Error::AgentNotFound(id.to_string()))
    }
}

/// The default agent of an organization, if one is set and active
pub async fn default_agent(db: &Database, organization: &str) -> Result<Option<AgentSummary>> {
    let org = resolve_organization(db, organization).await?;
    let agent = AgentRepository::new(db).get_default_agents(org.id).await?;
    Ok(agent.map(AgentSummary::from))
}

/// Number of agents in an organization, including inactive ones
pub async fn count(db: &Database, organization: &str) -> Result<i64> {
    let org = resolve_organization(db, organization).await?;
    AgentRepository::new(db).count_by_organization(org.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::organizations::{self, CreateOrganizationRequest};
    use serde_json::json;

    async fn setup() -> Database {
        let db = Database::in_memory().await.unwrap();
        organizations::create(
            &db,
            CreateOrganizationRequest {
                name: "Acme".into(),
                domain: "acme.com".into(),
                timezone: None,
            },
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let db = setup().await;

        let blank = create(&db, CreateAgentRequest::new("acme.com", "  ")).await;
        assert!(matches!(blank, Err(Error::InvalidInput(_))));

        let mut bad_type = CreateAgentRequest::new("acme.com", "Bot");
        bad_type.agent_type = Some("wizard".into());
        let err = create(&db, bad_type).await.unwrap_err();
        assert!(err.to_string().contains("customer_support"));

        let no_org = create(&db, CreateAgentRequest::new("nowhere.io", "Bot")).await;
        assert!(matches!(no_org, Err(Error::OrganizationNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let db = setup().await;

        create(&db, CreateAgentRequest::new("acme.com", "Support"))
            .await
            .unwrap();
        let dup = create(&db, CreateAgentRequest::new("acme.com", "Support")).await;

        assert!(matches!(dup, Err(Error::AgentNameTaken(name)) if name == "Support"));
    }

    #[tokio::test]
    async fn test_create_from_json_payload() {
        let db = setup().await;

        let request: CreateAgentRequest = serde_json::from_value(json!({
            "org_id": "acme.com",
            "name": "Sales",
            "agent_type": "sales",
            "instructions": "Qualify leads",
            "tools": { "crm": true },
        }))
        .unwrap();

        let created = create(&db, request).await.unwrap();
        assert_eq!(created.agent_type, "sales");
        assert_eq!(created.instructions, vec!["Qualify leads"]);
        assert_eq!(created.tools, Some(json!({ "crm": true })));
    }

    #[tokio::test]
    async fn test_get_reports_missing_and_malformed_ids() {
        let db = setup().await;

        let created = create(&db, CreateAgentRequest::new("acme.com", "Support"))
            .await
            .unwrap();
        let detail = get(&db, &created.id).await.unwrap();
        assert_eq!(detail.agent.name, "Support");
        assert_eq!(
            detail.organization.map(|o| o.domain).as_deref(),
            Some("acme.com")
        );

        let missing = get(&db, &uuid::Uuid::new_v4().to_string()).await;
        assert!(matches!(missing, Err(Error::AgentNotFound(_))));

        let malformed = get(&db, "abc").await;
        assert!(matches!(malformed, Err(Error::InvalidIdentifier(_))));
    }

    #[tokio::test]
    async fn test_update_trims_name_like_create() {
        let db = setup().await;
        create(&db, CreateAgentRequest::new("acme.com", "Support"))
            .await
            .unwrap();
        let other = create(&db, CreateAgentRequest::new("acme.com", "Sales"))
            .await
            .unwrap();

        let padded_dup = UpdateAgentRequest {
            name: Some(" Support ".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&db, &other.id, padded_dup).await,
            Err(Error::AgentNameTaken(name)) if name == "Support"
        ));

        let padded = UpdateAgentRequest {
            name: Some("  Billing ".into()),
            ..Default::default()
        };
        let renamed = update(&db, &other.id, padded).await.unwrap();
        assert_eq!(renamed.name, "Billing");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = setup().await;
        let a = create(&db, CreateAgentRequest::new("acme.com", "A")).await.unwrap();
        let b = create(&db, CreateAgentRequest::new("acme.com", "B")).await.unwrap();

        let empty = update(&db, &a.id, UpdateAgentRequest::default()).await;
        assert!(matches!(empty, Err(Error::InvalidInput(_))));

        let rename = UpdateAgentRequest {
            name: Some("B".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&db, &a.id, rename).await,
            Err(Error::AgentNameTaken(_))
        ));

        let promote: UpdateAgentRequest = serde_json::from_value(json!({ "is_default": true })).unwrap();
        update(&db, &a.id, promote.clone()).await.unwrap();
        update(&db, &b.id, promote).await.unwrap();
        let current = default_agent(&db, "acme.com").await.unwrap().unwrap();
        assert_eq!(current.id, b.id);

        delete(&db, &b.id).await.unwrap();
        delete(&db, &b.id).await.unwrap();
        assert!(default_agent(&db, "acme.com").await.unwrap().is_none());

        assert_eq!(list(&db, "acme.com", false).await.unwrap().len(), 1);
        assert_eq!(list(&db, "acme.com", true).await.unwrap().len(), 2);
        assert_eq!(count(&db, "acme.com").await.unwrap(), 2);

        let ghost = uuid::Uuid::new_v4().to_string();
        assert!(matches!(delete(&db, &ghost).await, Err(Error::AgentNotFound(_))));
        let touch = UpdateAgentRequest {
            description: Some("x".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&db, &ghost, touch).await,
            Err(Error::AgentNotFound(_))
        ));
    }
}
