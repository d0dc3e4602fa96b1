//! Agent entity
//!
//! An agent is one configurable conversational assistant owned by an
//! organization. Instructions and tools are stored as JSON text columns;
//! this module owns the conversion between the typed fields and their
//! stored form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::groups::UserGroup;
use crate::domain::organizations::Organization;
use crate::error::{Error, Result};

/// Agent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    #[default]
    General,
    CustomerSupport,
    Sales,
    TechSupport,
    Custom,
}

impl AgentType {
    /// All variants, in display order
    pub const ALL: [AgentType; 5] = [
        AgentType::General,
        AgentType::CustomerSupport,
        AgentType::Sales,
        AgentType::TechSupport,
        AgentType::Custom,
    ];

    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::General => "general",
            AgentType::CustomerSupport => "customer_support",
            AgentType::Sales => "sales",
            AgentType::TechSupport => "tech_support",
            AgentType::Custom => "custom",
        }
    }

    /// Parse from database string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instructions as supplied by a caller: either a list or a single text value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstructionsInput {
    List(Vec<String>),
    Text(String),
}

impl From<Vec<String>> for InstructionsInput {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<&str> for InstructionsInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for InstructionsInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl InstructionsInput {
    /// Entity-level normalization: a single text is one directive.
    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::List(list) => list,
            Self::Text(text) => vec![text],
        }
    }
}

/// A conversational agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub agent_type: AgentType,
    /// Ordered directives
    pub instructions: Vec<String>,
    /// Decoded tool configuration
    pub tools: Option<Value>,
    pub transfer_to_human: bool,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Build a fresh entity from creation fields, generating its identifier.
    ///
    /// Tools are carried through decoded; encoding happens at the storage boundary.
    pub fn from_new(new: NewAgent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            name: new.name,
            display_name: new.display_name,
            description: new.description,
            agent_type: new.agent_type,
            instructions: new
                .instructions
                .map(InstructionsInput::into_list)
                .unwrap_or_default(),
            tools: new.tools,
            transfer_to_human: new.transfer_to_human,
            is_default: new.is_default,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Encode the instruction list for storage
    pub fn encoded_instructions(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.instructions)?)
    }

    /// Label shown to end users
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Decode a stored instruction list
pub(crate) fn decode_instructions(text: &str) -> Result<Vec<String>> {
    serde_json::from_str(text).map_err(|e| Error::Parse(format!("Invalid instructions JSON: {}", e)))
}

/// Decode stored tools. Text that is not valid JSON is kept as a string value.
pub(crate) fn decode_tools(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn default_true() -> bool {
    true
}

/// Fields accepted when creating an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    /// Owning organization; `org_id` is accepted for older clients
    #[serde(alias = "org_id")]
    pub organization_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub agent_type: AgentType,
    #[serde(default)]
    pub instructions: Option<InstructionsInput>,
    /// Structured tool configuration, or text that is already encoded
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub transfer_to_human: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewAgent {
    pub fn new(organization_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            organization_id,
            name: name.into(),
            display_name: None,
            description: None,
            agent_type: AgentType::default(),
            instructions: None,
            tools: None,
            transfer_to_human: false,
            is_default: false,
            is_active: true,
        }
    }

    pub fn with_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<InstructionsInput>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tools(mut self, tools: Value) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Fields that can be changed on an existing agent.
///
/// The owning organization and identifier are not updatable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub agent_type: Option<AgentType>,
    pub instructions: Option<InstructionsInput>,
    pub tools: Option<Value>,
    pub transfer_to_human: Option<bool>,
    pub is_default: Option<bool>,
    pub is_active: Option<bool>,
}

impl AgentUpdate {
    /// Whether the update carries no fields at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether this update makes the agent its organization's default
    pub fn sets_default(&self) -> bool {
        self.is_default == Some(true)
    }

    /// Assign the plain fields onto an entity. Instructions and tools are
    /// normalized by the repository before they reach the entity.
    pub(crate) fn apply_plain_fields(&self, agent: &mut Agent) {
        if let Some(name) = &self.name {
            agent.name = name.clone();
        }
        if let Some(display_name) = &self.display_name {
            agent.display_name = Some(display_name.clone());
        }
        if let Some(description) = &self.description {
            agent.description = Some(description.clone());
        }
        if let Some(agent_type) = self.agent_type {
            agent.agent_type = agent_type;
        }
        if let Some(transfer) = self.transfer_to_human {
            agent.transfer_to_human = transfer;
        }
        if let Some(is_default) = self.is_default {
            agent.is_default = is_default;
        }
        if let Some(is_active) = self.is_active {
            agent.is_active = is_active;
        }
    }
}

/// An agent with its `groups` and `organization` relationships loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDetails {
    #[serde(flatten)]
    pub agent: Agent,
    pub groups: Vec<UserGroup>,
    pub organization: Option<Organization>,
}
