//! Agent domain module
//!
//! Agents are the configurable conversational assistants of an
//! organization. [`AgentRepository`] is the single place that reads and
//! writes them.

pub mod entity;
pub mod repository;

pub use entity::{Agent, AgentDetails, AgentType, AgentUpdate, InstructionsInput, NewAgent};
pub use repository::{AgentKey, AgentRepository, coerce_instructions};
