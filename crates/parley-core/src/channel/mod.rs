//! Connection to the backend.
//!
//! Outbound delivery goes through the [`Transport`] trait so the session never
//! needs to know how a request travels. Deployments that also receive pushed
//! replies open a [`DuplexChannel`] next to it.

pub mod duplex;
pub mod http;

pub use duplex::{ChannelEvent, DuplexChannel};
pub use http::{Endpoint, HttpTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;

/// Identifier of a backend agent, e.g. `finance_agent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Where a request should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Let the backend pick an agent.
    Auto,
    /// Ask this agent specifically.
    Pinned(AgentId),
}

impl From<Option<AgentId>> for Route {
    fn from(pref: Option<AgentId>) -> Self {
        match pref {
            Some(agent) => Route::Pinned(agent),
            None => Route::Auto,
        }
    }
}

/// One user utterance on its way to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub text: String,
    pub route: Route,
    pub conversation_id: Option<String>,
}

impl OutboundRequest {
    pub fn new(text: impl Into<String>, route: Route) -> Self {
        Self {
            text: text.into(),
            route,
            conversation_id: None,
        }
    }
}

/// Delivers a request and returns the backend's raw reply.
///
/// Implementations report non-2xx statuses and transport failures as
/// [`ChannelError`]; they never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, request: &OutboundRequest) -> Result<Value, ChannelError>;
}

// ============================================================================
// TESTS
// ============================================================================
