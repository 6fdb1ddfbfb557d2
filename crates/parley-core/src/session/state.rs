//! Per-session state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::AgentId;
use crate::message::ConversationLog;
use crate::status::StatusBoard;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable state behind a conversation session.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub log: ConversationLog,
    pub status: StatusBoard,
    /// `None` means auto-route.
    pub routing: Option<AgentId>,
    /// Submits awaiting a reply.
    pub in_flight: usize,
    pub disposed: bool,
}

// ============================================================================
// TESTS
// ============================================================================
