//! Session status.
//!
//! Status really has two independent facets: whether the duplex transport is
//! up, and how the last request went. Front-ends show a single line, so
//! [`StatusBoard`] also keeps the collapsed last-write value alongside the facets.

use serde::{Deserialize, Serialize};

/// Collapsed, display-oriented session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Idle,
    Sending,
    AwaitingAgentList,
    Connected,
    Disconnected,
    Error,
}

impl SessionStatus {
    /// Default human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Ready",
            SessionStatus::Sending => "Sending message...",
            SessionStatus::AwaitingAgentList => "Loading agents...",
            SessionStatus::Connected => "Connected",
            SessionStatus::Disconnected => "Disconnected",
            SessionStatus::Error => "Error occurred",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Transport connectivity facet. Only meaningful in duplex deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Connectivity {
    #[default]
    NotConnected,
    Connected,
    Disconnected,
    Failed,
}

/// Request activity facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Activity {
    #[default]
    Idle,
    Sending,
    AwaitingAgentList,
    Failed,
}

/// Status bookkeeping for one session.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    status: SessionStatus,
    note: Option<String>,
    connectivity: Connectivity,
    activity: Activity,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            note: None,
            connectivity: Connectivity::default(),
            activity: Activity::default(),
        }
    }
}

impl StatusBoard {
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Label shown to the user: the note if one was set with the last
    /// transition, otherwise the status' default label.
    pub fn label(&self) -> String {
        self.note
            .clone()
            .unwrap_or_else(|| self.status.label().to_string())
    }

    /// Record a transition. Updates the facet the status belongs to and the
    /// collapsed value.
    pub fn set(&mut self, status: SessionStatus, note: Option<String>) {
        match status {
            SessionStatus::Idle => self.activity = Activity::Idle,
            SessionStatus::Sending => self.activity = Activity::Sending,
            SessionStatus::AwaitingAgentList => self.activity = Activity::AwaitingAgentList,
            SessionStatus::Error => self.activity = Activity::Failed,
            SessionStatus::Connected => self.connectivity = Connectivity::Connected,
            SessionStatus::Disconnected => self.connectivity = Connectivity::Disconnected,
        }
        self.status = status;
        self.note = note;
    }

    /// A transport error. Collapses to `Error` but only touches connectivity.
    pub fn set_transport_failed(&mut self) {
        self.connectivity = Connectivity::Failed;
        self.status = SessionStatus::Error;
        self.note = Some("WebSocket Error".to_string());
    }
}

// ============================================================================
// TESTS
// ============================================================================
