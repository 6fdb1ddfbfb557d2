//! Directory of routable agents, built from the backend's health probe.
//!
//! `GET /health` returns `{components: {name: {status, ...}}}`. Components
//! whose name carries the agent suffix and whose status is healthy become
//! selectable agents. Each refresh replaces the cached set wholesale; a failed
//! refresh leaves the previous set untouched.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::channel::{AgentId, HttpTransport};
use crate::error::DirectoryError;

const HEALTH_PATH: &str = "health";

/// A selectable agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub label: String,
    pub healthy: bool,
}

/// Fetches and caches the set of healthy agents.
pub struct AgentDirectory {
    transport: HttpTransport,
    agents: Mutex<Vec<AgentDescriptor>>,
}

impl AgentDirectory {
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            agents: Mutex::new(Vec::new()),
        }
    }

    /// Probe the backend and replace the cached descriptors.
    ///
    /// On error the previous descriptors are kept and the error is returned.
    pub async fn refresh(&self) -> Result<Vec<AgentDescriptor>, DirectoryError> {
        let result = match self.transport.get_json(HEALTH_PATH).await {
            Ok(payload) => {
                let config = self.transport.config();
                parse_health(&payload, &config.agent_suffix, &config.healthy_status)
            }
            Err(e) => Err(DirectoryError::from(e)),
        };

        match result {
            Ok(agents) => {
                log::info!("Agent directory refreshed: {} healthy agents", agents.len());
                *self.cache() = agents.clone();
                Ok(agents)
            }
            Err(e) => {
                log::warn!("Agent directory refresh failed: {}", e);
                Err(e)
            }
        }
    }

    /// Descriptors from the last successful refresh.
    pub fn agents(&self) -> Vec<AgentDescriptor> {
        self.cache().clone()
    }

    pub fn find(&self, id: &str) -> Option<AgentDescriptor> {
        self.cache().iter().find(|a| a.id.as_str() == id).cloned()
    }

    fn cache(&self) -> MutexGuard<'_, Vec<AgentDescriptor>> {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Extract healthy agents from a health payload, sorted by id.
pub fn parse_health(
    payload: &Value,
    suffix: &str,
    healthy_status: &str,
) -> Result<Vec<AgentDescriptor>, DirectoryError> {
    let components = payload
        .get("components")
        .and_then(Value::as_object)
        .ok_or(DirectoryError::MissingComponents)?;

    let mut agents: Vec<AgentDescriptor> = components
        .iter()
        .filter(|(name, _)| name.ends_with(suffix) && name.len() > suffix.len())
        .filter(|(_, info)| info.get("status").and_then(Value::as_str) == Some(healthy_status))
        .map(|(name, _)| AgentDescriptor {
            id: AgentId::new(name.as_str()),
            label: agent_label(name, suffix),
            healthy: true,
        })
        .collect();

    agents.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(agents)
}

/// Human label for an agent id: drop the suffix, capitalize each word.
///
/// `real_estate_agent` becomes `Real Estate`.
pub fn agent_label(id: &str, suffix: &str) -> String {
    id.strip_suffix(suffix)
        .unwrap_or(id)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
