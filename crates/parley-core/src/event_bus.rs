//! Framework-agnostic session event broadcasting.
//!
//! Front-ends (terminal shell, web view, tests) subscribe to a session's
//! EventBus instead of polling it. Every log append and status change is
//! published here.
//!
//! # Example
//!
//! ```rust
//! use parley_core::event_bus::{EventBus, SessionEvent};
//! use parley_core::Message;
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit(SessionEvent::MessageAppended { message: Message::user("hi") });
//!
//! // In async context:
//! // let event = rx.recv().await.unwrap();
//! ```

use serde::Serialize;
use tokio::sync::broadcast;

use crate::channel::AgentId;
use crate::message::Message;
use crate::status::SessionStatus;

/// Default channel capacity for the event bus.
/// Events beyond this capacity will cause slow subscribers to miss events (lag).
const DEFAULT_CAPACITY: usize = 256;

/// Something observable happened in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A message was appended to the log.
    MessageAppended { message: Message },

    /// The session status changed. `label` is what a status bar should show.
    StatusChanged { status: SessionStatus, label: String },

    /// The pinned agent was set or cleared.
    RoutingChanged { agent: Option<AgentId> },
}

/// Broadcasts [`SessionEvent`]s to any number of subscribers.
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new EventBus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new EventBus with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// With no subscribers the event is dropped and 0 is returned.
    pub fn emit(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
