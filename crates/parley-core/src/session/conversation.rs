//! ConversationSession - turns user text into requests and replies into log entries.
//!
//! Every accepted submit appends exactly one user entry and, once the
//! transport settles, exactly one agent entry, whether the request succeeded
//! or not. Failures never escape as errors; they become an agent message plus
//! the `Error` status.
//!
//! Concurrent submits are not serialized. Each appends its reply when it
//! completes, so replies land in completion order, not submission order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::state::{SessionId, SessionState};
use crate::channel::{
    AgentId, ChannelEvent, DuplexChannel, HttpTransport, OutboundRequest, Route, Transport,
};
use crate::config::{ClientConfig, TransportMode};
use crate::directory::{AgentDescriptor, AgentDirectory};
use crate::error::ChannelError;
use crate::event_bus::{EventBus, SessionEvent};
use crate::message::Message;
use crate::normalize::{classify, Reply};
use crate::status::{Activity, Connectivity, SessionStatus, StatusBoard};

/// Duplex connection plus the task feeding its events into the session.
struct DuplexLink {
    channel: DuplexChannel,
    pump: JoinHandle<()>,
}

/// One conversation with the backend.
pub struct ConversationSession {
    id: SessionId,
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
    events: EventBus,
    duplex: Mutex<Option<DuplexLink>>,
}

impl ConversationSession {
    /// Create a session that delivers through `transport`.
    pub fn new(config: Arc<ClientConfig>, transport: Arc<dyn Transport>) -> Self {
        Self {
            id: SessionId::new(),
            config,
            transport,
            state: Mutex::new(SessionState::default()),
            events: EventBus::new(),
            duplex: Mutex::new(None),
        }
    }

    /// Create a session over HTTP and, for duplex deployments, open the
    /// inbound channel. Must be called inside a tokio runtime.
    pub fn start(config: ClientConfig) -> Result<Arc<Self>, ChannelError> {
        let config = Arc::new(config);
        let transport = HttpTransport::new(Arc::clone(&config))?;
        let session = Arc::new(Self::new(Arc::clone(&config), Arc::new(transport)));

        if config.transport == TransportMode::Duplex {
            session.connect_duplex();
        }
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send user text to the backend and record the exchange.
    ///
    /// Blank text is ignored: nothing is appended and the status is left
    /// alone. Returns the agent reply that was appended, or `None` if the text
    /// was rejected or the session was disposed before the reply arrived.
    pub async fn submit(&self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let request = {
            let mut state = self.state();
            if state.disposed {
                log::warn!("Ignoring submit on disposed session {}", self.id);
                return None;
            }

            let user = Message::user(text);
            state.log.push(user.clone());
            state.in_flight += 1;
            state.status.set(SessionStatus::Sending, None);
            self.events.emit(SessionEvent::MessageAppended { message: user });
            self.emit_status(&state.status);

            let mut request = OutboundRequest::new(text, Route::from(state.routing.clone()));
            if self.config.share_conversation_id {
                request.conversation_id = Some(self.id.to_string());
            }
            request
        };

        let result = self.transport.deliver(&request).await;

        let (reply, status) = match result {
            Ok(payload) => {
                let reply = classify(&payload);
                let status = if reply.is_error() {
                    SessionStatus::Error
                } else {
                    SessionStatus::Idle
                };
                (reply, status)
            }
            Err(e) => {
                log::warn!("Request failed for session {}: {}", self.id, e);
                let reply = Reply::Error(format!("API error: {e}. Please try again."));
                (reply, SessionStatus::Error)
            }
        };

        let mut state = self.state();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.disposed {
            log::debug!("Dropping reply for disposed session {}", self.id);
            return None;
        }

        let message = Message::agent(reply.into_text());
        state.log.push(message.clone());
        state.status.set(status, None);
        self.events.emit(SessionEvent::MessageAppended {
            message: message.clone(),
        });
        self.emit_status(&state.status);
        Some(message)
    }

    /// Pin requests to an agent, or pass `None` to go back to auto-routing.
    ///
    /// Pure state change: no request is made.
    pub fn set_routing_preference(&self, agent: Option<AgentId>) {
        let mut state = self.state();
        let note = match &agent {
            Some(id) => format!("Routing to {id}"),
            None => "Auto-routing".to_string(),
        };
        state.routing = agent.clone();
        state.status.set(SessionStatus::Idle, Some(note));
        self.events.emit(SessionEvent::RoutingChanged { agent });
        self.emit_status(&state.status);
    }

    pub fn routing_preference(&self) -> Option<AgentId> {
        self.state().routing.clone()
    }

    /// Reload the agent directory, reflecting progress in the session status.
    ///
    /// Returns the fresh descriptors, or the directory's previous set if the
    /// refresh failed.
    pub async fn refresh_agents(&self, directory: &AgentDirectory) -> Vec<AgentDescriptor> {
        self.transition(SessionStatus::AwaitingAgentList, None);

        match directory.refresh().await {
            Ok(agents) => {
                self.transition(SessionStatus::Idle, None);
                agents
            }
            Err(e) => {
                self.transition(
                    SessionStatus::Error,
                    Some(format!("Failed to load agents: {e}")),
                );
                directory.agents()
            }
        }
    }

    /// Apply one event from the duplex channel.
    ///
    /// Frames are normalized and appended without touching the status; only
    /// open, close and error events change it.
    pub fn handle_channel_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => self.transition(SessionStatus::Connected, None),
            ChannelEvent::Closed => self.transition(SessionStatus::Disconnected, None),
            ChannelEvent::Failed(reason) => {
                log::warn!("Duplex channel failed for session {}: {}", self.id, reason);
                let mut state = self.state();
                state.status.set_transport_failed();
                self.emit_status(&state.status);
            }
            ChannelEvent::Frame(payload) => {
                let mut state = self.state();
                if state.disposed {
                    return;
                }
                let message = Message::agent(classify(&payload).into_text());
                state.log.push(message.clone());
                self.events.emit(SessionEvent::MessageAppended { message });
            }
        }
    }

    /// Open the duplex channel at the configured address and feed its events
    /// into this session. Replaces any existing connection.
    pub fn connect_duplex(self: &Arc<Self>) {
        let (channel, events) = DuplexChannel::open(self.config.ws_url());
        let pump = tokio::spawn(pump(Arc::downgrade(self), events));

        let previous = self.duplex_link().replace(DuplexLink { channel, pump });
        if let Some(link) = previous {
            link.shutdown();
        }
    }

    /// Tear down the duplex channel and stop accepting replies.
    ///
    /// Messages already in the log are kept. Requests still in flight are
    /// abandoned: their replies are discarded when they arrive.
    pub fn dispose(&self) {
        self.state().disposed = true;
        if let Some(link) = self.duplex_link().take() {
            link.shutdown();
        }
        log::debug!("Session {} disposed", self.id);
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    /// Snapshot of the log in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.state().log.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.state().status.status()
    }

    /// What a status bar should show right now.
    pub fn status_label(&self) -> String {
        self.state().status.label()
    }

    pub fn connectivity(&self) -> Connectivity {
        self.state().status.connectivity()
    }

    pub fn activity(&self) -> Activity {
        self.state().status.activity()
    }

    /// Number of submits still waiting on the transport.
    pub fn in_flight(&self) -> usize {
        self.state().in_flight
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn transition(&self, status: SessionStatus, note: Option<String>) {
        let mut state = self.state();
        state.status.set(status, note);
        self.emit_status(&state.status);
    }

    fn emit_status(&self, board: &StatusBoard) {
        self.events.emit(SessionEvent::StatusChanged {
            status: board.status(),
            label: board.label(),
        });
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn duplex_link(&self) -> MutexGuard<'_, Option<DuplexLink>> {
        self.duplex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        if let Some(link) = self.duplex_link().take() {
            link.shutdown();
        }
    }
}

impl DuplexLink {
    fn shutdown(self) {
        self.channel.close();
        self.pump.abort();
    }
}

async fn pump(
    session: Weak<ConversationSession>,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(session) = session.upgrade() else {
            break;
        };
        session.handle_channel_event(event);
    }
}

// ============================================================================
// TESTS
// ============================================================================
