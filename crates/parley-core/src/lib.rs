//! # parley-core
//!
//! Message exchange for Parley, a chat client for multi-agent backends.
//!
//! This crate is framework-agnostic. A front-end (terminal shell, desktop or
//! web view) creates a [`ConversationSession`], feeds it user text and renders
//! what the session's event bus publishes.
//!
//! ## Key Concepts
//!
//! - **Session**: one conversation, owning its message log, status and
//!   pinned-agent preference
//! - **Transport**: how a request reaches the backend (HTTP), plus an optional
//!   receive-only WebSocket for pushed replies
//! - **Normalization**: turning whatever reply shape the backend produced into
//!   display text

pub mod channel;
pub mod config;
pub mod directory;
pub mod error;
pub mod event_bus;
pub mod message;
pub mod normalize;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use channel::{AgentId, ChannelEvent, DuplexChannel, HttpTransport, Transport};
pub use config::{ClientConfig, RouteStyle, TransportMode};
pub use directory::{AgentDescriptor, AgentDirectory};
pub use error::{ChannelError, ConfigError, DirectoryError};
pub use event_bus::SessionEvent;
pub use message::{Message, Sender};
pub use normalize::normalize;
pub use session::{ConversationSession, SessionId};
pub use status::SessionStatus;
