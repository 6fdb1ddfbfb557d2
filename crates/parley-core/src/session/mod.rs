//! Conversation sessions.
//!
//! A session owns its message log, status and routing preference. Several
//! sessions can live side by side; nothing here is global.

mod conversation;
mod state;

pub use conversation::ConversationSession;
pub use state::SessionId;
