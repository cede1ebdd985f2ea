use std::collections::HashMap;
use std::sync::Arc;
use teloxide::types::ChatId;
use tokio::sync::RwLock;

use crate::flow::BookingEngine;
use crate::models::Session;

/// In-memory session records keyed by chat id. One record owns the flow
/// state, the scratch booking fields and the current option set, so the
/// three can never drift apart. Records are ephemeral and rebuilt from a
/// default on restart.
#[derive(Clone, Default)]
pub struct SessionMap {
    inner: Arc<RwLock<HashMap<ChatId, Session>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the session, or a fresh default if this chat has never
    /// been seen. Handlers mutate the snapshot and `put` it back; the
    /// transport delivers one update at a time per chat, so there is no
    /// lost-update window within a conversation.
    pub async fn get(&self, chat_id: ChatId) -> Session {
        let sessions = self.inner.read().await;
        sessions.get(&chat_id).cloned().unwrap_or_default()
    }

    pub async fn put(&self, chat_id: ChatId, session: Session) {
        let mut sessions = self.inner.write().await;
        sessions.insert(chat_id, session);
    }

    /// Synchronously clears the booking flow for a chat. Used by "stop",
    /// the terminal hand-off and the blocked-phone abort.
    pub async fn reset_flow(&self, chat_id: ChatId) {
        let mut sessions = self.inner.write().await;
        sessions.entry(chat_id).or_default().reset_flow();
    }

    /// Called by the payment finalizer once a confirmation lands.
    pub async fn mark_booking_done(&self, chat_id: ChatId) {
        let mut sessions = self.inner.write().await;
        sessions.entry(chat_id).or_default().booking_done = true;
    }
}

#[derive(Clone)]
pub struct BotState {
    pub engine: Arc<BookingEngine>,
    pub sessions: SessionMap,
}

impl BotState {
    pub fn new(engine: Arc<BookingEngine>, sessions: SessionMap) -> Self {
        Self { engine, sessions }
    }
}
