use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_id: String,
    pub session_id: Option<String>,
    pub message: String,
    pub response: String,
}

/// Where conversations would be kept. Nothing is persisted yet.
pub trait ChatHistory: Send + Sync {
    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>>;
    fn record(&self, turn: &ChatTurn) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl ChatHistory for NoopHistory {
    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        info!(user_id, limit, "chat history requested");
        Ok(Vec::new())
    }

    fn record(&self, turn: &ChatTurn) -> Result<()> {
        info!(user_id = %turn.user_id, session_id = ?turn.session_id, "chat turn recorded");
        Ok(())
    }
}
