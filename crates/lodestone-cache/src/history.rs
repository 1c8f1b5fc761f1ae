//! Bounded conversation history log.

use std::path::PathBuf;

use chrono::Utc;
use lodestone_core::ConversationTurn;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::CacheResult;

/// Number of turns retained; older turns are dropped.
pub const MAX_HISTORY: usize = 10;

/// JSON-file-backed append log of question/answer turns.
///
/// Asking the same question again updates the existing turn in place
/// instead of appending a duplicate.
pub struct ConversationLog {
    path: PathBuf,
    turns: Mutex<Vec<ConversationTurn>>,
}

impl ConversationLog {
    /// Open the log, loading existing turns. An unreadable file starts the
    /// log empty.
    pub async fn open(path: PathBuf) -> Self {
        let turns = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<ConversationTurn>>(&bytes) {
                Ok(turns) => turns,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "history file unreadable, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            path,
            turns: Mutex::new(turns),
        }
    }

    /// Record a turn, updating in place when the question was asked before,
    /// then truncating to the most recent [`MAX_HISTORY`].
    pub async fn add(&self, question: &str, answer: &str) -> CacheResult<()> {
        let turn = ConversationTurn {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        };

        let mut turns = self.turns.lock().await;
        if let Some(existing) = turns.iter_mut().find(|t| t.question == question) {
            *existing = turn;
            debug!(question = %question, "history turn updated");
        } else {
            turns.push(turn);
            if turns.len() > MAX_HISTORY {
                let excess = turns.len() - MAX_HISTORY;
                turns.drain(..excess);
            }
            debug!(question = %question, "history turn appended");
        }

        let bytes = serde_json::to_vec_pretty(&*turns)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    /// The most recent `count` turns, oldest first.
    pub async fn recent(&self, count: usize) -> Vec<ConversationTurn> {
        let turns = self.turns.lock().await;
        let start = turns.len().saturating_sub(count);
        turns[start..].to_vec()
    }

    /// All retained turns, oldest first.
    pub async fn all(&self) -> Vec<ConversationTurn> {
        self.turns.lock().await.clone()
    }
}
