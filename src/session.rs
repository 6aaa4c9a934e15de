use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Progress record for one running story, owned and persisted by the
/// collaborator. The engine never sees this type; it only receives the step
/// count derived from `choices_made`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySession {
    pub id: String,
    pub character_id: String,
    pub theme: String,
    pub current_node_id: String,
    #[serde(default)]
    pub choices_made: Vec<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl StorySession {
    pub fn new(
        id: impl Into<String>,
        character_id: impl Into<String>,
        theme: impl Into<String>,
        start_node_id: impl Into<String>,
    ) -> Self {
        let now = unix_now();
        Self {
            id: id.into(),
            character_id: character_id.into(),
            theme: theme.into(),
            current_node_id: start_node_id.into(),
            choices_made: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 1-based count for the step about to be taken: choices accumulated so
    /// far, plus one. This is the `step_count` a Continue call expects.
    pub fn next_step(&self) -> u32 {
        self.choices_made.len() as u32 + 1
    }

    /// Records an accepted choice and the node it led to.
    pub fn record_choice(&mut self, choice_context: &str, new_node_id: &str) {
        self.choices_made.push(choice_context.to_string());
        self.current_node_id = new_node_id.to_string();
        self.updated_at = unix_now();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
