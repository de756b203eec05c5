//! Structured record of what the executor actually did on the agent's behalf.
//! The loop derives progress from these entries, not from the agent's prose.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Moved { from: PathBuf, to: PathBuf },
    MarkedCompleted { path: PathBuf },
    FolderHashed { folder: PathBuf },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub action: ActionKind,
}

#[derive(Debug, Default)]
pub struct ActionLog {
    entries: Vec<ActionRecord>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: ActionKind) {
        self.entries.push(ActionRecord {
            at: Utc::now(),
            action,
        });
    }

    pub fn entries(&self) -> &[ActionRecord] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hands over everything recorded since the last drain.
    pub fn drain(&mut self) -> Vec<ActionRecord> {
        std::mem::take(&mut self.entries)
    }
}
