//! JSON backup adapter: the whole journal as one pretty-printed document.

use crate::domain::error::JournalError;
use crate::domain::journal::Journal;
use crate::ports::journal_port::JournalPort;
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonBackupAdapter {
    path: PathBuf,
}

impl JsonBackupAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses a backup document, validates every trade and re-enriches it.
    pub fn from_json(content: &str) -> Result<Journal, JournalError> {
        let mut journal: Journal =
            serde_json::from_str(content).map_err(|e| JournalError::Backup {
                reason: format!("invalid backup document: {}", e),
            })?;
        journal.validate()?;
        journal.enrich_all();
        Ok(journal)
    }

    pub fn to_json(journal: &Journal) -> Result<String, JournalError> {
        serde_json::to_string_pretty(journal).map_err(|e| JournalError::Backup {
            reason: format!("failed to serialize journal: {}", e),
        })
    }
}

impl JournalPort for JsonBackupAdapter {
    fn load(&self) -> Result<Journal, JournalError> {
        let content = fs::read_to_string(&self.path).map_err(|e| JournalError::Backup {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let journal = Self::from_json(&content)?;
        tracing::info!(
            path = %self.path.display(),
            trades = journal.trades.len(),
            edges = journal.edges.len(),
            flows = journal.flows.len(),
            "journal loaded"
        );
        Ok(journal)
    }

    fn save(&self, journal: &Journal) -> Result<(), JournalError> {
        let content = Self::to_json(journal)?;
        fs::write(&self.path, content).map_err(|e| JournalError::Backup {
            reason: format!("failed to write {}: {}", self.path.display(), e),
        })?;
        tracing::info!(
            path = %self.path.display(),
            trades = journal.trades.len(),
            "journal saved"
        );
        Ok(())
    }
}
