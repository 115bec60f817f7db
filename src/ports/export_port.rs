//! Trade export port trait.

use crate::domain::error::JournalError;
use crate::domain::journal::Journal;
use crate::domain::trade::Trade;

pub trait ExportPort {
    /// Writes `trades` in order, resolving edge and formula names through
    /// `journal`.
    fn export(&self, trades: &[&Trade], journal: &Journal) -> Result<(), JournalError>;
}
