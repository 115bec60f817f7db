//! Journal persistence port trait.

use crate::domain::error::JournalError;
use crate::domain::journal::Journal;

/// Loads and saves a complete journal snapshot.
pub trait JournalPort {
    /// Returns a validated journal with every trade re-enriched.
    fn load(&self) -> Result<Journal, JournalError>;

    fn save(&self, journal: &Journal) -> Result<(), JournalError>;
}
