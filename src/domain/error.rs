//! Domain error types.
//!
//! The analytics functions never fail; errors only arise from validation at
//! the import/backup boundary, from configuration, and from adapter I/O.

/// Top-level error type for tradelog.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed trade {id}: {reason}")]
    MalformedTrade { id: String, reason: String },

    #[error("import error at row {row}: {reason}")]
    Import { row: usize, reason: String },

    #[error("backup error: {reason}")]
    Backup { reason: String },

    #[error("export error: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&JournalError> for std::process::ExitCode {
    fn from(err: &JournalError) -> Self {
        let code: u8 = match err {
            JournalError::Io(_) => 1,
            JournalError::ConfigParse { .. }
            | JournalError::ConfigMissing { .. }
            | JournalError::ConfigInvalid { .. } => 2,
            JournalError::Backup { .. } | JournalError::Export { .. } => 3,
            JournalError::MalformedTrade { .. } | JournalError::Import { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_malformed_trade() {
        let err = JournalError::MalformedTrade {
            id: "t-1".into(),
            reason: "quantity must be positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed trade t-1: quantity must be positive"
        );
    }

    #[test]
    fn display_import_row() {
        let err = JournalError::Import {
            row: 3,
            reason: "missing entry price".into(),
        };
        assert_eq!(err.to_string(), "import error at row 3: missing entry price");
    }

    #[test]
    fn io_converts_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: JournalError = io.into();
        assert!(matches!(err, JournalError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }
}
