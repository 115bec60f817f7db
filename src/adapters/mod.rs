//! Concrete adapter implementations for ports.

pub mod csv_export_adapter;
pub mod csv_import_adapter;
pub mod file_config_adapter;
pub mod json_backup_adapter;
