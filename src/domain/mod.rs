//! Core domain types and analytics.

pub mod trade;
pub mod enrichment;
pub mod charges;
pub mod edge;
pub mod formula;
pub mod metrics;
pub mod time_series;
pub mod streaks;
pub mod filter;
pub mod condition;
pub mod flow;
pub mod flow_match;
pub mod journal;
pub mod duration;
pub mod config_validation;
pub mod error;
