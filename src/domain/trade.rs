//! Trade records, lifecycle events and the invariants every trade must hold.

use crate::domain::error::JournalError;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "Long"),
            PositionSide::Short => write!(f, "Short"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
    #[default]
    Open,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "Win"),
            Outcome::Loss => write!(f, "Loss"),
            Outcome::Breakeven => write!(f, "Breakeven"),
            Outcome::Open => write!(f, "Open"),
        }
    }
}

/// How an entry or a close was executed relative to the trading plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Both,
    Real,
    Theoretical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCompliance {
    #[default]
    FullyFollowed,
    PartiallyFollowed,
    NotFollowed,
    EntryMissed,
}

impl fmt::Display for RuleCompliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCompliance::FullyFollowed => write!(f, "Fully Followed"),
            RuleCompliance::PartiallyFollowed => write!(f, "Partially Followed"),
            RuleCompliance::NotFollowed => write!(f, "Not Followed"),
            RuleCompliance::EntryMissed => write!(f, "Entry Missed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryType {
    Weekly,
    Monthly,
}

impl fmt::Display for ExpiryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryType::Weekly => write!(f, "Weekly"),
            ExpiryType::Monthly => write!(f, "Monthly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeEventKind {
    /// Part of the position was closed. `closes_position` marks the partial
    /// exit that took the remaining quantity to zero.
    PartialExit {
        quantity: u32,
        price: f64,
        #[serde(default)]
        closes_position: bool,
    },
    /// A manual correction of a recorded field.
    Edit { field: String },
}

/// One entry of a trade's append-only lifecycle log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub at: NaiveDateTime,
    pub kind: TradeEventKind,
    #[serde(default)]
    pub note: String,
}

impl TradeEvent {
    pub fn is_partial_exit(&self) -> bool {
        matches!(self.kind, TradeEventKind::PartialExit { .. })
    }
}

/// A single position lifecycle.
///
/// `pnl` and `outcome` are derived; [`crate::domain::enrichment::enrich`]
/// recomputes them from the primary fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: PositionSide,
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub strike_price: Option<f64>,
    #[serde(default)]
    pub expiry_type: Option<ExpiryType>,
    pub entry_price: f64,
    #[serde(default)]
    pub exit_price: Option<f64>,
    pub quantity: u32,
    pub entry_time: NaiveDateTime,
    #[serde(default)]
    pub exit_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub edge_id: Option<String>,
    #[serde(default)]
    pub entry_formula_id: Option<String>,
    #[serde(default)]
    pub stop_loss_formula_ids: Vec<String>,
    #[serde(default)]
    pub target_formula_ids: Vec<String>,
    /// The one stop-loss or target formula that actually closed the trade.
    #[serde(default)]
    pub exit_formula_id: Option<String>,
    #[serde(default)]
    pub rule_compliance: RuleCompliance,
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,
    #[serde(default)]
    pub close_mode: Option<ExecutionMode>,
    #[serde(default)]
    pub sl_price: Option<f64>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub log: Vec<TradeEvent>,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub outcome: Outcome,
}

impl Trade {
    /// An open trade with every optional field empty.
    pub fn open(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: PositionSide,
        entry_price: f64,
        quantity: u32,
        entry_time: NaiveDateTime,
    ) -> Self {
        Trade {
            id: id.into(),
            symbol: symbol.into(),
            side,
            index: String::new(),
            strike_price: None,
            expiry_type: None,
            entry_price,
            exit_price: None,
            quantity,
            entry_time,
            exit_time: None,
            edge_id: None,
            entry_formula_id: None,
            stop_loss_formula_ids: Vec::new(),
            target_formula_ids: Vec::new(),
            exit_formula_id: None,
            rule_compliance: RuleCompliance::default(),
            execution_mode: None,
            close_mode: None,
            sl_price: None,
            target_price: None,
            result: None,
            screenshot: None,
            notes: String::new(),
            log: Vec::new(),
            pnl: 0.0,
            outcome: Outcome::Open,
        }
    }

    pub fn closed_at(mut self, exit_price: f64, exit_time: NaiveDateTime) -> Self {
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
        self
    }

    /// A trade is closed only when both exit fields are present.
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some() && self.exit_time.is_some()
    }

    pub fn exit(&self) -> Option<(f64, NaiveDateTime)> {
        match (self.exit_price, self.exit_time) {
            (Some(price), Some(time)) => Some((price, time)),
            _ => None,
        }
    }

    /// Signed P&L recomputed from the primary fields; `None` while open.
    pub fn realized_pnl(&self) -> Option<f64> {
        self.exit().map(|(exit_price, _)| {
            self.side.sign() * (exit_price - self.entry_price) * self.quantity as f64
        })
    }

    pub fn exit_date(&self) -> Option<NaiveDate> {
        self.exit_time.map(|t| t.date())
    }

    pub fn entry_weekday(&self) -> Weekday {
        self.entry_time.weekday()
    }

    pub fn holding_time(&self) -> Option<chrono::Duration> {
        self.exit_time.map(|exit| exit - self.entry_time)
    }

    pub fn references_formula(&self, formula_id: &str) -> bool {
        self.entry_formula_id.as_deref() == Some(formula_id)
            || self.stop_loss_formula_ids.iter().any(|id| id == formula_id)
            || self.target_formula_ids.iter().any(|id| id == formula_id)
    }

    pub fn partial_exits(&self) -> impl Iterator<Item = &TradeEvent> {
        self.log.iter().filter(|e| e.is_partial_exit())
    }

    /// Checks the record invariants. Import and backup layers reject trades
    /// that fail here instead of repairing them.
    pub fn validate(&self) -> Result<(), JournalError> {
        let malformed = |reason: &str| JournalError::MalformedTrade {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(malformed("id must not be empty"));
        }
        if self.quantity == 0 {
            return Err(malformed("quantity must be positive"));
        }
        if !self.entry_price.is_finite() {
            return Err(malformed("entry price must be finite"));
        }
        if let Some(price) = self.exit_price {
            if !price.is_finite() {
                return Err(malformed("exit price must be finite"));
            }
        }
        for (name, value) in [
            ("strike price", self.strike_price),
            ("stop-loss price", self.sl_price),
            ("target price", self.target_price),
        ] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(malformed(&format!("{name} must be finite")));
            }
        }
        match (self.exit_price, self.exit_time) {
            (Some(_), None) => return Err(malformed("exit price recorded without exit time")),
            (None, Some(_)) => return Err(malformed("exit time recorded without exit price")),
            _ => {}
        }
        if let Some(exit_time) = self.exit_time {
            if exit_time < self.entry_time {
                return Err(malformed("exit time precedes entry time"));
            }
        }
        Ok(())
    }
}
