//! The journal snapshot: every trade, edge, formula and flow the analytics
//! run over, passed explicitly instead of held in global state.

use crate::domain::charges::ChargeModel;
use crate::domain::condition::ConditionCatalog;
use crate::domain::edge::{find_edge, Edge};
use crate::domain::enrichment::enrich_in_place;
use crate::domain::error::JournalError;
use crate::domain::flow::LogicalEdgeFlow;
use crate::domain::formula::{find_formula, Formula};
use crate::domain::metrics::Summary;
use crate::domain::streaks::{drawdown_from_points, streak_stats, DrawdownInfo, StreakStats};
use crate::domain::time_series::{cumulative_pnl, CumulativePnlDataPoint};
use crate::domain::trade::Trade;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub formulas: Vec<Formula>,
    #[serde(default)]
    pub flows: Vec<LogicalEdgeFlow>,
    #[serde(default)]
    pub catalog: ConditionCatalog,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trade(&self, id: &str) -> Option<&Trade> {
        self.trades.iter().find(|t| t.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        find_edge(&self.edges, id)
    }

    pub fn formula(&self, id: &str) -> Option<&Formula> {
        find_formula(&self.formulas, id)
    }

    pub fn edge_name(&self, trade: &Trade) -> Option<&str> {
        trade
            .edge_id
            .as_deref()
            .and_then(|id| self.edge(id))
            .map(|e| e.name.as_str())
    }

    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// Validates and enriches `trade`, replacing any trade with the same id.
    pub fn record_trade(&mut self, mut trade: Trade) -> Result<(), JournalError> {
        trade.validate()?;
        enrich_in_place(&mut trade);
        match self.trades.iter_mut().find(|t| t.id == trade.id) {
            Some(existing) => *existing = trade,
            None => self.trades.push(trade),
        }
        Ok(())
    }

    /// Recomputes every trade's derived fields.
    pub fn enrich_all(&mut self) {
        self.trades.iter_mut().for_each(enrich_in_place);
    }

    /// Every trade must satisfy its invariants and ids must be unique.
    pub fn validate(&self) -> Result<(), JournalError> {
        let mut seen = HashSet::new();
        for trade in &self.trades {
            trade.validate()?;
            if !seen.insert(trade.id.as_str()) {
                return Err(JournalError::MalformedTrade {
                    id: trade.id.clone(),
                    reason: "duplicate trade id".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The one-way analytics pipeline over a journal snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub summary: Summary,
    pub cumulative: Vec<CumulativePnlDataPoint>,
    pub streaks: StreakStats,
    pub drawdown: DrawdownInfo,
}

impl AnalyticsReport {
    pub fn compute(journal: &Journal, charges: &ChargeModel) -> Self {
        let cumulative = cumulative_pnl(&journal.trades);
        let drawdown = drawdown_from_points(&cumulative);
        AnalyticsReport {
            summary: Summary::compute(&journal.trades, &journal.edges, charges),
            streaks: streak_stats(&journal.trades),
            cumulative,
            drawdown,
        }
    }
}
