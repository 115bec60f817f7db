//! Aggregate performance metrics and per-dimension breakdowns.
//!
//! Ratio sentinels are part of the contract and pass through unchanged:
//! - profit factor is `+inf` with profits and no losses, `NaN` with neither
//! - risk/reward is `+inf` with wins and no losses, `0` with neither

use crate::domain::charges::ChargeModel;
use crate::domain::edge::Edge;
use crate::domain::formula::Formula;
use crate::domain::trade::Trade;
use chrono::Weekday;
use serde::{Serialize, Serializer};

/// Running win/loss tally over a set of closed trades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TradeTally {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub gross_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl TradeTally {
    pub fn from_trades<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Self {
        let mut tally = TradeTally::default();
        for trade in trades {
            tally.add(trade.pnl);
        }
        tally
    }

    pub fn add(&mut self, pnl: f64) {
        self.trades += 1;
        self.gross_pnl += pnl;
        if pnl > 0.0 {
            self.wins += 1;
            self.gross_profit += pnl;
            if pnl > self.largest_win {
                self.largest_win = pnl;
            }
        } else if pnl < 0.0 {
            self.losses += 1;
            self.gross_loss += pnl.abs();
            if pnl.abs() > self.largest_loss {
                self.largest_loss = pnl.abs();
            }
        } else {
            self.breakevens += 1;
        }
    }

    /// Wins as a percentage of decided (win or loss) trades.
    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided > 0 {
            self.wins as f64 / decided as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn avg_win(&self) -> f64 {
        if self.wins > 0 {
            self.gross_profit / self.wins as f64
        } else {
            0.0
        }
    }

    pub fn avg_loss(&self) -> f64 {
        if self.losses > 0 {
            self.gross_loss / self.losses as f64
        } else {
            0.0
        }
    }

    pub fn profit_factor(&self) -> f64 {
        profit_factor(self.gross_profit, self.gross_loss)
    }

    pub fn risk_reward(&self) -> f64 {
        risk_reward(self.avg_win(), self.avg_loss())
    }
}

pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    }
}

pub fn risk_reward(avg_win: f64, avg_loss: f64) -> f64 {
    if avg_loss > 0.0 {
        avg_win / avg_loss
    } else if avg_win > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Writes a ratio with its sentinels spelled out: `"inf"`, `"-inf"` and
/// `"nan"`. JSON has no non-finite numbers and would otherwise emit `null`
/// for all three.
pub fn serialize_ratio<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_nan() {
        serializer.serialize_str("nan")
    } else if value.is_infinite() {
        serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePerformance {
    pub edge_id: String,
    pub name: String,
    pub pnl: f64,
    pub trade_count: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaPerformance {
    pub formula_id: String,
    pub name: String,
    pub pnl: f64,
    pub trade_count: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayPerformance {
    pub weekday: Weekday,
    pub pnl: f64,
    pub trade_count: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub gross_pnl: f64,
    pub total_charges: f64,
    pub net_pnl: f64,
    pub win_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub risk_reward: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub edge_breakdown: Vec<EdgePerformance>,
    pub most_profitable_edge: Option<EdgePerformance>,
}

impl Summary {
    /// Summarises the closed trades in `trades`; open trades are ignored.
    pub fn compute(trades: &[Trade], edges: &[Edge], charges: &ChargeModel) -> Self {
        let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        let tally = TradeTally::from_trades(closed.iter().copied());
        let total_charges: f64 = closed.iter().map(|t| charges.charges(t)).sum();

        let edge_breakdown = edge_breakdown(&closed, edges);
        let most_profitable_edge = edge_breakdown.first().filter(|e| e.pnl > 0.0).cloned();

        Summary {
            total_trades: tally.trades,
            wins: tally.wins,
            losses: tally.losses,
            breakevens: tally.breakevens,
            gross_pnl: tally.gross_pnl,
            total_charges,
            net_pnl: tally.gross_pnl - total_charges,
            win_rate: tally.win_rate(),
            gross_profit: tally.gross_profit,
            gross_loss: tally.gross_loss,
            avg_win: tally.avg_win(),
            avg_loss: tally.avg_loss(),
            risk_reward: tally.risk_reward(),
            profit_factor: tally.profit_factor(),
            largest_win: tally.largest_win,
            largest_loss: tally.largest_loss,
            edge_breakdown,
            most_profitable_edge,
        }
    }
}

/// P&L per known edge, most profitable first. Edges without closed trades
/// and trades pointing at unknown edges are left out.
fn edge_breakdown(closed: &[&Trade], edges: &[Edge]) -> Vec<EdgePerformance> {
    let mut rows: Vec<EdgePerformance> = edges
        .iter()
        .filter_map(|edge| {
            let tally = TradeTally::from_trades(
                closed
                    .iter()
                    .copied()
                    .filter(|t| t.edge_id.as_deref() == Some(edge.id.as_str())),
            );
            (tally.trades > 0).then(|| EdgePerformance {
                edge_id: edge.id.clone(),
                name: edge.name.clone(),
                pnl: tally.gross_pnl,
                trade_count: tally.trades,
                win_rate: tally.win_rate(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
    rows
}

/// P&L per formula. A trade counts towards every formula it references as
/// entry, stop-loss or target.
pub fn formula_breakdown(trades: &[Trade], formulas: &[Formula]) -> Vec<FormulaPerformance> {
    let mut rows: Vec<FormulaPerformance> = formulas
        .iter()
        .filter_map(|formula| {
            let tally = TradeTally::from_trades(
                trades
                    .iter()
                    .filter(|t| t.is_closed() && t.references_formula(&formula.id)),
            );
            (tally.trades > 0).then(|| FormulaPerformance {
                formula_id: formula.id.clone(),
                name: formula.name.clone(),
                pnl: tally.gross_pnl,
                trade_count: tally.trades,
                win_rate: tally.win_rate(),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
    rows
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// P&L by entry weekday, Monday first. Weekdays without trades are omitted.
pub fn weekday_breakdown(trades: &[Trade]) -> Vec<WeekdayPerformance> {
    WEEK.iter()
        .filter_map(|&weekday| {
            let tally = TradeTally::from_trades(
                trades
                    .iter()
                    .filter(|t| t.is_closed() && t.entry_weekday() == weekday),
            );
            (tally.trades > 0).then(|| WeekdayPerformance {
                weekday,
                pnl: tally.gross_pnl,
                trade_count: tally.trades,
                win_rate: tally.win_rate(),
            })
        })
        .collect()
}
