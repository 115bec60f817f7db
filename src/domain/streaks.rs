//! Win/loss streaks and peak-to-trough drawdown of cumulative P&L.

use crate::domain::time_series::{closed_by_exit, CumulativePnlDataPoint};
use crate::domain::trade::Trade;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub kind: StreakKind,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreakStats {
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
    /// Run ending at the most recent closed trade; `None` when there are no
    /// closed trades or the last one broke even.
    pub current: Option<Streak>,
}

/// Scans closed trades in exit order. A breakeven trade resets both runs.
pub fn streak_stats(trades: &[Trade]) -> StreakStats {
    let mut stats = StreakStats::default();
    let mut wins = 0usize;
    let mut losses = 0usize;

    for trade in closed_by_exit(trades) {
        if trade.pnl > 0.0 {
            wins += 1;
            losses = 0;
        } else if trade.pnl < 0.0 {
            losses += 1;
            wins = 0;
        } else {
            wins = 0;
            losses = 0;
        }
        stats.longest_win_streak = stats.longest_win_streak.max(wins);
        stats.longest_loss_streak = stats.longest_loss_streak.max(losses);
    }

    stats.current = if wins > 0 {
        Some(Streak {
            kind: StreakKind::Win,
            length: wins,
        })
    } else if losses > 0 {
        Some(Streak {
            kind: StreakKind::Loss,
            length: losses,
        })
    } else {
        None
    };
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DrawdownInfo {
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    /// Running peak when the maximum drawdown was reached.
    pub peak: f64,
    /// Cumulative P&L at the point of maximum drawdown.
    pub trough: f64,
}

/// Maximum drawdown of a chronological cumulative P&L series. The peak
/// starts at zero, so an opening loss already counts as drawdown.
pub fn drawdown(cumulative: &[f64]) -> DrawdownInfo {
    let mut info = DrawdownInfo::default();
    let mut peak = 0.0_f64;

    for &value in cumulative {
        if value > peak {
            peak = value;
        }
        let dd = peak - value;
        if dd > info.max_drawdown {
            info.max_drawdown = dd;
            info.peak = peak;
            info.trough = value;
        }
    }

    info.max_drawdown_percent = if info.peak > 0.0 {
        info.max_drawdown / info.peak * 100.0
    } else {
        0.0
    };
    info
}

pub fn drawdown_from_points(points: &[CumulativePnlDataPoint]) -> DrawdownInfo {
    let values: Vec<f64> = points.iter().map(|p| p.cumulative_pnl).collect();
    drawdown(&values)
}
