//! Trade enrichment: derives `pnl`, `outcome` and the rule-compliance label
//! from a trade's primary fields.
//!
//! Enrichment is total and idempotent. Derived fields are overwritten on
//! every call, never trusted from the input.

use crate::domain::trade::{ExecutionMode, Outcome, RuleCompliance, Trade};

/// Returns a copy of `trade` with its derived fields recomputed.
pub fn enrich(trade: &Trade) -> Trade {
    let mut enriched = trade.clone();
    enrich_in_place(&mut enriched);
    enriched
}

pub fn enrich_in_place(trade: &mut Trade) {
    match trade.realized_pnl() {
        Some(pnl) => {
            trade.pnl = pnl;
            trade.outcome = classify(pnl);
        }
        None => {
            trade.pnl = 0.0;
            trade.outcome = Outcome::Open;
        }
    }
    trade.rule_compliance = derive_compliance(
        trade.execution_mode,
        trade.close_mode,
        trade.rule_compliance,
    );
}

pub fn enrich_all(trades: &[Trade]) -> Vec<Trade> {
    trades.iter().map(enrich).collect()
}

pub fn classify(pnl: f64) -> Outcome {
    if pnl > 0.0 {
        Outcome::Win
    } else if pnl < 0.0 {
        Outcome::Loss
    } else {
        Outcome::Breakeven
    }
}

/// Reclassifies compliance from the execution and close modes. Combinations
/// outside the lookup keep the stored label.
pub fn derive_compliance(
    execution: Option<ExecutionMode>,
    close: Option<ExecutionMode>,
    stored: RuleCompliance,
) -> RuleCompliance {
    use ExecutionMode::{Both, Real, Theoretical};

    let (Some(execution), Some(close)) = (execution, close) else {
        return stored;
    };
    match (execution, close) {
        (Both, Both) => RuleCompliance::FullyFollowed,
        (Both, Real) | (Both, Theoretical) | (Real, Both) | (Theoretical, Both) => {
            RuleCompliance::PartiallyFollowed
        }
        (Real, Real) => RuleCompliance::NotFollowed,
        (Theoretical, Theoretical) => RuleCompliance::EntryMissed,
        (Real, Theoretical) | (Theoretical, Real) => stored,
    }
}
