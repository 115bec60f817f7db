//! Per-trade transaction cost derived from the trade's order history.

use crate::domain::trade::{Trade, TradeEventKind};

/// Flat brokerage charged for each order, in account currency.
pub const DEFAULT_PER_ORDER_FEE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeModel {
    pub per_order_fee: f64,
}

impl Default for ChargeModel {
    fn default() -> Self {
        ChargeModel {
            per_order_fee: DEFAULT_PER_ORDER_FEE,
        }
    }
}

impl ChargeModel {
    pub fn new(per_order_fee: f64) -> Self {
        ChargeModel { per_order_fee }
    }

    pub fn charges(&self, trade: &Trade) -> f64 {
        order_count(trade) as f64 * self.per_order_fee
    }

    pub fn total(&self, trades: &[Trade]) -> f64 {
        trades.iter().map(|t| self.charges(t)).sum()
    }
}

/// Number of orders a trade generated: the entry, each partial exit, and a
/// final exit order unless the last partial exit already flattened the
/// position.
pub fn order_count(trade: &Trade) -> usize {
    let partials = trade.partial_exits().count();
    let closed_by_partial = trade.partial_exits().last().is_some_and(|e| {
        matches!(
            e.kind,
            TradeEventKind::PartialExit {
                closes_position: true,
                ..
            }
        )
    });

    let final_exit = usize::from(trade.is_closed() && !closed_by_partial);
    1 + partials + final_exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::{PositionSide, TradeEvent};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(10, m, 0)
            .unwrap()
    }

    fn base() -> Trade {
        Trade::open("c1", "NIFTY", PositionSide::Long, 100.0, 100, at(0))
    }

    fn partial(qty: u32, closes: bool, m: u32) -> TradeEvent {
        TradeEvent {
            at: at(m),
            kind: TradeEventKind::PartialExit {
                quantity: qty,
                price: 105.0,
                closes_position: closes,
            },
            note: String::new(),
        }
    }

    #[test]
    fn open_trade_is_single_order() {
        assert_eq!(order_count(&base()), 1);
    }

    #[test]
    fn closed_trade_without_partials_is_two_orders() {
        assert_eq!(order_count(&base().closed_at(110.0, at(30))), 2);
    }

    #[test]
    fn partial_exits_add_orders() {
        let mut trade = base();
        trade.log.push(partial(25, false, 5));
        trade.log.push(partial(25, false, 10));
        assert_eq!(order_count(&trade), 3);

        let closed = trade.closed_at(110.0, at(30));
        assert_eq!(order_count(&closed), 4);
    }

    #[test]
    fn closing_partial_is_not_double_counted() {
        let mut trade = base().closed_at(110.0, at(30));
        trade.log.push(partial(50, false, 5));
        trade.log.push(partial(50, true, 30));
        assert_eq!(order_count(&trade), 3);
    }

    #[test]
    fn edits_do_not_count() {
        let mut trade = base().closed_at(110.0, at(30));
        trade.log.push(TradeEvent {
            at: at(40),
            kind: TradeEventKind::Edit {
                field: "notes".into(),
            },
            note: "typo".into(),
        });
        assert_eq!(order_count(&trade), 2);
    }

    #[test]
    fn charges_scale_with_fee() {
        let trade = base().closed_at(110.0, at(30));
        assert!((ChargeModel::default().charges(&trade) - 40.0).abs() < f64::EPSILON);
        assert!((ChargeModel::new(15.5).charges(&trade) - 31.0).abs() < f64::EPSILON);
    }

    #[test]
    fn total_sums_trades() {
        let trades = vec![base(), base().closed_at(110.0, at(30))];
        assert!((ChargeModel::default().total(&trades) - 60.0).abs() < f64::EPSILON);
    }
}
