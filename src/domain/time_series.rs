//! Time-series generators over closed trades: cumulative P&L, periodic
//! performance tables, P&L candlesticks and daily profit/loss.
//!
//! Sums are accumulated at full precision. Chart-ready series (cumulative
//! points, candles, daily profit/loss) are rounded to two decimals only when
//! the output record is built.

use crate::domain::charges::ChargeModel;
use crate::domain::metrics::{serialize_ratio, TradeTally};
use crate::domain::trade::Trade;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Closed trades ordered by exit time; ties keep their input order.
pub fn closed_by_exit(trades: &[Trade]) -> Vec<&Trade> {
    let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
    closed.sort_by_key(|t| t.exit_time);
    closed
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePnlDataPoint {
    pub time: NaiveDateTime,
    pub trade_id: String,
    pub pnl: f64,
    pub cumulative_pnl: f64,
}

pub fn cumulative_pnl(trades: &[Trade]) -> Vec<CumulativePnlDataPoint> {
    let mut running = 0.0;
    closed_by_exit(trades)
        .into_iter()
        .filter_map(|trade| {
            running += trade.pnl;
            trade.exit_time.map(|time| CumulativePnlDataPoint {
                time,
                trade_id: trade.id.clone(),
                pnl: round2(trade.pnl),
                cumulative_pnl: round2(running),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Daily,
    Monthly,
    Yearly,
}

impl Period {
    /// Sortable bucket key; lexical order equals chronological order.
    pub fn key(self, time: NaiveDateTime) -> String {
        let fmt = match self {
            Period::Daily => "%Y-%m-%d",
            Period::Monthly => "%Y-%m",
            Period::Yearly => "%Y",
        };
        time.format(fmt).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodicPerformance {
    pub period: String,
    pub trade_count: usize,
    pub gross_pnl: f64,
    pub charges: f64,
    pub net_pnl: f64,
    pub win_rate: f64,
    pub wins: usize,
    pub losses: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub profit_factor: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub risk_reward: f64,
}

/// Performance per period, most recent period first.
pub fn periodic_performance(
    trades: &[Trade],
    period: Period,
    charges: &ChargeModel,
) -> Vec<PeriodicPerformance> {
    let mut buckets: BTreeMap<String, (TradeTally, f64)> = BTreeMap::new();
    for trade in trades {
        let Some((_, exit_time)) = trade.exit() else {
            continue;
        };
        let bucket = buckets.entry(period.key(exit_time)).or_default();
        bucket.0.add(trade.pnl);
        bucket.1 += charges.charges(trade);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(key, (tally, charges))| PeriodicPerformance {
            period: key,
            trade_count: tally.trades,
            gross_pnl: tally.gross_pnl,
            charges,
            net_pnl: tally.gross_pnl - charges,
            win_rate: tally.win_rate(),
            wins: tally.wins,
            losses: tally.losses,
            gross_profit: tally.gross_profit,
            gross_loss: tally.gross_loss,
            profit_factor: tally.profit_factor(),
            risk_reward: tally.risk_reward(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Trade,
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    fn label(self, time: NaiveDateTime) -> String {
        let fmt = match self {
            Granularity::Trade => "%Y-%m-%d %H:%M:%S",
            Granularity::Day => "%Y-%m-%d",
            // ISO weeks start on Monday.
            Granularity::Week => "%G-W%V",
            Granularity::Month => "%Y-%m",
            Granularity::Year => "%Y",
        };
        time.format(fmt).to_string()
    }
}

pub const TOTAL_LABEL: &str = "Total";

/// OHLC view of cumulative P&L over one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCandlestickData {
    pub label: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub trade_count: usize,
    pub is_total: bool,
}

impl DailyCandlestickData {
    fn rounded(
        label: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        trade_count: usize,
    ) -> Self {
        DailyCandlestickData {
            label,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            trade_count,
            is_total: false,
        }
    }
}

/// Builds P&L candles at the requested granularity, followed by a `Total`
/// bar spanning the whole range.
///
/// The cumulative baseline runs across all buckets. Within a bucket the
/// high/low cover the running cumulative path as well as each trade's own
/// swing measured from the bucket open.
pub fn pnl_candlesticks(trades: &[Trade], granularity: Granularity) -> Vec<DailyCandlestickData> {
    let sorted = closed_by_exit(trades);
    if sorted.is_empty() {
        return Vec::new();
    }

    let mut candles = Vec::new();
    let mut baseline = 0.0_f64;
    let mut range_high = 0.0_f64;
    let mut range_low = 0.0_f64;

    let label_of = |t: &Trade| t.exit_time.map(|time| granularity.label(time)).unwrap_or_default();

    if granularity == Granularity::Trade {
        for trade in &sorted {
            let open = baseline;
            baseline += trade.pnl;
            let (high, low) = (open.max(baseline), open.min(baseline));
            range_high = range_high.max(high);
            range_low = range_low.min(low);
            candles.push(DailyCandlestickData::rounded(
                label_of(trade),
                open,
                high,
                low,
                baseline,
                1,
            ));
        }
    } else {
        for bucket in sorted.chunk_by(|a, b| label_of(a) == label_of(b)) {
            let open = baseline;
            let mut high = open;
            let mut low = open;
            for trade in bucket {
                high = high.max(open + trade.pnl);
                low = low.min(open + trade.pnl);
                baseline += trade.pnl;
                high = high.max(baseline);
                low = low.min(baseline);
            }
            range_high = range_high.max(high);
            range_low = range_low.min(low);
            candles.push(DailyCandlestickData::rounded(
                label_of(bucket[0]),
                open,
                high,
                low,
                baseline,
                bucket.len(),
            ));
        }
    }

    let mut total = DailyCandlestickData::rounded(
        TOTAL_LABEL.to_string(),
        0.0,
        range_high,
        range_low,
        baseline,
        sorted.len(),
    );
    total.is_total = true;
    candles.push(total);
    candles
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyProfitLoss {
    pub date: NaiveDate,
    pub daily_profit: f64,
    /// Sum of losing P&L for the day; zero or negative.
    pub daily_loss: f64,
}

pub fn daily_profit_loss(trades: &[Trade]) -> Vec<DailyProfitLoss> {
    let mut days: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for trade in trades.iter().filter(|t| t.is_closed()) {
        let Some(date) = trade.exit_date() else {
            continue;
        };
        let day = days.entry(date).or_default();
        if trade.pnl > 0.0 {
            day.0 += trade.pnl;
        } else if trade.pnl < 0.0 {
            day.1 += trade.pnl;
        }
    }
    days.into_iter()
        .map(|(date, (profit, loss))| DailyProfitLoss {
            date,
            daily_profit: round2(profit),
            daily_loss: round2(loss),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyPerformanceStat {
    pub pnl: f64,
    pub trade_count: usize,
}

/// P&L and trade count per exit day, for every trade carrying an exit time.
pub fn daily_performance_stats(trades: &[Trade]) -> BTreeMap<NaiveDate, DailyPerformanceStat> {
    let mut stats: BTreeMap<NaiveDate, DailyPerformanceStat> = BTreeMap::new();
    for trade in trades {
        if let Some(date) = trade.exit_date() {
            let stat = stats.entry(date).or_default();
            stat.pnl += trade.pnl;
            stat.trade_count += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enrichment::enrich;
    use crate::domain::trade::PositionSide;
    use approx::assert_relative_eq;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    /// A closed long trade of quantity 1 with the given P&L.
    fn trade_with_pnl(id: &str, pnl: f64, exit: NaiveDateTime) -> Trade {
        let entry = exit - chrono::Duration::hours(1);
        enrich(
            &Trade::open(id, "NIFTY", PositionSide::Long, 100.0, 1, entry)
                .closed_at(100.0 + pnl, exit),
        )
    }

    #[test]
    fn round2_keeps_sentinels() {
        assert_eq!(round2(-12.344), -12.34);
        assert_eq!(round2(2.345_6), 2.35);
        assert!(round2(f64::NAN).is_nan());
        assert!(round2(f64::INFINITY).is_infinite());
    }

    #[test]
    fn cumulative_empty() {
        assert!(cumulative_pnl(&[]).is_empty());
    }

    #[test]
    fn cumulative_sorted_by_exit() {
        let trades = vec![
            trade_with_pnl("b", -30.0, at(2024, 1, 3, 10)),
            trade_with_pnl("a", 100.0, at(2024, 1, 2, 10)),
            enrich(&Trade::open("o", "X", PositionSide::Long, 1.0, 1, at(2024, 1, 1, 9))),
        ];
        let series = cumulative_pnl(&trades);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].trade_id, "a");
        assert_relative_eq!(series[0].cumulative_pnl, 100.0);
        assert_relative_eq!(series[1].cumulative_pnl, 70.0);
    }

    #[test]
    fn periodic_monthly_most_recent_first() {
        let trades = vec![
            trade_with_pnl("a", 100.0, at(2024, 1, 2, 10)),
            trade_with_pnl("b", -40.0, at(2024, 1, 20, 10)),
            trade_with_pnl("c", 50.0, at(2024, 3, 5, 10)),
        ];
        let rows = periodic_performance(&trades, Period::Monthly, &ChargeModel::new(10.0));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, "2024-03");
        assert_eq!(rows[1].period, "2024-01");
        assert_eq!(rows[1].trade_count, 2);
        assert_relative_eq!(rows[1].gross_pnl, 60.0);
        assert_relative_eq!(rows[1].charges, 40.0);
        assert_relative_eq!(rows[1].net_pnl, 20.0);
        assert_relative_eq!(rows[1].profit_factor, 2.5);
        assert!(rows[0].profit_factor.is_infinite());
        assert!(rows[0].risk_reward.is_infinite());
    }

    #[test]
    fn periodic_breakeven_bucket_keeps_nan() {
        let trades = vec![trade_with_pnl("a", 0.0, at(2023, 6, 1, 10))];
        let rows = periodic_performance(&trades, Period::Yearly, &ChargeModel::default());
        assert_eq!(rows[0].period, "2023");
        assert!(rows[0].profit_factor.is_nan());
        assert_eq!(rows[0].risk_reward, 0.0);

        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["profit_factor"], "nan");
        assert_eq!(json["risk_reward"], 0.0);
    }

    #[test]
    fn periodic_daily_keys() {
        assert_eq!(Period::Daily.key(at(2024, 2, 9, 14)), "2024-02-09");
    }

    #[test]
    fn candles_empty() {
        assert!(pnl_candlesticks(&[], Granularity::Day).is_empty());
        assert!(pnl_candlesticks(&[], Granularity::Trade).is_empty());
    }

    #[test]
    fn candles_single_day_bucket() {
        let trades = vec![
            trade_with_pnl("a", 100.0, at(2024, 1, 2, 10)),
            trade_with_pnl("b", -30.0, at(2024, 1, 2, 11)),
            trade_with_pnl("c", 20.0, at(2024, 1, 2, 12)),
        ];
        let candles = pnl_candlesticks(&trades, Granularity::Day);
        assert_eq!(candles.len(), 2);

        let day = &candles[0];
        assert_eq!(day.label, "2024-01-02");
        assert_relative_eq!(day.open, 0.0);
        assert_relative_eq!(day.close, 90.0);
        assert_relative_eq!(day.high, 100.0);
        assert_relative_eq!(day.low, -30.0);
        assert_eq!(day.trade_count, 3);

        let total = &candles[1];
        assert!(total.is_total);
        assert_eq!(total.label, TOTAL_LABEL);
        assert_relative_eq!(total.open, 0.0);
        assert_relative_eq!(total.close, 90.0);
        assert_relative_eq!(total.high, 100.0);
        assert_relative_eq!(total.low, -30.0);
    }

    #[test]
    fn candles_baseline_carries_across_buckets() {
        let trades = vec![
            trade_with_pnl("a", 50.0, at(2024, 1, 2, 10)),
            trade_with_pnl("b", -80.0, at(2024, 1, 3, 10)),
        ];
        let candles = pnl_candlesticks(&trades, Granularity::Day);
        assert_eq!(candles.len(), 3);
        assert_relative_eq!(candles[1].open, 50.0);
        assert_relative_eq!(candles[1].close, -30.0);
        assert_relative_eq!(candles[1].low, -30.0);
        assert_relative_eq!(candles[1].high, 50.0);
        assert_relative_eq!(candles[2].low, -30.0);
        assert_relative_eq!(candles[2].high, 50.0);
    }

    #[test]
    fn candles_per_trade() {
        let trades = vec![
            trade_with_pnl("a", 40.0, at(2024, 1, 2, 10)),
            trade_with_pnl("b", -10.0, at(2024, 1, 2, 11)),
        ];
        let candles = pnl_candlesticks(&trades, Granularity::Trade);
        assert_eq!(candles.len(), 3);
        assert_relative_eq!(candles[1].open, 40.0);
        assert_relative_eq!(candles[1].close, 30.0);
        assert_relative_eq!(candles[1].high, 40.0);
        assert_relative_eq!(candles[1].low, 30.0);
        assert_eq!(candles[0].label, "2024-01-02 10:00:00");
        assert_relative_eq!(candles[2].close, 30.0);
    }

    #[test]
    fn candles_week_month_year_grouping() {
        // 2024-01-07 is a Sunday, 2024-01-08 a Monday.
        let trades = vec![
            trade_with_pnl("a", 10.0, at(2024, 1, 7, 10)),
            trade_with_pnl("b", 10.0, at(2024, 1, 8, 10)),
            trade_with_pnl("c", 10.0, at(2024, 2, 1, 10)),
            trade_with_pnl("d", 10.0, at(2025, 1, 2, 10)),
        ];
        let weeks = pnl_candlesticks(&trades, Granularity::Week);
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].label, "2024-W01");
        assert_eq!(weeks[1].label, "2024-W02");

        let months = pnl_candlesticks(&trades, Granularity::Month);
        assert_eq!(months.len(), 4);
        assert_eq!(months[0].trade_count, 2);

        let years = pnl_candlesticks(&trades, Granularity::Year);
        assert_eq!(years.len(), 3);
        assert_eq!(years[1].label, "2025");
        assert_relative_eq!(years[1].open, 30.0);
        assert_relative_eq!(years[2].close, 40.0);
    }

    #[test]
    fn daily_profit_loss_splits_sides() {
        let trades = vec![
            trade_with_pnl("a", 100.0, at(2024, 1, 3, 10)),
            trade_with_pnl("b", -30.0, at(2024, 1, 3, 11)),
            trade_with_pnl("c", -5.0, at(2024, 1, 2, 11)),
        ];
        let days = daily_profit_loss(&trades);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_relative_eq!(days[0].daily_profit, 0.0);
        assert_relative_eq!(days[0].daily_loss, -5.0);
        assert_relative_eq!(days[1].daily_profit, 100.0);
        assert_relative_eq!(days[1].daily_loss, -30.0);
    }

    #[test]
    fn daily_stats_tolerate_malformed_exit() {
        let mut odd = Trade::open("x", "X", PositionSide::Long, 1.0, 1, at(2024, 1, 2, 9));
        odd.exit_time = Some(at(2024, 1, 2, 10));
        let trades = vec![odd, trade_with_pnl("a", 12.5, at(2024, 1, 2, 11))];
        let stats = daily_performance_stats(&trades);
        let day = stats[&NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()];
        assert_eq!(day.trade_count, 2);
        assert_relative_eq!(day.pnl, 12.5);
    }
}
