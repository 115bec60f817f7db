//! Holding-time formatting used by the CSV export and CLI tables.

use crate::domain::trade::Trade;
use chrono::Duration;

/// Splits a duration into days, hours, minutes and seconds. Negative
/// durations clamp to zero.
pub fn decompose(duration: Duration) -> (i64, i64, i64, i64) {
    let total = duration.num_seconds().max(0);
    (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    )
}

/// Formats as `"Xd Yh Zm Ws"`, dropping leading zero parts. Seconds are
/// always shown, so a zero duration is `"0s"`.
pub fn format_duration(duration: Duration) -> String {
    let (d, h, m, s) = decompose(duration);
    if d > 0 {
        format!("{d}d {h}h {m}m {s}s")
    } else if h > 0 {
        format!("{h}h {m}m {s}s")
    } else if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

/// Holding time of a closed trade; empty while the trade is open.
pub fn trade_duration(trade: &Trade) -> String {
    if !trade.is_closed() {
        return String::new();
    }
    trade.holding_time().map(format_duration).unwrap_or_default()
}
