//! CSV trade export. Every cell is double-quoted.

use crate::domain::duration::trade_duration;
use crate::domain::error::JournalError;
use crate::domain::formula::formula_names;
use crate::domain::journal::Journal;
use crate::domain::trade::Trade;
use crate::ports::export_port::ExportPort;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

pub const EXPORT_HEADERS: [&str; 25] = [
    "S.No",
    "ID",
    "Symbol",
    "Position",
    "Index",
    "Strike Price",
    "Entry Price",
    "Exit Price",
    "Quantity",
    "Entry Time",
    "Exit Time",
    "Duration",
    "P&L",
    "Outcome",
    "Edge",
    "Rule Compliance",
    "Expiry Type",
    "Entry Formula",
    "Stop Loss Formulas",
    "Target Formulas",
    "SL Price",
    "Target Price",
    "Result",
    "Screenshot",
    "Notes",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvExportAdapter {
    path: PathBuf,
}

impl CsvExportAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExportPort for CsvExportAdapter {
    fn export(&self, trades: &[&Trade], journal: &Journal) -> Result<(), JournalError> {
        let file = File::create(&self.path).map_err(|e| JournalError::Export {
            reason: format!("failed to create {}: {}", self.path.display(), e),
        })?;
        write_trades(file, trades, journal)?;
        tracing::info!(path = %self.path.display(), rows = trades.len(), "trades exported");
        Ok(())
    }
}

/// Writes the header and one row per trade to `writer`.
pub fn write_trades<W: Write>(
    writer: W,
    trades: &[&Trade],
    journal: &Journal,
) -> Result<(), JournalError> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);
    let export_err = |e: csv::Error| JournalError::Export {
        reason: e.to_string(),
    };

    wtr.write_record(EXPORT_HEADERS).map_err(export_err)?;
    for (i, trade) in trades.iter().enumerate() {
        wtr.write_record(export_row(i + 1, trade, journal))
            .map_err(export_err)?;
    }
    wtr.flush().map_err(|e| JournalError::Export {
        reason: e.to_string(),
    })?;
    Ok(())
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn export_row(serial: usize, trade: &Trade, journal: &Journal) -> Vec<String> {
    let entry_formula = trade
        .entry_formula_id
        .as_ref()
        .map(|id| journal.formula(id).map_or_else(|| id.clone(), |f| f.name.clone()))
        .unwrap_or_default();

    vec![
        serial.to_string(),
        trade.id.clone(),
        trade.symbol.clone(),
        trade.side.to_string(),
        trade.index.clone(),
        optional(trade.strike_price),
        money(trade.entry_price),
        trade.exit_price.map(money).unwrap_or_default(),
        trade.quantity.to_string(),
        trade.entry_time.format(TIME_FORMAT).to_string(),
        optional(trade.exit_time.map(|t| t.format(TIME_FORMAT))),
        trade_duration(trade),
        money(trade.pnl),
        trade.outcome.to_string(),
        journal.edge_name(trade).unwrap_or_default().to_string(),
        trade.rule_compliance.to_string(),
        optional(trade.expiry_type),
        entry_formula,
        formula_names(&journal.formulas, &trade.stop_loss_formula_ids).join("|"),
        formula_names(&journal.formulas, &trade.target_formula_ids).join("|"),
        optional(trade.sl_price),
        optional(trade.target_price),
        trade.result.clone().unwrap_or_default(),
        trade.screenshot.clone().unwrap_or_default(),
        trade.notes.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge::Edge;
    use crate::domain::formula::{Formula, FormulaKind};
    use crate::domain::trade::PositionSide;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn journal_with_trade() -> Journal {
        let at = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut journal = Journal::new();
        journal.edges.push(Edge::new("orb", "Opening Range"));
        journal.formulas.push(Formula::new("e1", "Retest", FormulaKind::NormalEntry));
        journal.formulas.push(Formula::new("s1", "Swing Low", FormulaKind::StopLoss));
        journal.formulas.push(Formula::new("s2", "ATR", FormulaKind::StopLoss));

        let mut trade = Trade::open("t1", "NIFTY", PositionSide::Long, 100.0, 10, at)
            .closed_at(150.5, at + chrono::Duration::seconds(3_725));
        trade.edge_id = Some("orb".into());
        trade.entry_formula_id = Some("e1".into());
        trade.stop_loss_formula_ids = vec!["s1".into(), "s2".into()];
        trade.notes = "said \"wait\"".into();
        journal.record_trade(trade).unwrap();
        journal
    }

    #[test]
    fn row_follows_column_order() {
        let journal = journal_with_trade();
        let row = export_row(1, &journal.trades[0], &journal);
        assert_eq!(row.len(), EXPORT_HEADERS.len());
        assert_eq!(row[0], "1");
        assert_eq!(row[3], "Long");
        assert_eq!(row[6], "100.00");
        assert_eq!(row[7], "150.50");
        assert_eq!(row[10], "2024-07-01 10:32:05");
        assert_eq!(row[11], "1h 2m 5s");
        assert_eq!(row[12], "505.00");
        assert_eq!(row[13], "Win");
        assert_eq!(row[14], "Opening Range");
        assert_eq!(row[15], "Fully Followed");
        assert_eq!(row[17], "Retest");
        assert_eq!(row[18], "Swing Low|ATR");
        assert_eq!(row[19], "");
    }

    #[test]
    fn open_trade_leaves_exit_cells_empty() {
        let mut journal = journal_with_trade();
        journal.trades[0].exit_price = None;
        journal.trades[0].exit_time = None;
        journal.enrich_all();
        let row = export_row(1, &journal.trades[0], &journal);
        assert_eq!(row[7], "");
        assert_eq!(row[10], "");
        assert_eq!(row[11], "");
        assert_eq!(row[12], "0.00");
        assert_eq!(row[13], "Open");
    }

    #[test]
    fn every_cell_is_quoted() {
        let journal = journal_with_trade();
        let refs: Vec<&Trade> = journal.trades.iter().collect();
        let mut out = Vec::new();
        write_trades(&mut out, &refs, &journal).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("\"S.No\",\"ID\",\"Symbol\""));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"1\",\"t1\",\"NIFTY\""));
        assert!(row.ends_with("\"said \"\"wait\"\"\""));
    }

    #[test]
    fn export_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        let journal = journal_with_trade();
        let refs: Vec<&Trade> = journal.trades.iter().collect();
        CsvExportAdapter::new(&path).export(&refs, &journal).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
