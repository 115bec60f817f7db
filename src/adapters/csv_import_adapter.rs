//! CSV trade import with a configurable header mapping.
//!
//! The default mapping reads the export's own headers, so an exported file
//! imports back unchanged, formula and rule-compliance columns included.
//! Rows are validated before they are accepted and failures carry the
//! 1-based data row number.

use crate::domain::edge::Edge;
use crate::domain::enrichment::enrich_in_place;
use crate::domain::error::JournalError;
use crate::domain::formula::Formula;
use crate::domain::trade::{ExpiryType, PositionSide, RuleCompliance, Trade};
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TradeField {
    Id,
    Symbol,
    Side,
    Index,
    StrikePrice,
    ExpiryType,
    EntryPrice,
    ExitPrice,
    Quantity,
    EntryTime,
    ExitTime,
    Edge,
    RuleCompliance,
    EntryFormula,
    StopLossFormulas,
    TargetFormulas,
    SlPrice,
    TargetPrice,
    Result,
    Screenshot,
    Notes,
}

impl TradeField {
    pub const ALL: [TradeField; 21] = [
        TradeField::Id,
        TradeField::Symbol,
        TradeField::Side,
        TradeField::Index,
        TradeField::StrikePrice,
        TradeField::ExpiryType,
        TradeField::EntryPrice,
        TradeField::ExitPrice,
        TradeField::Quantity,
        TradeField::EntryTime,
        TradeField::ExitTime,
        TradeField::Edge,
        TradeField::RuleCompliance,
        TradeField::EntryFormula,
        TradeField::StopLossFormulas,
        TradeField::TargetFormulas,
        TradeField::SlPrice,
        TradeField::TargetPrice,
        TradeField::Result,
        TradeField::Screenshot,
        TradeField::Notes,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TradeField::Id => "id",
            TradeField::Symbol => "symbol",
            TradeField::Side => "side",
            TradeField::Index => "index",
            TradeField::StrikePrice => "strike_price",
            TradeField::ExpiryType => "expiry_type",
            TradeField::EntryPrice => "entry_price",
            TradeField::ExitPrice => "exit_price",
            TradeField::Quantity => "quantity",
            TradeField::EntryTime => "entry_time",
            TradeField::ExitTime => "exit_time",
            TradeField::Edge => "edge",
            TradeField::RuleCompliance => "rule_compliance",
            TradeField::EntryFormula => "entry_formula",
            TradeField::StopLossFormulas => "stop_loss_formulas",
            TradeField::TargetFormulas => "target_formulas",
            TradeField::SlPrice => "sl_price",
            TradeField::TargetPrice => "target_price",
            TradeField::Result => "result",
            TradeField::Screenshot => "screenshot",
            TradeField::Notes => "notes",
        }
    }

    /// Header written by the CSV export for this field.
    pub fn default_header(self) -> &'static str {
        match self {
            TradeField::Id => "ID",
            TradeField::Symbol => "Symbol",
            TradeField::Side => "Position",
            TradeField::Index => "Index",
            TradeField::StrikePrice => "Strike Price",
            TradeField::ExpiryType => "Expiry Type",
            TradeField::EntryPrice => "Entry Price",
            TradeField::ExitPrice => "Exit Price",
            TradeField::Quantity => "Quantity",
            TradeField::EntryTime => "Entry Time",
            TradeField::ExitTime => "Exit Time",
            TradeField::Edge => "Edge",
            TradeField::RuleCompliance => "Rule Compliance",
            TradeField::EntryFormula => "Entry Formula",
            TradeField::StopLossFormulas => "Stop Loss Formulas",
            TradeField::TargetFormulas => "Target Formulas",
            TradeField::SlPrice => "SL Price",
            TradeField::TargetPrice => "Target Price",
            TradeField::Result => "Result",
            TradeField::Screenshot => "Screenshot",
            TradeField::Notes => "Notes",
        }
    }
}

impl FromStr for TradeField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        TradeField::ALL
            .into_iter()
            .find(|f| f.key() == key)
            .ok_or_else(|| format!("unknown trade field '{}'", s))
    }
}

/// Which CSV header feeds each trade field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMapping {
    headers: BTreeMap<TradeField, String>,
}

impl Default for ImportMapping {
    fn default() -> Self {
        ImportMapping {
            headers: TradeField::ALL
                .into_iter()
                .map(|f| (f, f.default_header().to_string()))
                .collect(),
        }
    }
}

impl ImportMapping {
    pub fn with(mut self, field: TradeField, header: impl Into<String>) -> Self {
        self.headers.insert(field, header.into());
        self
    }

    pub fn header(&self, field: TradeField) -> &str {
        self.headers
            .get(&field)
            .map(String::as_str)
            .unwrap_or(field.default_header())
    }

    /// Default mapping overridden by `[import] <field> = <header>`. A blank
    /// header is reported as missing rather than silently ignored.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        let mut mapping = Self::default();
        for (key, header) in config.section_entries("import") {
            let field: TradeField = key.parse().map_err(|reason| JournalError::ConfigInvalid {
                section: "import".to_string(),
                key: key.clone(),
                reason,
            })?;
            let header = header.trim();
            if header.is_empty() {
                return Err(JournalError::ConfigMissing {
                    section: "import".to_string(),
                    key,
                });
            }
            mapping = mapping.with(field, header);
        }
        Ok(mapping)
    }
}

pub struct CsvImportAdapter {
    path: PathBuf,
    mapping: ImportMapping,
}

impl CsvImportAdapter {
    pub fn new(path: impl Into<PathBuf>, mapping: ImportMapping) -> Self {
        Self {
            path: path.into(),
            mapping,
        }
    }

    /// Reads, validates and enriches every row of the file. Edge and
    /// formula cells may hold a name or an id; names are resolved through
    /// `edges` and `formulas`.
    pub fn read_trades(
        &self,
        edges: &[Edge],
        formulas: &[Formula],
    ) -> Result<Vec<Trade>, JournalError> {
        let file = fs::File::open(&self.path)?;
        let trades = parse_trades(file, &self.mapping, edges, formulas)?;
        tracing::info!(path = %self.path.display(), trades = trades.len(), "trades imported");
        Ok(trades)
    }
}

pub fn parse_trades<R: Read>(
    reader: R,
    mapping: &ImportMapping,
    edges: &[Edge],
    formulas: &[Formula],
) -> Result<Vec<Trade>, JournalError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| JournalError::Import {
            row: 0,
            reason: format!("failed to read header: {}", e),
        })?
        .clone();

    let columns: BTreeMap<TradeField, usize> = TradeField::ALL
        .into_iter()
        .filter_map(|field| {
            let wanted = mapping.header(field);
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(wanted))
                .map(|i| (field, i))
        })
        .collect();

    let mut trades = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result.map_err(|e| JournalError::Import {
            row,
            reason: format!("CSV parse error: {}", e),
        })?;
        let cells = RowCells {
            row,
            record: &record,
            columns: &columns,
        };
        match parse_row(&cells, edges, formulas) {
            Ok(trade) => trades.push(trade),
            Err(e) => {
                tracing::warn!(row, error = %e, "row rejected");
                return Err(e);
            }
        }
    }
    Ok(trades)
}

struct RowCells<'a> {
    row: usize,
    record: &'a csv::StringRecord,
    columns: &'a BTreeMap<TradeField, usize>,
}

impl RowCells<'_> {
    fn error(&self, reason: impl Into<String>) -> JournalError {
        JournalError::Import {
            row: self.row,
            reason: reason.into(),
        }
    }

    /// The cell for `field`, or `None` when the column is absent or empty.
    fn get(&self, field: TradeField) -> Option<&str> {
        self.columns
            .get(&field)
            .and_then(|&i| self.record.get(i))
            .filter(|v| !v.is_empty())
    }

    fn required(&self, field: TradeField) -> Result<&str, JournalError> {
        self.get(field)
            .ok_or_else(|| self.error(format!("missing {}", field.key())))
    }

    fn number<T: FromStr>(&self, field: TradeField) -> Result<Option<T>, JournalError> {
        self.get(field)
            .map(|v| {
                v.parse()
                    .map_err(|_| self.error(format!("invalid {} '{}'", field.key(), v)))
            })
            .transpose()
    }

    fn time(&self, field: TradeField) -> Result<Option<NaiveDateTime>, JournalError> {
        self.get(field)
            .map(|v| {
                parse_time(v).ok_or_else(|| self.error(format!("invalid {} '{}'", field.key(), v)))
            })
            .transpose()
    }

    fn text(&self, field: TradeField) -> Option<String> {
        self.get(field).map(str::to_string)
    }

    /// Pipe-separated formula names or ids, resolved to ids.
    fn formula_ids(&self, field: TradeField, formulas: &[Formula]) -> Vec<String> {
        self.get(field)
            .map(|v| {
                v.split('|')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| resolve_formula(name, formulas))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_row(
    cells: &RowCells<'_>,
    edges: &[Edge],
    formulas: &[Formula],
) -> Result<Trade, JournalError> {
    let side = parse_side(cells.required(TradeField::Side)?)
        .ok_or_else(|| cells.error("side must be long or short"))?;
    let entry_price: f64 = cells
        .number(TradeField::EntryPrice)?
        .ok_or_else(|| cells.error("missing entry_price"))?;
    let quantity: u32 = cells
        .number(TradeField::Quantity)?
        .ok_or_else(|| cells.error("missing quantity"))?;
    let entry_time = cells
        .time(TradeField::EntryTime)?
        .ok_or_else(|| cells.error("missing entry_time"))?;

    let id = cells
        .text(TradeField::Id)
        .unwrap_or_else(|| format!("import-{}", cells.row));
    let mut trade = Trade::open(
        id,
        cells.required(TradeField::Symbol)?,
        side,
        entry_price,
        quantity,
        entry_time,
    );
    trade.exit_price = cells.number(TradeField::ExitPrice)?;
    trade.exit_time = cells.time(TradeField::ExitTime)?;
    trade.index = cells.text(TradeField::Index).unwrap_or_default();
    trade.strike_price = cells.number(TradeField::StrikePrice)?;
    trade.expiry_type = cells
        .get(TradeField::ExpiryType)
        .map(|v| parse_expiry(v).ok_or_else(|| cells.error(format!("invalid expiry_type '{}'", v))))
        .transpose()?;
    trade.edge_id = cells.get(TradeField::Edge).map(|v| resolve_edge(v, edges));
    if let Some(v) = cells.get(TradeField::RuleCompliance) {
        trade.rule_compliance = parse_compliance(v)
            .ok_or_else(|| cells.error(format!("invalid rule_compliance '{}'", v)))?;
    }
    trade.entry_formula_id = cells
        .get(TradeField::EntryFormula)
        .map(|v| resolve_formula(v, formulas));
    trade.stop_loss_formula_ids = cells.formula_ids(TradeField::StopLossFormulas, formulas);
    trade.target_formula_ids = cells.formula_ids(TradeField::TargetFormulas, formulas);
    trade.sl_price = cells.number(TradeField::SlPrice)?;
    trade.target_price = cells.number(TradeField::TargetPrice)?;
    trade.result = cells.text(TradeField::Result);
    trade.screenshot = cells.text(TradeField::Screenshot);
    trade.notes = cells.text(TradeField::Notes).unwrap_or_default();

    trade.validate().map_err(|e| match e {
        JournalError::MalformedTrade { reason, .. } => cells.error(reason),
        other => other,
    })?;
    enrich_in_place(&mut trade);
    Ok(trade)
}

fn parse_side(value: &str) -> Option<PositionSide> {
    match value.to_lowercase().as_str() {
        "long" | "buy" => Some(PositionSide::Long),
        "short" | "sell" => Some(PositionSide::Short),
        _ => None,
    }
}

fn parse_expiry(value: &str) -> Option<ExpiryType> {
    match value.to_lowercase().as_str() {
        "weekly" => Some(ExpiryType::Weekly),
        "monthly" => Some(ExpiryType::Monthly),
        _ => None,
    }
}

/// Accepts the exported label ("Partially Followed") or its snake_case form.
fn parse_compliance(value: &str) -> Option<RuleCompliance> {
    match value.to_lowercase().replace(['_', '-'], " ").as_str() {
        "fully followed" => Some(RuleCompliance::FullyFollowed),
        "partially followed" => Some(RuleCompliance::PartiallyFollowed),
        "not followed" => Some(RuleCompliance::NotFollowed),
        "entry missed" => Some(RuleCompliance::EntryMissed),
        _ => None,
    }
}

fn parse_time(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn resolve_edge(value: &str, edges: &[Edge]) -> String {
    edges
        .iter()
        .find(|e| e.id == value || e.name.eq_ignore_ascii_case(value))
        .map_or_else(|| value.to_string(), |e| e.id.clone())
}

fn resolve_formula(value: &str, formulas: &[Formula]) -> String {
    formulas
        .iter()
        .find(|f| f.id == value || f.name.eq_ignore_ascii_case(value))
        .map_or_else(|| value.to_string(), |f| f.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::formula::FormulaKind;
    use crate::domain::trade::Outcome;
    use tempfile::TempDir;

    const EXPORTED: &str = "\"S.No\",\"ID\",\"Symbol\",\"Position\",\"Entry Price\",\"Exit Price\",\"Quantity\",\"Entry Time\",\"Exit Time\",\"Edge\",\"Expiry Type\"\n\
        \"1\",\"t1\",\"NIFTY\",\"Long\",\"100.00\",\"150.00\",\"10\",\"2024-07-01 09:30:00\",\"2024-07-01 10:00:00\",\"Opening Range\",\"Weekly\"\n\
        \"2\",\"t2\",\"BANKNIFTY\",\"Short\",\"200.00\",\"\",\"5\",\"2024-07-02 09:30:00\",\"\",\"\",\"\"\n";

    #[test]
    fn imports_exported_layout() {
        let edges = vec![Edge::new("orb", "Opening Range")];
        let trades =
            parse_trades(EXPORTED.as_bytes(), &ImportMapping::default(), &edges, &[]).unwrap();
        assert_eq!(trades.len(), 2);

        assert_eq!(trades[0].id, "t1");
        assert_eq!(trades[0].pnl, 500.0);
        assert_eq!(trades[0].outcome, Outcome::Win);
        assert_eq!(trades[0].edge_id.as_deref(), Some("orb"));
        assert_eq!(trades[0].expiry_type, Some(ExpiryType::Weekly));

        assert_eq!(trades[1].side, PositionSide::Short);
        assert!(!trades[1].is_closed());
        assert_eq!(trades[1].outcome, Outcome::Open);
    }

    #[test]
    fn custom_mapping() {
        let csv = "Ticker,Dir,Buy,Sell,Lots,Opened,Closed\n\
            NIFTY,buy,100,90,2,2024-07-01 09:30,2024-07-01 09:45\n";
        let mapping = ImportMapping::default()
            .with(TradeField::Symbol, "Ticker")
            .with(TradeField::Side, "Dir")
            .with(TradeField::EntryPrice, "Buy")
            .with(TradeField::ExitPrice, "Sell")
            .with(TradeField::Quantity, "Lots")
            .with(TradeField::EntryTime, "Opened")
            .with(TradeField::ExitTime, "Closed");
        let trades = parse_trades(csv.as_bytes(), &mapping, &[], &[]).unwrap();
        assert_eq!(trades[0].id, "import-1");
        assert_eq!(trades[0].pnl, -20.0);
    }

    #[test]
    fn mapping_from_config() {
        let config =
            FileConfigAdapter::from_string("[import]\nsymbol = Ticker\nquantity = Lots\n").unwrap();
        let mapping = ImportMapping::from_config(&config).unwrap();
        assert_eq!(mapping.header(TradeField::Symbol), "Ticker");
        assert_eq!(mapping.header(TradeField::Quantity), "Lots");
        assert_eq!(mapping.header(TradeField::EntryPrice), "Entry Price");
    }

    #[test]
    fn mapping_rejects_unknown_field() {
        let config = FileConfigAdapter::from_string("[import]\ncolour = Colour\n").unwrap();
        let err = ImportMapping::from_config(&config).unwrap_err();
        assert!(matches!(err, JournalError::ConfigInvalid { key, .. } if key == "colour"));
    }

    #[test]
    fn mapping_rejects_blank_header() {
        let config = FileConfigAdapter::from_string("[import]\nsymbol =\n").unwrap();
        let err = ImportMapping::from_config(&config).unwrap_err();
        assert!(matches!(err, JournalError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CsvImportAdapter::new("/nonexistent/trades.csv", ImportMapping::default())
            .read_trades(&[], &[])
            .unwrap_err();
        assert!(matches!(err, JournalError::Io(_)));
    }

    #[test]
    fn unparseable_number_reports_row() {
        let csv = "Symbol,Position,Entry Price,Quantity,Entry Time\n\
            NIFTY,Long,100,1,2024-07-01\n\
            NIFTY,Long,abc,1,2024-07-01\n";
        let err = parse_trades(csv.as_bytes(), &ImportMapping::default(), &[], &[]).unwrap_err();
        assert!(matches!(err, JournalError::Import { row: 2, .. }));
    }

    #[test]
    fn invariant_violation_reports_row() {
        let csv = "Symbol,Position,Entry Price,Exit Price,Quantity,Entry Time\n\
            NIFTY,Long,100,110,1,2024-07-01\n";
        let err = parse_trades(csv.as_bytes(), &ImportMapping::default(), &[], &[]).unwrap_err();
        match err {
            JournalError::Import { row, reason } => {
                assert_eq!(row, 1);
                assert!(reason.contains("exit time"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_quantity_rejected() {
        let csv = "Symbol,Position,Entry Price,Quantity,Entry Time\nNIFTY,Long,100,0,2024-07-01\n";
        let err = parse_trades(csv.as_bytes(), &ImportMapping::default(), &[], &[]).unwrap_err();
        assert!(matches!(err, JournalError::Import { row: 1, .. }));
    }

    #[test]
    fn missing_side_rejected() {
        let csv = "Symbol,Entry Price,Quantity,Entry Time\nNIFTY,100,1,2024-07-01\n";
        let err = parse_trades(csv.as_bytes(), &ImportMapping::default(), &[], &[]).unwrap_err();
        assert!(matches!(err, JournalError::Import { row: 1, reason } if reason == "missing side"));
    }

    #[test]
    fn read_trades_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trades.csv");
        fs::write(&path, EXPORTED).unwrap();
        let trades = CsvImportAdapter::new(&path, ImportMapping::default())
            .read_trades(&[], &[])
            .unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].edge_id.as_deref(), Some("Opening Range"));
    }

    #[test]
    fn formula_and_compliance_columns() {
        let formulas = vec![
            Formula::new("f-entry", "Retest Entry", FormulaKind::NormalEntry),
            Formula::new("f-sl", "Swing Low", FormulaKind::StopLoss),
            Formula::new("f-t1", "1R", FormulaKind::Target),
        ];
        let csv = "Symbol,Position,Entry Price,Quantity,Entry Time,Entry Formula,\
            Stop Loss Formulas,Target Formulas,Rule Compliance\n\
            NIFTY,Long,100,1,2024-07-01,Retest Entry,Swing Low|atr,1R|f-t2,Entry Missed\n\
            NIFTY,Long,100,1,2024-07-02,,,,not_followed\n";
        let trades =
            parse_trades(csv.as_bytes(), &ImportMapping::default(), &[], &formulas).unwrap();

        assert_eq!(trades[0].entry_formula_id.as_deref(), Some("f-entry"));
        assert_eq!(trades[0].stop_loss_formula_ids, vec!["f-sl", "atr"]);
        assert_eq!(trades[0].target_formula_ids, vec!["f-t1", "f-t2"]);
        assert_eq!(trades[0].rule_compliance, RuleCompliance::EntryMissed);

        assert_eq!(trades[1].entry_formula_id, None);
        assert!(trades[1].stop_loss_formula_ids.is_empty());
        assert_eq!(trades[1].rule_compliance, RuleCompliance::NotFollowed);
    }

    #[test]
    fn unknown_compliance_rejected() {
        let csv = "Symbol,Position,Entry Price,Quantity,Entry Time,Rule Compliance\n\
            NIFTY,Long,100,1,2024-07-01,Mostly\n";
        let err = parse_trades(csv.as_bytes(), &ImportMapping::default(), &[], &[]).unwrap_err();
        assert!(matches!(err, JournalError::Import { row: 1, .. }));
    }

    #[test]
    fn time_formats() {
        assert!(parse_time("2024-07-01 09:30:00").is_some());
        assert!(parse_time("2024-07-01T09:30:00").is_some());
        assert!(parse_time("2024-07-01 09:30").is_some());
        assert!(parse_time("2024-07-01").is_some());
        assert!(parse_time("01/07/2024").is_none());
    }
}
