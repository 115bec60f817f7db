//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::csv_export_adapter::{write_trades, CsvExportAdapter};
use crate::adapters::csv_import_adapter::{CsvImportAdapter, ImportMapping};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_backup_adapter::JsonBackupAdapter;
use crate::domain::charges::ChargeModel;
use crate::domain::condition::{
    BreakTime, ConditionSelection, DayType, EmaStatus, Freeze, NumericRelation, OptionType,
    Structure,
};
use crate::domain::config_validation::{charge_model, log_ansi, validate_config};
use crate::domain::error::JournalError;
use crate::domain::filter::{
    apply_filters, facet_view, filter_by_date, DateRange, FilterDimension, FilterSelection,
};
use crate::domain::flow::FollowUp;
use crate::domain::flow_match::{first_mismatch, matching_flows, matching_follow_up, recommend};
use crate::domain::journal::{AnalyticsReport, Journal};
use crate::domain::metrics::{formula_breakdown, weekday_breakdown};
use crate::domain::time_series::{periodic_performance, pnl_candlesticks, Granularity, Period};
use crate::domain::trade::Trade;
use crate::ports::config_port::ConfigPort;
use crate::ports::export_port::ExportPort;
use crate::ports::journal_port::JournalPort;

pub const DEFAULT_JOURNAL_PATH: &str = "journal.json";

#[derive(Parser, Debug)]
#[command(name = "tradelog", about = "Trading journal analytics")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// JSON journal backup, overriding [journal] path
    #[arg(short, long, global = true)]
    pub journal: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate metrics, streaks and drawdown
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// P&L grouped by day, month or year
    Periodic {
        #[arg(long, value_enum, default_value_t = PeriodArg::Month)]
        period: PeriodArg,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Cumulative P&L candlesticks
    Candles {
        #[arg(long, value_enum, default_value_t = GranularityArg::Day)]
        granularity: GranularityArg,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Longest and current win/loss streaks
    Streaks {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Cascading filter options with live counts
    Facets {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Find the logical edge flow for a set of market conditions
    Match {
        #[command(flatten)]
        conditions: ConditionArgs,
        /// List every matching flow instead of the first
        #[arg(long)]
        all: bool,
        /// Resolve a follow-up of the matched flow
        #[arg(long, value_enum)]
        follow_up: Option<FollowUpArg>,
        #[arg(long)]
        json: bool,
    },
    /// Export trades as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import trades from CSV into the journal
    Import {
        file: PathBuf,
        /// Print the parsed trades without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// List the condition values offered for matching
    Conditions {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Filter as dimension=value, repeatable (e.g. side=Long, edge=orb)
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<(FilterDimension, String)>,
    /// First entry date, inclusive
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Last entry date, inclusive
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn selection(&self) -> FilterSelection {
        let mut selection = FilterSelection::new();
        for (dimension, value) in &self.filters {
            selection.select(*dimension, value.clone());
        }
        selection
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }

    /// Trades passing the dimension filters and then the date range.
    pub fn apply<'a>(&self, trades: &'a [Trade]) -> Vec<&'a Trade> {
        let baseline = apply_filters(trades, &self.selection());
        filter_by_date(&baseline, &self.date_range())
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct ConditionArgs {
    #[arg(long, value_parser = parse_condition::<OptionType>)]
    pub option_type: Option<OptionType>,
    #[arg(long, value_parser = parse_condition::<DayType>)]
    pub day_type: Option<DayType>,
    #[arg(long, value_parser = parse_condition::<BreakTime>)]
    pub break_time: Option<BreakTime>,
    #[arg(long, value_parser = parse_condition::<EmaStatus>)]
    pub e15: Option<EmaStatus>,
    #[arg(long, value_parser = parse_condition::<EmaStatus>)]
    pub e5: Option<EmaStatus>,
    #[arg(long, value_parser = parse_condition::<Structure>)]
    pub current_structure: Option<Structure>,
    #[arg(long, value_parser = parse_condition::<Structure>)]
    pub opposite_structure: Option<Structure>,
    #[arg(long, value_parser = parse_condition::<NumericRelation>)]
    pub relation: Option<NumericRelation>,
    /// Pin matching to this edge id
    #[arg(long)]
    pub freeze_edge: Option<String>,
    /// Pin matching to this entry of the frozen edge
    #[arg(long, requires = "freeze_edge")]
    pub freeze_entry: Option<usize>,
}

impl ConditionArgs {
    pub fn selection(&self) -> ConditionSelection {
        ConditionSelection {
            option_type: self.option_type,
            day_type: self.day_type,
            break_time: self.break_time,
            e15_status: self.e15,
            e5_status: self.e5,
            current_structure: self.current_structure,
            opposite_structure: self.opposite_structure,
            relation: self.relation,
            freeze: self.freeze_edge.clone().map(|edge_id| Freeze {
                edge_id,
                entry_index: self.freeze_entry,
            }),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodArg {
    Day,
    Month,
    Year,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Day => Period::Daily,
            PeriodArg::Month => Period::Monthly,
            PeriodArg::Year => Period::Yearly,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranularityArg {
    Trade,
    Day,
    Week,
    Month,
    Year,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Trade => Granularity::Trade,
            GranularityArg::Day => Granularity::Day,
            GranularityArg::Week => Granularity::Week,
            GranularityArg::Month => Granularity::Month,
            GranularityArg::Year => Granularity::Year,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpArg {
    Win,
    Loss,
    Opposite,
}

impl From<FollowUpArg> for FollowUp {
    fn from(arg: FollowUpArg) -> Self {
        match arg {
            FollowUpArg::Win => FollowUp::Win,
            FollowUpArg::Loss => FollowUp::Loss,
            FollowUpArg::Opposite => FollowUp::Opposite,
        }
    }
}

pub fn parse_filter(s: &str) -> Result<(FilterDimension, String), String> {
    let (dimension, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected dimension=value, got '{s}'"))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("empty value for filter '{}'", dimension.trim()));
    }
    Ok((dimension.parse()?, value.to_string()))
}

/// Parses a condition value by its snake_case name, e.g. `gap_up`.
pub fn parse_condition<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    let name = s.trim().to_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(name))
        .map_err(|_| format!("unknown condition value '{s}'"))
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    init_logging(&config);

    let journal_path = resolve_journal_path(cli.journal.as_deref(), &config);
    let charges = charge_model(&config);
    let backup = JsonBackupAdapter::new(journal_path);

    let result = match cli.command {
        Command::Summary { filter, json } => run_summary(&backup, &charges, &filter, json),
        Command::Periodic {
            period,
            filter,
            json,
        } => run_periodic(&backup, &charges, period.into(), &filter, json),
        Command::Candles {
            granularity,
            filter,
            json,
        } => run_candles(&backup, granularity.into(), &filter, json),
        Command::Streaks { filter, json } => run_streaks(&backup, &charges, &filter, json),
        Command::Facets { filter, json } => run_facets(&backup, &filter, json),
        Command::Match {
            conditions,
            all,
            follow_up,
            json,
        } => run_match(&backup, &conditions, all, follow_up.map(Into::into), json),
        Command::Export { filter, output } => run_export(&backup, &filter, output.as_deref()),
        Command::Import { file, dry_run } => run_import(&backup, &config, &file, dry_run),
        Command::Conditions { json } => run_conditions(&backup, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Reads the INI file, or an empty configuration when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ExitCode> {
    let loaded = match path {
        Some(p) => FileConfigAdapter::from_file(p).map_err(|e| e.to_string()),
        None => FileConfigAdapter::from_string(""),
    };
    loaded.map_err(|reason| {
        let err = JournalError::ConfigParse {
            file: path.map(|p| p.display().to_string()).unwrap_or_default(),
            reason,
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn resolve_journal_path(cli_path: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("journal", "path").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_PATH))
}

/// `RUST_LOG` wins over `[logging] level`. Logs go to stderr so command
/// output on stdout stays machine-readable.
pub fn init_logging(config: &dyn ConfigPort) {
    let level = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let format = config
        .get_string("logging", "format")
        .unwrap_or_else(|| "pretty".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let result = match format.to_lowercase().as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init(),
        _ => fmt()
            .with_env_filter(filter)
            .with_ansi(log_ansi(config))
            .with_writer(io::stderr)
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}

/// Copy of `journal` holding only the filtered trades.
pub fn scoped_journal(journal: &Journal, filter: &FilterArgs) -> Journal {
    let trades = filter.apply(&journal.trades).into_iter().cloned().collect();
    Journal {
        trades,
        ..journal.clone()
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), JournalError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| JournalError::Export {
        reason: format!("failed to serialize output: {}", e),
    })?;
    println!("{text}");
    Ok(())
}

/// Ratio for display; keeps the infinite and undefined sentinels visible.
pub fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn run_summary(
    backup: &JsonBackupAdapter,
    charges: &ChargeModel,
    filter: &FilterArgs,
    json: bool,
) -> Result<(), JournalError> {
    let journal = scoped_journal(&backup.load()?, filter);
    let report = AnalyticsReport::compute(&journal, charges);
    let formulas = formula_breakdown(&journal.trades, &journal.formulas);
    let weekdays = weekday_breakdown(&journal.trades);

    if json {
        return print_json(&serde_json::json!({
            "report": report,
            "formula_breakdown": formulas,
            "weekday_breakdown": weekdays,
        }));
    }

    let s = &report.summary;
    println!("=== Summary ===");
    println!(
        "Trades:           {} ({} W / {} L / {} BE)",
        s.total_trades, s.wins, s.losses, s.breakevens
    );
    println!("Win Rate:         {:.1}%", s.win_rate);
    println!("Gross P&L:        {:.2}", s.gross_pnl);
    println!("Charges:          {:.2}", s.total_charges);
    println!("Net P&L:          {:.2}", s.net_pnl);
    println!("Avg Win / Loss:   {:.2} / {:.2}", s.avg_win, s.avg_loss);
    println!("Risk/Reward:      {}", format_ratio(s.risk_reward));
    println!("Profit Factor:    {}", format_ratio(s.profit_factor));
    println!("Largest Win/Loss: {:.2} / {:.2}", s.largest_win, s.largest_loss);
    println!(
        "Max Drawdown:     {:.2} ({:.1}%)",
        report.drawdown.max_drawdown, report.drawdown.max_drawdown_percent
    );
    print_streaks(&report);

    if !s.edge_breakdown.is_empty() {
        println!("\n=== Edges ===");
        for e in &s.edge_breakdown {
            println!(
                "  {:<24} {:>10.2}  {:>4} trades  {:>5.1}%",
                e.name, e.pnl, e.trade_count, e.win_rate
            );
        }
    }
    if !formulas.is_empty() {
        println!("\n=== Formulas ===");
        for f in &formulas {
            println!(
                "  {:<24} {:>10.2}  {:>4} trades  {:>5.1}%",
                f.name, f.pnl, f.trade_count, f.win_rate
            );
        }
    }
    if !weekdays.is_empty() {
        println!("\n=== Weekdays ===");
        for w in &weekdays {
            println!(
                "  {:<24} {:>10.2}  {:>4} trades  {:>5.1}%",
                w.weekday.to_string(),
                w.pnl,
                w.trade_count,
                w.win_rate
            );
        }
    }
    Ok(())
}

fn print_streaks(report: &AnalyticsReport) {
    let st = &report.streaks;
    println!("Longest Streaks:  {} W / {} L", st.longest_win_streak, st.longest_loss_streak);
    match st.current {
        Some(streak) => println!("Current Streak:   {} x {:?}", streak.length, streak.kind),
        None => println!("Current Streak:   none"),
    }
}

fn run_periodic(
    backup: &JsonBackupAdapter,
    charges: &ChargeModel,
    period: Period,
    filter: &FilterArgs,
    json: bool,
) -> Result<(), JournalError> {
    let journal = scoped_journal(&backup.load()?, filter);
    let rows = periodic_performance(&journal.trades, period, charges);
    if json {
        return print_json(&rows);
    }
    println!(
        "{:<12} {:>6} {:>12} {:>10} {:>12} {:>7} {:>8}",
        "Period", "Trades", "Gross", "Charges", "Net", "Win%", "PF"
    );
    for r in &rows {
        println!(
            "{:<12} {:>6} {:>12.2} {:>10.2} {:>12.2} {:>6.1}% {:>8}",
            r.period,
            r.trade_count,
            r.gross_pnl,
            r.charges,
            r.net_pnl,
            r.win_rate,
            format_ratio(r.profit_factor)
        );
    }
    Ok(())
}

fn run_candles(
    backup: &JsonBackupAdapter,
    granularity: Granularity,
    filter: &FilterArgs,
    json: bool,
) -> Result<(), JournalError> {
    let journal = scoped_journal(&backup.load()?, filter);
    let candles = pnl_candlesticks(&journal.trades, granularity);
    if json {
        return print_json(&candles);
    }
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>6}",
        "Bucket", "Open", "High", "Low", "Close", "Trades"
    );
    for c in &candles {
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>6}",
            c.label, c.open, c.high, c.low, c.close, c.trade_count
        );
    }
    Ok(())
}

fn run_streaks(
    backup: &JsonBackupAdapter,
    charges: &ChargeModel,
    filter: &FilterArgs,
    json: bool,
) -> Result<(), JournalError> {
    let journal = scoped_journal(&backup.load()?, filter);
    let report = AnalyticsReport::compute(&journal, charges);
    if json {
        return print_json(&serde_json::json!({
            "streaks": report.streaks,
            "drawdown": report.drawdown,
        }));
    }
    print_streaks(&report);
    println!(
        "Max Drawdown:     {:.2} (peak {:.2}, trough {:.2})",
        report.drawdown.max_drawdown, report.drawdown.peak, report.drawdown.trough
    );
    Ok(())
}

pub fn run_facets(
    backup: &JsonBackupAdapter,
    filter: &FilterArgs,
    json: bool,
) -> Result<(), JournalError> {
    let journal = backup.load()?;
    let view = facet_view(&journal.trades, &filter.selection(), &filter.date_range());
    if json {
        return print_json(&view);
    }
    println!(
        "Filtered: {} trades, {} in date range",
        view.baseline_trades, view.in_range_trades
    );
    for facet in &view.facets {
        let any = if facet.multi_valued { ", any of" } else { "" };
        println!("{} ({} trades{any})", facet.dimension, facet.matching_trades);
        for option in &facet.options {
            let mark = if option.selected { "*" } else { " " };
            println!("  {mark} {:<28} {:>5}", option.value, option.count);
        }
    }
    Ok(())
}

fn run_match(
    backup: &JsonBackupAdapter,
    conditions: &ConditionArgs,
    all: bool,
    follow_up: Option<FollowUp>,
    json: bool,
) -> Result<(), JournalError> {
    let journal = backup.load()?;
    let selection = conditions.selection();

    let unsupported = journal.catalog.unsupported(&selection);
    if !unsupported.is_empty() {
        tracing::warn!(values = ?unsupported, "selection uses values the catalog does not offer");
    }
    let missing = selection.missing_fields();
    if !missing.is_empty() {
        println!("No match: missing {}", missing.join(", "));
        return Ok(());
    }

    if all {
        let flows = matching_flows(&selection, &journal.flows);
        if json {
            return print_json(&flows);
        }
        for flow in &flows {
            println!("{}  {}", flow.id, flow.name);
        }
        if flows.is_empty() {
            println!("No match");
        }
        return Ok(());
    }

    let Some(rec) = recommend(&selection, &journal.flows, &journal.edges, &journal.formulas) else {
        if json {
            return print_json(&serde_json::Value::Null);
        }
        println!("No match");
        for flow in &journal.flows {
            if let Some(reason) = first_mismatch(flow, &selection) {
                tracing::debug!(flow = %flow.id, %reason, "flow rejected");
            }
        }
        return Ok(());
    };

    let next = follow_up.and_then(|kind| matching_follow_up(rec.flow, kind, &selection));
    if json {
        return print_json(&serde_json::json!({
            "flow": rec.flow.id,
            "name": rec.flow.name,
            "edge": rec.edge.map(|e| &e.id),
            "entry": rec.entry.map(|e| &e.name),
            "targets": rec.targets.iter().map(|f| &f.name).collect::<Vec<_>>(),
            "follow_up": next.map(|f| &f.id),
        }));
    }

    println!("Flow:    {} ({})", rec.flow.name, rec.flow.id);
    if let Some(edge) = rec.edge {
        println!("Edge:    {}", edge.name);
    }
    if let Some(entry) = rec.entry {
        println!("Entry:   {}", entry.name);
    }
    if !rec.targets.is_empty() {
        let names: Vec<&str> = rec.targets.iter().map(|f| f.name.as_str()).collect();
        println!("Targets: {}", names.join(", "));
    }
    if let Some(kind) = follow_up {
        match next {
            Some(flow) => println!("Next ({kind:?}): {} ({})", flow.name, flow.id),
            None => println!("Next ({kind:?}): none"),
        }
    }
    Ok(())
}

fn run_export(
    backup: &JsonBackupAdapter,
    filter: &FilterArgs,
    output: Option<&Path>,
) -> Result<(), JournalError> {
    let journal = backup.load()?;
    let trades = filter.apply(&journal.trades);
    match output {
        Some(path) => CsvExportAdapter::new(path).export(&trades, &journal),
        None => write_trades(io::stdout().lock(), &trades, &journal),
    }
}

fn run_import(
    backup: &JsonBackupAdapter,
    config: &dyn ConfigPort,
    file: &Path,
    dry_run: bool,
) -> Result<(), JournalError> {
    let mut journal = if backup.path().exists() {
        backup.load()?
    } else {
        tracing::info!(path = %backup.path().display(), "starting a new journal");
        Journal::new()
    };
    let mapping = ImportMapping::from_config(config)?;
    let trades =
        CsvImportAdapter::new(file, mapping).read_trades(&journal.edges, &journal.formulas)?;
    let imported = trades.len();

    if dry_run {
        return print_json(&trades);
    }
    for trade in trades {
        journal.record_trade(trade)?;
    }
    backup.save(&journal)?;
    eprintln!("Imported {} trades into {}", imported, backup.path().display());
    Ok(())
}

fn run_conditions(backup: &JsonBackupAdapter, json: bool) -> Result<(), JournalError> {
    let journal = if backup.path().exists() {
        backup.load()?
    } else {
        Journal::new()
    };
    let flow_count: usize = journal.flows.iter().map(|f| f.flow_count()).sum();
    if json {
        return print_json(&serde_json::json!({
            "catalog": journal.catalog,
            "flow_count": flow_count,
        }));
    }
    let catalog = &journal.catalog;
    fn line<T: std::fmt::Display>(name: &str, values: &[T]) {
        let labels: Vec<String> = values.iter().map(ToString::to_string).collect();
        println!("{:<12} {}", name, labels.join(", "));
    }
    line("Option", &catalog.option_types);
    line("Day", &catalog.day_types);
    line("Break", &catalog.break_times);
    line("EMA", &catalog.ema_statuses);
    line("Structure", &catalog.structures);
    line("Relation", &catalog.relations);
    println!("{:<12} {}", "Flows", flow_count);
    Ok(())
}
