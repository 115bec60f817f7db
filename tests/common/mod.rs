#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use tradelog::domain::condition::{
    BreakTime, ConditionSelection, DayType, EmaStatus, OptionType, Structure,
};
use tradelog::domain::edge::{Edge, EdgeEntry};
use tradelog::domain::enrichment::enrich;
use tradelog::domain::formula::{Formula, FormulaKind};
use tradelog::domain::journal::Journal;
use tradelog::domain::trade::{PositionSide, RuleCompliance, Trade};

pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Enriched long trade entered and exited at the given times.
pub fn long_trade(
    id: &str,
    entry: f64,
    exit: f64,
    qty: u32,
    entry_time: NaiveDateTime,
    exit_time: NaiveDateTime,
) -> Trade {
    enrich(
        &Trade::open(id, "NIFTY", PositionSide::Long, entry, qty, entry_time)
            .closed_at(exit, exit_time),
    )
}

pub fn short_trade(
    id: &str,
    entry: f64,
    exit: f64,
    qty: u32,
    entry_time: NaiveDateTime,
    exit_time: NaiveDateTime,
) -> Trade {
    enrich(
        &Trade::open(id, "BANKNIFTY", PositionSide::Short, entry, qty, entry_time)
            .closed_at(exit, exit_time),
    )
}

/// Closed long trade with qty 1 whose P&L is exactly `pnl`, exiting on
/// day `day` of June 2024 at `hour`.
pub fn trade_with_pnl(id: &str, pnl: f64, day: u32, hour: u32) -> Trade {
    long_trade(id, 100.0, 100.0 + pnl, 1, at(2024, 6, day, 9, 15), at(2024, 6, day, hour, 0))
}

pub fn open_trade(id: &str) -> Trade {
    enrich(&Trade::open(
        id,
        "NIFTY",
        PositionSide::Long,
        100.0,
        10,
        at(2024, 6, 1, 9, 15),
    ))
}

pub fn complete_selection() -> ConditionSelection {
    ConditionSelection {
        option_type: Some(OptionType::Call),
        day_type: Some(DayType::Trending),
        break_time: Some(BreakTime::FirstCandle),
        e15_status: Some(EmaStatus::Above),
        e5_status: Some(EmaStatus::Above),
        current_structure: Some(Structure::HigherHigh),
        opposite_structure: Some(Structure::LowerLow),
        relation: None,
        freeze: None,
    }
}

/// A small journal with two edges, a few formulas and mixed trades.
pub fn sample_journal() -> Journal {
    let mut journal = Journal::new();

    let mut orb = Edge::new("orb", "Opening Range Breakout");
    orb.entries.push(EdgeEntry {
        name: "Retest".into(),
        entry_formula_ids: vec!["f-entry".into()],
        stop_loss_formula_ids: vec!["f-sl".into()],
        target_formula_ids: vec!["f-t1".into(), "f-t2".into()],
    });
    journal.edges.push(orb);
    journal.edges.push(Edge::new("gap", "Gap Fill"));

    journal.formulas.push(Formula::new("f-entry", "Retest Entry", FormulaKind::NormalEntry));
    journal.formulas.push(Formula::new("f-sl", "Swing Low", FormulaKind::StopLoss));
    journal.formulas.push(Formula::new("f-t1", "1R", FormulaKind::Target));
    journal.formulas.push(Formula::new("f-t2", "2R", FormulaKind::Target));

    let mut t1 = long_trade("t1", 100.0, 150.0, 10, at(2024, 6, 3, 9, 20), at(2024, 6, 3, 10, 0));
    t1.edge_id = Some("orb".into());
    t1.entry_formula_id = Some("f-entry".into());
    t1.stop_loss_formula_ids = vec!["f-sl".into()];
    t1.target_formula_ids = vec!["f-t1".into()];
    t1.rule_compliance = RuleCompliance::PartiallyFollowed;

    let mut t2 = long_trade("t2", 100.0, 80.0, 10, at(2024, 6, 4, 9, 20), at(2024, 6, 4, 11, 0));
    t2.edge_id = Some("orb".into());
    t2.stop_loss_formula_ids = vec!["f-sl".into()];

    let mut t3 = short_trade("t3", 200.0, 190.0, 5, at(2024, 6, 5, 9, 30), at(2024, 6, 5, 13, 0));
    t3.edge_id = Some("gap".into());
    t3.index = "BANKNIFTY".into();

    for trade in [t1, t2, t3, open_trade("t4")] {
        journal.record_trade(trade).unwrap();
    }
    journal
}
