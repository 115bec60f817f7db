//! Cascading (exclude-self) faceted filtering over a trade collection.
//!
//! Each dimension's option counts are computed with every *other* active
//! selection applied, so an option never suppresses itself.

use crate::domain::trade::Trade;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Side,
    Edge,
    EntryFormula,
    StopLossFormula,
    TargetFormula,
    Outcome,
    RuleCompliance,
    Index,
    ExpiryType,
    Weekday,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 10] = [
        FilterDimension::Side,
        FilterDimension::Edge,
        FilterDimension::EntryFormula,
        FilterDimension::StopLossFormula,
        FilterDimension::TargetFormula,
        FilterDimension::Outcome,
        FilterDimension::RuleCompliance,
        FilterDimension::Index,
        FilterDimension::ExpiryType,
        FilterDimension::Weekday,
    ];

    /// The trade's value(s) along this dimension. Multi-valued dimensions
    /// may yield several; an unset attribute yields none.
    pub fn values(self, trade: &Trade) -> BTreeSet<String> {
        match self {
            FilterDimension::Side => BTreeSet::from([trade.side.to_string()]),
            FilterDimension::Edge => trade.edge_id.iter().cloned().collect(),
            FilterDimension::EntryFormula => trade.entry_formula_id.iter().cloned().collect(),
            FilterDimension::StopLossFormula => {
                trade.stop_loss_formula_ids.iter().cloned().collect()
            }
            FilterDimension::TargetFormula => trade.target_formula_ids.iter().cloned().collect(),
            FilterDimension::Outcome => BTreeSet::from([trade.outcome.to_string()]),
            FilterDimension::RuleCompliance => {
                BTreeSet::from([trade.rule_compliance.to_string()])
            }
            FilterDimension::Index => {
                if trade.index.is_empty() {
                    BTreeSet::new()
                } else {
                    BTreeSet::from([trade.index.clone()])
                }
            }
            FilterDimension::ExpiryType => {
                trade.expiry_type.iter().map(|e| e.to_string()).collect()
            }
            FilterDimension::Weekday => BTreeSet::from([trade.entry_weekday().to_string()]),
        }
    }

    pub fn is_multi_valued(self) -> bool {
        matches!(
            self,
            FilterDimension::StopLossFormula | FilterDimension::TargetFormula
        )
    }

    fn name(self) -> &'static str {
        match self {
            FilterDimension::Side => "side",
            FilterDimension::Edge => "edge",
            FilterDimension::EntryFormula => "entry_formula",
            FilterDimension::StopLossFormula => "stop_loss_formula",
            FilterDimension::TargetFormula => "target_formula",
            FilterDimension::Outcome => "outcome",
            FilterDimension::RuleCompliance => "rule_compliance",
            FilterDimension::Index => "index",
            FilterDimension::ExpiryType => "expiry_type",
            FilterDimension::Weekday => "weekday",
        }
    }
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FilterDimension::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| format!("unknown filter dimension: {s}"))
    }
}

/// Active multi-select filters. A dimension with no selected values is
/// inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    selected: BTreeMap<FilterDimension, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dimension: FilterDimension, values: &[&str]) -> Self {
        for value in values {
            self.select(dimension, *value);
        }
        self
    }

    pub fn select(&mut self, dimension: FilterDimension, value: impl Into<String>) {
        self.selected.entry(dimension).or_default().insert(value.into());
    }

    pub fn deselect(&mut self, dimension: FilterDimension, value: &str) {
        if let Some(values) = self.selected.get_mut(&dimension) {
            values.remove(value);
            if values.is_empty() {
                self.selected.remove(&dimension);
            }
        }
    }

    pub fn clear(&mut self, dimension: FilterDimension) {
        self.selected.remove(&dimension);
    }

    pub fn selected(&self, dimension: FilterDimension) -> Option<&BTreeSet<String>> {
        self.selected.get(&dimension).filter(|v| !v.is_empty())
    }

    pub fn is_active(&self, dimension: FilterDimension) -> bool {
        self.selected(dimension).is_some()
    }

    pub fn matches(&self, trade: &Trade) -> bool {
        self.matches_excluding(trade, None)
    }

    /// Applies every active dimension except `excluded`. Single-valued
    /// attributes match by equality, multi-valued ones by non-empty
    /// intersection.
    pub fn matches_excluding(&self, trade: &Trade, excluded: Option<FilterDimension>) -> bool {
        self.selected
            .iter()
            .filter(|(dimension, values)| Some(**dimension) != excluded && !values.is_empty())
            .all(|(dimension, values)| {
                dimension
                    .values(trade)
                    .iter()
                    .any(|v| values.contains(v))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOption {
    pub value: String,
    pub count: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub dimension: FilterDimension,
    /// Options match on any overlap rather than equality.
    pub multi_valued: bool,
    /// Trades left once every other dimension's filter is applied.
    pub matching_trades: usize,
    pub options: Vec<FacetOption>,
}

/// Trades passing every active filter. This is the baseline that date
/// filtering narrows further.
pub fn apply_filters<'a>(trades: &'a [Trade], selection: &FilterSelection) -> Vec<&'a Trade> {
    trades.iter().filter(|t| selection.matches(t)).collect()
}

/// Options for one dimension with this dimension's own selection ignored.
/// Selected values that no longer occur stay listed with a zero count.
pub fn facet(trades: &[Trade], selection: &FilterSelection, dimension: FilterDimension) -> Facet {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut matching_trades = 0usize;

    for trade in trades
        .iter()
        .filter(|t| selection.matches_excluding(t, Some(dimension)))
    {
        matching_trades += 1;
        for value in dimension.values(trade) {
            *counts.entry(value).or_default() += 1;
        }
    }

    if let Some(selected) = selection.selected(dimension) {
        for value in selected {
            counts.entry(value.clone()).or_default();
        }
    }

    let mut options: Vec<FacetOption> = counts
        .into_iter()
        .map(|(value, count)| FacetOption {
            selected: selection
                .selected(dimension)
                .is_some_and(|s| s.contains(&value)),
            value,
            count,
        })
        .collect();
    options.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));

    Facet {
        dimension,
        multi_valued: dimension.is_multi_valued(),
        matching_trades,
        options,
    }
}

pub fn cascading_facets(trades: &[Trade], selection: &FilterSelection) -> Vec<Facet> {
    FilterDimension::ALL
        .into_iter()
        .map(|dimension| facet(trades, selection, dimension))
        .collect()
}

/// Facets over the whole trade set, plus how many trades survive the
/// dimension filters and then the date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetView {
    pub facets: Vec<Facet>,
    pub baseline_trades: usize,
    pub in_range_trades: usize,
}

/// The date range narrows only the baseline; facet counts ignore it.
pub fn facet_view(trades: &[Trade], selection: &FilterSelection, range: &DateRange) -> FacetView {
    let baseline = apply_filters(trades, selection);
    FacetView {
        facets: cascading_facets(trades, selection),
        baseline_trades: baseline.len(),
        in_range_trades: filter_by_date(&baseline, range).len(),
    }
}

/// Inclusive range on the trade's entry date; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, trade: &Trade) -> bool {
        let date = trade.entry_time.date();
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

pub fn filter_by_date<'a>(trades: &[&'a Trade], range: &DateRange) -> Vec<&'a Trade> {
    trades.iter().copied().filter(|t| range.contains(t)).collect()
}
