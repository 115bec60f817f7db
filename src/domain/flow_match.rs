//! Logical condition matcher.
//!
//! # Matching semantics
//!
//! - The selection must have every primary field set, otherwise nothing
//!   matches
//! - Each flow field is either "any" (empty allow-list) or must contain the
//!   selected value
//! - An active freeze is an extra hard constraint: the flow must pin the
//!   frozen edge, and the frozen entry index when one is set
//! - Flows are tried in list order and the first match wins

use crate::domain::condition::ConditionSelection;
use crate::domain::edge::{find_edge, Edge, EdgeEntry};
use crate::domain::flow::{FollowUp, LogicalEdgeFlow};
use crate::domain::formula::{find_formula, Formula};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionField {
    OptionType,
    DayType,
    BreakTime,
    E15Status,
    E5Status,
    CurrentStructure,
    OppositeStructure,
    Relation,
}

impl ConditionField {
    pub const ALL: [ConditionField; 8] = [
        ConditionField::OptionType,
        ConditionField::DayType,
        ConditionField::BreakTime,
        ConditionField::E15Status,
        ConditionField::E5Status,
        ConditionField::CurrentStructure,
        ConditionField::OppositeStructure,
        ConditionField::Relation,
    ];

    pub fn admits(self, flow: &LogicalEdgeFlow, selection: &ConditionSelection) -> bool {
        match self {
            ConditionField::OptionType => flow.option_type.admits(selection.option_type),
            ConditionField::DayType => flow.day_type.admits(selection.day_type),
            ConditionField::BreakTime => flow.break_time.admits(selection.break_time),
            ConditionField::E15Status => flow.e15_status.admits(selection.e15_status),
            ConditionField::E5Status => flow.e5_status.admits(selection.e5_status),
            ConditionField::CurrentStructure => {
                flow.current_structure.admits(selection.current_structure)
            }
            ConditionField::OppositeStructure => {
                flow.opposite_structure.admits(selection.opposite_structure)
            }
            ConditionField::Relation => flow.relation.admits(selection.relation),
        }
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionField::OptionType => "option type",
            ConditionField::DayType => "day type",
            ConditionField::BreakTime => "break time",
            ConditionField::E15Status => "E15 status",
            ConditionField::E5Status => "E5 status",
            ConditionField::CurrentStructure => "current structure",
            ConditionField::OppositeStructure => "opposite structure",
            ConditionField::Relation => "relation",
        };
        f.write_str(name)
    }
}

/// Why a flow was rejected for a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    IncompleteSelection,
    Field(ConditionField),
    FrozenEdge,
    FrozenEntry,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::IncompleteSelection => write!(f, "selection is incomplete"),
            Mismatch::Field(field) => write!(f, "{field} not allowed"),
            Mismatch::FrozenEdge => write!(f, "edge differs from frozen edge"),
            Mismatch::FrozenEntry => write!(f, "entry differs from frozen entry"),
        }
    }
}

/// First reason `flow` fails to match, or `None` when it matches.
pub fn first_mismatch(flow: &LogicalEdgeFlow, selection: &ConditionSelection) -> Option<Mismatch> {
    if !selection.is_complete() {
        return Some(Mismatch::IncompleteSelection);
    }
    if let Some(field) = ConditionField::ALL
        .into_iter()
        .find(|field| !field.admits(flow, selection))
    {
        return Some(Mismatch::Field(field));
    }
    if let Some(freeze) = &selection.freeze {
        if flow.edge_id.as_deref() != Some(freeze.edge_id.as_str()) {
            return Some(Mismatch::FrozenEdge);
        }
        if freeze.entry_index.is_some() && flow.entry_index != freeze.entry_index {
            return Some(Mismatch::FrozenEntry);
        }
    }
    None
}

pub fn flow_matches(flow: &LogicalEdgeFlow, selection: &ConditionSelection) -> bool {
    first_mismatch(flow, selection).is_none()
}

/// The first flow in list order matching `selection`.
pub fn find_matching_flow<'a>(
    selection: &ConditionSelection,
    flows: &'a [LogicalEdgeFlow],
) -> Option<&'a LogicalEdgeFlow> {
    let found = flows.iter().find(|flow| flow_matches(flow, selection));
    tracing::debug!(
        candidates = flows.len(),
        matched = found.map(|f| f.id.as_str()),
        "flow match"
    );
    found
}

/// Every matching flow, in list order.
pub fn matching_flows<'a>(
    selection: &ConditionSelection,
    flows: &'a [LogicalEdgeFlow],
) -> Vec<&'a LogicalEdgeFlow> {
    flows
        .iter()
        .filter(|flow| flow_matches(flow, selection))
        .collect()
}

/// The follow-up of `flow` for `kind`, provided it also matches the
/// current selection.
pub fn matching_follow_up<'a>(
    flow: &'a LogicalEdgeFlow,
    kind: FollowUp,
    selection: &ConditionSelection,
) -> Option<&'a LogicalEdgeFlow> {
    flow.follow_up(kind)
        .filter(|next| flow_matches(next, selection))
}

/// A matched flow resolved against the journal's edges and formulas.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation<'a> {
    pub flow: &'a LogicalEdgeFlow,
    pub edge: Option<&'a Edge>,
    pub entry: Option<&'a EdgeEntry>,
    pub targets: Vec<&'a Formula>,
}

/// Matches `selection` and resolves the winner's pinned edge, entry and
/// targets. Flow targets take precedence over the entry's own targets.
pub fn recommend<'a>(
    selection: &ConditionSelection,
    flows: &'a [LogicalEdgeFlow],
    edges: &'a [Edge],
    formulas: &'a [Formula],
) -> Option<Recommendation<'a>> {
    let flow = find_matching_flow(selection, flows)?;
    let edge = flow.edge_id.as_deref().and_then(|id| find_edge(edges, id));
    let entry = edge.zip(flow.entry_index).and_then(|(e, i)| e.entry(i));

    let target_ids: &[String] = if flow.target_formula_ids.is_empty() {
        entry.map(|e| e.target_formula_ids.as_slice()).unwrap_or(&[])
    } else {
        &flow.target_formula_ids
    };
    let targets = target_ids
        .iter()
        .filter_map(|id| find_formula(formulas, id))
        .collect();

    Some(Recommendation {
        flow,
        edge,
        entry,
        targets,
    })
}
