//! Logical edge flows: rules mapping a combination of market conditions to a
//! recommended edge, entry and targets.
//!
//! A flow may carry follow-up flows of the same shape for the cases where
//! the recommended trade wins, loses, or the market turns the other way.

use crate::domain::condition::{
    BreakTime, DayType, EmaStatus, FieldConstraint, NumericRelation, OptionType, Structure,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowOutcome {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    Win,
    Loss,
    Opposite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalEdgeFlow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub option_type: FieldConstraint<OptionType>,
    #[serde(default)]
    pub day_type: FieldConstraint<DayType>,
    #[serde(default)]
    pub break_time: FieldConstraint<BreakTime>,
    #[serde(default)]
    pub e15_status: FieldConstraint<EmaStatus>,
    #[serde(default)]
    pub e5_status: FieldConstraint<EmaStatus>,
    #[serde(default)]
    pub current_structure: FieldConstraint<Structure>,
    #[serde(default)]
    pub opposite_structure: FieldConstraint<Structure>,
    #[serde(default)]
    pub relation: FieldConstraint<NumericRelation>,
    #[serde(default)]
    pub edge_id: Option<String>,
    #[serde(default)]
    pub entry_index: Option<usize>,
    #[serde(default)]
    pub outcome: Option<FlowOutcome>,
    #[serde(default)]
    pub target_formula_ids: Vec<String>,
    #[serde(default)]
    pub win_follow_up: Option<Box<LogicalEdgeFlow>>,
    #[serde(default)]
    pub loss_follow_up: Option<Box<LogicalEdgeFlow>>,
    #[serde(default)]
    pub opposite_follow_up: Option<Box<LogicalEdgeFlow>>,
}

impl LogicalEdgeFlow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        LogicalEdgeFlow {
            id: id.into(),
            name: name.into(),
            ..LogicalEdgeFlow::default()
        }
    }

    pub fn pinned_to(mut self, edge_id: impl Into<String>, entry_index: Option<usize>) -> Self {
        self.edge_id = Some(edge_id.into());
        self.entry_index = entry_index;
        self
    }

    pub fn follow_up(&self, kind: FollowUp) -> Option<&LogicalEdgeFlow> {
        match kind {
            FollowUp::Win => self.win_follow_up.as_deref(),
            FollowUp::Loss => self.loss_follow_up.as_deref(),
            FollowUp::Opposite => self.opposite_follow_up.as_deref(),
        }
    }

    /// Number of flows in this tree, the root included.
    pub fn flow_count(&self) -> usize {
        1 + [FollowUp::Win, FollowUp::Loss, FollowUp::Opposite]
            .into_iter()
            .filter_map(|kind| self.follow_up(kind))
            .map(LogicalEdgeFlow::flow_count)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> LogicalEdgeFlow {
        let mut root = LogicalEdgeFlow::new("root", "Trend call").pinned_to("orb", Some(0));
        let mut win = LogicalEdgeFlow::new("win", "Add on strength");
        win.loss_follow_up = Some(Box::new(LogicalEdgeFlow::new("win-loss", "Stand aside")));
        root.win_follow_up = Some(Box::new(win));
        root.opposite_follow_up = Some(Box::new(LogicalEdgeFlow::new("opp", "Flip to put")));
        root
    }

    #[test]
    fn follow_up_lookup() {
        let root = tree();
        assert_eq!(root.follow_up(FollowUp::Win).unwrap().id, "win");
        assert!(root.follow_up(FollowUp::Loss).is_none());
        assert_eq!(root.follow_up(FollowUp::Opposite).unwrap().id, "opp");
    }

    #[test]
    fn flow_count_includes_nested() {
        assert_eq!(tree().flow_count(), 4);
    }

    #[test]
    fn pinned_edge() {
        let root = tree();
        assert_eq!(root.edge_id.as_deref(), Some("orb"));
        assert_eq!(root.entry_index, Some(0));
    }

    #[test]
    fn deserialize_minimal_flow() {
        let flow: LogicalEdgeFlow = serde_json::from_str(
            r#"{"id":"f1","option_type":["put"],"win_follow_up":{"id":"f1w"}}"#,
        )
        .unwrap();
        assert!(flow.day_type.is_any());
        assert!(!flow.option_type.is_any());
        assert_eq!(flow.follow_up(FollowUp::Win).unwrap().id, "f1w");
    }
}
