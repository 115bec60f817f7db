//! Formulas: reusable entry and exit rule definitions referenced by id.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaKind {
    NormalEntry,
    BreakoutEntry,
    StopLoss,
    Target,
}

impl FormulaKind {
    pub fn is_entry(self) -> bool {
        matches!(self, FormulaKind::NormalEntry | FormulaKind::BreakoutEntry)
    }
}

impl fmt::Display for FormulaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaKind::NormalEntry => write!(f, "Normal Entry"),
            FormulaKind::BreakoutEntry => write!(f, "Breakout Entry"),
            FormulaKind::StopLoss => write!(f, "Stop Loss"),
            FormulaKind::Target => write!(f, "Target"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaSubtype {
    #[default]
    Regular,
    StructureChange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideScope {
    Long,
    Short,
    #[default]
    Both,
}

impl SideScope {
    pub fn allows(self, side: crate::domain::trade::PositionSide) -> bool {
        use crate::domain::trade::PositionSide;
        match self {
            SideScope::Both => true,
            SideScope::Long => side == PositionSide::Long,
            SideScope::Short => side == PositionSide::Short,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub id: String,
    pub name: String,
    pub kind: FormulaKind,
    #[serde(default)]
    pub subtype: FormulaSubtype,
    #[serde(default)]
    pub side: SideScope,
    #[serde(default)]
    pub description: String,
}

impl Formula {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FormulaKind) -> Self {
        Formula {
            id: id.into(),
            name: name.into(),
            kind,
            subtype: FormulaSubtype::default(),
            side: SideScope::default(),
            description: String::new(),
        }
    }
}

pub fn find_formula<'a>(formulas: &'a [Formula], id: &str) -> Option<&'a Formula> {
    formulas.iter().find(|f| f.id == id)
}

/// Resolves ids to formula names, keeping the raw id for unknown references.
pub fn formula_names(formulas: &[Formula], ids: &[String]) -> Vec<String> {
    ids.iter()
        .map(|id| {
            find_formula(formulas, id)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| id.clone())
        })
        .collect()
}
