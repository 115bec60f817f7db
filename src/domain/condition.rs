//! Market-condition vocabulary used by logical edge flows.
//!
//! Every condition field is a closed enum, so adding a value forces every
//! match over it to be revisited.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Trending,
    Rangebound,
    Volatile,
    GapUp,
    GapDown,
}

/// When the opening range was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakTime {
    FirstCandle,
    BeforeTen,
    Morning,
    Afternoon,
    NoBreak,
}

/// Price relative to an EMA on the 15-minute (E15) or 5-minute (E5) chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaStatus {
    Above,
    Below,
    Touching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Structure {
    HigherHigh,
    HigherLow,
    LowerHigh,
    LowerLow,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericRelation {
    GreaterThan,
    LessThan,
    Equal,
}

macro_rules! condition_values {
    ($ty:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

condition_values!(OptionType { Call => "CE", Put => "PE" });
condition_values!(DayType {
    Trending => "Trending",
    Rangebound => "Rangebound",
    Volatile => "Volatile",
    GapUp => "Gap Up",
    GapDown => "Gap Down",
});
condition_values!(BreakTime {
    FirstCandle => "First Candle",
    BeforeTen => "Before 10:00",
    Morning => "Morning",
    Afternoon => "Afternoon",
    NoBreak => "No Break",
});
condition_values!(EmaStatus {
    Above => "Above",
    Below => "Below",
    Touching => "Touching",
});
condition_values!(Structure {
    HigherHigh => "HH",
    HigherLow => "HL",
    LowerHigh => "LH",
    LowerLow => "LL",
    Sideways => "Sideways",
});
condition_values!(NumericRelation {
    GreaterThan => ">",
    LessThan => "<",
    Equal => "=",
});

/// Allow-list over one condition field. Empty means "any value".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConstraint<T>(pub Vec<T>);

impl<T> Default for FieldConstraint<T> {
    fn default() -> Self {
        FieldConstraint(Vec::new())
    }
}

impl<T: PartialEq + Copy> FieldConstraint<T> {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only(values: &[T]) -> Self {
        FieldConstraint(values.to_vec())
    }

    pub fn is_any(&self) -> bool {
        self.0.is_empty()
    }

    /// An unconstrained field admits everything, including an unset value.
    /// A constrained field admits only a selected value in its list.
    pub fn admits(&self, value: Option<T>) -> bool {
        if self.is_any() {
            return true;
        }
        value.is_some_and(|v| self.0.contains(&v))
    }
}

/// Pins matching to one edge and, optionally, one of its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freeze {
    pub edge_id: String,
    #[serde(default)]
    pub entry_index: Option<usize>,
}

/// The user's current market-condition selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSelection {
    #[serde(default)]
    pub option_type: Option<OptionType>,
    #[serde(default)]
    pub day_type: Option<DayType>,
    #[serde(default)]
    pub break_time: Option<BreakTime>,
    #[serde(default)]
    pub e15_status: Option<EmaStatus>,
    #[serde(default)]
    pub e5_status: Option<EmaStatus>,
    #[serde(default)]
    pub current_structure: Option<Structure>,
    #[serde(default)]
    pub opposite_structure: Option<Structure>,
    #[serde(default)]
    pub relation: Option<NumericRelation>,
    #[serde(default)]
    pub freeze: Option<Freeze>,
}

impl ConditionSelection {
    /// All primary fields are chosen; the relation field is optional.
    pub fn is_complete(&self) -> bool {
        self.option_type.is_some()
            && self.day_type.is_some()
            && self.break_time.is_some()
            && self.e15_status.is_some()
            && self.e5_status.is_some()
            && self.current_structure.is_some()
            && self.opposite_structure.is_some()
    }

    /// Names of primary fields still unset, in display order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("option type", self.option_type.is_none()),
            ("day type", self.day_type.is_none()),
            ("break time", self.break_time.is_none()),
            ("E15 status", self.e15_status.is_none()),
            ("E5 status", self.e5_status.is_none()),
            ("current structure", self.current_structure.is_none()),
            ("opposite structure", self.opposite_structure.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}

/// The condition values offered for selection, per field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCatalog {
    pub option_types: Vec<OptionType>,
    pub day_types: Vec<DayType>,
    pub break_times: Vec<BreakTime>,
    pub ema_statuses: Vec<EmaStatus>,
    pub structures: Vec<Structure>,
    pub relations: Vec<NumericRelation>,
}

impl Default for ConditionCatalog {
    fn default() -> Self {
        ConditionCatalog {
            option_types: OptionType::ALL.to_vec(),
            day_types: DayType::ALL.to_vec(),
            break_times: BreakTime::ALL.to_vec(),
            ema_statuses: EmaStatus::ALL.to_vec(),
            structures: Structure::ALL.to_vec(),
            relations: NumericRelation::ALL.to_vec(),
        }
    }
}

impl ConditionCatalog {
    /// Selected values the catalog does not offer.
    pub fn unsupported(&self, selection: &ConditionSelection) -> Vec<String> {
        fn check<T: PartialEq + fmt::Display + Copy>(
            offered: &[T],
            value: Option<T>,
            out: &mut Vec<String>,
        ) {
            if let Some(v) = value {
                if !offered.contains(&v) {
                    out.push(v.to_string());
                }
            }
        }

        let mut out = Vec::new();
        check(&self.option_types, selection.option_type, &mut out);
        check(&self.day_types, selection.day_type, &mut out);
        check(&self.break_times, selection.break_time, &mut out);
        check(&self.ema_statuses, selection.e15_status, &mut out);
        check(&self.ema_statuses, selection.e5_status, &mut out);
        check(&self.structures, selection.current_structure, &mut out);
        check(&self.structures, selection.opposite_structure, &mut out);
        check(&self.relations, selection.relation, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_constraint_admits_everything() {
        let c: FieldConstraint<DayType> = FieldConstraint::any();
        assert!(c.admits(Some(DayType::Volatile)));
        assert!(c.admits(None));
    }

    #[test]
    fn allow_list_admits_members_only() {
        let c = FieldConstraint::only(&[Structure::HigherHigh, Structure::HigherLow]);
        assert!(c.admits(Some(Structure::HigherLow)));
        assert!(!c.admits(Some(Structure::LowerLow)));
        assert!(!c.admits(None));
    }

    #[test]
    fn constraint_serializes_as_plain_array() {
        let c = FieldConstraint::only(&[OptionType::Call]);
        assert_eq!(serde_json::to_string(&c).unwrap(), "[\"call\"]");
        let any: FieldConstraint<OptionType> = serde_json::from_str("[]").unwrap();
        assert!(any.is_any());
    }

    #[test]
    fn completeness_ignores_relation() {
        let mut s = ConditionSelection {
            option_type: Some(OptionType::Put),
            day_type: Some(DayType::Trending),
            break_time: Some(BreakTime::Morning),
            e15_status: Some(EmaStatus::Above),
            e5_status: Some(EmaStatus::Above),
            current_structure: Some(Structure::HigherHigh),
            opposite_structure: Some(Structure::LowerLow),
            ..ConditionSelection::default()
        };
        assert!(s.is_complete());
        assert!(s.missing_fields().is_empty());

        s.e5_status = None;
        assert!(!s.is_complete());
        assert_eq!(s.missing_fields(), vec!["E5 status"]);
    }

    #[test]
    fn labels() {
        assert_eq!(OptionType::Call.to_string(), "CE");
        assert_eq!(Structure::LowerHigh.to_string(), "LH");
        assert_eq!(BreakTime::ALL.len(), 5);
    }

    #[test]
    fn catalog_flags_disabled_values() {
        let catalog = ConditionCatalog {
            day_types: vec![DayType::Trending],
            ..ConditionCatalog::default()
        };
        let selection = ConditionSelection {
            day_type: Some(DayType::GapUp),
            option_type: Some(OptionType::Call),
            ..ConditionSelection::default()
        };
        assert_eq!(catalog.unsupported(&selection), vec!["Gap Up".to_string()]);
    }
}
