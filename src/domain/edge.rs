//! Edges: named strategy groupings with optional entry variants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entries: Vec<EdgeEntry>,
}

/// A sub-variant of an edge, pairing it with specific formulas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entry_formula_ids: Vec<String>,
    #[serde(default)]
    pub stop_loss_formula_ids: Vec<String>,
    #[serde(default)]
    pub target_formula_ids: Vec<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Edge {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn entry(&self, index: usize) -> Option<&EdgeEntry> {
        self.entries.get(index)
    }
}

pub fn find_edge<'a>(edges: &'a [Edge], id: &str) -> Option<&'a Edge> {
    edges.iter().find(|e| e.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_lookup_by_index() {
        let mut edge = Edge::new("e1", "Opening Range Break");
        edge.entries.push(EdgeEntry {
            name: "Aggressive".into(),
            entry_formula_ids: vec!["f1".into()],
            ..EdgeEntry::default()
        });
        assert_eq!(edge.entry(0).unwrap().name, "Aggressive");
        assert!(edge.entry(1).is_none());
    }

    #[test]
    fn find_edge_by_id() {
        let edges = vec![Edge::new("a", "A"), Edge::new("b", "B")];
        assert_eq!(find_edge(&edges, "b").unwrap().name, "B");
        assert!(find_edge(&edges, "c").is_none());
    }
}
