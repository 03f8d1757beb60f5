//! Structural export of a diagram: nodes, edges, and rule status.

use std::{fs::File, io::BufWriter, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Result, diagram::Diagram};

/// One exported node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExport {
    /// Node name.
    pub name: String,
    /// Kind label: `"chance"`, `"decision"`, or `"utility"`.
    pub kind: String,
    /// Owning agent for decision and utility nodes.
    pub agent: Option<u32>,
    /// Parent names in edge insertion order.
    pub parents: Vec<String>,
    /// For decision nodes: whether the attached rule is resolved.
    /// `None` for non-decision nodes and decisions without any rule.
    pub rule_resolved: Option<bool>,
}

/// One exported edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeExport {
    /// Parent node name.
    pub parent: String,
    /// Child node name.
    pub child: String,
}

/// Serializable structural snapshot of a diagram.
///
/// Contains everything an external drawing or reporting tool needs: the
/// typed node list, the edge list, and per-decision resolution status.
/// Numeric content (probability tables, utility values) is not part of the
/// structural surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralExport {
    /// Nodes in insertion order.
    pub nodes: Vec<NodeExport>,
    /// Edges in insertion order.
    pub edges: Vec<EdgeExport>,
}

impl StructuralExport {
    /// Snapshot a diagram's structure.
    pub fn from_diagram(diagram: &Diagram) -> Result<Self> {
        let mut nodes = Vec::new();
        for name in diagram.node_names() {
            let kind = diagram.kind_of(name.as_str())?;
            let rule_resolved = diagram
                .decision_rule(name.as_str())?
                .map(|rule| rule.is_resolved());
            nodes.push(NodeExport {
                name: name.to_string(),
                kind: kind.label().to_string(),
                agent: kind.agent().map(|a| a.value()),
                parents: diagram
                    .parents_of(name.as_str())?
                    .into_iter()
                    .map(|p| p.to_string())
                    .collect(),
                rule_resolved,
            });
        }

        let edges = diagram
            .edges()
            .into_iter()
            .map(|(parent, child)| EdgeExport {
                parent: parent.to_string(),
                child: child.to_string(),
            })
            .collect();

        Ok(Self { nodes, edges })
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON export to a file.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Parse an export back from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cpd::UtilityFunction,
        identifiers::AgentId,
    };

    fn fixture() -> Diagram {
        Diagram::builder()
            .uniform_chance("S", [0, 1])
            .decision("D", AgentId::new(0), [0, 1])
            .utility(
                "U",
                AgentId::new(0),
                UtilityFunction::from_fn(["D"], |v| v.value_of("D") as f64),
            )
            .edge("S", "D")
            .edge("D", "U")
            .build()
            .unwrap()
    }

    #[test]
    fn export_captures_kinds_agents_and_rule_status() {
        let export = StructuralExport::from_diagram(&fixture()).unwrap();

        let decision = export.nodes.iter().find(|n| n.name == "D").unwrap();
        assert_eq!(decision.kind, "decision");
        assert_eq!(decision.agent, Some(0));
        assert_eq!(decision.rule_resolved, Some(false));
        assert_eq!(decision.parents, vec!["S".to_string()]);

        let chance = export.nodes.iter().find(|n| n.name == "S").unwrap();
        assert_eq!(chance.kind, "chance");
        assert_eq!(chance.agent, None);
        assert_eq!(chance.rule_resolved, None);

        assert_eq!(export.edges.len(), 2);
    }

    #[test]
    fn json_roundtrip_preserves_the_export() {
        let export = StructuralExport::from_diagram(&fixture()).unwrap();
        let json = export.to_json().unwrap();
        let parsed = StructuralExport::from_json(&json).unwrap();
        assert_eq!(export, parsed);
    }
}
