//! Builder pattern for diagram construction
//!
//! Provides a fluent API for declaring nodes, edges, and attachments in any
//! order; `build` applies nodes first, then edges, then attachments, so
//! attachment-time parent checks see the full structure.

use crate::{
    Result,
    cpd::{DecisionRule, Distribution, UtilityFunction},
    identifiers::{AgentId, NodeName},
};

use super::{Diagram, NodeKind};

enum Attachment {
    None,
    Distribution(Distribution),
    Rule(DecisionRule),
    Utility(UtilityFunction),
}

/// Builder for [`Diagram`] instances.
///
/// # Examples
///
/// ```
/// use macid::diagram::Diagram;
/// use macid::cpd::UtilityFunction;
/// use macid::identifiers::AgentId;
///
/// let diagram = Diagram::builder()
///     .uniform_chance("S", [-1, 1])
///     .decision("D", AgentId::new(0), [-1, 1])
///     .utility("U", AgentId::new(0), UtilityFunction::from_fn(["S", "D"], |v| {
///         (v.value_of("S") * v.value_of("D")) as f64
///     }))
///     .edge("S", "D")
///     .edge("S", "U")
///     .edge("D", "U")
///     .build()
///     .unwrap();
///
/// assert!(diagram.is_valid());
/// ```
#[derive(Default)]
pub struct DiagramBuilder {
    nodes: Vec<(NodeName, NodeKind, Attachment)>,
    edges: Vec<(NodeName, NodeName)>,
}

impl DiagramBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a chance node with an explicit distribution.
    pub fn chance(mut self, name: impl Into<NodeName>, dist: Distribution) -> Self {
        self.nodes.push((
            name.into(),
            NodeKind::Chance,
            Attachment::Distribution(dist),
        ));
        self
    }

    /// Declare a chance node with the uniform default over a domain.
    pub fn uniform_chance<D>(self, name: impl Into<NodeName>, domain: D) -> Self
    where
        D: IntoIterator<Item = i64>,
    {
        self.chance(name, Distribution::uniform(domain))
    }

    /// Declare a decision node with a placeholder rule over an action domain.
    pub fn decision<D>(mut self, name: impl Into<NodeName>, agent: AgentId, actions: D) -> Self
    where
        D: IntoIterator<Item = i64>,
    {
        self.nodes.push((
            name.into(),
            NodeKind::Decision(agent),
            Attachment::Rule(DecisionRule::domain(actions)),
        ));
        self
    }

    /// Declare a decision node with an already-resolved rule.
    pub fn resolved_decision(
        mut self,
        name: impl Into<NodeName>,
        agent: AgentId,
        rule: DecisionRule,
    ) -> Self {
        self.nodes
            .push((name.into(), NodeKind::Decision(agent), Attachment::Rule(rule)));
        self
    }

    /// Declare a utility node with its utility function.
    pub fn utility(
        mut self,
        name: impl Into<NodeName>,
        agent: AgentId,
        utility: UtilityFunction,
    ) -> Self {
        self.nodes.push((
            name.into(),
            NodeKind::Utility(agent),
            Attachment::Utility(utility),
        ));
        self
    }

    /// Declare a node without any attachment.
    pub fn node(mut self, name: impl Into<NodeName>, kind: NodeKind) -> Self {
        self.nodes.push((name.into(), kind, Attachment::None));
        self
    }

    /// Declare a directed edge.
    pub fn edge(mut self, parent: impl Into<NodeName>, child: impl Into<NodeName>) -> Self {
        self.edges.push((parent.into(), child.into()));
        self
    }

    /// Assemble the diagram.
    ///
    /// Applies all node declarations, then all edges, then all attachments;
    /// the first error aborts assembly.
    pub fn build(self) -> Result<Diagram> {
        let mut diagram = Diagram::new();
        for (name, kind, _) in &self.nodes {
            diagram.add_node(name.clone(), *kind)?;
        }
        for (parent, child) in &self.edges {
            diagram.add_edge(parent.as_str(), child.as_str())?;
        }
        for (name, _, attachment) in self.nodes {
            match attachment {
                Attachment::None => {}
                Attachment::Distribution(dist) => {
                    diagram.attach_distribution(name.as_str(), dist)?;
                }
                Attachment::Rule(rule) => {
                    diagram.attach_decision_rule(name.as_str(), rule)?;
                }
                Attachment::Utility(utility) => {
                    diagram.attach_utility(name.as_str(), utility)?;
                }
            }
        }
        Ok(diagram)
    }
}
