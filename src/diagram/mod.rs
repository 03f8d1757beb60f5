//! Typed directed acyclic graph for causal influence diagrams.
//!
//! A [`Diagram`] holds chance, decision, and utility nodes in an arena with
//! bidirectional adjacency lists, enforces acyclicity on every structural
//! mutation, and carries the attached conditional distributions, decision
//! rules, and utility functions.
//!
//! Structural mutations after rules have been resolved demote every resolved
//! decision rule back to its domain placeholder, so a stale solved profile
//! can never be read off a structurally edited diagram.

mod builder;
mod sampling;

pub use builder::DiagramBuilder;
pub use sampling::SampleDraw;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    cpd::{DecisionRule, Distribution, UtilityFunction},
    identifiers::{AgentId, NodeName},
    types::{Outcome, ParentValues},
};

/// The kind of a diagram node.
///
/// Decision and utility nodes belong to exactly one agent; chance nodes are
/// unowned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Random variable governed by a conditional distribution.
    Chance,
    /// Variable chosen by the owning agent.
    Decision(AgentId),
    /// Real-valued payoff of the owning agent; always a sink.
    Utility(AgentId),
}

impl NodeKind {
    /// The owning agent, if the kind has one.
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            Self::Chance => None,
            Self::Decision(agent) | Self::Utility(agent) => Some(*agent),
        }
    }

    /// Short human-readable kind label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chance => "chance",
            Self::Decision(_) => "decision",
            Self::Utility(_) => "utility",
        }
    }
}

/// Content attached to a node, matching its kind.
#[derive(Debug, Clone)]
pub(crate) enum NodeContent {
    Chance(Option<Distribution>),
    Decision(Option<DecisionRule>),
    Utility(Option<UtilityFunction>),
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) name: NodeName,
    pub(crate) kind: NodeKind,
    pub(crate) parents: Vec<usize>,
    pub(crate) children: Vec<usize>,
    pub(crate) content: NodeContent,
}

/// A causal influence diagram (CID) or multi-agent CID (MACID).
///
/// Nodes live in an arena addressed by stable indices; the public API is
/// name-based. The same type covers the single-agent and multi-agent cases;
/// single-agent preconditions are checked by the operations that need them.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    nodes: Vec<Option<NodeData>>,
    index: HashMap<NodeName, usize>,
    version: u64,
}

impl Diagram {
    /// Create an empty diagram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a diagram fluently.
    pub fn builder() -> DiagramBuilder {
        DiagramBuilder::new()
    }

    /// Add a node of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateNode`] if the name is already taken.
    pub fn add_node(&mut self, name: impl Into<NodeName>, kind: NodeKind) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(name.as_str()) {
            return Err(Error::DuplicateNode { name });
        }
        let content = match kind {
            NodeKind::Chance => NodeContent::Chance(None),
            NodeKind::Decision(_) => NodeContent::Decision(None),
            NodeKind::Utility(_) => NodeContent::Utility(None),
        };
        let idx = self.nodes.len();
        self.index.insert(name.clone(), idx);
        self.nodes.push(Some(NodeData {
            name,
            kind,
            parents: Vec::new(),
            children: Vec::new(),
            content,
        }));
        self.version += 1;
        Ok(())
    }

    /// Add a chance node.
    pub fn add_chance(&mut self, name: impl Into<NodeName>) -> Result<()> {
        self.add_node(name, NodeKind::Chance)
    }

    /// Add a decision node owned by `agent`.
    pub fn add_decision(&mut self, name: impl Into<NodeName>, agent: AgentId) -> Result<()> {
        self.add_node(name, NodeKind::Decision(agent))
    }

    /// Add a utility node owned by `agent`.
    pub fn add_utility(&mut self, name: impl Into<NodeName>, agent: AgentId) -> Result<()> {
        self.add_node(name, NodeKind::Utility(agent))
    }

    /// Add a directed edge from `parent` to `child`.
    ///
    /// The call is atomic: on any error the diagram is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownNode`] if either endpoint is absent.
    /// - [`Error::UtilityHasChildren`] if `parent` is a utility node.
    /// - [`Error::Cycle`] if the edge would close a directed cycle.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let parent_idx = self.require(parent)?;
        let child_idx = self.require(child)?;

        let parent_data = self.data(parent_idx);
        if matches!(parent_data.kind, NodeKind::Utility(_)) {
            return Err(Error::UtilityHasChildren {
                utility: parent_data.name.clone(),
                child: self.data(child_idx).name.clone(),
            });
        }
        if parent_idx == child_idx || self.reaches(child_idx, parent_idx) {
            return Err(Error::Cycle {
                parent: self.data(parent_idx).name.clone(),
                child: self.data(child_idx).name.clone(),
            });
        }
        if self.data(child_idx).parents.contains(&parent_idx) {
            return Ok(()); // edge already present
        }

        self.data_mut(child_idx).parents.push(parent_idx);
        self.data_mut(parent_idx).children.push(child_idx);
        self.version += 1;
        self.invalidate_solved_profile();
        Ok(())
    }

    /// Remove a node and every edge incident to it.
    pub fn remove_node(&mut self, name: &str) -> Result<()> {
        let idx = self.require(name)?;
        let data = self.nodes[idx].take().expect("index maps to live node");
        self.index.remove(data.name.as_str());

        for &parent in &data.parents {
            self.data_mut(parent).children.retain(|&c| c != idx);
        }
        for &child in &data.children {
            self.data_mut(child).parents.retain(|&p| p != idx);
        }
        self.version += 1;
        self.invalidate_solved_profile();
        Ok(())
    }

    /// Parent names of a node, in edge insertion order.
    pub fn parents_of(&self, name: &str) -> Result<Vec<NodeName>> {
        let idx = self.require(name)?;
        Ok(self
            .data(idx)
            .parents
            .iter()
            .map(|&p| self.data(p).name.clone())
            .collect())
    }

    /// Child names of a node, in edge insertion order.
    pub fn children_of(&self, name: &str) -> Result<Vec<NodeName>> {
        let idx = self.require(name)?;
        Ok(self
            .data(idx)
            .children
            .iter()
            .map(|&c| self.data(c).name.clone())
            .collect())
    }

    /// Whether the edge `parent -> child` is present.
    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        match (self.idx(parent), self.idx(child)) {
            (Some(p), Some(c)) => self.data(c).parents.contains(&p),
            _ => false,
        }
    }

    /// Whether the node exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The kind of a node.
    pub fn kind_of(&self, name: &str) -> Result<NodeKind> {
        Ok(self.data(self.require(name)?).kind)
    }

    /// All node names in insertion order.
    pub fn node_names(&self) -> Vec<NodeName> {
        self.live().map(|d| d.name.clone()).collect()
    }

    /// All edges as (parent, child) name pairs, in insertion order.
    pub fn edges(&self) -> Vec<(NodeName, NodeName)> {
        let mut edges = Vec::new();
        for data in self.live() {
            for &child in &data.children {
                edges.push((data.name.clone(), self.data(child).name.clone()));
            }
        }
        edges
    }

    /// Names of all chance nodes, in insertion order.
    pub fn chance_nodes(&self) -> Vec<NodeName> {
        self.of_kind(|k| matches!(k, NodeKind::Chance))
    }

    /// Names of all decision nodes, in insertion order.
    pub fn decisions(&self) -> Vec<NodeName> {
        self.of_kind(|k| matches!(k, NodeKind::Decision(_)))
    }

    /// Names of all utility nodes, in insertion order.
    pub fn utilities(&self) -> Vec<NodeName> {
        self.of_kind(|k| matches!(k, NodeKind::Utility(_)))
    }

    /// Decision nodes owned by `agent`, in insertion order.
    pub fn decisions_of(&self, agent: AgentId) -> Vec<NodeName> {
        self.of_kind(|k| matches!(k, NodeKind::Decision(a) if *a == agent))
    }

    /// Utility nodes owned by `agent`, in insertion order.
    pub fn utilities_of(&self, agent: AgentId) -> Vec<NodeName> {
        self.of_kind(|k| matches!(k, NodeKind::Utility(a) if *a == agent))
    }

    /// All agents owning at least one decision or utility node, ascending.
    pub fn agents(&self) -> Vec<AgentId> {
        let set: BTreeSet<AgentId> = self.live().filter_map(|d| d.kind.agent()).collect();
        set.into_iter().collect()
    }

    /// Deterministic topological order over all nodes.
    ///
    /// Stable for a fixed insertion order: among nodes whose parents are all
    /// emitted, the earliest-inserted node comes first. Acyclicity is an
    /// invariant of construction, so every live node appears.
    pub fn topological_order(&self) -> Vec<NodeName> {
        let mut in_degree: HashMap<usize, usize> = HashMap::new();
        for (idx, slot) in self.nodes.iter().enumerate() {
            if let Some(data) = slot {
                in_degree.insert(idx, data.parents.len());
            }
        }

        let mut order = Vec::with_capacity(in_degree.len());
        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&idx, _)| idx)
            .collect();

        while let Some(&idx) = ready.iter().next() {
            ready.remove(&idx);
            order.push(self.data(idx).name.clone());
            for &child in &self.data(idx).children {
                let deg = in_degree.get_mut(&child).expect("child is live");
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(child);
                }
            }
        }

        debug_assert_eq!(order.len(), self.index.len(), "DAG invariant violated");
        order
    }

    /// All ancestors of a node (excluding the node itself).
    pub fn ancestors(&self, name: &str) -> Result<BTreeSet<NodeName>> {
        let idx = self.require(name)?;
        let mut seen = BTreeSet::new();
        let mut stack: Vec<usize> = self.data(idx).parents.clone();
        while let Some(current) = stack.pop() {
            if seen.insert(self.data(current).name.clone()) {
                stack.extend(self.data(current).parents.iter().copied());
            }
        }
        Ok(seen)
    }

    /// All descendants of a node (excluding the node itself).
    pub fn descendants(&self, name: &str) -> Result<BTreeSet<NodeName>> {
        let idx = self.require(name)?;
        let mut seen = BTreeSet::new();
        let mut stack: Vec<usize> = self.data(idx).children.clone();
        while let Some(current) = stack.pop() {
            if seen.insert(self.data(current).name.clone()) {
                stack.extend(self.data(current).children.iter().copied());
            }
        }
        Ok(seen)
    }

    /// Attach a conditional distribution to a chance node.
    ///
    /// The distribution's declared parent set must equal the node's parents
    /// in the diagram (`Uniform` declares none and is accepted on any chance
    /// node). Tabular rows are checked for valid probability rows here; row
    /// completeness is checked by [`Diagram::validate`] once all domains are
    /// known.
    pub fn attach_distribution(&mut self, name: &str, dist: Distribution) -> Result<()> {
        let idx = self.require(name)?;
        let node_name = self.data(idx).name.clone();
        match self.data(idx).kind {
            NodeKind::Chance => {}
            kind => {
                return Err(Error::WrongAttachment {
                    node: node_name,
                    kind: kind.label(),
                    attachment: "a chance distribution",
                });
            }
        }

        if !matches!(dist, Distribution::Uniform { .. }) {
            self.check_parent_set(idx, dist.declared_parents())?;
        }
        if let Distribution::Table(table) = &dist {
            for (key, row) in table.rows() {
                if key.len() != table.parents().len() {
                    return Err(Error::InvalidDistribution {
                        node: node_name,
                        reason: format!(
                            "row key has {} values but {} parents are declared",
                            key.len(),
                            table.parents().len()
                        ),
                    });
                }
                check_probability_row(&node_name, row, table.domain().len())?;
            }
        }
        if dist.domain().is_empty() {
            return Err(Error::InvalidDistribution {
                node: node_name,
                reason: "domain is empty".to_string(),
            });
        }

        match &mut self.data_mut(idx).content {
            NodeContent::Chance(slot) => *slot = Some(dist),
            _ => unreachable!("kind checked above"),
        }
        Ok(())
    }

    /// Attach a decision rule (placeholder or resolved) to a decision node.
    pub fn attach_decision_rule(&mut self, name: &str, rule: DecisionRule) -> Result<()> {
        let idx = self.require(name)?;
        let node_name = self.data(idx).name.clone();
        if !matches!(self.data(idx).kind, NodeKind::Decision(_)) {
            return Err(Error::WrongAttachment {
                node: node_name,
                kind: self.data(idx).kind.label(),
                attachment: "a decision rule",
            });
        }
        if rule.actions().is_empty() {
            return Err(Error::InvalidDistribution {
                node: node_name,
                reason: "action domain is empty".to_string(),
            });
        }
        if let DecisionRule::Resolved(table) = &rule {
            self.check_parent_set(idx, table.parents())?;
            for (key, row) in table.rows() {
                if key.len() != table.parents().len() {
                    return Err(Error::InvalidDistribution {
                        node: node_name,
                        reason: format!(
                            "rule row key has {} values but {} parents are declared",
                            key.len(),
                            table.parents().len()
                        ),
                    });
                }
                check_probability_row(&node_name, row, table.actions().len())?;
            }
        }

        match &mut self.data_mut(idx).content {
            NodeContent::Decision(slot) => *slot = Some(rule),
            _ => unreachable!("kind checked above"),
        }
        Ok(())
    }

    /// Declare a decision node's action domain (placeholder rule).
    pub fn set_decision_domain<D>(&mut self, name: &str, actions: D) -> Result<()>
    where
        D: IntoIterator<Item = i64>,
    {
        self.attach_decision_rule(name, DecisionRule::domain(actions))
    }

    /// Attach a utility function to a utility node.
    pub fn attach_utility(&mut self, name: &str, utility: UtilityFunction) -> Result<()> {
        let idx = self.require(name)?;
        let node_name = self.data(idx).name.clone();
        if !matches!(self.data(idx).kind, NodeKind::Utility(_)) {
            return Err(Error::WrongAttachment {
                node: node_name,
                kind: self.data(idx).kind.label(),
                attachment: "a utility function",
            });
        }
        self.check_parent_set(idx, utility.parents())?;

        match &mut self.data_mut(idx).content {
            NodeContent::Utility(slot) => *slot = Some(utility),
            _ => unreachable!("kind checked above"),
        }
        Ok(())
    }

    /// The attached distribution of a chance node, if any.
    pub fn distribution(&self, name: &str) -> Result<Option<&Distribution>> {
        let idx = self.require(name)?;
        match &self.data(idx).content {
            NodeContent::Chance(slot) => Ok(slot.as_ref()),
            _ => Ok(None),
        }
    }

    /// The attached rule of a decision node, if any.
    pub fn decision_rule(&self, name: &str) -> Result<Option<&DecisionRule>> {
        let idx = self.require(name)?;
        match &self.data(idx).content {
            NodeContent::Decision(slot) => Ok(slot.as_ref()),
            _ => Ok(None),
        }
    }

    /// The attached utility function of a utility node, if any.
    pub fn utility_function(&self, name: &str) -> Result<Option<&UtilityFunction>> {
        let idx = self.require(name)?;
        match &self.data(idx).content {
            NodeContent::Utility(slot) => Ok(slot.as_ref()),
            _ => Ok(None),
        }
    }

    /// The discrete domain of a chance or decision node.
    ///
    /// # Errors
    ///
    /// [`Error::IncompleteDiagram`] if the node has no attached
    /// distribution/rule; [`Error::WrongAttachment`] for utility nodes, which
    /// have no discrete domain.
    pub fn domain_of(&self, name: &str) -> Result<Vec<Outcome>> {
        let idx = self.require(name)?;
        match &self.data(idx).content {
            NodeContent::Chance(Some(dist)) => Ok(dist.domain().to_vec()),
            NodeContent::Decision(Some(rule)) => Ok(rule.actions().to_vec()),
            NodeContent::Chance(None) | NodeContent::Decision(None) => {
                Err(Error::IncompleteDiagram {
                    reason: format!("node '{}' has no attached distribution or rule", name),
                })
            }
            NodeContent::Utility(_) => Err(Error::WrongAttachment {
                node: self.data(idx).name.clone(),
                kind: "utility",
                attachment: "a discrete domain query",
            }),
        }
    }

    /// The probability row of a chance node for given parent values.
    ///
    /// Functional distributions produce a degenerate row; uniform
    /// distributions a constant row. Returns pairs in domain order.
    pub(crate) fn chance_row(
        &self,
        name: &str,
        values: &BTreeMap<NodeName, Outcome>,
    ) -> Result<Vec<(Outcome, f64)>> {
        let idx = self.require(name)?;
        let dist = match &self.data(idx).content {
            NodeContent::Chance(Some(dist)) => dist,
            _ => {
                return Err(Error::IncompleteDiagram {
                    reason: format!("chance node '{}' has no attached distribution", name),
                });
            }
        };

        match dist {
            Distribution::Table(table) => {
                let key = assignment_key(table.parents(), values);
                let row = table.row(&key).ok_or_else(|| Error::DomainMismatch {
                    node: self.data(idx).name.clone(),
                    reason: format!("no probability row for parent assignment {key:?}"),
                })?;
                Ok(table.domain().iter().copied().zip(row.iter().copied()).collect())
            }
            Distribution::Function(func) => {
                let key = assignment_key(func.parents(), values);
                let view = ParentValues::new(func.parents(), &key);
                let outcome = func.evaluate(&view);
                if !func.domain().contains(&outcome) {
                    return Err(Error::DomainMismatch {
                        node: self.data(idx).name.clone(),
                        reason: format!("function produced {outcome} outside the declared domain"),
                    });
                }
                Ok(func
                    .domain()
                    .iter()
                    .map(|&o| (o, if o == outcome { 1.0 } else { 0.0 }))
                    .collect())
            }
            Distribution::Uniform { domain } => {
                let p = 1.0 / domain.len() as f64;
                Ok(domain.iter().map(|&o| (o, p)).collect())
            }
        }
    }

    /// Check whether every attachment is present and structurally consistent.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validate the diagram, reporting the first inconsistency found.
    ///
    /// A valid diagram has: a distribution on every chance node whose parent
    /// set equals the node's parents and whose rows cover every parent
    /// assignment; a rule (possibly unresolved) on every decision node, with
    /// complete rows when resolved; and a utility function on every utility
    /// node with a matching parent set.
    pub fn validate(&self) -> Result<()> {
        for data in self.live() {
            let name = data.name.as_str();
            match &data.content {
                NodeContent::Chance(None) => {
                    return Err(Error::IncompleteDiagram {
                        reason: format!("chance node '{name}' has no distribution"),
                    });
                }
                NodeContent::Chance(Some(Distribution::Table(table))) => {
                    self.check_row_completeness(name, table.parents(), |key| {
                        table.row(key).is_some()
                    })?;
                }
                NodeContent::Chance(Some(_)) => {}
                NodeContent::Decision(None) => {
                    return Err(Error::IncompleteDiagram {
                        reason: format!("decision node '{name}' has no rule"),
                    });
                }
                NodeContent::Decision(Some(DecisionRule::Resolved(rule))) => {
                    self.check_row_completeness(name, rule.parents(), |key| {
                        rule.row(key).is_some()
                    })?;
                }
                NodeContent::Decision(Some(DecisionRule::Domain(_))) => {}
                NodeContent::Utility(None) => {
                    return Err(Error::IncompleteDiagram {
                        reason: format!("utility node '{name}' has no utility function"),
                    });
                }
                NodeContent::Utility(Some(_)) => {}
            }
        }
        Ok(())
    }

    /// Whether every agent has sufficient recall.
    ///
    /// An agent has sufficient recall when each of its decisions observes all
    /// of the agent's earlier decisions and everything those earlier
    /// decisions observed: for decisions `d_i` before `d_j` (topological
    /// order), `{d_i} ∪ parents(d_i) ⊆ parents(d_j)`.
    pub fn sufficient_recall(&self) -> bool {
        let topo = self.topological_order();
        for agent in self.agents() {
            let decisions: Vec<&NodeName> = topo
                .iter()
                .filter(|n| {
                    matches!(
                        self.kind_of(n.as_str()),
                        Ok(NodeKind::Decision(a)) if a == agent
                    )
                })
                .collect();
            for window in decisions.windows(2) {
                let earlier = window[0].as_str();
                let later = window[1].as_str();
                let later_parents: BTreeSet<NodeName> = self
                    .parents_of(later)
                    .expect("decision exists")
                    .into_iter()
                    .collect();
                if !later_parents.contains(earlier) {
                    return false;
                }
                for parent in self.parents_of(earlier).expect("decision exists") {
                    if !later_parents.contains(&parent) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether every decision node holds a resolved rule.
    pub fn fully_resolved(&self) -> bool {
        self.decisions().iter().all(|d| {
            matches!(
                self.decision_rule(d.as_str()),
                Ok(Some(rule)) if rule.is_resolved()
            )
        })
    }

    /// Monotone counter bumped on every structural mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    // ---- internal helpers ----

    pub(crate) fn idx(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn require(&self, name: &str) -> Result<usize> {
        self.idx(name).ok_or_else(|| Error::UnknownNode {
            name: NodeName::new(name),
        })
    }

    pub(crate) fn data(&self, idx: usize) -> &NodeData {
        self.nodes[idx].as_ref().expect("index maps to live node")
    }

    fn data_mut(&mut self, idx: usize) -> &mut NodeData {
        self.nodes[idx].as_mut().expect("index maps to live node")
    }

    fn live(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    fn of_kind(&self, matches: impl Fn(&NodeKind) -> bool) -> Vec<NodeName> {
        self.live()
            .filter(|d| matches(&d.kind))
            .map(|d| d.name.clone())
            .collect()
    }

    /// Whether `to` is reachable from `from` along directed edges.
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen[current] {
                continue;
            }
            seen[current] = true;
            stack.extend(self.data(current).children.iter().copied());
        }
        false
    }

    fn check_parent_set(&self, idx: usize, declared: &[NodeName]) -> Result<()> {
        let actual: BTreeSet<&str> = self
            .data(idx)
            .parents
            .iter()
            .map(|&p| self.data(p).name.as_str())
            .collect();
        let declared_set: BTreeSet<&str> = declared.iter().map(NodeName::as_str).collect();
        if actual != declared_set || declared.len() != declared_set.len() {
            return Err(Error::DomainMismatch {
                node: self.data(idx).name.clone(),
                reason: format!(
                    "declared parents {declared_set:?} do not match diagram parents {actual:?}"
                ),
            });
        }
        Ok(())
    }

    fn check_row_completeness(
        &self,
        name: &str,
        parents: &[NodeName],
        has_row: impl Fn(&[Outcome]) -> bool,
    ) -> Result<()> {
        let mut parent_domains = Vec::with_capacity(parents.len());
        for parent in parents {
            parent_domains.push(self.domain_of(parent.as_str())?);
        }
        for key in crate::utils::cartesian_product(&parent_domains) {
            if !has_row(&key) {
                return Err(Error::DomainMismatch {
                    node: NodeName::new(name),
                    reason: format!("missing row for parent assignment {key:?}"),
                });
            }
        }
        Ok(())
    }

    /// Demote every resolved decision rule to its domain placeholder.
    fn invalidate_solved_profile(&mut self) {
        for slot in self.nodes.iter_mut().flatten() {
            if let NodeContent::Decision(Some(rule)) = &mut slot.content {
                rule.unresolve();
            }
        }
    }
}

/// Build a row-lookup key in `parents` order from a name-to-value map.
pub(crate) fn assignment_key(
    parents: &[NodeName],
    values: &BTreeMap<NodeName, Outcome>,
) -> Vec<Outcome> {
    parents
        .iter()
        .map(|p| values.get(p).copied().unwrap_or(Outcome::new(0)))
        .collect()
}

/// Validate a probability row: correct width, finite, non-negative, sums to 1.
fn check_probability_row(node: &NodeName, row: &[f64], width: usize) -> Result<()> {
    if row.len() != width {
        return Err(Error::InvalidDistribution {
            node: node.clone(),
            reason: format!("row has {} entries but the domain has {width}", row.len()),
        });
    }
    if row.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(Error::InvalidDistribution {
            node: node.clone(),
            reason: "row contains a negative or non-finite probability".to_string(),
        });
    }
    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > 1e-9 {
        return Err(Error::InvalidDistribution {
            node: node.clone(),
            reason: format!("row sums to {sum}, expected 1"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpd::TabularRule;

    fn two_agent_diagram() -> Diagram {
        let mut diagram = Diagram::new();
        diagram.add_chance("S").unwrap();
        diagram.add_decision("D1", AgentId::new(0)).unwrap();
        diagram.add_decision("D2", AgentId::new(1)).unwrap();
        diagram.add_utility("U1", AgentId::new(0)).unwrap();
        diagram.add_edge("S", "D1").unwrap();
        diagram.add_edge("D1", "D2").unwrap();
        diagram.add_edge("D2", "U1").unwrap();
        diagram
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut diagram = Diagram::new();
        diagram.add_chance("X").unwrap();
        assert!(matches!(
            diagram.add_chance("X"),
            Err(Error::DuplicateNode { .. })
        ));
    }

    #[test]
    fn cycle_is_rejected_and_graph_unchanged() {
        let mut diagram = two_agent_diagram();
        let edges_before = diagram.edges();
        let version_before = diagram.version();

        let err = diagram.add_edge("U1", "S").unwrap_err();
        assert!(matches!(err, Error::UtilityHasChildren { .. }));

        let err = diagram.add_edge("D2", "S").unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }));

        assert_eq!(diagram.edges(), edges_before);
        assert_eq!(diagram.version(), version_before);
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let mut diagram = Diagram::new();
        diagram.add_chance("X").unwrap();
        assert!(matches!(
            diagram.add_edge("X", "X"),
            Err(Error::Cycle { .. })
        ));
    }

    #[test]
    fn topological_order_is_stable_and_consistent() {
        let diagram = two_agent_diagram();
        let order = diagram.topological_order();
        assert_eq!(order, diagram.topological_order());

        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        for (parent, child) in diagram.edges() {
            assert!(pos(parent.as_str()) < pos(child.as_str()));
        }
    }

    #[test]
    fn ancestors_and_descendants() {
        let diagram = two_agent_diagram();
        let ancestors = diagram.ancestors("U1").unwrap();
        assert!(ancestors.contains("S"));
        assert!(ancestors.contains("D1"));
        assert!(ancestors.contains("D2"));

        let descendants = diagram.descendants("S").unwrap();
        assert!(descendants.contains("U1"));
        assert!(!descendants.contains("S"));
    }

    #[test]
    fn structural_edit_unresolves_decision_rules() {
        let mut diagram = Diagram::new();
        diagram.add_decision("D", AgentId::new(0)).unwrap();
        diagram.add_utility("U", AgentId::new(0)).unwrap();
        diagram.add_edge("D", "U").unwrap();

        let rule = TabularRule::new(Vec::<NodeName>::new(), [0, 1]).with_row(&[], vec![1.0, 0.0]);
        diagram
            .attach_decision_rule("D", DecisionRule::Resolved(rule))
            .unwrap();
        assert!(diagram.fully_resolved());

        diagram.add_chance("S").unwrap();
        diagram.add_edge("S", "U").unwrap();
        assert!(!diagram.fully_resolved(), "structural edit must invalidate");
    }

    #[test]
    fn sufficient_recall_detects_forgetting() {
        let mut diagram = Diagram::new();
        diagram.add_chance("S").unwrap();
        diagram.add_decision("D1", AgentId::new(0)).unwrap();
        diagram.add_decision("D2", AgentId::new(0)).unwrap();
        diagram.add_utility("U", AgentId::new(0)).unwrap();
        diagram.add_edge("S", "D1").unwrap();
        diagram.add_edge("D1", "D2").unwrap();
        diagram.add_edge("D2", "U").unwrap();
        // D2 observes D1 but not S, which D1 observed
        assert!(!diagram.sufficient_recall());

        diagram.add_edge("S", "D2").unwrap();
        assert!(diagram.sufficient_recall());
    }

    #[test]
    fn attach_rejects_mismatched_parent_set() {
        let mut diagram = two_agent_diagram();
        let err = diagram
            .attach_utility(
                "U1",
                UtilityFunction::from_fn(["S"], |v| v.value_of("S") as f64),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DomainMismatch { .. }));
    }
}
