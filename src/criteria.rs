//! Graphical incentive criteria.
//!
//! Structural certificates that a decision node is incentivized to react to,
//! or manipulate, another node. Every predicate here is a composition of
//! reachability and separation queries against [`crate::paths`]; no numeric
//! content is consulted and nothing is mutated.
//!
//! The response-incentive family is defined for single-agent diagrams and
//! fails with a multi-agent error otherwise.

use std::collections::BTreeSet;

use crate::{
    Error, Result,
    diagram::{Diagram, NodeKind},
    identifiers::{AgentId, NodeName},
    paths::{directed_paths, first_active_path},
};

/// Outcome of a criterion test: the verdict plus a witnessing path when the
/// criterion holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionResult {
    /// Whether the criterion holds.
    pub holds: bool,
    /// A path witnessing the verdict, for explainability.
    pub witness: Option<Vec<NodeName>>,
}

impl CriterionResult {
    fn no() -> Self {
        Self {
            holds: false,
            witness: None,
        }
    }

    fn yes(witness: Vec<NodeName>) -> Self {
        Self {
            holds: true,
            witness: Some(witness),
        }
    }
}

/// Whether the diagram admits a response incentive for `decision` on `node`.
///
/// Holds iff `node` is a non-descendant of the decision, is observed by it
/// (an edge into the decision, or a directed path into one of its observed
/// parents), and an active path runs from `node` to a utility node of the
/// decision's agent that is not blocked by the decision itself or its other
/// observed parents.
pub fn response_incentive(
    diagram: &Diagram,
    decision: &str,
    node: &str,
) -> Result<CriterionResult> {
    let agent = require_single_agent_decision(diagram, decision)?;
    diagram.require(node)?;
    if node == decision {
        return Ok(CriterionResult::no());
    }

    if diagram.descendants(decision)?.contains(node) {
        return Ok(CriterionResult::no());
    }
    let parents = diagram.parents_of(decision)?;
    if !observed_by(diagram, &parents, node)? {
        return Ok(CriterionResult::no());
    }

    // Conditioning on the decision and its other observed parents isolates
    // the information channel under test from the decision's own influence.
    let mut observed: BTreeSet<NodeName> = parents
        .into_iter()
        .filter(|p| p.as_str() != node)
        .collect();
    observed.insert(NodeName::new(decision));
    active_path_to_utility(diagram, node, agent, &observed)
}

/// Whether the diagram admits an instrumental control incentive for
/// `decision` on `node`.
///
/// Holds iff a directed path runs from the decision through `node` on to a
/// utility node of the decision's agent without revisiting the decision; the
/// decision can then use `node` as an instrument to affect its own payoff.
pub fn instrumental_control_incentive(
    diagram: &Diagram,
    decision: &str,
    node: &str,
) -> Result<CriterionResult> {
    let agent = require_single_agent_decision(diagram, decision)?;
    diagram.require(node)?;
    if node == decision {
        return Ok(CriterionResult::no());
    }

    for utility in diagram.utilities_of(agent) {
        for path in directed_paths(diagram, decision, utility.as_str())? {
            // Simple paths visit the decision only at the start; the
            // criterion just needs the instrument on the way.
            if path.iter().any(|n| n.as_str() == node) {
                return Ok(CriterionResult::yes(path));
            }
        }
    }
    Ok(CriterionResult::no())
}

/// Whether observing `node` would give `decision` a response incentive on it.
///
/// Evaluates the response-incentive conditions as if `node` were added to the
/// decision's observed parents: the node must not already be observed, must
/// be a non-descendant of the decision, and an active path must run from it
/// to a utility node of the decision's agent given the decision and all of
/// its current parents.
pub fn value_of_information(
    diagram: &Diagram,
    decision: &str,
    node: &str,
) -> Result<CriterionResult> {
    let agent = require_single_agent_decision(diagram, decision)?;
    diagram.require(node)?;
    if node == decision {
        return Ok(CriterionResult::no());
    }

    let parents = diagram.parents_of(decision)?;
    if parents.iter().any(|p| p.as_str() == node) {
        // Already observed: nothing would newly hold.
        return Ok(CriterionResult::no());
    }
    if diagram.descendants(decision)?.contains(node) {
        return Ok(CriterionResult::no());
    }

    let mut observed: BTreeSet<NodeName> = parents.into_iter().collect();
    observed.insert(NodeName::new(decision));
    active_path_to_utility(diagram, node, agent, &observed)
}

/// All nodes admitting a response incentive for `decision`, in insertion
/// order.
pub fn response_incentive_nodes(diagram: &Diagram, decision: &str) -> Result<Vec<NodeName>> {
    let mut nodes = Vec::new();
    for name in diagram.node_names() {
        if response_incentive(diagram, decision, name.as_str())?.holds {
            nodes.push(name);
        }
    }
    Ok(nodes)
}

/// All nodes admitting an instrumental control incentive for `decision`.
pub fn instrumental_control_incentive_nodes(
    diagram: &Diagram,
    decision: &str,
) -> Result<Vec<NodeName>> {
    let mut nodes = Vec::new();
    for name in diagram.node_names() {
        if instrumental_control_incentive(diagram, decision, name.as_str())?.holds {
            nodes.push(name);
        }
    }
    Ok(nodes)
}

/// Whether `node` feeds the decision's information set: either a direct
/// observed parent, or the origin of a directed path into one.
fn observed_by(diagram: &Diagram, parents: &[NodeName], node: &str) -> Result<bool> {
    if parents.iter().any(|p| p.as_str() == node) {
        return Ok(true);
    }
    let downstream = diagram.descendants(node)?;
    Ok(parents.iter().any(|p| downstream.contains(p)))
}

fn require_single_agent_decision(diagram: &Diagram, decision: &str) -> Result<AgentId> {
    let agents = diagram.agents();
    if agents.len() > 1 {
        return Err(Error::MultiAgent {
            agents: agents.len(),
        });
    }
    match diagram.kind_of(decision)? {
        NodeKind::Decision(agent) => Ok(agent),
        _ => Err(Error::NotADecision {
            node: NodeName::new(decision),
        }),
    }
}

fn active_path_to_utility(
    diagram: &Diagram,
    from: &str,
    agent: AgentId,
    observed: &BTreeSet<NodeName>,
) -> Result<CriterionResult> {
    for utility in diagram.utilities_of(agent) {
        if let Some(path) = first_active_path(diagram, from, utility.as_str(), observed)? {
            return Ok(CriterionResult::yes(path));
        }
    }
    Ok(CriterionResult::no())
}
