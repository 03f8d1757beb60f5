//! Backward-induction policy optimization for single-agent diagrams.
//!
//! Decision nodes are processed in reverse topological order; for every
//! assignment of a decision's observed parents, the action maximizing the
//! agent's expected utility is selected, with later decisions already fixed
//! to their optimal rules. Ties and zero-probability contexts resolve to the
//! lexicographically smallest action so re-runs are reproducible.

use std::collections::BTreeMap;

use crate::{
    Error, Result,
    cpd::{DecisionRule, TabularRule},
    diagram::Diagram,
    identifiers::{AgentId, NodeName},
    oracle::DistributionOracle,
    ports::{InferenceEngine, NullObserver, SolverObserver},
    types::Outcome,
    utils::cartesian_product,
};

use super::Policy;

/// Optimizer computing an optimal decision rule per decision node of a
/// single-agent diagram.
pub struct PolicyOptimizer<'e> {
    engine: &'e dyn InferenceEngine,
}

impl<'e> PolicyOptimizer<'e> {
    /// Create an optimizer backed by an exact inference engine.
    pub fn new(engine: &'e dyn InferenceEngine) -> Self {
        Self { engine }
    }

    /// Compute the optimal policy without touching the diagram.
    ///
    /// # Errors
    ///
    /// - [`Error::MultiAgent`] if more than one agent owns decision or
    ///   utility nodes; use the equilibrium solver instead.
    /// - [`Error::NoFeasibleOrder`] if the information structure admits no
    ///   sound backward-induction order (insufficient recall).
    pub fn optimal_policy(&self, diagram: &Diagram) -> Result<Policy> {
        self.optimal_policy_observed(diagram, &mut NullObserver)
    }

    /// Compute the optimal policy, reporting progress to an observer.
    pub fn optimal_policy_observed(
        &self,
        diagram: &Diagram,
        observer: &mut dyn SolverObserver,
    ) -> Result<Policy> {
        let agents = diagram.agents();
        if agents.len() > 1 {
            return Err(Error::MultiAgent {
                agents: agents.len(),
            });
        }
        let decisions = decisions_in_reverse_order(diagram);
        if decisions.is_empty() {
            return Ok(Policy::new());
        }
        let agent = agents.first().copied().unwrap_or_default();
        if decisions.len() > 1 && !diagram.sufficient_recall() {
            return Err(Error::NoFeasibleOrder {
                reason: "insufficient recall: a later decision forgets an earlier decision \
                         or one of its observations"
                    .to_string(),
            });
        }

        observer.on_solve_start(decisions.len())?;
        observer.on_pass_start(1)?;
        let mut resolved = Policy::new();
        for decision in &decisions {
            let rule = optimize_decision(diagram, self.engine, agent, decision.as_str(), &resolved)?;
            let changed = diagram
                .decision_rule(decision.as_str())?
                .and_then(DecisionRule::as_resolved)
                != Some(&rule);
            observer.on_decision_solved(decision, changed)?;
            resolved.insert(decision.clone(), rule);
        }
        observer.on_pass_end(1, decisions.len())?;
        observer.on_solve_end()?;
        Ok(resolved)
    }

    /// Compute the optimal policy and attach it to the diagram in place.
    pub fn solve(&self, diagram: &mut Diagram) -> Result<Policy> {
        let policy = self.optimal_policy(diagram)?;
        policy.apply_to(diagram)?;
        Ok(policy)
    }
}

/// The diagram's decision nodes in reverse topological order.
pub(crate) fn decisions_in_reverse_order(diagram: &Diagram) -> Vec<NodeName> {
    let decision_set = diagram.decisions();
    let mut ordered: Vec<NodeName> = diagram
        .topological_order()
        .into_iter()
        .filter(|n| decision_set.contains(n))
        .collect();
    ordered.reverse();
    ordered
}

/// Uniform rule over a decision's observed parents and action domain.
pub fn uniform_rule(diagram: &Diagram, decision: &str) -> Result<TabularRule> {
    let parents = diagram.parents_of(decision)?;
    let actions = match diagram.decision_rule(decision)? {
        Some(rule) => rule.actions().to_vec(),
        None => {
            return Err(Error::IncompleteDiagram {
                reason: format!("decision node '{decision}' has no declared action domain"),
            });
        }
    };
    let mut parent_domains = Vec::with_capacity(parents.len());
    for parent in &parents {
        parent_domains.push(diagram.domain_of(parent.as_str())?);
    }

    let mut rule = TabularRule::new(
        parents.clone(),
        actions.iter().map(|a| a.value()).collect::<Vec<_>>(),
    );
    for context in cartesian_product(&parent_domains) {
        rule.set_uniform(context);
    }
    Ok(rule)
}

/// Attach a uniform rule to every unresolved decision node.
///
/// Mirrors random-decision imputation: irrelevant or not-yet-solved decisions
/// get an explicit uniform rule so the joint distribution is well-defined.
pub fn impute_uniform_rules(diagram: &mut Diagram) -> Result<()> {
    for decision in diagram.decisions() {
        let resolved = matches!(
            diagram.decision_rule(decision.as_str())?,
            Some(rule) if rule.is_resolved()
        );
        if !resolved {
            let rule = uniform_rule(diagram, decision.as_str())?;
            diagram.attach_decision_rule(decision.as_str(), DecisionRule::Resolved(rule))?;
        }
    }
    Ok(())
}

/// Optimize one decision for `agent` with all other decisions taken from
/// `resolved` where present and imputed uniform where absent.
///
/// Returns a deterministic rule: for every observed-parent assignment, the
/// smallest action maximizing conditional expected utility; contexts with
/// zero probability get the smallest action outright.
pub(crate) fn optimize_decision(
    diagram: &Diagram,
    engine: &dyn InferenceEngine,
    agent: AgentId,
    decision: &str,
    resolved: &Policy,
) -> Result<TabularRule> {
    let parents = diagram.parents_of(decision)?;
    let actions = match diagram.decision_rule(decision)? {
        Some(rule) => rule.actions().to_vec(),
        None => {
            return Err(Error::IncompleteDiagram {
                reason: format!("decision node '{decision}' has no declared action domain"),
            });
        }
    };

    // Full profile for evaluation: the decision itself and anything not yet
    // resolved become uniform so conditioning on contexts is well-defined.
    let mut profile = resolved.clone();
    for other in diagram.decisions() {
        if other.as_str() == decision || profile.get(other.as_str()).is_none() {
            profile.insert(other.clone(), uniform_rule(diagram, other.as_str())?);
        }
    }

    let oracle = DistributionOracle::new(diagram, engine);
    let network = oracle.lower(Some(&profile))?;

    let mut parent_domains = Vec::with_capacity(parents.len());
    for parent in &parents {
        parent_domains.push(diagram.domain_of(parent.as_str())?);
    }

    // Marginal over the observed parents, used to detect unreachable
    // contexts, which get the tie-break default outright.
    let context_marginal = if parents.is_empty() {
        None
    } else {
        Some(engine.marginal(&network, &parents, &[])?)
    };

    let decision_name = NodeName::new(decision);
    let mut rule = TabularRule::new(
        parents.clone(),
        actions.iter().map(|a| a.value()).collect::<Vec<_>>(),
    );
    for context in cartesian_product(&parent_domains) {
        let reachable = context_marginal.as_ref().is_none_or(|marginal| {
            let assignment: BTreeMap<NodeName, Outcome> = parents
                .iter()
                .cloned()
                .zip(context.iter().copied())
                .collect();
            marginal.value_for(&assignment).unwrap_or(0.0) > 0.0
        });
        let best = if reachable {
            best_action_in_context(
                &oracle, &network, agent, &decision_name, &parents, &context, &actions,
            )?
        } else {
            actions[0]
        };
        rule.set_choice(context, best);
    }
    Ok(rule)
}

fn best_action_in_context(
    oracle: &DistributionOracle<'_>,
    network: &crate::ports::DiscreteNetwork,
    agent: AgentId,
    decision: &NodeName,
    parents: &[NodeName],
    context: &[Outcome],
    actions: &[Outcome],
) -> Result<Outcome> {
    let mut best_action = actions[0];
    let mut best_value = f64::NEG_INFINITY;

    for &action in actions {
        let mut evidence: Vec<(NodeName, Outcome)> = parents
            .iter()
            .cloned()
            .zip(context.iter().copied())
            .collect();
        evidence.push((decision.clone(), action));

        let value = match oracle.expected_utility_in(network, agent, &evidence) {
            Ok(value) => value,
            Err(Error::ZeroProbabilityEvidence { .. }) => {
                // Unreachable context: the tie-break default stands.
                return Ok(actions[0]);
            }
            Err(err) => return Err(err),
        };
        if value > best_value {
            best_value = value;
            best_action = action;
        }
    }
    Ok(best_action)
}
