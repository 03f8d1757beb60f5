//! Solvers: single-agent policy optimization and multi-agent equilibrium
//! search.

mod equilibrium;
mod policy;

pub use equilibrium::{
    Equilibrium, EquilibriumConfig, EquilibriumSolver, MethodPreference, SolverState,
};
pub use policy::{PolicyOptimizer, impute_uniform_rules, uniform_rule};

use std::collections::BTreeMap;

use crate::{
    Result,
    cpd::{DecisionRule, TabularRule},
    diagram::Diagram,
    identifiers::NodeName,
};

/// A (possibly partial) policy profile: one resolved rule per decision node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Policy {
    rules: BTreeMap<NodeName, TabularRule>,
}

impl Policy {
    /// Create an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule for a decision node.
    pub fn insert(&mut self, decision: impl Into<NodeName>, rule: TabularRule) {
        self.rules.insert(decision.into(), rule);
    }

    /// The rule for a decision node, if present.
    pub fn get(&self, decision: &str) -> Option<&TabularRule> {
        self.rules.get(decision)
    }

    /// Iterate over (decision, rule) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeName, &TabularRule)> {
        self.rules.iter()
    }

    /// Number of resolved decisions.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the policy resolves no decisions.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether every decision node of `diagram` is resolved by this policy.
    pub fn is_full_for(&self, diagram: &Diagram) -> bool {
        diagram
            .decisions()
            .iter()
            .all(|d| self.rules.contains_key(d.as_str()))
    }

    /// Attach every rule of this policy to the diagram in place.
    pub fn apply_to(&self, diagram: &mut Diagram) -> Result<()> {
        for (decision, rule) in &self.rules {
            diagram.attach_decision_rule(
                decision.as_str(),
                DecisionRule::Resolved(rule.clone()),
            )?;
        }
        Ok(())
    }
}

/// The algorithm that produced an equilibrium, recorded for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionMethod {
    /// Single-pass backward induction over a total decision order.
    SubgamePerfect,
    /// Fixed-point search by iterated best response.
    IterativeBestResponse,
}

impl std::fmt::Display for SolutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubgamePerfect => write!(f, "subgame-perfect backward induction"),
            Self::IterativeBestResponse => write!(f, "iterative best response"),
        }
    }
}
