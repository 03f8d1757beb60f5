//! Distribution oracle: exact expected-utility and marginal queries.
//!
//! The oracle lowers a diagram plus a fully-resolved policy profile into a
//! network of tabular factors (functional and uniform distributions are
//! lowered to tables here) and answers queries through the inference-engine
//! port. All results are exact.

use std::collections::BTreeMap;

use crate::{
    Error, Result,
    cpd::DecisionRule,
    diagram::{Diagram, NodeKind, assignment_key},
    identifiers::{AgentId, NodeName},
    ports::inference::{DiscreteFactor, DiscreteNetwork, InferenceEngine},
    solve::Policy,
    types::{Outcome, ParentValues},
    utils::cartesian_product,
};

/// Exact query interface over one diagram and one inference engine.
pub struct DistributionOracle<'a> {
    diagram: &'a Diagram,
    engine: &'a dyn InferenceEngine,
}

impl<'a> DistributionOracle<'a> {
    /// Create an oracle over a diagram.
    pub fn new(diagram: &'a Diagram, engine: &'a dyn InferenceEngine) -> Self {
        Self { diagram, engine }
    }

    /// Total expected utility of `agent` under the rules attached in place.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedDecision`] if any decision node still holds a
    /// placeholder rule; [`Error::DomainMismatch`] if a distribution's
    /// support does not cover an observed parent assignment.
    pub fn expected_utility(&self, agent: AgentId) -> Result<f64> {
        self.expected_utility_given(agent, None, &[])
    }

    /// Total expected utility of `agent` with rule overrides from `profile`.
    ///
    /// Rules in the profile take precedence over rules attached in place;
    /// decisions resolved by neither fail with
    /// [`Error::UnresolvedDecision`].
    pub fn expected_utility_with(&self, agent: AgentId, profile: &Policy) -> Result<f64> {
        self.expected_utility_given(agent, Some(profile), &[])
    }

    /// Expected utility of `agent` conditional on evidence.
    ///
    /// Evidence pins chance or decision variables to outcomes; utility
    /// parents pinned by evidence are read from the evidence rather than
    /// marginalized.
    pub fn expected_utility_given(
        &self,
        agent: AgentId,
        profile: Option<&Policy>,
        evidence: &[(NodeName, Outcome)],
    ) -> Result<f64> {
        let network = self.lower(profile)?;
        self.expected_utility_in(&network, agent, evidence)
    }

    /// Expected utility against an already-lowered network.
    ///
    /// Lets callers that sweep many evidence contexts lower the network once.
    pub fn expected_utility_in(
        &self,
        network: &DiscreteNetwork,
        agent: AgentId,
        evidence: &[(NodeName, Outcome)],
    ) -> Result<f64> {
        let pinned: BTreeMap<NodeName, Outcome> =
            evidence.iter().map(|(n, o)| (n.clone(), *o)).collect();

        let mut total = 0.0;
        for utility_node in self.diagram.utilities_of(agent) {
            let utility = self
                .diagram
                .utility_function(utility_node.as_str())?
                .ok_or_else(|| Error::IncompleteDiagram {
                    reason: format!("utility node '{utility_node}' has no utility function"),
                })?;

            let free: Vec<NodeName> = utility
                .parents()
                .iter()
                .filter(|p| !pinned.contains_key(p.as_str()))
                .cloned()
                .collect();

            if free.is_empty() {
                let key = assignment_key(utility.parents(), &pinned);
                let view = ParentValues::new(utility.parents(), &key);
                total += utility.evaluate(&view);
                continue;
            }

            let marginal = self.engine.marginal(network, &free, evidence)?;
            for (entry, probability) in marginal.entries() {
                if probability == 0.0 {
                    continue;
                }
                let mut assignment = pinned.clone();
                assignment.extend(entry);
                let key = assignment_key(utility.parents(), &assignment);
                let view = ParentValues::new(utility.parents(), &key);
                total += probability * utility.evaluate(&view);
            }
        }
        Ok(total)
    }

    /// Normalized marginal P(query | evidence) under the in-place profile.
    pub fn marginal(
        &self,
        query: &[NodeName],
        evidence: &[(NodeName, Outcome)],
    ) -> Result<DiscreteFactor> {
        let network = self.lower(None)?;
        self.engine.marginal(&network, query, evidence)
    }

    /// Lower the diagram and profile into a tabular factor network.
    ///
    /// One CPD factor per chance and decision node; utility nodes are sinks
    /// and stay outside the network (the expected-utility queries evaluate
    /// them against marginals over their parents).
    pub fn lower(&self, profile: Option<&Policy>) -> Result<DiscreteNetwork> {
        let order = self.diagram.topological_order();
        let mut factors = Vec::new();
        let mut elimination_order = Vec::new();

        for name in &order {
            match self.diagram.kind_of(name.as_str())? {
                NodeKind::Utility(_) => continue,
                NodeKind::Chance => {
                    let parents = self.diagram.parents_of(name.as_str())?;
                    let declared = match self.diagram.distribution(name.as_str())? {
                        Some(dist) if !dist.declared_parents().is_empty() => {
                            dist.declared_parents().to_vec()
                        }
                        Some(_) => parents.clone(),
                        None => {
                            return Err(Error::IncompleteDiagram {
                                reason: format!("chance node '{name}' has no distribution"),
                            });
                        }
                    };
                    factors.push(self.chance_factor(name, &declared)?);
                }
                NodeKind::Decision(_) => {
                    let rule = match profile.and_then(|p| p.get(name.as_str())) {
                        Some(rule) => rule.clone(),
                        None => match self.diagram.decision_rule(name.as_str())? {
                            Some(DecisionRule::Resolved(rule)) => rule.clone(),
                            _ => {
                                return Err(Error::UnresolvedDecision {
                                    decision: name.clone(),
                                });
                            }
                        },
                    };
                    let mut vars = rule.parents().to_vec();
                    vars.push(name.clone());

                    let mut domains: Vec<Vec<Outcome>> = Vec::with_capacity(vars.len());
                    for parent in rule.parents() {
                        domains.push(self.diagram.domain_of(parent.as_str())?);
                    }
                    domains.push(rule.actions().to_vec());

                    let parent_domains = &domains[..domains.len() - 1];
                    let mut values =
                        Vec::with_capacity(domains.iter().map(Vec::len).product());
                    for key in cartesian_product(parent_domains) {
                        let row = rule.row(&key).ok_or_else(|| Error::DomainMismatch {
                            node: name.clone(),
                            reason: format!("no rule row for parent assignment {key:?}"),
                        })?;
                        values.extend_from_slice(row);
                    }
                    factors.push(DiscreteFactor::new(vars, domains, values)?);
                }
            }
            elimination_order.push(name.clone());
        }

        Ok(DiscreteNetwork {
            factors,
            elimination_order,
        })
    }

    fn chance_factor(&self, name: &NodeName, declared: &[NodeName]) -> Result<DiscreteFactor> {
        let own_domain = self.diagram.domain_of(name.as_str())?;
        let mut domains: Vec<Vec<Outcome>> = Vec::with_capacity(declared.len() + 1);
        for parent in declared {
            domains.push(self.diagram.domain_of(parent.as_str())?);
        }

        let mut values = Vec::new();
        for key in cartesian_product(&domains) {
            let assignment: BTreeMap<NodeName, Outcome> = declared
                .iter()
                .cloned()
                .zip(key.iter().copied())
                .collect();
            let row = self.diagram.chance_row(name.as_str(), &assignment)?;
            values.extend(row.into_iter().map(|(_, p)| p));
        }

        let mut vars = declared.to_vec();
        vars.push(name.clone());
        domains.push(own_domain);
        DiscreteFactor::new(vars, domains, values)
    }
}
