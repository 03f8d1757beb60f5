//! Sum-product variable elimination over discrete factor networks.
//!
//! The default adapter for the inference-engine port. Exact; worst-case
//! exponential in the network's treewidth, which this library accepts as a
//! correctness/scope tradeoff.

use std::collections::BTreeSet;

use crate::{
    Result,
    identifiers::NodeName,
    ports::inference::{DiscreteFactor, DiscreteNetwork, InferenceEngine},
    types::Outcome,
};

/// Exact inference by variable elimination.
///
/// Variables are eliminated in the network's elimination-order hint (a
/// topological order of the source DAG), restricted first by the evidence.
#[derive(Debug, Default, Clone, Copy)]
pub struct VariableElimination;

impl VariableElimination {
    /// Create the default elimination engine.
    pub fn new() -> Self {
        Self
    }
}

impl InferenceEngine for VariableElimination {
    fn marginal(
        &self,
        network: &DiscreteNetwork,
        query: &[NodeName],
        evidence: &[(NodeName, Outcome)],
    ) -> Result<DiscreteFactor> {
        debug_assert!(
            query.iter().all(|q| !evidence.iter().any(|(e, _)| e == q)),
            "query variables must be disjoint from evidence variables"
        );

        // Restrict every factor by the evidence.
        let mut factors: Vec<DiscreteFactor> = network
            .factors
            .iter()
            .map(|factor| {
                let mut restricted = factor.clone();
                for (var, value) in evidence {
                    restricted = restricted.restrict(var.as_str(), *value);
                }
                restricted
            })
            .collect();

        // Sum out everything that is neither queried nor evidence.
        let query_set: BTreeSet<&str> = query.iter().map(NodeName::as_str).collect();
        let evidence_set: BTreeSet<&str> = evidence.iter().map(|(v, _)| v.as_str()).collect();
        for var in &network.elimination_order {
            if query_set.contains(var.as_str()) || evidence_set.contains(var.as_str()) {
                continue;
            }
            let (with_var, without_var): (Vec<_>, Vec<_>) = factors
                .into_iter()
                .partition(|f| f.vars().iter().any(|v| v == var));
            factors = without_var;
            if with_var.is_empty() {
                continue;
            }
            let mut product = DiscreteFactor::scalar(1.0);
            for factor in &with_var {
                product = product.multiply(factor);
            }
            factors.push(product.sum_out(var.as_str()));
        }

        // Multiply what remains into a single factor over the query scope.
        let mut joint = DiscreteFactor::scalar(1.0);
        for factor in &factors {
            joint = joint.multiply(factor);
        }

        let context = if evidence.is_empty() {
            format!("marginal over {query:?}")
        } else {
            format!("marginal over {query:?} given {evidence:?}")
        };
        joint.normalized(&context)
    }
}
