//! Forward sampling of fully-resolved diagrams.
//!
//! A single joint draw in topological order. This is a demonstration and
//! testing aid; all solver queries use exact inference, never sampling.

use std::collections::BTreeMap;

use rand::Rng;

use crate::{
    Error, Result,
    cpd::DecisionRule,
    identifiers::NodeName,
    types::{Outcome, ParentValues},
    utils::weighted_sample,
};

use super::{Diagram, NodeContent, assignment_key};

/// One sampled joint outcome of a diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDraw {
    /// Sampled value per chance and decision node.
    pub outcomes: BTreeMap<NodeName, Outcome>,
    /// Realized value per utility node.
    pub utilities: BTreeMap<NodeName, f64>,
}

impl Diagram {
    /// Draw one joint sample from the diagram.
    ///
    /// Every decision node must hold a resolved rule.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedDecision`] if any decision rule is a placeholder;
    /// [`Error::DomainMismatch`] if a tabular row is missing for a sampled
    /// parent assignment.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<SampleDraw> {
        let mut outcomes: BTreeMap<NodeName, Outcome> = BTreeMap::new();
        let mut utilities: BTreeMap<NodeName, f64> = BTreeMap::new();

        for name in self.topological_order() {
            let idx = self.require(name.as_str())?;
            match &self.data(idx).content {
                NodeContent::Chance(_) => {
                    let row = self.chance_row(name.as_str(), &outcomes)?;
                    let drawn = weighted_sample(rng, &row).ok_or_else(|| {
                        Error::InvalidDistribution {
                            node: name.clone(),
                            reason: "empty probability row".to_string(),
                        }
                    })?;
                    outcomes.insert(name, drawn);
                }
                NodeContent::Decision(rule) => {
                    let rule = match rule {
                        Some(DecisionRule::Resolved(rule)) => rule,
                        _ => return Err(Error::UnresolvedDecision { decision: name }),
                    };
                    let key = assignment_key(rule.parents(), &outcomes);
                    let row = rule.row(&key).ok_or_else(|| Error::DomainMismatch {
                        node: name.clone(),
                        reason: format!("no rule row for parent assignment {key:?}"),
                    })?;
                    let items: Vec<(Outcome, f64)> = rule
                        .actions()
                        .iter()
                        .copied()
                        .zip(row.iter().copied())
                        .collect();
                    let drawn =
                        weighted_sample(rng, &items).ok_or_else(|| Error::InvalidDistribution {
                            node: name.clone(),
                            reason: "empty action row".to_string(),
                        })?;
                    outcomes.insert(name, drawn);
                }
                NodeContent::Utility(utility) => {
                    let utility = utility.as_ref().ok_or_else(|| Error::IncompleteDiagram {
                        reason: format!("utility node '{name}' has no utility function"),
                    })?;
                    let key = assignment_key(utility.parents(), &outcomes);
                    let view = ParentValues::new(utility.parents(), &key);
                    utilities.insert(name, utility.evaluate(&view));
                }
            }
        }

        Ok(SampleDraw {
            outcomes,
            utilities,
        })
    }
}
