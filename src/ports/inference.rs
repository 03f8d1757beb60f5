//! Inference-engine port - abstraction over exact discrete inference
//!
//! The distribution oracle lowers a diagram plus a resolved policy profile
//! into a [`DiscreteNetwork`] of tabular factors and queries it through the
//! [`InferenceEngine`] trait. The default adapter performs sum-product
//! variable elimination; alternative exact backends can implement the same
//! port.

use std::collections::BTreeMap;

use crate::{
    Error, Result,
    identifiers::NodeName,
    types::Outcome,
};

/// A non-negative real-valued factor over a set of discrete variables.
///
/// Values are stored row-major with the *last* variable varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteFactor {
    vars: Vec<NodeName>,
    domains: Vec<Vec<Outcome>>,
    values: Vec<f64>,
}

impl DiscreteFactor {
    /// Create a factor; the value vector length must equal the product of
    /// the domain sizes.
    pub fn new(
        vars: Vec<NodeName>,
        domains: Vec<Vec<Outcome>>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let expected: usize = domains.iter().map(Vec::len).product();
        if vars.len() != domains.len() || values.len() != expected {
            return Err(Error::IncompleteDiagram {
                reason: format!(
                    "factor over {:?} expects {expected} values, got {}",
                    vars,
                    values.len()
                ),
            });
        }
        Ok(Self {
            vars,
            domains,
            values,
        })
    }

    /// A scalar factor (empty scope).
    pub fn scalar(value: f64) -> Self {
        Self {
            vars: Vec::new(),
            domains: Vec::new(),
            values: vec![value],
        }
    }

    /// The factor's variable scope, in storage order.
    pub fn vars(&self) -> &[NodeName] {
        &self.vars
    }

    /// The domain of a scoped variable.
    pub fn domain_of(&self, var: &str) -> Option<&[Outcome]> {
        self.position(var).map(|idx| self.domains[idx].as_slice())
    }

    /// The raw value vector.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn position(&self, var: &str) -> Option<usize> {
        self.vars.iter().position(|v| v.as_str() == var)
    }

    /// Row-major strides, last variable fastest.
    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.domains.len()];
        for i in (0..self.domains.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.domains[i + 1].len();
        }
        strides
    }

    /// Decode a linear index into per-variable outcome indices.
    fn decode(&self, mut linear: usize) -> Vec<usize> {
        let strides = self.strides();
        let mut indices = Vec::with_capacity(self.domains.len());
        for stride in strides {
            indices.push(linear / stride);
            linear %= stride;
        }
        indices
    }

    /// Look up the value for a full assignment given as (name, outcome) pairs.
    ///
    /// Extra pairs not in scope are ignored; a missing scoped variable or an
    /// outcome outside its domain yields `None`.
    pub fn value_for(&self, assignment: &BTreeMap<NodeName, Outcome>) -> Option<f64> {
        let strides = self.strides();
        let mut linear = 0usize;
        for (idx, var) in self.vars.iter().enumerate() {
            let outcome = assignment.get(var)?;
            let pos = self.domains[idx].iter().position(|o| o == outcome)?;
            linear += pos * strides[idx];
        }
        Some(self.values[linear])
    }

    /// Pointwise product with another factor, over the union scope.
    pub fn multiply(&self, other: &DiscreteFactor) -> DiscreteFactor {
        let mut vars = self.vars.clone();
        let mut domains = self.domains.clone();
        for (var, domain) in other.vars.iter().zip(other.domains.iter()) {
            if !vars.contains(var) {
                vars.push(var.clone());
                domains.push(domain.clone());
            }
        }

        let result_size: usize = domains.iter().map(Vec::len).product();
        let result = DiscreteFactor {
            vars,
            domains,
            values: vec![0.0; result_size],
        };

        let self_positions: Vec<usize> = self
            .vars
            .iter()
            .map(|v| result.position(v.as_str()).expect("in union scope"))
            .collect();
        let other_positions: Vec<usize> = other
            .vars
            .iter()
            .map(|v| result.position(v.as_str()).expect("in union scope"))
            .collect();
        let self_strides = self.strides();
        let other_strides = other.strides();

        let mut values = result.values.clone();
        for (linear, slot) in values.iter_mut().enumerate() {
            let indices = result.decode(linear);
            let self_idx: usize = self_positions
                .iter()
                .zip(self_strides.iter())
                .map(|(&pos, &stride)| indices[pos] * stride)
                .sum();
            let other_idx: usize = other_positions
                .iter()
                .zip(other_strides.iter())
                .map(|(&pos, &stride)| indices[pos] * stride)
                .sum();
            *slot = self.values[self_idx] * other.values[other_idx];
        }

        DiscreteFactor { values, ..result }
    }

    /// Sum a variable out of the scope.
    ///
    /// A variable not in scope leaves the factor unchanged.
    pub fn sum_out(&self, var: &str) -> DiscreteFactor {
        let Some(drop) = self.position(var) else {
            return self.clone();
        };

        let mut vars = self.vars.clone();
        let mut domains = self.domains.clone();
        vars.remove(drop);
        domains.remove(drop);

        let result_size: usize = domains.iter().map(Vec::len).product();
        let mut result = DiscreteFactor {
            vars,
            domains,
            values: vec![0.0; result_size],
        };

        let result_strides = result.strides();
        for (linear, &value) in self.values.iter().enumerate() {
            let indices = self.decode(linear);
            let mut result_linear = 0usize;
            let mut result_pos = 0usize;
            for idx in 0..self.vars.len() {
                if idx == drop {
                    continue;
                }
                result_linear += indices[idx] * result_strides[result_pos];
                result_pos += 1;
            }
            result.values[result_linear] += value;
        }
        result
    }

    /// Restrict the factor to `var = value`, removing `var` from scope.
    ///
    /// A variable not in scope leaves the factor unchanged. An outcome
    /// outside the variable's domain produces the all-zero restriction.
    pub fn restrict(&self, var: &str, value: Outcome) -> DiscreteFactor {
        let Some(keep) = self.position(var) else {
            return self.clone();
        };
        let value_pos = self.domains[keep].iter().position(|&o| o == value);

        let mut vars = self.vars.clone();
        let mut domains = self.domains.clone();
        vars.remove(keep);
        domains.remove(keep);

        let result_size: usize = domains.iter().map(Vec::len).product();
        let mut result = DiscreteFactor {
            vars,
            domains,
            values: vec![0.0; result_size],
        };
        let Some(value_pos) = value_pos else {
            return result;
        };

        let result_strides = result.strides();
        for (linear, &value) in self.values.iter().enumerate() {
            let indices = self.decode(linear);
            if indices[keep] != value_pos {
                continue;
            }
            let mut result_linear = 0usize;
            let mut result_pos = 0usize;
            for idx in 0..self.vars.len() {
                if idx == keep {
                    continue;
                }
                result_linear += indices[idx] * result_strides[result_pos];
                result_pos += 1;
            }
            result.values[result_linear] = value;
        }
        result
    }

    /// Sum of all values (the normalization constant).
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Normalize values to sum to 1.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroProbabilityEvidence`] if the total mass is zero.
    pub fn normalized(&self, context: &str) -> Result<DiscreteFactor> {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 {
            return Err(Error::ZeroProbabilityEvidence {
                context: context.to_string(),
            });
        }
        Ok(DiscreteFactor {
            vars: self.vars.clone(),
            domains: self.domains.clone(),
            values: self.values.iter().map(|v| v / total).collect(),
        })
    }

    /// Iterate over (assignment, value) pairs in row-major order.
    pub fn entries(&self) -> Vec<(BTreeMap<NodeName, Outcome>, f64)> {
        let mut entries = Vec::with_capacity(self.values.len());
        for (linear, &value) in self.values.iter().enumerate() {
            let indices = self.decode(linear);
            let assignment: BTreeMap<NodeName, Outcome> = self
                .vars
                .iter()
                .enumerate()
                .map(|(pos, var)| (var.clone(), self.domains[pos][indices[pos]]))
                .collect();
            entries.push((assignment, value));
        }
        entries
    }
}

/// A fully-specified discrete network: one factor per variable plus an
/// elimination-order hint (a topological order of the source DAG).
#[derive(Debug, Clone)]
pub struct DiscreteNetwork {
    /// CPD factors, one per non-utility node of the source diagram.
    pub factors: Vec<DiscreteFactor>,
    /// Elimination hint; variables are summed out in this order.
    pub elimination_order: Vec<NodeName>,
}

/// Exact inference over discrete networks.
///
/// Implementations must be exact for finite discrete domains; sampling-based
/// backends do not satisfy this port.
pub trait InferenceEngine {
    /// Compute the normalized marginal P(query | evidence).
    ///
    /// Query variables must be disjoint from evidence variables. The scope of
    /// the returned factor is exactly the query set (in implementation
    /// order); use [`DiscreteFactor::value_for`] to read probabilities.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroProbabilityEvidence`] if the evidence event has zero
    /// probability under the network.
    fn marginal(
        &self,
        network: &DiscreteNetwork,
        query: &[NodeName],
        evidence: &[(NodeName, Outcome)],
    ) -> Result<DiscreteFactor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> NodeName {
        NodeName::new(name)
    }

    fn binary() -> Vec<Outcome> {
        vec![Outcome::new(0), Outcome::new(1)]
    }

    #[test]
    fn multiply_aligns_shared_variables() {
        // f(A) = [0.4, 0.6], g(A, B) = A==B ? 1 : 0
        let f = DiscreteFactor::new(vec![var("A")], vec![binary()], vec![0.4, 0.6]).unwrap();
        let g = DiscreteFactor::new(
            vec![var("A"), var("B")],
            vec![binary(), binary()],
            vec![1.0, 0.0, 0.0, 1.0],
        )
        .unwrap();

        let product = f.multiply(&g);
        let mut assignment = BTreeMap::new();
        assignment.insert(var("A"), Outcome::new(1));
        assignment.insert(var("B"), Outcome::new(1));
        assert_eq!(product.value_for(&assignment), Some(0.6));

        assignment.insert(var("B"), Outcome::new(0));
        assert_eq!(product.value_for(&assignment), Some(0.0));
    }

    #[test]
    fn sum_out_collapses_a_variable() {
        let g = DiscreteFactor::new(
            vec![var("A"), var("B")],
            vec![binary(), binary()],
            vec![0.1, 0.2, 0.3, 0.4],
        )
        .unwrap();

        let marginal = g.sum_out("B");
        assert_eq!(marginal.vars(), &[var("A")]);
        let values = marginal.values();
        assert!((values[0] - 0.3).abs() < 1e-12);
        assert!((values[1] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn restrict_pins_a_variable() {
        let g = DiscreteFactor::new(
            vec![var("A"), var("B")],
            vec![binary(), binary()],
            vec![0.1, 0.2, 0.3, 0.4],
        )
        .unwrap();

        let restricted = g.restrict("A", Outcome::new(1));
        assert_eq!(restricted.vars(), &[var("B")]);
        assert_eq!(restricted.values(), &[0.3, 0.4]);
    }

    #[test]
    fn normalized_rejects_zero_mass() {
        let f = DiscreteFactor::new(vec![var("A")], vec![binary()], vec![0.0, 0.0]).unwrap();
        assert!(matches!(
            f.normalized("test"),
            Err(Error::ZeroProbabilityEvidence { .. })
        ));
    }
}
