//! Conditional distributions, decision rules, and utility functions.
//!
//! Non-decision nodes carry a [`Distribution`] (tabular, functional, or a
//! uniform default). Decision nodes carry a [`DecisionRule`], which is either
//! a domain-only placeholder (not yet solved) or a resolved tabular rule.
//! Utility nodes carry a [`UtilityFunction`], a deterministic real-valued
//! function of parent values.
//!
//! Validation that a distribution matches the diagram (parent set, row
//! completeness, probability rows) happens when the distribution is attached
//! to a node, where the node's context is known.

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    identifiers::NodeName,
    types::{Outcome, ParentValues},
    utils::shannon_entropy,
};

/// Shared closure type for functional distributions.
type OutcomeFn = Arc<dyn Fn(&ParentValues) -> Outcome + Send + Sync>;

/// Shared closure type for utility functions.
type UtilityFn = Arc<dyn Fn(&ParentValues) -> f64 + Send + Sync>;

/// A fixed tabular conditional distribution.
///
/// Maps each assignment of the declared parents to a probability row over the
/// node's own domain. Rows are stored in a `BTreeMap` so iteration order is
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDistribution {
    parents: Vec<NodeName>,
    domain: Vec<Outcome>,
    rows: BTreeMap<Vec<Outcome>, Vec<f64>>,
}

impl TabularDistribution {
    /// Create an empty table over the given parents and domain.
    pub fn new<P, D>(parents: P, domain: D) -> Self
    where
        P: IntoIterator,
        P::Item: Into<NodeName>,
        D: IntoIterator<Item = i64>,
    {
        Self {
            parents: parents.into_iter().map(Into::into).collect(),
            domain: domain.into_iter().map(Outcome::new).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// Create a root-node (parentless) distribution from a single row.
    pub fn root<D>(domain: D, probabilities: Vec<f64>) -> Self
    where
        D: IntoIterator<Item = i64>,
    {
        let mut table = Self::new(Vec::<NodeName>::new(), domain);
        table.rows.insert(Vec::new(), probabilities);
        table
    }

    /// Add a row for one parent assignment (builder style).
    ///
    /// Parent values are given in the declared parent order; probabilities in
    /// domain order. Validity is checked when the table is attached to a node.
    pub fn with_row(mut self, parent_values: &[i64], probabilities: Vec<f64>) -> Self {
        let key: Vec<Outcome> = parent_values.iter().copied().map(Outcome::new).collect();
        self.rows.insert(key, probabilities);
        self
    }

    /// The declared parent names, in declared order.
    pub fn parents(&self) -> &[NodeName] {
        &self.parents
    }

    /// The node's own domain.
    pub fn domain(&self) -> &[Outcome] {
        &self.domain
    }

    /// Look up the probability row for a parent assignment.
    pub fn row(&self, parent_values: &[Outcome]) -> Option<&[f64]> {
        self.rows.get(parent_values).map(Vec::as_slice)
    }

    /// Iterate over (parent assignment, probability row) pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&Vec<Outcome>, &Vec<f64>)> {
        self.rows.iter()
    }

    /// Number of rows currently stored.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A deterministic functional conditional distribution.
///
/// The outcome is an arbitrary function of the declared parents' values; the
/// induced distribution is degenerate (probability 1 on the function value).
#[derive(Clone)]
pub struct FunctionalDistribution {
    parents: Vec<NodeName>,
    domain: Vec<Outcome>,
    func: OutcomeFn,
}

impl FunctionalDistribution {
    /// Create a functional distribution.
    ///
    /// # Examples
    ///
    /// ```
    /// use macid::cpd::FunctionalDistribution;
    /// use macid::types::Outcome;
    ///
    /// // X = S * D
    /// let dist = FunctionalDistribution::new(
    ///     ["S", "D"],
    ///     [-1, 1],
    ///     |values| Outcome::new(values.value_of("S") * values.value_of("D")),
    /// );
    /// assert_eq!(dist.parents().len(), 2);
    /// ```
    pub fn new<P, D, F>(parents: P, domain: D, func: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<NodeName>,
        D: IntoIterator<Item = i64>,
        F: Fn(&ParentValues) -> Outcome + Send + Sync + 'static,
    {
        Self {
            parents: parents.into_iter().map(Into::into).collect(),
            domain: domain.into_iter().map(Outcome::new).collect(),
            func: Arc::new(func),
        }
    }

    /// The declared parent names.
    pub fn parents(&self) -> &[NodeName] {
        &self.parents
    }

    /// The node's own domain.
    pub fn domain(&self) -> &[Outcome] {
        &self.domain
    }

    /// Evaluate the function for one parent assignment.
    pub fn evaluate(&self, values: &ParentValues) -> Outcome {
        (self.func)(values)
    }
}

impl fmt::Debug for FunctionalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionalDistribution")
            .field("parents", &self.parents)
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// A conditional distribution attached to a chance node.
#[derive(Debug, Clone)]
pub enum Distribution {
    /// Fixed tabular distribution.
    Table(TabularDistribution),
    /// Deterministic function of parent values.
    Function(FunctionalDistribution),
    /// Uniform distribution over the given domain (default for chance nodes
    /// without a specified distribution).
    Uniform { domain: Vec<Outcome> },
}

impl Distribution {
    /// Uniform distribution over an integer domain.
    pub fn uniform<D>(domain: D) -> Self
    where
        D: IntoIterator<Item = i64>,
    {
        Self::Uniform {
            domain: domain.into_iter().map(Outcome::new).collect(),
        }
    }

    /// The node's own domain under this distribution.
    pub fn domain(&self) -> &[Outcome] {
        match self {
            Self::Table(table) => table.domain(),
            Self::Function(func) => func.domain(),
            Self::Uniform { domain } => domain,
        }
    }

    /// The parent names this distribution declares, if it declares any.
    ///
    /// `Uniform` declares no parents (it is only valid on root chance nodes
    /// or as an explicit parent-independent default).
    pub fn declared_parents(&self) -> &[NodeName] {
        match self {
            Self::Table(table) => table.parents(),
            Self::Function(func) => func.parents(),
            Self::Uniform { .. } => &[],
        }
    }
}

/// A resolved tabular decision rule.
///
/// Maps each assignment of the decision's observed parents to a (possibly
/// randomized) distribution over actions. Solved rules produced by the
/// optimizer are deterministic rows; randomized rows are valid inputs for
/// hand-authored policies.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRule {
    parents: Vec<NodeName>,
    actions: Vec<Outcome>,
    rows: BTreeMap<Vec<Outcome>, Vec<f64>>,
}

impl TabularRule {
    /// Create an empty rule over the given parents and action domain.
    pub fn new<P, D>(parents: P, actions: D) -> Self
    where
        P: IntoIterator,
        P::Item: Into<NodeName>,
        D: IntoIterator<Item = i64>,
    {
        Self {
            parents: parents.into_iter().map(Into::into).collect(),
            actions: actions.into_iter().map(Outcome::new).collect(),
            rows: BTreeMap::new(),
        }
    }

    /// Add a probability row over actions for one parent assignment.
    pub fn with_row(mut self, parent_values: &[i64], probabilities: Vec<f64>) -> Self {
        let key: Vec<Outcome> = parent_values.iter().copied().map(Outcome::new).collect();
        self.rows.insert(key, probabilities);
        self
    }

    /// Insert a deterministic row choosing `action` for one parent assignment.
    ///
    /// Silently ignores actions outside the action domain; the attach-time
    /// check reports those as invalid.
    pub fn set_choice(&mut self, parent_values: Vec<Outcome>, action: Outcome) {
        let row: Vec<f64> = self
            .actions
            .iter()
            .map(|a| if *a == action { 1.0 } else { 0.0 })
            .collect();
        self.rows.insert(parent_values, row);
    }

    /// Insert a uniform row for one parent assignment.
    pub fn set_uniform(&mut self, parent_values: Vec<Outcome>) {
        let p = 1.0 / self.actions.len() as f64;
        self.rows.insert(parent_values, vec![p; self.actions.len()]);
    }

    /// Insert a randomized row from unnormalized action weights.
    ///
    /// Weights are normalized to probabilities; a zero or invalid total
    /// falls back to the uniform row. Useful for hand-authored mixed
    /// strategies.
    pub fn set_weighted(&mut self, parent_values: Vec<Outcome>, weights: &[f64]) {
        match crate::utils::normalize_weights(weights.iter().copied()) {
            Some(probabilities) if probabilities.len() == self.actions.len() => {
                self.rows.insert(parent_values, probabilities);
            }
            _ => self.set_uniform(parent_values),
        }
    }

    /// The observed parent names.
    pub fn parents(&self) -> &[NodeName] {
        &self.parents
    }

    /// The action domain.
    pub fn actions(&self) -> &[Outcome] {
        &self.actions
    }

    /// Look up the action probabilities for a parent assignment.
    pub fn row(&self, parent_values: &[Outcome]) -> Option<&[f64]> {
        self.rows.get(parent_values).map(Vec::as_slice)
    }

    /// Iterate over (parent assignment, action probabilities) pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&Vec<Outcome>, &Vec<f64>)> {
        self.rows.iter()
    }

    /// Number of rows currently stored.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Mean Shannon entropy across rows; zero for deterministic rules.
    pub fn mean_entropy(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .rows
            .values()
            .map(|row| shannon_entropy(row.iter().copied()))
            .sum();
        total / self.rows.len() as f64
    }

    /// Whether every row puts all mass on a single action.
    pub fn is_deterministic(&self) -> bool {
        self.rows
            .values()
            .all(|row| row.iter().filter(|&&p| p > 0.0).count() == 1)
    }
}

/// The rule attached to a decision node.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionRule {
    /// Domain-only placeholder: the action set is declared but no rule has
    /// been chosen yet.
    Domain(Vec<Outcome>),
    /// A concrete rule mapping observed-parent assignments to action
    /// distributions.
    Resolved(TabularRule),
}

impl DecisionRule {
    /// Placeholder rule over an integer action domain.
    pub fn domain<D>(actions: D) -> Self
    where
        D: IntoIterator<Item = i64>,
    {
        Self::Domain(actions.into_iter().map(Outcome::new).collect())
    }

    /// The action domain, whether or not the rule is resolved.
    pub fn actions(&self) -> &[Outcome] {
        match self {
            Self::Domain(actions) => actions,
            Self::Resolved(rule) => rule.actions(),
        }
    }

    /// Whether the rule is concrete.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The resolved rule, if any.
    pub fn as_resolved(&self) -> Option<&TabularRule> {
        match self {
            Self::Domain(_) => None,
            Self::Resolved(rule) => Some(rule),
        }
    }

    /// Demote a resolved rule back to its domain placeholder.
    ///
    /// Used when a structural edit invalidates a solved profile.
    pub fn unresolve(&mut self) {
        if let Self::Resolved(rule) = self {
            *self = Self::Domain(rule.actions().to_vec());
        }
    }
}

/// A deterministic real-valued utility function of parent values.
#[derive(Clone)]
pub struct UtilityFunction {
    parents: Vec<NodeName>,
    func: UtilityFn,
}

impl UtilityFunction {
    /// Create a utility function from a closure.
    ///
    /// # Examples
    ///
    /// ```
    /// use macid::cpd::UtilityFunction;
    ///
    /// // U = S * D
    /// let utility = UtilityFunction::from_fn(["S", "D"], |values| {
    ///     (values.value_of("S") * values.value_of("D")) as f64
    /// });
    /// assert_eq!(utility.parents().len(), 2);
    /// ```
    pub fn from_fn<P, F>(parents: P, func: F) -> Self
    where
        P: IntoIterator,
        P::Item: Into<NodeName>,
        F: Fn(&ParentValues) -> f64 + Send + Sync + 'static,
    {
        Self {
            parents: parents.into_iter().map(Into::into).collect(),
            func: Arc::new(func),
        }
    }

    /// Create a utility function from an explicit parent-assignment table.
    ///
    /// Assignments absent from the table evaluate to 0.0.
    pub fn from_table<P>(parents: P, table: BTreeMap<Vec<Outcome>, f64>) -> Self
    where
        P: IntoIterator,
        P::Item: Into<NodeName>,
    {
        let parents: Vec<NodeName> = parents.into_iter().map(Into::into).collect();
        Self {
            parents,
            func: Arc::new(move |values: &ParentValues| {
                let key: Vec<Outcome> = values.iter().map(|(_, v)| v).collect();
                table.get(&key).copied().unwrap_or(0.0)
            }),
        }
    }

    /// The declared parent names.
    pub fn parents(&self) -> &[NodeName] {
        &self.parents
    }

    /// Evaluate the utility for one parent assignment.
    pub fn evaluate(&self, values: &ParentValues) -> f64 {
        (self.func)(values)
    }
}

impl fmt::Debug for UtilityFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UtilityFunction")
            .field("parents", &self.parents)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::domain;

    #[test]
    fn tabular_rows_are_sorted_by_parent_assignment() {
        let table = TabularDistribution::new(["P"], [0, 1])
            .with_row(&[1], vec![0.2, 0.8])
            .with_row(&[0], vec![0.9, 0.1]);

        let keys: Vec<_> = table.rows().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![domain([0]), domain([1])]);
    }

    #[test]
    fn functional_distribution_evaluates_closure() {
        let dist = FunctionalDistribution::new(["S"], [-1, 1], |values| {
            Outcome::new(-values.value_of("S"))
        });
        let names = vec![NodeName::new("S")];
        let values = vec![Outcome::new(1)];
        let view = ParentValues::new(&names, &values);
        assert_eq!(dist.evaluate(&view), Outcome::new(-1));
    }

    #[test]
    fn decision_rule_unresolve_keeps_action_domain() {
        let mut rule = DecisionRule::Resolved(
            TabularRule::new(Vec::<NodeName>::new(), [0, 1]).with_row(&[], vec![1.0, 0.0]),
        );
        assert!(rule.is_resolved());

        rule.unresolve();
        assert!(!rule.is_resolved());
        assert_eq!(rule.actions(), domain([0, 1]).as_slice());
    }

    #[test]
    fn weighted_rows_normalize_and_fall_back_to_uniform() {
        let mut rule = TabularRule::new(Vec::<NodeName>::new(), [0, 1]);
        rule.set_weighted(vec![], &[3.0, 1.0]);
        assert_eq!(rule.row(&[]).unwrap(), &[0.75, 0.25]);

        rule.set_weighted(vec![], &[0.0, 0.0]);
        assert_eq!(rule.row(&[]).unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn deterministic_rule_has_zero_entropy() {
        let mut rule = TabularRule::new(["S"], [0, 1]);
        rule.set_choice(vec![Outcome::new(0)], Outcome::new(1));
        rule.set_choice(vec![Outcome::new(1)], Outcome::new(0));

        assert!(rule.is_deterministic());
        assert_eq!(rule.mean_entropy(), 0.0);
    }

    #[test]
    fn utility_table_defaults_to_zero_off_table() {
        let mut table = BTreeMap::new();
        table.insert(domain([1, 1]), 5.0);
        let utility = UtilityFunction::from_table(["A", "B"], table);

        let names = vec![NodeName::new("A"), NodeName::new("B")];
        let hit = vec![Outcome::new(1), Outcome::new(1)];
        let miss = vec![Outcome::new(0), Outcome::new(1)];
        assert_eq!(utility.evaluate(&ParentValues::new(&names, &hit)), 5.0);
        assert_eq!(utility.evaluate(&ParentValues::new(&names, &miss)), 0.0);
    }
}
