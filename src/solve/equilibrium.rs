//! Equilibrium search for multi-agent diagrams.
//!
//! The solver is an explicit state machine over policy profiles:
//! `Unsolved -> Iterating -> Converged | NotFound`, driven by a pass counter
//! so convergence and non-termination are externally observable.
//!
//! When the decisions admit a total order respecting information precedence
//! across agents, a single backward-induction pass yields a subgame-perfect
//! equilibrium and is preferred. Otherwise the solver iterates best
//! responses agent by agent until a full pass changes no rule (a Nash
//! equilibrium) or the pass bound is exhausted, in which case the best
//! profile found is reported inside the error rather than silently returned.

use std::collections::BTreeSet;

use crate::{
    Error, Result,
    diagram::{Diagram, NodeKind},
    identifiers::NodeName,
    ports::{InferenceEngine, NullObserver, SolverObserver},
};

use super::{
    Policy, SolutionMethod,
    policy::{decisions_in_reverse_order, optimize_decision, uniform_rule},
};

/// Which solution method the solver should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodPreference {
    /// Backward induction when the information structure allows it,
    /// iterative best response otherwise.
    #[default]
    Auto,
    /// Require backward induction; fail when no total information order
    /// exists.
    SubgamePerfect,
    /// Always iterate best responses.
    IterativeBestResponse,
}

/// Configuration for the equilibrium solver.
#[derive(Debug, Clone, Copy)]
pub struct EquilibriumConfig {
    /// Bound on best-response passes before giving up.
    pub max_passes: usize,
    /// Method preference.
    pub method: MethodPreference,
}

impl EquilibriumConfig {
    /// Default configuration: automatic method choice, 100-pass bound.
    pub fn new() -> Self {
        Self {
            max_passes: 100,
            method: MethodPreference::default(),
        }
    }

    /// Set the pass bound.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Set the method preference.
    pub fn with_method(mut self, method: MethodPreference) -> Self {
        self.method = method;
        self
    }
}

impl Default for EquilibriumConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Externally observable solver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverState {
    /// No solve has run; every decision holds a placeholder rule.
    #[default]
    Unsolved,
    /// A best-response pass is in flight (1-based counter).
    Iterating { pass: usize },
    /// A full pass produced no rule change.
    Converged { passes: usize },
    /// The pass bound was exhausted without convergence.
    NotFound { passes: usize },
}

/// A computed equilibrium with the method that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Equilibrium {
    /// One resolved rule per decision node.
    pub policy: Policy,
    /// The algorithm that produced the profile.
    pub method: SolutionMethod,
    /// Number of best-response passes taken (1 for backward induction).
    pub passes: usize,
}

/// Nash / subgame-perfect equilibrium solver for multi-agent diagrams.
pub struct EquilibriumSolver<'e> {
    engine: &'e dyn InferenceEngine,
    config: EquilibriumConfig,
    state: SolverState,
}

impl<'e> EquilibriumSolver<'e> {
    /// Create a solver with the default configuration.
    pub fn new(engine: &'e dyn InferenceEngine) -> Self {
        Self::with_config(engine, EquilibriumConfig::new())
    }

    /// Create a solver with an explicit configuration.
    pub fn with_config(engine: &'e dyn InferenceEngine, config: EquilibriumConfig) -> Self {
        Self {
            engine,
            config,
            state: SolverState::Unsolved,
        }
    }

    /// The solver's current state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Solve for one equilibrium and attach the profile to the diagram.
    ///
    /// # Errors
    ///
    /// - [`Error::NoFeasibleOrder`] when backward induction was demanded but
    ///   the decisions admit no total information order.
    /// - [`Error::NoEquilibriumFound`] when iterative best response exhausts
    ///   its pass bound; the error carries the best profile found.
    pub fn solve(&mut self, diagram: &mut Diagram) -> Result<Equilibrium> {
        self.solve_observed(diagram, &mut NullObserver)
    }

    /// Solve, reporting progress to an observer.
    pub fn solve_observed(
        &mut self,
        diagram: &mut Diagram,
        observer: &mut dyn SolverObserver,
    ) -> Result<Equilibrium> {
        let equilibrium = self.search(diagram, observer)?;
        equilibrium.policy.apply_to(diagram)?;
        Ok(equilibrium)
    }

    fn search(
        &mut self,
        diagram: &Diagram,
        observer: &mut dyn SolverObserver,
    ) -> Result<Equilibrium> {
        self.state = SolverState::Unsolved;
        let decisions = decisions_in_reverse_order(diagram);
        observer.on_solve_start(decisions.len())?;

        if decisions.is_empty() {
            self.state = SolverState::Converged { passes: 0 };
            observer.on_solve_end()?;
            return Ok(Equilibrium {
                policy: Policy::new(),
                method: SolutionMethod::SubgamePerfect,
                passes: 0,
            });
        }

        let use_backward_induction = match self.config.method {
            MethodPreference::Auto => total_information_order(diagram),
            MethodPreference::SubgamePerfect => {
                if !total_information_order(diagram) {
                    return Err(Error::NoFeasibleOrder {
                        reason: "subgame-perfect mode requires a total order over decisions \
                                 respecting information precedence across agents"
                            .to_string(),
                    });
                }
                true
            }
            MethodPreference::IterativeBestResponse => false,
        };

        let result = if use_backward_induction {
            self.backward_induction(diagram, &decisions, observer)
        } else {
            self.iterate_best_responses(diagram, observer)
        };
        observer.on_solve_end()?;
        result
    }

    /// Single-pass backward induction over the total decision order.
    fn backward_induction(
        &mut self,
        diagram: &Diagram,
        decisions: &[NodeName],
        observer: &mut dyn SolverObserver,
    ) -> Result<Equilibrium> {
        self.state = SolverState::Iterating { pass: 1 };
        observer.on_pass_start(1)?;

        let mut resolved = Policy::new();
        for decision in decisions {
            let agent = match diagram.kind_of(decision.as_str())? {
                NodeKind::Decision(agent) => agent,
                _ => unreachable!("decision list only holds decisions"),
            };
            let rule =
                optimize_decision(diagram, self.engine, agent, decision.as_str(), &resolved)?;
            observer.on_decision_solved(decision, true)?;
            resolved.insert(decision.clone(), rule);
        }

        observer.on_pass_end(1, decisions.len())?;
        self.state = SolverState::Converged { passes: 1 };
        Ok(Equilibrium {
            policy: resolved,
            method: SolutionMethod::SubgamePerfect,
            passes: 1,
        })
    }

    /// Fixed-point search: each agent best-responds in turn until a full
    /// pass changes nothing.
    fn iterate_best_responses(
        &mut self,
        diagram: &Diagram,
        observer: &mut dyn SolverObserver,
    ) -> Result<Equilibrium> {
        // Start from the uniform profile.
        let mut profile = Policy::new();
        for decision in diagram.decisions() {
            profile.insert(decision.clone(), uniform_rule(diagram, decision.as_str())?);
        }

        let agents = diagram.agents();
        for pass in 1..=self.config.max_passes {
            self.state = SolverState::Iterating { pass };
            observer.on_pass_start(pass)?;

            let mut rules_changed = 0usize;
            for &agent in &agents {
                // Best-respond on this agent's decisions in reverse
                // topological order, everything else held fixed.
                for decision in decisions_in_reverse_order(diagram) {
                    if !matches!(
                        diagram.kind_of(decision.as_str())?,
                        NodeKind::Decision(a) if a == agent
                    ) {
                        continue;
                    }
                    let rule = optimize_decision(
                        diagram,
                        self.engine,
                        agent,
                        decision.as_str(),
                        &profile,
                    )?;
                    let changed = profile.get(decision.as_str()) != Some(&rule);
                    observer.on_decision_solved(&decision, changed)?;
                    if changed {
                        rules_changed += 1;
                    }
                    profile.insert(decision, rule);
                }
            }
            observer.on_pass_end(pass, rules_changed)?;

            if rules_changed == 0 {
                self.state = SolverState::Converged { passes: pass };
                return Ok(Equilibrium {
                    policy: profile,
                    method: SolutionMethod::IterativeBestResponse,
                    passes: pass,
                });
            }
        }

        self.state = SolverState::NotFound {
            passes: self.config.max_passes,
        };
        Err(Error::NoEquilibriumFound {
            passes: self.config.max_passes,
            best: profile,
        })
    }
}

/// Whether the decisions admit a total order respecting information
/// precedence across agents: consecutive decisions in topological order must
/// each observe the previous decision and everything it observed.
fn total_information_order(diagram: &Diagram) -> bool {
    let decision_set = diagram.decisions();
    let ordered: Vec<NodeName> = diagram
        .topological_order()
        .into_iter()
        .filter(|n| decision_set.contains(n))
        .collect();

    for window in ordered.windows(2) {
        let earlier = window[0].as_str();
        let later = window[1].as_str();
        let later_parents: BTreeSet<NodeName> = match diagram.parents_of(later) {
            Ok(parents) => parents.into_iter().collect(),
            Err(_) => return false,
        };
        if !later_parents.contains(earlier) {
            return false;
        }
        match diagram.parents_of(earlier) {
            Ok(parents) => {
                if parents.iter().any(|p| !later_parents.contains(p)) {
                    return false;
                }
            }
            Err(_) => return false,
        }
    }
    true
}
