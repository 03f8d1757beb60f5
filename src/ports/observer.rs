//! Solver-observer port - abstraction for solve-progress observation
//!
//! Observers can be composed to collect different kinds of data while a
//! policy optimization or equilibrium search runs, without coupling solver
//! logic to specific output mechanisms.
//!
//! # Event Sequence
//!
//! 1. `on_solve_start(total_decisions)` - once at the beginning
//! 2. For each best-response pass (a single pass for backward induction):
//!    - `on_pass_start(pass)`
//!    - `on_decision_solved(decision, changed)` - per decision rule computed
//!    - `on_pass_end(pass, rules_changed)`
//! 3. `on_solve_end()` - once at the end, converged or not

use crate::{Result, identifiers::NodeName};

/// Observer trait for monitoring solver progress.
///
/// All methods have do-nothing default implementations; adapters override
/// what they need.
pub trait SolverObserver {
    /// Called when a solve starts, with the number of decision nodes.
    fn on_solve_start(&mut self, _total_decisions: usize) -> Result<()> {
        Ok(())
    }

    /// Called at the start of a best-response pass (1-based).
    fn on_pass_start(&mut self, _pass: usize) -> Result<()> {
        Ok(())
    }

    /// Called after each decision rule is computed.
    ///
    /// `changed` is true when the new rule differs from the previous one.
    fn on_decision_solved(&mut self, _decision: &NodeName, _changed: bool) -> Result<()> {
        Ok(())
    }

    /// Called at the end of a pass with the number of rules that changed.
    fn on_pass_end(&mut self, _pass: usize, _rules_changed: usize) -> Result<()> {
        Ok(())
    }

    /// Called when the solve finishes, whether converged or exhausted.
    fn on_solve_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SolverObserver for NullObserver {}
