//! Causal influence diagrams for decision-making agents
//!
//! This crate provides:
//! - Typed causal influence diagrams (CIDs) and multi-agent CIDs (MACIDs)
//!   with chance, decision, and utility nodes
//! - Exact expected-utility and marginal queries by variable elimination
//! - Optimal-policy computation for single-agent diagrams by backward
//!   induction
//! - Nash and subgame-perfect equilibrium search for multi-agent diagrams
//! - Graphical incentive criteria (response incentive, instrumental control
//!   incentive, value of information) decided purely from structure

pub mod adapters;
pub mod cpd;
pub mod criteria;
pub mod diagram;
pub mod error;
pub mod export;
pub mod identifiers;
pub mod oracle;
pub mod paths;
pub mod ports;
pub mod solve;
pub mod types;
pub mod utils;

pub use cpd::{DecisionRule, Distribution, TabularDistribution, TabularRule, UtilityFunction};
pub use diagram::{Diagram, DiagramBuilder, NodeKind, SampleDraw};
pub use error::{Error, Result};
pub use identifiers::{AgentId, NodeName};
pub use oracle::DistributionOracle;
pub use solve::{
    Equilibrium, EquilibriumConfig, EquilibriumSolver, MethodPreference, Policy, PolicyOptimizer,
    SolutionMethod, SolverState,
};
pub use types::Outcome;
