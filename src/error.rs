//! Error types for the macid crate

use thiserror::Error;

use crate::identifiers::NodeName;

/// Main error type for the macid crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("adding edge {parent} -> {child} would create a directed cycle")]
    Cycle { parent: NodeName, child: NodeName },

    #[error("node '{name}' is not present in the diagram")]
    UnknownNode { name: NodeName },

    #[error("node '{name}' already exists in the diagram")]
    DuplicateNode { name: NodeName },

    #[error("utility node '{utility}' cannot have children (attempted edge to '{child}')")]
    UtilityHasChildren { utility: NodeName, child: NodeName },

    #[error("distribution for '{node}' does not match the diagram: {reason}")]
    DomainMismatch { node: NodeName, reason: String },

    #[error("invalid distribution for '{node}': {reason}")]
    InvalidDistribution { node: NodeName, reason: String },

    #[error("decision node '{decision}' still holds an unresolved rule")]
    UnresolvedDecision { decision: NodeName },

    #[error("node '{node}' is not a decision node")]
    NotADecision { node: NodeName },

    #[error("not a path in the diagram: {reason}")]
    InvalidPath { reason: String },

    #[error(
        "diagram has {agents} agents; this operation is only valid for single-agent diagrams \
         (use the equilibrium solver for multi-agent diagrams)"
    )]
    MultiAgent { agents: usize },

    #[error("no feasible decision order: {reason}")]
    NoFeasibleOrder { reason: String },

    #[error(
        "no equilibrium found after {passes} best-response passes; \
         the best profile found is attached"
    )]
    NoEquilibriumFound {
        passes: usize,
        best: crate::solve::Policy,
    },

    #[error("conditioning event has zero probability ({context})")]
    ZeroProbabilityEvidence { context: String },

    #[error("node '{node}' is a {kind} node and cannot accept {attachment}")]
    WrongAttachment {
        node: NodeName,
        kind: &'static str,
        attachment: &'static str,
    },

    #[error("diagram is not fully specified: {reason}")]
    IncompleteDiagram { reason: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
