//! Ports (trait boundaries) for external dependencies.
//!
//! This module defines the interfaces between the domain layer and
//! infrastructure. Following hexagonal architecture, these traits are owned
//! by the domain and implemented by adapters in the infrastructure layer.

pub mod inference;
pub mod observer;

pub use inference::{DiscreteFactor, DiscreteNetwork, InferenceEngine};
pub use observer::{NullObserver, SolverObserver};
