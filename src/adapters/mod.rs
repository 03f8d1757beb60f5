//! Adapters implementing the domain ports.

pub mod progress;
pub mod variable_elimination;

pub use progress::ProgressObserver;
pub use variable_elimination::VariableElimination;
