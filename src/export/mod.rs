//! Export functionality for reporting and external tooling
//!
//! This module provides the structural export (node/edge lists plus rule
//! resolution status) consumed by external drawing or reporting tools, and a
//! CSV export of resolved policies. The crate itself performs no rendering.

mod policy_csv;
mod structural;

pub use policy_csv::{PolicyCsvExporter, PolicyExportRecord};
pub use structural::{EdgeExport, NodeExport, StructuralExport};
