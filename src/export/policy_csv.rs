//! CSV export of resolved policies for analysis and research.

use std::path::Path;

use serde::Serialize;

use crate::{Error, Result, cpd::DecisionRule, diagram::Diagram};

/// A single row in the policy CSV export: one (decision, context, action)
/// probability entry.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyExportRecord {
    /// Decision node name.
    pub decision: String,
    /// Observed-parent assignment, formatted `name=value;name=value`.
    pub context: String,
    /// Action value.
    pub action: i64,
    /// Probability of the action in this context.
    pub probability: f64,
    /// Mean Shannon entropy of the whole rule (repeated per row).
    pub rule_entropy: f64,
}

/// Exporter for resolved-policy CSV files.
pub struct PolicyCsvExporter;

impl PolicyCsvExporter {
    /// Collect the export rows for every resolved decision rule.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedDecision`] if any decision rule is still a
    /// placeholder.
    pub fn collect_records(diagram: &Diagram) -> Result<Vec<PolicyExportRecord>> {
        let mut records = Vec::new();
        for decision in diagram.decisions() {
            let rule = match diagram.decision_rule(decision.as_str())? {
                Some(DecisionRule::Resolved(rule)) => rule,
                _ => {
                    return Err(Error::UnresolvedDecision {
                        decision: decision.clone(),
                    });
                }
            };
            let entropy = rule.mean_entropy();
            for (context, row) in rule.rows() {
                let context_label = rule
                    .parents()
                    .iter()
                    .zip(context.iter())
                    .map(|(parent, value)| format!("{parent}={value}"))
                    .collect::<Vec<_>>()
                    .join(";");
                for (action, probability) in rule.actions().iter().zip(row.iter()) {
                    records.push(PolicyExportRecord {
                        decision: decision.to_string(),
                        context: context_label.clone(),
                        action: action.value(),
                        probability: *probability,
                        rule_entropy: entropy,
                    });
                }
            }
        }
        Ok(records)
    }

    /// Export every resolved decision rule to a CSV file.
    ///
    /// Returns the number of rows written.
    pub fn export(diagram: &Diagram, path: &Path) -> Result<usize> {
        let records = Self::collect_records(diagram)?;
        let mut writer = csv::Writer::from_path(path)?;
        for record in &records {
            writer.serialize(record)?;
        }
        writer.flush().map_err(|source| Error::Io {
            operation: "flush policy CSV".to_string(),
            source,
        })?;
        Ok(records.len())
    }
}
