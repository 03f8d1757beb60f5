//! Progress-bar observer for long-running solves.

use indicatif::{ProgressBar, ProgressStyle};

use crate::{Result, identifiers::NodeName, ports::SolverObserver};

/// Progress bar observer - shows solve progress per best-response pass.
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
}

impl ProgressObserver {
    /// Create a new progress observer.
    pub fn new() -> Self {
        Self { progress_bar: None }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverObserver for ProgressObserver {
    fn on_solve_start(&mut self, total_decisions: usize) -> Result<()> {
        let pb = ProgressBar::new(total_decisions as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} decisions ({msg})")
                .map_err(|e| crate::Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_pass_start(&mut self, pass: usize) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(0);
            pb.set_message(format!("pass {pass}"));
        }
        Ok(())
    }

    fn on_decision_solved(&mut self, _decision: &NodeName, _changed: bool) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
        Ok(())
    }

    fn on_pass_end(&mut self, pass: usize, rules_changed: usize) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("pass {pass}: {rules_changed} rules changed"));
        }
        Ok(())
    }

    fn on_solve_end(&mut self) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_and_clear();
        }
        Ok(())
    }
}
