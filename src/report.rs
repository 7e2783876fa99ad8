//! Human-readable rendering of a [`Solution`].

use std::fmt;

use crate::mdp::{Solution, Status};

/// Lists the chosen action for every state under the desired temperature.
///
/// Tables only load with ascending ladder labels, so table order is
/// coldest to warmest.
///
/// ```text
/// Desired temperature: 22.0
/// State: 16.0  Optimal policy: ON
/// ...
/// State: 22.0  Optimal policy: DESIRED TEMPERATURE
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PolicyReport<'a> {
    solution: &'a Solution,
    show_values: bool,
    show_summary: bool,
}

impl<'a> PolicyReport<'a> {
    pub fn new(solution: &'a Solution) -> Self {
        Self {
            solution,
            show_values: false,
            show_summary: false,
        }
    }

    /// Adds the value of each state to its line.
    pub fn with_values(mut self, show: bool) -> Self {
        self.show_values = show;
        self
    }

    /// Ends the report with how and when the run stopped.
    pub fn with_summary(mut self, show: bool) -> Self {
        self.show_summary = show;
        self
    }
}

impl fmt::Display for PolicyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let solution = self.solution;
        writeln!(f, "Desired temperature: {:.1}", solution.desired_temperature)?;
        for (label, value, decision) in solution.iter() {
            write!(f, "State: {label:.1}  Optimal policy: {decision}")?;
            if self.show_values {
                write!(f, "  Value: {value:.4}")?;
            }
            writeln!(f)?;
        }
        if self.show_summary {
            match solution.status {
                Status::Converged => writeln!(
                    f,
                    "Converged after {} sweeps (stable since sweep {})",
                    solution.sweeps, solution.settled_at
                )?,
                Status::CycleLimitReached => {
                    writeln!(f, "Stopped after the configured {} sweeps", solution.sweeps)?
                }
                Status::Running => writeln!(f, "Still running after {} sweeps", solution.sweeps)?,
            }
        }
        Ok(())
    }
}
