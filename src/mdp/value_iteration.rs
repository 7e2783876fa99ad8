//! Value iteration on the undiscounted Bellman equation of a thermostat MDP.
//!
//! Every sweep computes, for each non-terminal state `s`,
//!
//! ```text
//! v_on  = sum_{d : P_on[s][d]  != 0} V[d] * P_on[s][d]  + COST_ON
//! v_off = sum_{d : P_off[s][d] != 0} V[d] * P_off[s][d] + COST_OFF
//! ```
//!
//! and keeps the smaller of the two, preferring ON on a tie. The terminal
//! state is pinned at value zero. Sweeps repeat until the value vector stops
//! changing or the configured number of cycles has been performed.

use crate::config::CycleBound;
use crate::error::{Error, Result};
use crate::mdp::{Action, Decision, ThermostatMdp};

/// Decimal digits kept when running to convergence.
///
/// The fixed point is only approached asymptotically; rounding gives the
/// iteration a fixed point it can actually reach.
pub const ROUNDING_DIGITS: usize = 10;

/// Where the engine is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    /// A sweep reproduced the previous value vector.
    Converged,
    /// The configured number of sweeps has been performed.
    CycleLimitReached,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Temperature the run was asked to reach.
    pub desired_temperature: f64,
    /// State labels, in table order.
    pub labels: Vec<f64>,
    /// Final value of every state.
    pub values: Vec<f64>,
    /// Final decision for every state.
    pub policy: Vec<Decision>,
    /// Sweeps performed, including the one that confirmed convergence.
    pub sweeps: usize,
    /// First sweep that produced the final value vector (0 if the initial
    /// all-zero vector was already a fixed point).
    pub settled_at: usize,
    pub status: Status,
}

impl Solution {
    pub fn decision_for(&self, label: f64) -> Option<Decision> {
        let index = self.labels.iter().position(|&l| l == label)?;
        self.policy.get(index).copied()
    }

    pub fn value_for(&self, label: f64) -> Option<f64> {
        let index = self.labels.iter().position(|&l| l == label)?;
        self.values.get(index).copied()
    }

    /// `(label, value, decision)` for every state in table order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, Decision)> + '_ {
        self.labels
            .iter()
            .zip(&self.values)
            .zip(&self.policy)
            .map(|((&label, &value), &decision)| (label, value, decision))
    }
}

/// Stepwise value iteration over a [`ThermostatMdp`].
///
/// The engine starts in [`Status::Running`] with every value at zero. Each
/// call to [`ValueIteration::step`] performs one sweep and replaces the value
/// vector and policy as a whole.
#[derive(Debug, Clone)]
pub struct ValueIteration<'a> {
    mdp: &'a ThermostatMdp,
    values: Vec<f64>,
    policy: Vec<Decision>,
    sweeps: usize,
    settled_at: usize,
    status: Status,
}

impl<'a> ValueIteration<'a> {
    pub fn new(mdp: &'a ThermostatMdp) -> Self {
        Self {
            mdp,
            values: vec![0.0; mdp.num_states()],
            policy: Vec::new(),
            sweeps: 0,
            settled_at: 0,
            status: Status::Running,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Policy of the latest sweep; empty before the first one.
    pub fn policy(&self) -> &[Decision] {
        &self.policy
    }

    /// Performs one sweep and returns the resulting status.
    ///
    /// Once the engine has left `Running` this does nothing.
    pub fn step(&mut self) -> Status {
        if self.status != Status::Running {
            return self.status;
        }

        let (values, policy) = self.sweep(&self.values);
        self.sweeps += 1;
        self.policy = policy;
        let unchanged = values == self.values;

        match self.mdp.config().cycles() {
            CycleBound::Unbounded => {
                if unchanged {
                    self.status = Status::Converged;
                } else {
                    log::debug!(
                        "sweep {}: largest change {:e}",
                        self.sweeps,
                        largest_change(&self.values, &values)
                    );
                    self.values = values;
                    self.settled_at = self.sweeps;
                }
            }
            CycleBound::Exactly(limit) => {
                if !unchanged {
                    self.settled_at = self.sweeps;
                }
                log::debug!("sweep {} of {}", self.sweeps, limit);
                self.values = values;
                if self.sweeps >= limit.get() {
                    self.status = Status::CycleLimitReached;
                }
            }
        }
        self.status
    }

    /// One Bellman sweep over `values`, without touching the engine state.
    ///
    /// Returns the candidate value vector and the greedy policy it implies.
    ///
    /// # Panics
    /// Panics if `values` does not hold exactly one entry per state.
    pub fn sweep(&self, values: &[f64]) -> (Vec<f64>, Vec<Decision>) {
        let mdp = self.mdp;
        let n = mdp.num_states();
        assert_eq!(values.len(), n, "value vector must hold one entry per state");

        let config = mdp.config();
        let round = config.rounds_values();
        let action_value = |s: usize, action: Action| {
            let v = mdp.table(action).expected_value(s, values) + config.cost(action);
            if round {
                round_to(v, ROUNDING_DIGITS)
            } else {
                v
            }
        };

        let mut next = Vec::with_capacity(n);
        let mut policy = Vec::with_capacity(n);
        for s in 0..n {
            if s == mdp.terminal() {
                next.push(0.0);
                policy.push(Decision::TargetReached);
                continue;
            }
            let v_on = action_value(s, Action::On);
            let v_off = action_value(s, Action::Off);
            if v_on <= v_off {
                next.push(v_on);
                policy.push(Decision::Act(Action::On));
            } else {
                next.push(v_off);
                policy.push(Decision::Act(Action::Off));
            }
        }
        (next, policy)
    }

    pub fn into_solution(self) -> Solution {
        Solution {
            desired_temperature: self.mdp.config().desired_temperature(),
            labels: self.mdp.labels().to_vec(),
            values: self.values,
            policy: self.policy,
            sweeps: self.sweeps,
            settled_at: self.settled_at,
            status: self.status,
        }
    }

    /// Steps until the engine stops.
    ///
    /// # Errors
    /// Returns `Error::SafetyCapExceeded` if an unbounded run has not
    /// converged within the configured safety cap. Without a cap an unbounded
    /// run over a non-contracting table never returns.
    pub fn run(mut self) -> Result<Solution> {
        let config = self.mdp.config();
        let cap = match config.cycles() {
            CycleBound::Unbounded => config.safety_cap(),
            CycleBound::Exactly(_) => None,
        };

        while self.step() == Status::Running {
            if let Some(cap) = cap {
                if self.sweeps >= cap {
                    log::warn!("no convergence after {} sweeps, giving up", self.sweeps);
                    return Err(Error::SafetyCapExceeded(cap));
                }
            }
        }

        log::info!(
            "value iteration stopped after {} sweeps ({:?}, settled at sweep {})",
            self.sweeps,
            self.status,
            self.settled_at
        );
        Ok(self.into_solution())
    }
}

/// Solves `mdp` with value iteration.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use thermostat_mdp::config::{CycleBound, ThermostatConfig};
/// use thermostat_mdp::mdp::{value_iteration, Action, Decision, ThermostatMdp, TransitionTable};
///
/// // 21.5 reaches 22.0 in one step whatever the heater does.
/// let table = TransitionTable::new(vec![21.5, 22.0], array![[0.0, 1.0], [0.0, 1.0]]).unwrap();
/// let config = ThermostatConfig::new(22.0, 3.0, 1.0, CycleBound::Unbounded).unwrap();
/// let mdp = ThermostatMdp::new(config, table.clone(), table).unwrap();
///
/// let solution = value_iteration(&mdp).unwrap();
/// assert_eq!(solution.policy, vec![Decision::Act(Action::Off), Decision::TargetReached]);
/// assert_eq!(solution.values, vec![1.0, 0.0]);
/// ```
pub fn value_iteration(mdp: &ThermostatMdp) -> Result<Solution> {
    ValueIteration::new(mdp).run()
}

/// Rounds the exact binary value of `value` to `digits` decimals, ties to
/// even.
///
/// Going through the correctly rounded decimal form avoids the error that
/// scaling by `10^digits` introduces on near-ties.
fn round_to(value: f64, digits: usize) -> f64 {
    format!("{value:.digits$}").parse().unwrap_or(value)
}

fn largest_change(previous: &[f64], next: &[f64]) -> f64 {
    previous
        .iter()
        .zip(next)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
