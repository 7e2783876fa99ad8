pub mod action;
pub mod ladder;
pub mod transition_table;
pub mod value_iteration;

pub use action::{Action, Decision};
pub use transition_table::TransitionTable;
pub use value_iteration::{value_iteration, Solution, Status, ValueIteration};

use crate::config::ThermostatConfig;
use crate::error::{Error, Result};

/// A thermostat Markov Decision Process: validated constants plus the
/// transition tables of both actions.
///
/// Holding a `ThermostatMdp` means the tables agree on their states and the
/// desired temperature is one of them, so value iteration can start without
/// further checks.
#[derive(Debug, Clone)]
pub struct ThermostatMdp {
    config: ThermostatConfig,
    on: TransitionTable,
    off: TransitionTable,
    terminal: usize,
}

impl ThermostatMdp {
    /// # Errors
    /// - `Error::StateCountMismatch` if the tables have different sizes
    /// - `Error::StateOrderMismatch` if they list their states differently
    /// - `Error::StateNotFound` if no state is labelled with the desired
    ///   temperature
    pub fn new(config: ThermostatConfig, on: TransitionTable, off: TransitionTable) -> Result<Self> {
        if on.len() != off.len() {
            return Err(Error::StateCountMismatch {
                on: on.len(),
                off: off.len(),
            });
        }
        if let Some((index, (&a, &b))) = on
            .labels()
            .iter()
            .zip(off.labels())
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            return Err(Error::StateOrderMismatch { index, on: a, off: b });
        }
        let terminal = on
            .index_of(config.desired_temperature())
            .ok_or(Error::StateNotFound(config.desired_temperature()))?;

        Ok(Self {
            config,
            on,
            off,
            terminal,
        })
    }

    pub fn config(&self) -> &ThermostatConfig {
        &self.config
    }

    pub fn table(&self, action: Action) -> &TransitionTable {
        match action {
            Action::On => &self.on,
            Action::Off => &self.off,
        }
    }

    /// State labels shared by both tables.
    pub fn labels(&self) -> &[f64] {
        self.on.labels()
    }

    pub fn num_states(&self) -> usize {
        self.on.len()
    }

    /// Index of the absorbing, zero-cost state.
    pub fn terminal(&self) -> usize {
        self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleBound;
    use ndarray::{array, Array2};

    fn identity(labels: &[f64]) -> TransitionTable {
        TransitionTable::new(labels.to_vec(), Array2::eye(labels.len())).unwrap()
    }

    #[test]
    fn test_new_locates_terminal() {
        let labels = [21.0, 21.5, 22.0, 22.5];
        let mdp = ThermostatMdp::new(ThermostatConfig::default(), identity(&labels), identity(&labels))
            .unwrap();
        assert_eq!(mdp.terminal(), 2);
        assert_eq!(mdp.num_states(), 4);
        assert_eq!(mdp.labels(), &labels);
    }

    #[test]
    fn test_state_count_mismatch() {
        let err = ThermostatMdp::new(
            ThermostatConfig::default(),
            identity(&[21.5, 22.0, 22.5]),
            identity(&[21.5, 22.0]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::StateCountMismatch { on: 3, off: 2 }));
    }

    #[test]
    fn test_state_order_mismatch() {
        let err = ThermostatMdp::new(
            ThermostatConfig::default(),
            identity(&[21.5, 22.0]),
            identity(&[22.0, 22.5]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::StateOrderMismatch { index: 0, .. }));
    }

    #[test]
    fn test_desired_temperature_missing_from_tables() {
        let config = ThermostatConfig::new(18.0, 1.0, 1.0, CycleBound::Unbounded).unwrap();
        let table = TransitionTable::new(vec![21.5, 22.0], array![[0.0, 1.0], [0.0, 1.0]]).unwrap();
        let err = ThermostatMdp::new(config, table.clone(), table).unwrap_err();
        assert!(matches!(err, Error::StateNotFound(t) if t == 18.0));
    }
}
