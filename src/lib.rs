pub mod config;
pub mod error;
pub mod mdp;
pub mod report;

pub use config::{ConfigFile, CycleBound, CycleSpec, TableFiles, TablePaths, ThermostatConfig};
pub use error::{Error, Result};
pub use mdp::{
    value_iteration, Action, Decision, Solution, Status, ThermostatMdp, TransitionTable,
    ValueIteration,
};
pub use report::PolicyReport;
