//! Run configuration: the validated constants the engine consumes, and the
//! TOML file they can be loaded from.

use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::mdp::{ladder, Action};

/// Default desired temperature.
pub const DEFAULT_DESIRED_TEMPERATURE: f64 = 22.0;
/// Default cost of one step with the heater on.
pub const DEFAULT_COST_ON: f64 = 6.7793;
/// Default cost of one step with the heater off.
pub const DEFAULT_COST_OFF: f64 = 0.610137;

/// How many sweeps value iteration may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleBound {
    /// Sweep until the rounded value vector stops changing.
    #[default]
    Unbounded,
    /// Perform exactly this many sweeps, without rounding.
    Exactly(NonZeroUsize),
}

impl CycleBound {
    /// Builds a bound from a raw integer, rejecting zero and negatives.
    pub fn exactly(cycles: i64) -> Result<Self> {
        usize::try_from(cycles)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(CycleBound::Exactly)
            .ok_or_else(|| Error::InvalidCycleBound(cycles.to_string()))
    }

    pub fn limit(self) -> Option<usize> {
        match self {
            CycleBound::Unbounded => None,
            CycleBound::Exactly(n) => Some(n.get()),
        }
    }
}

impl FromStr for CycleBound {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") {
            return Ok(CycleBound::Unbounded);
        }
        s.parse::<i64>()
            .map_err(|_| Error::InvalidCycleBound(s.to_string()))
            .and_then(CycleBound::exactly)
    }
}

impl fmt::Display for CycleBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleBound::Unbounded => f.write_str("unbounded"),
            CycleBound::Exactly(n) => write!(f, "{n}"),
        }
    }
}

/// Validated thermostat constants.
///
/// Construction is the only place validation happens; a value of this type
/// always has a desired temperature on the ladder and finite costs.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermostatConfig {
    desired_temperature: f64,
    cost_on: f64,
    cost_off: f64,
    cycles: CycleBound,
    safety_cap: Option<NonZeroUsize>,
}

impl ThermostatConfig {
    /// # Errors
    /// - `Error::TemperatureOffLadder` if `desired_temperature` is not one of
    ///   16.0, 16.5, ..., 25.0
    /// - `Error::InvalidCost` if either cost is NaN or infinite
    pub fn new(
        desired_temperature: f64,
        cost_on: f64,
        cost_off: f64,
        cycles: CycleBound,
    ) -> Result<Self> {
        if !ladder::is_on_ladder(desired_temperature) {
            return Err(Error::TemperatureOffLadder(desired_temperature));
        }
        for (action, value) in [(Action::On, cost_on), (Action::Off, cost_off)] {
            if !value.is_finite() {
                return Err(Error::InvalidCost { action, value });
            }
        }

        Ok(Self {
            desired_temperature,
            cost_on,
            cost_off,
            cycles,
            safety_cap: None,
        })
    }

    /// Aborts an unbounded run with `Error::SafetyCapExceeded` if it has not
    /// converged after `cap` sweeps. Has no effect on bounded runs.
    pub fn with_safety_cap(mut self, cap: NonZeroUsize) -> Self {
        self.safety_cap = Some(cap);
        self
    }

    pub fn desired_temperature(&self) -> f64 {
        self.desired_temperature
    }

    pub fn cost(&self, action: Action) -> f64 {
        match action {
            Action::On => self.cost_on,
            Action::Off => self.cost_off,
        }
    }

    pub fn cycles(&self) -> CycleBound {
        self.cycles
    }

    pub fn safety_cap(&self) -> Option<usize> {
        self.safety_cap.map(NonZeroUsize::get)
    }

    /// Values are rounded only when no explicit cycle bound is set.
    pub fn rounds_values(&self) -> bool {
        self.cycles == CycleBound::Unbounded
    }
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            desired_temperature: DEFAULT_DESIRED_TEMPERATURE,
            cost_on: DEFAULT_COST_ON,
            cost_off: DEFAULT_COST_OFF,
            cycles: CycleBound::Unbounded,
            safety_cap: None,
        }
    }
}

/// Paths of the ON and OFF transition tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub on: PathBuf,
    pub off: PathBuf,
}

impl Default for TablePaths {
    fn default() -> Self {
        Self {
            on: PathBuf::from("data/prob_on.csv"),
            off: PathBuf::from("data/prob_off.csv"),
        }
    }
}

/// The `cycles` key as written: a sweep count or the word `unbounded`.
///
/// Kept unvalidated so a bad file value can still be overridden before
/// [`ConfigFile::to_config`] checks it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CycleSpec {
    Count(i64),
    Keyword(String),
}

impl CycleSpec {
    pub fn resolve(&self) -> Result<CycleBound> {
        match self {
            CycleSpec::Count(n) => CycleBound::exactly(*n),
            CycleSpec::Keyword(k) => k.parse(),
        }
    }
}

impl From<CycleBound> for CycleSpec {
    fn from(bound: CycleBound) -> Self {
        match bound {
            CycleBound::Unbounded => CycleSpec::Keyword("unbounded".to_string()),
            CycleBound::Exactly(n) => {
                CycleSpec::Count(i64::try_from(n.get()).unwrap_or(i64::MAX))
            }
        }
    }
}

/// The `[tables]` section; either path may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableFiles {
    pub on: Option<PathBuf>,
    pub off: Option<PathBuf>,
}

/// On-disk configuration, e.g.
///
/// ```toml
/// desired_temperature = 22
/// cost_on = 6.7793
/// cost_off = 0.610137
/// cycles = "unbounded"
///
/// [tables]
/// on = "prob_on.csv"
/// off = "prob_off.csv"
/// ```
///
/// Every key is optional; missing keys take the defaults. Table paths are
/// relative to the directory holding the file. Nothing is validated until
/// [`ConfigFile::to_config`], so command-line values can be layered on top
/// with [`ConfigFile::merge`] first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub desired_temperature: Option<f64>,
    pub cost_on: Option<f64>,
    pub cost_off: Option<f64>,
    pub cycles: Option<CycleSpec>,
    pub safety_cap: Option<i64>,
    #[serde(default)]
    pub tables: TableFiles,
}

impl ConfigFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file: Self = text.parse()?;
        if let Some(dir) = path.parent() {
            for table in [&mut file.tables.on, &mut file.tables.off].into_iter().flatten() {
                *table = dir.join(&*table);
            }
        }
        Ok(file)
    }

    /// Layers `overrides` on top of `self`; every key set in `overrides` wins.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            desired_temperature: overrides.desired_temperature.or(self.desired_temperature),
            cost_on: overrides.cost_on.or(self.cost_on),
            cost_off: overrides.cost_off.or(self.cost_off),
            cycles: overrides.cycles.or(self.cycles),
            safety_cap: overrides.safety_cap.or(self.safety_cap),
            tables: TableFiles {
                on: overrides.tables.on.or(self.tables.on),
                off: overrides.tables.off.or(self.tables.off),
            },
        }
    }

    /// Validates the file into a config, filling gaps with defaults.
    pub fn to_config(&self) -> Result<ThermostatConfig> {
        let cycles = match &self.cycles {
            Some(spec) => spec.resolve()?,
            None => CycleBound::default(),
        };
        let config = ThermostatConfig::new(
            self.desired_temperature
                .unwrap_or(DEFAULT_DESIRED_TEMPERATURE),
            self.cost_on.unwrap_or(DEFAULT_COST_ON),
            self.cost_off.unwrap_or(DEFAULT_COST_OFF),
            cycles,
        )?;
        match self.safety_cap {
            None => Ok(config),
            Some(cap) => Ok(config.with_safety_cap(parse_safety_cap(cap)?)),
        }
    }

    /// Table paths, with the bundled tables standing in for missing ones.
    pub fn table_paths(&self) -> TablePaths {
        let defaults = TablePaths::default();
        TablePaths {
            on: self.tables.on.clone().unwrap_or(defaults.on),
            off: self.tables.off.clone().unwrap_or(defaults.off),
        }
    }
}

impl FromStr for ConfigFile {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::ConfigFile(e.to_string()))
    }
}

/// A safety cap must be a positive sweep count.
fn parse_safety_cap(cap: i64) -> Result<NonZeroUsize> {
    usize::try_from(cap)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| Error::ConfigFile(format!("safety_cap must be a positive integer, got {cap}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_matches_reference_setup() {
        let config = ThermostatConfig::default();
        assert_eq!(config.desired_temperature(), 22.0);
        assert_eq!(config.cost(Action::On), 6.7793);
        assert_eq!(config.cost(Action::Off), 0.610137);
        assert_eq!(config.cycles(), CycleBound::Unbounded);
        assert!(config.rounds_values());
        assert_eq!(config.safety_cap(), None);
    }

    #[test]
    fn test_desired_temperature_must_be_on_ladder() {
        for t in [15.5, 22.3, 25.5, f64::NAN] {
            let err = ThermostatConfig::new(t, 1.0, 1.0, CycleBound::Unbounded).unwrap_err();
            assert!(matches!(err, Error::TemperatureOffLadder(_)));
        }
        assert!(ThermostatConfig::new(16.0, 1.0, 1.0, CycleBound::Unbounded).is_ok());
        assert!(ThermostatConfig::new(25.0, 1.0, 1.0, CycleBound::Unbounded).is_ok());
    }

    #[test]
    fn test_costs_must_be_finite() {
        let err = ThermostatConfig::new(22.0, f64::NAN, 1.0, CycleBound::Unbounded).unwrap_err();
        assert!(matches!(err, Error::InvalidCost { action: Action::On, .. }));

        let err =
            ThermostatConfig::new(22.0, 1.0, f64::INFINITY, CycleBound::Unbounded).unwrap_err();
        assert!(matches!(err, Error::InvalidCost { action: Action::Off, .. }));

        // negative costs are unusual but legal
        assert!(ThermostatConfig::new(22.0, -1.0, 0.0, CycleBound::Unbounded).is_ok());
    }

    #[test]
    fn test_cycle_bound_parsing() {
        assert_eq!("unbounded".parse::<CycleBound>().unwrap(), CycleBound::Unbounded);
        assert_eq!("Unbounded".parse::<CycleBound>().unwrap(), CycleBound::Unbounded);
        assert_eq!("30".parse::<CycleBound>().unwrap().limit(), Some(30));
        for bad in ["0", "-3", "2.5", "many", ""] {
            assert!(
                matches!(bad.parse::<CycleBound>(), Err(Error::InvalidCycleBound(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(CycleBound::exactly(0).is_err());
        assert_eq!(CycleBound::exactly(4).unwrap().to_string(), "4");
    }

    #[test]
    fn test_config_file_full() {
        let file: ConfigFile = r#"
            desired_temperature = 21.5
            cost_on = 5
            cost_off = 0.5
            cycles = 12
            safety_cap = 500

            [tables]
            on = "on.csv"
            off = "off.csv"
        "#
        .parse()
        .unwrap();
        let config = file.to_config().unwrap();
        assert_eq!(config.desired_temperature(), 21.5);
        assert_eq!(config.cost(Action::On), 5.0);
        assert_eq!(config.cycles().limit(), Some(12));
        assert!(!config.rounds_values());
        assert_eq!(config.safety_cap(), Some(500));
        assert_eq!(file.tables.on, Some(PathBuf::from("on.csv")));
        assert_eq!(file.cycles, Some(CycleSpec::Count(12)));
        assert_eq!(file.safety_cap, Some(500));
    }

    #[test]
    fn test_config_file_defaults_and_keyword() {
        let file: ConfigFile = "cycles = \"unbounded\"".parse().unwrap();
        assert_eq!(file.cycles, Some(CycleSpec::Keyword("unbounded".into())));
        assert_eq!(file.to_config().unwrap(), ThermostatConfig::default());

        let empty: ConfigFile = "".parse().unwrap();
        assert_eq!(empty.to_config().unwrap(), ThermostatConfig::default());
    }

    #[test]
    fn test_config_file_rejects_bad_values() {
        let not_real: std::result::Result<ConfigFile, _> = "cost_on = \"cheap\"".parse();
        assert!(matches!(not_real, Err(Error::ConfigFile(_))));

        let unknown: std::result::Result<ConfigFile, _> = "heater = true".parse();
        assert!(matches!(unknown, Err(Error::ConfigFile(_))));

        let zero: ConfigFile = "cycles = 0".parse().unwrap();
        assert!(matches!(zero.to_config(), Err(Error::InvalidCycleBound(_))));

        let off_ladder: ConfigFile = "desired_temperature = 30".parse().unwrap();
        assert!(matches!(off_ladder.to_config(), Err(Error::TemperatureOffLadder(_))));

        let cap: ConfigFile = "safety_cap = 0".parse().unwrap();
        assert!(matches!(cap.to_config(), Err(Error::ConfigFile(_))));
    }

    #[test]
    fn test_config_file_paths_are_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thermostat.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[tables]\non = \"a.csv\"\noff = \"sub/b.csv\"").unwrap();

        let loaded = ConfigFile::from_path(&path).unwrap();
        let tables = loaded.table_paths();
        assert_eq!(tables.on, dir.path().join("a.csv"));
        assert_eq!(tables.off, dir.path().join("sub/b.csv"));
    }

    #[test]
    fn test_merge_overrides_win_before_validation() {
        let file: ConfigFile = r#"
            desired_temperature = 30
            cost_on = 5
            cycles = 0

            [tables]
            on = "file_on.csv"
            off = "file_off.csv"
        "#
        .parse()
        .unwrap();
        assert!(file.to_config().is_err());

        let flags = ConfigFile {
            desired_temperature: Some(22.0),
            cycles: Some(CycleBound::exactly(8).unwrap().into()),
            tables: TableFiles {
                on: Some(PathBuf::from("flag_on.csv")),
                off: None,
            },
            ..ConfigFile::default()
        };
        let merged = file.merge(flags);
        let config = merged.to_config().unwrap();
        assert_eq!(config.desired_temperature(), 22.0);
        // untouched file values survive
        assert_eq!(config.cost(Action::On), 5.0);
        assert_eq!(config.cost(Action::Off), DEFAULT_COST_OFF);
        assert_eq!(config.cycles().limit(), Some(8));

        let tables = merged.table_paths();
        assert_eq!(tables.on, PathBuf::from("flag_on.csv"));
        assert_eq!(tables.off, PathBuf::from("file_off.csv"));
    }

    #[test]
    fn test_missing_table_paths_fall_back_to_bundled() {
        let file: ConfigFile = "[tables]\noff = \"mine.csv\"".parse().unwrap();
        let tables = file.table_paths();
        assert_eq!(tables.on, TablePaths::default().on);
        assert_eq!(tables.off, PathBuf::from("mine.csv"));
    }

    #[test]
    fn test_cycle_spec_round_trips_through_bound() {
        assert_eq!(CycleSpec::from(CycleBound::Unbounded).resolve().unwrap(), CycleBound::Unbounded);
        let bound = CycleBound::exactly(3).unwrap();
        assert_eq!(CycleSpec::from(bound).resolve().unwrap(), bound);
        assert!(CycleSpec::Keyword("forever".into()).resolve().is_err());
    }
}
