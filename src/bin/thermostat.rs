use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use log::LevelFilter;

use thermostat_mdp::config::{CycleSpec, TableFiles};
use thermostat_mdp::{
    value_iteration, Action, ConfigFile, CycleBound, PolicyReport, TablePaths, ThermostatConfig,
    ThermostatMdp, TransitionTable,
};

/// Computes the optimal heater ON/OFF policy for every temperature on the
/// ladder by value iteration.
#[derive(Debug, Parser)]
#[command(name = "thermostat", version, about, allow_negative_numbers = true)]
struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Temperature to reach (16.0 to 25.0 in steps of 0.5)
    #[arg(short, long)]
    desired: Option<f64>,

    /// Cost of one step with the heater on
    #[arg(long)]
    cost_on: Option<f64>,

    /// Cost of one step with the heater off
    #[arg(long)]
    cost_off: Option<f64>,

    /// Number of sweeps, or "unbounded" to run until convergence
    #[arg(long)]
    cycles: Option<CycleBound>,

    /// Give up an unbounded run after this many sweeps
    #[arg(long)]
    safety_cap: Option<i64>,

    /// Transition table of the ON action
    #[arg(long)]
    probs_on: Option<PathBuf>,

    /// Transition table of the OFF action
    #[arg(long)]
    probs_off: Option<PathBuf>,

    /// Print the value of every state next to its action
    #[arg(long)]
    show_values: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut builder = Builder::new();
    builder.filter_level(level);
    // RUST_LOG still wins when set
    builder.parse_env(Env::default());
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {}] {}",
            record.level(),
            record.module_path().unwrap_or("<unknown>"),
            record.args()
        )
    });
    if let Err(e) = builder.try_init() {
        eprintln!("Warning: logger initialization failed: {}", e);
    }
}

impl Args {
    /// The values given on the command line, shaped like a config file.
    fn overrides(&self) -> ConfigFile {
        ConfigFile {
            desired_temperature: self.desired,
            cost_on: self.cost_on,
            cost_off: self.cost_off,
            cycles: self.cycles.map(CycleSpec::from),
            safety_cap: self.safety_cap,
            tables: TableFiles {
                on: self.probs_on.clone(),
                off: self.probs_off.clone(),
            },
        }
    }
}

fn resolve(args: &Args) -> Result<(ThermostatConfig, TablePaths)> {
    let file = match &args.config {
        Some(path) => ConfigFile::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ConfigFile::default(),
    };
    let merged = file.merge(args.overrides());
    Ok((merged.to_config()?, merged.table_paths()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let (config, tables) = resolve(&args)?;
    log::info!(
        "desired {} / ON {} / OFF {} / cycles {}",
        config.desired_temperature(),
        config.cost(Action::On),
        config.cost(Action::Off),
        config.cycles()
    );

    let on = TransitionTable::from_path(&tables.on).context("loading the ON table")?;
    let off = TransitionTable::from_path(&tables.off).context("loading the OFF table")?;
    let mdp = ThermostatMdp::new(config, on, off)?;
    let solution = value_iteration(&mdp)?;

    print!(
        "\n{}",
        PolicyReport::new(&solution)
            .with_values(args.show_values)
            .with_summary(args.verbose > 0)
    );
    Ok(())
}
