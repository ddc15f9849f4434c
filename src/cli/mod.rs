//! Command-line parsing for the `calib` binary.
//!
//! Argument parsing stays here; command dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Preset;
use crate::cycle::DEFAULT_ALPHA;
use crate::math::hp::LAMBDA_QUARTERLY;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "calib",
    version,
    about = "Longest-window extraction and windowed-average calibration for country panels"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calibrate every group of a panel and write records plus the skip manifest.
    Run(RunArgs),
    /// Print a built-in configuration as TOML.
    Preset(PresetArgs),
    /// HP-filter one indicator of one group over its longest observed window.
    Hp(HpArgs),
    /// Build the business-cycle dataset of one group: capital, TFP and HP trends.
    Cycle(CycleArgs),
    /// Write cross-country production and per-person output tables.
    CrossSection(CrossSectionArgs),
    /// Write a seeded synthetic panel.
    Synth(SynthArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Panel CSV (`group,period,<indicator>...`).
    #[arg(long, value_name = "CSV")]
    pub panel: PathBuf,

    /// Calibration config TOML.
    #[arg(long, value_name = "TOML", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in configuration, used when no `--config` is given.
    #[arg(long, value_enum, default_value_t = Preset::QuantityTheory)]
    pub preset: Preset,

    /// Group classification CSV (first column is the group).
    #[arg(long, value_name = "CSV")]
    pub lookup: Option<PathBuf>,

    /// Records CSV; printed to stdout when omitted.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,

    /// Skip manifest CSV.
    #[arg(long, value_name = "CSV")]
    pub manifest: Option<PathBuf>,

    /// Override the config's minimum window length.
    #[arg(long)]
    pub min_length: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct PresetArgs {
    #[arg(value_enum)]
    pub name: Preset,
}

#[derive(Debug, Args, Clone)]
pub struct HpArgs {
    #[arg(long, value_name = "CSV")]
    pub panel: PathBuf,

    #[arg(long)]
    pub group: String,

    /// Indicator column (case-insensitive).
    #[arg(long)]
    pub indicator: String,

    /// Smoothing parameter.
    #[arg(long, default_value_t = LAMBDA_QUARTERLY)]
    pub lambda: f64,

    /// Filter the natural log of the series.
    #[arg(long)]
    pub log: bool,

    /// Decomposition CSV; printed to stdout when omitted.
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CycleArgs {
    /// Panel CSV with deflator, population, gdp, consumption, investment and hours.
    #[arg(long, value_name = "CSV")]
    pub panel: PathBuf,

    #[arg(long)]
    pub group: String,

    /// Capital share of income.
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    #[arg(long, default_value_t = LAMBDA_QUARTERLY)]
    pub lambda: f64,

    /// Average depreciation-to-output ratio; read from a `depreciation`
    /// indicator when omitted.
    #[arg(long)]
    pub depreciation_ratio: Option<f64>,

    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct CrossSectionArgs {
    #[arg(long, value_name = "CSV")]
    pub panel: PathBuf,

    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// First year of the per-person tables.
    #[arg(long, default_value_t = 1960)]
    pub since: i32,

    /// Output indicator of the per-person tables.
    #[arg(long, default_value = "real gdp")]
    pub output: String,

    #[arg(long, default_value = "labor")]
    pub workers: String,

    #[arg(long, default_value = "population")]
    pub population: String,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    #[arg(long, default_value_t = 25)]
    pub groups: usize,

    #[arg(long, default_value_t = 60)]
    pub periods: usize,

    /// First year of the period axis.
    #[arg(long, default_value_t = 1960)]
    pub start: i32,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Probability that any single observation is missing.
    #[arg(long, default_value_t = 0.03)]
    pub gap_prob: f64,

    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}
