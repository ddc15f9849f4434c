//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging; this module is the "real main" that
//! parses the CLI and dispatches each command.

use clap::Parser;

use std::path::Path;

use crate::cli::{Command, CrossSectionArgs, CycleArgs, HpArgs, PresetArgs, RunArgs, SynthArgs};
use crate::config::CalibrationConfig;
use crate::cross_section::{PRODUCTION_INDICATORS, latest_cross_section, per_person_table};
use crate::cycle::{CycleParams, Decomposition, build_cycle_dataset};
use crate::data::{SampleConfig, generate_panel};
use crate::domain::Period;
use crate::error::{AppError, EXIT_EMPTY};
use crate::io::{
    load_panel, write_cross_section_csv, write_cycle_calibration_csv, write_cycle_table_csv, write_decomposition,
    write_decomposition_csv, write_manifest_csv, write_panel_csv, write_records, write_records_csv,
    write_wide_table_csv,
};
use crate::window::find_longest_window;

pub mod pipeline;

/// Entry point for the `calib` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Preset(args) => handle_preset(args),
        Command::Hp(args) => handle_hp(args),
        Command::Cycle(args) => handle_cycle(args),
        Command::CrossSection(args) => handle_cross_section(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let request = pipeline::RunRequest {
        panel: args.panel,
        config: args.config,
        preset: args.preset,
        lookup: args.lookup,
        min_length: args.min_length,
    };
    let run = pipeline::run_calibration(&request)?;

    match &args.out {
        Some(path) => {
            write_records_csv(path, &run.calibration)?;
            log::info!("wrote {} records to {}", run.calibration.records.len(), path.display());
        }
        None => write_records(std::io::stdout().lock(), &run.calibration)?,
    }
    if let Some(path) = &args.manifest {
        write_manifest_csv(path, &run.calibration)?;
        log::info!("wrote {} manifest entries to {}", run.calibration.manifest.len(), path.display());
    }

    eprint!("{}", crate::report::format_run_summary(&run.ingest, &run.calibration));
    Ok(())
}

fn handle_preset(args: PresetArgs) -> Result<(), AppError> {
    print!("{}", CalibrationConfig::preset(args.name).to_toml()?);
    Ok(())
}

fn handle_hp(args: HpArgs) -> Result<(), AppError> {
    let ingest = load_panel(&args.panel)?;
    let indicator = args.indicator.trim().to_ascii_lowercase();
    let series = ingest
        .panel
        .group(&args.group)
        .ok_or_else(|| AppError::input(format!("Group '{}' not found in panel.", args.group)))?
        .series(&indicator)
        .ok_or_else(|| AppError::input(format!("Indicator '{indicator}' not found in panel.")))?;
    let series = crate::align::fill_calendar(series);
    let series = if args.log { crate::transform::ln(&series) } else { series };

    let mask: Vec<bool> = series.values().iter().map(Option::is_some).collect();
    let window = find_longest_window(&mask);
    let periods = window.slice(series.periods()).unwrap_or_default();
    let values: Vec<f64> = window
        .slice(series.values())
        .unwrap_or_default()
        .iter()
        .flatten()
        .copied()
        .collect();
    if values.is_empty() {
        return Err(AppError::new(
            EXIT_EMPTY,
            format!("{} has no observed '{indicator}' values.", args.group),
        ));
    }
    log::info!(
        "filtering {} '{indicator}' over {} periods {window} (lambda {})",
        args.group,
        values.len(),
        args.lambda
    );

    let (cycle, trend) = crate::math::hp::hp_filter(&values, args.lambda)?;
    match &args.out {
        Some(path) => write_decomposition_csv(path, periods, &values, &trend, &cycle),
        None => write_decomposition(std::io::stdout().lock(), periods, &values, &trend, &cycle),
    }
}

fn create_dir(dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create directory '{}': {e}", dir.display())))
}

fn handle_cycle(args: CycleArgs) -> Result<(), AppError> {
    let ingest = load_panel(&args.panel)?;
    let group = ingest
        .panel
        .group(&args.group)
        .ok_or_else(|| AppError::input(format!("Group '{}' not found in panel.", args.group)))?;
    let params = CycleParams {
        alpha: args.alpha,
        lambda: args.lambda,
        depreciation_ratio: args.depreciation_ratio,
    };
    let data = build_cycle_dataset(group, &params)?;

    create_dir(&args.out_dir)?;
    let write_pair = |stem: &str, components: &[&Decomposition]| -> Result<(), AppError> {
        for (suffix, with_cycle) in [("actual_trend", false), ("actual_trend_cycle", true)] {
            let path = args.out_dir.join(format!("{stem}_{suffix}.csv"));
            write_cycle_table_csv(&path, components, with_cycle)?;
            log::info!("wrote {} components to {}", components.len(), path.display());
        }
        Ok(())
    };
    write_pair("rbc_data", &data.rbc())?;
    if data.has_extras() {
        let all: Vec<&Decomposition> = data.components.iter().collect();
        write_pair("business_cycle_data", &all)?;
    }

    let path = args.out_dir.join("calibration.csv");
    write_cycle_calibration_csv(&path, &data)?;
    log::info!("wrote calibration to {}", path.display());
    Ok(())
}

fn handle_cross_section(args: CrossSectionArgs) -> Result<(), AppError> {
    let ingest = load_panel(&args.panel)?;
    let panel = &ingest.panel;
    create_dir(&args.out_dir)?;
    let mut written = 0usize;

    match latest_cross_section(panel, &PRODUCTION_INDICATORS) {
        Ok(cs) => {
            let path = args.out_dir.join("cross_country_production.csv");
            write_cross_section_csv(&path, &cs)?;
            log::info!("wrote {} groups for {} to {}", cs.rows.len(), cs.period, path.display());
            written += 1;
        }
        Err(err) => log::warn!("skipping production cross-section: {err}"),
    }

    let since = Period::annual(args.since)
        .ok_or_else(|| AppError::input(format!("Invalid start year {}.", args.since)))?;
    let output = args.output.trim().to_ascii_lowercase();
    for (persons, file) in [(&args.workers, "cross_country_gdp_pw.csv"), (&args.population, "cross_country_gdp_pc.csv")] {
        let persons = persons.trim().to_ascii_lowercase();
        match per_person_table(panel, &output, &persons, since) {
            Ok(table) => {
                let path = args.out_dir.join(file);
                write_wide_table_csv(&path, &table)?;
                log::info!("wrote {} groups to {}", table.groups.len(), path.display());
                written += 1;
            }
            Err(err) => log::warn!("skipping '{output}' per '{persons}': {err}"),
        }
    }

    if written == 0 {
        return Err(AppError::new(EXIT_EMPTY, "No cross-country table could be built from the panel."));
    }
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        groups: args.groups,
        periods: args.periods,
        start_year: args.start,
        seed: args.seed,
        gap_prob: args.gap_prob,
        ..Default::default()
    };
    let panel = generate_panel(&config)?;
    write_panel_csv(&args.out, &panel)?;
    log::info!("wrote {} synthetic groups to {}", panel.groups.len(), args.out.display());
    Ok(())
}
