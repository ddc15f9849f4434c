//! Shared calibration workflow used by the `run` command and the tests.
//!
//! config -> panel ingest -> optional lookup -> per-group calibration

use std::path::PathBuf;

use crate::calibrate::{CalibrationOutput, calibrate_panel};
use crate::config::{CalibrationConfig, Preset};
use crate::error::AppError;
use crate::io::{IngestedPanel, load_lookup, load_panel};

/// Where a run takes its configuration and inputs from.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub panel: PathBuf,
    pub config: Option<PathBuf>,
    pub preset: Preset,
    pub lookup: Option<PathBuf>,
    pub min_length: Option<usize>,
}

/// All computed outputs of a single `calib run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: CalibrationConfig,
    pub ingest: IngestedPanel,
    pub calibration: CalibrationOutput,
}

pub fn resolve_config(request: &RunRequest) -> Result<CalibrationConfig, AppError> {
    let mut config = match &request.config {
        Some(path) => CalibrationConfig::from_file(path)?,
        None => CalibrationConfig::preset(request.preset),
    };
    if let Some(min_length) = request.min_length {
        config.min_length = min_length;
        config.validate()?;
    }
    Ok(config)
}

pub fn run_calibration(request: &RunRequest) -> Result<RunOutput, AppError> {
    let config = resolve_config(request)?;

    let ingest = load_panel(&request.panel)?;
    log::info!(
        "read {} rows ({} used) for {} groups from {}",
        ingest.rows_read,
        ingest.rows_used,
        ingest.panel.groups.len(),
        request.panel.display()
    );
    for err in &ingest.row_errors {
        match &err.group {
            Some(group) => log::warn!("line {} ({group}): {}", err.line, err.message),
            None => log::warn!("line {}: {}", err.line, err.message),
        }
    }

    let lookup = request.lookup.as_deref().map(load_lookup).transpose()?;
    let calibration = calibrate_panel(&ingest.panel, &config, lookup.as_ref())?;

    Ok(RunOutput {
        config,
        ingest,
        calibration,
    })
}
