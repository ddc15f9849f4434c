//! Per-group calibration.
//!
//! For every group: align the required series, find the longest window in
//! which all of them are observed, enforce the minimum length, compute the
//! requested statistics and attach classification labels. Each group yields
//! either a `CalibratedRecord` or a typed `SkipReason`; one bad group never
//! stops the others.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::align::align;
use crate::config::CalibrationConfig;
use crate::domain::{
    CalibratedRecord, GroupData, GrowthPolicy, LookupPolicy, ManifestEntry, Panel, Series, SkipAction, SkipReason,
    StatKind, StatValue,
};
use crate::error::{AppError, EXIT_EMPTY};
use crate::stats::{StatError, compute};
use crate::window::{find_longest_window, validate_window};

/// Side table of classification labels keyed by group identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    columns: Vec<String>,
    rows: HashMap<String, Vec<String>>,
}

impl Classification {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: HashMap::new(),
        }
    }

    /// Label column names (excluding the group key).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Insert labels for `group`, padding or truncating to the column count.
    pub fn insert(&mut self, group: impl Into<String>, mut labels: Vec<String>) {
        labels.resize(self.columns.len(), String::new());
        self.rows.insert(group.into(), labels);
    }

    pub fn labels(&self, group: &str) -> Option<&[String]> {
        self.rows.get(group).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Records plus the manifest of everything that was dropped or trimmed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalibrationOutput {
    pub records: Vec<CalibratedRecord>,
    pub manifest: Vec<ManifestEntry>,
    /// Statistic column names in output order.
    pub stat_columns: Vec<String>,
    /// Label column names in output order (empty without a lookup).
    pub label_columns: Vec<String>,
    pub groups_seen: usize,
}

/// Calibrate every group of `panel`.
///
/// Groups run in parallel; records and manifest entries keep the panel's
/// group order, so identical inputs give identical outputs.
pub fn calibrate_panel(
    panel: &Panel,
    config: &CalibrationConfig,
    lookup: Option<&Classification>,
) -> Result<CalibrationOutput, AppError> {
    if panel.groups.is_empty() {
        return Err(AppError::new(EXIT_EMPTY, "Panel contains no groups."));
    }

    let outcomes: Vec<Result<CalibratedRecord, SkipReason>> = panel
        .groups
        .par_iter()
        .map(|group| calibrate_group(group, config, lookup))
        .collect();

    let mut output = CalibrationOutput {
        stat_columns: config.statistics.iter().map(|s| s.column.clone()).collect(),
        label_columns: lookup.map(|l| l.columns().to_vec()).unwrap_or_default(),
        groups_seen: panel.groups.len(),
        ..Default::default()
    };

    for (group, outcome) in panel.groups.iter().zip(outcomes) {
        match outcome {
            Ok(record) => {
                for reason in &record.omissions {
                    log::warn!("{}: {reason} (field omitted)", group.id);
                    output.manifest.push(ManifestEntry {
                        group: group.id.clone(),
                        reason: reason.clone(),
                        action: SkipAction::FieldOmitted,
                    });
                }
                output.records.push(record);
            }
            Err(reason) => {
                log_skip(&group.id, &reason);
                output.manifest.push(ManifestEntry {
                    group: group.id.clone(),
                    reason,
                    action: SkipAction::GroupSkipped,
                });
            }
        }
    }

    log::info!(
        "calibrated {} of {} groups ({} manifest entries)",
        output.records.len(),
        output.groups_seen,
        output.manifest.len()
    );
    Ok(output)
}

fn log_skip(group: &str, reason: &SkipReason) {
    match reason {
        SkipReason::Excluded | SkipReason::InsufficientWindow { .. } | SkipReason::MissingIndicator { .. } => {
            log::debug!("{group}: skipped, {reason}")
        }
        SkipReason::MissingGroupLookup
        | SkipReason::DegenerateGrowthWindow { .. }
        | SkipReason::InvalidStatistic { .. } => log::warn!("{group}: skipped, {reason}"),
    }
}

/// Calibrate a single group.
pub fn calibrate_group(
    group: &GroupData,
    config: &CalibrationConfig,
    lookup: Option<&Classification>,
) -> Result<CalibratedRecord, SkipReason> {
    if config.exclude.iter().any(|g| g == &group.id) {
        return Err(SkipReason::Excluded);
    }

    let required = config.required_indicators();
    let mut owned: Vec<(&str, Series)> = Vec::with_capacity(required.len());
    for &name in &required {
        let series = group.series(name).ok_or_else(|| SkipReason::MissingIndicator {
            indicator: name.to_string(),
        })?;
        let series = if config.zero_as_missing.iter().any(|z| z == name) {
            zero_to_missing(series)
        } else {
            series.clone()
        };
        owned.push((name, series));
    }

    let refs: Vec<(&str, &Series)> = owned.iter().map(|(n, s)| (*n, s)).collect();
    let table = align(&refs, config.align);
    let mask = table.observed_mask(&required)?;
    let window = validate_window(find_longest_window(&mask), config.min_length)?;

    let mut omissions = Vec::new();
    let mut statistics = Vec::with_capacity(config.statistics.len());
    for spec in &config.statistics {
        let values = table.column(&spec.indicator).ok_or_else(|| SkipReason::MissingIndicator {
            indicator: spec.indicator.clone(),
        })?;
        let value = match compute(spec.kind, values, window, spec.scale) {
            Ok(v) => Some(v),
            Err(StatError::DegenerateWindow { .. }) if spec.kind == StatKind::Growth => {
                let reason = SkipReason::DegenerateGrowthWindow {
                    column: spec.column.clone(),
                };
                match config.degenerate_growth {
                    GrowthPolicy::SkipGroup => return Err(reason),
                    GrowthPolicy::OmitStatistic => {
                        omissions.push(reason);
                        None
                    }
                }
            }
            Err(e) => {
                return Err(SkipReason::InvalidStatistic {
                    column: spec.column.clone(),
                    detail: e.to_string(),
                });
            }
        };
        statistics.push(StatValue {
            column: spec.column.clone(),
            value,
        });
    }

    let labels = match lookup {
        None => None,
        Some(classes) => match classes.labels(&group.id) {
            Some(labels) => Some(labels.to_vec()),
            None => match config.missing_lookup {
                LookupPolicy::SkipGroup => return Err(SkipReason::MissingGroupLookup),
                LookupPolicy::SkipField => {
                    omissions.push(SkipReason::MissingGroupLookup);
                    None
                }
            },
        },
    };

    // Bounds come from a validated, non-empty window over this table.
    let periods = table.periods();
    let (start, end) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (periods[first], periods[last]),
        _ => {
            return Err(SkipReason::InsufficientWindow {
                length: 0,
                required: config.min_length,
            });
        }
    };

    Ok(CalibratedRecord {
        group: group.id.clone(),
        window,
        start,
        end,
        statistics,
        labels,
        omissions,
    })
}

fn zero_to_missing(series: &Series) -> Series {
    series.map_values(|x| if x == 0.0 { f64::NAN } else { x })
}
