//! CSV ingest and normalization.
//!
//! Turns a wide panel CSV (`group,period,<indicator>...`) into a `Panel` and a
//! lookup CSV (`group,<label>...`) into a `Classification`.
//!
//! Design goals:
//! - **Strict schema** for the key columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows/cells, but report what happened)
//! - **Deterministic behavior** (groups keep their order of first appearance)

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::calibrate::Classification;
use crate::domain::{GroupData, Panel, Period, Series};
use crate::error::{AppError, EXIT_EMPTY};

const GROUP_COLUMNS: [&str; 2] = ["group", "country"];
const PERIOD_COLUMNS: [&str; 4] = ["period", "date", "year", "quarter"];
const MISSING_MARKERS: [&str; 5] = [".", "na", "nan", "n/a", "null"];

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub group: Option<String>,
    pub message: String,
}

/// Ingest output: the panel plus what was skipped along the way.
#[derive(Debug, Clone)]
pub struct IngestedPanel {
    pub panel: Panel,
    pub indicators: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a panel CSV from disk.
pub fn load_panel(path: &Path) -> Result<IngestedPanel, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open panel CSV '{}': {e}", path.display())))?;
    read_panel(file)
}

/// Parse a panel CSV from any reader.
pub fn read_panel<R: Read>(input: R) -> Result<IngestedPanel, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read panel CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let group_idx = find_column(&header_map, &GROUP_COLUMNS)
        .ok_or_else(|| AppError::input("Missing required column: `group` (or `country`)"))?;
    let period_idx = find_column(&header_map, &PERIOD_COLUMNS)
        .ok_or_else(|| AppError::input("Missing required column: `period` (or `date`/`year`)"))?;

    let indicators: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != group_idx && *idx != period_idx)
        .map(|(idx, name)| (idx, normalize_header_name(name)))
        .filter(|(_, name)| !name.is_empty())
        .collect();
    if indicators.is_empty() {
        return Err(AppError::input("Panel CSV has no indicator columns."));
    }

    let mut group_order: Vec<String> = Vec::new();
    let mut observations: HashMap<String, BTreeMap<String, Vec<(Period, Option<f64>)>>> = HashMap::new();
    let mut seen: HashSet<(String, Period)> = HashSet::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    group: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let group = match get_required(&record, group_idx, "group") {
            Ok(g) => g.to_string(),
            Err(message) => {
                row_errors.push(RowError { line, group: None, message });
                continue;
            }
        };
        let period = match get_required(&record, period_idx, "period").and_then(Period::parse) {
            Ok(p) => p,
            Err(message) => {
                row_errors.push(RowError {
                    line,
                    group: Some(group),
                    message,
                });
                continue;
            }
        };
        if !seen.insert((group.clone(), period)) {
            row_errors.push(RowError {
                line,
                group: Some(group),
                message: format!("Duplicate period {period}; row ignored."),
            });
            continue;
        }

        if !observations.contains_key(&group) {
            group_order.push(group.clone());
        }
        let by_indicator = observations.entry(group.clone()).or_default();
        for (col, name) in &indicators {
            let value = match parse_cell(record.get(*col)) {
                Ok(v) => v,
                Err(message) => {
                    row_errors.push(RowError {
                        line,
                        group: Some(group.clone()),
                        message: format!("`{name}`: {message}"),
                    });
                    None
                }
            };
            by_indicator.entry(name.clone()).or_default().push((period, value));
        }
        rows_used += 1;
    }

    if rows_used == 0 {
        return Err(AppError::new(EXIT_EMPTY, "No valid rows in panel CSV."));
    }

    let mut groups = Vec::with_capacity(group_order.len());
    for id in group_order {
        let mut group = GroupData::new(id.clone());
        for (name, obs) in observations.remove(&id).unwrap_or_default() {
            let series = Series::from_observations(obs).map_err(AppError::input)?;
            group.series.insert(name, series);
        }
        groups.push(group);
    }

    Ok(IngestedPanel {
        panel: Panel { groups },
        indicators: indicators.into_iter().map(|(_, name)| name).collect(),
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Load a classification lookup CSV: first column is the group key, every
/// other column is a label carried into the output.
pub fn load_lookup(path: &Path) -> Result<Classification, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open lookup CSV '{}': {e}", path.display())))?;
    read_lookup(file)
}

pub fn read_lookup<R: Read>(input: R) -> Result<Classification, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read lookup CSV headers: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(AppError::input("Lookup CSV has no columns."));
    }
    let columns: Vec<String> = headers.iter().skip(1).map(normalize_header_name).collect();

    let mut lookup = Classification::new(columns);
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AppError::input(format!("Lookup CSV line {}: {e}", idx + 2)))?;
        let Some(key) = record.get(0).filter(|k| !k.is_empty()) else {
            log::warn!("lookup CSV line {}: empty group key, row ignored", idx + 2);
            continue;
        };
        if lookup.labels(key).is_some() {
            log::warn!("lookup CSV line {}: duplicate group '{key}', earlier row replaced", idx + 2);
        }
        let labels = record.iter().skip(1).map(str::to_string).collect();
        lookup.insert(key, labels);
    }

    log::debug!("loaded {} lookup rows", lookup.len());
    Ok(lookup)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|c| header_map.get(*c).copied())
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

/// Empty cells and the usual NA markers are missing; anything else must parse.
fn parse_cell(cell: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if MISSING_MARKERS.contains(&s.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    let v = s.parse::<f64>().map_err(|_| format!("Invalid number '{s}'."))?;
    Ok(v.is_finite().then_some(v))
}
