//! CSV exports: calibrated records, the skip manifest, panels, filter output
//! and cross-country tables.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! notebooks. Omitted values are written as empty cells.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::calibrate::CalibrationOutput;
use crate::cross_section::{CrossSection, WideTable};
use crate::cycle::{CycleDataset, Decomposition};
use crate::domain::{Panel, Period};
use crate::error::AppError;

fn create(path: &Path, what: &str) -> Result<File, AppError> {
    File::create(path).map_err(|e| AppError::input(format!("Failed to create {what} '{}': {e}", path.display())))
}

fn csv_err(e: csv::Error) -> AppError {
    AppError::input(format!("Failed to write CSV: {e}"))
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Write one row per calibrated group.
///
/// Columns: `group,observations,start,end,<statistics>,<labels>`.
pub fn write_records<W: Write>(out: W, output: &CalibrationOutput) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec![
        "group".to_string(),
        "observations".to_string(),
        "start".to_string(),
        "end".to_string(),
    ];
    header.extend(output.stat_columns.iter().cloned());
    header.extend(output.label_columns.iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;

    for record in &output.records {
        let mut row = vec![
            record.group.clone(),
            record.observations().to_string(),
            record.start.to_string(),
            record.end.to_string(),
        ];
        for column in &output.stat_columns {
            let value = record
                .statistics
                .iter()
                .find(|s| &s.column == column)
                .and_then(|s| s.value);
            row.push(fmt_opt(value));
        }
        for i in 0..output.label_columns.len() {
            let label = record.labels.as_ref().and_then(|l| l.get(i)).cloned();
            row.push(label.unwrap_or_default());
        }
        writer.write_record(&row).map_err(csv_err)?;
    }

    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_records_csv(path: &Path, output: &CalibrationOutput) -> Result<(), AppError> {
    write_records(create(path, "records CSV")?, output)
}

/// Write the skip manifest. Columns: `group,reason,action,detail`.
pub fn write_manifest<W: Write>(out: W, output: &CalibrationOutput) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["group", "reason", "action", "detail"])
        .map_err(csv_err)?;
    for entry in &output.manifest {
        let detail = entry.reason.to_string();
        writer
            .write_record([
                entry.group.as_str(),
                entry.reason.code(),
                entry.action.label(),
                detail.as_str(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_manifest_csv(path: &Path, output: &CalibrationOutput) -> Result<(), AppError> {
    write_manifest(create(path, "manifest CSV")?, output)
}

/// Write a panel in the wide layout `read_panel` accepts.
pub fn write_panel<W: Write>(out: W, panel: &Panel) -> Result<(), AppError> {
    let indicators = panel.indicators();
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["group".to_string(), "period".to_string()];
    header.extend(indicators.iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;

    for group in &panel.groups {
        let mut periods: Vec<Period> = group
            .series
            .values()
            .flat_map(|s| s.periods().iter().copied())
            .collect();
        periods.sort();
        periods.dedup();

        for period in periods {
            let mut row = vec![group.id.clone(), period.to_string()];
            for name in &indicators {
                row.push(fmt_opt(group.series(name).and_then(|s| s.get(period))));
            }
            writer.write_record(&row).map_err(csv_err)?;
        }
    }

    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_panel_csv(path: &Path, panel: &Panel) -> Result<(), AppError> {
    write_panel(create(path, "panel CSV")?, panel)
}

/// Write a trend/cycle decomposition. Columns: `period,value,trend,cycle`.
pub fn write_decomposition<W: Write>(
    out: W,
    periods: &[Period],
    values: &[f64],
    trend: &[f64],
    cycle: &[f64],
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["period", "value", "trend", "cycle"])
        .map_err(csv_err)?;
    for (((p, v), t), c) in periods.iter().zip(values).zip(trend).zip(cycle) {
        writer
            .write_record([p.to_string(), v.to_string(), t.to_string(), c.to_string()])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_decomposition_csv(
    path: &Path,
    periods: &[Period],
    values: &[f64],
    trend: &[f64],
    cycle: &[f64],
) -> Result<(), AppError> {
    write_decomposition(create(path, "decomposition CSV")?, periods, values, trend, cycle)
}

/// Write components side by side: `period,<name>,<name>_trend[,<name>_cycle]`
/// per component. Only periods where every component has a value are kept.
pub fn write_cycle_table<W: Write>(out: W, components: &[&Decomposition], with_cycle: bool) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["period".to_string()];
    for c in components {
        header.push(c.name.clone());
        header.push(format!("{}_trend", c.name));
        if with_cycle {
            header.push(format!("{}_cycle", c.name));
        }
    }
    writer.write_record(&header).map_err(csv_err)?;

    let mut periods: Vec<Period> = components.iter().flat_map(|c| c.periods.iter().copied()).collect();
    periods.sort();
    periods.dedup();

    for period in periods {
        let Some(cells) = components.iter().map(|c| c.at(period)).collect::<Option<Vec<_>>>() else {
            continue;
        };
        let mut row = vec![period.to_string()];
        for (actual, trend, cycle) in cells {
            row.push(actual.to_string());
            row.push(trend.to_string());
            if with_cycle {
                row.push(cycle.to_string());
            }
        }
        writer.write_record(&row).map_err(csv_err)?;
    }

    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_cycle_table_csv(path: &Path, components: &[&Decomposition], with_cycle: bool) -> Result<(), AppError> {
    write_cycle_table(create(path, "cycle CSV")?, components, with_cycle)
}

/// Write the growth calibration behind a cycle dataset as `parameter,value`.
pub fn write_cycle_calibration<W: Write>(out: W, data: &CycleDataset) -> Result<(), AppError> {
    let cal = &data.calibration;
    let rows = [
        ("alpha", cal.alpha),
        ("saving_rate", cal.params.saving_rate),
        ("labor_growth", cal.params.labor_growth),
        ("tfp_growth", cal.params.tfp_growth),
        ("depreciation", cal.params.depreciation),
        ("depreciation_ratio", cal.depreciation_ratio),
        ("initial_capital", cal.initial_capital),
    ];
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["parameter", "value"]).map_err(csv_err)?;
    for (name, value) in rows {
        writer.write_record([name.to_string(), value.to_string()]).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_cycle_calibration_csv(path: &Path, data: &CycleDataset) -> Result<(), AppError> {
    write_cycle_calibration(create(path, "calibration CSV")?, data)
}

/// Write a cross-section. Columns: `group,period,<indicators>`.
pub fn write_cross_section<W: Write>(out: W, cs: &CrossSection) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["group".to_string(), "period".to_string()];
    header.extend(cs.columns.iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;

    let period = cs.period.to_string();
    for (group, values) in &cs.rows {
        let mut row = vec![group.clone(), period.clone()];
        row.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&row).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_cross_section_csv(path: &Path, cs: &CrossSection) -> Result<(), AppError> {
    write_cross_section(create(path, "cross-section CSV")?, cs)
}

/// Write a wide table. Columns: `period,<groups>`.
pub fn write_wide_table<W: Write>(out: W, table: &WideTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut header = vec!["period".to_string()];
    header.extend(table.groups.iter().cloned());
    writer.write_record(&header).map_err(csv_err)?;

    for (i, period) in table.periods.iter().enumerate() {
        let mut row = vec![period.to_string()];
        row.extend(table.columns.iter().map(|column| column[i].to_string()));
        writer.write_record(&row).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| AppError::input(format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

pub fn write_wide_table_csv(path: &Path, table: &WideTable) -> Result<(), AppError> {
    write_wide_table(create(path, "table CSV")?, table)
}
