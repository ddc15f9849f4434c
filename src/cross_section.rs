//! Cross-country tables built from a panel.
//!
//! - the latest-period production cross-section (complete rows only)
//! - wide per-person output tables, restricted to groups observed in every
//!   period since a start period

use crate::align::{calendar_span, fill_calendar};
use crate::domain::{Panel, Period, Series};
use crate::error::{AppError, EXIT_EMPTY};
use crate::transform::per_capita;

/// Inputs of the production cross-section, in column order.
pub const PRODUCTION_INDICATORS: [&str; 4] = ["gdp", "labor", "human capital", "physical capital"];

#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub period: Period,
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<f64>)>,
    /// Groups with at least one missing value in `period`.
    pub dropped: Vec<String>,
}

/// Groups as columns, periods as rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub periods: Vec<Period>,
    pub groups: Vec<String>,
    /// One column per group, aligned with `periods`.
    pub columns: Vec<Vec<f64>>,
}

fn series_of<'a>(panel: &'a Panel, indicators: &'a [&str]) -> impl Iterator<Item = &'a Series> + 'a {
    panel
        .groups
        .iter()
        .flat_map(move |g| indicators.iter().filter_map(move |name| g.series(name)))
}

fn latest_period(panel: &Panel, indicators: &[&str]) -> Option<Period> {
    series_of(panel, indicators).filter_map(|s| s.periods().last().copied()).max()
}

/// Values of `indicators` in the panel's latest period, one row per group
/// that has all of them.
pub fn latest_cross_section(panel: &Panel, indicators: &[&str]) -> Result<CrossSection, AppError> {
    let period = latest_period(panel, indicators)
        .ok_or_else(|| AppError::new(EXIT_EMPTY, format!("No group has any of {indicators:?}.")))?;

    let mut rows = Vec::new();
    let mut dropped = Vec::new();
    for group in &panel.groups {
        let values: Option<Vec<f64>> = indicators
            .iter()
            .map(|name| group.series(name).and_then(|s| s.get(period)))
            .collect();
        match values {
            Some(values) => rows.push((group.id.clone(), values)),
            None => dropped.push(group.id.clone()),
        }
    }
    log::info!(
        "cross-section {period}: {} complete groups, {} dropped",
        rows.len(),
        dropped.len()
    );

    Ok(CrossSection {
        period,
        columns: indicators.iter().map(|s| s.to_string()).collect(),
        rows,
        dropped,
    })
}

/// `output / persons` per group, rounded to cents, for every period from
/// `since` (or the first available period, if later) to the panel's latest.
/// Groups missing any of those periods are left out.
pub fn per_person_table(panel: &Panel, output: &str, persons: &str, since: Period) -> Result<WideTable, AppError> {
    let indicators = [output, persons];
    let last = latest_period(panel, &indicators)
        .ok_or_else(|| AppError::new(EXIT_EMPTY, format!("No group has '{output}' or '{persons}'.")))?;
    let first = series_of(panel, &indicators)
        .flat_map(|s| s.periods().iter().copied())
        .filter(|p| *p >= since)
        .min()
        .ok_or_else(|| AppError::new(EXIT_EMPTY, format!("No observations from {since} on.")))?;
    let periods = calendar_span(first, last);

    let mut groups = Vec::new();
    let mut columns = Vec::new();
    for group in &panel.groups {
        let (Some(num), Some(den)) = (group.series(output), group.series(persons)) else {
            continue;
        };
        let per_person = fill_calendar(&per_capita(num, den, 1.0));
        let column: Option<Vec<f64>> = periods
            .iter()
            .map(|p| per_person.get(*p).map(|v| (v * 100.0).round() / 100.0))
            .collect();
        match column {
            Some(column) => {
                groups.push(group.id.clone());
                columns.push(column);
            }
            None => log::debug!("{}: '{output}' per '{persons}' incomplete since {first}", group.id),
        }
    }
    log::info!(
        "'{output}' per '{persons}': {} of {} groups complete over {} periods",
        groups.len(),
        panel.groups.len(),
        periods.len()
    );

    Ok(WideTable {
        periods,
        groups,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GroupData;

    fn annual(start: i32, values: &[Option<f64>]) -> Series {
        Series::from_observations(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (Period::annual(start + i as i32).unwrap(), v)),
        )
        .unwrap()
    }

    fn production(id: &str, latest_capital: Option<f64>) -> GroupData {
        GroupData::new(id)
            .with_series("gdp", annual(2018, &[Some(90.0), Some(100.0)]))
            .with_series("labor", annual(2018, &[Some(4.0), Some(5.0)]))
            .with_series("human capital", annual(2018, &[Some(2.5), Some(2.6)]))
            .with_series("physical capital", annual(2018, &[Some(300.0), latest_capital]))
    }

    #[test]
    fn cross_section_keeps_complete_latest_rows() {
        let panel = Panel {
            groups: vec![
                production("A", Some(310.0)),
                production("B", None),
                GroupData::new("C").with_series("gdp", annual(2018, &[Some(1.0)])),
            ],
        };
        let cs = latest_cross_section(&panel, &PRODUCTION_INDICATORS).unwrap();
        assert_eq!(cs.period.to_string(), "2019");
        assert_eq!(cs.rows, vec![("A".to_string(), vec![100.0, 5.0, 2.6, 310.0])]);
        assert_eq!(cs.dropped, vec!["B", "C"]);
    }

    #[test]
    fn per_person_table_requires_full_coverage_since_start() {
        let panel = Panel {
            groups: vec![
                GroupData::new("FULL")
                    .with_series("real gdp", annual(1958, &[Some(1.0), Some(10.0), Some(20.0), Some(31.0)]))
                    .with_series("population", annual(1958, &[Some(1.0), Some(3.0), Some(4.0), Some(5.0)])),
                GroupData::new("LATE")
                    .with_series("real gdp", annual(1961, &[Some(8.0)]))
                    .with_series("population", annual(1961, &[Some(2.0)])),
                GroupData::new("HOLE")
                    .with_series("real gdp", annual(1959, &[Some(1.0), None, Some(1.0)]))
                    .with_series("population", annual(1959, &[Some(1.0), Some(1.0), Some(1.0)])),
            ],
        };
        let since = Period::annual(1960).unwrap();
        let table = per_person_table(&panel, "real gdp", "population", since).unwrap();

        let years: Vec<String> = table.periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(years, vec!["1960", "1961"]);
        assert_eq!(table.groups, vec!["FULL"]);
        assert_eq!(table.columns, vec![vec![6.67, 6.2]]);
    }

    #[test]
    fn empty_inputs_are_reported() {
        let err = latest_cross_section(&Panel::default(), &PRODUCTION_INDICATORS).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_EMPTY);
        let since = Period::annual(1960).unwrap();
        assert!(per_person_table(&Panel::default(), "real gdp", "population", since).is_err());
    }
}
