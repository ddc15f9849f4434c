//! Series alignment.
//!
//! Several named series of one group are put on a single chronological
//! period axis. The axis is calendar-complete: every period between the
//! first and the last one is present, so a year without a row is a missing
//! cell and never joins its neighbours. Periods a series does not cover
//! become explicit `None` cells; disjoint inputs are valid and simply produce
//! mostly-missing rows.

use std::collections::BTreeSet;

use crate::domain::{AlignMode, Period, Series, SkipReason};

/// One named column of an aligned table.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Several series sharing one period axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedTable {
    periods: Vec<Period>,
    columns: Vec<AlignedColumn>,
}

impl AlignedTable {
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn columns(&self) -> &[AlignedColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// `true` at every period where all `required` columns are observed.
    ///
    /// An empty `required` list yields an all-`true` mask.
    pub fn observed_mask(&self, required: &[&str]) -> Result<Vec<bool>, SkipReason> {
        let mut mask = vec![true; self.periods.len()];
        for name in required {
            let values = self.column(name).ok_or_else(|| SkipReason::MissingIndicator {
                indicator: name.to_string(),
            })?;
            for (m, v) in mask.iter_mut().zip(values) {
                *m &= v.is_some();
            }
        }
        Ok(mask)
    }
}

/// Align named series onto a common period axis.
///
/// Duplicate names keep the first occurrence.
pub fn align(series: &[(&str, &Series)], mode: AlignMode) -> AlignedTable {
    let periods = common_periods(series, mode);

    let mut columns: Vec<AlignedColumn> = Vec::with_capacity(series.len());
    for (name, s) in series {
        if columns.iter().any(|c| c.name == *name) {
            continue;
        }
        // Both axes are sorted, so one merge pass fills the column.
        let mut values = Vec::with_capacity(periods.len());
        let mut src = s.iter().peekable();
        for p in &periods {
            while src.peek().is_some_and(|(sp, _)| sp < p) {
                src.next();
            }
            let value = match src.peek() {
                Some((sp, v)) if sp == p => *v,
                _ => None,
            };
            values.push(value);
        }
        columns.push(AlignedColumn {
            name: name.to_string(),
            values,
        });
    }

    AlignedTable { periods, columns }
}

fn common_periods(series: &[(&str, &Series)], mode: AlignMode) -> Vec<Period> {
    let present: BTreeSet<Period> = series
        .iter()
        .flat_map(|(_, s)| s.periods().iter().copied())
        .collect();
    let (Some(&first), Some(&last)) = (present.first(), present.last()) else {
        return Vec::new();
    };
    let axis = calendar(first, last, present);

    match mode {
        AlignMode::Union => axis,
        AlignMode::Intersection => {
            // The span every series covers; interior gaps stay on the axis.
            let mut bounds = series.iter().map(|(_, s)| (s.periods().first(), s.periods().last()));
            let Some((Some(&lo), Some(&hi))) = bounds.next() else {
                return Vec::new();
            };
            let (mut lo, mut hi) = (lo, hi);
            for bound in bounds {
                let (Some(&a), Some(&b)) = bound else {
                    return Vec::new();
                };
                lo = lo.max(a);
                hi = hi.min(b);
            }
            axis.into_iter().filter(|p| (lo..=hi).contains(p)).collect()
        }
    }
}

/// Every period from `first` to `last`, stepping at `first`'s frequency.
///
/// Periods in `present` are always kept, so a mixed-frequency input still
/// lands on the axis.
fn calendar(first: Period, last: Period, mut present: BTreeSet<Period>) -> Vec<Period> {
    let mut current = first;
    while let Some(next) = current.next() {
        if next > last {
            break;
        }
        present.insert(next);
        current = next;
    }
    present.into_iter().collect()
}

/// Every period from `first` to `last` inclusive.
pub fn calendar_span(first: Period, last: Period) -> Vec<Period> {
    if last < first {
        return Vec::new();
    }
    calendar(first, last, BTreeSet::from([first, last]))
}

/// `series` on its own calendar-complete axis: periods without a row become
/// missing cells.
pub fn fill_calendar(series: &Series) -> Series {
    let table = align(&[("x", series)], AlignMode::Union);
    let Some(values) = table.column("x") else {
        return Series::default();
    };
    Series::from_observations(table.periods().iter().copied().zip(values.iter().copied())).unwrap_or_default()
}
