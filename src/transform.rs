//! Series transforms applied before calibration: deflation, unit scaling,
//! ratios, per-capita scaling, logs and percent changes.
//!
//! Binary transforms work over the periods both inputs share; a period where
//! either side is missing stays missing.

use crate::align::{align, fill_calendar};
use crate::domain::{AlignMode, Period, Series};

fn combine(a: &Series, b: &Series, f: impl Fn(f64, f64) -> f64) -> Series {
    let table = align(&[("a", a), ("b", b)], AlignMode::Intersection);
    let (Some(xs), Some(ys)) = (table.column("a"), table.column("b")) else {
        return Series::default();
    };
    let observations: Vec<(Period, Option<f64>)> = table
        .periods()
        .iter()
        .zip(xs.iter().zip(ys))
        .map(|(&p, (x, y))| (p, x.zip(*y).map(|(x, y)| f(x, y))))
        .collect();
    // Periods come from an aligned axis, so they are unique.
    Series::from_observations(observations).unwrap_or_default()
}

/// Real series: `nominal / deflator * 100`.
pub fn deflate(nominal: &Series, deflator: &Series) -> Series {
    combine(nominal, deflator, |x, d| x / d * 100.0)
}

/// Multiply every value by `factor` (e.g. `0.01` for percent to fraction).
pub fn scale(series: &Series, factor: f64) -> Series {
    series.map_values(|x| x * factor)
}

/// `numerator / denominator` over shared periods.
pub fn ratio(numerator: &Series, denominator: &Series) -> Series {
    combine(numerator, denominator, |x, d| x / d)
}

/// `series / population * multiplier`.
pub fn per_capita(series: &Series, population: &Series, multiplier: f64) -> Series {
    combine(series, population, |x, pop| x / pop * multiplier)
}

/// Natural log; non-positive values become missing.
pub fn ln(series: &Series) -> Series {
    series.map_values(f64::ln)
}

/// Annualised percent change over `lag` periods: `(x_t / x_{t-lag} - 1) * 100`.
///
/// The lag counts calendar periods. The first `lag` periods have no
/// predecessor and are dropped.
pub fn percent_change(series: &Series, lag: usize) -> Series {
    let series = &fill_calendar(series);
    if lag == 0 || series.len() <= lag {
        return Series::default();
    }
    let values = series.values();
    let observations: Vec<(Period, Option<f64>)> = series
        .periods()
        .iter()
        .enumerate()
        .skip(lag)
        .map(|(i, &p)| {
            let change = values[i].zip(values[i - lag]).map(|(now, before)| (now / before - 1.0) * 100.0);
            (p, change)
        })
        .collect();
    Series::from_observations(observations).unwrap_or_default()
}
