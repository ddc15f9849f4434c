//! Window statistics.
//!
//! Both statistics read values strictly inside a validated window, using the
//! window's own `first()` / `last()` indices.

use std::fmt;

use crate::domain::{StatKind, Window};

/// Why a statistic could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StatError {
    /// Growth needs two endpoints; the window has fewer periods.
    DegenerateWindow { length: usize },
    /// The window reaches past the end of the value slice.
    OutOfBounds { window: Window, len: usize },
    /// A period inside the window has no value.
    MissingValue { index: usize },
    /// The arithmetic produced NaN or infinity (e.g. a zero base value).
    NonFinite,
}

impl fmt::Display for StatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatError::DegenerateWindow { length } => {
                write!(f, "window of {length} period(s) is too short for a growth rate")
            }
            StatError::OutOfBounds { window, len } => {
                write!(f, "window {window} exceeds {len} values")
            }
            StatError::MissingValue { index } => write!(f, "missing value at index {index}"),
            StatError::NonFinite => write!(f, "result is not finite"),
        }
    }
}

fn window_values(values: &[Option<f64>], window: Window) -> Result<&[Option<f64>], StatError> {
    window.slice(values).ok_or(StatError::OutOfBounds {
        window,
        len: values.len(),
    })
}

fn value_at(values: &[Option<f64>], index: usize) -> Result<f64, StatError> {
    values
        .get(index)
        .copied()
        .flatten()
        .ok_or(StatError::MissingValue { index })
}

fn finite(x: f64) -> Result<f64, StatError> {
    if x.is_finite() { Ok(x) } else { Err(StatError::NonFinite) }
}

/// Arithmetic mean over `[start, stop)`.
pub fn average_rate(values: &[Option<f64>], window: Window) -> Result<f64, StatError> {
    let slice = window_values(values, window)?;
    if slice.is_empty() {
        return Err(StatError::DegenerateWindow { length: 0 });
    }
    let mut sum = 0.0;
    for (offset, v) in slice.iter().enumerate() {
        sum += v.ok_or(StatError::MissingValue {
            index: window.start() + offset,
        })?;
    }
    finite(sum / slice.len() as f64)
}

/// Endpoint compound growth rate per period:
/// `(v[stop-1] / v[start]) ^ (1 / (stop - start - 1)) - 1`.
pub fn compound_growth(values: &[Option<f64>], window: Window) -> Result<f64, StatError> {
    window_values(values, window)?;
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return Err(StatError::DegenerateWindow { length: 0 });
    };
    if window.len() < 2 {
        return Err(StatError::DegenerateWindow {
            length: window.len(),
        });
    }

    let v0 = value_at(values, first)?;
    let v1 = value_at(values, last)?;
    let steps = (window.len() - 1) as f64;
    finite((v1 / v0).powf(1.0 / steps) - 1.0)
}

/// Compute `kind` over `window` and multiply by `scale`.
pub fn compute(kind: StatKind, values: &[Option<f64>], window: Window, scale: f64) -> Result<f64, StatError> {
    let raw = match kind {
        StatKind::Average => average_rate(values, window)?,
        StatKind::Growth => compound_growth(values, window)?,
    };
    finite(raw * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(start: usize, stop: usize) -> Window {
        Window::new(start, stop).unwrap()
    }

    #[test]
    fn compound_growth_uses_endpoints() {
        let values = [Some(100.0), Some(110.0), Some(121.0)];
        let g = compound_growth(&values, w(0, 3)).unwrap();
        assert!((g - 0.10).abs() < 1e-12, "got {g}");
    }

    #[test]
    fn compound_growth_ignores_interior_path() {
        // Same endpoints, wild interior: only endpoints matter.
        let values = [Some(100.0), Some(500.0), Some(121.0)];
        let g = compound_growth(&values, w(0, 3)).unwrap();
        assert!((g - 0.10).abs() < 1e-12);
    }

    #[test]
    fn compound_growth_respects_window_offsets() {
        let values = [None, Some(50.0), Some(100.0), Some(110.0), Some(121.0), None];
        let g = compound_growth(&values, w(2, 5)).unwrap();
        assert!((g - 0.10).abs() < 1e-12);
    }

    #[test]
    fn growth_over_single_period_is_degenerate() {
        let values = [Some(1.0), Some(2.0)];
        let err = compound_growth(&values, w(1, 2)).unwrap_err();
        assert_eq!(err, StatError::DegenerateWindow { length: 1 });
    }

    #[test]
    fn growth_from_zero_base_is_not_finite() {
        let values = [Some(0.0), Some(2.0)];
        assert_eq!(compound_growth(&values, w(0, 2)).unwrap_err(), StatError::NonFinite);
    }

    #[test]
    fn average_over_single_period_is_the_value() {
        let values = [None, None, None, None, None, Some(4.25), None];
        assert_eq!(average_rate(&values, w(5, 6)).unwrap(), 4.25);
    }

    #[test]
    fn average_rejects_gaps_and_overruns() {
        let values = [Some(1.0), None, Some(3.0)];
        assert_eq!(average_rate(&values, w(0, 3)).unwrap_err(), StatError::MissingValue { index: 1 });
        assert!(matches!(average_rate(&values, w(1, 5)), Err(StatError::OutOfBounds { .. })));
    }

    #[test]
    fn compute_applies_scale() {
        let values = [Some(5.0), Some(7.0)];
        let avg = compute(StatKind::Average, &values, w(0, 2), 0.01).unwrap();
        assert!((avg - 0.06).abs() < 1e-12);
    }
}
