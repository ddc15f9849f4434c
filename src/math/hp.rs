//! Hodrick–Prescott trend/cycle decomposition.
//!
//! The trend `τ` minimizes
//!
//! ```text
//! Σ (y_t - τ_t)^2 + λ Σ (τ_{t+1} - 2τ_t + τ_{t-1})^2
//! ```
//!
//! which is the linear system `(I + λ D'D) τ = y`, with `D` the second
//! difference operator. The system matrix is symmetric positive definite, so
//! a Cholesky solve is enough. Series here are a few hundred periods at most.

use nalgebra::{DMatrix, DVector};

use crate::error::{AppError, EXIT_NUMERIC};

/// Conventional smoothing parameter for quarterly data.
pub const LAMBDA_QUARTERLY: f64 = 1600.0;

/// Decompose `values` into `(cycle, trend)`, with `cycle = values - trend`.
pub fn hp_filter(values: &[f64], lambda: f64) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let n = values.len();
    if n < 3 {
        return Err(AppError::new(EXIT_NUMERIC, "HP filter needs at least 3 observations."));
    }
    if !(lambda.is_finite() && lambda >= 0.0) {
        return Err(AppError::new(EXIT_NUMERIC, format!("Invalid HP lambda {lambda}.")));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(EXIT_NUMERIC, "HP filter input contains non-finite values."));
    }

    let d = DMatrix::from_fn(n - 2, n, |i, j| match j as isize - i as isize {
        0 | 2 => 1.0,
        1 => -2.0,
        _ => 0.0,
    });
    let system = DMatrix::<f64>::identity(n, n) + (d.transpose() * &d) * lambda;
    let y = DVector::from_column_slice(values);

    let trend = system
        .cholesky()
        .map(|c| c.solve(&y))
        .ok_or_else(|| AppError::new(EXIT_NUMERIC, "HP filter system is not positive definite."))?;

    let trend: Vec<f64> = trend.iter().copied().collect();
    let cycle = values.iter().zip(&trend).map(|(y, t)| y - t).collect();
    Ok((cycle, trend))
}
