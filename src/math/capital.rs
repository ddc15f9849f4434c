//! Capital-stock accounting for growth-model calibration.
//!
//! Perpetual inventory: `K[t+1] = I[t] + (1 - δ) K[t]`, started from the
//! balanced-growth capital stock `K[0] = Y[0] s / (n + g + δ)`.

use crate::domain::Window;
use crate::error::{AppError, EXIT_NUMERIC};
use crate::stats::compound_growth;

/// Balanced-growth parameters backing the initial capital stock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthParams {
    /// Average investment share of output.
    pub saving_rate: f64,
    /// Labor (hours) growth per period.
    pub labor_growth: f64,
    /// Output growth per period net of labor growth.
    pub tfp_growth: f64,
    /// Depreciation rate per period.
    pub depreciation: f64,
}

impl GrowthParams {
    /// Depreciation implied by an average depreciation-to-output ratio:
    /// `δ = (n + g) (D/Y) / (s - D/Y)`.
    pub fn implied_depreciation(
        saving_rate: f64,
        labor_growth: f64,
        tfp_growth: f64,
        depreciation_to_output: f64,
    ) -> Result<f64, AppError> {
        let gap = saving_rate - depreciation_to_output;
        if gap <= 0.0 {
            return Err(AppError::new(
                EXIT_NUMERIC,
                "Saving rate must exceed the depreciation-to-output ratio.",
            ));
        }
        Ok((labor_growth + tfp_growth) * depreciation_to_output / gap)
    }

    /// `K[0] = Y[0] s / (n + g + δ)`.
    pub fn steady_state_capital(&self, initial_output: f64) -> Result<f64, AppError> {
        let denom = self.labor_growth + self.tfp_growth + self.depreciation;
        if denom <= 0.0 {
            return Err(AppError::new(
                EXIT_NUMERIC,
                "n + g + delta must be positive for a steady-state capital stock.",
            ));
        }
        Ok(initial_output * self.saving_rate / denom)
    }
}

/// Average per-period growth between the first and last value of a fully
/// observed path, as used for `n` and `g`.
pub fn endpoint_growth(path: &[f64]) -> Result<f64, AppError> {
    let values: Vec<Option<f64>> = path.iter().map(|v| Some(*v)).collect();
    let window = Window::new(0, values.len())
        .ok_or_else(|| AppError::new(EXIT_NUMERIC, "Growth needs a non-empty path."))?;
    compound_growth(&values, window).map_err(|e| AppError::new(EXIT_NUMERIC, format!("Growth rate: {e}")))
}

/// Capital path of the same length as `investment`, starting at `initial`.
pub fn perpetual_inventory(investment: &[f64], initial: f64, depreciation: f64) -> Vec<f64> {
    let mut capital = Vec::with_capacity(investment.len());
    if investment.is_empty() {
        return capital;
    }
    capital.push(initial);
    for inv in &investment[..investment.len() - 1] {
        let last = capital[capital.len() - 1];
        capital.push(inv + (1.0 - depreciation) * last);
    }
    capital
}

/// Solow residual `Y / (K^α L^(1-α))` per period.
pub fn total_factor_productivity(
    output: &[f64],
    capital: &[f64],
    labor: &[f64],
    alpha: f64,
) -> Result<Vec<f64>, AppError> {
    if output.len() != capital.len() || output.len() != labor.len() {
        return Err(AppError::new(EXIT_NUMERIC, "TFP inputs must have equal length."));
    }
    Ok(output
        .iter()
        .zip(capital)
        .zip(labor)
        .map(|((y, k), l)| y / k.powf(alpha) / l.powf(1.0 - alpha))
        .collect())
}
