//! Business-cycle dataset for one group.
//!
//! Chain:
//!
//! 1. deflate the national-accounts flows with the price deflator
//! 2. restrict gdp, consumption, investment and hours to their longest common window
//! 3. calibrate `s`, `n`, `g` and `δ`, then build capital by perpetual inventory
//! 4. TFP from the Cobb-Douglas production function
//! 5. scale to thousands per person
//! 6. HP filter: logs for levels, plain values for rates
//!
//! Flows are taken to be annualized rates, so they are divided by the number
//! of periods per year before entering the capital recursion.

use crate::align::{align, fill_calendar};
use crate::domain::{AlignMode, GroupData, Period, Series};
use crate::error::{AppError, EXIT_EMPTY};
use crate::math::{GrowthParams, endpoint_growth, hp_filter, perpetual_inventory, total_factor_productivity};
use crate::transform::{deflate, ln, per_capita, percent_change, ratio, scale};
use crate::window::{find_longest_window, validate_window};

/// Capital share of income.
pub const DEFAULT_ALPHA: f64 = 0.35;

/// The HP filter needs at least this many periods.
const MIN_FILTER_LENGTH: usize = 3;

/// Output components of the real-business-cycle subset, in column order.
pub const RBC_COMPONENTS: [&str; 6] = ["gdp", "consumption", "investment", "hours", "capital", "tfp"];

const PRODUCTION_INPUTS: [&str; 4] = ["gdp", "consumption", "investment", "hours"];

/// Optional inputs: (indicator, output component, how it is prepared).
const EXTRA_INPUTS: [(&str, &str, Extra); 5] = [
    ("m2", "real_m2", Extra::RealPerCapita),
    ("tbill", "t_bill_3mo", Extra::Rate),
    ("pce", "pce_inflation", Extra::Inflation),
    ("cpi", "cpi_inflation", Extra::Inflation),
    ("unemployment", "unemployment", Extra::Rate),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extra {
    /// Deflated, per person, filtered in logs.
    RealPerCapita,
    /// Percent to fraction, filtered in levels.
    Rate,
    /// Year-over-year change of a price index, as a fraction.
    Inflation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleParams {
    pub alpha: f64,
    pub lambda: f64,
    /// Average depreciation-to-output ratio. Taken from a `depreciation`
    /// indicator when `None`.
    pub depreciation_ratio: Option<f64>,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            lambda: crate::math::LAMBDA_QUARTERLY,
            depreciation_ratio: None,
        }
    }
}

/// Calibrated growth-model values behind the capital series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthCalibration {
    pub alpha: f64,
    pub params: GrowthParams,
    pub depreciation_ratio: f64,
    pub initial_capital: f64,
}

/// Actual, trend and cycle of one component. For log-filtered components
/// the trend is back in levels and the cycle is the log deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub name: String,
    pub periods: Vec<Period>,
    pub actual: Vec<f64>,
    pub trend: Vec<f64>,
    pub cycle: Vec<f64>,
}

impl Decomposition {
    /// `(actual, trend, cycle)` at `period`.
    pub fn at(&self, period: Period) -> Option<(f64, f64, f64)> {
        let idx = self.periods.binary_search(&period).ok()?;
        Some((self.actual[idx], self.trend[idx], self.cycle[idx]))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleDataset {
    pub group: String,
    pub calibration: GrowthCalibration,
    pub components: Vec<Decomposition>,
}

impl CycleDataset {
    pub fn component(&self, name: &str) -> Option<&Decomposition> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn rbc(&self) -> Vec<&Decomposition> {
        RBC_COMPONENTS.iter().filter_map(|name| self.component(name)).collect()
    }

    pub fn has_extras(&self) -> bool {
        self.components.len() > RBC_COMPONENTS.len()
    }
}

pub fn build_cycle_dataset(group: &GroupData, params: &CycleParams) -> Result<CycleDataset, AppError> {
    let get = |name: &str| -> Result<Series, AppError> {
        group
            .series(name)
            .map(fill_calendar)
            .ok_or_else(|| AppError::input(format!("{}: indicator '{name}' not found.", group.id)))
    };

    let deflator = get("deflator")?;
    let population = get("population")?;
    let nominal_gdp = get("gdp")?;
    let gdp = deflate(&nominal_gdp, &deflator);
    let consumption = deflate(&get("consumption")?, &deflator);
    let investment = deflate(&get("investment")?, &deflator);
    let hours = get("hours")?;

    let table = align(
        &[
            ("gdp", &gdp),
            ("consumption", &consumption),
            ("investment", &investment),
            ("hours", &hours),
        ],
        AlignMode::Intersection,
    );
    let mask = table
        .observed_mask(&PRODUCTION_INPUTS)
        .map_err(|reason| AppError::new(EXIT_EMPTY, format!("{}: {reason}", group.id)))?;
    let window = validate_window(find_longest_window(&mask), MIN_FILTER_LENGTH)
        .map_err(|reason| AppError::new(EXIT_EMPTY, format!("{}: production data: {reason}", group.id)))?;
    let periods: Vec<Period> = window.slice(table.periods()).unwrap_or_default().to_vec();
    let observed = |name: &str| -> Vec<f64> {
        table
            .column(name)
            .and_then(|values| window.slice(values))
            .map(|values| values.iter().flatten().copied().collect())
            .unwrap_or_default()
    };
    let y = observed("gdp");
    let c = observed("consumption");
    let i = observed("investment");
    let l = observed("hours");
    log::info!(
        "{}: production window {} to {} ({} periods)",
        group.id,
        periods[0],
        periods[periods.len() - 1],
        periods.len()
    );

    let per_year = f64::from(periods[0].frequency().periods_per_year());
    let saving_rate = i.iter().zip(&y).map(|(i, y)| i / y).sum::<f64>() / y.len() as f64;
    let labor_growth = endpoint_growth(&l)?;
    let tfp_growth = endpoint_growth(&y)? - labor_growth;
    let depreciation_ratio = match params.depreciation_ratio {
        Some(r) => r,
        None => depreciation_ratio(group, &nominal_gdp, &periods)?,
    };
    let depreciation = GrowthParams::implied_depreciation(saving_rate, labor_growth, tfp_growth, depreciation_ratio)?;
    let growth = GrowthParams {
        saving_rate,
        labor_growth,
        tfp_growth,
        depreciation,
    };
    let initial_capital = growth.steady_state_capital(y[0] / per_year)?;
    let flows: Vec<f64> = i.iter().map(|v| v / per_year).collect();
    let k = perpetual_inventory(&flows, initial_capital, depreciation);
    let tfp = total_factor_productivity(&y, &k, &l, params.alpha)?;

    log::info!(
        "{}: s = {saving_rate:.5}, n = {:.5}/yr, g = {:.5}/yr, delta = {:.5}/yr",
        group.id,
        labor_growth * per_year,
        tfp_growth * per_year,
        depreciation * per_year
    );

    let on_window = |values: &[f64]| -> Series {
        Series::from_observations(periods.iter().copied().zip(values.iter().map(|v| Some(*v)))).unwrap_or_default()
    };
    let thousands_per_person = |values: &[f64]| per_capita(&on_window(values), &population, 1000.0);

    let mut components = vec![
        decompose("gdp", &thousands_per_person(&y), true, params.lambda)?,
        decompose("consumption", &thousands_per_person(&c), true, params.lambda)?,
        decompose("investment", &thousands_per_person(&i), true, params.lambda)?,
        decompose("hours", &thousands_per_person(&l), true, params.lambda)?,
        decompose("capital", &thousands_per_person(&k), true, params.lambda)?,
        decompose("tfp", &on_window(&tfp), true, params.lambda)?,
    ];

    for (indicator, name, extra) in EXTRA_INPUTS {
        let Some(raw) = group.series(indicator) else {
            continue;
        };
        let raw = fill_calendar(raw);
        let (prepared, log_scale) = match extra {
            Extra::RealPerCapita => (per_capita(&deflate(&raw, &deflator), &population, 1000.0), true),
            Extra::Rate => (scale(&raw, 0.01), false),
            Extra::Inflation => {
                let lag = periods[0].frequency().periods_per_year() as usize;
                (scale(&percent_change(&raw, lag), 0.01), false)
            }
        };
        match decompose(name, &prepared, log_scale, params.lambda) {
            Ok(component) => components.push(component),
            Err(err) => log::warn!("{}: skipping '{name}': {err}", group.id),
        }
    }

    Ok(CycleDataset {
        group: group.id.clone(),
        calibration: GrowthCalibration {
            alpha: params.alpha,
            params: growth,
            depreciation_ratio,
            initial_capital,
        },
        components,
    })
}

/// Mean of `depreciation / gdp` (both nominal) over the production window.
fn depreciation_ratio(group: &GroupData, nominal_gdp: &Series, periods: &[Period]) -> Result<f64, AppError> {
    let depreciation = group.series("depreciation").ok_or_else(|| {
        AppError::input(format!(
            "{}: no 'depreciation' indicator; pass a depreciation-to-output ratio instead.",
            group.id
        ))
    })?;
    let shares = ratio(depreciation, nominal_gdp);
    let (first, last) = (periods[0], periods[periods.len() - 1]);
    let values: Vec<f64> = shares
        .iter()
        .filter(|(p, _)| (first..=last).contains(p))
        .filter_map(|(_, v)| v)
        .collect();
    if values.is_empty() {
        return Err(AppError::new(
            EXIT_EMPTY,
            format!("{}: depreciation and gdp never overlap in the production window.", group.id),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// HP-filter `series` over its longest observed window.
fn decompose(name: &str, series: &Series, log_scale: bool, lambda: f64) -> Result<Decomposition, AppError> {
    let filtered = if log_scale { ln(series) } else { series.clone() };
    let mask: Vec<bool> = filtered.values().iter().map(Option::is_some).collect();
    let window = validate_window(find_longest_window(&mask), MIN_FILTER_LENGTH)
        .map_err(|reason| AppError::new(EXIT_EMPTY, format!("'{name}': {reason}")))?;

    let window_values = |s: &Series| -> Vec<f64> {
        window
            .slice(s.values())
            .unwrap_or_default()
            .iter()
            .flatten()
            .copied()
            .collect()
    };
    let input = window_values(&filtered);
    let (cycle, trend) = hp_filter(&input, lambda)?;
    let trend = if log_scale { trend.iter().map(|t| t.exp()).collect() } else { trend };

    Ok(Decomposition {
        name: name.to_string(),
        periods: window.slice(series.periods()).unwrap_or_default().to_vec(),
        actual: window_values(series),
        trend,
        cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUARTERS: usize = 40;

    fn quarterly(f: impl Fn(usize) -> f64) -> Series {
        Series::from_observations((0..QUARTERS).map(|t| {
            let period = Period::quarterly(1990 + (t / 4) as i32, (t % 4) as u32 + 1).unwrap();
            (period, Some(f(t)))
        }))
        .unwrap()
    }

    /// Real gdp grows 1% a quarter, prices 0.5%, hours 0.2%, population 0.1%.
    fn economy() -> GroupData {
        let price = |t: usize| 100.0 * 1.005f64.powi(t as i32);
        let nominal = move |t: usize| 1000.0 * 1.01f64.powi(t as i32) * price(t) / 100.0;
        GroupData::new("USA")
            .with_series("deflator", quarterly(price))
            .with_series("gdp", quarterly(nominal))
            .with_series("consumption", quarterly(move |t| 0.7 * nominal(t)))
            .with_series("investment", quarterly(move |t| 0.2 * nominal(t)))
            .with_series("depreciation", quarterly(move |t| 0.15 * nominal(t)))
            .with_series("hours", quarterly(|t| 100.0 * 1.002f64.powi(t as i32)))
            .with_series("population", quarterly(|t| 200.0 * 1.001f64.powi(t as i32)))
    }

    #[test]
    fn calibrates_capital_from_steady_state() {
        let data = build_cycle_dataset(&economy(), &CycleParams::default()).unwrap();
        let cal = data.calibration;
        assert!((cal.params.saving_rate - 0.2).abs() < 1e-9);
        assert!((cal.params.labor_growth - 0.002).abs() < 1e-9);
        assert!((cal.params.tfp_growth - 0.008).abs() < 1e-9);
        assert!((cal.depreciation_ratio - 0.15).abs() < 1e-9);
        // (n + g) * 0.15 / (0.2 - 0.15)
        assert!((cal.params.depreciation - 0.03).abs() < 1e-9);
        // 1000 / 4 * 0.2 / (0.002 + 0.008 + 0.03)
        assert!((cal.initial_capital - 1250.0).abs() < 1e-6);

        let capital = data.component("capital").unwrap();
        assert_eq!(capital.periods.len(), QUARTERS);
        assert!((capital.actual[0] - 1250.0 / 200.0 * 1000.0).abs() < 1e-6);
    }

    #[test]
    fn rbc_components_in_order_with_matching_lengths() {
        let data = build_cycle_dataset(&economy(), &CycleParams::default()).unwrap();
        let names: Vec<&str> = data.rbc().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, RBC_COMPONENTS);
        assert!(!data.has_extras());
        for c in &data.components {
            assert_eq!(c.actual.len(), c.periods.len());
            assert_eq!(c.trend.len(), c.periods.len());
            assert_eq!(c.cycle.len(), c.periods.len());
        }
        let gdp = data.component("gdp").unwrap();
        let (actual, _, _) = gdp.at(gdp.periods[0]).unwrap();
        assert!((actual - 1000.0 / 200.0 * 1000.0).abs() < 1e-6);
    }

    #[test]
    fn rate_extras_are_filtered_in_levels() {
        let group = economy()
            .with_series("tbill", quarterly(|_| 5.0))
            .with_series("cpi", quarterly(|t| 100.0 * 1.005f64.powi(t as i32)));
        let data = build_cycle_dataset(&group, &CycleParams::default()).unwrap();
        assert!(data.has_extras());

        let tbill = data.component("t_bill_3mo").unwrap();
        assert!(tbill.actual.iter().all(|v| (v - 0.05).abs() < 1e-12));
        assert!(tbill.cycle.iter().all(|c| c.abs() < 1e-9));

        // Year-over-year change loses the first four quarters.
        let cpi = data.component("cpi_inflation").unwrap();
        assert_eq!(cpi.periods.len(), QUARTERS - 4);
        assert!((cpi.actual[0] - (1.005f64.powi(4) - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn explicit_ratio_replaces_missing_depreciation_series() {
        let mut group = economy();
        group.series.remove("depreciation");
        assert_eq!(
            build_cycle_dataset(&group, &CycleParams::default()).unwrap_err().exit_code(),
            crate::error::EXIT_INPUT
        );

        let params = CycleParams {
            depreciation_ratio: Some(0.15),
            ..Default::default()
        };
        let data = build_cycle_dataset(&group, &params).unwrap();
        assert!((data.calibration.params.depreciation - 0.03).abs() < 1e-9);
    }

    #[test]
    fn missing_required_indicator_is_an_input_error() {
        let mut group = economy();
        group.series.remove("population");
        let err = build_cycle_dataset(&group, &CycleParams::default()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        assert!(err.message().contains("population"));
    }
}
