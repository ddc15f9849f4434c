//! Calibration configuration.
//!
//! Loaded from a TOML file (or taken from a built-in preset) and validated
//! before use. See [`CalibrationConfig::from_file`].

use std::collections::HashSet;
use std::fmt::Debug;
use std::ops::RangeBounds;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{AlignMode, GrowthPolicy, LookupPolicy, StatKind, StatisticSpec};
use crate::error::AppError;
use crate::window::DEFAULT_MIN_LENGTH;

/// World Bank aggregate and region codes. These are not countries.
pub const WB_AGGREGATE_CODES: &[&str] = &[
    "AFE", "AFR", "AFW", "ARB", "BEA", "BEC", "BHI", "BLA", "BMN", "BSS", "CAA", "CEA", "CEB", "CEU",
    "CLA", "CME", "CSA", "CSS", "DEA", "DEC", "DFS", "DLA", "DMN", "DNF", "DNS", "DSA", "DSF", "DSS",
    "EAP", "EAR", "EAS", "ECA", "ECS", "EMU", "EUU", "FCS", "FXS", "HIC", "HPC", "IBB", "IBD", "IBT",
    "IDA", "IDB", "IDX", "INX", "LAC", "LCN", "LDC", "LIC", "LMC", "LMY", "LTE", "MDE", "MEA", "MIC",
    "MNA", "NAC", "NAF", "NRS", "NXS", "OED", "OSS", "PRE", "PSS", "PST", "RRS", "SAS", "SSA", "SSF",
    "SST", "SXZ", "TEA", "TEC", "TLA", "TMN", "TSA", "TSS", "UMC", "WLD", "XZN",
];

/// Everything the pipeline needs to know besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Shortest accepted window, in periods.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default)]
    pub align: AlignMode,
    #[serde(default)]
    pub missing_lookup: LookupPolicy,
    #[serde(default)]
    pub degenerate_growth: GrowthPolicy,
    /// Indicators whose exact-zero values are data errors and count as missing.
    #[serde(default)]
    pub zero_as_missing: Vec<String>,
    /// Group identifiers never calibrated.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(rename = "statistic")]
    pub statistics: Vec<StatisticSpec>,
}

fn default_min_length() -> usize {
    DEFAULT_MIN_LENGTH
}

/// Built-in configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Money growth, inflation and real GDP growth.
    QuantityTheory,
    /// The closed-economy set plus lending rate and exchange-rate depreciation.
    QuantityTheoryOpen,
}

impl CalibrationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::input(format!("Failed to read config '{}': {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        let config: CalibrationConfig =
            toml::from_str(text).map_err(|e| AppError::input(format!("Invalid config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, AppError> {
        toml::to_string(self).map_err(|e| AppError::input(format!("Failed to serialize config: {e}")))
    }

    pub fn preset(preset: Preset) -> Self {
        let mut statistics = vec![
            StatisticSpec::new("broad money", "money growth", StatKind::Growth),
            StatisticSpec::new("gdp deflator", "inflation", StatKind::Growth),
            StatisticSpec::new("real gdp", "gdp growth", StatKind::Growth),
        ];
        if preset == Preset::QuantityTheoryOpen {
            statistics.push(
                StatisticSpec::new("lending rate", "nominal interest rate", StatKind::Average).scaled(0.01),
            );
            statistics.push(StatisticSpec::new(
                "exchange rate",
                "exchange rate depreciation",
                StatKind::Growth,
            ));
        }

        Self {
            min_length: DEFAULT_MIN_LENGTH,
            align: AlignMode::Union,
            missing_lookup: LookupPolicy::SkipField,
            degenerate_growth: GrowthPolicy::OmitStatistic,
            zero_as_missing: vec!["broad money".to_string(), "lending rate".to_string()],
            exclude: WB_AGGREGATE_CODES.iter().map(|s| s.to_string()).collect(),
            statistics,
        }
    }

    /// Distinct input indicators, in the order statistics request them.
    pub fn required_indicators(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for stat in &self.statistics {
            if !out.contains(&stat.indicator.as_str()) {
                out.push(&stat.indicator);
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), AppError> {
        check_num(self.min_length, 1..).map_err(|e| AppError::input(format!("Invalid min_length: {e}")))?;

        if self.statistics.is_empty() {
            return Err(AppError::input("Config must request at least one [[statistic]]."));
        }

        let mut columns = HashSet::new();
        for stat in &self.statistics {
            if stat.indicator.trim().is_empty() || stat.column.trim().is_empty() {
                return Err(AppError::input("Statistic indicator and column names must be non-empty."));
            }
            if !columns.insert(stat.column.as_str()) {
                return Err(AppError::input(format!("Duplicate statistic column '{}'.", stat.column)));
            }
            if !(stat.scale.is_finite() && stat.scale != 0.0) {
                return Err(AppError::input(format!(
                    "Statistic '{}' has invalid scale {}.",
                    stat.column, stat.scale
                )));
            }
        }

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<(), String>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(format!("number must be in the range {range:?}, but is {num:?}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = CalibrationConfig::from_toml(
            r#"
[[statistic]]
indicator = "real gdp"
column = "gdp growth"
kind = "growth"
"#,
        )
        .unwrap();

        assert_eq!(config.min_length, 10);
        assert_eq!(config.align, AlignMode::Union);
        assert_eq!(config.missing_lookup, LookupPolicy::SkipField);
        assert_eq!(config.degenerate_growth, GrowthPolicy::OmitStatistic);
        assert_eq!(config.statistics[0].scale, 1.0);
    }

    #[test]
    fn parses_policies_and_scales() {
        let config = CalibrationConfig::from_toml(
            r#"
min_length = 5
align = "intersection"
missing_lookup = "skip-group"
degenerate_growth = "skip-group"
exclude = ["WLD"]

[[statistic]]
indicator = "lending rate"
column = "nominal interest rate"
kind = "average"
scale = 0.01
"#,
        )
        .unwrap();

        assert_eq!(config.min_length, 5);
        assert_eq!(config.align, AlignMode::Intersection);
        assert_eq!(config.missing_lookup, LookupPolicy::SkipGroup);
        assert_eq!(config.degenerate_growth, GrowthPolicy::SkipGroup);
        assert_eq!(config.statistics[0].scale, 0.01);
    }

    #[test]
    fn rejects_invalid_configs() {
        assert!(CalibrationConfig::from_toml("min_length = 3\nstatistic = []\n").is_err());

        let zero_len = "min_length = 0\n[[statistic]]\nindicator = \"a\"\ncolumn = \"b\"\nkind = \"average\"\n";
        assert!(CalibrationConfig::from_toml(zero_len).is_err());

        let dup = "[[statistic]]\nindicator = \"a\"\ncolumn = \"x\"\nkind = \"average\"\n\
                   [[statistic]]\nindicator = \"b\"\ncolumn = \"x\"\nkind = \"growth\"\n";
        assert!(CalibrationConfig::from_toml(dup).is_err());

        let unknown = "bogus = 1\n[[statistic]]\nindicator = \"a\"\ncolumn = \"b\"\nkind = \"average\"\n";
        assert!(CalibrationConfig::from_toml(unknown).is_err());
    }

    #[test]
    fn presets_survive_toml_round_trip() {
        for preset in [Preset::QuantityTheory, Preset::QuantityTheoryOpen] {
            let config = CalibrationConfig::preset(preset);
            let text = config.to_toml().unwrap();
            assert_eq!(CalibrationConfig::from_toml(&text).unwrap(), config);
        }
    }

    #[test]
    fn open_preset_requires_five_indicators() {
        let config = CalibrationConfig::preset(Preset::QuantityTheoryOpen);
        assert_eq!(
            config.required_indicators(),
            vec!["broad money", "gdp deflator", "real gdp", "lending rate", "exchange rate"]
        );
    }
}
