//! Shared domain types.
//!
//! Everything the calibration core passes around lives here: period keys,
//! series, groups, the half-open `Window`, the requested statistics and the
//! per-group outcomes (records and skip reasons).

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sampling frequency of a period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Annual,
    Quarterly,
    Monthly,
    Daily,
}

impl Frequency {
    /// Periods per calendar year (365 for daily data).
    pub fn periods_per_year(self) -> u32 {
        match self {
            Frequency::Annual => 1,
            Frequency::Quarterly => 4,
            Frequency::Monthly => 12,
            Frequency::Daily => 365,
        }
    }
}

/// One discrete time step, keyed by the first day it covers.
///
/// Ordering is chronological. Series are expected to use a single frequency;
/// mixed frequencies still order deterministically (date first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    date: NaiveDate,
    freq: Frequency,
}

impl Period {
    pub fn annual(year: i32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, 1, 1).map(|date| Self {
            date,
            freq: Frequency::Annual,
        })
    }

    pub fn quarterly(year: i32, quarter: u32) -> Option<Self> {
        if !(1..=4).contains(&quarter) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, 3 * (quarter - 1) + 1, 1).map(|date| Self {
            date,
            freq: Frequency::Quarterly,
        })
    }

    pub fn monthly(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|date| Self {
            date,
            freq: Frequency::Monthly,
        })
    }

    pub fn daily(date: NaiveDate) -> Self {
        Self {
            date,
            freq: Frequency::Daily,
        }
    }

    /// Parse `1960`, `1960Q2` / `1960-Q2`, `1960-04` or `1960-04-01`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let s = raw.trim();
        let invalid = || format!("Invalid period '{raw}'.");

        if let Some(pos) = s.find(['Q', 'q']) {
            let year: i32 = s[..pos].trim_end_matches('-').parse().map_err(|_| invalid())?;
            let quarter: u32 = s[pos + 1..].parse().map_err(|_| invalid())?;
            return Self::quarterly(year, quarter).ok_or_else(invalid);
        }

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            let year: i32 = s.parse().map_err(|_| invalid())?;
            return Self::annual(year).ok_or_else(invalid);
        }

        match s.split('-').count() {
            2 => {
                let (y, m) = s.split_once('-').ok_or_else(invalid)?;
                let year: i32 = y.parse().map_err(|_| invalid())?;
                let month: u32 = m.parse().map_err(|_| invalid())?;
                Self::monthly(year, month).ok_or_else(invalid)
            }
            3 => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Self::daily)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn frequency(&self) -> Frequency {
        self.freq
    }

    /// The period immediately after this one (same frequency).
    pub fn next(&self) -> Option<Self> {
        let date = match self.freq {
            Frequency::Annual => self.date.checked_add_months(Months::new(12)),
            Frequency::Quarterly => self.date.checked_add_months(Months::new(3)),
            Frequency::Monthly => self.date.checked_add_months(Months::new(1)),
            Frequency::Daily => self.date.checked_add_days(Days::new(1)),
        }?;
        Some(Self {
            date,
            freq: self.freq,
        })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.freq {
            Frequency::Annual => write!(f, "{}", self.date.year()),
            Frequency::Quarterly => write!(f, "{}Q{}", self.date.year(), self.date.month0() / 3 + 1),
            Frequency::Monthly => write!(f, "{}", self.date.format("%Y-%m")),
            Frequency::Daily => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

/// A time series: strictly increasing periods, each with an optional value.
///
/// Missing is a distinct state; a stored `0.0` is an observation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    periods: Vec<Period>,
    values: Vec<Option<f64>>,
}

impl Series {
    /// Build a series from observations in any order.
    ///
    /// Observations are sorted by period; a repeated period is an error.
    /// Non-finite values are stored as missing.
    pub fn from_observations<I>(observations: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (Period, Option<f64>)>,
    {
        let mut obs: Vec<(Period, Option<f64>)> = observations.into_iter().collect();
        obs.sort_by_key(|(p, _)| *p);

        if let Some(pair) = obs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(format!("Duplicate period {} in series.", pair[0].0));
        }

        let (periods, values) = obs
            .into_iter()
            .map(|(p, v)| (p, v.filter(|x| x.is_finite())))
            .unzip();
        Ok(Self { periods, values })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Period, Option<f64>)> + '_ {
        self.periods.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at `period`, if the period is present and observed.
    pub fn get(&self, period: Period) -> Option<f64> {
        let idx = self.periods.binary_search(&period).ok()?;
        self.values[idx]
    }

    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Apply `f` to every observed value, keeping the period axis.
    ///
    /// Results that are not finite become missing.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Series {
        Series {
            periods: self.periods.clone(),
            values: self
                .values
                .iter()
                .map(|v| v.map(&f).filter(|x| x.is_finite()))
                .collect(),
        }
    }
}

/// All series belonging to one group (e.g. one country).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupData {
    pub id: String,
    pub series: BTreeMap<String, Series>,
}

impl GroupData {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            series: BTreeMap::new(),
        }
    }

    pub fn with_series(mut self, name: impl Into<String>, series: Series) -> Self {
        self.series.insert(name.into(), series);
        self
    }

    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }
}

/// An ordered collection of groups (order of first appearance in the input).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Panel {
    pub groups: Vec<GroupData>,
}

impl Panel {
    pub fn group(&self, id: &str) -> Option<&GroupData> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Union of indicator names across all groups, sorted.
    pub fn indicators(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .iter()
            .flat_map(|g| g.series.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Half-open index range `[start, stop)` over a group's aligned period axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Window {
    start: usize,
    stop: usize,
}

impl Window {
    /// Returns `None` when `stop < start`.
    pub fn new(start: usize, stop: usize) -> Option<Self> {
        (start <= stop).then_some(Self { start, stop })
    }

    /// The "no valid window" result.
    pub fn empty() -> Self {
        Self { start: 0, stop: 0 }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        self.stop
    }

    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }

    /// Index of the first period inside the window.
    pub fn first(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.start)
    }

    /// Index of the last period inside the window (`stop - 1`).
    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.stop - 1)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.stop
    }

    /// The window's slice of `items`; `None` if the window runs past the end.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> Option<&'a [T]> {
        items.get(self.range())
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// How the aligner builds the common period axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    /// Every period present in any series.
    #[default]
    Union,
    /// Only periods present in all series.
    Intersection,
}

/// Statistic computed over a validated window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    /// Arithmetic mean (for series already expressed as rates).
    Average,
    /// Endpoint compound growth rate per period.
    Growth,
}

/// What to do when a group has no entry in the classification lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupPolicy {
    /// Emit the record with empty labels.
    #[default]
    SkipField,
    /// Drop the group's record.
    SkipGroup,
}

/// What to do when a growth statistic is requested over a length-1 window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthPolicy {
    /// Emit the record with that statistic left empty.
    #[default]
    OmitStatistic,
    /// Drop the group's record.
    SkipGroup,
}

/// One requested output statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticSpec {
    /// Input indicator (panel column) the statistic is computed from.
    pub indicator: String,
    /// Output column name.
    pub column: String,
    pub kind: StatKind,
    /// Multiplier applied to the statistic (e.g. `0.01` for percent inputs).
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl StatisticSpec {
    pub fn new(indicator: &str, column: &str, kind: StatKind) -> Self {
        Self {
            indicator: indicator.to_string(),
            column: column.to_string(),
            kind,
            scale: 1.0,
        }
    }

    pub fn scaled(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// A computed statistic; `None` when it was omitted by policy.
#[derive(Debug, Clone, PartialEq)]
pub struct StatValue {
    pub column: String,
    pub value: Option<f64>,
}

/// One output row per accepted group.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedRecord {
    pub group: String,
    pub window: Window,
    /// First and last period inside the window.
    pub start: Period,
    pub end: Period,
    pub statistics: Vec<StatValue>,
    /// Classification labels, `None` when the lookup had no entry.
    pub labels: Option<Vec<String>>,
    /// Problems that removed a field but not the record.
    pub omissions: Vec<SkipReason>,
}

impl CalibratedRecord {
    pub fn observations(&self) -> usize {
        self.window.len()
    }

    pub fn statistic(&self, column: &str) -> Option<f64> {
        self.statistics
            .iter()
            .find(|s| s.column == column)
            .and_then(|s| s.value)
    }
}

/// Why a group (or one of its fields) did not make it into the output.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Group is on the exclusion list (e.g. an aggregate region).
    Excluded,
    MissingIndicator { indicator: String },
    InsufficientWindow { length: usize, required: usize },
    DegenerateGrowthWindow { column: String },
    InvalidStatistic { column: String, detail: String },
    MissingGroupLookup,
}

impl SkipReason {
    /// Stable identifier used in the manifest.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::Excluded => "excluded",
            SkipReason::MissingIndicator { .. } => "missing-indicator",
            SkipReason::InsufficientWindow { .. } => "insufficient-window",
            SkipReason::DegenerateGrowthWindow { .. } => "degenerate-growth-window",
            SkipReason::InvalidStatistic { .. } => "invalid-statistic",
            SkipReason::MissingGroupLookup => "missing-group-lookup",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Excluded => write!(f, "group is on the exclusion list"),
            SkipReason::MissingIndicator { indicator } => {
                write!(f, "indicator '{indicator}' not available")
            }
            SkipReason::InsufficientWindow { length, required } => {
                write!(f, "longest window has {length} periods, {required} required")
            }
            SkipReason::DegenerateGrowthWindow { column } => {
                write!(f, "growth statistic '{column}' needs at least 2 periods")
            }
            SkipReason::InvalidStatistic { column, detail } => write!(f, "'{column}': {detail}"),
            SkipReason::MissingGroupLookup => write!(f, "group not found in classification lookup"),
        }
    }
}

/// What happened to a group listed in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipAction {
    GroupSkipped,
    FieldOmitted,
}

impl SkipAction {
    pub fn label(self) -> &'static str {
        match self {
            SkipAction::GroupSkipped => "group-skipped",
            SkipAction::FieldOmitted => "field-omitted",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub group: String,
    pub reason: SkipReason,
    pub action: SkipAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parse_and_display_round_trip_shapes() {
        for raw in ["1960", "1960Q2", "1960-04", "1960-04-15"] {
            let p = Period::parse(raw).unwrap();
            assert_eq!(p.to_string(), raw);
        }
        assert_eq!(Period::parse("1960-Q3").unwrap().to_string(), "1960Q3");
        assert!(Period::parse("1960Q5").is_err());
        assert!(Period::parse("abc").is_err());
    }

    #[test]
    fn period_next_advances_by_frequency() {
        let q = Period::quarterly(1999, 4).unwrap();
        assert_eq!(q.next().unwrap(), Period::quarterly(2000, 1).unwrap());
        let y = Period::annual(1999).unwrap();
        assert_eq!(y.next().unwrap(), Period::annual(2000).unwrap());
    }

    #[test]
    fn series_sorts_and_rejects_duplicates() {
        let y = |n| Period::annual(n).unwrap();
        let s = Series::from_observations(vec![(y(2001), Some(2.0)), (y(2000), Some(1.0)), (y(2002), Some(f64::NAN))])
            .unwrap();
        assert_eq!(s.periods(), &[y(2000), y(2001), y(2002)]);
        assert_eq!(s.values(), &[Some(1.0), Some(2.0), None]);
        assert_eq!(s.get(y(2001)), Some(2.0));
        assert_eq!(s.observed_count(), 2);

        let dup = Series::from_observations(vec![(y(2000), Some(1.0)), (y(2000), Some(3.0))]);
        assert!(dup.is_err());
    }

    #[test]
    fn window_bounds_are_half_open() {
        let w = Window::new(3, 6).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(w.first(), Some(3));
        assert_eq!(w.last(), Some(5));
        assert_eq!(w.slice(&[0, 1, 2, 3, 4, 5, 6]), Some(&[3, 4, 5][..]));

        let e = Window::empty();
        assert!(e.is_empty());
        assert_eq!(e.first(), None);
        assert_eq!(e.last(), None);
        assert!(Window::new(4, 2).is_none());
    }
}
