use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tabled::Tabled;

use crate::error::{Error, Result};

/// The three tracked epidemiological counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Cases,
    Deaths,
    Recovered,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Cases, Metric::Deaths, Metric::Recovered];

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cases => "Cases",
            Metric::Deaths => "Deaths",
            Metric::Recovered => "Recovered",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A summable column of the region table: either the latest total of a
/// metric or its clipped day-over-day change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputColumn {
    Total(Metric),
    Change(Metric),
}

impl OutputColumn {
    /// Totals first, then changes, each in metric order.
    pub fn for_metrics(metrics: &[Metric]) -> Vec<OutputColumn> {
        metrics
            .iter()
            .map(|m| OutputColumn::Total(*m))
            .chain(metrics.iter().map(|m| OutputColumn::Change(*m)))
            .collect()
    }

    pub fn label(self) -> String {
        match self {
            OutputColumn::Total(m) => m.label().to_string(),
            OutputColumn::Change(m) => format!("{} (+)", m.label()),
        }
    }
}

/// Wide-format time series: one row per sub-region, one column per date.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesTable {
    /// Used in error messages only.
    pub name: String,
    pub id_columns: Vec<String>,
    /// Chronological `%m/%d/%y` labels.
    pub date_columns: Vec<String>,
    pub rows: Vec<TimeSeriesRow>,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSeriesRow {
    pub labels: HashMap<String, String>,
    /// Aligned with `TimeSeriesTable::date_columns`.
    pub values: Vec<Option<i64>>,
}

impl TimeSeriesRow {
    pub fn label(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }
}

impl TimeSeriesTable {
    pub fn require_column(&self, column: &str) -> Result<()> {
        if self.id_columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(Error::missing_column(&self.name, column))
        }
    }

    pub fn date_index(&self, column: &str) -> Result<usize> {
        self.date_columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::missing_column(&self.name, column))
    }

    /// Keeps only the rows accepted by `keep`.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: Fn(&TimeSeriesRow) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }
}

/// Today, previous day and clipped change for one metric of one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricValues {
    pub today: Option<i64>,
    pub previous: Option<i64>,
    pub change: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSummaryRow {
    pub region: String,
    /// Populated at country granularity only.
    pub continent: Option<String>,
    pub cases: MetricValues,
    pub deaths: MetricValues,
    pub recovered: MetricValues,
    /// `None` when not computable (no cases).
    pub fatality_rate: Option<f64>,
    /// Extension columns in the order their rules ran.
    pub extra: Vec<(String, f64)>,
}

impl RegionSummaryRow {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }

    pub fn metric(&self, metric: Metric) -> &MetricValues {
        match metric {
            Metric::Cases => &self.cases,
            Metric::Deaths => &self.deaths,
            Metric::Recovered => &self.recovered,
        }
    }

    pub fn metric_mut(&mut self, metric: Metric) -> &mut MetricValues {
        match metric {
            Metric::Cases => &mut self.cases,
            Metric::Deaths => &mut self.deaths,
            Metric::Recovered => &mut self.recovered,
        }
    }

    pub fn value(&self, column: OutputColumn) -> Option<i64> {
        match column {
            OutputColumn::Total(m) => self.metric(m).today,
            OutputColumn::Change(m) => self.metric(m).change,
        }
    }

    /// Day-over-day difference before clipping; negative on downward revisions.
    pub fn raw_change(&self, metric: Metric) -> Option<i64> {
        let v = self.metric(metric);
        Some(v.today? - v.previous?)
    }

    pub fn extra(&self, name: &str) -> Option<f64> {
        self.extra
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Display-ready scalars for the report template.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryBundle {
    pub updated: NaiveDate,
    pub since: NaiveDate,
    #[serde(flatten)]
    pub totals: BTreeMap<String, i64>,
    #[serde(flatten)]
    pub kpis: BTreeMap<String, i64>,
}

impl SummaryBundle {
    /// Looks a scalar up by its flat key, KPI entries first.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.kpis.get(key).or_else(|| self.totals.get(key)).copied()
    }
}

/// Region × date grid of daily new cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCasesMatrix {
    pub regions: Vec<String>,
    pub dates: Vec<String>,
    pub values: Vec<Vec<i64>>,
}

impl NewCasesMatrix {
    pub fn series(&self, region: &str) -> Option<&[i64]> {
        self.regions
            .iter()
            .position(|r| r == region)
            .map(|i| self.values[i].as_slice())
    }
}

#[derive(Debug, Deserialize)]
pub struct RawReferenceRow {
    #[serde(alias = "Country", alias = "State")]
    pub key: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Continent", default)]
    pub continent: Option<String>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionReportRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Continent")]
    #[tabled(rename = "Continent")]
    pub continent: String,
    #[serde(rename = "Cases")]
    #[tabled(rename = "Cases")]
    pub cases: String,
    #[serde(rename = "Deaths")]
    #[tabled(rename = "Deaths")]
    pub deaths: String,
    #[serde(rename = "Recovered")]
    #[tabled(rename = "Recovered")]
    pub recovered: String,
    #[serde(rename = "PCases")]
    #[tabled(rename = "PCases")]
    pub p_cases: String,
    #[serde(rename = "PDeaths")]
    #[tabled(rename = "PDeaths")]
    pub p_deaths: String,
    #[serde(rename = "PRecovered")]
    #[tabled(rename = "PRecovered")]
    pub p_recovered: String,
    #[serde(rename = "Cases (+)")]
    #[tabled(rename = "Cases (+)")]
    pub cases_change: String,
    #[serde(rename = "Deaths (+)")]
    #[tabled(rename = "Deaths (+)")]
    pub deaths_change: String,
    #[serde(rename = "Recovered (+)")]
    #[tabled(rename = "Recovered (+)")]
    pub recovered_change: String,
    #[serde(rename = "Fatality Rate")]
    #[tabled(rename = "Fatality Rate")]
    pub fatality_rate: String,
}
