//! Fetch -> canonicalize -> resolve dates -> aggregate -> summarize, once per
//! granularity.

use crate::aggregate::{merge_metrics, MetricSums};
use crate::dates::resolve_latest_date;
use crate::derive::{apply_deltas, apply_rules, sort_rows, ExtensionRule};
use crate::error::{Error, Result};
use crate::kpi::{rollup, totals, KpiSpec};
use crate::loader::{pivot_daily, read_wide_table};
use crate::mapping::{canonicalize_table, Mappings, NameMapping, ReferenceTable};
use crate::newcases::build_new_cases_matrix;
use crate::source::{DataSource, Feed};
use crate::types::{
    Metric, NewCasesMatrix, OutputColumn, RegionSummaryRow, SummaryBundle, TimeSeriesRow,
    TimeSeriesTable,
};
use crate::util::parse_date_label;
use log::{debug, info};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Country,
    State,
    County,
}

const CASES_AND_DEATHS: [Metric; 2] = [Metric::Cases, Metric::Deaths];

impl Granularity {
    /// Default grouping column.
    pub fn region_key(self) -> &'static str {
        match self {
            Granularity::Country => "Country/Region",
            Granularity::State => "Province/State",
            Granularity::County => "Admin2",
        }
    }

    /// Column whose labels go through the name mapping.
    pub fn canonical_column(self) -> &'static str {
        match self {
            Granularity::Country => "Country/Region",
            Granularity::State => "Province/State",
            Granularity::County => "Province_State",
        }
    }

    pub fn metrics(self) -> &'static [Metric] {
        match self {
            Granularity::Country => &Metric::ALL,
            Granularity::State | Granularity::County => &CASES_AND_DEATHS,
        }
    }

    fn name_mapping(self, mappings: &Mappings) -> &NameMapping {
        match self {
            Granularity::Country => &mappings.countries,
            Granularity::State | Granularity::County => &mappings.states,
        }
    }

    /// Fetch every metric table, canonicalized and in wide format.
    fn fetch_tables<S>(self, source: &S, mappings: &Mappings) -> Result<Vec<(Metric, TimeSeriesTable)>>
    where
        S: DataSource + ?Sized,
    {
        let mut tables = Vec::with_capacity(self.metrics().len());
        match self {
            Granularity::State => {
                let daily = source.fetch(Feed::StatesDaily)?;
                for &metric in self.metrics() {
                    let column = match metric {
                        Metric::Cases => "positive",
                        Metric::Deaths => "death",
                        Metric::Recovered => "recovered",
                    };
                    let table = pivot_daily(daily.as_bytes(), column, &mappings.states)?;
                    tables.push((metric, table));
                }
            }
            Granularity::Country | Granularity::County => {
                for &metric in self.metrics() {
                    let feed = match self {
                        Granularity::Country => Feed::GlobalSeries(metric),
                        _ => Feed::UsSeries(metric),
                    };
                    let text = source.fetch(feed)?;
                    let mut table = read_wide_table(text.as_bytes(), &feed.file_name())?;
                    canonicalize_table(&mut table, self.canonical_column(), self.name_mapping(mappings))?;
                    tables.push((metric, table));
                }
            }
        }
        Ok(tables)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Granularity::Country => "country",
            Granularity::State => "state",
            Granularity::County => "county",
        })
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "country" | "countries" => Ok(Granularity::Country),
            "state" | "states" => Ok(Granularity::State),
            "county" | "counties" => Ok(Granularity::County),
            other => Err(format!(
                "unknown granularity {:?} (expected country, state or county)",
                other
            )),
        }
    }
}

type RowFilter = Box<dyn Fn(&TimeSeriesRow) -> bool>;

/// Per-run knobs. `Default` gives a fresh, empty set every call.
#[derive(Default)]
pub struct PipelineOptions {
    /// Overrides `Granularity::region_key`.
    pub region_key: Option<String>,
    /// Applied to every raw table after the latest date is resolved.
    pub filter: Option<RowFilter>,
    pub rules: Vec<ExtensionRule>,
    pub kpis: Vec<KpiSpec>,
}

impl PipelineOptions {
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&TimeSeriesRow) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub granularity: Granularity,
    pub metrics: Vec<Metric>,
    pub summary: SummaryBundle,
    /// Ordered by cases then deaths, both descending.
    pub table: Vec<RegionSummaryRow>,
    pub new_cases: NewCasesMatrix,
    pub latest_date_index: usize,
    pub date_columns: Vec<String>,
}

/// Fetch and parse both reference tables.
pub fn load_mappings<S>(source: &S) -> Result<Mappings>
where
    S: DataSource + ?Sized,
{
    let countries = ReferenceTable::from_reader(source.fetch(Feed::CountryMapping)?.as_bytes(), "Country")?;
    let states = ReferenceTable::from_reader(source.fetch(Feed::StateMapping)?.as_bytes(), "State")?;
    Ok(Mappings::from_tables(&countries, &states))
}

fn parse_column_date(table: &TimeSeriesTable, label: &str) -> Result<chrono::NaiveDate> {
    parse_date_label(label).ok_or_else(|| {
        Error::MalformedTable(format!("{}: {:?} is not a date", table.name, label))
    })
}

pub fn run_pipeline<S>(
    source: &S,
    mappings: &Mappings,
    granularity: Granularity,
    options: &PipelineOptions,
) -> Result<PipelineOutput>
where
    S: DataSource + ?Sized,
{
    let region_key = options
        .region_key
        .as_deref()
        .unwrap_or(granularity.region_key());
    let metrics = granularity.metrics();

    let mut tables = granularity.fetch_tables(source, mappings)?;
    info!("{}: fetched {} tables", granularity, tables.len());

    let (latest_idx, date_columns) = {
        let (_, cases) = tables
            .iter()
            .find(|(m, _)| *m == Metric::Cases)
            .ok_or_else(|| Error::MalformedTable("no cases table".to_string()))?;
        resolve_latest_date(cases)?
    };
    let today = &date_columns[latest_idx];
    let previous = &date_columns[latest_idx - 1];
    info!("{}: latest populated date {} (previous {})", granularity, today, previous);

    if let Some(filter) = &options.filter {
        for (_, table) in &mut tables {
            let before = table.rows.len();
            table.retain(filter);
            debug!("{}: filter kept {} of {} rows", table.name, table.rows.len(), before);
        }
    }

    let sums = tables
        .iter()
        .map(|(metric, table)| MetricSums::from_table(*metric, table, region_key, today, previous))
        .collect::<Result<Vec<_>>>()?;
    let mut rows = merge_metrics(&sums);
    if granularity == Granularity::Country {
        for row in &mut rows {
            row.continent = mappings.continents.get(&row.region).cloned();
        }
    }
    sort_rows(&mut rows);
    apply_deltas(&mut rows, metrics);
    apply_rules(&mut rows, &options.rules)?;
    info!("{}: {} regions", granularity, rows.len());

    let (_, cases) = tables
        .iter()
        .find(|(m, _)| *m == Metric::Cases)
        .ok_or_else(|| Error::MalformedTable("no cases table".to_string()))?;
    let columns = OutputColumn::for_metrics(metrics);
    let summary = SummaryBundle {
        updated: parse_column_date(cases, today)?,
        since: parse_column_date(cases, previous)?,
        totals: totals(&rows, &columns),
        kpis: rollup(&rows, &options.kpis, &columns),
    };
    let new_cases = build_new_cases_matrix(cases, region_key, &date_columns)?;

    Ok(PipelineOutput {
        granularity,
        metrics: metrics.to_vec(),
        summary,
        table: rows,
        new_cases,
        latest_date_index: latest_idx,
        date_columns,
    })
}
