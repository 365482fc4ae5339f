use crate::error::Result;
use crate::types::{Metric, RegionSummaryRow, TimeSeriesTable};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};

/// Group `table` by `region_key` and sum one date column (missing = 0).
///
/// Rows without a region label are not grouped, the same way a group-by
/// drops null keys.
pub fn aggregate(
    table: &TimeSeriesTable,
    region_key: &str,
    date_column: &str,
) -> Result<BTreeMap<String, i64>> {
    table.require_column(region_key)?;
    let idx = table.date_index(date_column)?;

    let mut sums: BTreeMap<String, i64> = BTreeMap::new();
    let mut unlabeled = 0usize;
    for row in &table.rows {
        let Some(region) = row.label(region_key) else {
            unlabeled += 1;
            continue;
        };
        let v = row.values.get(idx).copied().flatten().unwrap_or(0);
        *sums.entry(region.to_string()).or_insert(0) += v;
    }
    if unlabeled > 0 {
        warn!(
            "{}: {} rows without {:?} left out of grouping",
            table.name, unlabeled, region_key
        );
    }
    Ok(sums)
}

/// Group `table` by `region_key` summing every date column independently.
pub fn aggregate_all(
    table: &TimeSeriesTable,
    region_key: &str,
) -> Result<BTreeMap<String, Vec<i64>>> {
    table.require_column(region_key)?;
    let width = table.date_columns.len();

    let mut sums: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for row in &table.rows {
        let Some(region) = row.label(region_key) else {
            continue;
        };
        let acc = sums
            .entry(region.to_string())
            .or_insert_with(|| vec![0; width]);
        for (slot, v) in acc.iter_mut().zip(&row.values) {
            *slot += v.unwrap_or(0);
        }
    }
    Ok(sums)
}

/// Today and previous-day group sums of one metric.
#[derive(Debug, Clone)]
pub struct MetricSums {
    pub metric: Metric,
    pub today: BTreeMap<String, i64>,
    pub previous: BTreeMap<String, i64>,
}

impl MetricSums {
    pub fn from_table(
        metric: Metric,
        table: &TimeSeriesTable,
        region_key: &str,
        today: &str,
        previous: &str,
    ) -> Result<Self> {
        Ok(Self {
            metric,
            today: aggregate(table, region_key, today)?,
            previous: aggregate(table, region_key, previous)?,
        })
    }
}

/// Outer-join the per-metric sums into one row per region.
///
/// A region missing from some metric keeps `None` for that metric instead of
/// being dropped. Rows come out ordered by region name.
pub fn merge_metrics(sums: &[MetricSums]) -> Vec<RegionSummaryRow> {
    let regions: BTreeSet<&String> = sums
        .iter()
        .flat_map(|s| s.today.keys().chain(s.previous.keys()))
        .collect();

    regions
        .into_iter()
        .map(|region| {
            let mut row = RegionSummaryRow::new(region.clone());
            for s in sums {
                let values = row.metric_mut(s.metric);
                values.today = s.today.get(region).copied();
                values.previous = s.previous.get(region).copied();
            }
            row
        })
        .collect()
}
