use crate::aggregate::aggregate_all;
use crate::error::Result;
use crate::types::{NewCasesMatrix, TimeSeriesTable};

/// First difference of a cumulative series with a zero baseline before the
/// first value. Downward revisions report 0.
pub fn daily_new(cumulative: &[i64]) -> Vec<i64> {
    let mut prev = 0;
    cumulative
        .iter()
        .map(|&v| {
            let d = (v - prev).max(0);
            prev = v;
            d
        })
        .collect()
}

/// Build the region × date grid of daily new cases over the full history.
pub fn build_new_cases_matrix(
    cases: &TimeSeriesTable,
    region_key: &str,
    date_columns: &[String],
) -> Result<NewCasesMatrix> {
    let positions = date_columns
        .iter()
        .map(|c| cases.date_index(c))
        .collect::<Result<Vec<_>>>()?;

    let grouped = aggregate_all(cases, region_key)?;
    let mut regions = Vec::with_capacity(grouped.len());
    let mut values = Vec::with_capacity(grouped.len());
    for (region, sums) in grouped {
        let series: Vec<i64> = positions.iter().map(|&i| sums[i]).collect();
        regions.push(region);
        values.push(daily_new(&series));
    }

    Ok(NewCasesMatrix {
        regions,
        dates: date_columns.to_vec(),
        values,
    })
}
