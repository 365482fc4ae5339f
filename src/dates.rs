use crate::error::{Error, Result};
use crate::types::TimeSeriesTable;
use log::warn;

/// Find the latest date column that carries data.
///
/// Upstream sometimes publishes today's column before it is filled in, so
/// the walk goes backwards from the last column and stops at the first one
/// with any nonzero value (missing counts as zero). The first column is never
/// picked because a previous day must exist. When every candidate is empty
/// the last column is used.
///
/// Returns the position into the returned list of date columns.
pub fn resolve_latest_date(table: &TimeSeriesTable) -> Result<(usize, Vec<String>)> {
    let n = table.date_columns.len();
    if n < 2 {
        return Err(Error::MalformedTable(format!(
            "{}: need at least two date columns, found {}",
            table.name, n
        )));
    }

    let populated = (1..n).rev().find(|&idx| {
        table
            .rows
            .iter()
            .any(|row| row.values.get(idx).copied().flatten().unwrap_or(0) != 0)
    });

    let idx = match populated {
        Some(idx) => idx,
        None => {
            warn!(
                "{}: no populated date column, falling back to {}",
                table.name,
                table.date_columns[n - 1]
            );
            n - 1
        }
    };
    Ok((idx, table.date_columns.clone()))
}
