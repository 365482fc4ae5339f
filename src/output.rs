use crate::error::Result;
use crate::types::{NewCasesMatrix, RegionReportRow, RegionSummaryRow};
use crate::util::{format_count, format_number};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// One region per line, one column per date.
pub fn write_new_cases_csv(path: &Path, matrix: &NewCasesMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(std::iter::once("Region").chain(matrix.dates.iter().map(String::as_str)))?;
    for (region, values) in matrix.regions.iter().zip(&matrix.values) {
        let mut record = vec![region.clone()];
        record.extend(values.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Display strings for one region; untracked metrics and not-computable
/// rates render as `-`.
pub fn report_row(row: &RegionSummaryRow) -> RegionReportRow {
    RegionReportRow {
        region: row.region.clone(),
        continent: row.continent.clone().unwrap_or_else(|| "-".to_string()),
        cases: format_count(row.cases.today),
        deaths: format_count(row.deaths.today),
        recovered: format_count(row.recovered.today),
        p_cases: format_count(row.cases.previous),
        p_deaths: format_count(row.deaths.previous),
        p_recovered: format_count(row.recovered.previous),
        cases_change: format_count(row.cases.change),
        deaths_change: format_count(row.deaths.change),
        recovered_change: format_count(row.recovered.change),
        fatality_rate: row
            .fatality_rate
            .map(|r| format_number(r, 1))
            .unwrap_or_else(|| "-".to_string()),
    }
}

pub fn report_rows(rows: &[RegionSummaryRow]) -> Vec<RegionReportRow> {
    rows.iter().map(report_row).collect()
}

/// Print `title`, an optional note and the first `max_rows` rows as markdown.
pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    match render_markdown(rows, max_rows) {
        Some(table) => println!("{}\n", table),
        None => println!("(no rows)\n"),
    }
}

fn render_markdown<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    if rows.is_empty() || max_rows == 0 {
        return None;
    }
    let head = rows.iter().take(max_rows).cloned();
    Some(Table::new(head).with(Style::markdown()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricValues;

    fn sample() -> RegionSummaryRow {
        let mut row = RegionSummaryRow::new("New York");
        row.cases = MetricValues {
            today: Some(12345),
            previous: Some(12000),
            change: Some(345),
        };
        row.deaths = MetricValues {
            today: Some(100),
            previous: Some(90),
            change: Some(10),
        };
        row.fatality_rate = Some(0.8);
        row
    }

    #[test]
    fn report_row_formats_and_dashes() {
        let r = report_row(&sample());
        assert_eq!(r.cases, "12,345");
        assert_eq!(r.cases_change, "345");
        assert_eq!(r.recovered, "-");
        assert_eq!(r.continent, "-");
        assert_eq!(r.fatality_rate, "0.8");

        let mut empty = sample();
        empty.fatality_rate = None;
        assert_eq!(report_row(&empty).fatality_rate, "-");
    }

    #[test]
    fn markdown_preview_is_truncated() {
        let mut other = sample();
        other.region = "Washington".into();
        let rows = report_rows(&[sample(), other]);

        let md = render_markdown(&rows, 1).unwrap();
        assert!(md.contains("| Region"));
        assert!(md.contains("New York"));
        assert!(!md.contains("Washington"));
        assert!(render_markdown(&rows, 0).is_none());
        assert!(render_markdown::<RegionReportRow>(&[], 5).is_none());
    }

    #[test]
    fn writes_table_and_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("table.csv");
        write_csv(&table_path, &report_rows(&[sample()])).unwrap();
        let text = std::fs::read_to_string(&table_path).unwrap();
        assert!(text.starts_with("Region,Continent,Cases,Deaths,Recovered,"));
        assert!(text.contains("\"12,345\""));

        let matrix = NewCasesMatrix {
            regions: vec!["A".into()],
            dates: vec!["3/1/20".into(), "3/2/20".into()],
            values: vec![vec![5, 0]],
        };
        let m_path = dir.path().join("newcases.csv");
        write_new_cases_csv(&m_path, &matrix).unwrap();
        let text = std::fs::read_to_string(&m_path).unwrap();
        assert_eq!(text, "Region,3/1/20,3/2/20\nA,5,0\n");
    }
}
