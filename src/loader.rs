use crate::error::{Error, Result};
use crate::mapping::{canonicalize, NameMapping};
use crate::types::{TimeSeriesRow, TimeSeriesTable};
use crate::util::{date_label, parse_compact_date, parse_count, parse_date_label};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Read;

/// Non-date columns across the JHU global and US time series layouts.
pub static ID_COLUMNS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Province/State",
        "Country/Region",
        "Lat",
        "Long",
        "UID",
        "iso2",
        "iso3",
        "code3",
        "FIPS",
        "Admin2",
        "Province_State",
        "Country_Region",
        "Long_",
        "Combined_Key",
        "Population",
    ]
    .into_iter()
    .collect()
});

pub fn is_id_column(column: &str) -> bool {
    ID_COLUMNS.contains(column)
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(input)
}

/// Parse a wide time-series CSV (identifier columns followed by one column
/// per `%m/%d/%y` date).
pub fn read_wide_table<R: Read>(input: R, name: &str) -> Result<TimeSeriesTable> {
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();

    let mut id_columns: Vec<(usize, String)> = Vec::new();
    let mut date_columns: Vec<(usize, String)> = Vec::new();
    let mut last_date: Option<NaiveDate> = None;
    for (idx, header) in headers.iter().enumerate() {
        if is_id_column(header) {
            id_columns.push((idx, header.to_string()));
            continue;
        }
        let Some(date) = parse_date_label(header) else {
            return Err(Error::MalformedTable(format!(
                "{}: column {:?} is neither an identifier nor a date",
                name, header
            )));
        };
        if last_date.is_some_and(|prev| prev >= date) {
            return Err(Error::MalformedTable(format!(
                "{}: date column {:?} is out of chronological order",
                name, header
            )));
        }
        last_date = Some(date);
        date_columns.push((idx, header.to_string()));
    }

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        let labels: HashMap<String, String> = id_columns
            .iter()
            .filter_map(|(idx, col)| {
                let v = record.get(*idx)?.trim();
                (!v.is_empty()).then(|| (col.clone(), v.to_string()))
            })
            .collect();
        let values = date_columns
            .iter()
            .map(|(idx, _)| parse_count(record.get(*idx)))
            .collect();
        rows.push(TimeSeriesRow { labels, values });
    }

    debug!(
        "{}: {} rows, {} date columns",
        name,
        rows.len(),
        date_columns.len()
    );
    Ok(TimeSeriesTable {
        name: name.to_string(),
        id_columns: id_columns.into_iter().map(|(_, c)| c).collect(),
        date_columns: date_columns.into_iter().map(|(_, c)| c).collect(),
        rows,
    })
}

fn column_index(headers: &StringRecord, table: &str, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| Error::missing_column(table, column))
}

/// Pivot the long-format state daily feed (`date`, `state`, metric columns)
/// into the wide layout, keeping only `value_column`.
///
/// State codes are canonicalized through `states` and the resulting table
/// is keyed by `Province/State` with `Country/Region` fixed to `US`.
pub fn pivot_daily<R: Read>(
    input: R,
    value_column: &str,
    states: &NameMapping,
) -> Result<TimeSeriesTable> {
    let name = format!("daily:{}", value_column);
    let mut rdr = reader(input);
    let headers = rdr.headers()?.clone();
    let date_idx = column_index(&headers, &name, "date")?;
    let state_idx = column_index(&headers, &name, "state")?;
    let value_idx = column_index(&headers, &name, value_column)?;

    let mut cells: BTreeMap<String, BTreeMap<NaiveDate, Option<i64>>> = BTreeMap::new();
    let mut dates: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_compact_date(raw_date).ok_or_else(|| {
            Error::MalformedTable(format!("{}: bad date {:?}", name, raw_date))
        })?;
        let Some(code) = record.get(state_idx).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let state = canonicalize(code, states).to_string();
        let value = parse_count(record.get(value_idx));

        let by_date = cells.entry(state.clone()).or_default();
        if by_date.insert(date, value).is_some() {
            return Err(Error::DuplicateEntry(format!(
                "{}: {} on {}",
                name,
                state,
                date_label(date)
            )));
        }
        dates.insert(date);
    }

    let dates: Vec<NaiveDate> = dates.into_iter().collect();
    let rows = cells
        .into_iter()
        .map(|(state, by_date)| TimeSeriesRow {
            labels: HashMap::from([
                ("Province/State".to_string(), state),
                ("Country/Region".to_string(), "US".to_string()),
            ]),
            values: dates.iter().map(|d| by_date.get(d).copied().flatten()).collect(),
        })
        .collect::<Vec<_>>();

    debug!("{}: pivoted {} states x {} dates", name, rows.len(), dates.len());
    Ok(TimeSeriesTable {
        name,
        id_columns: ["Province/State", "Country/Region", "Lat", "Long"]
            .into_iter()
            .map(String::from)
            .collect(),
        date_columns: dates.into_iter().map(date_label).collect(),
        rows,
    })
}
