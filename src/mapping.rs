//! Region name canonicalization from the country and state reference tables.

use csv::{ReaderBuilder, Trim};
use log::debug;
use std::collections::HashMap;
use std::io::Read;

use crate::error::{Error, Result};
use crate::types::{RawReferenceRow, TimeSeriesTable};

/// Raw name -> canonical name.
pub type NameMapping = HashMap<String, String>;

/// Canonical country name -> continent.
pub type ContinentMapping = HashMap<String, String>;

/// Substitute `raw` if the mapping has a canonical name for it.
pub fn canonicalize<'a>(raw: &'a str, mapping: &'a NameMapping) -> &'a str {
    mapping.get(raw).map(String::as_str).unwrap_or(raw)
}

#[derive(Debug, Clone)]
pub struct ReferenceRow {
    pub key: String,
    pub name: Option<String>,
    pub continent: Option<String>,
}

/// A parsed `mapping_*.csv` file.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    pub rows: Vec<ReferenceRow>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ReferenceTable {
    /// Read a reference table whose raw key lives in `key_column`
    /// (`Country` or `State`). `Name` is required as well.
    pub fn from_reader<R: Read>(reader: R, key_column: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::Headers)
            .from_reader(reader);
        let headers = rdr.headers()?.clone();
        for required in [key_column, "Name"] {
            if !headers.iter().any(|h| h == required) {
                return Err(Error::missing_column(
                    format!("mapping ({})", key_column),
                    required,
                ));
            }
        }

        let mut rows = Vec::new();
        for result in rdr.deserialize::<RawReferenceRow>() {
            let raw = result?;
            let Some(key) = non_empty(raw.key) else {
                continue;
            };
            rows.push(ReferenceRow {
                key,
                name: non_empty(raw.name),
                continent: non_empty(raw.continent),
            });
        }
        debug!("Loaded {} {} reference rows", rows.len(), key_column);
        Ok(Self { rows })
    }

    /// Rows without a canonical `Name` are left out.
    pub fn name_mapping(&self) -> NameMapping {
        self.rows
            .iter()
            .filter_map(|r| r.name.as_ref().map(|n| (r.key.clone(), n.clone())))
            .collect()
    }

    pub fn continent_mapping(&self) -> ContinentMapping {
        self.rows
            .iter()
            .filter_map(|r| match (&r.name, &r.continent) {
                (Some(n), Some(c)) => Some((n.clone(), c.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Every lookup table a pipeline run needs.
#[derive(Debug, Clone, Default)]
pub struct Mappings {
    pub countries: NameMapping,
    pub continents: ContinentMapping,
    pub states: NameMapping,
}

impl Mappings {
    pub fn from_tables(countries: &ReferenceTable, states: &ReferenceTable) -> Self {
        Self {
            countries: countries.name_mapping(),
            continents: countries.continent_mapping(),
            states: states.name_mapping(),
        }
    }
}

/// Rewrite `column` of every row to its canonical name.
pub fn canonicalize_table(
    table: &mut TimeSeriesTable,
    column: &str,
    mapping: &NameMapping,
) -> Result<()> {
    table.require_column(column)?;
    let mut replaced = 0usize;
    for row in &mut table.rows {
        if let Some(raw) = row.labels.get_mut(column) {
            if let Some(canonical) = mapping.get(raw.as_str()) {
                if *canonical != *raw {
                    *raw = canonical.clone();
                    replaced += 1;
                }
            }
        }
    }
    debug!("{}: canonicalized {} {:?} labels", table.name, replaced, column);
    Ok(())
}
