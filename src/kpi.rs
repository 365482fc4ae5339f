use crate::error::{Error, Result};
use crate::types::{OutputColumn, RegionSummaryRow};
use std::collections::BTreeMap;
use std::fmt;

type Predicate = Box<dyn Fn(&RegionSummaryRow) -> bool>;

/// A named group of regions rolled up into `"{prefix} {column}"` scalars.
pub struct KpiSpec {
    pub title: String,
    pub prefix: String,
    predicate: Option<Predicate>,
}

impl KpiSpec {
    /// Selects rows whose region, or continent, equals `title`.
    pub fn new(title: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prefix: prefix.into(),
            predicate: None,
        }
    }

    /// Replaces the title match entirely; `title` is then only a label.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RegionSummaryRow) -> bool + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Parse the `TITLE=PREFIX` command line form.
    pub fn parse(s: &str) -> Result<Self> {
        let (title, prefix) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidKpi(format!("expected TITLE=PREFIX, got {:?}", s)))?;
        let (title, prefix) = (title.trim(), prefix.trim());
        if title.is_empty() || prefix.is_empty() {
            return Err(Error::InvalidKpi(format!("empty title or prefix in {:?}", s)));
        }
        Ok(Self::new(title, prefix))
    }

    pub fn selects(&self, row: &RegionSummaryRow) -> bool {
        match &self.predicate {
            Some(p) => p(row),
            None => row.region == self.title || row.continent.as_deref() == Some(self.title.as_str()),
        }
    }
}

impl fmt::Debug for KpiSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KpiSpec")
            .field("title", &self.title)
            .field("prefix", &self.prefix)
            .field("custom", &self.predicate.is_some())
            .finish()
    }
}

/// Sum each column over the given rows, skipping missing values.
pub fn totals<'a, I>(rows: I, columns: &[OutputColumn]) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = &'a RegionSummaryRow> + Clone,
{
    columns
        .iter()
        .map(|c| {
            let sum: i64 = rows.clone().into_iter().filter_map(|r| r.value(*c)).sum();
            (c.label(), sum)
        })
        .collect()
}

/// Roll every spec up into one flat mapping.
///
/// Keys are not checked for collisions across specs; a later spec overwrites
/// an earlier one with the same prefixed key.
pub fn rollup(
    rows: &[RegionSummaryRow],
    specs: &[KpiSpec],
    columns: &[OutputColumn],
) -> BTreeMap<String, i64> {
    let mut out = BTreeMap::new();
    for spec in specs {
        let selected = rows.iter().filter(|r| spec.selects(r));
        for (label, sum) in totals(selected, columns) {
            out.insert(format!("{} {}", spec.prefix, label), sum);
        }
    }
    out
}
