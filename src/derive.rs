use crate::error::{Error, Result};
use crate::types::{Metric, RegionSummaryRow};
use crate::util::round1;
use std::cmp::Ordering;
use std::fmt;

/// `100 * deaths / cases` rounded to one decimal, `None` when there are no
/// cases to divide by.
pub fn fatality_rate(deaths: Option<i64>, cases: Option<i64>) -> Option<f64> {
    match (deaths, cases) {
        (Some(d), Some(c)) if c != 0 => Some(round1(100.0 * d as f64 / c as f64)),
        _ => None,
    }
}

/// Fill in `M (+)` for each metric and the fatality rate.
///
/// Changes are clipped at zero: a cumulative count revised downwards reports
/// no new cases rather than a negative number. The unclipped value stays
/// available through `RegionSummaryRow::raw_change`.
pub fn apply_deltas(rows: &mut [RegionSummaryRow], metrics: &[Metric]) {
    for row in rows.iter_mut() {
        for &m in metrics {
            let clipped = row.raw_change(m).map(|d| d.max(0));
            row.metric_mut(m).change = clipped;
        }
        row.fatality_rate = fatality_rate(row.deaths.today, row.cases.today);
    }
}

type RuleFn = Box<dyn Fn(&[RegionSummaryRow]) -> Vec<f64>>;

/// Caller-supplied derived column computed over the whole row set.
pub struct ExtensionRule {
    pub name: String,
    apply: RuleFn,
}

impl ExtensionRule {
    pub fn new<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&[RegionSummaryRow]) -> Vec<f64> + 'static,
    {
        Self {
            name: name.into(),
            apply: Box::new(apply),
        }
    }
}

impl fmt::Debug for ExtensionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Run `rules` in order, appending one extension column per rule.
pub fn apply_rules(rows: &mut [RegionSummaryRow], rules: &[ExtensionRule]) -> Result<()> {
    for rule in rules {
        let column = (rule.apply)(&*rows);
        if column.len() != rows.len() {
            return Err(Error::RuleLength {
                rule: rule.name.clone(),
                expected: rows.len(),
                actual: column.len(),
            });
        }
        for (row, v) in rows.iter_mut().zip(column) {
            row.extra.push((rule.name.clone(), v));
        }
    }
    Ok(())
}

// Descending, missing values last.
fn desc(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Cases descending, ties broken by deaths descending. Stable.
pub fn sort_rows(rows: &mut [RegionSummaryRow]) {
    rows.sort_by(|a, b| {
        desc(a.cases.today, b.cases.today).then_with(|| desc(a.deaths.today, b.deaths.today))
    });
}
