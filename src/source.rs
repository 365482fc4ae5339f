//! Upstream documents and the ways of fetching them.

use crate::error::{Error, Result};
use crate::types::Metric;
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// One upstream CSV document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    CountryMapping,
    StateMapping,
    /// JHU global time series.
    GlobalSeries(Metric),
    /// JHU US county time series.
    UsSeries(Metric),
    /// covidtracking.com long-format state history.
    StatesDaily,
}

impl Feed {
    pub fn file_name(self) -> String {
        match self {
            Feed::CountryMapping => "mapping_countries.csv".to_string(),
            Feed::StateMapping => "mapping_states.csv".to_string(),
            Feed::GlobalSeries(m) => format!("time_series_19-covid-{}.csv", upstream_name(m)),
            Feed::UsSeries(m) => format!(
                "time_series_covid19_{}_US.csv",
                upstream_name(m).to_lowercase()
            ),
            Feed::StatesDaily => "daily.csv".to_string(),
        }
    }
}

// JHU names cases "Confirmed".
fn upstream_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Cases => "Confirmed",
        Metric::Deaths => "Deaths",
        Metric::Recovered => "Recovered",
    }
}

pub trait DataSource {
    fn fetch(&self, feed: Feed) -> Result<String>;
}

/// Fixed documents, keyed by feed.
impl DataSource for HashMap<Feed, String> {
    fn fetch(&self, feed: Feed) -> Result<String> {
        self.get(&feed).cloned().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no document for {}", feed.file_name()),
            ))
        })
    }
}

/// Base URLs of each upstream.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub mapping_base: String,
    pub jhu_base: String,
    pub covidtracking_base: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mapping_base: "https://raw.githubusercontent.com/srikanthrc/covid-19/master/".to_string(),
            jhu_base: "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/".to_string(),
            covidtracking_base: "https://covidtracking.com/api/states/".to_string(),
        }
    }
}

impl SourceConfig {
    pub fn url(&self, feed: Feed) -> String {
        let base = match feed {
            Feed::CountryMapping | Feed::StateMapping => &self.mapping_base,
            Feed::GlobalSeries(_) | Feed::UsSeries(_) => &self.jhu_base,
            Feed::StatesDaily => &self.covidtracking_base,
        };
        format!("{}{}", base, feed.file_name())
    }
}

/// Fetches feeds over HTTP. No retries: a failed request fails the run.
pub struct HttpSource {
    client: reqwest::blocking::Client,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(config: SourceConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("covid_overview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }
}

impl DataSource for HttpSource {
    fn fetch(&self, feed: Feed) -> Result<String> {
        let url = self.config.url(feed);
        info!("Fetching {}", url);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response.text()?)
    }
}

/// Reads feeds from a local directory using their upstream file names.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for DirSource {
    fn fetch(&self, feed: Feed) -> Result<String> {
        let path = self.dir.join(feed.file_name());
        info!("Reading {}", path.display());
        Ok(std::fs::read_to_string(path)?)
    }
}
