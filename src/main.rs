// Entry point: fetch one granularity, print the summary mapping and a preview
// of the region table, optionally exporting everything to a directory.
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use covid_overview::kpi::KpiSpec;
use covid_overview::output;
use covid_overview::source::{DataSource, DirSource, HttpSource, SourceConfig};
use covid_overview::util::{format_int, DATE_LABEL_FORMAT};
use covid_overview::{load_mappings, run_pipeline, Granularity, PipelineOptions};

#[derive(Parser)]
#[command(name = "covid-overview")]
#[command(about = "Summarize COVID-19 time series by country, US state or US county", long_about = None)]
struct Cli {
    /// Region granularity: country, state or county
    #[arg(short, long, env = "COVID_GRANULARITY", default_value = "state")]
    granularity: Granularity,

    /// Read the upstream CSV files from this directory instead of fetching them
    #[arg(long, env = "COVID_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "COVID_FETCH_TIMEOUT", default_value_t = 30)]
    timeout_secs: u64,

    /// Group by this column instead of the granularity's default
    #[arg(long)]
    region_key: Option<String>,

    /// KPI group as TITLE=PREFIX, e.g. "New York=NY" (repeatable)
    #[arg(long = "kpi", value_name = "TITLE=PREFIX")]
    kpis: Vec<String>,

    /// Number of regions shown in the preview table
    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    /// Write table.csv, summary.json and newcases.csv here
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

fn default_kpis(granularity: Granularity) -> Vec<KpiSpec> {
    match granularity {
        Granularity::State => vec![
            KpiSpec::new("New York", "NY"),
            KpiSpec::new("Washington", "WA"),
            KpiSpec::new("California", "CA"),
        ],
        Granularity::Country | Granularity::County => Vec::new(),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let source: Box<dyn DataSource> = match &cli.data_dir {
        Some(dir) => Box::new(DirSource::new(dir)),
        None => Box::new(
            HttpSource::new(SourceConfig::default(), Duration::from_secs(cli.timeout_secs))
                .context("Failed to create HTTP client")?,
        ),
    };

    let kpis = if cli.kpis.is_empty() {
        default_kpis(cli.granularity)
    } else {
        cli.kpis
            .iter()
            .map(|s| KpiSpec::parse(s))
            .collect::<covid_overview::Result<Vec<_>>>()?
    };
    let options = PipelineOptions {
        region_key: cli.region_key.clone(),
        kpis,
        ..PipelineOptions::default()
    };

    let mappings = load_mappings(source.as_ref()).context("Failed to load name mappings")?;
    let data = run_pipeline(source.as_ref(), &mappings, cli.granularity, &options)
        .with_context(|| format!("Failed to build {} overview", cli.granularity))?;

    let summary = &data.summary;
    println!(
        "Updated {} (since {})\n",
        summary.updated.format(DATE_LABEL_FORMAT),
        summary.since.format(DATE_LABEL_FORMAT)
    );
    for (key, value) in summary.totals.iter().chain(&summary.kpis) {
        println!("{:<24} {:>14}", key, format_int(*value));
    }
    println!();

    let report = output::report_rows(&data.table);
    output::preview_table(
        &format!("Overview by {}", cli.granularity),
        Some("Ordered by Cases, then Deaths"),
        &report,
        cli.preview_rows,
    );

    if let Some(dir) = &cli.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        output::write_csv(&dir.join("table.csv"), &report)?;
        output::write_json(&dir.join("summary.json"), summary)?;
        output::write_new_cases_csv(&dir.join("newcases.csv"), &data.new_cases)?;
        info!("Wrote outputs to {}", dir.display());
        println!("(Full tables exported to {})", dir.display());
    }

    Ok(())
}
