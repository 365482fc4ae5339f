use chrono::NaiveDate;
use covid_overview::derive::ExtensionRule;
use covid_overview::kpi::KpiSpec;
use covid_overview::source::Feed;
use covid_overview::{
    load_mappings, run_pipeline, Error, Granularity, Metric, PipelineOptions, RegionSummaryRow,
};
use std::collections::HashMap;

const COUNTRY_MAP: &str = "Country,Name,Continent\n\
Mainland China,China,Asia\n\
China,China,Asia\n\
Italy,Italy,Europe\n\
US,US,North America\n\
Others,,\n";

const STATE_MAP: &str = "State,Name\nNY,New York\nWA,Washington\nCA,California\n";

const CONFIRMED: &str = "Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20,3/4/20\n\
Hubei,Mainland China,30.9,112.2,5,5,8,\n\
Beijing,China,40.1,116.4,0,0,0,\n\
,Italy,43.0,12.0,1,3,2,\n\
,US,37.0,-95.0,0,1,4,\n";

const DEATHS: &str = "Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20,3/4/20\n\
Hubei,Mainland China,30.9,112.2,0,0,1,\n\
Beijing,China,40.1,116.4,0,0,0,\n\
,Italy,43.0,12.0,0,0,1,\n\
,US,37.0,-95.0,0,0,0,\n\
,Diamond Princess,35.4,139.6,0,1,1,\n";

const RECOVERED: &str = "Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20,3/4/20\n\
Hubei,Mainland China,30.9,112.2,0,1,2,\n\
Beijing,China,40.1,116.4,0,0,0,\n\
,Italy,43.0,12.0,0,0,0,\n\
,US,37.0,-95.0,0,0,0,\n";

const DAILY: &str = "date,state,positive,negative,death\n\
20200303,NY,10,100,1\n\
20200303,WA,10,50,3\n\
20200303,CA,5,20,\n\
20200302,NY,8,90,1\n\
20200302,WA,12,40,2\n\
20200302,CA,2,10,0\n";

const CONFIRMED_US: &str = "UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,3/1/20,3/2/20\n\
1,US,USA,840,41001,Washington,Oregon,US,45.5,-123.0,\"Washington, Oregon, US\",1,2\n\
2,US,USA,840,36115,Washington,NY,US,43.3,-73.4,\"Washington, New York, US\",3,4\n\
3,US,USA,840,53033,King,WA,US,47.5,-121.8,\"King, Washington, US\",5,9\n";

const DEATHS_US: &str = "UID,iso2,iso3,code3,FIPS,Admin2,Province_State,Country_Region,Lat,Long_,Combined_Key,Population,3/1/20,3/2/20\n\
1,US,USA,840,41001,Washington,Oregon,US,45.5,-123.0,\"Washington, Oregon, US\",600000,0,0\n\
2,US,USA,840,36115,Washington,NY,US,43.3,-73.4,\"Washington, New York, US\",61000,0,1\n\
3,US,USA,840,53033,King,WA,US,47.5,-121.8,\"King, Washington, US\",2250000,1,2\n";

fn source() -> HashMap<Feed, String> {
    HashMap::from([
        (Feed::CountryMapping, COUNTRY_MAP.to_string()),
        (Feed::StateMapping, STATE_MAP.to_string()),
        (Feed::GlobalSeries(Metric::Cases), CONFIRMED.to_string()),
        (Feed::GlobalSeries(Metric::Deaths), DEATHS.to_string()),
        (Feed::GlobalSeries(Metric::Recovered), RECOVERED.to_string()),
        (Feed::StatesDaily, DAILY.to_string()),
        (Feed::UsSeries(Metric::Cases), CONFIRMED_US.to_string()),
        (Feed::UsSeries(Metric::Deaths), DEATHS_US.to_string()),
    ])
}

fn regions(rows: &[RegionSummaryRow]) -> Vec<&str> {
    rows.iter().map(|r| r.region.as_str()).collect()
}

fn find<'a>(rows: &'a [RegionSummaryRow], region: &str) -> &'a RegionSummaryRow {
    rows.iter().find(|r| r.region == region).unwrap()
}

#[test]
fn country_overview() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let options = PipelineOptions {
        kpis: vec![KpiSpec::new("Europe", "EU"), KpiSpec::new("China", "CN")],
        ..PipelineOptions::default()
    };
    let out = run_pipeline(&src, &mappings, Granularity::Country, &options).unwrap();

    // The trailing 3/4/20 column is unpublished.
    assert_eq!(out.latest_date_index, 2);
    assert_eq!(out.date_columns.len(), 4);
    assert_eq!(out.summary.updated, NaiveDate::from_ymd_opt(2020, 3, 3).unwrap());
    assert_eq!(out.summary.since, NaiveDate::from_ymd_opt(2020, 3, 2).unwrap());

    assert_eq!(
        regions(&out.table),
        vec!["China", "US", "Italy", "Diamond Princess"]
    );

    let china = find(&out.table, "China");
    assert_eq!(china.cases.today, Some(8));
    assert_eq!(china.cases.previous, Some(5));
    assert_eq!(china.cases.change, Some(3));
    assert_eq!(china.recovered.change, Some(1));
    assert_eq!(china.fatality_rate, Some(12.5));
    assert_eq!(china.continent.as_deref(), Some("Asia"));

    let italy = find(&out.table, "Italy");
    assert_eq!(italy.cases.change, Some(0));
    assert_eq!(italy.raw_change(Metric::Cases), Some(-1));
    assert_eq!(italy.fatality_rate, Some(50.0));

    let ship = find(&out.table, "Diamond Princess");
    assert_eq!(ship.cases.today, None);
    assert_eq!(ship.deaths.today, Some(1));
    assert_eq!(ship.fatality_rate, None);
    assert_eq!(ship.continent, None);

    let s = &out.summary;
    assert_eq!(s.get("Cases"), Some(14));
    assert_eq!(s.get("Deaths"), Some(3));
    assert_eq!(s.get("Recovered"), Some(2));
    assert_eq!(s.get("Cases (+)"), Some(6));
    assert_eq!(s.get("Deaths (+)"), Some(2));
    assert_eq!(s.get("Recovered (+)"), Some(1));
    assert_eq!(s.get("EU Cases"), Some(2));
    assert_eq!(s.get("CN Cases"), Some(8));
    assert_eq!(s.get("CN Recovered"), Some(2));

    assert_eq!(out.new_cases.series("China"), Some(&[5, 0, 3, 0][..]));
    assert_eq!(out.new_cases.series("US"), Some(&[0, 1, 3, 0][..]));
}

#[test]
fn state_overview_from_daily_feed() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let options = PipelineOptions {
        kpis: vec![
            KpiSpec::new("New York", "NY"),
            KpiSpec::new("Washington", "WA"),
            KpiSpec::new("California", "CA"),
        ],
        ..PipelineOptions::default()
    };
    let out = run_pipeline(&src, &mappings, Granularity::State, &options).unwrap();

    assert_eq!(out.date_columns, vec!["03/02/20", "03/03/20"]);
    assert_eq!(out.latest_date_index, 1);
    assert_eq!(regions(&out.table), vec!["Washington", "New York", "California"]);

    let wa = find(&out.table, "Washington");
    assert_eq!(wa.cases.change, Some(0));
    assert_eq!(wa.recovered.today, None);
    // A blank count sums to zero, like any other missing cell.
    let ca = find(&out.table, "California");
    assert_eq!(ca.deaths.today, Some(0));
    assert_eq!(ca.deaths.change, Some(0));
    assert_eq!(ca.fatality_rate, Some(0.0));

    let s = &out.summary;
    assert_eq!(s.get("Cases"), Some(25));
    assert_eq!(s.get("Deaths"), Some(4));
    assert_eq!(s.get("Cases (+)"), Some(5));
    assert_eq!(s.get("Deaths (+)"), Some(1));
    assert_eq!(s.get("Recovered"), None);
    assert_eq!(s.get("NY Cases"), Some(10));
    assert_eq!(s.get("WA Cases (+)"), Some(0));
    assert_eq!(s.get("CA Deaths"), Some(0));

    let json = serde_json::to_value(s).unwrap();
    assert_eq!(json["updated"], "2020-03-03");
    assert_eq!(json["NY Deaths"], 1);
}

#[test]
fn filter_and_extension_rules() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let mut options = PipelineOptions::default()
        .with_filter(|row| row.label("Province/State") != Some("California"));
    options.rules.push(ExtensionRule::new("Share", |rows: &[RegionSummaryRow]| {
        let total: i64 = rows.iter().filter_map(|r| r.cases.today).sum();
        rows.iter()
            .map(|r| r.cases.today.unwrap_or(0) as f64 / total as f64)
            .collect()
    }));
    let out = run_pipeline(&src, &mappings, Granularity::State, &options).unwrap();

    assert_eq!(regions(&out.table), vec!["Washington", "New York"]);
    assert_eq!(out.table[0].extra("Share"), Some(0.5));
    assert!(out.new_cases.series("California").is_none());
}

#[test]
fn county_overview_groups_by_name() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let out = run_pipeline(&src, &mappings, Granularity::County, &PipelineOptions::default())
        .unwrap();

    assert_eq!(regions(&out.table), vec!["King", "Washington"]);
    let washington = find(&out.table, "Washington");
    assert_eq!(washington.cases.today, Some(6));
    assert_eq!(washington.cases.change, Some(2));
    assert_eq!(washington.deaths.today, Some(1));
}

#[test]
fn county_filter_sees_canonical_state_names() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let options = PipelineOptions {
        region_key: Some("Combined_Key".to_string()),
        ..PipelineOptions::default()
    }
    .with_filter(|row| row.label("Province_State") == Some("New York"));
    let out = run_pipeline(&src, &mappings, Granularity::County, &options).unwrap();

    assert_eq!(regions(&out.table), vec!["Washington, New York, US"]);
    assert_eq!(out.table[0].cases.today, Some(4));
}

#[test]
fn missing_feed_fails_the_run() {
    let mut src = source();
    src.remove(&Feed::GlobalSeries(Metric::Recovered));
    let mappings = load_mappings(&src).unwrap();
    assert!(run_pipeline(&src, &mappings, Granularity::Country, &PipelineOptions::default()).is_err());
}

#[test]
fn malformed_mapping_fails_fast() {
    let mut src = source();
    src.insert(Feed::StateMapping, "State,Label\nNY,New York\n".to_string());
    assert!(matches!(
        load_mappings(&src),
        Err(Error::MissingColumn { .. })
    ));
}

#[test]
fn unknown_region_key_fails() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let options = PipelineOptions {
        region_key: Some("Admin2".to_string()),
        ..PipelineOptions::default()
    };
    assert!(matches!(
        run_pipeline(&src, &mappings, Granularity::Country, &options),
        Err(Error::MissingColumn { .. })
    ));
}

#[test]
fn extension_rules_see_sorted_rows() {
    let src = source();
    let mappings = load_mappings(&src).unwrap();
    let mut options = PipelineOptions::default();
    options.rules.push(ExtensionRule::new("Rank", |rows: &[RegionSummaryRow]| {
        (1..=rows.len()).map(|i| i as f64).collect()
    }));
    let out = run_pipeline(&src, &mappings, Granularity::State, &options).unwrap();

    assert_eq!(regions(&out.table), vec!["Washington", "New York", "California"]);
    assert_eq!(find(&out.table, "Washington").extra("Rank"), Some(1.0));
    assert_eq!(find(&out.table, "California").extra("Rank"), Some(3.0));
}
