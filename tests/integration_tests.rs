use std::fs;
use std::io::Write as _;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

use bom_processor::models::site::State;
use bom_processor::processors::{RainfallConfig, RainfallPipeline, SitesConfig, SitesPipeline};
use bom_processor::readers::{CsvSource, TabularSource};
use bom_processor::remote::RemoteClient;
use bom_processor::ProcessingError;

const STATION_LISTING: &str = "\
Bureau of Meteorology product IDCJMC0014.                Produced: 14 Aug 2019

Site    Name                                Lat       Lon       Start    End      Years  %    AWS
------- ----------------------------------- --------- --------- -------- -------- ------ ---- ---
009519  WALPOLE                              -34.9776  116.7310 Jan 1930 Aug 2019   89.6   97 N
009021  PERTH AIRPORT                        -31.9275  115.9764 Jan 1944 Aug 2019   75.6  100 Y

";

const OBSERVATION_HEADER: &str = "Product code,Bureau of Meteorology station number,Year,Month,Day,Rainfall amount (millimetres),Period over which rainfall was measured (days),Quality";

fn observation_csv(rainfall_on_the_14th: &str) -> String {
    format!(
        "{}\nIDCJAC0009,9519,2019,8,13,0.0,,Y\nIDCJAC0009,9519,2019,8,14,{},1,Y\nIDCJAC0009,9519,2019,8,15,,,\n",
        OBSERVATION_HEADER, rainfall_on_the_14th
    )
}

fn zip_archive(csv: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("IDCJAC0009_009519_1800_Note.txt", FileOptions::default())
        .unwrap();
    writer.write_all(b"station notes").unwrap();
    writer
        .start_file("IDCJAC0009_009519_1800_Data.csv", FileOptions::default())
        .unwrap();
    writer.write_all(csv.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Mock the BOM endpoints: station directory, weather-data page, archive.
fn mock_bom(server: &MockServer, rainfall_on_the_14th: &str) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/climate/data/lists_by_element/alphaWA_136.txt");
        then.status(200).body(STATION_LISTING);
    });
    server.mock(|when, then| {
        when.method(GET).path("/jsp/ncc/cdio/weatherData/av");
        then.status(200).body(format!(
            r#"<html><body><a title="Data file for daily rainfall data for all years" href="{}/archive/daily.zip">All years</a></body></html>"#,
            server.base_url()
        ));
    });
    let archive = zip_archive(&observation_csv(rainfall_on_the_14th));
    server.mock(|when, then| {
        when.method(GET).path("/archive/daily.zip");
        then.status(200).body(archive);
    });
}

fn sites_config(outdata: &str) -> SitesConfig {
    SitesConfig {
        state: State::WA,
        limit: None,
        filter: None,
        no_comments: false,
        no_header: false,
        outdata: Some(outdata.to_string()),
        verbosity: 0,
    }
}

fn rainfall_config(outdata: &str) -> RainfallConfig {
    RainfallConfig {
        filter: None,
        limit: None,
        dry_run: false,
        no_comments: false,
        no_header: false,
        sites: None,
        outdata: Some(outdata.to_string()),
        verbosity: 0,
    }
}

fn client(server: &MockServer) -> RemoteClient {
    RemoteClient::with_base_url(&server.base_url()).unwrap()
}

#[test]
fn sites_to_csv_with_provenance_and_filter() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("sites.csv");

    let mut config = sites_config(out.to_str().unwrap());
    config.filter = Some("Name == 'WALPOLE'".to_string());

    let summary = SitesPipeline::new(config, client(&server)).run().unwrap();
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.written, 1);

    let content = fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    let banner = lines.next().unwrap();
    assert!(banner.starts_with('#'));
    assert!(banner.contains("sites.csv"));

    let data: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(data[0], "Site,Name,Lat,Lon,Start,End,Years,Percent,AWS");
    assert_eq!(
        data[1],
        "9519,WALPOLE,-34.9776,116.731,1930-01-01,2019-08-01,89.6,97,false"
    );
    assert_eq!(data.len(), 2);
}

#[test]
fn filter_on_undeclared_field_fails_before_destination_is_touched() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("sites.csv");
    fs::write(&out, "precious\n").unwrap();

    let mut config = sites_config(out.to_str().unwrap());
    config.filter = Some("Elevation > 100".to_string());

    let result = SitesPipeline::new(config, client(&server)).run();
    assert!(matches!(result, Err(ProcessingError::Filter(_))));

    // No .bak, no overwrite: the compile error fired first.
    assert_eq!(fs::read_to_string(&out).unwrap(), "precious\n");
    assert!(!dir.path().join("sites.csv.bak").exists());
}

#[test]
fn row_limit_bounds_sink_records() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("sites.csv");

    let mut config = sites_config(out.to_str().unwrap());
    config.limit = Some(1);

    let summary = SitesPipeline::new(config, client(&server)).run().unwrap();
    assert_eq!(summary.written, 1);

    let content = fs::read_to_string(&out).unwrap();
    let data: Vec<&str> = content.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(data.len(), 2); // header + one row
}

#[test]
fn existing_destination_is_backed_up_intact() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("sites.csv");
    fs::write(&out, "previous run output\n").unwrap();

    SitesPipeline::new(sites_config(out.to_str().unwrap()), client(&server))
        .run()
        .unwrap();

    let backup = dir.path().join("sites.csv.bak");
    assert_eq!(fs::read_to_string(&backup).unwrap(), "previous run output\n");
}

#[test]
fn provenance_accumulates_across_runs() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("sites.csv");

    SitesPipeline::new(sites_config(out.to_str().unwrap()), client(&server))
        .run()
        .unwrap();
    let first_run: Vec<String> = fs::read_to_string(&out)
        .unwrap()
        .lines()
        .take_while(|l| l.starts_with('#'))
        .map(|l| l.to_string())
        .collect();

    SitesPipeline::new(sites_config(out.to_str().unwrap()), client(&server))
        .run()
        .unwrap();
    let second_run: Vec<String> = fs::read_to_string(&out)
        .unwrap()
        .lines()
        .take_while(|l| l.starts_with('#'))
        .map(|l| l.to_string())
        .collect();

    // History is additive: both blocks, newest first.
    assert_eq!(second_run.len(), first_run.len() * 2);
    assert_eq!(&second_run[first_run.len()..], &first_run[..]);
}

#[test]
fn rainfall_round_trips_through_csv() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();

    // Site metadata as CSV, then rainfall to CSV using it as the source.
    let sites_out = dir.path().join("sites.csv");
    SitesPipeline::new(sites_config(sites_out.to_str().unwrap()), client(&server))
        .run()
        .unwrap();

    let rain_out = dir.path().join("rain.csv");
    let mut config = rainfall_config(rain_out.to_str().unwrap());
    config.sites = Some(sites_out.to_str().unwrap().to_string());
    config.filter = Some("Name == 'WALPOLE'".to_string());

    let summary = RainfallPipeline::new(config, client(&server)).run().unwrap();
    assert_eq!(summary.selected, 1);
    assert_eq!(summary.written, 2); // the empty-rainfall row is skipped
    assert_eq!(summary.skipped, 1);

    // The source CSV's provenance block rides along into the new output.
    let rain_text = fs::read_to_string(&rain_out).unwrap();
    assert!(rain_text.contains("# bom-processor rainfall"));
    assert!(rain_text.contains("# bom-processor sites"));

    // Re-read the output as a tabular source: key fields survive verbatim.
    let mut source = CsvSource::open(&rain_out).unwrap();
    assert_eq!(
        source.columns(),
        &["Product", "Site", "Date", "Rainfall", "Period", "Quality"]
    );
    let mut keys = Vec::new();
    while let Some(row) = source.next_row() {
        let row = row.unwrap();
        keys.push((
            row.get("Product").unwrap().to_string(),
            row.get("Site").unwrap().to_string(),
            row.get("Date").unwrap().to_string(),
        ));
    }
    assert_eq!(
        keys,
        vec![
            (
                "IDCJAC0009".to_string(),
                "9519".to_string(),
                "2019-08-13".to_string()
            ),
            (
                "IDCJAC0009".to_string(),
                "9519".to_string(),
                "2019-08-14".to_string()
            ),
        ]
    );
}

#[test]
fn upsert_is_idempotent_across_runs() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("bom.db");
    let spec = format!("sqlite:///{}", db.display());

    // Ingest sites, then rainfall, twice; the second rainfall run delivers a
    // different payload for the same keys.
    SitesPipeline::new(sites_config(&spec), client(&server))
        .run()
        .unwrap();

    let mut config = rainfall_config(&spec);
    config.filter = Some("Name == 'WALPOLE'".to_string());
    let first = RainfallPipeline::new(config.clone(), client(&server))
        .run()
        .unwrap();
    assert_eq!(first.report.inserted, 2);
    assert_eq!(first.report.updated, 0);

    let server2 = MockServer::start();
    mock_bom(&server2, "99.9");
    let second = RainfallPipeline::new(config, client(&server2)).run().unwrap();
    assert_eq!(second.report.inserted, 0);
    assert_eq!(second.report.updated, 2);

    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM Rainfall", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);

    let rainfall: f64 = conn
        .query_row(
            "SELECT Rainfall FROM Rainfall WHERE Date = '2019-08-14'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!((rainfall - 99.9).abs() < f64::EPSILON);

    // Sibling log accumulated one block per rainfall run.
    let log = fs::read_to_string(dir.path().join("bom.log")).unwrap();
    assert_eq!(log.matches("# bom-processor rainfall").count(), 2);
}

#[test]
fn sites_reingest_updates_in_place() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();
    let spec = format!("sqlite:///{}", dir.path().join("bom.db").display());

    let first = SitesPipeline::new(sites_config(&spec), client(&server))
        .run()
        .unwrap();
    assert_eq!(first.report.inserted, 2);

    let second = SitesPipeline::new(sites_config(&spec), client(&server))
        .run()
        .unwrap();
    assert_eq!(second.report.inserted, 0);
    assert_eq!(second.report.updated, 2);

    let conn = Connection::open(dir.path().join("bom.db")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM Site", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn dry_run_selects_without_collecting() {
    let server = MockServer::start();
    mock_bom(&server, "12.4");
    let dir = TempDir::new().unwrap();

    let sites_out = dir.path().join("sites.csv");
    SitesPipeline::new(sites_config(sites_out.to_str().unwrap()), client(&server))
        .run()
        .unwrap();

    let rain_out = dir.path().join("rain.csv");
    let mut config = rainfall_config(rain_out.to_str().unwrap());
    config.sites = Some(sites_out.to_str().unwrap().to_string());
    config.dry_run = true;

    let summary = RainfallPipeline::new(config, client(&server)).run().unwrap();
    assert_eq!(summary.selected, 2);
    assert_eq!(summary.written, 0);
    assert!(!rain_out.exists());
}

#[test]
fn missing_site_table_is_schema_absent() {
    let server = MockServer::start();
    let dir = TempDir::new().unwrap();
    let spec = format!("sqlite:///{}", dir.path().join("empty.db").display());

    let result = RainfallPipeline::new(rainfall_config(&spec), client(&server)).run();
    assert!(matches!(result, Err(ProcessingError::TableMissing(_))));
}

#[test]
fn missing_archive_link_aborts_the_run() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/jsp/ncc/cdio/weatherData/av");
        then.status(200).body("<html><body>maintenance page</body></html>");
    });
    let dir = TempDir::new().unwrap();

    let sites_csv = dir.path().join("sites.csv");
    fs::write(&sites_csv, "Site,Name\n9519,WALPOLE\n").unwrap();

    let mut config = rainfall_config(dir.path().join("rain.csv").to_str().unwrap());
    config.sites = Some(sites_csv.to_str().unwrap().to_string());

    let result = RainfallPipeline::new(config, client(&server)).run();
    assert!(matches!(
        result,
        Err(ProcessingError::StationDataNotFound { site: 9519 })
    ));
}
