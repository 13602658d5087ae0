use tracing::info;

use crate::error::{ProcessingError, Result};
use crate::filter::compile_optional;
use crate::models::rainfall::RAINFALL_COLUMNS;
use crate::models::{RainfallObservation, Site};
use crate::processors::{merged_provenance, open_connection, open_sink, RunSummary};
use crate::provenance::{self, ConfigOption};
use crate::readers::{CsvSource, TableSource, TabularSource};
use crate::remote::RemoteClient;
use crate::utils::constants::{RAINFALL_TABLE, SITE_TABLE};
use crate::utils::progress::ProgressReporter;
use crate::writers::{ColumnSpec, Destination};

/// Immutable configuration of one `rainfall` run.
#[derive(Debug, Clone)]
pub struct RainfallConfig {
    pub filter: Option<String>,
    pub limit: Option<usize>,
    pub dry_run: bool,
    pub no_comments: bool,
    pub no_header: bool,
    /// Where site metadata comes from; defaults to the destination
    /// connection when that is a database.
    pub sites: Option<String>,
    pub outdata: Option<String>,
    pub verbosity: u8,
}

impl RainfallConfig {
    fn provenance_options(&self) -> Vec<ConfigOption> {
        vec![
            ConfigOption::int("limit", self.limit.map(|l| l as i64)),
            ConfigOption::str("filter", self.filter.as_deref()),
            ConfigOption::flag("dry-run", self.dry_run),
            ConfigOption::flag("no-header", self.no_header),
            ConfigOption::str("sites", self.sites.as_deref()),
            ConfigOption::str("outdata", self.outdata.as_deref()),
        ]
    }
}

/// Daily-rainfall ingest: select sites from previously-ingested metadata,
/// then per kept site fetch the observation archive and upsert every
/// observation into the destination.
pub struct RainfallPipeline {
    config: RainfallConfig,
    client: RemoteClient,
}

impl RainfallPipeline {
    pub fn new(config: RainfallConfig, client: RemoteClient) -> Self {
        Self { config, client }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let dest = Destination::parse(self.config.outdata.as_deref());

        let (mut source, source_comments) = self.open_sites_source(&dest)?;
        let columns = source.columns().to_vec();
        // Compile before any row is read or the destination is touched.
        let predicate = compile_optional(self.config.filter.as_deref(), &columns)?;

        let mut summary = RunSummary::default();
        let mut sites: Vec<Site> = Vec::new();
        while let Some(row) = source.next_row() {
            let row = row?;
            if let Some(predicate) = &predicate {
                if !predicate.matches(&row)? {
                    continue;
                }
            }
            sites.push(Site::from_row(&row)?);
        }
        drop(source);
        summary.selected = sites.len();

        info!("Found {} sites:", sites.len());
        for site in &sites {
            info!("    {} - {}", site.name, site.site);
        }

        if self.config.dry_run {
            return Ok(summary);
        }

        // A provenance-bearing source stays on the record: its comment block
        // is preserved between this run's block and any prior history.
        let comments = if self.config.no_comments {
            None
        } else {
            let merged = merged_provenance(&dest, "rainfall", &self.config.provenance_options())?;
            Some(provenance::merge(&merged, &source_comments))
        };

        let mut sink = open_sink(
            &dest,
            RAINFALL_TABLE,
            &rainfall_schema(),
            comments.as_deref(),
            self.config.no_header,
        )?;
        sink.write_header()?;

        let progress = ProgressReporter::new(
            sites.len() as u64,
            "Fetching daily rainfall data...",
            self.config.verbosity == 0,
        );

        for site in &sites {
            info!(
                "Loading BOM daily rainfall data from site {} - {}",
                site.name, site.site
            );
            progress.set_message(&format!("Fetching {} - {}", site.name, site.site));

            let csv = self.client.fetch_daily_rainfall_csv(site.site)?;
            let mut observations = CsvSource::from_reader(csv.as_bytes())?;

            // The row limit applies per site, capping each station's
            // observation count rather than the whole run.
            let mut site_rows = 0;
            while let Some(row) = observations.next_row() {
                if self.config.limit == Some(site_rows) {
                    break;
                }
                let row = row?;
                match RainfallObservation::from_csv_row(&row)? {
                    Some(observation) => {
                        sink.write_row(&observation.values())?;
                        site_rows += 1;
                        summary.written += 1;
                    }
                    None => summary.skipped += 1,
                }
            }

            progress.increment(1);
        }
        progress.finish_with_message("Fetch complete");

        summary.report = sink.finalize()?;
        info!(
            "Wrote {} observations ({} inserted, {} updated, {} skipped)",
            summary.written, summary.report.inserted, summary.report.updated, summary.skipped
        );

        Ok(summary)
    }

    /// The site-metadata source: `--sites` when given (CSV path or database
    /// spec), otherwise the destination's own `Site` table. For a CSV source
    /// the leading comment block comes back alongside, to be re-preserved in
    /// the destination's provenance.
    fn open_sites_source(&self, dest: &Destination) -> Result<(Box<dyn TabularSource>, String)> {
        let sites_dest = match &self.config.sites {
            Some(spec) => Destination::parse(Some(spec)),
            None => {
                if !dest.is_database() {
                    return Err(ProcessingError::Config(
                        "A site metadata source is required: pass --sites or use a database destination"
                            .to_string(),
                    ));
                }
                dest.clone()
            }
        };

        match &sites_dest {
            Destination::File(path) => {
                let source = CsvSource::open(path)?;
                let comments = source.comments().to_string();
                Ok((Box::new(source), comments))
            }
            Destination::Database(_) => {
                let conn = open_connection(&sites_dest)?;
                let source = TableSource::open(&conn, SITE_TABLE)?;
                Ok((Box::new(source), String::new()))
            }
            Destination::Stdout => Err(ProcessingError::Config(
                "Cannot read site metadata from stdout".to_string(),
            )),
        }
    }
}

fn rainfall_schema() -> Vec<ColumnSpec> {
    RAINFALL_COLUMNS
        .iter()
        .map(|name| {
            let sql_type = match *name {
                "Site" | "Period" => "INTEGER",
                "Rainfall" => "REAL",
                "Date" => "DATE",
                _ => "TEXT",
            };
            let key = matches!(*name, "Product" | "Site" | "Date");
            ColumnSpec::new(name, sql_type, key)
        })
        .collect()
}
