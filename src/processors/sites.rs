use tracing::{info, warn};
use validator::Validate;

use crate::error::Result;
use crate::filter::compile_optional;
use crate::models::site::{Site, State};
use crate::models::Value;
use crate::processors::{merged_provenance, open_sink, RunSummary};
use crate::provenance::ConfigOption;
use crate::readers::station_list::{sql_type, StationList};
use crate::readers::TabularSource;
use crate::remote::RemoteClient;
use crate::utils::constants::SITE_TABLE;
use crate::writers::{ColumnSpec, Destination};

/// Immutable configuration of one `sites` run. Provenance renders purely
/// from this record; `verbosity` stays private to it.
#[derive(Debug, Clone)]
pub struct SitesConfig {
    pub state: State,
    pub limit: Option<usize>,
    pub filter: Option<String>,
    pub no_comments: bool,
    pub no_header: bool,
    pub outdata: Option<String>,
    pub verbosity: u8,
}

impl SitesConfig {
    fn provenance_options(&self) -> Vec<ConfigOption> {
        vec![
            ConfigOption::str("state", Some(self.state.code())),
            ConfigOption::int("limit", self.limit.map(|l| l as i64)),
            ConfigOption::str("filter", self.filter.as_deref()),
            ConfigOption::flag("no-header", self.no_header),
            ConfigOption::str("outdata", self.outdata.as_deref()),
        ]
    }
}

/// Station-directory ingest: fetch the fixed-width listing for one state,
/// filter, convert, sink.
pub struct SitesPipeline {
    config: SitesConfig,
    client: RemoteClient,
}

impl SitesPipeline {
    pub fn new(config: SitesConfig, client: RemoteClient) -> Self {
        Self { config, client }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let dest = Destination::parse(self.config.outdata.as_deref());

        info!(
            "Loading BOM station directory for {}",
            self.config.state.code()
        );
        let text = self.client.fetch_station_list(self.config.state)?;
        let mut listing = StationList::parse(&text)?;
        if let Some(produced) = listing.produced {
            info!("Directory produced {}", produced);
        }

        let columns = listing.columns().to_vec();
        // Compile before the destination is touched: a bad expression must
        // not cost the existing output its place.
        let predicate = compile_optional(self.config.filter.as_deref(), &columns)?;

        let comments = if self.config.no_comments {
            None
        } else {
            Some(merged_provenance(
                &dest,
                "sites",
                &self.config.provenance_options(),
            )?)
        };

        let specs: Vec<ColumnSpec> = columns
            .iter()
            .map(|name| ColumnSpec::new(name, sql_type(name), name == "Site"))
            .collect();
        let mut sink = open_sink(
            &dest,
            SITE_TABLE,
            &specs,
            comments.as_deref(),
            self.config.no_header,
        )?;
        sink.write_header()?;

        let mut summary = RunSummary::default();
        while let Some(row) = listing.next_row() {
            if self.config.limit == Some(summary.written) {
                break;
            }
            let row = row?;

            if let Some(predicate) = &predicate {
                if !predicate.matches(&row)? {
                    continue;
                }
            }
            summary.selected += 1;

            let site = match Site::from_row(&row) {
                Ok(site) => site,
                Err(e) => {
                    warn!("Skipping station row: {}", e);
                    summary.skipped += 1;
                    continue;
                }
            };
            if let Err(e) = site.validate() {
                warn!("Skipping station {}: {}", site.site, e);
                summary.skipped += 1;
                continue;
            }

            let values: Vec<Value> = columns.iter().map(|c| site.value_for(c)).collect();
            sink.write_row(&values)?;
            summary.written += 1;
        }

        summary.report = sink.finalize()?;
        info!(
            "Wrote {} sites ({} inserted, {} updated, {} skipped)",
            summary.written, summary.report.inserted, summary.report.updated, summary.skipped
        );

        Ok(summary)
    }
}
