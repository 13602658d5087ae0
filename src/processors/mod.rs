pub mod rainfall;
pub mod sites;

pub use rainfall::{RainfallConfig, RainfallPipeline};
pub use sites::{SitesConfig, SitesPipeline};

use rusqlite::Connection;

use crate::error::Result;
use crate::provenance::{self, ConfigOption};
use crate::writers::{ColumnSpec, CsvSink, Destination, RecordSink, SinkReport, SqliteSink};

/// Counts for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Rows that passed the filter predicate.
    pub selected: usize,
    /// Records that reached the sink.
    pub written: usize,
    /// Rows dropped for per-row data reasons (empty measurement, bad
    /// coordinates), never counted as errors.
    pub skipped: usize,
    pub report: SinkReport,
}

/// Render this run's provenance block and merge any prior history already
/// attached to the destination: the leading comment block of an existing
/// text file, or the sibling log of a database.
pub fn merged_provenance(
    dest: &Destination,
    tool: &str,
    options: &[ConfigOption],
) -> Result<String> {
    let block = provenance::render_block(dest.label().as_deref(), tool, options);
    let prior = match dest {
        Destination::Stdout => String::new(),
        Destination::File(path) => provenance::read_comment_block(path)?,
        Destination::Database(_) => {
            provenance::read_log(&provenance::log_path(&dest.sqlite_path()?))?
        }
    };
    Ok(provenance::merge(&block, &prior))
}

/// Open the record sink for a destination. `comments` is the merged
/// provenance text, or `None` when comments are suppressed; for a database
/// destination it is written to the sibling log file up front.
pub fn open_sink(
    dest: &Destination,
    table: &str,
    columns: &[ColumnSpec],
    comments: Option<&str>,
    no_header: bool,
) -> Result<Box<dyn RecordSink>> {
    let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let comment_text = comments.unwrap_or("");

    match dest {
        Destination::Stdout => Ok(Box::new(CsvSink::to_stdout(
            column_names,
            comment_text,
            no_header,
        )?)),
        Destination::File(path) => Ok(Box::new(CsvSink::create(
            path,
            column_names,
            comment_text,
            no_header,
        )?)),
        Destination::Database(_) => {
            let db_path = dest.sqlite_path()?;
            if let Some(text) = comments {
                provenance::write_log(&provenance::log_path(&db_path), text)?;
            }
            Ok(Box::new(SqliteSink::open(&db_path, table, columns)?))
        }
    }
}

/// Open a connection for a database destination.
pub fn open_connection(dest: &Destination) -> Result<Connection> {
    Ok(Connection::open(dest.sqlite_path()?)?)
}
