pub mod csv_sink;
pub mod sqlite_sink;

pub use csv_sink::CsvSink;
pub use sqlite_sink::SqliteSink;

use std::path::PathBuf;

use crate::error::{ProcessingError, Result};
use crate::models::Value;

/// One column of a sink's schema.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: &'static str,
    pub key: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, sql_type: &'static str, key: bool) -> Self {
        Self {
            name: name.to_string(),
            sql_type,
            key,
        }
    }
}

/// Counts reported by a sink at finalize.
#[derive(Debug, Clone, Default)]
pub struct SinkReport {
    pub inserted: usize,
    pub updated: usize,
}

impl SinkReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Destination-kind abstraction: an append-only delimited-text writer or an
/// upsert-capable relational table, behind one write interface. The sink owns
/// the destination handle for the duration of the run.
pub trait RecordSink {
    fn write_header(&mut self) -> Result<()>;
    fn write_row(&mut self, values: &[Value]) -> Result<()>;
    fn finalize(&mut self) -> Result<SinkReport>;
}

/// Where output goes, decided by the positional destination argument:
/// omitted means stdout, a `://` spec means a relational store, anything else
/// is a filesystem path.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    Database(String),
}

impl Destination {
    pub fn parse(outdata: Option<&str>) -> Self {
        match outdata {
            None => Destination::Stdout,
            Some(spec) if spec.contains("://") => Destination::Database(spec.to_string()),
            Some(path) => Destination::File(PathBuf::from(path)),
        }
    }

    /// Label for the provenance banner: the destination as the user wrote it.
    pub fn label(&self) -> Option<String> {
        match self {
            Destination::Stdout => None,
            Destination::File(path) => Some(path.display().to_string()),
            Destination::Database(spec) => Some(spec.clone()),
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, Destination::Database(_))
    }

    /// Resolve a `sqlite://` connection spec to a filesystem path. Follows
    /// the SQLAlchemy convention: `sqlite:///rel.db` is relative,
    /// `sqlite:////abs.db` is absolute.
    pub fn sqlite_path(&self) -> Result<PathBuf> {
        let spec = match self {
            Destination::Database(spec) => spec,
            _ => {
                return Err(ProcessingError::Config(
                    "Not a database destination".to_string(),
                ))
            }
        };

        let rest = spec
            .strip_prefix("sqlite://")
            .ok_or_else(|| ProcessingError::UnsupportedDestination(spec.clone()))?;
        let path = rest.strip_prefix('/').unwrap_or(rest);
        if path.is_empty() {
            return Err(ProcessingError::UnsupportedDestination(spec.clone()));
        }
        Ok(PathBuf::from(path))
    }
}
