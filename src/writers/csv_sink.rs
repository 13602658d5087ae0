use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Value;
use crate::writers::{RecordSink, SinkReport};

/// Delimited-text record sink: provenance comment block, optional header row,
/// then one row per record in input order. An existing destination file is
/// renamed to a `.bak` sibling before anything is written, so no history is
/// silently overwritten.
pub struct CsvSink {
    writer: csv::Writer<Box<dyn Write>>,
    columns: Vec<String>,
    no_header: bool,
    header_written: bool,
    rows_written: usize,
}

impl CsvSink {
    pub fn create(
        path: &Path,
        columns: Vec<String>,
        comments: &str,
        no_header: bool,
    ) -> Result<Self> {
        if path.exists() {
            fs::rename(path, backup_path(path))?;
        }

        let mut file = File::create(path)?;
        file.write_all(comments.as_bytes())?;

        Ok(Self::from_writer(Box::new(file), columns, no_header))
    }

    pub fn to_stdout(columns: Vec<String>, comments: &str, no_header: bool) -> Result<Self> {
        let mut stdout = std::io::stdout();
        stdout.write_all(comments.as_bytes())?;

        Ok(Self::from_writer(Box::new(stdout), columns, no_header))
    }

    fn from_writer(writer: Box<dyn Write>, columns: Vec<String>, no_header: bool) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            columns,
            no_header,
            header_written: false,
            rows_written: 0,
        }
    }
}

impl RecordSink for CsvSink {
    fn write_header(&mut self) -> Result<()> {
        if self.no_header || self.header_written {
            return Ok(());
        }
        self.writer.write_record(&self.columns)?;
        self.header_written = true;
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<()> {
        let fields: Vec<String> = values.iter().map(|v| v.to_csv_field()).collect();
        self.writer.write_record(&fields)?;
        self.rows_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<SinkReport> {
        self.writer.flush()?;
        Ok(SinkReport {
            inserted: self.rows_written,
            updated: 0,
        })
    }
}

/// `<path>.bak` sibling of a destination path.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(".bak");
    PathBuf::from(backup)
}
