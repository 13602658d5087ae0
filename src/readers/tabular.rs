use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::error::{ProcessingError, Result};

/// One row of a tabular source: raw string values positioned against a shared
/// column list.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<String>,
}

impl Row {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<String>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Look up a field by exact column name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
            .map(|s| s.as_str())
    }
}

/// A finite, single-pass sequence of field→value mappings with a column set
/// that is known before iteration begins.
pub trait TabularSource {
    fn columns(&self) -> &[String];
    fn next_row(&mut self) -> Option<Result<Row>>;
}

/// Delimited-text source: optional leading `#` comment lines, then exactly one
/// header row, then data rows. Rows stream lazily.
pub struct CsvSource<R: Read> {
    columns: Arc<Vec<String>>,
    comments: String,
    records: csv::StringRecordsIntoIter<std::io::Chain<Cursor<Vec<u8>>, BufReader<R>>>,
}

impl CsvSource<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut buffered = BufReader::new(reader);
        let mut comments = String::new();

        // Capture the leading comment block; the first non-comment line is the
        // header row, which gets handed back to the CSV reader.
        let header_line = loop {
            let mut line = String::new();
            if buffered.read_line(&mut line)? == 0 {
                return Err(ProcessingError::InvalidFormat(
                    "Source has no header row".to_string(),
                ));
            }
            if line.starts_with('#') {
                comments.push_str(&line);
            } else {
                break line;
            }
        };

        let chained = Cursor::new(header_line.into_bytes()).chain(buffered);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(chained);

        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        Ok(Self {
            columns: Arc::new(columns),
            comments,
            records: reader.into_records(),
        })
    }

    /// The leading comment block, verbatim (empty when the source had none).
    /// For files produced by this crate that block is prior provenance.
    pub fn comments(&self) -> &str {
        &self.comments
    }
}

impl<R: Read> TabularSource for CsvSource<R> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<Row>> {
        match self.records.next()? {
            Ok(record) => {
                let values = record.iter().map(|v| v.to_string()).collect();
                Some(Ok(Row::new(self.columns.clone(), values)))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Relational source: one SQLite table presented through the same row-mapping
/// interface. Rows are materialized at open (station metadata tables are
/// small) so no read statement stays open against the connection.
pub struct TableSource {
    columns: Arc<Vec<String>>,
    rows: std::vec::IntoIter<Vec<String>>,
}

impl TableSource {
    pub fn open(conn: &Connection, table: &str) -> Result<Self> {
        if !table_exists(conn, table)? {
            return Err(ProcessingError::TableMissing(table.to_string()));
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM \"{}\"", table))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut collected = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(render_sql_value(row.get_ref(i)?));
            }
            collected.push(values);
        }

        Ok(Self {
            columns: Arc::new(columns),
            rows: collected.into_iter(),
        })
    }
}

impl TabularSource for TableSource {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<Row>> {
        self.rows
            .next()
            .map(|values| Ok(Row::new(self.columns.clone(), values)))
    }
}

/// Check for a table in the connected store. Absence of a table is a
/// "schema absent" condition, not a connection failure.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn render_sql_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(_) => String::new(),
    }
}
