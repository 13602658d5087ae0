use std::path::Path;

use rusqlite::Connection;

use crate::error::{ProcessingError, Result};
use crate::models::Value;
use crate::readers::table_exists;
use crate::writers::{ColumnSpec, RecordSink, SinkReport};

/// Relational record sink with idempotent upsert semantics.
///
/// The destination table is created with its composite-key schema when
/// absent (schema absence is a reason to create, not an error). The whole
/// run is one transaction: every row goes through an explicit find-by-key,
/// then either an insert or an update of the non-key columns, and nothing
/// becomes visible until `finalize` commits. Dropping the sink without
/// finalizing rolls everything back.
pub struct SqliteSink {
    conn: Connection,
    exists_sql: String,
    insert_sql: String,
    update_sql: Option<String>,
    key_positions: Vec<usize>,
    nonkey_positions: Vec<usize>,
    width: usize,
    report: SinkReport,
    finalized: bool,
}

impl SqliteSink {
    pub fn open(db_path: &Path, table: &str, columns: &[ColumnSpec]) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn, table, columns)
    }

    pub fn with_connection(conn: Connection, table: &str, columns: &[ColumnSpec]) -> Result<Self> {
        if columns.iter().all(|c| !c.key) {
            return Err(ProcessingError::Config(format!(
                "Table '{}' has no key columns",
                table
            )));
        }

        if !table_exists(&conn, table)? {
            conn.execute(&create_table_sql(table, columns), [])?;
        }

        let key_positions: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.key)
            .map(|(i, _)| i)
            .collect();
        let nonkey_positions: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.key)
            .map(|(i, _)| i)
            .collect();

        let exists_sql = exists_sql(table, columns);
        let insert_sql = insert_sql(table, columns);
        let update_sql = if nonkey_positions.is_empty() {
            None
        } else {
            Some(update_sql(table, columns))
        };

        conn.execute("BEGIN TRANSACTION", [])?;

        Ok(Self {
            conn,
            exists_sql,
            insert_sql,
            update_sql,
            key_positions,
            nonkey_positions,
            width: columns.len(),
            report: SinkReport::default(),
            finalized: false,
        })
    }
}

impl RecordSink for SqliteSink {
    fn write_header(&mut self) -> Result<()> {
        // The table declaration is the header.
        Ok(())
    }

    fn write_row(&mut self, values: &[Value]) -> Result<()> {
        if values.len() != self.width {
            return Err(ProcessingError::InvalidFormat(format!(
                "Expected {} values, got {}",
                self.width,
                values.len()
            )));
        }

        let key_values: Vec<&Value> = self.key_positions.iter().map(|&i| &values[i]).collect();

        let mut exists = self.conn.prepare_cached(&self.exists_sql)?;
        let found = exists
            .query(rusqlite::params_from_iter(key_values.iter()))?
            .next()?
            .is_some();

        if found {
            if let Some(update_sql) = &self.update_sql {
                let mut update = self.conn.prepare_cached(update_sql)?;
                let params: Vec<&Value> = self
                    .nonkey_positions
                    .iter()
                    .chain(self.key_positions.iter())
                    .map(|&i| &values[i])
                    .collect();
                update.execute(rusqlite::params_from_iter(params.iter()))?;
            }
            self.report.updated += 1;
        } else {
            let mut insert = self.conn.prepare_cached(&self.insert_sql)?;
            insert.execute(rusqlite::params_from_iter(values.iter()))?;
            self.report.inserted += 1;
        }

        Ok(())
    }

    fn finalize(&mut self) -> Result<SinkReport> {
        self.conn.execute("COMMIT", [])?;
        self.finalized = true;
        Ok(self.report.clone())
    }
}

impl Drop for SqliteSink {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = self.conn.execute("ROLLBACK", []);
        }
    }
}

fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}

fn create_table_sql(table: &str, columns: &[ColumnSpec]) -> String {
    let column_defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quoted(&c.name), c.sql_type))
        .collect();
    let keys: Vec<String> = columns
        .iter()
        .filter(|c| c.key)
        .map(|c| quoted(&c.name))
        .collect();
    format!(
        "CREATE TABLE {} ({}, PRIMARY KEY ({}))",
        quoted(table),
        column_defs.join(", "),
        keys.join(", ")
    )
}

fn exists_sql(table: &str, columns: &[ColumnSpec]) -> String {
    let conditions: Vec<String> = columns
        .iter()
        .filter(|c| c.key)
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quoted(&c.name), i + 1))
        .collect();
    format!(
        "SELECT 1 FROM {} WHERE {}",
        quoted(table),
        conditions.join(" AND ")
    )
}

fn insert_sql(table: &str, columns: &[ColumnSpec]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quoted(&c.name)).collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted(table),
        names.join(", "),
        params.join(", ")
    )
}

fn update_sql(table: &str, columns: &[ColumnSpec]) -> String {
    let nonkeys: Vec<&ColumnSpec> = columns.iter().filter(|c| !c.key).collect();
    let keys: Vec<&ColumnSpec> = columns.iter().filter(|c| c.key).collect();

    let assignments: Vec<String> = nonkeys
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quoted(&c.name), i + 1))
        .collect();
    let conditions: Vec<String> = keys
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", quoted(&c.name), nonkeys.len() + i + 1))
        .collect();

    format!(
        "UPDATE {} SET {} WHERE {}",
        quoted(table),
        assignments.join(", "),
        conditions.join(" AND ")
    )
}
