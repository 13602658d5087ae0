use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::Value;
use crate::readers::Row;

/// Column names in the CSV delivered inside the BOM daily rainfall archive.
pub const COL_PRODUCT: &str = "Product code";
pub const COL_STATION: &str = "Bureau of Meteorology station number";
pub const COL_YEAR: &str = "Year";
pub const COL_MONTH: &str = "Month";
pub const COL_DAY: &str = "Day";
pub const COL_RAINFALL: &str = "Rainfall amount (millimetres)";
pub const COL_PERIOD: &str = "Period over which rainfall was measured (days)";
pub const COL_QUALITY: &str = "Quality";

/// Column names of the rainfall output, in order.
pub const RAINFALL_COLUMNS: [&str; 6] = ["Product", "Site", "Date", "Rainfall", "Period", "Quality"];

/// One daily rainfall observation. `(product, site, date)` is the natural key:
/// the destination store holds exactly one row per key, and re-ingesting an
/// observation overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainfallObservation {
    pub product: String,
    pub site: u32,
    pub date: NaiveDate,
    pub rainfall: Option<f64>,
    pub period: Option<i64>,
    pub quality: String,
}

impl RainfallObservation {
    pub fn key(&self) -> (&str, u32, NaiveDate) {
        (&self.product, self.site, self.date)
    }

    /// Build an observation from one row of the archive CSV.
    ///
    /// Returns `Ok(None)` when the rainfall amount is empty: such rows are
    /// skipped, not errors. A missing column is an upstream-data error and
    /// aborts the run.
    pub fn from_csv_row(row: &Row) -> Result<Option<Self>> {
        let rainfall = required(row, COL_RAINFALL)?;
        if rainfall.is_empty() {
            return Ok(None);
        }
        let rainfall = rainfall
            .parse::<f64>()
            .map_err(|_| invalid(COL_RAINFALL, rainfall))?;

        let product = required(row, COL_PRODUCT)?.trim().to_string();

        let station = required(row, COL_STATION)?;
        let site = station
            .trim()
            .parse::<u32>()
            .map_err(|_| invalid(COL_STATION, station))?;

        let year = parse_date_part(row, COL_YEAR)?;
        let month = parse_date_part(row, COL_MONTH)?;
        let day = parse_date_part(row, COL_DAY)?;
        let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| {
            ProcessingError::InvalidFormat(format!(
                "Invalid observation date: {}-{}-{}",
                year, month, day
            ))
        })?;

        let period = required(row, COL_PERIOD)?;
        let period = if period.is_empty() {
            None
        } else {
            Some(period.parse::<i64>().map_err(|_| invalid(COL_PERIOD, period))?)
        };

        let quality = required(row, COL_QUALITY)?.trim().to_string();

        Ok(Some(Self {
            product,
            site,
            date,
            rainfall: Some(rainfall),
            period,
            quality,
        }))
    }

    /// Sink values in `RAINFALL_COLUMNS` order.
    pub fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.product.clone()),
            Value::Integer(self.site as i64),
            Value::Date(self.date),
            match self.rainfall {
                Some(r) => Value::Real(r),
                None => Value::Null,
            },
            match self.period {
                Some(p) => Value::Integer(p),
                None => Value::Null,
            },
            Value::Text(self.quality.clone()),
        ]
    }
}

fn required<'a>(row: &'a Row, column: &str) -> Result<&'a str> {
    row.get(column).ok_or_else(|| {
        ProcessingError::InvalidFormat(format!("Expected column '{}' not found", column))
    })
}

fn parse_date_part(row: &Row, column: &str) -> Result<u32> {
    let raw = required(row, column)?;
    raw.trim().parse::<u32>().map_err(|_| invalid(column, raw))
}

fn invalid(column: &str, value: &str) -> ProcessingError {
    ProcessingError::InvalidFormat(format!("Invalid value for '{}': '{}'", column, value))
}
