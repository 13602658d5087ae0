use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::Value;
use crate::readers::Row;
use crate::utils::dates::parse_partial_date;

/// Australian states and territories with a BOM station directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum State {
    SA,
    NSW,
    NT,
    QLD,
    TAS,
    VIC,
    WA,
}

impl State {
    /// Code as it appears in the directory URL.
    pub fn code(&self) -> &'static str {
        match self {
            State::SA => "SA",
            State::NSW => "NSW",
            State::NT => "NT",
            State::QLD => "QLD",
            State::TAS => "TAS",
            State::VIC => "VIC",
            State::WA => "WA",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A weather station as listed in the BOM station directory for one state.
///
/// Only the station number and name are guaranteed by the upstream listing;
/// every other attribute depends on which columns the directory carries, so
/// they are optional and the emitted column set follows upstream discovery.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Site {
    pub site: u32,

    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: Option<f64>,

    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    pub years: Option<f64>,
    pub percent: Option<i64>,
    pub aws: Option<bool>,
}

impl Site {
    pub fn new(site: u32, name: String) -> Self {
        Self {
            site,
            name,
            lat: None,
            lon: None,
            start: None,
            end: None,
            years: None,
            percent: None,
            aws: None,
        }
    }

    /// Build a site from a tabular row with canonical column names. Only the
    /// station number and name are required; other columns convert when
    /// present and non-empty.
    pub fn from_row(row: &Row) -> Result<Self> {
        let raw_site = row.get("Site").unwrap_or("").trim();
        let site = raw_site.parse::<u32>().map_err(|_| {
            ProcessingError::InvalidFormat(format!("Invalid station number: '{}'", raw_site))
        })?;

        let name = row.get("Name").unwrap_or("").trim();
        if name.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Station {} has no name",
                site
            )));
        }

        let mut parsed = Self::new(site, name.to_string());
        parsed.lat = parse_opt(row, "Lat", |v| {
            v.parse::<f64>()
                .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid latitude: '{}'", v)))
        })?;
        parsed.lon = parse_opt(row, "Lon", |v| {
            v.parse::<f64>()
                .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid longitude: '{}'", v)))
        })?;
        parsed.start = parse_opt(row, "Start", parse_partial_date)?;
        parsed.end = parse_opt(row, "End", parse_partial_date)?;
        parsed.years = parse_opt(row, "Years", |v| {
            v.parse::<f64>()
                .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid years: '{}'", v)))
        })?;
        parsed.percent = parse_opt(row, "Percent", |v| {
            v.parse::<i64>()
                .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid percent: '{}'", v)))
        })?;
        parsed.aws = parse_opt(row, "AWS", |v| Ok(parse_aws_flag(v)))?;

        Ok(parsed)
    }

    /// Sink value for one canonical column.
    pub fn value_for(&self, column: &str) -> Value {
        match column {
            "Site" => Value::Integer(self.site as i64),
            "Name" => Value::Text(self.name.clone()),
            "Lat" => self.lat.map(Value::Real).unwrap_or(Value::Null),
            "Lon" => self.lon.map(Value::Real).unwrap_or(Value::Null),
            "Start" => self.start.map(Value::Date).unwrap_or(Value::Null),
            "End" => self.end.map(Value::Date).unwrap_or(Value::Null),
            "Years" => self.years.map(Value::Real).unwrap_or(Value::Null),
            "Percent" => self.percent.map(Value::Integer).unwrap_or(Value::Null),
            "AWS" => self.aws.map(Value::Bool).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

fn parse_opt<T>(
    row: &Row,
    column: &str,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<Option<T>> {
    match row.get(column) {
        Some(raw) if !raw.trim().is_empty() => parse(raw.trim()).map(Some),
        _ => Ok(None),
    }
}

/// Parse the AWS (automatic weather station) column.
pub fn parse_aws_flag(v: &str) -> bool {
    matches!(v.to_lowercase().as_str(), "yes" | "true" | "t" | "1")
}
