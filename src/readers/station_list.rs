use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{ProcessingError, Result};
use crate::readers::{Row, TabularSource};
use crate::utils::dates::parse_produced_date;

/// One column of the fixed-width listing: heading token plus the byte range
/// its values occupy. The last column runs to the end of each line.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpan {
    pub heading: String,
    pub start: usize,
    pub end: Option<usize>,
}

impl ColumnSpan {
    fn slice<'a>(&self, line: &'a str) -> &'a str {
        let len = line.len();
        let start = self.start.min(len);
        let end = self.end.unwrap_or(len).min(len);
        line.get(start..end).map(str::trim).unwrap_or("")
    }
}

/// Derive the column-boundary table from the header line: each whitespace
/// separated token starts a column, which extends to one character before the
/// next token.
pub fn spans_from_header(header: &str) -> Vec<ColumnSpan> {
    let mut spans: Vec<ColumnSpan> = Vec::new();
    let bytes = header.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if let Some(prev) = spans.last_mut() {
            prev.end = Some(start - 1);
        }
        spans.push(ColumnSpan {
            heading: header[start..i].to_string(),
            start,
            end: None,
        });
    }

    spans
}

/// Map a listing heading token to its canonical output column name.
/// An unrecognized token means the upstream format changed: fatal.
pub fn canonical_name(heading: &str) -> Result<&'static str> {
    match heading {
        "Site" => Ok("Site"),
        "Name" => Ok("Name"),
        "Lat" => Ok("Lat"),
        "Lon" => Ok("Lon"),
        "Start" => Ok("Start"),
        "End" => Ok("End"),
        "Years" => Ok("Years"),
        "%" => Ok("Percent"),
        "AWS" => Ok("AWS"),
        other => Err(ProcessingError::InvalidFormat(format!(
            "Unrecognized station directory column: '{}'",
            other
        ))),
    }
}

/// SQL column type for a canonical site column.
pub fn sql_type(canonical: &str) -> &'static str {
    match canonical {
        "Site" | "Percent" | "AWS" => "INTEGER",
        "Lat" | "Lon" | "Years" => "REAL",
        "Start" | "End" => "DATE",
        _ => "TEXT",
    }
}

/// A parsed station directory listing, iterable as a tabular source whose
/// columns carry canonical names.
pub struct StationList {
    pub produced: Option<NaiveDate>,
    columns: Arc<Vec<String>>,
    rows: std::vec::IntoIter<Vec<String>>,
}

impl StationList {
    /// Parse the fixed-width text: a `Produced: <date>` banner line, a blank
    /// line, the column-header line, a separator line, then one row per
    /// station until the first empty line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let banner = lines
            .next()
            .ok_or_else(|| ProcessingError::InvalidFormat("Empty station directory".to_string()))?;
        let produced = parse_produced_date(banner);

        lines.next(); // blank line under the banner
        let header = lines.next().ok_or_else(|| {
            ProcessingError::InvalidFormat("Station directory has no header line".to_string())
        })?;
        lines.next(); // separator line under the header

        let spans = spans_from_header(header);
        if spans.is_empty() {
            return Err(ProcessingError::InvalidFormat(
                "Station directory header has no columns".to_string(),
            ));
        }

        let mut columns = Vec::with_capacity(spans.len());
        for span in &spans {
            columns.push(canonical_name(&span.heading)?.to_string());
        }

        let mut rows = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            rows.push(spans.iter().map(|s| s.slice(line).to_string()).collect());
        }

        Ok(Self {
            produced,
            columns: Arc::new(columns),
            rows: rows.into_iter(),
        })
    }
}

impl TabularSource for StationList {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Result<Row>> {
        self.rows
            .next()
            .map(|values| Ok(Row::new(self.columns.clone(), values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = "\
Bureau of Meteorology product IDCJMC0014.                Produced: 14 Aug 2019

Site    Name                                Lat       Lon       Start    End      Years  %    AWS
------- ----------------------------------- --------- --------- -------- -------- ------ ---- ---
009519  WALPOLE                              -34.9776  116.7310 Jan 1930 Aug 2019   89.6   97 N
009021  PERTH AIRPORT                        -31.9275  115.9764 Jan 1944 Aug 2019   75.6  100 Y

";

    #[test]
    fn test_spans_from_header() {
        let spans = spans_from_header("Site    Name      Lat");
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].heading, "Site");
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, Some(7));
        assert_eq!(spans[1].end, Some(17));
        assert_eq!(spans[2].end, None);
    }

    #[test]
    fn test_parse_listing() -> Result<()> {
        let mut list = StationList::parse(LISTING)?;

        assert_eq!(
            list.produced,
            Some(NaiveDate::from_ymd_opt(2019, 8, 14).unwrap())
        );
        assert_eq!(
            list.columns(),
            &["Site", "Name", "Lat", "Lon", "Start", "End", "Years", "Percent", "AWS"]
        );

        let row = list.next_row().unwrap()?;
        assert_eq!(row.get("Site"), Some("009519"));
        assert_eq!(row.get("Name"), Some("WALPOLE"));
        assert_eq!(row.get("Lat"), Some("-34.9776"));
        assert_eq!(row.get("AWS"), Some("N"));

        let row = list.next_row().unwrap()?;
        assert_eq!(row.get("Name"), Some("PERTH AIRPORT"));
        assert_eq!(row.get("Percent"), Some("100"));

        assert!(list.next_row().is_none());
        Ok(())
    }

    #[test]
    fn test_unknown_heading_is_fatal() {
        let listing = "banner Produced: 14 Aug 2019\n\nSite  Bogus\n----- -----\n1     x\n";
        assert!(StationList::parse(listing).is_err());
    }

    #[test]
    fn test_short_lines_yield_empty_fields() {
        let listing = "banner Produced: 14 Aug 2019\n\nSite    Name    AWS\n---- ---- ---\n0001\n";
        let mut list = StationList::parse(listing).unwrap();
        let row = list.next_row().unwrap().unwrap();
        assert_eq!(row.get("Site"), Some("0001"));
        assert_eq!(row.get("Name"), Some(""));
        assert_eq!(row.get("AWS"), Some(""));
    }
}
