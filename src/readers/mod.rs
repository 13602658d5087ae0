pub mod station_list;
pub mod tabular;

pub use station_list::{spans_from_header, ColumnSpan, StationList};
pub use tabular::{table_exists, CsvSource, Row, TableSource, TabularSource};
