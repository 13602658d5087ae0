/// Base URL for all Bureau of Meteorology requests.
pub const BOM_BASE_URL: &str = "http://www.bom.gov.au";

/// Fixed-width station directory for one state, daily rainfall element (136).
pub const STATION_LIST_PATH_PREFIX: &str = "/climate/data/lists_by_element/alpha";
pub const STATION_LIST_PATH_SUFFIX: &str = "_136.txt";

/// Per-station weather data page carrying the archive link.
pub const DAILY_RAINFALL_PAGE_PATH: &str = "/jsp/ncc/cdio/weatherData/av?p_nccObsCode=136&p_display_type=dailyDataFile&p_startYear=&p_c=&p_stn_num=";

/// Title of the anchor that points at the daily rainfall ZIP archive.
pub const RAINFALL_LINK_TITLE: &str = "Data file for daily rainfall data for all years";

/// Destination table names
pub const SITE_TABLE: &str = "Site";
pub const RAINFALL_TABLE: &str = "Rainfall";

/// Comment marker for provenance blocks in delimited-text destinations.
pub const COMMENT_MARKER: char = '#';

/// Width of the provenance banner lines.
pub const PROVENANCE_BANNER_WIDTH: usize = 80;
