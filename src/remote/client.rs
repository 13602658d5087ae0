use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use crate::error::{ProcessingError, Result};
use crate::models::site::State;
use crate::remote::{archive, rainfall_page};
use crate::utils::constants::{
    BOM_BASE_URL, DAILY_RAINFALL_PAGE_PATH, STATION_LIST_PATH_PREFIX, STATION_LIST_PATH_SUFFIX,
};

/// Blocking HTTP collaborator for the BOM website. One fetch at a time; no
/// retry policy — a failed request aborts the run.
pub struct RemoteClient {
    client: Client,
    base_url: Url,
}

impl RemoteClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BOM_BASE_URL)
    }

    /// Point the client somewhere else (tests use a local mock server).
    pub fn with_base_url(base: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(base)?,
        })
    }

    /// Fetch the fixed-width station directory for one state.
    pub fn fetch_station_list(&self, state: State) -> Result<String> {
        let path = format!(
            "{}{}{}",
            STATION_LIST_PATH_PREFIX,
            state.code(),
            STATION_LIST_PATH_SUFFIX
        );
        self.get_text(&path)
    }

    /// Fetch the daily rainfall observations for one site: weather-data page,
    /// archive link, ZIP download, CSV member. A page without the archive
    /// link is fatal for the whole run.
    pub fn fetch_daily_rainfall_csv(&self, site: u32) -> Result<String> {
        let page = self.get_text(&format!("{}{}", DAILY_RAINFALL_PAGE_PATH, site))?;

        let link = rainfall_page::find_archive_link(&page)
            .ok_or(ProcessingError::StationDataNotFound { site })?;
        debug!("Archive link for site {}: {}", site, link);

        let url = self.base_url.join(&link)?;
        let bytes = self.client.get(url).send()?.error_for_status()?.bytes()?;

        let (member, csv) = archive::extract_csv(&bytes)?;
        debug!("Extracted {} ({} bytes)", member, csv.len());

        Ok(csv)
    }

    fn get_text(&self, path: &str) -> Result<String> {
        let url = self.base_url.join(path)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}
