use std::fs::File;
use std::path::PathBuf;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{parse_csv, DatasetError, Frame};

/// Default OpenML API host.
pub const OPENML_URL: &str = "https://www.openml.org";

/// Somewhere a full dataset can be fetched from.
///
/// Implementations fetch afresh on every call; callers that want caching
/// must add it themselves. HTTP sources block, so call them off the async
/// executor (the scheduler runs jobs on the blocking pool).
pub trait DatasetSource: Send + Sync {
    fn fetch(&self) -> Result<Frame, DatasetError>;

    /// Short human-readable label for logs.
    fn describe(&self) -> String;
}

/// A CSV file on the local file system.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    pub path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for CsvFileSource {
    fn fetch(&self) -> Result<Frame, DatasetError> {
        let file = File::open(&self.path)?;
        parse_csv(file)
    }

    fn describe(&self) -> String {
        format!("csv file {}", self.path.display())
    }
}

/// A CSV document served over HTTP.
#[derive(Debug, Clone)]
pub struct CsvUrlSource {
    pub url: String,
}

impl CsvUrlSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl DatasetSource for CsvUrlSource {
    fn fetch(&self) -> Result<Frame, DatasetError> {
        let body = Client::new().get(&self.url).send()?.error_for_status()?.bytes()?;
        parse_csv(body.as_ref())
    }

    fn describe(&self) -> String {
        format!("csv url {}", self.url)
    }
}

/// A named, versioned dataset published on OpenML.
///
/// The dataset's file id is looked up through the JSON listing API, then
/// the data is downloaded in CSV form.
#[derive(Debug, Clone)]
pub struct OpenMlSource {
    pub name: String,
    pub version: u32,
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    dataset: Vec<ListedDataset>,
}

#[derive(Debug, Deserialize)]
struct ListedDataset {
    did: u64,
    file_id: u64,
}

impl OpenMlSource {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self::with_base_url(name, version, OPENML_URL)
    }

    pub fn with_base_url(
        name: impl Into<String>,
        version: u32,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve_file_id(&self, client: &Client) -> Result<u64, DatasetError> {
        let url = format!(
            "{}/api/v1/json/data/list/data_name/{}/data_version/{}",
            self.base_url, self.name, self.version
        );
        let response = client.get(&url).send()?;
        if response.status() == reqwest::StatusCode::PRECONDITION_FAILED
            || response.status() == reqwest::StatusCode::NOT_FOUND
        {
            // OpenML answers 412 when the listing is empty.
            return Err(DatasetError::NotFound(self.describe()));
        }
        let listing: ListingResponse = response.error_for_status()?.json()?;
        let entry = listing
            .data
            .dataset
            .into_iter()
            .next()
            .ok_or_else(|| DatasetError::NotFound(self.describe()))?;
        tracing::debug!(did = entry.did, file_id = entry.file_id, "resolved OpenML dataset");
        Ok(entry.file_id)
    }
}

impl DatasetSource for OpenMlSource {
    fn fetch(&self) -> Result<Frame, DatasetError> {
        let client = Client::new();
        let file_id = self.resolve_file_id(&client)?;
        let url = format!("{}/data/get_csv/{}", self.base_url, file_id);
        let body = client.get(&url).send()?.error_for_status()?.bytes()?;
        parse_csv(body.as_ref())
    }

    fn describe(&self) -> String {
        format!("openml {} v{}", self.name, self.version)
    }
}
