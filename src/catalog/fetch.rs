use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use reqwest::{StatusCode, Url, blocking::Client};
use thiserror::Error;

use super::model::{CatalogEntry, base_name};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid catalog url: {0}")]
    InvalidUrl(String),
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog server answered {0}")]
    Status(StatusCode),
    #[error("catalog fetch was interrupted")]
    Interrupted,
}

/// `<base>/songs`
pub fn songs_url(base: &Url) -> Result<Url, FetchError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .push("songs");
    Ok(url)
}

/// `<base>/songs/<basename>`, with the basename percent-encoded as a single
/// path segment.
pub fn track_url(base: &Url, file_path: &str) -> Result<Url, FetchError> {
    let mut url = songs_url(base)?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(base.to_string()))?
        .push(base_name(file_path));
    Ok(url)
}

/// Decode a `/songs` payload. Elements that do not match the entry model
/// are dropped instead of failing the listing.
pub fn parse_entries(values: Vec<serde_json::Value>) -> Vec<CatalogEntry> {
    let total = values.len();
    let entries: Vec<CatalogEntry> = values
        .into_iter()
        .filter_map(|v| match serde_json::from_value::<CatalogEntry>(v) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed catalog entry");
                None
            }
        })
        .collect();
    if entries.len() != total {
        tracing::info!(kept = entries.len(), total, "dropped malformed catalog entries");
    }
    entries
}

/// Blocking HTTP client for the catalog server.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base: Url,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetch and decode the full listing.
    pub fn fetch(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        let url = songs_url(&self.base)?;
        tracing::debug!(%url, "fetching catalog");

        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let values: Vec<serde_json::Value> = response.json()?;
        Ok(parse_entries(values))
    }

    /// Run `fetch` on a helper thread so the event loop keeps drawing.
    pub fn spawn_fetch(&self) -> PendingFetch {
        let (tx, rx) = mpsc::channel();
        let client = self.clone();
        thread::spawn(move || {
            let _ = tx.send(client.fetch());
        });
        PendingFetch::from(rx)
    }
}

/// A catalog fetch running in the background.
pub struct PendingFetch {
    rx: Receiver<Result<Vec<CatalogEntry>, FetchError>>,
}

impl PendingFetch {
    /// Non-blocking check for the result. Returns `None` while still running.
    pub fn try_take(&self) -> Option<Result<Vec<CatalogEntry>, FetchError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FetchError::Interrupted)),
        }
    }
}

impl From<Receiver<Result<Vec<CatalogEntry>, FetchError>>> for PendingFetch {
    fn from(rx: Receiver<Result<Vec<CatalogEntry>, FetchError>>) -> Self {
        Self { rx }
    }
}
