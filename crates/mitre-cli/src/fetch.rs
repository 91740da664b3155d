//! Schema and data acquisition
//!
//! `http://` and `https://` locations are downloaded, anything else is read
//! from disk. A location ending in `.zip` is unpacked and its first entry
//! used.

use anyhow::{Context, Result, bail};
use std::io::{Cursor, Read};
use tracing::{debug, info};
use zip::ZipArchive;

#[derive(Default)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes behind a location, unpacked if it names a zip archive
    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let bytes = if is_remote(location) {
            self.download(location).await?
        } else {
            tokio::fs::read(location)
                .await
                .with_context(|| format!("failed to read '{location}'"))?
        };
        debug!(location, bytes = bytes.len(), "fetched");

        if location.to_ascii_lowercase().ends_with(".zip") {
            first_entry(&bytes).with_context(|| format!("failed to unpack '{location}'"))
        } else {
            Ok(bytes)
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        info!(url, "downloading");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch '{url}'"))?;
        if !response.status().is_success() {
            bail!("failed to fetch '{url}': HTTP {}", response.status());
        }
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read response from '{url}'"))?;
        Ok(body.to_vec())
    }
}

pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Contents of the first entry of a zip archive
pub fn first_entry(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    if archive.is_empty() {
        bail!("zip archive has no entries");
    }
    let mut entry = archive.by_index(0)?;
    debug!(entry = entry.name(), size = entry.size(), "unpacking");
    let mut contents = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry.read_to_end(&mut contents)?;
    Ok(contents)
}
