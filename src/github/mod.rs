//! GitHub release fetching and asset download.
//!
//! Release metadata comes from the public API
//! (`GET /repos/{owner}/{repo}/releases/latest`); the matching asset is
//! selected with the catalog's glob pattern and streamed into a caller
//! supplied directory. A `GITHUB_TOKEN` environment variable, when set,
//! is passed as a bearer token to both the API call and the download,
//! which lifts rate limits and enables private repositories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::{Result, UnipakError};
use crate::pattern;

const API_BASE: &str = "https://api.github.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const GITHUB_JSON: &str = "application/vnd.github+json";

/// One downloadable artifact attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// The subset of release metadata the engine consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Thin client over the GitHub releases API.
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
}

impl GithubClient {
    /// Build a client with the default 30 second timeout, reading the
    /// token from `GITHUB_TOKEN` if present.
    pub fn new() -> Self {
        let token = std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("failed to construct HTTP client");
        Self { http, token }
    }

    /// Fetch the latest release of `repo` (`owner/repo`).
    pub async fn latest_release(&self, repo: &str) -> Result<Release> {
        let url = format!("{API_BASE}/repos/{repo}/releases/latest");
        debug!("fetching latest release from {url}");
        let mut request = self.http.get(&url).header(ACCEPT, GITHUB_JSON);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| network("fetch latest release", &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(network(
                "fetch latest release",
                &format!("{repo}: {status} {}", body.trim()),
            ));
        }
        response
            .json::<Release>()
            .await
            .map_err(|e| network("parse release metadata", &e.to_string()))
    }

    /// First asset whose name matches `pattern`, case-insensitively.
    pub fn find_asset<'r>(&self, release: &'r Release, pattern: &str) -> Result<&'r ReleaseAsset> {
        release
            .assets
            .iter()
            .find(|asset| pattern::matches_asset(pattern, &asset.name))
            .ok_or_else(|| UnipakError::AssetNotFound {
                pattern: pattern.to_string(),
                release: release.tag_name.clone(),
            })
    }

    /// Stream `asset` into `dest_dir`, named after the asset.
    pub async fn download_asset(&self, asset: &ReleaseAsset, dest_dir: &Path) -> Result<PathBuf> {
        // Asset names come from the API response; refuse anything that
        // would escape the destination directory.
        let file_name = Path::new(&asset.name)
            .file_name()
            .ok_or_else(|| network("download asset", &format!("unusable asset name {:?}", asset.name)))?;

        let mut request = self.http.get(&asset.browser_download_url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response =
            request.send().await.map_err(|e| network("download asset", &e.to_string()))?;
        if !response.status().is_success() {
            return Err(network(
                "download asset",
                &format!("{}: {}", asset.name, response.status()),
            ));
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(file_name);
        let mut file = tokio::fs::File::create(&dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| network("download asset", &e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        debug!("downloaded {} to {}", asset.name, dest.display());
        Ok(dest)
    }
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new()
    }
}

fn network(operation: &str, detail: &str) -> UnipakError {
    UnipakError::Network { operation: operation.to_string(), detail: detail.to_string() }
}
