//! Hosting-platform API client for pull request file lists

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors from the pull-request file listing API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API request failed: {0}")]
    Http(String),

    #[error("API returned status {0}")]
    Status(u16),

    #[error("API response was not a file list")]
    Malformed,
}

/// Seam for the pull-request file list lookup, so tests can substitute a
/// canned implementation.
#[async_trait]
pub trait PullRequestFiles: Send + Sync {
    /// List the changed file paths of a pull request
    async fn list_files(&self, repo: &str, number: u64) -> Result<Vec<String>, ApiError>;
}

/// GitHub REST implementation
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Self {
        Self::with_base_url(token, "https://api.github.com")
    }

    /// Point the client at a different API root (tests, GHES)
    pub fn with_base_url(token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }
}

#[async_trait]
impl PullRequestFiles for GithubClient {
    async fn list_files(&self, repo: &str, number: u64) -> Result<Vec<String>, ApiError> {
        let url = format!(
            "{}/repos/{}/pulls/{}/files?per_page=100",
            self.base_url, repo, number
        );
        debug!("fetching pull request file list from {url}");

        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "cfn-pipeline");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;

        // Anything but an array of file objects counts as malformed and
        // sends the caller down the next fallback.
        let entries = body.as_array().ok_or(ApiError::Malformed)?;
        Ok(entries
            .iter()
            .filter_map(|entry| entry.get("filename"))
            .filter_map(|name| name.as_str())
            .map(String::from)
            .collect())
    }
}
