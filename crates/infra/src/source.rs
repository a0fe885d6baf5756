//! Feed retrieval: remote URL first, local file as fallback.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ImportSettings;
use crate::importer::ImportError;

/// Where a feed payload came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOrigin {
    Url(String),
    File(PathBuf),
}

impl std::fmt::Display for FeedOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedOrigin::Url(url) => write!(f, "url:{url}"),
            FeedOrigin::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedPayload {
    pub origin: FeedOrigin,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FeedSource {
    url: Option<String>,
    fallback_path: PathBuf,
    timeout: Duration,
    client: reqwest::Client,
}

impl FeedSource {
    pub fn new(url: Option<String>, fallback_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            url: url.filter(|u| !u.trim().is_empty()),
            fallback_path: fallback_path.into(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &ImportSettings) -> Self {
        Self::new(
            settings.source_url.clone(),
            settings.fallback_path.clone(),
            settings.timeout,
        )
    }

    /// Same source, different URL (the CLI `--url` override).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Fetch the feed bytes.
    ///
    /// URL failures (transport errors, non-success status) are logged and the
    /// fallback file is tried instead.
    pub async fn fetch(&self) -> Result<FeedPayload, ImportError> {
        if let Some(url) = &self.url {
            match self.fetch_url(url).await {
                Ok(bytes) => {
                    info!(url = %url, bytes = bytes.len(), "fetched feed from url");
                    return Ok(FeedPayload {
                        origin: FeedOrigin::Url(url.clone()),
                        bytes,
                    });
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "failed to fetch feed from url, using local fallback");
                }
            }
        }

        match tokio::fs::try_exists(&self.fallback_path).await {
            Ok(true) => {}
            Ok(false) => return Err(ImportError::NoSource),
            Err(e) => {
                warn!(path = %self.fallback_path.display(), error = %e, "cannot stat fallback file");
                return Err(ImportError::NoSource);
            }
        }

        let bytes = tokio::fs::read(&self.fallback_path)
            .await
            .map_err(|e| ImportError::Read {
                path: self.fallback_path.clone(),
                message: e.to_string(),
            })?;
        info!(path = %self.fallback_path.display(), bytes = bytes.len(), "loaded feed from local file");

        Ok(FeedPayload {
            origin: FeedOrigin::File(self.fallback_path.clone()),
            bytes,
        })
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
