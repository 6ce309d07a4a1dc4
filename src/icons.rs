use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;

use crate::metrics::Metrics;

const DEFAULT_EXTENSION: &str = ".jpg";

#[derive(Debug, thiserror::Error)]
pub enum IconError {
    #[error("failed to build icon http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to write icon to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Maps a `Content-Type` value to the file extension used for the cached
/// icon. Unknown or missing types fall back to `.jpg`.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    match mime {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/svg+xml" => ".svg",
        "image/webp" => ".webp",
        _ => DEFAULT_EXTENSION,
    }
}

/// Ids become file names inside the cache directory, so anything that could
/// point outside of it is refused.
fn is_safe_file_stem(issuetype_id: &str) -> bool {
    !issuetype_id.is_empty()
        && issuetype_id != "."
        && issuetype_id != ".."
        && !issuetype_id.contains(['/', '\\', '\0'])
}

#[derive(Debug, Clone)]
pub struct IconFetcher {
    http: Client,
    dir: PathBuf,
    metrics: Arc<Metrics>,
}

impl IconFetcher {
    pub fn new(
        dir: &Path,
        timeout: Option<Duration>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, IconError> {
        // a redirect counts as "not available", same as any other non-200
        let mut builder = Client::builder().redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            dir: dir.to_path_buf(),
            metrics,
        })
    }

    /// Downloads the icon for `issuetype_id` into the cache directory.
    ///
    /// `Ok(None)` means the icon could not be retrieved (non-200 status or a
    /// transport failure); the caller renders the issue without an icon.
    /// Only filesystem failures are returned as errors.
    pub fn fetch(&self, issuetype_id: &str, url: &str) -> Result<Option<PathBuf>, IconError> {
        if !is_safe_file_stem(issuetype_id) {
            tracing::warn!(issuetype_id, "refusing icon for unusable issue type id");
            self.metrics.inc_icon_failure();
            return Ok(None);
        }

        let response = match self.http.get(url).send() {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(issuetype_id, %url, error = %err, "icon request failed");
                self.metrics.inc_icon_failure();
                return Ok(None);
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(issuetype_id, status = %response.status(), "icon not available");
            self.metrics.inc_icon_failure();
            return Ok(None);
        }

        let extension = extension_for(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        let bytes = match response.bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(issuetype_id, error = %err, "icon body could not be read");
                self.metrics.inc_icon_failure();
                return Ok(None);
            }
        };

        let path = self.dir.join(format!("{issuetype_id}{extension}"));
        std::fs::write(&path, &bytes).map_err(|source| IconError::Io {
            path: path.clone(),
            source,
        })?;

        self.metrics.inc_icon_download();
        tracing::debug!(issuetype_id, path = %path.display(), "icon cached");
        Ok(Some(path))
    }
}
