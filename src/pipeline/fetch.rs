//! Remote fetcher: download an image URL to a local path.
//!
//! The timeout is an *inactivity* bound: the request fails if the server
//! takes longer than the limit to answer, or if any gap between two body
//! chunks exceeds it. A slow but steady download of a large image is fine;
//! a host that stops talking is not.

use crate::error::PasteError;
use crate::pipeline::target::prepare_dir_for_file;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Build the HTTP client shared by all downloads of one paste.
pub fn build_client() -> Result<reqwest::Client, PasteError> {
    reqwest::Client::builder()
        .user_agent(concat!("paste2md/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PasteError::Internal(format!("HTTP client: {e}")))
}

/// Prefix `http://` to inputs without a scheme.
pub fn normalise_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("http://{rest}")
    } else {
        format!("http://{url}")
    }
}

/// File extension for a `Content-Type` value: `image/png` → `png`,
/// `image/svg+xml; charset=utf-8` → `svg`.
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let subtype = content_type.split(';').next()?.split('/').nth(1)?;
    let subtype = subtype.split('+').next()?.trim().to_ascii_lowercase();
    if subtype.is_empty() {
        None
    } else {
        Some(subtype)
    }
}

/// Download `url` to `dest` and return the path actually written.
///
/// When `dest` has no extension, one is derived from the response's
/// `Content-Type` and appended, unless a file with that name already exists. The destination folder is created first;
/// failing to create it is reported as [`PasteError::DownloadFailed`].
///
/// # Errors
/// - [`PasteError::DownloadTimeout`] — no response or no body bytes within `timeout`
/// - [`PasteError::DownloadFailed`] — non-200 status, unwritable destination
/// - [`PasteError::NetworkError`] — connection or protocol failure
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<PathBuf, PasteError> {
    let url = normalise_url(url);
    let secs = timeout.as_secs().max(1);
    info!("Downloading image from: {}", url);

    let timed_out = || PasteError::DownloadTimeout {
        url: url.clone(),
        secs,
    };
    let network = |e: reqwest::Error| PasteError::NetworkError {
        url: url.clone(),
        reason: e.to_string(),
    };

    let mut response = tokio::time::timeout(timeout, client.get(&url).send())
        .await
        .map_err(|_| timed_out())?
        .map_err(network)?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(PasteError::DownloadFailed {
            url: url.clone(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let target = match dest.extension() {
        Some(_) => dest.to_path_buf(),
        None => {
            let ext = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .and_then(extension_for_content_type);
            let with_ext = ext.map(|ext| {
                let mut name = dest.as_os_str().to_os_string();
                name.push(".");
                name.push(ext);
                PathBuf::from(name)
            });
            match with_ext {
                // Never clobber another image that already owns that name.
                Some(path) if !path.exists() => path,
                _ => dest.to_path_buf(),
            }
        }
    };

    prepare_dir_for_file(&target).map_err(|e| PasteError::DownloadFailed {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    let write_failed = |e: std::io::Error| PasteError::DownloadFailed {
        url: url.clone(),
        reason: format!("writing '{}': {}", target.display(), e),
    };
    let mut file = tokio::fs::File::create(&target).await.map_err(write_failed)?;

    let mut written = 0usize;
    let body: Result<(), PasteError> = async {
        loop {
            let chunk = tokio::time::timeout(timeout, response.chunk())
                .await
                .map_err(|_| timed_out())?
                .map_err(network)?;
            match chunk {
                Some(bytes) => {
                    file.write_all(&bytes).await.map_err(write_failed)?;
                    written += bytes.len();
                }
                None => break,
            }
        }
        file.flush().await.map_err(write_failed)
    }
    .await;

    if let Err(e) = body {
        warn!("Download of {} aborted: {}", url, e);
        drop(file);
        let _ = tokio::fs::remove_file(&target).await;
        return Err(e);
    }

    debug!("Saved {} bytes to {}", written, target.display());
    Ok(target)
}
