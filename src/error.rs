//! Error types for the paste2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PasteError`] — **Fatal**: the paste cannot produce any output at all
//!   (no helper script for this platform, clipboard utility missing, the
//!   document was never saved, the configured folder is invalid). Returned as
//!   `Err(PasteError)` from the top-level `paste*` functions.
//!
//! * [`ImageError`] — **Non-fatal**: one image reference inside pasted text
//!   could not be materialised (download timed out, host unreachable) but the
//!   rest of the text is fine. Stored inside [`crate::output::ImageResult`]
//!   and the original reference is left in the Markdown untouched.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paste2md library.
///
/// Failures local to one image reference use [`ImageError`] and are stored in
/// [`crate::output::ImageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PasteError {
    // ── Platform / helper script errors ───────────────────────────────────
    /// No helper script is registered for this platform.
    #[error("No clipboard helper script '{script}' is available on {platform}")]
    UnsupportedPlatform { platform: String, script: String },

    /// A system utility the helper scripts depend on is not installed.
    #[error("You need to install the '{utility}' command first.")]
    MissingSystemUtility { utility: String },

    /// The shell interpreter could not be started.
    #[error("Failed to run helper script '{script}': {source}")]
    ScriptSpawnFailed {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper script exited with a non-zero status.
    #[error("Helper script '{script}' failed (exit code {code:?}): {stderr}")]
    ScriptFailed {
        script: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The helper script did not finish within the configured bound.
    #[error("Helper script '{script}' did not finish within {secs}s and was killed")]
    ScriptTimeout { script: String, secs: u64 },

    // ── Document / path errors ────────────────────────────────────────────
    /// The document has no backing file, so no relative link can be computed.
    #[error("Before pasting an image, you need to save the current edited file first.")]
    UntitledDocument,

    /// The configured image folder (after variable expansion) is unusable.
    #[error("The specified path is invalid: \"{path}\"")]
    InvalidConfiguredPath { path: String },

    /// The destination directory could not be created.
    #[error("Make folder failed: '{path}': {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Clipboard errors ──────────────────────────────────────────────────
    /// The clipboard was classified as an image but the save script found none.
    #[error("There is not an image in the clipboard.")]
    NoImageInClipboard,

    /// The degraded plain-text clipboard accessor failed.
    #[error("Clipboard is not available: {0}")]
    ClipboardUnavailable(String),

    // ── Download errors ───────────────────────────────────────────────────
    /// The server answered, but not with 200, or the body could not be stored.
    #[error("Downloading {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// No bytes arrived within the inactivity window.
    #[error("Request Timeout({secs}s): Download {url} failed!")]
    DownloadTimeout { url: String, secs: u64 },

    /// The request never reached a server.
    #[error("Downloading {url} failed! Please make sure URL is valid. ({reason})")]
    NetworkError { url: String, reason: String },

    // ── File errors ───────────────────────────────────────────────────────
    /// Copying an imported file into the target location failed.
    #[error("Failed to import '{path}': {source}")]
    ImportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The materialised image could not be read back for rendering.
    #[error("Failed to read image '{path}' for rendering: {source}")]
    RenderFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A user rewrite rule does not compile.
    #[error("Invalid rewrite rule /{regex}/: {detail}")]
    InvalidRule { regex: String, detail: String },

    /// The settings file could not be read or parsed.
    #[error("Failed to load settings from '{path}': {detail}")]
    SettingsLoadFailed { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PasteError {
    /// Whether this error belongs to a single image reference rather than
    /// the whole operation.
    ///
    /// Inside a text transform, image-local errors leave that one reference
    /// untouched while its siblings proceed. Anything else (an untitled
    /// document, an invalid folder template) would fail the same way for
    /// every reference and aborts the paste.
    pub fn is_image_local(&self) -> bool {
        matches!(
            self,
            PasteError::DirectoryCreationFailed { .. }
                | PasteError::DownloadFailed { .. }
                | PasteError::DownloadTimeout { .. }
                | PasteError::NetworkError { .. }
                | PasteError::RenderFailed { .. }
        )
    }
}

/// A non-fatal error for a single image reference.
///
/// Stored alongside [`crate::output::ImageResult`] when an image fails.
/// The surrounding text transform continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// Download failed (non-200, transport error, unwritable destination).
    #[error("{url}: download failed: {detail}")]
    DownloadFailed { url: String, detail: String },

    /// Download stalled past the inactivity timeout.
    #[error("{url}: download timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// No target path could be resolved for the image.
    #[error("{url}: could not resolve a target path: {detail}")]
    Unresolved { url: String, detail: String },
}

impl ImageError {
    /// Classify a fatal error raised while materialising one image.
    pub fn from_paste_error(url: &str, err: &PasteError) -> Self {
        match err {
            PasteError::DownloadTimeout { secs, .. } => ImageError::Timeout {
                url: url.to_string(),
                secs: *secs,
            },
            PasteError::DownloadFailed { .. } | PasteError::NetworkError { .. } => {
                ImageError::DownloadFailed {
                    url: url.to_string(),
                    detail: err.to_string(),
                }
            }
            other => ImageError::Unresolved {
                url: url.to_string(),
                detail: other.to_string(),
            },
        }
    }
}
