//! Clipboard classification: format-name list → [`ClipboardKind`].
//!
//! Each platform reports clipboard representations under its own names
//! (`text/html` on X11, `HTML Format` on Windows). Names are first parsed
//! into [`ClipboardFormat`], then a per-platform total function picks the
//! kind. Adding a platform means adding one mapping function, not more
//! string comparisons at call sites.

use crate::error::PasteError;
use crate::pipeline::runner::{Platform, Script, ScriptRunner};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Sentinel printed by the Linux listing script when `xclip` is missing.
pub const NO_XCLIP: &str = "no xclip";

/// What the clipboard currently holds, as far as pasting is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardKind {
    #[default]
    Unknown,
    Text,
    Html,
    Image,
}

impl fmt::Display for ClipboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClipboardKind::Unknown => "unknown",
            ClipboardKind::Text => "text",
            ClipboardKind::Html => "html",
            ClipboardKind::Image => "image",
        };
        f.write_str(s)
    }
}

/// A clipboard format name recognised on some platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardFormat {
    /// X11 `image/png`.
    MimePng,
    /// X11 `text/html`.
    MimeHtml,
    /// Windows `PNG`.
    WinPng,
    /// Windows `Bitmap`.
    WinBitmap,
    /// Windows `HTML Format` (CF_HTML).
    WinHtml,
    /// Windows `UnicodeText`.
    WinUnicodeText,
    /// Windows `Text`.
    WinText,
    /// Anything else, kept verbatim.
    Other(String),
}

impl ClipboardFormat {
    /// Parse a reported format name for `platform`.
    pub fn parse(platform: Platform, name: &str) -> Self {
        match (platform, name) {
            (Platform::Linux, "image/png") => ClipboardFormat::MimePng,
            (Platform::Linux, "text/html") => ClipboardFormat::MimeHtml,
            (Platform::Windows, "PNG") => ClipboardFormat::WinPng,
            (Platform::Windows, "Bitmap") => ClipboardFormat::WinBitmap,
            (Platform::Windows, "HTML Format") => ClipboardFormat::WinHtml,
            (Platform::Windows, "UnicodeText") => ClipboardFormat::WinUnicodeText,
            (Platform::Windows, "Text") => ClipboardFormat::WinText,
            (_, other) => ClipboardFormat::Other(other.to_string()),
        }
    }
}

/// Classify a list of format names reported on `platform`.
///
/// Pure: identical input gives identical output. An empty list is
/// [`ClipboardKind::Unknown`].
pub fn classify_formats<S: AsRef<str>>(platform: Platform, names: &[S]) -> ClipboardKind {
    let formats: Vec<ClipboardFormat> = names
        .iter()
        .map(|n| ClipboardFormat::parse(platform, n.as_ref()))
        .collect();
    match platform {
        Platform::Linux => classify_linux(&formats),
        Platform::Windows => classify_windows(&formats),
        Platform::MacOs | Platform::Other => ClipboardKind::Unknown,
    }
}

/// Image or HTML stop the scan; any other format means text but a later
/// image/HTML entry still wins.
fn classify_linux(formats: &[ClipboardFormat]) -> ClipboardKind {
    let mut kind = ClipboardKind::Unknown;
    for format in formats {
        match format {
            ClipboardFormat::MimePng => return ClipboardKind::Image,
            ClipboardFormat::MimeHtml => return ClipboardKind::Html,
            _ => kind = ClipboardKind::Text,
        }
    }
    kind
}

/// First recognised entry decides; unknown names are skipped.
fn classify_windows(formats: &[ClipboardFormat]) -> ClipboardKind {
    for format in formats {
        match format {
            ClipboardFormat::WinPng | ClipboardFormat::WinBitmap => return ClipboardKind::Image,
            ClipboardFormat::WinHtml => return ClipboardKind::Html,
            ClipboardFormat::WinUnicodeText | ClipboardFormat::WinText => {
                return ClipboardKind::Text
            }
            _ => {}
        }
    }
    ClipboardKind::Unknown
}

/// Split script output into format names, dropping blank lines.
pub fn split_format_list(stdout: &str) -> Vec<&str> {
    stdout
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Ask the platform what the clipboard holds.
///
/// # Errors
/// - [`PasteError::UnsupportedPlatform`] when no listing script exists;
///   callers fall back to a plain-text read.
/// - [`PasteError::MissingSystemUtility`] when the script reports that
///   `xclip` is not installed.
pub async fn classify(runner: &ScriptRunner) -> Result<ClipboardKind, PasteError> {
    let stdout = runner.run(Script::ListFormats, &[]).await?;
    if stdout == NO_XCLIP {
        return Err(PasteError::MissingSystemUtility {
            utility: "xclip".into(),
        });
    }
    let names = split_format_list(&stdout);
    debug!("Clipboard formats: {:?}", names);
    let kind = classify_formats(runner.platform(), &names);
    info!("Clipboard classified as {}", kind);
    Ok(kind)
}
