//! Results returned by the paste entry points.

use crate::error::ImageError;
use crate::pipeline::classify::ClipboardKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything one paste produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasteOutput {
    /// The string to insert at the cursor. Empty when nothing was pasted.
    pub markdown: String,

    /// What the clipboard held.
    pub kind: ClipboardKind,

    /// One entry per remote image reference that was processed, in order of
    /// appearance.
    pub images: Vec<ImageResult>,

    pub stats: PasteStats,
}

impl PasteOutput {
    /// Output for an empty or unrecognised clipboard.
    pub fn empty(kind: ClipboardKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Whether there is anything to insert.
    pub fn is_empty(&self) -> bool {
        self.markdown.is_empty()
    }
}

/// Outcome for one image reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// The URL as it appeared in the pasted text.
    pub url: String,

    /// Local file the image was saved to. `None` when it failed or was
    /// embedded as base64.
    pub path: Option<PathBuf>,

    /// Set when the image could not be materialised; the original
    /// reference was kept.
    pub error: Option<ImageError>,
}

impl ImageResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Counters for one paste.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasteStats {
    /// Remote references replaced by a local one.
    pub images_rewritten: usize,
    /// Remote references left untouched because they failed.
    pub images_failed: usize,
    /// Wall-clock time of the whole paste.
    pub duration_ms: u64,
}
