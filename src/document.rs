//! The document being edited: read-only input to path resolution.
//!
//! Every operation receives the document explicitly. Nothing in the library
//! remembers a "current" document between calls, so two pastes into two
//! different documents can be in flight at once without observing each
//! other's paths.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Language id of Markdown documents.
pub const MARKDOWN_LANGUAGE: &str = "markdown";

/// Identifies the edit target: its file (if saved) and its content language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Absolute path of the backing file. `None` for an unsaved buffer.
    pub path: Option<PathBuf>,
    /// Content language id, e.g. `"markdown"`, `"plaintext"`.
    pub language_id: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, language_id: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            language_id: language_id.into(),
        }
    }

    /// An unsaved buffer. Image pastes into it are rejected.
    pub fn untitled(language_id: impl Into<String>) -> Self {
        Self {
            path: None,
            language_id: language_id.into(),
        }
    }

    /// Build a document from its path, inferring the language from the
    /// extension (`.md`, `.markdown`, `.mdx` → markdown).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let language_id = language_for(&path);
        Self {
            path: Some(path),
            language_id,
        }
    }

    pub fn is_markdown(&self) -> bool {
        self.language_id == MARKDOWN_LANGUAGE
    }

    /// Directory containing the document.
    pub fn dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }
}

fn language_for(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("md") | Some("markdown") | Some("mdx") | Some("mdown") => MARKDOWN_LANGUAGE.into(),
        Some("html") | Some("htm") => "html".into(),
        Some("txt") | None => "plaintext".into(),
        Some(other) => other.to_string(),
    }
}
