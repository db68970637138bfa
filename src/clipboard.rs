//! Plain-text clipboard accessor for platforms without helper scripts.
//!
//! When the format-listing script does not exist for the host platform, a
//! paste degrades to reading plain text directly. The accessor is a trait so
//! an editor integration can hand in its own clipboard and tests can hand in
//! a fixed string.

use crate::error::PasteError;
use tracing::debug;

/// Read-only access to the clipboard's text.
pub trait TextClipboard: Send + Sync {
    fn read_text(&self) -> Result<String, PasteError>;
}

/// The operating system clipboard, via `arboard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl TextClipboard for SystemClipboard {
    fn read_text(&self) -> Result<String, PasteError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| PasteError::ClipboardUnavailable(e.to_string()))?;
        match clipboard.get_text() {
            Ok(text) => {
                debug!("Read {} bytes of text from system clipboard", text.len());
                Ok(text)
            }
            // An empty or non-text clipboard is not a failure: nothing to paste.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(PasteError::ClipboardUnavailable(e.to_string())),
        }
    }
}

/// A clipboard holding a fixed string.
#[derive(Debug, Clone, Default)]
pub struct StaticClipboard(pub String);

impl TextClipboard for StaticClipboard {
    fn read_text(&self) -> Result<String, PasteError> {
        Ok(self.0.clone())
    }
}
