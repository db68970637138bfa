//! Progress-callback trait for per-image paste events.
//!
//! Inject an [`Arc<dyn PasteProgressCallback>`] via
//! [`crate::config::PasteConfigBuilder::progress_callback`] to be told what
//! a paste is doing while it downloads images.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: an editor plugin can
//! forward events to its status bar, the CLI draws a spinner, a test counts
//! them, and the library knows nothing about any of it. The trait is
//! `Send + Sync` because image downloads run concurrently.
//!
//! # Example
//!
//! ```rust
//! use paste2md::{PasteConfig, PasteProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     saved: AtomicUsize,
//! }
//!
//! impl PasteProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, url: &str, path: &std::path::Path) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} → {}", url, path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { saved: AtomicUsize::new(0) });
//!
//! let config = PasteConfig::builder()
//!     .progress_callback(counter as Arc<dyn PasteProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::classify::ClipboardKind;
use std::path::Path;
use std::sync::Arc;

/// Called by the paste pipeline as it works.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_image_start`, `on_image_complete` and `on_image_error` may be called
/// concurrently for different images of the same paste.
pub trait PasteProgressCallback: Send + Sync {
    /// Called once the clipboard has been classified.
    fn on_paste_start(&self, kind: ClipboardKind) {
        let _ = kind;
    }

    /// Called before an image is downloaded or saved.
    fn on_image_start(&self, url: &str) {
        let _ = url;
    }

    /// Called when an image has been written to `path`.
    fn on_image_complete(&self, url: &str, path: &Path) {
        let _ = (url, path);
    }

    /// Called when an image failed; its reference is left as is.
    fn on_image_error(&self, url: &str, error: &str) {
        let _ = (url, error);
    }

    /// Called once when the paste has produced its output.
    ///
    /// # Arguments
    /// * `rewritten` — image references replaced by a local one
    /// * `failed`    — image references left untouched
    fn on_paste_complete(&self, rewritten: usize, failed: usize) {
        let _ = (rewritten, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PasteProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PasteConfig`].
pub type ProgressCallback = Arc<dyn PasteProgressCallback>;
