//! # paste2md
//!
//! Paste whatever is on the system clipboard into a Markdown document.
//!
//! ## Why this crate?
//!
//! There is no cross-platform clipboard API that reports *what* is on the
//! clipboard and hands out rich text and images alike. This crate asks small
//! per-platform helper scripts instead, then turns the answer into one string
//! to insert at the cursor: HTML becomes Markdown, remote images referenced
//! by the text are downloaded next to the document, and a clipboard image is
//! saved to disk (or inlined as base64) and linked.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Clipboard
//!  │
//!  ├─ 1. Classify  list format names via helper script → Text/Html/Image
//!  ├─ 2. Read      text or HTML via script, or save the image to a file
//!  ├─ 3. Convert   HTML → Markdown, then user rewrite rules
//!  ├─ 4. Rewrite   download every remote ![](url), concurrently
//!  └─ 5. Render    relative link, sized <img> tag, or data: URI
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paste2md::{paste_to_markdown, Document, PasteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let doc = Document::from_path("/home/me/notes/today.md");
//!     let config = PasteConfig::builder()
//!         .image_save_folder("${fileDirname}/assets")
//!         .build()?;
//!     let output = paste_to_markdown(&doc, &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("{} image(s) saved, {} failed",
//!         output.stats.images_rewritten,
//!         output.stats.images_failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paste2md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library in an editor integration:
//! ```toml
//! paste2md = { version = "0.3", default-features = false }
//! ```
//!
//! ## Helper scripts
//!
//! | Platform | Listing | Text | HTML | Image |
//! |----------|---------|------|------|-------|
//! | Linux    | ✓ (`xclip`) | ✓ | ✓ | ✓ |
//! | Windows  | ✓ (PowerShell) | ✓ | ✓ | ✓ |
//! | macOS    | — | — | — | ✓ (AppleScript) |
//!
//! Without a listing script the paste degrades to plain text read through
//! [`clipboard::TextClipboard`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clipboard;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod paste;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clipboard::{StaticClipboard, SystemClipboard, TextClipboard};
pub use config::{PasteConfig, PasteConfigBuilder, PathEncoding, Settings};
pub use document::{Document, MARKDOWN_LANGUAGE};
pub use error::{ImageError, PasteError};
pub use output::{ImageResult, PasteOutput, PasteStats};
pub use paste::{
    import_file, paste_html_or_text, paste_image, paste_image_url, paste_sync, paste_to_markdown,
};
pub use pipeline::classify::{classify, classify_formats, ClipboardKind};
pub use pipeline::rules::{ConfigRule, RuleSpec};
pub use pipeline::runner::{Platform, Script, ScriptRunner};
pub use pipeline::target::{ImageTag, PasteImageContext};
pub use progress::{NoopProgressCallback, PasteProgressCallback, ProgressCallback};
