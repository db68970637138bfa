//! Pipeline stages for clipboard-to-Markdown pasting.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets a platform or converter be swapped
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! runner ──▶ classify ──▶ markdown/rules ──▶ target ──▶ fetch ──▶ render
//! (script)   (kind)       (text stages)      (path)     (HTTP)    (link / base64)
//! ```
//!
//! 1. [`runner`]   — run a platform helper script, capture trimmed stdout
//! 2. [`classify`] — map the clipboard's format names to a [`classify::ClipboardKind`]
//! 3. [`markdown`] — HTML → Markdown, image-reference scanning and splicing
//! 4. [`rules`]    — user regex rewrite rules, applied in order
//! 5. [`target`]   — decide where one image goes on disk
//! 6. [`fetch`]    — download a remote image; the only stage with network I/O
//! 7. [`render`]   — turn a saved image into a link, `<img>` tag or data URI,
//!    with [`encode`] doing the base64 part

pub mod classify;
pub mod encode;
pub mod fetch;
pub mod markdown;
pub mod render;
pub mod rules;
pub mod runner;
pub mod target;
