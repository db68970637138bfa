//! Rendering: a materialised image file → the string inserted into the
//! document.
//!
//! ## Linked vs. embedded
//!
//! A context with a stable target produces a link relative to the
//! document's folder, escaped per [`PathEncoding`]. A base64 context reads
//! the temporary file back, inlines it as a `data:` URI and deletes it.
//!
//! ## Why the `./` prefix?
//!
//! Some Markdown previewers resolve `assets/a.png` against the workspace
//! root rather than the document. `./assets/a.png` is unambiguous
//! everywhere. Paths that climb out of the folder already start with `../`.

use crate::config::{PasteConfig, PathEncoding};
use crate::document::Document;
use crate::error::PasteError;
use crate::pipeline::encode;
use crate::pipeline::target::{normalize_lexically, ImageTag, PasteImageContext};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Characters `encodeURI` leaves alone besides ASCII alphanumerics.
const ENCODE_URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Render the image at `image_path` according to `ctx`.
///
/// `image_path` is normally `ctx.target_path()`, but a download may have
/// appended an extension to it.
///
/// # Errors
/// [`PasteError::RenderFailed`] if a base64 context's file cannot be read.
pub fn render_context(
    ctx: &PasteImageContext,
    image_path: &Path,
    doc: &Document,
    config: &PasteConfig,
) -> Result<String, PasteError> {
    let src = if ctx.convert_to_base64() {
        let bytes = std::fs::read(image_path).map_err(|e| PasteError::RenderFailed {
            path: image_path.to_path_buf(),
            source: e,
        })?;
        let uri = encode::data_uri(&bytes);
        if ctx.remove_after_convert() {
            if let Err(e) = std::fs::remove_file(image_path) {
                warn!("Could not remove {}: {}", image_path.display(), e);
            }
        }
        uri
    } else {
        let link = link_path(doc, image_path);
        encode_path(&link, config.path_encoding)
    };

    if !doc.is_markdown() {
        debug!("Document is {}, inserting bare path", doc.language_id);
        return Ok(src);
    }
    Ok(match ctx.image_tag() {
        Some(tag) => image_tag_html(&src, tag),
        None => format!("![]({src})"),
    })
}

/// Forward-slash link from the document's folder to `image_path`.
fn link_path(doc: &Document, image_path: &Path) -> String {
    let rel = doc
        .dir()
        .and_then(|dir| relative_path(dir, image_path))
        .unwrap_or_else(|| image_path.to_path_buf());
    if rel.is_absolute() {
        return rel.to_string_lossy().replace('\\', "/");
    }
    let rel = rel.to_string_lossy().replace('\\', "/");
    if rel.starts_with("../") {
        rel
    } else {
        format!("./{rel}")
    }
}

/// Path from `from_dir` to `to`, or `None` when they share no root
/// (different Windows drives).
pub fn relative_path(from_dir: &Path, to: &Path) -> Option<PathBuf> {
    let from = normalize_lexically(from_dir);
    let to = normalize_lexically(to);
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();

    let is_root = |c: &Component| matches!(c, Component::Prefix(_) | Component::RootDir);
    let from_root: Vec<_> = from.iter().take_while(|c| is_root(*c)).collect();
    let to_root: Vec<_> = to.iter().take_while(|c| is_root(*c)).collect();
    if from_root != to_root {
        return None;
    }

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for c in &to[common..] {
        out.push(c.as_os_str());
    }
    Some(out)
}

/// Escape a link path per the configured mode.
pub fn encode_path(path: &str, mode: PathEncoding) -> String {
    match mode {
        PathEncoding::EncodeUri => utf8_percent_encode(path, ENCODE_URI).to_string(),
        PathEncoding::EncodeSpaceOnly => path.replace(' ', "%20"),
        PathEncoding::None => path.to_string(),
    }
}

/// `<img src='…' width='w' height='h'/>`
pub fn image_tag_html(src: &str, tag: ImageTag) -> String {
    format!(
        "<img src='{}' width='{}' height='{}'/>",
        src, tag.width, tag.height
    )
}
