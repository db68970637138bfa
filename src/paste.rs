//! Paste entry points.
//!
//! ## State machine
//!
//! ```text
//! Classifying ─┬─ Text  ─┐
//!              ├─ Html  ─┴─▶ Transforming ─▶ Rendered
//!              ├─ Image ───▶ save via script ─▶ Rendered
//!              └─ Unknown ─▶ (empty output)
//! ```
//!
//! Nothing here keeps state between calls: the document and the
//! configuration are passed explicitly through every stage, so concurrent
//! pastes into different documents cannot observe each other.

use crate::clipboard::{SystemClipboard, TextClipboard};
use crate::config::PasteConfig;
use crate::document::Document;
use crate::error::{ImageError, PasteError};
use crate::output::{ImageResult, PasteOutput, PasteStats};
use crate::pipeline::classify::{self, ClipboardKind, NO_XCLIP};
use crate::pipeline::markdown::{self, ImageRef};
use crate::pipeline::runner::{Script, ScriptRunner};
use crate::pipeline::target::PasteImageContext;
use crate::pipeline::{fetch, render, rules};
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Printed by the save-image script when the clipboard holds no image.
pub const NO_IMAGE: &str = "no image";

/// Turn whatever is on the clipboard into a string for `doc`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(PasteOutput)` on success, even if some remote images in pasted text
/// could not be downloaded (check `output.stats.images_failed`). An empty or
/// unrecognised clipboard gives an empty `markdown`.
///
/// # Errors
/// Returns `Err(PasteError)` only when no output can be produced:
/// - helper script missing, failing or timing out
/// - `xclip` not installed
/// - image paste into an unsaved document, or an invalid image folder
/// - the clipboard was classified as an image but none could be saved
/// - an invalid rewrite rule
pub async fn paste_to_markdown(
    doc: &Document,
    config: &PasteConfig,
) -> Result<PasteOutput, PasteError> {
    let start = Instant::now();
    info!("Starting paste into {}", describe(doc));

    // ── Step 1: Classify ─────────────────────────────────────────────────
    let runner = runner_for(config);
    let kind = match classify::classify(&runner).await {
        Ok(kind) => kind,
        Err(PasteError::UnsupportedPlatform { platform, .. }) => {
            info!("No clipboard listing on {}, reading plain text", platform);
            let text = read_plain_text(config)?;
            let kind = if text.is_empty() {
                ClipboardKind::Unknown
            } else {
                ClipboardKind::Text
            };
            let mut output = PasteOutput::empty(kind);
            output.markdown = text;
            return Ok(finish(output, start, config));
        }
        Err(e) => return Err(e),
    };

    if let Some(cb) = progress(config) {
        cb.on_paste_start(kind);
    }

    // ── Step 2: Transform per kind ───────────────────────────────────────
    let mut output = match kind {
        ClipboardKind::Unknown => {
            debug!("Clipboard is empty or holds nothing pasteable");
            PasteOutput::empty(kind)
        }
        ClipboardKind::Html => {
            let raw = runner.run(Script::GetHtml, &[]).await?;
            paste_html_or_text(markdown::strip_cf_html(&raw), doc, config).await?
        }
        ClipboardKind::Text => {
            let raw = runner.run(Script::GetText, &[]).await?;
            paste_html_or_text(&raw, doc, config).await?
        }
        ClipboardKind::Image => paste_image(doc, config, &runner).await?,
    };
    output.kind = kind;

    Ok(finish(output, start, config))
}

/// Transform clipboard text (plain or HTML) into Markdown.
///
/// A text that is nothing but one image URL is downloaded and rendered as
/// an image. Otherwise HTML is converted, rewrite rules run in order, and
/// every remote `![](…)` is replaced by a local copy. A reference that fails
/// for its own reasons (see [`PasteError::is_image_local`]) is left exactly
/// as it was.
///
/// # Errors
/// - [`PasteError::InvalidRule`] — a configured rule does not compile
/// - [`PasteError::InvalidConfiguredPath`] — the image folder is invalid
/// - [`PasteError::UntitledDocument`] — remote images in an unsaved document
/// - any download error, when the text is a single image URL
pub async fn paste_html_or_text(
    text: &str,
    doc: &Document,
    config: &PasteConfig,
) -> Result<PasteOutput, PasteError> {
    let start = Instant::now();
    let compiled = rules::compile_rules(&config.rules)?;

    if let Some(url) = markdown::single_image_url(text) {
        debug!("Clipboard text is a single image URL");
        return paste_image_url(url, doc, config).await;
    }

    let (kind, text) = if markdown::looks_like_html(text) {
        (ClipboardKind::Html, markdown::html_to_markdown(text))
    } else {
        (ClipboardKind::Text, text.to_string())
    };
    let text = rules::apply_rules(&compiled, &text);

    let mut output = PasteOutput::empty(kind);
    if !config.auto_download {
        output.markdown = text;
        return Ok(output);
    }

    let refs = markdown::find_image_refs(&text);
    let remote: Vec<&ImageRef> = refs.iter().filter(|r| r.is_remote()).collect();
    if remote.is_empty() {
        output.markdown = text;
        return Ok(output);
    }
    info!(
        "Rewriting {} remote image(s) of {} reference(s)",
        remote.len(),
        refs.len()
    );

    // ── Pass 2: resolve remote references concurrently, in order ─────────
    let client = fetch::build_client()?;
    let resolved: Vec<Result<(String, Option<PathBuf>), PasteError>> =
        stream::iter(remote.iter().map(|r| download_and_render(&client, &r.url, doc, config)))
            .buffered(config.download_concurrency)
            .collect()
            .await;

    let mut resolved = resolved.into_iter();
    let mut replacements = Vec::with_capacity(refs.len());
    for r in &refs {
        if !r.is_remote() {
            replacements.push(None);
            continue;
        }
        match resolved.next() {
            Some(Ok((rendered, path))) => {
                replacements.push(Some(rendered));
                output.images.push(ImageResult {
                    url: r.url.clone(),
                    path,
                    error: None,
                });
            }
            Some(Err(e)) if !e.is_image_local() => return Err(e),
            Some(Err(e)) => {
                warn!("Keeping original reference to {}: {}", r.url, e);
                replacements.push(None);
                output.images.push(ImageResult {
                    url: r.url.clone(),
                    path: None,
                    error: Some(ImageError::from_paste_error(&r.url, &e)),
                });
            }
            None => replacements.push(None),
        }
    }

    output.markdown = markdown::splice(&text, &refs, &replacements);
    output.stats.images_rewritten = output.images.iter().filter(|i| i.is_ok()).count();
    output.stats.images_failed = output.images.len() - output.stats.images_rewritten;
    output.stats.duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Download one image URL and render it as the whole paste.
///
/// Unlike references inside text, a failure here aborts the paste.
pub async fn paste_image_url(
    url: &str,
    doc: &Document,
    config: &PasteConfig,
) -> Result<PasteOutput, PasteError> {
    let start = Instant::now();
    let client = fetch::build_client()?;
    let (markdown, path) = download_and_render(&client, url, doc, config).await?;
    Ok(PasteOutput {
        markdown,
        kind: ClipboardKind::Text,
        images: vec![ImageResult {
            url: url.to_string(),
            path,
            error: None,
        }],
        stats: PasteStats {
            images_rewritten: 1,
            images_failed: 0,
            duration_ms: start.elapsed().as_millis() as u64,
        },
    })
}

/// Save the clipboard image through the platform script and render it.
///
/// # Errors
/// - [`PasteError::NoImageInClipboard`] — the script found no image
/// - [`PasteError::MissingSystemUtility`] — `xclip` is not installed
/// - anything [`PasteImageContext::resolve`] or the script can return
pub async fn paste_image(
    doc: &Document,
    config: &PasteConfig,
    runner: &ScriptRunner,
) -> Result<PasteOutput, PasteError> {
    let name = random_image_name();
    let ctx = PasteImageContext::resolve(&name, doc, config)?;
    let target = ctx.target_path().to_string_lossy().into_owned();
    if let Some(cb) = progress(config) {
        cb.on_image_start(&target);
    }

    let stdout = runner.run(Script::SaveImage, &[target.as_str()]).await?;
    match stdout.as_str() {
        NO_XCLIP => {
            return Err(PasteError::MissingSystemUtility {
                utility: "xclip".into(),
            })
        }
        "" | NO_IMAGE => {
            if let Some(cb) = progress(config) {
                cb.on_image_error(&target, NO_IMAGE);
            }
            return Err(PasteError::NoImageInClipboard);
        }
        _ => {}
    }

    // Scripts print the path they wrote; trust it when it exists.
    let saved = if Path::new(&stdout).is_file() {
        PathBuf::from(&stdout)
    } else {
        ctx.target_path().to_path_buf()
    };
    info!("Clipboard image saved to {}", saved.display());
    if let Some(cb) = progress(config) {
        cb.on_image_complete(&target, &saved);
    }

    let markdown = render::render_context(&ctx, &saved, doc, config)?;
    let mut output = PasteOutput::empty(ClipboardKind::Image);
    output.markdown = markdown;
    output.images.push(ImageResult {
        url: target,
        path: (!ctx.convert_to_base64()).then_some(saved),
        error: None,
    });
    output.stats.images_rewritten = 1;
    Ok(output)
}

/// Copy a local file next to `doc` and return the string to insert.
///
/// Used for drag-and-drop or explicit upload; no clipboard is involved.
///
/// # Errors
/// - [`PasteError::ImportFailed`] — `path` has no file name or cannot be copied
/// - anything [`PasteImageContext::resolve`] can return
pub fn import_file(
    doc: &Document,
    path: impl AsRef<Path>,
    config: &PasteConfig,
) -> Result<String, PasteError> {
    let src = path.as_ref();
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PasteError::ImportFailed {
            path: src.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
        })?;

    let ctx = PasteImageContext::resolve(&name, doc, config)?;
    std::fs::copy(src, ctx.target_path()).map_err(|e| PasteError::ImportFailed {
        path: src.to_path_buf(),
        source: e,
    })?;
    info!("Imported {} → {}", src.display(), ctx.target_path().display());

    render::render_context(&ctx, ctx.target_path(), doc, config)
}

/// Synchronous wrapper around [`paste_to_markdown`].
///
/// Creates a temporary tokio runtime internally.
pub fn paste_sync(doc: &Document, config: &PasteConfig) -> Result<PasteOutput, PasteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PasteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(paste_to_markdown(doc, config))
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Resolve, download and render one remote image.
async fn download_and_render(
    client: &reqwest::Client,
    url: &str,
    doc: &Document,
    config: &PasteConfig,
) -> Result<(String, Option<PathBuf>), PasteError> {
    let cb = progress(config);
    if let Some(cb) = cb {
        cb.on_image_start(url);
    }

    let result = async {
        let name = markdown::filename_from_url(url);
        let ctx = PasteImageContext::resolve(&name, doc, config)?;
        let timeout = Duration::from_secs(config.download_timeout_secs);
        let saved = fetch::fetch(client, url, ctx.target_path(), timeout).await?;
        let rendered = render::render_context(&ctx, &saved, doc, config)?;
        Ok::<_, PasteError>((rendered, saved, ctx.convert_to_base64()))
    }
    .await;

    match result {
        Ok((rendered, saved, embedded)) => {
            if let Some(cb) = cb {
                cb.on_image_complete(url, &saved);
            }
            Ok((rendered, (!embedded).then_some(saved)))
        }
        Err(e) => {
            if let Some(cb) = cb {
                cb.on_image_error(url, &e.to_string());
            }
            Err(e)
        }
    }
}

fn runner_for(config: &PasteConfig) -> ScriptRunner {
    ScriptRunner::new(config.script_dir.clone(), config.platform)
        .with_timeout(config.script_timeout_secs.map(Duration::from_secs))
}

fn read_plain_text(config: &PasteConfig) -> Result<String, PasteError> {
    match &config.clipboard {
        Some(clipboard) => clipboard.read_text(),
        None => SystemClipboard.read_text(),
    }
}

fn progress(config: &PasteConfig) -> Option<&ProgressCallback> {
    config.progress_callback.as_ref()
}

fn finish(mut output: PasteOutput, start: Instant, config: &PasteConfig) -> PasteOutput {
    output.stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Paste complete: {} ({} bytes, {} image(s), {} failed) in {}ms",
        output.kind,
        output.markdown.len(),
        output.stats.images_rewritten,
        output.stats.images_failed,
        output.stats.duration_ms
    );
    if let Some(cb) = progress(config) {
        cb.on_paste_complete(output.stats.images_rewritten, output.stats.images_failed);
    }
    output
}

fn describe(doc: &Document) -> String {
    match &doc.path {
        Some(p) => format!("{} ({})", p.display(), doc.language_id),
        None => format!("untitled ({})", doc.language_id),
    }
}

/// Six random base36 characters + `.png`.
fn random_image_name() -> String {
    const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let stem: String = (0..6)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{stem}.png")
}
