//! End-to-end tests for paste2md.
//!
//! The platform helper scripts are replaced by throw-away `sh` scripts
//! written into a temporary directory, and remote images are served by a
//! local `mockito` server, so these run anywhere with a POSIX shell and no
//! clipboard or network.
//!
//! Run with:
//!   cargo test --test paste -- --nocapture

#![cfg(unix)]

use paste2md::{
    import_file, paste_to_markdown, ClipboardKind, Document, ImageError, PasteConfig,
    PasteConfigBuilder, PasteError, PasteProgressCallback, Platform, RuleSpec, Script,
    MARKDOWN_LANGUAGE,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Route library logs through the test harness; `RUST_LOG=paste2md=debug`
/// shows them with `--nocapture`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fake Linux clipboard: one script per operation in a temp dir.
struct FakeClipboard {
    scripts: tempfile::TempDir,
}

impl FakeClipboard {
    fn new() -> Self {
        init_logging();
        Self {
            scripts: tempfile::tempdir().unwrap(),
        }
    }

    fn script(self, script: Script, body: &str) -> Self {
        let name = script.file_name(Platform::Linux).unwrap();
        std::fs::write(self.scripts.path().join(name), body).unwrap();
        self
    }

    /// Clipboard listing `formats` and returning `text` for both text reads.
    fn with_text(formats: &str, text: &str) -> Self {
        let body = format!("cat <<'PASTE2MD_EOF'\n{text}\nPASTE2MD_EOF\n");
        Self::new()
            .script(Script::ListFormats, &format!("printf '{formats}\\n'\n"))
            .script(Script::GetText, &body)
            .script(Script::GetHtml, &body)
    }

    /// Clipboard holding a PNG that the save script writes to `$1`.
    fn with_image() -> Self {
        Self::new()
            .script(Script::ListFormats, "printf 'TARGETS\\nimage/png\\n'\n")
            .script(
                Script::SaveImage,
                "printf '\\211PNG\\r\\n\\032\\n' > \"$1\"\necho \"$1\"\n",
            )
    }

    fn config(&self) -> PasteConfigBuilder {
        PasteConfig::builder()
            .platform(Platform::Linux)
            .script_dir(self.scripts.path())
            .script_timeout_secs(Some(10))
            .download_timeout_secs(5)
    }
}

fn markdown_doc(root: &Path) -> Document {
    Document::new(root.join("notes/today.md"), MARKDOWN_LANGUAGE)
}

/// Strip `![](` … `)` and resolve the link against the document's folder.
fn linked_file(doc: &Document, markdown: &str) -> PathBuf {
    let link = markdown
        .strip_prefix("![](")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or_else(|| panic!("not a bare image link: {markdown}"));
    doc.dir().unwrap().join(link)
}

// ── Classification ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_format_list_pastes_nothing() {
    let clip = FakeClipboard::new().script(Script::ListFormats, "true\n");
    let root = tempfile::tempdir().unwrap();
    let out = paste_to_markdown(&markdown_doc(root.path()), &clip.config().build().unwrap())
        .await
        .unwrap();
    assert_eq!(out.kind, ClipboardKind::Unknown);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_missing_xclip_is_reported() {
    let clip = FakeClipboard::new().script(Script::ListFormats, "echo 'no xclip'\n");
    let root = tempfile::tempdir().unwrap();
    let err = paste_to_markdown(&markdown_doc(root.path()), &clip.config().build().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PasteError::MissingSystemUtility { .. }), "got {err:?}");
    assert!(err.to_string().contains("xclip"));
}

#[tokio::test]
async fn test_missing_script_dir_is_spawn_or_script_error() {
    let root = tempfile::tempdir().unwrap();
    let config = PasteConfig::builder()
        .platform(Platform::Linux)
        .script_dir(root.path().join("no-scripts-here"))
        .build()
        .unwrap();
    let err = paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            PasteError::ScriptFailed { .. } | PasteError::ScriptSpawnFailed { .. }
        ),
        "got {err:?}"
    );
}

// ── Text and HTML ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_plain_text_passes_through_rules() {
    let clip = FakeClipboard::with_text("UTF8_STRING\nSTRING", "hello\u{00a0}world");
    let root = tempfile::tempdir().unwrap();
    let config = clip
        .config()
        .rule(RuleSpec::new("\u{00a0}", "g", " "))
        .build()
        .unwrap();
    let out = paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap();
    assert_eq!(out.kind, ClipboardKind::Text);
    assert_eq!(out.markdown, "hello world");
}

#[tokio::test]
async fn test_html_is_converted() {
    let clip = FakeClipboard::with_text(
        "TARGETS\ntext/html\nUTF8_STRING",
        "<h2>Notes</h2><ul><li>one</li><li>two</li></ul>",
    );
    let root = tempfile::tempdir().unwrap();
    let out = paste_to_markdown(&markdown_doc(root.path()), &clip.config().build().unwrap())
        .await
        .unwrap();
    assert_eq!(out.kind, ClipboardKind::Html);
    assert!(out.markdown.contains("## Notes"), "got: {}", out.markdown);
    assert!(out.markdown.contains("one"));
    assert!(!out.markdown.contains("<li>"));
}

#[tokio::test]
async fn test_single_image_url_is_downloaded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/a.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(PNG)
        .create_async()
        .await;

    let url = format!("{}/a.png", server.url());
    let clip = FakeClipboard::with_text("UTF8_STRING", &url);
    let root = tempfile::tempdir().unwrap();
    let doc = markdown_doc(root.path());
    let out = paste_to_markdown(&doc, &clip.config().build().unwrap())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(out.markdown.starts_with("![](./"), "got: {}", out.markdown);
    assert!(out.markdown.ends_with("a.png)"));
    let file = linked_file(&doc, &out.markdown);
    assert_eq!(std::fs::read(&file).unwrap(), PNG);
    assert_eq!(out.stats.images_rewritten, 1);
}

#[tokio::test]
async fn test_single_image_url_failure_aborts() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let url = format!("{}/gone.png", server.url());
    let clip = FakeClipboard::with_text("UTF8_STRING", &url);
    let root = tempfile::tempdir().unwrap();
    let err = paste_to_markdown(&markdown_doc(root.path()), &clip.config().build().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PasteError::DownloadFailed { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_inline_images_rewritten_and_failures_kept() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/ok.gif")
        .with_status(200)
        .with_header("content-type", "image/gif")
        .with_body(b"GIF89a")
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/missing.png")
        .with_status(404)
        .create_async()
        .await;

    let good = format!("{}/ok.gif", server.url());
    let bad = format!("{}/missing.png", server.url());
    let text = format!(
        "Intro ![a]({good}) middle ![b]({bad} \"caption\") and ![](./local.png) end."
    );
    let clip = FakeClipboard::with_text("UTF8_STRING", &text);
    let root = tempfile::tempdir().unwrap();
    let config = clip.config().image_save_folder("./img").build().unwrap();
    let out = paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap();

    ok.assert_async().await;
    let md = &out.markdown;
    assert!(md.starts_with("Intro ![](./img/"), "got: {md}");
    assert!(!md.contains(&good), "downloaded ref must be replaced: {md}");
    assert!(
        md.contains(&format!("![b]({bad} \"caption\")")),
        "failed ref must be kept verbatim: {md}"
    );
    assert!(md.contains("![](./local.png)"), "local ref untouched: {md}");
    assert!(md.ends_with(" end."));

    assert_eq!(out.stats.images_rewritten, 1);
    assert_eq!(out.stats.images_failed, 1);
    assert_eq!(out.images.len(), 2);
    assert_eq!(out.images[0].url, good);
    assert!(out.images[0].path.as_ref().unwrap().exists());
    assert!(matches!(
        out.images[1].error,
        Some(ImageError::DownloadFailed { .. })
    ));
}

#[tokio::test]
async fn test_images_sharing_a_basename_get_their_own_files() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", "/a/logo.png")
        .with_status(200)
        .with_body(b"AAAA-first-image")
        .expect(2)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/b/logo.png")
        .with_status(200)
        .with_body(b"BB")
        .create_async()
        .await;

    let a = format!("{}/a/logo.png", server.url());
    let b = format!("{}/b/logo.png", server.url());
    let text = format!("![]({a}) ![]({b}) ![]({a})");
    let clip = FakeClipboard::with_text("UTF8_STRING", &text);
    let root = tempfile::tempdir().unwrap();
    let doc = markdown_doc(root.path());
    let config = clip.config().image_save_folder("./assets").build().unwrap();
    let out = paste_to_markdown(&doc, &config).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(out.stats.images_rewritten, 3);

    let links: Vec<&str> = out.markdown.split(' ').collect();
    assert_eq!(links.len(), 3, "got: {}", out.markdown);
    let files: Vec<PathBuf> = links.iter().map(|l| linked_file(&doc, l)).collect();
    assert_ne!(files[0], files[1]);
    assert_ne!(files[0], files[2]);
    assert_ne!(files[1], files[2]);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"AAAA-first-image");
    assert_eq!(std::fs::read(&files[1]).unwrap(), b"BB");
    assert_eq!(std::fs::read(&files[2]).unwrap(), b"AAAA-first-image");
    assert_eq!(
        std::fs::read_dir(root.path().join("notes/assets")).unwrap().count(),
        3
    );
}

#[tokio::test]
async fn test_invalid_folder_aborts_before_download() {
    let mut server = mockito::Server::new_async().await;
    let never = server
        .mock("GET", "/x.png")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;

    let text = format!("see ![]({}/x.png)", server.url());
    let clip = FakeClipboard::with_text("UTF8_STRING", &text);
    let root = tempfile::tempdir().unwrap();
    let config = clip.config().image_save_folder("./img ").build().unwrap();
    let err = paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, PasteError::InvalidConfiguredPath { .. }), "got {err:?}");
    never.assert_async().await;
}

// ── Images ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_clipboard_image_saved_and_linked() {
    let clip = FakeClipboard::with_image();
    let root = tempfile::tempdir().unwrap();
    let doc = markdown_doc(root.path());
    let config = clip
        .config()
        .image_save_folder("${fileDirname}/${fileBasenameNoExtension}")
        .build()
        .unwrap();
    let out = paste_to_markdown(&doc, &config).await.unwrap();

    assert_eq!(out.kind, ClipboardKind::Image);
    assert!(out.markdown.starts_with("![](./today/"), "got: {}", out.markdown);
    assert!(out.markdown.ends_with(".png)"));
    let file = linked_file(&doc, &out.markdown);
    assert!(std::fs::read(&file).unwrap().starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn test_clipboard_image_with_size_tag() {
    let clip = FakeClipboard::with_image();
    let root = tempfile::tempdir().unwrap();
    let config = clip
        .config()
        .image_save_folder("./assets?200,10")
        .build()
        .unwrap();
    let out = paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap();
    assert!(out.markdown.starts_with("<img src='./assets/"), "got: {}", out.markdown);
    assert!(out.markdown.ends_with(".png' width='200' height='10'/>"));
}

#[tokio::test]
async fn test_clipboard_image_base64_leaves_no_file() {
    let clip = FakeClipboard::with_image();
    let root = tempfile::tempdir().unwrap();
    let config = clip.config().image_save_folder("./assets/").build().unwrap();
    let out = paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap();

    assert!(
        out.markdown.starts_with("![](data:image/png;base64,"),
        "got: {}",
        out.markdown
    );
    // images[0].url is the temporary target handed to the save script.
    let temp = PathBuf::from(&out.images[0].url);
    assert!(!temp.exists(), "temp file must be gone: {}", temp.display());
    assert!(out.images[0].path.is_none());
    assert!(!root.path().join("notes/assets").exists());
}

#[tokio::test]
async fn test_no_image_sentinel() {
    let clip = FakeClipboard::new()
        .script(Script::ListFormats, "printf 'image/png\\n'\n")
        .script(Script::SaveImage, "echo 'no image'\n");
    let root = tempfile::tempdir().unwrap();
    let err = paste_to_markdown(&markdown_doc(root.path()), &clip.config().build().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, PasteError::NoImageInClipboard), "got {err:?}");
    let leftovers = std::fs::read_dir(root.path().join("notes"))
        .map(|dir| dir.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0, "no empty image file may be left behind");
}

#[tokio::test]
async fn test_image_into_untitled_document_is_rejected() {
    let clip = FakeClipboard::with_image();
    let err = paste_to_markdown(
        &Document::untitled(MARKDOWN_LANGUAGE),
        &clip.config().build().unwrap(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PasteError::UntitledDocument));
}

#[tokio::test]
async fn test_image_into_plain_text_document_is_bare_path() {
    let clip = FakeClipboard::with_image();
    let root = tempfile::tempdir().unwrap();
    let doc = Document::new(root.path().join("readme.txt"), "plaintext");
    let out = paste_to_markdown(&doc, &clip.config().image_save_folder("pics").build().unwrap())
        .await
        .unwrap();
    assert!(out.markdown.starts_with("./pics/"), "got: {}", out.markdown);
    assert!(!out.markdown.contains("!["));
}

#[tokio::test]
async fn test_concurrent_pastes_into_different_documents() {
    let clip = FakeClipboard::with_image();
    let root = tempfile::tempdir().unwrap();
    let a = Document::new(root.path().join("a/doc.md"), MARKDOWN_LANGUAGE);
    let b = Document::new(root.path().join("b/deeper/doc.md"), MARKDOWN_LANGUAGE);
    std::fs::create_dir_all(a.dir().unwrap()).unwrap();
    std::fs::create_dir_all(b.dir().unwrap()).unwrap();
    let config = clip
        .config()
        .image_save_folder("${workspaceRoot}/shared")
        .workspace_root(root.path())
        .build()
        .unwrap();

    let (out_a, out_b) = tokio::join!(
        paste_to_markdown(&a, &config),
        paste_to_markdown(&b, &config)
    );
    let (out_a, out_b) = (out_a.unwrap(), out_b.unwrap());

    assert!(out_a.markdown.starts_with("![](../shared/"), "got: {}", out_a.markdown);
    assert!(out_b.markdown.starts_with("![](../../shared/"), "got: {}", out_b.markdown);
    assert!(linked_file(&a, &out_a.markdown).exists());
    assert!(linked_file(&b, &out_b.markdown).exists());
}

// ── Progress & import ───────────────────────────────────────────────────────

#[derive(Default)]
struct Counter {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    finished: AtomicUsize,
}

impl PasteProgressCallback for Counter {
    fn on_image_start(&self, _url: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_image_complete(&self, _url: &str, _path: &Path) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_image_error(&self, _url: &str, _error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_paste_complete(&self, _rewritten: usize, _failed: usize) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_progress_events_for_image_paste() {
    let counter = Arc::new(Counter::default());
    let clip = FakeClipboard::with_image();
    let root = tempfile::tempdir().unwrap();
    let config = clip
        .config()
        .progress_callback(counter.clone())
        .build()
        .unwrap();
    paste_to_markdown(&markdown_doc(root.path()), &config)
        .await
        .unwrap();

    assert_eq!(counter.started.load(Ordering::SeqCst), 1);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 1);
    assert_eq!(counter.failed.load(Ordering::SeqCst), 0);
    assert_eq!(counter.finished.load(Ordering::SeqCst), 1);
}

#[test]
fn test_import_file_into_workspace_folder() {
    let root = tempfile::tempdir().unwrap();
    let src = root.path().join("Screen Shot.png");
    std::fs::write(&src, PNG).unwrap();
    let doc = markdown_doc(root.path());
    let config = PasteConfig::builder()
        .workspace_root(root.path())
        .image_save_folder("${workspaceRoot}/media")
        .build()
        .unwrap();

    let out = import_file(&doc, &src, &config).unwrap();
    assert!(out.starts_with("![](../media/"), "got: {out}");
    assert!(out.ends_with("Screen%20Shot.png)"));
    assert_eq!(std::fs::read_dir(root.path().join("media")).unwrap().count(), 1);
}
