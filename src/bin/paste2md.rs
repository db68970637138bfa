//! CLI binary for paste2md.
//!
//! A thin shim over the library crate that maps CLI flags to `PasteConfig`
//! and prints the string an editor would insert.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paste2md::{
    classify, import_file, paste_to_markdown, ClipboardKind, Document, PasteConfig,
    PasteProgressCallback, PathEncoding, ProgressCallback, ScriptRunner, Settings,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner plus one log line per image.
/// Images may finish out of order, so lines are printed as they complete.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Pasting");
        bar.set_message("Reading clipboard…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl PasteProgressCallback for CliProgressCallback {
    fn on_paste_start(&self, kind: ClipboardKind) {
        self.bar.set_message(format!("clipboard holds {kind}"));
    }

    fn on_image_start(&self, url: &str) {
        self.bar.set_message(truncate(url, 60));
    }

    fn on_image_complete(&self, url: &str, path: &Path) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            truncate(url, 60),
            dim(&path.display().to_string()),
        ));
    }

    fn on_image_error(&self, url: &str, error: &str) {
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            truncate(url, 60),
            red(&truncate(error, 80)),
        ));
    }

    fn on_paste_complete(&self, rewritten: usize, failed: usize) {
        self.bar.finish_and_clear();
        if rewritten + failed == 0 {
            return;
        }
        if failed == 0 {
            eprintln!("{} {} image(s) saved", green("✔"), bold(&rewritten.to_string()));
        } else {
            eprintln!(
                "{} {} image(s) saved  ({} kept as remote links)",
                cyan("⚠"),
                bold(&rewritten.to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Paste the clipboard as Markdown for a document
  paste2md notes/today.md

  # Save images under an assets folder next to the document
  paste2md --image-folder '${fileDirname}/assets' notes/today.md

  # Embed images as base64 instead of saving them (trailing slash)
  paste2md --image-folder './assets/' notes/today.md

  # Sized <img> tag
  paste2md --image-folder './assets?320,240' notes/today.md

  # Copy files next to the document and print one link per line
  paste2md --import ~/Downloads/diagram.png --import ~/Downloads/chart.svg notes/today.md

  # What is on the clipboard?
  paste2md --classify-only notes/today.md

  # Use editor settings (imgSavePath, encodePath, rules, ...)
  paste2md --settings .vscode/paste.json notes/today.md

FOLDER VARIABLES:
  ${workspaceRoot}            --workspace-root
  ${fileDirname}              folder of the document
  ${fileBasename}             today.md
  ${fileBasenameNoExtension}  today
  ${fileExtname}              .md

HELPER SCRIPTS:
  Clipboard access goes through per-platform scripts looked up in
  --script-dir (default: $PASTE2MD_SCRIPT_DIR, else ./assets next to the
  binary). Linux scripts need `xclip`.
"#;

/// Paste clipboard content (text, HTML or image) as Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "paste2md",
    version,
    about = "Paste clipboard text, HTML or images as Markdown",
    long_about = "Read the system clipboard and print the Markdown to insert into DOCUMENT. \
HTML is converted, remote images are downloaded next to the document, and clipboard images \
are saved to disk (or inlined as base64) and linked.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// The document being edited; links are relative to its folder.
    document: PathBuf,

    /// Language id of the document (default: from its extension).
    #[arg(long, env = "PASTE2MD_LANGUAGE")]
    language: Option<String>,

    /// Import this file instead of reading the clipboard (repeatable).
    #[arg(long, value_name = "FILE")]
    import: Vec<PathBuf>,

    /// JSON settings file (imgSavePath, encodePath, enableImgTag, autoDownloadToLocal, rules).
    #[arg(long, env = "PASTE2MD_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Image folder template; a trailing '/' embeds images as base64.
    #[arg(long, env = "PASTE2MD_IMAGE_FOLDER")]
    image_folder: Option<String>,

    /// How relative image paths are escaped.
    #[arg(long, env = "PASTE2MD_ENCODE_PATH", value_enum)]
    encode_path: Option<EncodeArg>,

    /// Ignore '?width,height' suffixes.
    #[arg(long, env = "PASTE2MD_NO_IMG_TAG")]
    no_img_tag: bool,

    /// Keep remote image links instead of downloading them.
    #[arg(long, env = "PASTE2MD_NO_DOWNLOAD")]
    no_download: bool,

    /// Value of ${workspaceRoot}.
    #[arg(long, env = "PASTE2MD_WORKSPACE_ROOT")]
    workspace_root: Option<PathBuf>,

    /// Directory holding the clipboard helper scripts.
    #[arg(long, env = "PASTE2MD_SCRIPT_DIR")]
    script_dir: Option<PathBuf>,

    /// Image download inactivity timeout in seconds.
    #[arg(long, env = "PASTE2MD_DOWNLOAD_TIMEOUT", default_value_t = 10)]
    download_timeout: u64,

    /// Concurrent image downloads.
    #[arg(short, long, env = "PASTE2MD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Helper script timeout in seconds (0 = wait forever).
    #[arg(long, env = "PASTE2MD_SCRIPT_TIMEOUT", default_value_t = 30)]
    script_timeout: u64,

    /// Print the clipboard kind only.
    #[arg(long)]
    classify_only: bool,

    /// Output structured JSON (PasteOutput) instead of Markdown.
    #[arg(long, env = "PASTE2MD_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PASTE2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PASTE2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PASTE2MD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EncodeArg {
    EncodeUri,
    EncodeSpaceOnly,
    None,
}

impl From<EncodeArg> for PathEncoding {
    fn from(v: EncodeArg) -> Self {
        match v {
            EncodeArg::EncodeUri => PathEncoding::EncodeUri,
            EncodeArg::EncodeSpaceOnly => PathEncoding::EncodeSpaceOnly,
            EncodeArg::None => PathEncoding::None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters, so INFO logs are
    // suppressed while it is shown.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && !cli.classify_only && cli.import.is_empty();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let doc = document_for(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PasteProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Classify-only mode ───────────────────────────────────────────────
    if cli.classify_only {
        let runner = ScriptRunner::new(config.script_dir.clone(), config.platform)
            .with_timeout(config.script_timeout_secs.map(Duration::from_secs));
        let kind = classify(&runner)
            .await
            .context("Failed to classify clipboard")?;
        if cli.json {
            println!("{}", serde_json::to_string(&kind).context("Failed to serialise kind")?);
        } else {
            println!("{kind}");
        }
        return Ok(());
    }

    // ── Import mode ──────────────────────────────────────────────────────
    if !cli.import.is_empty() {
        let inserted = cli
            .import
            .iter()
            .map(|file| {
                import_file(&doc, file, &config)
                    .with_context(|| format!("Failed to import {}", file.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string(&inserted).context("Failed to serialise output")?
            );
        } else {
            write_stdout(&inserted.join("\n"))?;
        }
        return Ok(());
    }

    // ── Paste ────────────────────────────────────────────────────────────
    let output = paste_to_markdown(&doc, &config)
        .await
        .context("Paste failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        write_stdout(&output.markdown)?;
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Pasted {} ({} image(s), {} failed) in {}ms",
            output.kind,
            output.stats.images_rewritten,
            output.stats.images_failed,
            output.stats.duration_ms
        );
    }

    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// The document path is made absolute so relative links are well defined.
fn document_for(cli: &Cli) -> Result<Document> {
    let path = if cli.document.is_absolute() {
        cli.document.clone()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(&cli.document)
    };
    Ok(match cli.language {
        Some(ref lang) => Document::new(path, lang.clone()),
        None => Document::from_path(path),
    })
}

/// Map CLI args to `PasteConfig`. Settings file first, explicit flags on top.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PasteConfig> {
    let mut builder = PasteConfig::builder()
        .download_timeout_secs(cli.download_timeout)
        .download_concurrency(cli.concurrency)
        .script_timeout_secs((cli.script_timeout > 0).then_some(cli.script_timeout));

    if let Some(ref path) = cli.settings {
        let settings = Settings::load(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        builder = builder.settings(settings);
    }
    if let Some(ref folder) = cli.image_folder {
        builder = builder.image_save_folder(folder.clone());
    }
    if let Some(encoding) = cli.encode_path {
        builder = builder.path_encoding(encoding.into());
    }
    if cli.no_img_tag {
        builder = builder.enable_img_tag(false);
    }
    if cli.no_download {
        builder = builder.auto_download(false);
    }
    if let Some(ref root) = cli.workspace_root {
        builder = builder.workspace_root(root.clone());
    }
    if let Some(ref dir) = cli.script_dir {
        builder = builder.script_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
