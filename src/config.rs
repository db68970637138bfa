//! Configuration types for clipboard-to-Markdown pasting.
//!
//! All paste behaviour is controlled through [`PasteConfig`], built via its
//! [`PasteConfigBuilder`]. Editor-style settings files (the `imgSavePath`,
//! `encodePath`, `rules` … keys) are read by [`Settings::load`] and merged
//! into a builder with [`PasteConfigBuilder::settings`].
//!
//! Rewrite rules are kept as uncompiled [`RuleSpec`]s and compiled fresh at
//! the start of every paste, so a changed settings file takes effect on the
//! next paste without restarting anything.

use crate::clipboard::TextClipboard;
use crate::error::PasteError;
use crate::pipeline::rules::RuleSpec;
use crate::pipeline::runner::Platform;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the helper-script directory.
pub const SCRIPT_DIR_ENV: &str = "PASTE2MD_SCRIPT_DIR";

/// Configuration for a paste or import.
///
/// Built via [`PasteConfig::builder()`] or using [`PasteConfig::default()`].
///
/// # Example
/// ```rust
/// use paste2md::{PasteConfig, PathEncoding};
///
/// let config = PasteConfig::builder()
///     .image_save_folder("${fileDirname}/assets")
///     .path_encoding(PathEncoding::EncodeSpaceOnly)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PasteConfig {
    /// Folder template for saved images. Default: `""` (next to the document).
    ///
    /// May be absolute or relative to the document's folder and may contain
    /// `${workspaceRoot}`, `${fileExtname}`, `${fileBasenameNoExtension}`,
    /// `${fileBasename}` and `${fileDirname}`. A trailing `/` means "no
    /// stable file": images are embedded as base64 instead. A `?w,h` suffix
    /// adds a width/height annotation when [`Self::enable_img_tag`] is set.
    pub image_save_folder: String,

    /// How relative image paths are escaped in links. Default: `encodeURI`.
    pub path_encoding: PathEncoding,

    /// Parse `?width,height` suffixes into `<img>` tags. Default: true.
    pub enable_img_tag: bool,

    /// Download remote images referenced by pasted text. Default: true.
    pub auto_download: bool,

    /// Regex rewrite rules applied to pasted text, in order.
    pub rules: Vec<RuleSpec>,

    /// Value of `${workspaceRoot}`. Expands to `""` when unset.
    pub workspace_root: Option<PathBuf>,

    /// Directory holding the platform helper scripts.
    pub script_dir: PathBuf,

    /// Platform whose scripts and format names are used. Default: current OS.
    pub platform: Platform,

    /// Inactivity timeout for image downloads in seconds. Default: 10.
    pub download_timeout_secs: u64,

    /// Maximum concurrent image downloads within one paste. Default: 4.
    pub download_concurrency: usize,

    /// Upper bound on a helper script's runtime in seconds. Default: 30.
    /// `None` lets scripts run for as long as they like.
    pub script_timeout_secs: Option<u64>,

    /// Plain-text clipboard accessor used when the platform has no listing
    /// script. Default: the system clipboard.
    pub clipboard: Option<Arc<dyn TextClipboard>>,

    /// Optional observer for image-level progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            image_save_folder: String::new(),
            path_encoding: PathEncoding::default(),
            enable_img_tag: true,
            auto_download: true,
            rules: Vec::new(),
            workspace_root: None,
            script_dir: default_script_dir(),
            platform: Platform::current(),
            download_timeout_secs: 10,
            download_concurrency: 4,
            script_timeout_secs: Some(30),
            clipboard: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PasteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasteConfig")
            .field("image_save_folder", &self.image_save_folder)
            .field("path_encoding", &self.path_encoding)
            .field("enable_img_tag", &self.enable_img_tag)
            .field("auto_download", &self.auto_download)
            .field("rules", &self.rules)
            .field("workspace_root", &self.workspace_root)
            .field("script_dir", &self.script_dir)
            .field("platform", &self.platform)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("download_concurrency", &self.download_concurrency)
            .field("script_timeout_secs", &self.script_timeout_secs)
            .field("clipboard", &self.clipboard.as_ref().map(|_| "<dyn TextClipboard>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PasteProgressCallback>"),
            )
            .finish()
    }
}

impl PasteConfig {
    /// Create a new builder for `PasteConfig`.
    pub fn builder() -> PasteConfigBuilder {
        PasteConfigBuilder {
            config: Self::default(),
        }
    }
}

/// `$PASTE2MD_SCRIPT_DIR`, else `assets/` beside the executable.
fn default_script_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(SCRIPT_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("assets")))
        .unwrap_or_else(|| PathBuf::from("assets"))
}

/// Builder for [`PasteConfig`].
#[derive(Debug)]
pub struct PasteConfigBuilder {
    config: PasteConfig,
}

impl PasteConfigBuilder {
    pub fn image_save_folder(mut self, template: impl Into<String>) -> Self {
        self.config.image_save_folder = template.into();
        self
    }

    pub fn path_encoding(mut self, encoding: PathEncoding) -> Self {
        self.config.path_encoding = encoding;
        self
    }

    pub fn enable_img_tag(mut self, v: bool) -> Self {
        self.config.enable_img_tag = v;
        self
    }

    pub fn auto_download(mut self, v: bool) -> Self {
        self.config.auto_download = v;
        self
    }

    pub fn rule(mut self, rule: RuleSpec) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: Vec<RuleSpec>) -> Self {
        self.config.rules = rules;
        self
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = Some(root.into());
        self
    }

    pub fn script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.script_dir = dir.into();
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.config.platform = platform;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn download_concurrency(mut self, n: usize) -> Self {
        self.config.download_concurrency = n.max(1);
        self
    }

    pub fn script_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.script_timeout_secs = secs;
        self
    }

    pub fn clipboard(mut self, clipboard: Arc<dyn TextClipboard>) -> Self {
        self.config.clipboard = Some(clipboard);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Overlay every key present in an editor settings file.
    pub fn settings(mut self, settings: Settings) -> Self {
        if let Some(folder) = settings.img_save_path {
            self.config.image_save_folder = folder;
        }
        if let Some(encoding) = settings.encode_path {
            self.config.path_encoding = encoding;
        }
        if let Some(v) = settings.enable_img_tag {
            self.config.enable_img_tag = v;
        }
        if let Some(v) = settings.auto_download_to_local {
            self.config.auto_download = v;
        }
        if let Some(rules) = settings.rules {
            self.config.rules = rules;
        }
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PasteConfig, PasteError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(PasteError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_concurrency == 0 {
            return Err(PasteError::InvalidConfig(
                "Download concurrency must be ≥ 1".into(),
            ));
        }
        if c.script_timeout_secs == Some(0) {
            return Err(PasteError::InvalidConfig(
                "Script timeout must be ≥ 1 second (omit it for no limit)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Escaping applied to relative image paths before they go into a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathEncoding {
    /// Percent-encode everything `encodeURI` would. (default)
    #[default]
    #[serde(rename = "encodeURI")]
    EncodeUri,
    /// Only replace spaces with `%20`.
    #[serde(rename = "encodeSpaceOnly")]
    EncodeSpaceOnly,
    /// Leave the path as is.
    #[serde(rename = "none")]
    None,
}

impl std::str::FromStr for PathEncoding {
    type Err = PasteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encodeURI" | "encode-uri" => Ok(PathEncoding::EncodeUri),
            "encodeSpaceOnly" | "encode-space-only" => Ok(PathEncoding::EncodeSpaceOnly),
            "none" | "" => Ok(PathEncoding::None),
            other => Err(PasteError::InvalidConfig(format!(
                "Unknown path encoding '{other}' (expected encodeURI, encodeSpaceOnly or none)"
            ))),
        }
    }
}

// ── Settings file ────────────────────────────────────────────────────────

/// Editor settings as stored in a JSON settings file.
///
/// Every key is optional; absent keys keep the builder's value.
///
/// ```json
/// {
///   "imgSavePath": "${fileDirname}/assets",
///   "encodePath": "encodeSpaceOnly",
///   "enableImgTag": true,
///   "autoDownloadToLocal": true,
///   "rules": [{ "regex": "\\u00a0", "options": "g", "replace": " " }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub img_save_path: Option<String>,
    pub encode_path: Option<PathEncoding>,
    pub enable_img_tag: Option<bool>,
    pub auto_download_to_local: Option<bool>,
    pub rules: Option<Vec<RuleSpec>>,
}

impl Settings {
    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, PasteError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| PasteError::SettingsLoadFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        Self::from_json(&content).map_err(|e| match e {
            PasteError::SettingsLoadFailed { detail, .. } => PasteError::SettingsLoadFailed {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    /// Parse settings from JSON text.
    pub fn from_json(json: &str) -> Result<Settings, PasteError> {
        serde_json::from_str(json).map_err(|e| PasteError::SettingsLoadFailed {
            path: PathBuf::new(),
            detail: e.to_string(),
        })
    }
}
