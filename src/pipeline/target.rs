//! Target path resolution: where does one pasted image go on disk?
//!
//! The configured folder template is expanded against the document, a
//! timestamp is prefixed to the file name, and the result is turned into a
//! [`PasteImageContext`]. A folder template ending in `/` has no stable file
//! to point at, so the image goes to a temporary file and is embedded as
//! base64 instead of linked.
//!
//! ```text
//! ./assets/test.png          → ![](./assets/test.png)
//! ./assets/test.png?200,10   → <img src='./assets/test.png' width='200' height='10'/>
//! ./assets/                  → ![](data:image/png;base64,…)
//! ./assets/?200,10           → <img src='data:image/png;base64,…' width='200' height='10'/>
//! ```

use crate::config::PasteConfig;
use crate::document::Document;
use crate::error::PasteError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Explicit display size attached to an image via a `?w,h` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTag {
    pub width: u32,
    pub height: u32,
}

/// How one image reference resolves to disk.
///
/// Built once per image, consumed by the renderer, then dropped. Each
/// context owns its own target path, so concurrent pastes never share one.
#[derive(Debug)]
pub struct PasteImageContext {
    target_path: PathBuf,
    convert_to_base64: bool,
    remove_after_convert: bool,
    image_tag: Option<ImageTag>,
    // `target_path` was created empty by `resolve` to claim the name.
    reserved: bool,
    // Keeps the temporary folder alive until the context is dropped.
    _temp_dir: Option<TempDir>,
}

impl PasteImageContext {
    /// Resolve a target for an image called `filename` pasted into `doc`.
    ///
    /// The file name is prefixed with a timestamp and claimed on disk with
    /// an empty file, so two resolutions never hand out the same path. If
    /// the name is taken, a counter is inserted after the timestamp. A claim
    /// nothing was written into is removed when the context is dropped.
    ///
    /// `filename` is used verbatim: `?` and `${…}` in it have no meaning.
    ///
    /// # Errors
    /// - [`PasteError::UntitledDocument`] — `doc` was never saved
    /// - [`PasteError::InvalidConfiguredPath`] — the expanded folder has
    ///   leading or trailing whitespace
    /// - [`PasteError::DirectoryCreationFailed`] — the destination folder
    ///   cannot be created or written to
    pub fn resolve(
        filename: &str,
        doc: &Document,
        config: &PasteConfig,
    ) -> Result<Self, PasteError> {
        let base = document_dir(doc)?;
        let folder = checked_template(&config.image_save_folder, doc, config)?;
        let (folder, image_tag) = split_image_tag(&folder, config);

        if folder.ends_with('/') {
            return Self::temporary(image_tag);
        }
        let dir = normalize_lexically(&base.join(folder));
        std::fs::create_dir_all(&dir).map_err(|e| PasteError::DirectoryCreationFailed {
            path: dir.clone(),
            source: e,
        })?;
        let target_path = reserve_file(&dir, filename)?;
        Ok(Self::on_disk(target_path, image_tag, true))
    }

    /// Build a context from an explicit path, optionally suffixed `?w,h`.
    ///
    /// Relative paths are taken relative to the document's folder. A path
    /// ending in `/` selects the temporary-file + base64 mode.
    pub fn from_input(input: &str, doc: &Document, config: &PasteConfig) -> Result<Self, PasteError> {
        let base = document_dir(doc)?;
        let input = checked_template(input, doc, config)?;
        let (path_part, image_tag) = split_image_tag(&input, config);

        if path_part.ends_with('/') {
            return Self::temporary(image_tag);
        }
        let target_path = normalize_lexically(&base.join(path_part));
        prepare_dir_for_file(&target_path)?;
        Ok(Self::on_disk(target_path, image_tag, false))
    }

    fn temporary(image_tag: Option<ImageTag>) -> Result<Self, PasteError> {
        let temp_dir = tempfile::Builder::new()
            .prefix("markdown_paste")
            .tempdir()
            .map_err(|e| PasteError::DirectoryCreationFailed {
                path: std::env::temp_dir(),
                source: e,
            })?;
        let target_path = temp_dir.path().join(timestamp());
        Ok(Self::logged(PasteImageContext {
            target_path,
            convert_to_base64: true,
            remove_after_convert: true,
            image_tag,
            reserved: false,
            _temp_dir: Some(temp_dir),
        }))
    }

    fn on_disk(target_path: PathBuf, image_tag: Option<ImageTag>, reserved: bool) -> Self {
        Self::logged(PasteImageContext {
            target_path,
            convert_to_base64: false,
            remove_after_convert: false,
            image_tag,
            reserved,
            _temp_dir: None,
        })
    }

    fn logged(ctx: Self) -> Self {
        debug!(
            "Resolved image target {} (base64: {}, tag: {:?})",
            ctx.target_path.display(),
            ctx.convert_to_base64,
            ctx.image_tag
        );
        ctx
    }

    /// Absolute path the image is written to.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Embed instead of link.
    pub fn convert_to_base64(&self) -> bool {
        self.convert_to_base64
    }

    /// Delete the backing file once encoded. Always equal to
    /// [`Self::convert_to_base64`].
    pub fn remove_after_convert(&self) -> bool {
        self.remove_after_convert
    }

    pub fn image_tag(&self) -> Option<ImageTag> {
        self.image_tag
    }
}

impl Drop for PasteImageContext {
    fn drop(&mut self) {
        if !self.reserved {
            return;
        }
        let unused = std::fs::metadata(&self.target_path)
            .map(|m| m.is_file() && m.len() == 0)
            .unwrap_or(false);
        if unused {
            debug!("Releasing unused image target {}", self.target_path.display());
            let _ = std::fs::remove_file(&self.target_path);
        }
    }
}

fn document_dir(doc: &Document) -> Result<&Path, PasteError> {
    let path = doc.path.as_deref().ok_or(PasteError::UntitledDocument)?;
    Ok(path.parent().unwrap_or_else(|| Path::new("/")))
}

/// Expand `template` and reject surrounding whitespace.
fn checked_template(template: &str, doc: &Document, config: &PasteConfig) -> Result<String, PasteError> {
    let expanded = expand_variables(template, doc, config.workspace_root.as_deref());
    if expanded.trim() != expanded {
        return Err(PasteError::InvalidConfiguredPath { path: expanded });
    }
    Ok(expanded)
}

/// Split a `?w,h` suffix off a path template.
fn split_image_tag<'a>(template: &'a str, config: &PasteConfig) -> (&'a str, Option<ImageTag>) {
    match template.split_once('?') {
        Some((path, query)) if config.enable_img_tag => (path, parse_image_tag(query)),
        Some((path, _)) => (path, None),
        None => (template, None),
    }
}

/// Claim `dir/<timestamp><filename>` by creating it empty.
fn reserve_file(dir: &Path, filename: &str) -> Result<PathBuf, PasteError> {
    const MAX_ATTEMPTS: u32 = 1000;
    for n in 0..MAX_ATTEMPTS {
        let name = match n {
            0 => timestamped_filename(filename),
            n => format!("{}-{n}-{filename}", timestamp()),
        };
        let candidate = dir.join(name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(PasteError::DirectoryCreationFailed {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        }
    }
    Err(PasteError::DirectoryCreationFailed {
        path: dir.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free name for '{filename}' after {MAX_ATTEMPTS} attempts"),
        ),
    })
}

/// Substitute the predefined variables in `template` and normalise `\` to `/`.
///
/// Unknown `${…}` variables are left verbatim.
pub fn expand_variables(template: &str, doc: &Document, workspace_root: Option<&Path>) -> String {
    let mut out = template.replace(
        "${workspaceRoot}",
        &workspace_root.map(path_str).unwrap_or_default(),
    );
    if let Some(path) = doc.path.as_deref() {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let basename = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dirname = path.parent().map(path_str).unwrap_or_default();
        out = out
            .replace("${fileExtname}", &ext)
            .replace("${fileBasenameNoExtension}", &stem)
            .replace("${fileBasename}", &basename)
            .replace("${fileDirname}", &dirname);
    }
    out.replace('\\', "/")
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Sortable local timestamp used as file-name prefix.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// `YYYY-MM-DD-HH-mm-ss` + `filename`.
pub fn timestamped_filename(filename: &str) -> String {
    format!("{}{}", timestamp(), filename)
}

/// Parse the `w,h` part of a `?w,h` suffix. Anything malformed is `None`.
pub fn parse_image_tag(query: &str) -> Option<ImageTag> {
    let (w, h) = query.split_once(',')?;
    Some(ImageTag {
        width: w.trim().parse().ok()?,
        height: h.trim().parse().ok()?,
    })
}

/// Create the parent folder of `file` (and its ancestors) if missing.
pub fn prepare_dir_for_file(file: &Path) -> Result<(), PasteError> {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| PasteError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MARKDOWN_LANGUAGE;

    fn doc_in(dir: &Path) -> Document {
        Document::new(dir.join("notes/today.md"), MARKDOWN_LANGUAGE)
    }

    fn config(folder: &str) -> PasteConfig {
        PasteConfig::builder()
            .image_save_folder(folder)
            .build()
            .unwrap()
    }

    #[test]
    fn variables_expand() {
        let doc = Document::new("/home/u/notes/today.md", MARKDOWN_LANGUAGE);
        let out = expand_variables(
            "${workspaceRoot}/img/${fileBasenameNoExtension}${fileExtname}/${fileBasename}|${fileDirname}|${unknown}",
            &doc,
            Some(Path::new("/home/u")),
        );
        assert_eq!(
            out,
            "/home/u/img/today.md/today.md|/home/u/notes|${unknown}"
        );
    }

    #[test]
    fn backslashes_become_slashes() {
        let doc = Document::new("/n/a.md", MARKDOWN_LANGUAGE);
        assert_eq!(expand_variables(r".\assets\img", &doc, None), "./assets/img");
    }

    #[test]
    fn missing_workspace_root_expands_empty() {
        let doc = Document::new("/n/a.md", MARKDOWN_LANGUAGE);
        assert_eq!(expand_variables("${workspaceRoot}img", &doc, None), "img");
    }

    #[test]
    fn timestamp_prefix_shape() {
        let name = timestamped_filename("abc.png");
        assert!(name.ends_with("abc.png"));
        let stamp = &name[..name.len() - "abc.png".len()];
        assert_eq!(stamp.len(), "2026-10-19-03-08-00".len());
        assert_eq!(stamp.matches('-').count(), 5);
    }

    #[test]
    fn image_tag_parsing() {
        assert_eq!(
            parse_image_tag("200,10"),
            Some(ImageTag {
                width: 200,
                height: 10
            })
        );
        assert_eq!(parse_image_tag("200"), None);
        assert_eq!(parse_image_tag("a,b"), None);
        assert_eq!(parse_image_tag(""), None);
    }

    #[test]
    fn untitled_document_is_rejected() {
        let doc = Document::untitled(MARKDOWN_LANGUAGE);
        let err = PasteImageContext::resolve("a.png", &doc, &config("")).unwrap_err();
        assert!(matches!(err, PasteError::UntitledDocument));
    }

    #[test]
    fn whitespace_in_folder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = PasteImageContext::resolve("a.png", &doc_in(dir.path()), &config(" ./assets"))
            .unwrap_err();
        assert!(matches!(err, PasteError::InvalidConfiguredPath { .. }));
        assert!(!dir.path().join("notes").exists(), "no file I/O before validation");
    }

    #[test]
    fn relative_folder_lands_beside_document() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PasteImageContext::resolve("a.png", &doc_in(dir.path()), &config("./assets"))
            .unwrap();
        let target = ctx.target_path();
        assert_eq!(target.parent().unwrap(), dir.path().join("notes/assets"));
        assert!(target.file_name().unwrap().to_string_lossy().ends_with("a.png"));
        assert!(target.parent().unwrap().is_dir(), "folder created eagerly");
        assert!(!ctx.convert_to_base64());
        assert!(!ctx.remove_after_convert());
    }

    #[test]
    fn same_name_twice_gets_distinct_targets() {
        let dir = tempfile::tempdir().unwrap();
        let doc = doc_in(dir.path());
        let cfg = config("./assets");
        let first = PasteImageContext::resolve("logo.png", &doc, &cfg).unwrap();
        let second = PasteImageContext::resolve("logo.png", &doc, &cfg).unwrap();
        assert_ne!(first.target_path(), second.target_path());
        for ctx in [&first, &second] {
            assert!(ctx.target_path().is_file());
            assert!(ctx
                .target_path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .ends_with("logo.png"));
        }
    }

    #[test]
    fn unused_reservation_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let doc = doc_in(dir.path());
        let cfg = config("./assets");

        let unused = PasteImageContext::resolve("a.png", &doc, &cfg).unwrap();
        let unused_path = unused.target_path().to_path_buf();
        drop(unused);
        assert!(!unused_path.exists());

        let written = PasteImageContext::resolve("b.png", &doc, &cfg).unwrap();
        let written_path = written.target_path().to_path_buf();
        std::fs::write(&written_path, b"\x89PNG").unwrap();
        drop(written);
        assert!(written_path.exists());
    }

    #[test]
    fn filename_is_taken_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let doc = doc_in(dir.path());
        let ctx = PasteImageContext::resolve("what?.png", &doc, &config("./assets?300,20")).unwrap();
        let name = ctx.target_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("what?.png"), "got {name}");
        assert_eq!(ctx.target_path().parent().unwrap(), dir.path().join("notes/assets"));
        assert_eq!(ctx.image_tag().map(|t| (t.width, t.height)), Some((300, 20)));

        let ctx = PasteImageContext::resolve("${fileBasename}.png", &doc, &config("./assets")).unwrap();
        let name = ctx.target_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("${fileBasename}.png"), "got {name}");
    }

    #[test]
    fn absolute_folder_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let abs = dir.path().join("shared/img");
        let folder = abs.to_string_lossy().replace('\\', "/");
        let ctx = PasteImageContext::resolve("b.png", &doc_in(dir.path()), &config(&folder))
            .unwrap();
        assert_eq!(ctx.target_path().parent().unwrap(), abs);
    }

    #[test]
    fn trailing_slash_selects_base64() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PasteImageContext::resolve("c.png", &doc_in(dir.path()), &config("./assets/"))
            .unwrap();
        assert!(ctx.convert_to_base64());
        assert_eq!(ctx.convert_to_base64(), ctx.remove_after_convert());
        assert!(!ctx.target_path().starts_with(dir.path()));
        assert!(ctx.target_path().parent().unwrap().is_dir());
        assert!(!dir.path().join("notes/assets").exists());
    }

    #[test]
    fn folder_query_becomes_image_tag() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PasteImageContext::resolve(
            "d.png",
            &doc_in(dir.path()),
            &config("./assets/?300,20"),
        )
        .unwrap();
        assert!(ctx.convert_to_base64());
        assert_eq!(
            ctx.image_tag(),
            Some(ImageTag {
                width: 300,
                height: 20
            })
        );
    }

    #[test]
    fn explicit_input_with_size() {
        let dir = tempfile::tempdir().unwrap();
        let doc = doc_in(dir.path());
        let ctx = PasteImageContext::from_input("./assets/test.png?200,10", &doc, &config(""))
            .unwrap();
        assert_eq!(ctx.target_path(), dir.path().join("notes/assets/test.png"));
        assert_eq!(ctx.image_tag().map(|t| (t.width, t.height)), Some((200, 10)));

        let no_tags = PasteConfig::builder().enable_img_tag(false).build().unwrap();
        let ctx = PasteImageContext::from_input("./assets/test.png?200,10", &doc, &no_tags)
            .unwrap();
        assert!(ctx.image_tag().is_none());
    }

    #[test]
    fn unwritable_folder_fails_creation() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a folder is needed.
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/blocker"), b"").unwrap();
        let err = PasteImageContext::resolve("e.png", &doc_in(dir.path()), &config("./blocker/sub"))
            .unwrap_err();
        assert!(matches!(err, PasteError::DirectoryCreationFailed { .. }));
    }

    #[test]
    fn lexical_normalisation() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/./../c/d.png")),
            PathBuf::from("/a/c/d.png")
        );
    }

    #[test]
    fn temp_dir_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PasteImageContext::resolve("f.png", &doc_in(dir.path()), &config("./x/"))
            .unwrap();
        let tmp = ctx.target_path().parent().unwrap().to_path_buf();
        assert!(tmp.exists());
        drop(ctx);
        assert!(!tmp.exists());
    }
}
