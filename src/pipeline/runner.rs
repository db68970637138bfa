//! Process runner: invoke a platform helper script and capture its stdout.
//!
//! There is no unified clipboard API across operating systems, so every
//! clipboard access goes through a small script per platform (`xclip` on
//! Linux, PowerShell on Windows, AppleScript on macOS). The contract with a
//! script is narrow: positional string arguments in, exactly one result on
//! stdout, exit code 0 on success. Anything else is a failure whose message
//! is the captured stderr.
//!
//! Resolution of the script for the current platform is synchronous and
//! happens before any process is spawned, so an unsupported platform fails
//! immediately without side effects.

use crate::error::PasteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Operating-system family a helper script is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    Other,
}

impl Platform {
    /// Platform the binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    /// Interpreter and leading arguments used to run a script.
    fn shell(self, script: &Path) -> (&'static str, Vec<String>) {
        let script = script.to_string_lossy().into_owned();
        match self {
            Platform::Windows => (
                "powershell",
                [
                    "-noprofile",
                    "-noninteractive",
                    "-nologo",
                    "-sta",
                    "-executionpolicy",
                    "unrestricted",
                    "-windowstyle",
                    "hidden",
                    "-file",
                ]
                .iter()
                .map(|s| s.to_string())
                .chain(std::iter::once(script))
                .collect(),
            ),
            Platform::MacOs => ("osascript", vec![script]),
            Platform::Linux | Platform::Other => ("sh", vec![script]),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Windows => "win32",
            Platform::MacOs => "darwin",
            Platform::Other => "unknown",
        };
        f.write_str(name)
    }
}

/// The helper scripts the pipeline knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Print the clipboard's format names, one per line.
    ListFormats,
    /// Print the clipboard's plain text.
    GetText,
    /// Print the clipboard's HTML.
    GetHtml,
    /// Write the clipboard image as PNG to the path given as first argument
    /// and print that path, or `no image`.
    SaveImage,
}

impl Script {
    /// Script file for `platform`, or `None` when the platform has none.
    pub fn file_name(self, platform: Platform) -> Option<&'static str> {
        use Platform::*;
        use Script::*;
        match (self, platform) {
            (ListFormats, Linux) => Some("linux_get_clipboard_content_type.sh"),
            (ListFormats, Windows) => Some("win32_get_clipboard_content_type.ps1"),
            (GetText, Linux) => Some("linux_get_clipboard_text_plain.sh"),
            (GetText, Windows) => Some("win32_get_clipboard_text_plain.ps1"),
            (GetHtml, Linux) => Some("linux_get_clipboard_text_html.sh"),
            (GetHtml, Windows) => Some("win32_get_clipboard_text_html.ps1"),
            (SaveImage, Linux) => Some("linux_save_clipboard_png.sh"),
            (SaveImage, Windows) => Some("win32_save_clipboard_png.ps1"),
            (SaveImage, MacOs) => Some("mac.applescript"),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Script::ListFormats => "list-clipboard-formats",
            Script::GetText => "get-clipboard-text",
            Script::GetHtml => "get-clipboard-html",
            Script::SaveImage => "save-clipboard-image",
        }
    }
}

/// Runs helper scripts from one directory for one platform.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    script_dir: PathBuf,
    platform: Platform,
    timeout: Option<Duration>,
}

impl ScriptRunner {
    pub fn new(script_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            script_dir: script_dir.into(),
            platform,
            timeout: None,
        }
    }

    /// Kill the script and fail with [`PasteError::ScriptTimeout`] when it
    /// runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Whether `script` exists for this runner's platform.
    pub fn supports(&self, script: Script) -> bool {
        script.file_name(self.platform).is_some()
    }

    /// Full path of `script` for this platform.
    ///
    /// Fails with [`PasteError::UnsupportedPlatform`] without touching the
    /// file system when the platform has no such script.
    pub fn script_path(&self, script: Script) -> Result<PathBuf, PasteError> {
        script
            .file_name(self.platform)
            .map(|name| self.script_dir.join(name))
            .ok_or_else(|| PasteError::UnsupportedPlatform {
                platform: self.platform.to_string(),
                script: script.label().to_string(),
            })
    }

    /// Run `script` with positional `args` and return its trimmed stdout.
    ///
    /// No retry: spawn and script errors surface to the caller.
    pub async fn run(&self, script: Script, args: &[&str]) -> Result<String, PasteError> {
        let path = self.script_path(script)?;
        let (shell, mut argv) = self.platform.shell(&path);
        argv.extend(args.iter().map(|a| a.to_string()));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.label().to_string());

        debug!("Running {} via {} ({} args)", name, shell, args.len());

        let child = Command::new(shell)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PasteError::ScriptSpawnFailed {
                script: name.clone(),
                source: e,
            })?;

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the future drops the child, which kills it.
                    warn!("{} exceeded {}s, killed", name, limit.as_secs());
                    return Err(PasteError::ScriptTimeout {
                        script: name,
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await,
        }
        .map_err(|e| PasteError::ScriptSpawnFailed {
            script: name.clone(),
            source: e,
        })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!("{} → {} bytes", name, stdout.len());
            Ok(stdout)
        } else {
            Err(PasteError::ScriptFailed {
                script: name,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
