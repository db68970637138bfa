//! Text stages: HTML detection and conversion, image-reference scanning.
//!
//! Rewriting remote images is done in two passes. [`find_image_refs`]
//! collects every `![alt](url)` with its byte span; the caller resolves the
//! remote ones (concurrently) and [`splice`] reassembles the text from the
//! spans. Text between references is copied byte for byte and references
//! keep their relative order.

use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::{debug, warn};

static RE_HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<[a-z][\s\S]*>").unwrap());

static RE_IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[^\s?#]+\.(?:png|jpe?g|gif|webp|svg|bmp)(?:[?#]\S*)?$").unwrap()
});

static RE_IMAGE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)!\[[^\]]*\]\((.*?)\s*("[^"]*")?\s*\)"#).unwrap()
});

static RE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)([a-z][a-z0-9+.\-]*):").unwrap());

/// Whether the text contains something that looks like an HTML tag.
pub fn looks_like_html(text: &str) -> bool {
    RE_HTML_TAG.is_match(text)
}

/// If the whole text is one bare image URL, return it.
pub fn single_image_url(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    RE_IMAGE_URL.is_match(trimmed).then_some(trimmed)
}

/// Convert an HTML fragment to Markdown.
///
/// Falls back to the input unchanged if the converter rejects it.
pub fn html_to_markdown(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_list_marker: BulletListMarker::Asterisk,
            ..Options::default()
        })
        .skip_tags(vec!["script", "style", "head"])
        .build();
    match converter.convert(html) {
        Ok(md) => {
            debug!("Converted {} bytes of HTML → {} bytes Markdown", html.len(), md.len());
            md
        }
        Err(e) => {
            warn!("HTML conversion failed, pasting raw text: {}", e);
            html.to_string()
        }
    }
}

/// Drop the Windows CF_HTML header and keep only the copied fragment.
///
/// Text without a CF_HTML header is returned as is.
pub fn strip_cf_html(text: &str) -> &str {
    if !text.starts_with("Version:") || !text.contains("StartFragment:") {
        return text;
    }
    const START: &str = "<!--StartFragment-->";
    const END: &str = "<!--EndFragment-->";
    if let (Some(s), Some(e)) = (text.find(START), text.rfind(END)) {
        if s + START.len() <= e {
            return &text[s + START.len()..e];
        }
    }
    match text.find('<') {
        Some(i) => &text[i..],
        None => text,
    }
}

/// One `![alt](url "title")` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Byte span of the whole reference in the scanned text.
    pub span: Range<usize>,
    /// The link target, without title.
    pub url: String,
}

impl ImageRef {
    /// Whether the target should be downloaded (it has an HTTP(S) scheme).
    pub fn is_remote(&self) -> bool {
        is_remote_url(&self.url)
    }
}

/// Collect every Markdown image reference in order of appearance.
pub fn find_image_refs(text: &str) -> Vec<ImageRef> {
    RE_IMAGE_REF
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let url = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            Some(ImageRef {
                span: whole.range(),
                url: url.trim().trim_start_matches('<').trim_end_matches('>').to_string(),
            })
        })
        .collect()
}

/// Whether a link target names a network resource.
///
/// Bare paths (`./a.png`, `img/a.png`), `file:` and `data:` targets are local.
pub fn is_remote_url(url: &str) -> bool {
    match RE_SCHEME.captures(url) {
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            scheme == "http" || scheme == "https"
        }
        None => false,
    }
}

/// Rebuild `text`, replacing `refs[i]` with `replacements[i]` where it is
/// `Some`. Spans must come from [`find_image_refs`] on the same text.
pub fn splice(text: &str, refs: &[ImageRef], replacements: &[Option<String>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (r, replacement) in refs.iter().zip(replacements) {
        out.push_str(&text[cursor..r.span.start]);
        match replacement {
            Some(new) => out.push_str(new),
            None => out.push_str(&text[r.span.clone()]),
        }
        cursor = r.span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// File name for a downloaded image: the URL's last path segment without
/// query or fragment.
pub fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or("").to_string()
}
