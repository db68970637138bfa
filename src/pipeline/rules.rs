//! User rewrite rules: regex + replacement, applied to pasted text in order.
//!
//! Rules come from editor settings written for JavaScript regular
//! expressions, so option letters follow JS flags and replacement templates
//! use JS syntax (`$1`, `$<name>`, `$&`, `$$`). Both are translated to the
//! `regex` crate's equivalents when a rule is compiled.

use crate::error::PasteError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// A rule as written in settings. Compiled on demand by [`RuleSpec::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub regex: String,
    #[serde(default)]
    pub options: String,
    #[serde(default)]
    pub replace: String,
}

impl RuleSpec {
    pub fn new(
        regex: impl Into<String>,
        options: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        Self {
            regex: regex.into(),
            options: options.into(),
            replace: replace.into(),
        }
    }

    /// Compile into an immutable [`ConfigRule`].
    ///
    /// Option letters: `g` replace every match (otherwise only the first),
    /// `i` case-insensitive, `m` `^`/`$` match at line boundaries, `s` `.`
    /// matches newlines. `u` and `y` are accepted and ignored.
    pub fn compile(&self) -> Result<ConfigRule, PasteError> {
        let mut builder = RegexBuilder::new(&self.regex);
        let mut global = false;
        for flag in self.options.chars() {
            match flag {
                'g' => global = true,
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'u' | 'y' => {}
                other => {
                    return Err(PasteError::InvalidRule {
                        regex: self.regex.clone(),
                        detail: format!("unknown option '{other}'"),
                    })
                }
            }
        }
        let regex = builder.build().map_err(|e| PasteError::InvalidRule {
            regex: self.regex.clone(),
            detail: e.to_string(),
        })?;
        let replacement = translate_replacement(&self.replace, regex.captures_len() - 1);
        Ok(ConfigRule {
            regex,
            replacement,
            global,
        })
    }
}

/// A compiled rewrite rule.
#[derive(Debug, Clone)]
pub struct ConfigRule {
    regex: Regex,
    replacement: String,
    global: bool,
}

impl ConfigRule {
    /// Apply the rule; text without a match is returned borrowed.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.global {
            self.regex.replace_all(text, self.replacement.as_str())
        } else {
            self.regex.replace(text, self.replacement.as_str())
        }
    }
}

/// Compile every rule, failing on the first invalid one.
pub fn compile_rules(specs: &[RuleSpec]) -> Result<Vec<ConfigRule>, PasteError> {
    specs.iter().map(RuleSpec::compile).collect()
}

/// Apply `rules` to `text` in declared order.
pub fn apply_rules(rules: &[ConfigRule], text: &str) -> String {
    let mut out = text.to_string();
    for rule in rules {
        if let Cow::Owned(replaced) = rule.apply(&out) {
            out = replaced;
        }
    }
    debug!("Applied {} rewrite rules", rules.len());
    out
}

/// Translate a JavaScript replacement template to `regex` syntax.
///
/// `$1`/`$12` → `${1}`/`${12}`, `$<name>` → `${name}`, `$&` → `${0}`,
/// `$$` → `$$`. A `$` not starting one of those is a literal dollar.
///
/// `$nn` names a group only if the pattern has that many `groups`.
/// Otherwise `$12` is group 1 followed by a literal `2`, and a `$n` past
/// the last group stays literal text.
fn translate_replacement(js: &str, groups: usize) -> String {
    let mut out = String::with_capacity(js.len() + 8);
    let mut chars = js.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().map(|&(_, n)| n) {
            Some('$') => {
                chars.next();
                out.push_str("$$");
            }
            Some('&') => {
                chars.next();
                out.push_str("${0}");
            }
            Some(d) if d.is_ascii_digit() => {
                chars.next();
                let first = d.to_digit(10).unwrap_or(0) as usize;
                let two = chars
                    .peek()
                    .and_then(|&(_, d2)| d2.to_digit(10))
                    .map(|d2| first * 10 + d2 as usize);
                match two {
                    Some(n) if (1..=groups).contains(&n) => {
                        chars.next();
                        out.push_str(&format!("${{{n}}}"));
                    }
                    _ if (1..=groups).contains(&first) => {
                        out.push_str(&format!("${{{first}}}"));
                    }
                    _ => {
                        out.push_str("$$");
                        out.push(d);
                    }
                }
            }
            Some('<') => match js[i + 2..].find('>') {
                Some(end) => {
                    let name = &js[i + 2..i + 2 + end];
                    out.push_str(&format!("${{{name}}}"));
                    for _ in 0..name.chars().count() + 1 {
                        chars.next();
                    }
                    chars.next();
                }
                None => out.push_str("$$"),
            },
            _ => out.push_str("$$"),
        }
    }
    out
}
