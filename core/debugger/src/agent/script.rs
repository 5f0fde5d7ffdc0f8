//! Parsed scripts and the magic comments found in their source.

use regex::Regex;
use std::sync::LazyLock;

static SOURCE_URL_COMMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"//[#@][ \t]sourceURL=([^\n]*)").ok());

static SOURCE_MAPPING_URL_COMMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"//[#@][ \t]sourceMappingURL=([^\n]*)").ok());

/// One compiled unit of code as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    /// Url the script was loaded from; empty for evals.
    pub url: String,
    /// Name given by a `sourceURL` comment.
    pub source_url: String,
    /// Source map url the engine extracted itself.
    pub source_mapping_url: String,
    /// Full source text.
    pub source: String,
    /// First line within the resource; non-zero for inline scripts.
    pub start_line: i32,
    /// First column within the resource.
    pub start_column: i32,
    /// Last line within the resource.
    pub end_line: i32,
    /// Last column within the resource.
    pub end_column: i32,
    /// The script runs in an extension's isolated world.
    pub is_content_script: bool,
}

impl Script {
    /// The url the script is known by: its `sourceURL` if any.
    #[must_use]
    pub fn url(&self) -> &str {
        if self.source_url.is_empty() {
            &self.url
        } else {
            &self.source_url
        }
    }

    /// Returns `true` if the script does not start at the top of a
    /// resource, like inline `<script>` blocks.
    #[must_use]
    pub fn has_start_position(&self) -> bool {
        self.start_line != 0 || self.start_column != 0
    }
}

/// Finds the last `//# sourceURL=` comment in `source`.
#[must_use]
pub fn find_source_url(source: &str) -> Option<String> {
    find_magic_comment(source, SOURCE_URL_COMMENT.as_ref()?)
}

/// Finds the last `//# sourceMappingURL=` comment in `source`.
#[must_use]
pub fn find_source_map_url(source: &str) -> Option<String> {
    find_magic_comment(source, SOURCE_MAPPING_URL_COMMENT.as_ref()?)
}

fn find_magic_comment(source: &str, pattern: &Regex) -> Option<String> {
    let value = pattern.captures_iter(source).last()?.get(1)?.as_str().trim();
    if value.is_empty() || value.contains(['"', '\'', ' ', '\t']) {
        return None;
    }
    Some(value.to_string())
}
