use std::sync::Arc;

use htmd::HtmlToMarkdown;
use vacancy_core::error::AppError;
use vacancy_core::traits::Cleaner;

/// Tags that never carry posting content.
const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "nav", "header", "footer", "aside", "iframe", "svg",
    "form", "button",
];

/// Converts a posting page to Markdown, dropping page chrome so the
/// extraction prompt holds little more than the posting itself.
#[derive(Clone)]
pub struct HtmdCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl HtmdCleaner {
    pub fn new() -> Self {
        Self::with_skipped_tags(SKIPPED_TAGS.iter().copied())
    }

    /// Cleaner that drops exactly `tags`.
    pub fn with_skipped_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(tags.into_iter().collect())
            .build();
        Self {
            converter: Arc::new(converter),
        }
    }
}

impl Default for HtmdCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::CleanerError(e.to_string()))?;
        Ok(collapse_blank_lines(&markdown))
    }
}

fn collapse_blank_lines(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;
    for line in markdown.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim().to_string()
}
