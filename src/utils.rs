use regex::Regex;
use std::sync::LazyLock;

use crate::models::Report;

static INCOMPLETE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*$").unwrap());
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[^>]*>").unwrap());
static SHORTCODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[/?[^\]]*\]").unwrap());
static NUMERIC_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&rsquo;", "'"),
    ("&lsquo;", "'"),
    ("&rdquo;", "\""),
    ("&ldquo;", "\""),
    ("&mdash;", "—"),
    ("&ndash;", "–"),
    ("&hellip;", "…"),
    ("&copy;", "©"),
    // last, so "&amp;lt;" doesn't turn into "<"
    ("&amp;", "&"),
];

/// Strip markup from article text and feed titles.
///
/// Removes complete and truncated tags, CMS shortcodes like `[caption]`,
/// decodes common named and numeric entities and collapses whitespace.
pub fn clean_html_tags(text: &str) -> String {
    let cleaned = INCOMPLETE_TAG.replace_all(text, "");
    let cleaned = HTML_TAG.replace_all(&cleaned, "");
    let cleaned = SHORTCODE.replace_all(&cleaned, "");

    let cleaned = NUMERIC_ENTITY.replace_all(&cleaned, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });

    let mut cleaned = cleaned.into_owned();
    for &(entity, replacement) in NAMED_ENTITIES {
        cleaned = cleaned.replace(entity, replacement);
    }

    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// One block per report line, separated by a divider.
pub fn format_report_plain_text(report: &Report) -> String {
    report.lines().join("\n\n---\n\n")
}

/// Cut `text` to at most `max_chars` characters, on a char boundary.
/// A cut text ends in "…", which counts toward the limit.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let Some(keep) = max_chars.checked_sub(1) else {
        return String::new();
    };
    let end = text.char_indices().nth(keep).map_or(text.len(), |(idx, _)| idx);
    format!("{}…", text[..end].trim_end())
}
