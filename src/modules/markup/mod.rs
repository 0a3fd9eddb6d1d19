// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

//! Thin forum-markup renderer. Turns filtered email text into the forum's
//! markup (entity escaping, URL auto-linking) and validates markup before it
//! is saved. Rendering markup to HTML happens elsewhere in the forum and is
//! deliberately not part of this service.

use std::sync::LazyLock;

use regex::Regex;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://[^\s<>\[\]]+").unwrap());

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Converts plain text into forum markup: escapes HTML-significant
/// characters, then wraps bare URLs in `[url]` tags.
pub fn to_markup(text: &str) -> String {
    let escaped = html_escape::encode_text(text).into_owned();
    URL.replace_all(&escaped, "[url]$0[/url]").into_owned()
}

/// Pre-save validation: balances `[quote]` tags and tidies whitespace.
/// Orphan closing tags are dropped, unclosed openers are closed at the end.
pub fn normalize(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut depth: usize = 0;
    let mut rest = text;

    while let Some(pos) = rest.find('[') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(stripped) = strip_quote_open(tail) {
            depth += 1;
            let tag_len = tail.len() - stripped.len();
            result.push_str(&tail[..tag_len]);
            rest = stripped;
        } else if let Some(stripped) = tail.strip_prefix("[/quote]") {
            if depth > 0 {
                depth -= 1;
                result.push_str("[/quote]");
            }
            rest = stripped;
        } else {
            result.push('[');
            rest = &tail[1..];
        }
    }
    result.push_str(rest);

    for _ in 0..depth {
        result.push_str("\n[/quote]");
    }

    let trimmed: String = result
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    EXCESS_BLANK_LINES
        .replace_all(trimmed.trim(), "\n\n")
        .into_owned()
}

/// Matches `[quote]` and `[quote=...]` openers.
fn strip_quote_open(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("[quote")?;
    if let Some(rest) = rest.strip_prefix(']') {
        return Some(rest);
    }
    let rest = rest.strip_prefix('=')?;
    let close = rest.find(']')?;
    Some(&rest[close + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_and_autolinks() {
        let markup = to_markup("see <b>this</b>: https://forum.example/t/42");
        assert_eq!(
            markup,
            "see &lt;b&gt;this&lt;/b&gt;: [url]https://forum.example/t/42[/url]"
        );
    }

    #[test]
    fn closes_dangling_quotes() {
        let normalized = normalize("[quote=jane]hello");
        assert_eq!(normalized, "[quote=jane]hello\n[/quote]");
    }

    #[test]
    fn drops_orphan_closers() {
        let normalized = normalize("stray[/quote] text");
        assert_eq!(normalized, "stray text");
    }

    #[test]
    fn collapses_blank_line_runs() {
        let normalized = normalize("a\n\n\n\n\nb");
        assert_eq!(normalized, "a\n\nb");
    }
}
