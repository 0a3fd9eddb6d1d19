// Copyright © 2025 mailboard.dev
// Licensed under MailBoard License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

//! Reply-prefix localization. A static table keyed by language tag — pure
//! lookups, no global language switching.

/// Localized "Re:" equivalents, as mail clients in each locale write them.
const PREFIXES: &[(&str, &str)] = &[
    ("en", "Re:"),
    ("de", "AW:"),
    ("fr", "RE :"),
    ("es", "RE:"),
    ("it", "R:"),
    ("nl", "Antw:"),
    ("pl", "Odp:"),
    ("pt", "RES:"),
    ("sv", "SV:"),
    ("fi", "VS:"),
    ("da", "SV:"),
    ("tr", "YNT:"),
];

pub const DEFAULT_LANGUAGE: &str = "en";

/// Returns the reply prefix for a language tag, falling back to English for
/// unknown tags.
pub fn localized_prefix(tag: &str) -> &'static str {
    let tag = tag.trim().to_lowercase();
    let base = tag.split(['-', '_']).next().unwrap_or(DEFAULT_LANGUAGE);
    PREFIXES
        .iter()
        .find(|(lang, _)| *lang == base)
        .map(|(_, prefix)| *prefix)
        .unwrap_or("Re:")
}

/// Prefixes a subject for a reply. Idempotent: a subject that already starts
/// with any known localized prefix is returned unchanged.
pub fn apply_reply_prefix(tag: &str, subject: &str) -> String {
    let subject = subject.trim();
    if starts_with_known_prefix(subject).is_some() {
        return subject.to_string();
    }
    format!("{} {}", localized_prefix(tag), subject)
}

/// Removes every leading localized reply prefix, repeatedly, so that
/// `"Re: AW: Re: budget"` and `"budget"` compare equal.
pub fn strip_reply_prefix(subject: &str) -> String {
    let mut rest = subject.trim();
    while let Some(stripped) = starts_with_known_prefix(rest) {
        rest = stripped.trim_start();
    }
    rest.to_string()
}

fn starts_with_known_prefix(subject: &str) -> Option<&str> {
    for (_, prefix) in PREFIXES {
        if let Some(head) = subject.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return Some(&subject[prefix.len()..]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_tags_resolve() {
        assert_eq!(localized_prefix("de"), "AW:");
        assert_eq!(localized_prefix("de-AT"), "AW:");
        assert_eq!(localized_prefix("zz"), "Re:");
    }

    #[test]
    fn prefixing_is_idempotent() {
        let once = apply_reply_prefix("en", "Weekly sync");
        let twice = apply_reply_prefix("en", &once);
        assert_eq!(once, "Re: Weekly sync");
        assert_eq!(once, twice);
    }

    #[test]
    fn foreign_prefix_is_not_doubled() {
        assert_eq!(apply_reply_prefix("en", "AW: Budget"), "AW: Budget");
    }

    #[test]
    fn stripping_removes_stacked_prefixes() {
        assert_eq!(strip_reply_prefix("Re: AW: re: Budget"), "Budget");
        assert_eq!(strip_reply_prefix("Budget"), "Budget");
    }
}
