//! Markup-to-text passes.
//!
//! Each pass is a function `&str -> String` applied in sequence. None of them
//! parse HTML; they are pattern passes that tolerate unbalanced or truncated
//! markup and never fail.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;

/// Run the full stripping pipeline on decoded markup.
pub(crate) fn run_pipeline(markup: &str) -> String {
    let mut result = markup.replace("\r\n", "\n");

    result = drop_hidden_blocks(&result);
    result = drop_comments(&result);
    result = break_blocks(&result);
    result = strip_tags(&result);
    result = decode_entities(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Drop non-content elements with their bodies
// ---------------------------------------------------------------------------

/// Remove `<script>`, `<style>`, `<head>` and friends including their content.
fn drop_hidden_blocks(markup: &str) -> String {
    static HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<head\b[^>]*>.*?</head\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<template\b[^>]*>.*?</template\s*>",
        )
        .expect("valid regex")
    });

    HIDDEN_RE.replace_all(markup, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Drop comments
// ---------------------------------------------------------------------------

fn drop_comments(markup: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

    COMMENT_RE.replace_all(markup, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Turn block boundaries into line breaks
// ---------------------------------------------------------------------------

/// Keep paragraph structure readable once the tags are gone.
fn break_blocks(markup: &str) -> String {
    static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)<br\s*/?>|</(?:p|div|h[1-6]|li|tr|section|article|blockquote|pre|table|ul|ol)\s*>",
        )
        .expect("valid regex")
    });

    BLOCK_RE.replace_all(markup, "\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Strip remaining tags
// ---------------------------------------------------------------------------

/// Remove every tag-shaped span, keeping the text between them.
///
/// A `<` not followed by a tag name (e.g. `a < b`) is left alone.
fn strip_tags(markup: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[!/?]?[A-Za-z][^>]*>").expect("valid regex"));

    TAG_RE.replace_all(markup, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Decode character references
// ---------------------------------------------------------------------------

/// Decode named (full HTML5 table) and numeric character references.
///
/// Non-breaking spaces become plain spaces; unknown references stay as-is.
fn decode_entities(text: &str) -> String {
    decode_html_entities(text).replace('\u{00A0}', " ")
}

// ---------------------------------------------------------------------------
// Pass 6: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim line ends, collapse runs of blank lines, trim the whole text.
fn normalize_whitespace(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    MULTI_BLANK_RE
        .replace_all(&trimmed, "\n\n")
        .trim_matches('\n')
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_hidden_blocks_removes_script_and_style() {
        let input = "<p>a</p><SCRIPT type=\"x\">var x = '<b>';</SCRIPT><style>p{}</style>b";
        let result = drop_hidden_blocks(input);
        assert_eq!(result, "<p>a</p>b");
    }

    #[test]
    fn drop_comments_removes_multiline() {
        assert_eq!(drop_comments("a<!-- x\ny -->b"), "ab");
    }

    #[test]
    fn break_blocks_inserts_newlines() {
        assert_eq!(break_blocks("<p>one</p><p>two<br/>three</p>"), "<p>one\n<p>two\nthree\n");
    }

    #[test]
    fn strip_tags_keeps_text_and_comparisons() {
        assert_eq!(strip_tags("<b class=\"x\">bold</b> a < b"), "bold a < b");
        assert_eq!(strip_tags("<!DOCTYPE html><html>x</html>"), "x");
    }

    #[test]
    fn strip_tags_tolerates_truncated_markup() {
        assert_eq!(strip_tags("text <div class=\"open"), "text <div class=\"open");
        assert_eq!(strip_tags("<div <span>x"), "x");
    }

    #[test]
    fn decode_entities_named_and_numeric() {
        assert_eq!(decode_entities("&lt;p&gt; &amp; &#65;&#x42; &nbsp;"), "<p> & AB  ");
    }

    #[test]
    fn decode_entities_leaves_unknown() {
        assert_eq!(decode_entities("&bogus; a & b"), "&bogus; a & b");
    }

    #[test]
    fn decode_entities_covers_accented_and_symbol_names() {
        assert_eq!(
            decode_entities("caf&eacute; &uuml;ber &rarr; &#233; &hellip;"),
            "caf\u{e9} \u{fc}ber \u{2192} \u{e9} \u{2026}"
        );
    }

    #[test]
    fn normalize_whitespace_collapses() {
        assert_eq!(normalize_whitespace("\n\na  \n\n\n\n\nb\t\n\n"), "a\n\nb");
    }

    #[test]
    fn full_pipeline_extracts_text() {
        let input = "<!DOCTYPE html>\r\n<html><head><title>T</title></head><body>\
                     <h1>Heading</h1><p>Para &amp; more</p><!-- note --></body></html>";
        let result = run_pipeline(input);
        assert_eq!(result, "Heading\nPara & more");
    }
}
