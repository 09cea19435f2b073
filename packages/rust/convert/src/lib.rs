//! Normalization of remote documents into one minimal HTML shape.
//!
//! Whatever the source kind, the output is the same fixed template with the
//! document's plain text inside a single `<pre>` block:
//!
//! ```text
//! <!DOCTYPE html><html><head><meta charset="utf-8"><title>{name}</title></head><body><pre>{text}</pre></body></html>
//! ```
//!
//! The template is always generated fresh, never appended to existing markup,
//! so nested preambles cannot occur.

mod strip;

use std::borrow::Cow;

use tracing::{debug, instrument, warn};

use drivesite_shared::RemoteItem;

/// Result of converting one remote document.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The complete normalized HTML document.
    pub html: String,
    /// Length in bytes of the extracted text (before escaping).
    pub text_len: usize,
    /// Whether invalid UTF-8 sequences were replaced while decoding.
    pub lossy: bool,
}

/// Convert raw remote content into a normalized HTML document.
///
/// For [`RichDoc`](drivesite_shared::ItemKind::RichDoc) items the bytes must
/// be the remote HTML export, not the native document. Invalid UTF-8 is
/// replaced, never fatal.
#[instrument(skip_all, fields(id = %item.id, kind = ?item.kind, bytes = raw.len()))]
pub fn convert(item: &RemoteItem, raw: &[u8]) -> ConvertResult {
    let (decoded, lossy) = decode_lossy(raw);
    if lossy {
        warn!(id = %item.id, name = %item.name, "content is not valid UTF-8, replaced invalid sequences");
    }

    // Plain text goes through the same passes: stray tag-like spans in a
    // .txt file are dropped rather than rendered.
    let text = extract_text(&decoded);

    let html = render_document(&item.name, &text);
    debug!(text_len = text.len(), html_len = html.len(), "conversion complete");

    ConvertResult {
        html,
        text_len: text.len(),
        lossy,
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences. Strips a leading BOM.
pub fn decode_lossy(raw: &[u8]) -> (Cow<'_, str>, bool) {
    let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);
    let decoded = String::from_utf8_lossy(raw);
    let lossy = matches!(decoded, Cow::Owned(_));
    (decoded, lossy)
}

/// Reduce markup (or plain text) to readable text with no tags left.
pub fn extract_text(markup: &str) -> String {
    strip::run_pipeline(markup)
}

/// Wrap text in the fixed minimal template. Both inputs are escaped.
pub fn render_document(title: &str, text: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body><pre>{}</pre></body></html>",
        escape_html(title),
        escape_html(text)
    )
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(s: &str) -> String {
    html_escape::encode_double_quoted_attribute(s).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
