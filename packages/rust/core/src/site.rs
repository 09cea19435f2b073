//! Site assembly: the index page and cross-link footers.
//!
//! Footers live between explicit begin/end markers so they can be removed
//! and re-inserted on every run without matching arbitrary markup. Footers
//! written by older tooling (a bare `<footer>` element) are removed too.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use drivesite_convert::{decode_lossy, escape_html};
use drivesite_shared::{DriveSiteError, INDEX_FILE_NAME, Result};
use drivesite_storage::write_atomic;

pub const FOOTER_BEGIN: &str = "<!-- drivesite:footer:begin -->";
pub const FOOTER_END: &str = "<!-- drivesite:footer:end -->";

static LEGACY_FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<footer\b.*?</footer>").expect("valid regex"));

static LEADING_DOCTYPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:<!DOCTYPE\s+html\s*>\s*){2,}").expect("valid regex"));

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Output documents in `dir`: `.html` files other than the index, sorted.
///
/// A missing directory has no documents.
pub fn list_documents(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DriveSiteError::io(dir, e)),
    };

    let mut docs = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| DriveSiteError::io(dir, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && is_document_name(&name) {
            docs.insert(name);
        }
    }
    Ok(docs.into_iter().collect())
}

/// Whether a file name is one [`list_documents`] reports.
pub fn is_document_name(name: &str) -> bool {
    name.ends_with(".html") && name != INDEX_FILE_NAME && !name.starts_with('.')
}

/// Render the index page listing `docs` in lexicographic order.
pub fn build_index(docs: &[String], title: &str) -> String {
    let mut sorted: Vec<&str> = docs
        .iter()
        .map(String::as_str)
        .filter(|d| *d != INDEX_FILE_NAME)
        .collect();
    sorted.sort_unstable();
    sorted.dedup();

    let title = escape_html(title);
    let mut html = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head><body>\n<h1>{title}</h1>\n<ul>\n"
    );
    for doc in sorted {
        let doc = escape_html(doc);
        html.push_str(&format!("<li><a href=\"{doc}\">{doc}</a></li>\n"));
    }
    html.push_str("</ul>\n</body></html>\n");
    html
}

/// Write `index.html` into `dir`.
#[instrument(skip_all, fields(dir = %dir.display(), docs = docs.len()))]
pub fn write_index(dir: &Path, docs: &[String], title: &str) -> Result<PathBuf> {
    let path = dir.join(INDEX_FILE_NAME);
    write_atomic(&path, build_index(docs, title).as_bytes())?;
    info!(entries = docs.len(), "index written");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Footers
// ---------------------------------------------------------------------------

/// One output document held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub file_name: String,
    pub content: String,
}

/// Outcome of refreshing footers in a directory.
#[derive(Debug, Default)]
pub struct FooterReport {
    /// Documents rewritten.
    pub updated: usize,
    /// Total links written across all footers.
    pub links: usize,
    /// Documents left untouched, with the reason.
    pub failed: Vec<DriveSiteError>,
}

/// Remove every footer region and collapse a repeated leading DOCTYPE.
///
/// A begin marker without an end marker extends to `</body>`, or to the end
/// of the document.
pub fn strip_footer(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find(FOOTER_BEGIN) {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        rest = match after.find(FOOTER_END) {
            Some(end) => &after[end + FOOTER_END.len()..],
            None => match find_ignore_case(after, "</body>") {
                Some(body) => &after[body..],
                None => "",
            },
        };
    }
    out.push_str(rest);

    let out = LEGACY_FOOTER.replace_all(&out, "");
    LEADING_DOCTYPES
        .replace(&out, "<!DOCTYPE html>")
        .into_owned()
}

/// Render a marker-delimited footer linking to `links`.
pub fn render_footer(links: &[&str]) -> String {
    let mut footer = format!("{FOOTER_BEGIN}<footer><ul>\n");
    for link in links {
        let link = escape_html(link);
        footer.push_str(&format!("<li><a href=\"{link}\">{link}</a></li>\n"));
    }
    footer.push_str("</ul></footer>");
    footer.push_str(FOOTER_END);
    footer
}

/// Insert `footer` before the last `</body>`, adding one if absent.
pub fn insert_footer(html: &str, footer: &str) -> String {
    if let Some(pos) = rfind_ignore_case(html, "</body>") {
        return format!("{}{footer}{}", &html[..pos], &html[pos..]);
    }
    if let Some(pos) = rfind_ignore_case(html, "</html>") {
        return format!("{}{footer}</body>{}", &html[..pos], &html[pos..]);
    }
    format!("{html}{footer}</body>")
}

/// Replace the footer of one document with a fresh one.
///
/// `others` are the candidate link targets; the link count is drawn from
/// `min..=max` and capped at `others.len()`. Zero links means no footer.
pub fn refresh_document<R: Rng + ?Sized>(
    content: &str,
    others: &[&str],
    min: usize,
    max: usize,
    rng: &mut R,
) -> (String, usize) {
    let stripped = strip_footer(content);
    let wanted = rng.gen_range(min..=max.max(min)).min(others.len());
    if wanted == 0 {
        return (stripped, 0);
    }

    let links: Vec<&str> = others.choose_multiple(rng, wanted).copied().collect();
    (insert_footer(&stripped, &render_footer(&links)), links.len())
}

/// Refresh footers of in-memory documents. Returns the total link count.
pub fn refresh_footers<R: Rng + ?Sized>(
    docs: &mut [OutputDocument],
    min: usize,
    max: usize,
    rng: &mut R,
) -> usize {
    let names: Vec<String> = docs.iter().map(|d| d.file_name.clone()).collect();
    let mut total = 0;

    for doc in docs.iter_mut() {
        let others: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|n| *n != doc.file_name)
            .collect();
        let (content, links) = refresh_document(&doc.content, &others, min, max, rng);
        doc.content = content;
        total += links;
    }
    total
}

/// Refresh footers of the documents `docs` inside `dir`.
///
/// A document that cannot be read or written is logged and left as it was;
/// the remaining documents are still processed.
#[instrument(skip_all, fields(dir = %dir.display(), docs = docs.len()))]
pub fn refresh_footers_on_disk<R: Rng + ?Sized>(
    dir: &Path,
    docs: &[String],
    min: usize,
    max: usize,
    rng: &mut R,
) -> FooterReport {
    let mut report = FooterReport::default();

    for name in docs {
        let others: Vec<&str> = docs
            .iter()
            .map(String::as_str)
            .filter(|n| *n != name)
            .collect();

        match refresh_file(&dir.join(name), &others, min, max, rng) {
            Ok(links) => {
                debug!(file = %name, links, "footer refreshed");
                report.updated += 1;
                report.links += links;
            }
            Err(message) => {
                warn!(file = %name, %message, "footer refresh failed, leaving file unchanged");
                report.failed.push(DriveSiteError::FooterRefresh {
                    file: name.clone(),
                    message,
                });
            }
        }
    }

    info!(
        updated = report.updated,
        links = report.links,
        failed = report.failed.len(),
        "footers refreshed"
    );
    report
}

fn refresh_file<R: Rng + ?Sized>(
    path: &Path,
    others: &[&str],
    min: usize,
    max: usize,
    rng: &mut R,
) -> std::result::Result<usize, String> {
    let raw = std::fs::read(path).map_err(|e| e.to_string())?;
    let (content, lossy) = decode_lossy(&raw);
    if lossy {
        debug!(path = %path.display(), "document is not valid UTF-8, replaced invalid sequences");
    }
    let (updated, links) = refresh_document(&content, others, min, max, rng);
    if updated != content {
        write_atomic(path, updated.as_bytes()).map_err(|e| e.to_string())?;
    }
    Ok(links)
}

// ASCII lowercasing keeps byte offsets aligned with the original.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().rfind(needle)
}
