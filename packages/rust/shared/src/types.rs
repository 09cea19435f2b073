//! Core domain types for drivesite.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the generated site index. Never treated as a document.
pub const INDEX_FILE_NAME: &str = "index.html";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying a single run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// The content kind of a remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// An HTML file, downloaded as-is.
    HtmlDoc,
    /// A plain text file, downloaded as-is.
    PlainText,
    /// A native rich document that must be exported to HTML first.
    RichDoc,
}

impl ItemKind {
    /// Map a Drive MIME type to a supported kind.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "text/html" => Some(Self::HtmlDoc),
            "text/plain" => Some(Self::PlainText),
            "application/vnd.google-apps.document" => Some(Self::RichDoc),
            _ => None,
        }
    }

    /// The Drive MIME type for this kind.
    pub fn mime(self) -> &'static str {
        match self {
            Self::HtmlDoc => "text/html",
            Self::PlainText => "text/plain",
            Self::RichDoc => "application/vnd.google-apps.document",
        }
    }

    /// Whether content must be obtained through an HTML export.
    pub fn needs_export(self) -> bool {
        matches!(self, Self::RichDoc)
    }
}

// ---------------------------------------------------------------------------
// RemoteItem
// ---------------------------------------------------------------------------

/// A document listed from a remote folder. Immutable once listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Opaque, unique remote identifier.
    pub id: String,
    /// Original file name in the remote folder.
    pub name: String,
    /// Content kind.
    pub kind: ItemKind,
}

impl RemoteItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}
