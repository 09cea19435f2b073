//! Remote document store access.
//!
//! The pipeline only sees the [`RemoteStore`] capability: list a folder,
//! fetch raw content, or export a rich document as HTML. [`DriveClient`] is the
//! Google Drive v3 implementation, authenticated with a service account.

mod auth;
mod drive;

use async_trait::async_trait;
use tracing::debug;

use drivesite_shared::{RemoteItem, Result};

pub use auth::{Auth, DRIVE_READONLY_SCOPE, ServiceAccountAuth};
pub use drive::DriveClient;

/// User-Agent string for remote requests.
pub(crate) const USER_AGENT: &str = concat!("drivesite/", env!("CARGO_PKG_VERSION"));

/// Capability-based access to the folder(s) holding source documents.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List every supported item in a folder, following pagination to the end.
    async fn list(&self, folder_id: &str) -> Result<Vec<RemoteItem>>;

    /// Download an item's stored bytes.
    async fn fetch_content(&self, id: &str) -> Result<Vec<u8>>;

    /// Export a native rich document as HTML.
    async fn export_as_html(&self, id: &str) -> Result<Vec<u8>>;
}

/// Fetch the bytes the converter expects for `item`: the HTML export for
/// rich documents, the stored content otherwise.
pub async fn download(store: &dyn RemoteStore, item: &RemoteItem) -> Result<Vec<u8>> {
    let bytes = if item.kind.needs_export() {
        store.export_as_html(&item.id).await?
    } else {
        store.fetch_content(&item.id).await?
    };
    debug!(id = %item.id, bytes = bytes.len(), "downloaded item");
    Ok(bytes)
}
