//! Google Drive v3 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use drivesite_shared::{
    DriveConfig, DriveSiteError, ItemKind, RemoteItem, Result, ServiceAccountKey,
};

use crate::auth::{Auth, ServiceAccountAuth, excerpt};
use crate::{RemoteStore, USER_AGENT};

/// Partial-response field selector for listings.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType)";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
}

// ---------------------------------------------------------------------------
// DriveClient
// ---------------------------------------------------------------------------

/// Drive v3 implementation of [`RemoteStore`].
pub struct DriveClient {
    client: Client,
    api_base: String,
    page_size: u32,
    auth: Auth,
}

impl DriveClient {
    /// Create a client authenticated with a service account key.
    pub fn new(config: &DriveConfig, key: &ServiceAccountKey) -> Result<Self> {
        let auth = Auth::ServiceAccount(ServiceAccountAuth::new(key)?);
        Self::with_auth(config, auth)
    }

    /// Create a client with an explicit authorization mode.
    pub fn with_auth(config: &DriveConfig, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriveSiteError::Remote(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            auth,
        })
    }

    /// `<api_base>/files[/<id>[/<suffix>]]`
    fn files_url(&self, id: Option<&str>, suffix: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/files", self.api_base))
            .map_err(|e| DriveSiteError::config(format!("invalid api_base '{}': {e}", self.api_base)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                DriveSiteError::config(format!("api_base '{}' cannot be a base URL", self.api_base))
            })?;
            if let Some(id) = id {
                segments.push(id);
            }
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    /// GET a URL with the bearer token and return the body bytes.
    async fn get_bytes(&self, url: Url) -> std::result::Result<Vec<u8>, String> {
        let token = self.auth.bearer(&self.client).await.map_err(|e| e.to_string())?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {}", excerpt(&body)));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }

    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> std::result::Result<FileList, String> {
        let mut url = self.files_url(None, None).map_err(|e| e.to_string())?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("q", &folder_query(folder_id))
                .append_pair("pageSize", &self.page_size.to_string())
                .append_pair("fields", LIST_FIELDS);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|e| format!("invalid listing response: {e}"))
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    #[instrument(skip(self))]
    async fn list(&self, folder_id: &str) -> Result<Vec<RemoteItem>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            pages += 1;
            debug!(page = pages, "fetching listing page");

            let page = self
                .list_page(folder_id, page_token.as_deref())
                .await
                .map_err(|msg| DriveSiteError::remote_list(folder_id, msg))?;

            for file in page.files {
                match ItemKind::from_mime(&file.mime_type) {
                    Some(kind) => items.push(RemoteItem::new(file.id, file.name, kind)),
                    None => debug!(id = %file.id, mime = %file.mime_type, "unsupported type, skipping"),
                }
            }

            match page.next_page_token {
                Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                    warn!(token = %next, "listing returned the same page token twice, stopping");
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        info!(folder_id, pages, items = items.len(), "folder listed");
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn fetch_content(&self, id: &str) -> Result<Vec<u8>> {
        let mut url = self.files_url(Some(id), None)?;
        url.query_pairs_mut().append_pair("alt", "media");

        self.get_bytes(url)
            .await
            .map_err(|msg| DriveSiteError::Remote(format!("download {id}: {msg}")))
    }

    #[instrument(skip(self))]
    async fn export_as_html(&self, id: &str) -> Result<Vec<u8>> {
        let mut url = self.files_url(Some(id), Some("export"))?;
        url.query_pairs_mut().append_pair("mimeType", "text/html");

        self.get_bytes(url)
            .await
            .map_err(|msg| DriveSiteError::Remote(format!("export {id}: {msg}")))
    }
}

/// Drive search query selecting supported, non-trashed children of a folder.
fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    let mimes = [ItemKind::HtmlDoc, ItemKind::PlainText, ItemKind::RichDoc]
        .iter()
        .map(|k| format!("mimeType='{}'", k.mime()))
        .collect::<Vec<_>>()
        .join(" or ");
    format!("'{escaped}' in parents and ({mimes}) and trashed=false")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
