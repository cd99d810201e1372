//! Typed client for the Key Tracker REST API.
//!
//! One method per endpoint. Every call is a single request with no retry;
//! a transport failure and a rejected request both come back as
//! [`ClientError`], and callers are expected to show one generic message
//! for either (see [`view::ViewState`]).

pub mod view;

use reqwest::{RequestBuilder, StatusCode, header, multipart};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    enrich::enrich_history,
    filter::FilterMode,
    models::{
        active_key::ActiveKey,
        backup::{BACKUP_CONTENT_TYPE, BACKUP_FILENAME, RestoreSummary, has_backup_extension},
        history::{HistoryEntry, HistoryRecord, UpdateHistoryRequest},
        key::{IssueKeyRequest, Key, KeyRequest, ReturnKeyRequest},
        site::{CreateSiteRequest, Site, UpdateSiteRequest},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connection, timeout, decoding).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Refused locally before uploading.
    #[error("Invalid backup file: {0}")]
    InvalidBackupFile(String),
}

/// A downloaded backup.
#[derive(Debug, Clone)]
pub struct BackupFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`,
    /// e.g. `http://localhost:8000/api`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            http,
            base: Url::parse(&base)?,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    /// URL of one item of `collection`, with `id` encoded as a single
    /// path segment so `?`, `#` and `/` stay part of the id.
    fn item_url(&self, collection: &str, id: &str) -> Result<Url, ClientError> {
        let mut target = self.base.clone();
        target
            .path_segments_mut()
            .map_err(|()| {
                ClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .pop_if_empty()
            .push(collection)
            .push(id);
        Ok(target)
    }

    // ---- sites ----

    pub async fn list_sites(&self) -> Result<Vec<Site>, ClientError> {
        self.json(self.http.get(self.url("sites/")?)).await
    }

    /// Sites filtered on the server.
    pub async fn search_sites(&self, query: &str, mode: FilterMode) -> Result<Vec<Site>, ClientError> {
        let req = self
            .http
            .get(self.url("sites/")?)
            .query(&[("q", query), ("mode", mode_param(mode))]);
        self.json(req).await
    }

    pub async fn get_site(&self, site_code: &str) -> Result<Site, ClientError> {
        self.json(self.http.get(self.item_url("sites", site_code)?))
            .await
    }

    pub async fn create_site(&self, request: &CreateSiteRequest) -> Result<Site, ClientError> {
        self.json(self.http.post(self.url("sites/")?).json(request))
            .await
    }

    pub async fn update_site(
        &self,
        site_code: &str,
        request: &UpdateSiteRequest,
    ) -> Result<Site, ClientError> {
        let req = self
            .http
            .put(self.item_url("sites", site_code)?)
            .json(request);
        self.json(req).await
    }

    pub async fn delete_site(&self, site_code: &str) -> Result<(), ClientError> {
        self.empty(self.http.delete(self.item_url("sites", site_code)?))
            .await
    }

    // ---- keys ----

    /// All keys, or only those of `site_code`.
    pub async fn list_keys(&self, site_code: Option<&str>) -> Result<Vec<Key>, ClientError> {
        let mut req = self.http.get(self.url("keys/")?);
        if let Some(code) = site_code.filter(|c| !c.trim().is_empty()) {
            req = req.query(&[("site_code", code)]);
        }
        self.json(req).await
    }

    pub async fn get_key(&self, key_id: i32) -> Result<Key, ClientError> {
        self.json(self.http.get(self.item_url("keys", &key_id.to_string())?))
            .await
    }

    pub async fn create_key(&self, request: &KeyRequest) -> Result<Key, ClientError> {
        self.json(self.http.post(self.url("keys/")?).json(request))
            .await
    }

    pub async fn update_key(&self, key_id: i32, request: &KeyRequest) -> Result<Key, ClientError> {
        let req = self
            .http
            .put(self.item_url("keys", &key_id.to_string())?)
            .json(request);
        self.json(req).await
    }

    pub async fn delete_key(&self, key_id: i32) -> Result<(), ClientError> {
        self.empty(self.http.delete(self.item_url("keys", &key_id.to_string())?))
            .await
    }

    pub async fn issue_key(&self, request: &IssueKeyRequest) -> Result<HistoryEntry, ClientError> {
        self.json(self.http.post(self.url("keys/issue/")?).json(request))
            .await
    }

    pub async fn return_key(&self, request: &ReturnKeyRequest) -> Result<HistoryEntry, ClientError> {
        self.json(self.http.post(self.url("keys/return/")?).json(request))
            .await
    }

    pub async fn active_keys(&self) -> Result<Vec<ActiveKey>, ClientError> {
        self.json(self.http.get(self.url("active-keys/")?)).await
    }

    // ---- history ----

    pub async fn list_history(
        &self,
        site_code: Option<&str>,
    ) -> Result<Vec<HistoryEntry>, ClientError> {
        let mut req = self.http.get(self.url("history/")?);
        if let Some(code) = site_code.filter(|c| !c.trim().is_empty()) {
            req = req.query(&[("site_code", code)]);
        }
        self.json(req).await
    }

    /// Fetch history, then keys, then join them locally.
    ///
    /// The two requests run one after the other; if either fails the
    /// whole pipeline fails and nothing is joined.
    pub async fn history_with_details(
        &self,
        site_code: Option<&str>,
    ) -> Result<Vec<HistoryRecord>, ClientError> {
        let entries = self.list_history(site_code).await?;
        let keys = self.list_keys(None).await?;

        Ok(enrich_history(entries, &keys))
    }

    pub async fn update_history(
        &self,
        history_id: i32,
        request: &UpdateHistoryRequest,
    ) -> Result<HistoryEntry, ClientError> {
        let req = self
            .http
            .put(self.item_url("history", &history_id.to_string())?)
            .json(request);
        self.json(req).await
    }

    pub async fn delete_history(&self, history_id: i32) -> Result<(), ClientError> {
        self.empty(self.http.delete(self.item_url("history", &history_id.to_string())?))
            .await
    }

    // ---- backup ----

    /// Download a backup. The file name comes from `Content-Disposition`.
    pub async fn download_backup(&self) -> Result<BackupFile, ClientError> {
        let resp = check(self.http.get(self.url("backup/")?).send().await?).await?;

        let filename = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|h| h.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| BACKUP_FILENAME.to_string());
        let contents = resp.bytes().await?.to_vec();

        Ok(BackupFile { filename, contents })
    }

    /// Upload a backup, replacing all data on the server.
    ///
    /// Files not named `*.yaml` / `*.yml` are refused without a request.
    pub async fn restore_backup(
        &self,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<RestoreSummary, ClientError> {
        if !has_backup_extension(filename) {
            return Err(ClientError::InvalidBackupFile(format!(
                "{filename}: only .yaml or .yml files are accepted"
            )));
        }

        let part = multipart::Part::bytes(contents)
            .file_name(filename.to_string())
            .mime_str(BACKUP_CONTENT_TYPE)?;
        let form = multipart::Form::new().part("file", part);

        self.json(self.http.post(self.url("backup/restore/")?).multipart(form))
            .await
    }

    /// Delete all data on the server.
    pub async fn clear_data(&self) -> Result<(), ClientError> {
        self.empty(self.http.delete(self.url("backup/clear/")?))
            .await
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = check(req.send().await?).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn empty(&self, req: RequestBuilder) -> Result<(), ClientError> {
        check(req.send().await?).await?;
        Ok(())
    }
}

fn mode_param(mode: FilterMode) -> &'static str {
    match mode {
        FilterMode::Substring => "substring",
        FilterMode::RegExp => "regexp",
    }
}

/// Turn a non-success response into `ClientError::Rejected`.
///
/// The message is taken from the server's `{"error": {"message"}}` body
/// when present, otherwise the raw body text.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(text);

    Err(ClientError::Rejected { status, message })
}

/// Extract the file name from a `Content-Disposition` header value.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let (name, raw) = part.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let filename = raw.trim().trim_matches('"');
        (!filename.is_empty()).then(|| filename.to_string())
    })
}
