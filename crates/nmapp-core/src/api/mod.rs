//! HTTP client for the NMAPP backend.
//!
//! One method per endpoint. Auth endpoints hand back the raw status and body
//! because the gateway owns their interpretation; data endpoints decode JSON
//! and turn non-2xx statuses into [`ClientError::http_status`].

mod types;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
pub(crate) use types::timestamp::parse as parse_timestamp;
pub(crate) use types::{AuthResponse, LoginRequest};
pub use types::{
    CumulativeAnalysis, CumulativeQuery, Gfrid, HistoryEntry, Machine, Movement,
    NewHistoryRecord, PriorityUsage, RawResponse, Registration, UserProfile,
};

use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// User-Agent header for backend requests.
pub const USER_AGENT: &str = concat!("nmapp/", env!("CARGO_PKG_VERSION"));

const LOGIN_PATH: &str = "/api/auth/login/";
const REGISTER_PATH: &str = "/api/auth/register/";
const HISTORY_LIST_PATH: &str = "/api/auth/history/list/";
const HISTORY_RECORD_PATH: &str = "/api/auth/history/record/";
const HISTORY_CLEAR_PATH: &str = "/api/auth/history/clear/";
const MACHINES_PATH: &str = "/api/machines/";
const PRIORITY_USAGE_PATH: &str = "/api/priority-usage/";
const CUMULATIVE_ANALYSIS_PATH: &str = "/api/cumulative-analysis/";

fn history_delete_path(id: i64) -> String {
    format!("/api/auth/history/delete/{id}/")
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Creates a client with default HTTP settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Creates a client from the configured base URL and timeout.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            access_token: None,
        })
    }

    /// Returns a client that sends `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn login(&self, request: &LoginRequest<'_>) -> ClientResult<RawResponse> {
        self.send_raw(self.http.post(self.url(LOGIN_PATH)).json(request))
            .await
    }

    pub(crate) async fn register(&self, registration: &Registration) -> ClientResult<RawResponse> {
        self.send_raw(self.http.post(self.url(REGISTER_PATH)).json(registration))
            .await
    }

    /// Fetches the download history of a user, newest first.
    ///
    /// # Errors
    /// Returns a network, HTTP status or protocol error.
    pub async fn list_history(&self, user_id: i64) -> ClientResult<Vec<HistoryEntry>> {
        self.get_json(HISTORY_LIST_PATH, &[("user_id", user_id.to_string())])
            .await
    }

    /// Deletes one history record on the server.
    ///
    /// # Errors
    /// Returns a network or HTTP status error (404 when the record is gone).
    pub async fn delete_history(&self, id: i64) -> ClientResult<()> {
        self.send_delete(&history_delete_path(id)).await
    }

    /// Removes every history record on the server, not only the caller's.
    ///
    /// # Errors
    /// Returns a network or HTTP status error.
    pub async fn clear_history(&self) -> ClientResult<()> {
        self.send_delete(HISTORY_CLEAR_PATH).await
    }

    /// Records a generated report in the download history.
    ///
    /// # Errors
    /// Returns a network, HTTP status or protocol error.
    pub async fn record_history(&self, record: &NewHistoryRecord) -> ClientResult<HistoryEntry> {
        tracing::debug!(user_id = record.user_id, kind = %record.kind, "POST {HISTORY_RECORD_PATH}");
        let request = self
            .authorized(self.http.post(self.url(HISTORY_RECORD_PATH)))
            .json(record);
        self.decode(request).await
    }

    /// Lists machines for the dashboard.
    ///
    /// # Errors
    /// Returns a network, HTTP status or protocol error.
    pub async fn machines(&self) -> ClientResult<Vec<Machine>> {
        self.get_json(MACHINES_PATH, &[]).await
    }

    /// Past-week ON share per device.
    ///
    /// # Errors
    /// Returns a network, HTTP status or protocol error.
    pub async fn priority_usage(&self) -> ClientResult<Vec<PriorityUsage>> {
        self.get_json(PRIORITY_USAGE_PATH, &[]).await
    }

    /// Cumulative ON/OFF analysis for a device and date range.
    ///
    /// # Errors
    /// Returns a network, HTTP status or protocol error.
    pub async fn cumulative_analysis(
        &self,
        query: &CumulativeQuery,
    ) -> ClientResult<CumulativeAnalysis> {
        tracing::debug!(?query, "GET {CUMULATIVE_ANALYSIS_PATH}");
        let request = self
            .authorized(self.http.get(self.url(CUMULATIVE_ANALYSIS_PATH)))
            .query(query);
        self.decode(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_delete(&self, path: &str) -> ClientResult<()> {
        tracing::debug!("DELETE {path}");
        let response = self.authorized(self.http.delete(self.url(path))).send().await;
        let response = response.map_err(|err| ClientError::network(&err))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::http_status(status.as_u16(), &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        tracing::debug!("GET {path}");
        let request = self.authorized(self.http.get(self.url(path))).query(query);
        self.decode(request).await
    }

    async fn decode<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = request.send().await.map_err(|err| ClientError::network(&err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::network(&err))?;
        if !status.is_success() {
            return Err(ClientError::http_status(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|err| {
            ClientError::protocol("Invalid response from server").with_details(err.to_string())
        })
    }

    async fn send_raw(&self, request: reqwest::RequestBuilder) -> ClientResult<RawResponse> {
        let response = request.send().await.map_err(|err| ClientError::network(&err))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::network(&err))?;
        Ok(RawResponse { status, body })
    }
}
