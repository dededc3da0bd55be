// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use bizsuite_app::{
    BATCHES_PATH, DocumentType, LookupId, LookupItem, OrderRecord, OrderRequest, PaymentStatus,
};
use bizsuite_lookup::{DropdownSource, ItemQuery};
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const ORDERS_PATH: &str = "/api/v1/orders";
pub const LOGS_PATH: &str = "/api/v1/logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdersQuery {
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub document_type: Option<DocumentType>,
}

impl Default for OrdersQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: bizsuite_app::ORDERS_PAGE_SIZE,
            search: None,
            document_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageMeta {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrdersPage {
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
    #[serde(default)]
    pub pagination: Option<PageMeta>,
}

/// Async client for the business backend's REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;
        if parsed.cannot_be_a_base() {
            bail!("api.base_url {base_url:?} must be an http(s) URL");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{path}", self.base_url))
            .with_context(|| format!("build URL for {path}"))
    }

    fn url_with_segments(&self, path: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.url(path)?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("{} cannot carry a path", self.base_url))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let path = url.path().to_owned();
        debug!(url = %url, "GET");
        let response = self.send(self.http.get(url)).await?;
        response
            .json()
            .await
            .with_context(|| format!("decode response from {path}"))
    }

    /// Fetches dropdown entries. `Browse` sends only `limit`; `Prefix` adds
    /// `search_prefix`.
    pub async fn dropdown(&self, endpoint: &str, query: &ItemQuery) -> Result<Vec<LookupItem>> {
        let mut url = self.url(endpoint)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(term) = query.term() {
                pairs.append_pair("search_prefix", term);
            }
            pairs.append_pair("limit", &query.limit().to_string());
        }
        let body: DropdownBody = self.get_json(url).await?;
        Ok(body.into_items())
    }

    pub async fn batches(&self, item_id: &LookupId) -> Result<Vec<String>> {
        let url = self.url_with_segments(BATCHES_PATH, &[item_id.as_str()])?;
        let body: BatchesBody = self.get_json(url).await?;
        Ok(body.batches)
    }

    /// Creates an order. Validation failures come back as one line per
    /// offending field.
    pub async fn submit_order(&self, request: &OrderRequest) -> Result<Value> {
        let url = self.url(request.document_type.submit_path())?;
        debug!(url = %url, document_type = request.document_type.as_str(), "POST order");
        let response = self.send(self.http.post(url).json(request)).await?;
        let body = response.text().await.context("read order response")?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).context("decode order response")
    }

    pub async fn list_orders(&self, query: &OrdersQuery) -> Result<OrdersPage> {
        let mut url = self.url(ORDERS_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.max(1).to_string());
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                pairs.append_pair("search", search);
            }
            if let Some(document_type) = query.document_type {
                pairs.append_pair("order_type", document_type.order_type());
            }
        }
        self.get_json(url).await
    }

    pub async fn update_payment_status(
        &self,
        order_number: &str,
        status: PaymentStatus,
        amount_paid: Option<f64>,
    ) -> Result<()> {
        let url = self.url_with_segments(ORDERS_PATH, &[order_number, "payment-status"])?;
        let payload = PaymentStatusUpdate {
            payment_status: status,
            amount_paid,
        };
        self.send(self.http.put(url).json(&payload)).await?;
        Ok(())
    }

    /// Backend log lines, oldest first.
    pub async fn recent_logs(&self) -> Result<Vec<String>> {
        let body: LogsBody = self.get_json(self.url(LOGS_PATH)?).await?;
        Ok(body.logs.into_iter().map(|entry| entry.message).collect())
    }
}

impl DropdownSource for ApiClient {
    fn fetch_items(
        &self,
        endpoint: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = Result<Vec<LookupItem>>> + Send {
        self.dropdown(endpoint, query)
    }

    fn fetch_batches(
        &self,
        item_id: &LookupId,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        self.batches(item_id)
    }
}

/// Dropdown endpoints answer `{ "items": [...] }`; the employees endpoint
/// answers with a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DropdownBody {
    Bare(Vec<LookupItem>),
    Wrapped {
        #[serde(default)]
        items: Vec<LookupItem>,
    },
}

impl DropdownBody {
    fn into_items(self) -> Vec<LookupItem> {
        match self {
            Self::Bare(items) | Self::Wrapped { items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchesBody {
    #[serde(default)]
    batches: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LogsBody {
    #[serde(default)]
    logs: Vec<LogEntry>,
}

#[derive(Debug, Deserialize)]
struct LogEntry {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct PaymentStatusUpdate {
    payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_paid: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<Value>,
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("request to {base_url} timed out -- raise api.timeout or check the server");
    }
    anyhow!("cannot reach {base_url} -- is the API server running? ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(detail) = parsed.detail
        && let Some(message) = format_detail(&detail)
    {
        return anyhow!("server error ({}): {message}", status.as_u16());
    }

    if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

/// Renders a FastAPI `detail` value. Validation errors become
/// `loc.path - msg`, one per line.
pub fn format_detail(detail: &Value) -> Option<String> {
    match detail {
        Value::String(message) if !message.is_empty() => Some(message.clone()),
        Value::Array(errors) if !errors.is_empty() => Some(
            errors
                .iter()
                .map(|error| {
                    let location = error
                        .get("loc")
                        .and_then(Value::as_array)
                        .map(|parts| {
                            parts
                                .iter()
                                .map(|part| match part {
                                    Value::String(text) => text.clone(),
                                    other => other.to_string(),
                                })
                                .collect::<Vec<_>>()
                                .join(".")
                        })
                        .unwrap_or_default();
                    let message = error.get("msg").and_then(Value::as_str).unwrap_or_default();
                    format!("{location} - {message}")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}
