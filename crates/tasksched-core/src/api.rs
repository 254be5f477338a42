use std::time::Duration;

use anyhow::Context;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::filter::Filter;
use crate::task::{Task, TaskCreate, TaskId, TaskPatch};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("timeout of {}ms exceeded", .after.as_millis())]
    Timeout { after: Duration },

    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request failed with status code {status}")]
    Status {
        status: u16,
        validation: Option<String>,
    },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    fn from_transport(err: reqwest::Error, after: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { after }
        } else {
            Self::Transport(err)
        }
    }

    /// Flattened field messages of a 400 response, if the body had any.
    pub fn validation_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                validation: Some(message),
                ..
            } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::BAD_REQUEST.as_u16())
    }
}

/// The task REST endpoint as seen by the board.
#[allow(async_fn_in_trait)]
pub trait TaskService {
    /// Raw list payload; the caller judges its shape.
    async fn list_tasks(&self, filter: Filter) -> Result<Value, ApiError>;

    async fn create_task(&self, create: &TaskCreate) -> Result<Task, ApiError>;

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError>;

    /// Bodyless patch; the server flips completion itself.
    async fn toggle_task(&self, id: TaskId) -> Result<Task, ApiError>;

    async fn delete_task(&self, id: TaskId) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed building HTTP client for task API")?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/tasks/", self.base_url)
    }

    fn item_url(&self, id: TaskId) -> String {
        format!("{}/tasks/{id}/", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4();
        let response = request
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .send()
            .await
            .map_err(|err| {
                error!(%request_id, error = %err, "task API request failed");
                ApiError::from_transport(err, self.timeout)
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(%request_id, status = %status, url = %response.url(), "task API request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(%request_id, status = %status, body = %body, "task API returned non-success status");

        let validation = if status == StatusCode::BAD_REQUEST {
            serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| flatten_validation_messages(&value))
        } else {
            None
        };

        Err(ApiError::Status {
            status: status.as_u16(),
            validation,
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::from_transport(err, self.timeout))?;
        serde_json::from_slice(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

impl TaskService for ApiClient {
    #[instrument(skip_all, fields(filter = %filter))]
    async fn list_tasks(&self, filter: Filter) -> Result<Value, ApiError> {
        let request = self
            .http
            .get(self.collection_url())
            .query(&filter.query_params());
        let response = self.send(request).await?;
        self.decode(response).await
    }

    #[instrument(skip(self, create), fields(title_len = create.title.len(), priority = %create.priority))]
    async fn create_task(&self, create: &TaskCreate) -> Result<Task, ApiError> {
        let request = self.http.post(self.collection_url()).json(create);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    #[instrument(skip(self, patch))]
    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let request = self.http.patch(self.item_url(id)).json(patch);
        let response = self.send(request).await?;
        self.decode(response).await
    }

    #[instrument(skip(self))]
    async fn toggle_task(&self, id: TaskId) -> Result<Task, ApiError> {
        let request = self.http.patch(self.item_url(id));
        let response = self.send(request).await?;
        self.decode(response).await
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        let request = self.http.delete(self.item_url(id));
        self.send(request).await?;
        Ok(())
    }
}

/// Collects every message of a validation body, in document order, into one
/// space-joined string. Nested objects such as `{"details": {...}}` are
/// walked too.
pub fn flatten_validation_messages(body: &Value) -> Option<String> {
    let Value::Object(fields) = body else {
        return None;
    };

    let mut messages = Vec::new();
    collect_messages(fields, &mut messages);

    if messages.is_empty() {
        None
    } else {
        Some(messages.join(" "))
    }
}

fn collect_messages(fields: &serde_json::Map<String, Value>, out: &mut Vec<String>) {
    for value in fields.values() {
        match value {
            Value::String(message) => out.push(message.clone()),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(message) => out.push(message.clone()),
                        Value::Object(nested) => collect_messages(nested, out),
                        _ => {}
                    }
                }
            }
            Value::Object(nested) => collect_messages(nested, out),
            _ => {}
        }
    }
}
