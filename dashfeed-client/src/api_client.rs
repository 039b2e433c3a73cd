//! HTTP transport for the bot API.

use async_trait::async_trait;
use dashfeed_core::{ApiRequest, AuthConfig, FeedConfig, FeedError, FeedResult, Method, Payload, Transport};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

use crate::error::ClientError;

/// [`Transport`] backed by a pooled reqwest client.
///
/// The request timeout lives here: the access layer never cancels an
/// operation, so a hung connection must fail at this level.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    auth_headers: HeaderMap,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &FeedConfig) -> Result<Self, ClientError> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let auth_headers = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_headers,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path. Absolute URLs pass through untouched.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn map_send_error(&self, path: &str, err: reqwest::Error) -> FeedError {
        let reason = if err.is_timeout() {
            format!("timed out after {}ms", self.timeout.as_millis())
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        FeedError::Transport {
            path: path.to_string(),
            reason,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: &ApiRequest) -> FeedResult<Payload> {
        let url = self.url_for(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        }
        .headers(self.auth_headers.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_send_error(&request.path, e))?;
        parse_response(&request.path, response).await
    }
}

async fn parse_response(path: &str, response: reqwest::Response) -> FeedResult<Payload> {
    let status = response.status();
    let text = response.text().await.map_err(|e| FeedError::Transport {
        path: path.to_string(),
        reason: format!("failed to read body: {}", e),
    })?;

    if !status.is_success() {
        return Err(FeedError::Http {
            path: path.to_string(),
            status: status.as_u16(),
            body: error_message(&text),
        });
    }
    decode_body(path, &text)
}

/// An empty success body decodes as `null`; mutating endpoints often return nothing.
fn decode_body(path: &str, text: &str) -> FeedResult<Payload> {
    if text.trim().is_empty() {
        return Ok(Payload::Null);
    }
    serde_json::from_str(text).map_err(|e| FeedError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Prefer the API's own `error`/`message` field over the raw body.
fn error_message(text: &str) -> String {
    serde_json::from_str::<Payload>(text)
        .ok()
        .and_then(|json| {
            ["error", "message"]
                .iter()
                .find_map(|field| json.get(*field).and_then(Payload::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| text.to_string())
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ClientError::InvalidHeader {
                name: "x-api-key",
                reason: e.to_string(),
            })?,
        );
    }
    if let Some(token) = &auth.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&value).map_err(|e| ClientError::InvalidHeader {
                name: "authorization",
                reason: e.to_string(),
            })?,
        );
    }
    Ok(headers)
}
