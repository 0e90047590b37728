//! HTTP transport for the console API

use async_trait::async_trait;
use fleetview_common::api::{ApiRequest, Method, RestClient, Transport};
use fleetview_common::{ConsoleError, Result};
use serde_json::Value;
use std::time::Duration;

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, request.url(&self.base_url))
            .header("Accept", "application/json");

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header("Content-Type", request.content_type())
                .body(body.to_string());
        }
        builder
    }
}

#[async_trait(?Send)]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "API request");

        let response = self
            .build_request(&request)
            .send()
            .await
            .map_err(|e| ConsoleError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ConsoleError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ConsoleError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ConsoleError::Validation(e.to_string()))
    }
}

pub type ApiClient = RestClient<HttpTransport>;
