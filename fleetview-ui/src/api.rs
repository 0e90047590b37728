//! Browser transport for the console REST client

use async_trait::async_trait;
use fleetview_common::api::{ApiRequest, Method, RestClient, Transport};
use fleetview_common::{ConsoleError, Result};
use serde_json::Value;

/// Sends console requests with `fetch`, relative to `root`
#[derive(Clone, Debug, Default)]
pub struct BrowserTransport {
    root: String,
}

impl BrowserTransport {
    /// Empty `root` targets the page's own origin
    pub fn new(root: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }
}

fn method(method: Method) -> reqwasm::http::Method {
    match method {
        Method::Get => reqwasm::http::Method::GET,
        Method::Post => reqwasm::http::Method::POST,
        Method::Put => reqwasm::http::Method::PUT,
        Method::Patch => reqwasm::http::Method::PATCH,
        Method::Delete => reqwasm::http::Method::DELETE,
    }
}

#[async_trait(?Send)]
impl Transport for BrowserTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let url = request.url(&self.root);
        let mut builder = reqwasm::http::Request::new(&url)
            .method(method(request.method))
            .header("Accept", "application/json");

        if let Some(body) = &request.body {
            let body = serde_json::to_string(body).map_err(|e| ConsoleError::Validation(e.to_string()))?;
            builder = builder.header("Content-Type", request.content_type()).body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ConsoleError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ConsoleError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(ConsoleError::Http { status, body: text });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ConsoleError::Validation(format!("{}: {}", url, e)))
    }
}

pub type ConsoleClient = RestClient<BrowserTransport>;

pub fn client(root: &str) -> ConsoleClient {
    RestClient::new(BrowserTransport::new(root))
}
