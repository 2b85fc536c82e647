//! Single request/response exchange over HTTP.
//!
//! The transport never retries and never touches headers; callers own both
//! decisions. A failed exchange yields a [`NetworkError`] and no status code.

use crate::headers::HeaderSet;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{NetworkError, ProxyConfig};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    /// Encodes `body` up front so an unencodable payload fails before any
    /// network traffic.
    pub fn post_json<T: Serialize + ?Sized>(
        url: impl Into<String>,
        body: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            body: Some(serde_json::to_value(body)?),
        })
    }
}

/// Status and an owned copy of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body text cut to `max` chars for log lines.
    pub fn snippet(&self, max: usize) -> String {
        let text = self.text();
        let mut out: String = text.chars().take(max).collect();
        if text.chars().count() > max {
            out.push_str("...");
        }
        out
    }
}

#[async_trait]
pub trait Requester: Send + Sync {
    async fn send(&self, request: &Request, headers: &HeaderSet)
        -> Result<RawResponse, NetworkError>;
}

#[async_trait]
impl<T: Requester + ?Sized> Requester for Arc<T> {
    async fn send(
        &self,
        request: &Request,
        headers: &HeaderSet,
    ) -> Result<RawResponse, NetworkError> {
        (**self).send(request, headers).await
    }
}

/// reqwest-backed requester, optionally routed through a proxy.
#[derive(Clone)]
pub struct HttpRequester {
    client: Client,
    timeout: Duration,
}

impl HttpRequester {
    pub fn new(proxy_config: Option<&ProxyConfig>, timeout: Duration) -> Result<Self> {
        let mut client_builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout);

        if let Some(proxy_conf) = proxy_config {
            let mut proxy = reqwest::Proxy::all(&proxy_conf.url)
                .with_context(|| format!("Invalid proxy URL {}", proxy_conf.url))?;
            if let Some(u) = &proxy_conf.username {
                proxy = proxy.basic_auth(u, proxy_conf.password.as_deref().unwrap_or(""));
            }
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, endpoint: &str, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
                endpoint: endpoint.to_string(),
            }
        } else if err.is_connect() {
            NetworkError::Connection {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        } else {
            NetworkError::Request {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn send(
        &self,
        request: &Request,
        headers: &HeaderSet,
    ) -> Result<RawResponse, NetworkError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        builder = builder.header(CONTENT_TYPE, "application/json");
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify(&request.url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| NetworkError::Body {
            endpoint: request.url.clone(),
            reason: e.to_string(),
        })?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}
