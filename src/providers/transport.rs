//! Outbound fetch capability, either direct or relayed through a proxy.

use crate::core::error::RateError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("baht-rates/", env!("CARGO_PKG_VERSION"));

/// A single outbound GET.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
    pub verify_tls: bool,
}

impl FetchRequest {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            headers: BTreeMap::new(),
            timeout,
            verify_tls: true,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    /// The body of a 2xx, non-blank response; anything else is a failure.
    pub fn into_body(self) -> Result<String, RateError> {
        if !(200..300).contains(&self.status) {
            return Err(RateError::BadStatus(self.status));
        }
        if self.body.trim().is_empty() {
            return Err(RateError::EmptyBody);
        }
        Ok(self.body)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, RateError>;
}

/// Builds the pair of clients a transport needs: one verifying certificates
/// and one that does not, picked per request.
fn build_clients() -> reqwest::Result<(reqwest::Client, reqwest::Client)> {
    let strict = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let lenient = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(true)
        .build()?;
    Ok((strict, lenient))
}

async fn read_response(response: reqwest::Response) -> Result<FetchResponse, RateError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    debug!(status, bytes = body.len(), "Received response");
    Ok(FetchResponse { status, body })
}

/// Calls the target URL directly.
pub struct DirectTransport {
    strict: reqwest::Client,
    lenient: reqwest::Client,
}

impl DirectTransport {
    pub fn new() -> anyhow::Result<Self> {
        let (strict, lenient) = build_clients()?;
        Ok(Self { strict, lenient })
    }
}

#[async_trait]
impl Transport for DirectTransport {
    #[instrument(name = "DirectFetch", skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, RateError> {
        let client = if request.verify_tls {
            &self.strict
        } else {
            &self.lenient
        };

        let mut builder = client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        read_response(response).await
    }
}

#[derive(Debug, Serialize)]
struct ProxyArgs<'a> {
    timeout: u64,
    sslverify: bool,
    headers: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct ProxyBody<'a> {
    url: &'a str,
    args: ProxyArgs<'a>,
}

/// Relays every fetch through a forwarding endpoint, which performs the
/// upstream call and answers with the upstream status and body.
pub struct ProxyTransport {
    proxy_url: String,
    client: reqwest::Client,
}

impl ProxyTransport {
    pub fn new(proxy_url: &str) -> anyhow::Result<Self> {
        let (client, _) = build_clients()?;
        Ok(Self {
            proxy_url: proxy_url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    #[instrument(name = "ProxyFetch", skip(self, request), fields(url = %request.url))]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, RateError> {
        let body = ProxyBody {
            url: &request.url,
            args: ProxyArgs {
                timeout: request.timeout.as_secs(),
                sslverify: request.verify_tls,
                headers: &request.headers,
            },
        };
        debug!(proxy = %self.proxy_url, "Relaying request through proxy");

        let response = self
            .client
            .post(&self.proxy_url)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await?;
        read_response(response).await
    }
}
