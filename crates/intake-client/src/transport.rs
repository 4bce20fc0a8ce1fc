//! HTTP access for the controller.
//!
//! Pages talk to the network only through [`Transport`], so tests can swap
//! in a scripted implementation and the real one can share a connection
//! pool across pages.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, instrument};

use crate::error::{ClientError, Result};

/// A response as the controller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// Raw body.
    pub body: Bytes,
}

impl Reply {
    /// Whether the status was 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Network access used by the pages.
///
/// Paths are site-relative (already resolved through the base path) or
/// absolute URLs. Non-success statuses are returned, not raised.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Fetches a document, bypassing caches.
    async fn get(&self, path: &str) -> Result<Reply>;

    /// Posts a JSON body with extra headers.
    async fn post_json(&self, path: &str, headers: &[(&str, String)], body: Vec<u8>)
        -> Result<Reply>;
}

/// [`Transport`] over `reqwest`, rooted at a site origin.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    origin: Url,
}

impl HttpTransport {
    /// Creates a transport for pages served from `origin`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` when `origin` is not a URL.
    pub fn new(client: reqwest::Client, origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)
            .map_err(|e| ClientError::InvalidUrl { url: origin.to_string(), message: e.to_string() })?;
        Ok(Self { client, origin })
    }

    /// Site origin requests are resolved against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| ClientError::InvalidUrl { url: path.to_string(), message: e.to_string() })
    }

    async fn reply(url: &Url, response: reqwest::Response) -> Result<Reply> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e.to_string()))?;
        debug!(%url, status, "Response received");
        Ok(Reply { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(name = "controller_get", skip(self))]
    async fn get(&self, path: &str) -> Result<Reply> {
        let url = self.url_for(path)?;
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e.to_string()))?;
        Self::reply(&url, response).await
    }

    #[instrument(name = "controller_post", skip(self, headers, body), fields(body_bytes = body.len()))]
    async fn post_json(
        &self,
        path: &str,
        headers: &[(&str, String)],
        body: Vec<u8>,
    ) -> Result<Reply> {
        let url = self.url_for(path)?;
        let mut request = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ORIGIN, self.origin.origin().ascii_serialization());
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| ClientError::transport(url.as_str(), e.to_string()))?;
        Self::reply(&url, response).await
    }
}
