//! Provider clients: one per content source, all behind the same
//! degrade-to-empty contract.
//!
//! The inner per-provider APIs are fallible and return [`Result`]; the
//! [`ProviderClient`] surface consumed by the aggregation layer swallows
//! transport/decode failures (logging them) and returns empty/`None`
//! instead, so a broken source can never crash a multi-source operation.

pub mod mangadex;
pub mod scraped;

use crate::model::{NormalizedManga, Provider};
use mangadex::MangaDexClient;
use scraped::ScrapedClient;

use reqwest::Response;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use std::time::Duration;

/// Used to deserialize errors returned from MangaDex servers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerResponseError {
    pub id: String,
    pub status: i32,
    pub title: String,
    pub detail: Option<String>,
    pub context: Option<String>,
}

/// All errors that can be emitted by this crate's fallible functions
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    RequestWithMiddlewareError(#[from] reqwest_middleware::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    QsError(#[from] serde_qs::Error),
    #[error("error while parsing json value")]
    ParseError,
    #[error("bad request server response")]
    BadRequestError(Vec<ServerResponseError>),
    #[error("404 server response")]
    NotFoundError(Vec<ServerResponseError>),
    #[error("{provider} responded with status {status}")]
    StatusError {
        provider: Provider,
        status: reqwest::StatusCode,
    },
    #[error("invalid base url for {provider}: {base_url}")]
    InvalidBaseUrl {
        provider: Provider,
        base_url: String,
    },
    #[error("no provider base url configured")]
    NoProvidersConfigured,
}

/// Type alias for the [`Result`](std::result::Result) that is used in the crate's functions
pub type Result<T> = std::result::Result<T, Error>;

/// Implemented by all structs that serialize into a URL query string
pub trait Query: Serialize + std::fmt::Debug {}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Copy)]
pub struct EmptyQuery {}
impl Query for EmptyQuery {}

/// Shared HTTP stack: one reqwest client behind tracing middleware, cloned
/// into every provider client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ClientWithMiddleware,
}

impl HttpClient {
    pub const USER_AGENT: &str = "MangaKo/0.1";

    /// No timeout by default: a hung request is only abandoned by query
    /// supersession, never by a deadline (see [`crate::config::Config`]).
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(Self::USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = reqwest_middleware::ClientBuilder::new(builder.build()?)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self { client })
    }

    /// Lowest level function that executes an arbitrary [Query] and returns its response
    #[tracing::instrument(skip(self))]
    pub async fn query(&self, base_url: &str, query: &impl Query) -> Result<Response> {
        let query_data = serde_qs::to_string(query)?;

        let url = if query_data.is_empty() {
            base_url.to_string()
        } else {
            format!("{base_url}?{query_data}")
        };

        Ok(self.client.get(url).send().await?)
    }

    /// GET with form-style parameters, decoded as JSON
    #[tracing::instrument(skip(self))]
    pub async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<(reqwest::StatusCode, Value)> {
        let resp = self.client.get(url).query(params).send().await?;
        let status = resp.status();
        let body = resp.json::<Value>().await?;

        Ok((status, body))
    }
}

/// Minimal hot-path normalization of one search result: full normalization
/// is deferred until a result is selected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub source: Provider,
    /// Source-local id (MangaDex UUID) or URL (scraped sources).
    pub identifier: String,
    pub title: String,
    /// Already rewritten through the provider's image proxy.
    pub cover_url: Option<String>,
}

/// Uniform capability contract of one content source.
///
/// Every operation degrades on failure instead of propagating: `search`
/// and `fetch_chapter_pages` return empty sequences, `fetch_details`
/// returns `None`. Not-found is not distinguished from transport failure
/// beyond logging; callers treat both as "unknown". No retries.
#[allow(async_fn_in_trait)]
pub trait ProviderClient {
    fn source(&self) -> Provider;

    /// Rewrites an image URL through this provider's proxy. Idempotent:
    /// already-proxied URLs pass through unchanged.
    fn proxied(&self, src: &str) -> String;

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit>;

    async fn fetch_details(&self, identifier: &str) -> Option<NormalizedManga>;

    async fn fetch_chapter_pages(&self, identifier: &str) -> Vec<String>;
}

/// One concrete client per configured source, selected by configuration.
#[derive(Debug, Clone)]
pub enum SourceClient {
    MangaDex(MangaDexClient),
    Scraped(ScrapedClient),
}

impl ProviderClient for SourceClient {
    fn source(&self) -> Provider {
        match self {
            SourceClient::MangaDex(c) => c.source(),
            SourceClient::Scraped(c) => c.source(),
        }
    }

    fn proxied(&self, src: &str) -> String {
        match self {
            SourceClient::MangaDex(c) => c.proxied(src),
            SourceClient::Scraped(c) => c.proxied(src),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        match self {
            SourceClient::MangaDex(c) => c.search(query, limit).await,
            SourceClient::Scraped(c) => c.search(query, limit).await,
        }
    }

    async fn fetch_details(&self, identifier: &str) -> Option<NormalizedManga> {
        match self {
            SourceClient::MangaDex(c) => c.fetch_details(identifier).await,
            SourceClient::Scraped(c) => c.fetch_details(identifier).await,
        }
    }

    async fn fetch_chapter_pages(&self, identifier: &str) -> Vec<String> {
        match self {
            SourceClient::MangaDex(c) => c.fetch_chapter_pages(identifier).await,
            SourceClient::Scraped(c) => c.fetch_chapter_pages(identifier).await,
        }
    }
}
