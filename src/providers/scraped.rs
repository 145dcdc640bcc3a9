//! Client for the scraped-source proxy services (Mangapill, WeebCentral,
//! AsuraScans). The three deployments expose the same operations but spell
//! their paths and parameters differently; [`EndpointStyle`] captures the
//! spelling so one client covers all of them.

use super::{Error, HttpClient, ProviderClient, Result, SearchHit};
use crate::model::{
    DisplayNumber, NormalizedChapter, NormalizedManga, Provider, DEFAULT_DESCRIPTION,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use std::collections::HashSet;

/// Which endpoint dialect a proxy deployment speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStyle {
    /// `/manga?url=`, `/chapter_pages?url=`, `/image_proxy?url=`
    QueryUrl,
    /// `/manga?id_or_url=`, `/chapter/pages?id_or_url=`, `/image?url=`
    IdOrUrl,
}

impl EndpointStyle {
    pub fn for_provider(source: Provider) -> EndpointStyle {
        match source {
            Provider::WeebCentral => EndpointStyle::IdOrUrl,
            _ => EndpointStyle::QueryUrl,
        }
    }

    fn manga_param(&self) -> &'static str {
        match self {
            EndpointStyle::QueryUrl => "url",
            EndpointStyle::IdOrUrl => "id_or_url",
        }
    }

    fn pages_path(&self) -> &'static str {
        match self {
            EndpointStyle::QueryUrl => "chapter_pages",
            EndpointStyle::IdOrUrl => "chapter/pages",
        }
    }

    fn image_path(&self) -> &'static str {
        match self {
            EndpointStyle::QueryUrl => "image_proxy",
            EndpointStyle::IdOrUrl => "image",
        }
    }
}

/// Raw search entry. Everything optional; deployments disagree on names.
/// `url` and `id` are separate fields (not serde aliases) because some
/// deployments send both on the same record.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawSearchResult {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "cover", alias = "image")]
    pub cover_url: Option<String>,
}

impl RawSearchResult {
    fn identifier(&self) -> Option<String> {
        self.url.clone().or_else(|| self.id.clone())
    }
}

/// Raw chapter entry inside a manga record.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawChapter {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    /// Numeric on some deployments, a string on others.
    #[serde(default, alias = "chapter")]
    pub number: Option<Value>,
    #[serde(default, alias = "date")]
    pub updated_at: Option<String>,
}

impl RawChapter {
    fn identifier(&self) -> Option<String> {
        self.url.clone().or_else(|| self.id.clone())
    }

    fn number_text(&self) -> Option<String> {
        match &self.number {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Raw manga record returned by `/manga`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RawScrapedManga {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default, alias = "genres")]
    pub tags: Vec<String>,
    #[serde(default, alias = "cover", alias = "image")]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub chapters: Vec<RawChapter>,
}

#[derive(Debug, Clone)]
pub struct ScrapedClient {
    source: Provider,
    base_url: String,
    style: EndpointStyle,
    http: HttpClient,
}

impl ScrapedClient {
    /// `base_url` comes from configuration; a trailing slash is stripped so
    /// URL assembly stays uniform.
    pub fn new(source: Provider, base_url: &str, http: HttpClient) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        if Url::parse(&base_url).is_err() {
            return Err(Error::InvalidBaseUrl {
                provider: source,
                base_url,
            });
        }

        Ok(Self {
            source,
            style: EndpointStyle::for_provider(source),
            base_url,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Some deployments wrap their payload in `{"results": ...}`.
    fn unwrap_results(body: Value) -> Value {
        match body {
            Value::Object(mut map) => map.remove("results").unwrap_or(Value::Object(map)),
            other => other,
        }
    }

    async fn get_endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}/{path}", self.base_url);
        let (status, body) = self.http.get_json(&url, params).await?;

        if !status.is_success() {
            return Err(Error::StatusError {
                provider: self.source,
                status,
            });
        }

        Ok(Self::unwrap_results(body))
    }

    /// `GET /search?q=&limit=`
    #[tracing::instrument(skip(self))]
    pub async fn search_raw(&self, query: &str, limit: usize) -> Result<Vec<RawSearchResult>> {
        let limit = limit.to_string();
        let body = self
            .get_endpoint("search", &[("q", query), ("limit", &limit)])
            .await?;

        Ok(serde_json::from_value(body)?)
    }

    /// `GET /manga?url=` (or `?id_or_url=`)
    #[tracing::instrument(skip(self))]
    pub async fn get_manga(&self, identifier: &str) -> Result<RawScrapedManga> {
        let body = self
            .get_endpoint("manga", &[(self.style.manga_param(), identifier)])
            .await?;

        Ok(serde_json::from_value(body)?)
    }

    /// `GET /chapter_pages?url=` (or `/chapter/pages?id_or_url=`)
    #[tracing::instrument(skip(self))]
    pub async fn get_chapter_pages(&self, identifier: &str) -> Result<Vec<String>> {
        let body = self
            .get_endpoint(
                self.style.pages_path(),
                &[(self.style.manga_param(), identifier)],
            )
            .await?;

        // Either a bare array of URLs or {"pages": [...]}.
        let pages = match body {
            Value::Object(mut map) => map.remove("pages").ok_or(Error::ParseError)?,
            other => other,
        };

        Ok(serde_json::from_value(pages)?)
    }
}

/// Converts one raw scraped record into the canonical shape. Pure; tolerates
/// every field being absent. Image URLs must already be proxied by the
/// caller (the client does this before handing records out).
pub fn normalize_scraped(source: Provider, raw: &RawScrapedManga) -> NormalizedManga {
    let title = match &raw.title {
        Some(t) if !t.trim().is_empty() => t.clone(),
        _ => source.placeholder_title(),
    };

    let description = match &raw.description {
        Some(d) if !d.trim().is_empty() => d.clone(),
        _ => DEFAULT_DESCRIPTION.to_string(),
    };

    // Chapter identifiers must be unique within the list; drop entries
    // without an address and repeated addresses, keeping the first.
    let mut seen = HashSet::new();
    let chapters = raw
        .chapters
        .iter()
        .filter_map(|ch| {
            let identifier = ch.identifier()?;
            if !seen.insert(identifier.clone()) {
                return None;
            }

            Some(NormalizedChapter {
                display_number: DisplayNumber::from_signals(
                    ch.number_text().as_deref(),
                    ch.name.as_deref(),
                    Some(&identifier),
                ),
                identifier,
                title: ch.name.clone(),
                updated_at: ch.updated_at.clone(),
            })
        })
        .collect();

    NormalizedManga {
        source,
        source_id: raw
            .url
            .clone()
            .or_else(|| raw.id.clone())
            .unwrap_or_default(),
        title,
        description,
        authors: raw.authors.clone(),
        artists: raw.artists.clone(),
        tags: raw.tags.clone(),
        cover_url: raw.cover_url.clone(),
        chapters,
    }
}

impl ProviderClient for ScrapedClient {
    fn source(&self) -> Provider {
        self.source
    }

    /// Routes upstream CDN URLs through the deployment's image proxy.
    /// URLs already pointing at the proxy pass through unchanged, so the
    /// rewrite never double-wraps.
    fn proxied(&self, src: &str) -> String {
        if src.is_empty() || src.starts_with(&self.base_url) {
            return src.to_string();
        }

        match Url::parse(&format!("{}/{}", self.base_url, self.style.image_path())) {
            Ok(mut proxy) => {
                proxy.query_pairs_mut().append_pair("url", src);
                proxy.into()
            }
            // base_url was validated at construction; keep the raw URL
            // rather than panic if it still fails to combine.
            Err(_) => src.to_string(),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let found = match self.search_raw(query, limit).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("{} search failed: {e}", self.source);
                return Vec::new();
            }
        };

        found
            .into_iter()
            .filter_map(|raw| {
                let identifier = raw.identifier()?;
                Some(SearchHit {
                    source: self.source,
                    title: match raw.title {
                        Some(t) if !t.trim().is_empty() => t,
                        _ => self.source.placeholder_title(),
                    },
                    cover_url: raw.cover_url.map(|c| self.proxied(&c)),
                    identifier,
                })
            })
            .collect()
    }

    async fn fetch_details(&self, identifier: &str) -> Option<NormalizedManga> {
        let raw = match self.get_manga(identifier).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{} details for {identifier} unavailable: {e}", self.source);
                return None;
            }
        };

        let mut normalized = normalize_scraped(self.source, &raw);
        if normalized.source_id.is_empty() {
            normalized.source_id = identifier.to_string();
        }
        normalized.cover_url = normalized.cover_url.map(|c| self.proxied(&c));

        Some(normalized)
    }

    async fn fetch_chapter_pages(&self, identifier: &str) -> Vec<String> {
        match self.get_chapter_pages(identifier).await {
            Ok(pages) => pages.iter().map(|p| self.proxied(p)).collect(),
            Err(e) => {
                tracing::warn!("{} pages for {identifier} unavailable: {e}", self.source);
                Vec::new()
            }
        }
    }
}
