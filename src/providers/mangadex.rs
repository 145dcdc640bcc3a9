//! MangaDex client: entities, query builders and the pure normalizer.
//!
//! All queries here can be constructed with the builder syntax from the
//! [bon] crate and are serialized with [serde_qs], which produces the
//! `includes[0]=...` style the server accepts.

use super::{
    EmptyQuery, Error, HttpClient, ProviderClient, Query, Result, SearchHit, ServerResponseError,
};
use crate::model::{
    DisplayNumber, NormalizedChapter, NormalizedManga, Provider, DEFAULT_DESCRIPTION,
};

use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::collections::{BTreeMap, HashMap};

/// Multilingual text field. A `BTreeMap` so the "first available language"
/// fallback in [`pick_en`] is deterministic.
pub type LocalizedString = BTreeMap<String, String>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Manga,
    CoverArt,
    Chapter,
    Author,
    Artist,
    Creator,
    ScanlationGroup,
    Tag,
    User,
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub attributes: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum MangaStatus {
    Completed,
    Ongoing,
    Cancelled,
    Hiatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    Safe,
    Suggestive,
    Erotica,
    Pornographic,
}

impl ContentRating {
    /// The app allows every rating; filtering is a UI concern.
    pub fn all() -> Vec<ContentRating> {
        vec![
            ContentRating::Safe,
            ContentRating::Suggestive,
            ContentRating::Erotica,
            ContentRating::Pornographic,
        ]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, std::hash::Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderOption {
    Chapter,
    CreatedAt,
    UpdatedAt,
    Relevance,
}

pub type SortingOptions = HashMap<OrderOption, Order>;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TagGroup {
    Content,
    Format,
    Genre,
    Theme,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TagAttributes {
    #[serde(default)]
    pub name: LocalizedString,
    #[serde(default)]
    pub description: LocalizedString,
    pub group: Option<TagGroup>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Tag {
    pub id: String,
    #[serde(rename(deserialize = "type"))]
    pub entity_type: EntityType,
    pub attributes: TagAttributes,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MangaAttributes {
    #[serde(default)]
    pub title: LocalizedString,
    #[serde(default)]
    pub alt_titles: Vec<LocalizedString>,
    #[serde(default)]
    pub description: LocalizedString,
    pub original_language: Option<String>,
    pub last_chapter: Option<String>,
    pub status: Option<MangaStatus>,
    pub year: Option<isize>,
    pub content_rating: Option<ContentRating>,
    #[serde(default)]
    pub available_translated_languages: Vec<Option<String>>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Manga {
    pub id: String,
    #[serde(rename(deserialize = "type"))]
    pub entity_type: EntityType,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Attributes carried by `author`/`artist` relationships when the search
/// was issued with the matching `includes[]`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthorAttributes {
    pub name: String,
}

/// Attributes carried by `cover_art` relationships.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CoverArtAttributes {
    pub file_name: String,
    pub volume: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    pub title: Option<String>,
    pub volume: Option<String>,
    pub chapter: Option<String>,
    #[serde(default)]
    pub pages: usize,
    pub translated_language: Option<String>,
    pub external_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Chapter {
    pub id: String,
    #[serde(rename(deserialize = "type"))]
    pub entity_type: EntityType,
    pub attributes: ChapterAttributes,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMeta {
    pub hash: String,
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDownloadMeta {
    pub result: String,
    pub base_url: String,
    pub chapter: ChapterMeta,
}

/// [Entity] is implemented for all structs that appear in the `data` field
/// of server responses
pub trait Entity {}
impl<T: Entity> Entity for Vec<T> {}
impl Entity for Manga {}
impl Entity for Chapter {}

pub trait ResponseResultOk {
    fn response_result_ok(&self) -> Result<bool>;
}

impl ResponseResultOk for Value {
    fn response_result_ok(&self) -> Result<bool> {
        let result = match self.get("result") {
            Some(status) => status,
            None => return Err(Error::ParseError),
        };

        match result.as_str() {
            Some(s) => Ok(s == "ok"),
            None => Err(Error::ParseError),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Builder)]
#[serde(rename_all = "camelCase")]
pub struct MangaQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub includes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_translated_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_rating: Option<Vec<ContentRating>>,
}

impl Query for MangaQuery {}

impl MangaQuery {
    /// The exact parameter set the reader issues for a title search:
    /// cover/author/artist included, Japanese originals translated to
    /// English, every content rating allowed.
    pub fn for_search(title: &str, limit: usize) -> Self {
        MangaQuery::builder()
            .title(title.to_string())
            .limit(limit)
            .includes(serde_json::json!(["cover_art", "author", "artist"]))
            .original_language(vec!["ja".to_string()])
            .available_translated_language(vec!["en".to_string()])
            .content_rating(ContentRating::all())
            .build()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ChapterQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manga: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_language: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortingOptions>,
}

impl Query for ChapterQuery {}

impl ChapterQuery {
    pub fn for_manga(manga_id: &str, limit: usize, offset: usize) -> Self {
        let mut order = HashMap::new();
        order.insert(OrderOption::Chapter, Order::Desc);

        ChapterQuery::builder()
            .manga(manga_id.to_string())
            .translated_language(vec!["en".to_string()])
            .limit(limit)
            .offset(offset)
            .order(order)
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct MangaDexClient {
    http: HttpClient,
    base_url: String,
}

impl MangaDexClient {
    pub const BASE_URL: &str = "https://api.mangadex.org";
    pub const COVERS_URL: &str = "https://uploads.mangadex.org/covers";

    /// Chapters fetched per feed page; the server caps this at 500.
    pub const CHAPTER_PAGE_LIMIT: usize = 100;

    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Points the client at a different server, for tests against a mock.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Deserializes responses whose payload lives in the `data` field
    pub fn parse_respond_data<T>(mut resp: Value) -> Result<T>
    where
        for<'a> T: Entity + Deserialize<'a> + Serialize,
    {
        let responded_without_errors = resp.response_result_ok()?;

        if responded_without_errors {
            let data = match resp.get_mut("data") {
                Some(d) => d,
                None => return Err(Error::ParseError),
            };

            Ok(serde_json::from_value::<T>(data.take())?)
        } else {
            let errors = match resp.get_mut("errors") {
                Some(d) => d,
                None => return Err(Error::ParseError),
            };

            let err: Vec<ServerResponseError> = serde_json::from_value(errors.take())?;

            Err(Self::classify_errors(err))
        }
    }

    /// MangaDex reports failures inside the body; the status of the first
    /// reported error selects the variant.
    fn classify_errors(errors: Vec<ServerResponseError>) -> Error {
        match errors.first().map(|e| e.status) {
            Some(404) => Error::NotFoundError(errors),
            _ => Error::BadRequestError(errors),
        }
    }

    /// Searches for manga with the parameters specified by `data`
    #[tracing::instrument(skip(self))]
    pub async fn search_manga(&self, data: &MangaQuery) -> Result<Vec<Manga>> {
        let resp: Value = self
            .http
            .query(&format!("{}/manga", self.base_url), data)
            .await?
            .json()
            .await?;

        Self::parse_respond_data(resp)
    }

    /// Shorthand for searching manga just by name
    pub async fn search_manga_by_name(&self, name: &str, limit: usize) -> Result<Vec<Manga>> {
        self.search_manga(&MangaQuery::for_search(name, limit)).await
    }

    /// Queries for the full record of the manga with the given `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_manga(&self, id: &str) -> Result<Manga> {
        let query = MangaQuery::builder()
            .includes(serde_json::json!(["cover_art", "author", "artist"]))
            .build();

        let resp: Value = self
            .http
            .query(&format!("{}/manga/{id}", self.base_url), &query)
            .await?
            .json()
            .await?;

        Self::parse_respond_data(resp)
    }

    /// Queries one page of the English chapter feed of the manga with the
    /// given `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_manga_chapters(&self, data: &ChapterQuery) -> Result<Vec<Chapter>> {
        let resp: Value = self
            .http
            .query(&format!("{}/chapter", self.base_url), data)
            .await?
            .json()
            .await?;

        Self::parse_respond_data(resp)
    }

    /// Queries for the meta info needed to build page URLs for the chapter
    /// with the given `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_chapter_download_meta(&self, id: &str) -> Result<ChapterDownloadMeta> {
        let mut resp: Value = self
            .http
            .query(
                &format!("{}/at-home/server/{id}", self.base_url),
                &EmptyQuery {},
            )
            .await?
            .json()
            .await?;

        let responded_without_errors = resp.response_result_ok()?;

        if responded_without_errors {
            Ok(serde_json::from_value(resp)?)
        } else {
            let errors: Vec<ServerResponseError> =
                serde_json::from_value(resp["errors"].take())?;

            Err(Self::classify_errors(errors))
        }
    }
}

/// Picks the English value of a localized field when present, else the
/// first available language value, else an empty string. Applied
/// identically to titles, descriptions and tag names.
pub fn pick_en(localized: &LocalizedString) -> String {
    if let Some(en) = localized.get("en") {
        return en.clone();
    }

    localized.values().next().cloned().unwrap_or_default()
}

/// Cover URL format served by the MangaDex CDN, at the 512px size.
pub fn cover_url(manga_id: &str, file_name: &str) -> String {
    format!(
        "{}/{manga_id}/{file_name}.512.jpg",
        MangaDexClient::COVERS_URL
    )
}

/// Ordered page URLs for one chapter: `{baseUrl}/data/{hash}/{filename}`.
pub fn page_urls(meta: &ChapterDownloadMeta) -> Vec<String> {
    meta.chapter
        .data
        .iter()
        .map(|filename| format!("{}/data/{}/{filename}", meta.base_url, meta.chapter.hash))
        .collect()
}

fn relationship_names(manga: &Manga, wanted: EntityType) -> Vec<String> {
    manga
        .relationships
        .iter()
        .filter(|r| r.entity_type == wanted)
        .filter_map(|r| r.attributes.clone())
        .filter_map(|attrs| serde_json::from_value::<AuthorAttributes>(attrs).ok())
        .map(|attrs| attrs.name)
        .collect()
}

fn relationship_cover(manga: &Manga) -> Option<String> {
    manga
        .relationships
        .iter()
        .find(|r| r.entity_type == EntityType::CoverArt)
        .and_then(|r| r.attributes.clone())
        .and_then(|attrs| serde_json::from_value::<CoverArtAttributes>(attrs).ok())
        .map(|attrs| cover_url(&manga.id, &attrs.file_name))
}

/// Converts one MangaDex manga entity into the canonical record. Pure; the
/// chapter list stays empty (chapters come from a separate endpoint).
pub fn normalize(manga: &Manga) -> NormalizedManga {
    let title = pick_en(&manga.attributes.title);
    let title = if title.trim().is_empty() {
        Provider::MangaDex.placeholder_title()
    } else {
        title
    };

    let description = pick_en(&manga.attributes.description);
    let description = if description.trim().is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        description
    };

    let tags = manga
        .attributes
        .tags
        .iter()
        .map(|t| pick_en(&t.attributes.name))
        .filter(|name| !name.is_empty())
        .collect();

    NormalizedManga {
        source: Provider::MangaDex,
        source_id: manga.id.clone(),
        title,
        description,
        authors: relationship_names(manga, EntityType::Author),
        artists: relationship_names(manga, EntityType::Artist),
        tags,
        cover_url: relationship_cover(manga),
        chapters: Vec::new(),
    }
}

/// Converts one feed chapter into the canonical record.
pub fn normalize_chapter(chapter: &Chapter) -> NormalizedChapter {
    NormalizedChapter {
        identifier: chapter.id.clone(),
        display_number: DisplayNumber::from_signals(
            chapter.attributes.chapter.as_deref(),
            chapter.attributes.title.as_deref(),
            None,
        ),
        title: chapter.attributes.title.clone(),
        updated_at: chapter.attributes.updated_at.clone(),
    }
}

impl ProviderClient for MangaDexClient {
    fn source(&self) -> Provider {
        Provider::MangaDex
    }

    /// MangaDex CDN URLs are fetched directly; the rewrite is the identity
    /// and therefore trivially idempotent.
    fn proxied(&self, src: &str) -> String {
        src.to_string()
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let found = match self.search_manga_by_name(query, limit).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("mangadex search failed: {e}");
                return Vec::new();
            }
        };

        found
            .iter()
            .map(|manga| {
                let title = pick_en(&manga.attributes.title);
                SearchHit {
                    source: Provider::MangaDex,
                    identifier: manga.id.clone(),
                    title: if title.trim().is_empty() {
                        Provider::MangaDex.placeholder_title()
                    } else {
                        title
                    },
                    cover_url: relationship_cover(manga),
                }
            })
            .collect()
    }

    async fn fetch_details(&self, identifier: &str) -> Option<NormalizedManga> {
        let manga = match self.get_manga(identifier).await {
            Ok(manga) => manga,
            Err(e) => {
                tracing::warn!("mangadex details for {identifier} unavailable: {e}");
                return None;
            }
        };

        let mut normalized = normalize(&manga);

        // MangaDex is also a chapter host: fill the chapter list from the
        // feed endpoint, degrading to an empty list on failure.
        let query = ChapterQuery::for_manga(identifier, Self::CHAPTER_PAGE_LIMIT, 0);
        match self.get_manga_chapters(&query).await {
            Ok(chapters) => {
                normalized.chapters = chapters.iter().map(normalize_chapter).collect();
            }
            Err(e) => tracing::warn!("mangadex chapter feed for {identifier} failed: {e}"),
        }

        Some(normalized)
    }

    async fn fetch_chapter_pages(&self, identifier: &str) -> Vec<String> {
        match self.get_chapter_download_meta(identifier).await {
            Ok(meta) => page_urls(&meta),
            Err(e) => {
                tracing::warn!("mangadex pages for {identifier} unavailable: {e}");
                Vec::new()
            }
        }
    }
}
