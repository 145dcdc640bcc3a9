//! Orchestration layer: one [`MangaHub`] owns every configured provider
//! client and the search aggregator, and drives the merge flow: fetch the
//! metadata record from MangaDex, locate the same work on a chapter-hosting
//! source (directly addressed or resolved by title), and fold the two into
//! a [`MergedManga`].

use crate::config::Config;
use crate::merge;
use crate::model::{MergeConfidence, MergedManga, NormalizedManga, Provider};
use crate::providers::mangadex::MangaDexClient;
use crate::providers::scraped::ScrapedClient;
use crate::providers::{Error, HttpClient, ProviderClient, Result, SourceClient};
use crate::search::{score, RankedResult, ScoreTier, SearchAggregator};

pub struct MangaHub {
    mangadex: Option<MangaDexClient>,
    scraped: Vec<ScrapedClient>,
    aggregator: SearchAggregator,
}

impl MangaHub {
    /// Candidates requested per provider when resolving a cross-provider
    /// match by title.
    const RESOLVE_LIMIT: usize = 20;

    /// Builds every configured provider client. Fails fast when the
    /// configuration enables no provider at all; per-request failures are
    /// never fatal, but a reader with zero sources is.
    pub fn new(config: &Config) -> Result<Self> {
        if !config.any_provider_configured() {
            return Err(Error::NoProvidersConfigured);
        }

        let http = HttpClient::new(config.request_timeout)?;

        let mangadex = config
            .mangadex_enabled
            .then(|| MangaDexClient::new(http.clone()));

        let mut scraped = Vec::new();
        for (source, base_url) in config.scraped_sources() {
            scraped.push(ScrapedClient::new(source, base_url, http.clone())?);
        }

        Ok(Self::from_clients(mangadex, scraped))
    }

    /// Assembles a hub from already-built clients, for tests that point
    /// providers at mock servers.
    pub fn from_clients(mangadex: Option<MangaDexClient>, scraped: Vec<ScrapedClient>) -> Self {
        let mut providers = Vec::new();
        if let Some(md) = &mangadex {
            providers.push(SourceClient::MangaDex(md.clone()));
        }
        providers.extend(scraped.iter().cloned().map(SourceClient::Scraped));

        Self {
            mangadex,
            scraped,
            aggregator: SearchAggregator::new(providers),
        }
    }

    pub fn aggregator(&self) -> &SearchAggregator {
        &self.aggregator
    }

    /// Aggregated multi-provider search; see [`SearchAggregator::search`].
    pub async fn search(&self, query: &str, per_source_limit: usize) -> Vec<RankedResult> {
        self.aggregator.search(query, per_source_limit).await
    }

    fn scraped_client(&self, source: Provider) -> Option<&ScrapedClient> {
        self.scraped.iter().find(|c| c.source() == source)
    }

    /// Locates the same work on a chapter-hosting source by title search,
    /// consulting scraped providers in configuration order and taking the
    /// first ranked candidate. A candidate with no textual overlap at all
    /// is rejected rather than merged; an exact title match is reported as
    /// [`MergeConfidence::TitleMatch`], anything weaker as
    /// [`MergeConfidence::Fuzzy`].
    #[tracing::instrument(skip(self))]
    pub async fn resolve_chapter_source(
        &self,
        title: &str,
    ) -> Option<(NormalizedManga, MergeConfidence)> {
        for client in &self.scraped {
            let hits = client.search(title, Self::RESOLVE_LIMIT).await;

            let Some(best) = hits.first() else {
                continue;
            };

            let confidence = match score(title, &best.title) {
                ScoreTier::NoMatch => {
                    tracing::debug!(
                        "rejecting {} candidate {:?} for {title:?}: no textual match",
                        client.source(),
                        best.title
                    );
                    continue;
                }
                ScoreTier::Exact => MergeConfidence::TitleMatch,
                _ => MergeConfidence::Fuzzy,
            };

            if let Some(record) = client.fetch_details(&best.identifier).await {
                return Some((record, confidence));
            }
        }

        None
    }

    /// Full merged record for one work.
    ///
    /// `mangadex_id` addresses the metadata record; `chapter_hint`
    /// addresses the chapter-hosting record directly when the caller
    /// already knows it (a favorites entry), otherwise the chapter source
    /// is resolved by title. Every combination degrades instead of
    /// erroring: no metadata yields a source-only record, no chapter
    /// source yields a metadata-only record, and only when neither side
    /// produced anything is `None` returned.
    #[tracing::instrument(skip(self))]
    pub async fn merged_details(
        &self,
        mangadex_id: Option<&str>,
        chapter_hint: Option<(Provider, &str)>,
    ) -> Option<MergedManga> {
        let (metadata, hinted) = match (mangadex_id, chapter_hint) {
            // Both addresses known: fetch the two records concurrently.
            (Some(md_id), Some((source, identifier))) => {
                let chapter_fut = async {
                    match self.scraped_client(source) {
                        Some(client) => client.fetch_details(identifier).await,
                        None => {
                            tracing::warn!("no configured client for {source}");
                            None
                        }
                    }
                };
                match &self.mangadex {
                    Some(md) => {
                        let (metadata, hinted) =
                            tokio::join!(md.fetch_details(md_id), chapter_fut);
                        (metadata, hinted)
                    }
                    None => (None, chapter_fut.await),
                }
            }
            (Some(md_id), None) => match &self.mangadex {
                Some(md) => (md.fetch_details(md_id).await, None),
                None => (None, None),
            },
            (None, Some((source, identifier))) => match self.scraped_client(source) {
                Some(client) => (None, client.fetch_details(identifier).await),
                None => {
                    tracing::warn!("no configured client for {source}");
                    (None, None)
                }
            },
            (None, None) => (None, None),
        };

        if let Some(chapter_source) = hinted {
            return Some(merge::merge(metadata.as_ref(), &chapter_source));
        }

        // No direct address for the chapter source: resolve it through the
        // metadata title. Best-effort; the pairing is heuristic.
        if let Some(metadata) = metadata {
            if let Some((chapter_source, confidence)) =
                self.resolve_chapter_source(&metadata.title).await
            {
                return Some(
                    merge::merge(Some(&metadata), &chapter_source).with_confidence(confidence),
                );
            }

            return Some(merge::from_metadata(&metadata));
        }

        None
    }

    /// Ordered page image URLs for one chapter, routed to the provider the
    /// chapter belongs to. Empty on failure or unconfigured source.
    #[tracing::instrument(skip(self))]
    pub async fn chapter_pages(&self, source: Provider, identifier: &str) -> Vec<String> {
        match source {
            Provider::MangaDex => match &self.mangadex {
                Some(md) => md.fetch_chapter_pages(identifier).await,
                None => {
                    tracing::warn!("mangadex is disabled");
                    Vec::new()
                }
            },
            _ => match self.scraped_client(source) {
                Some(client) => client.fetch_chapter_pages(identifier).await,
                None => {
                    tracing::warn!("no configured client for {source}");
                    Vec::new()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fails_fast_with_no_providers() {
        let config = Config {
            mangadex_enabled: false,
            ..Config::default()
        };

        assert!(matches!(
            MangaHub::new(&config),
            Err(Error::NoProvidersConfigured)
        ));
    }

    #[test]
    fn new_builds_one_client_per_configured_source() {
        let config = Config {
            mangapill_base: Some("https://mp.example.com".to_string()),
            weebcentral_base: Some("https://wc.example.com".to_string()),
            ..Config::default()
        };

        let hub = MangaHub::new(&config).unwrap();
        assert_eq!(hub.aggregator().providers().len(), 3);
        assert!(hub.scraped_client(Provider::Mangapill).is_some());
        assert!(hub.scraped_client(Provider::AsuraScans).is_none());
    }
}
