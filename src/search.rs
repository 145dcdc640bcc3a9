//! Aggregated search: fans one query out to every configured provider,
//! scores and ranks the combined results, and keeps live (as-you-type)
//! search consistent via request-generation tokens and a small
//! recency-bounded per-query cache.

use crate::providers::{ProviderClient, SearchHit, SourceClient};

use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// Relevance tier of one result against the query. Declared in ascending
/// relevance so the derived ordering ranks `Exact` highest.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    /// No textual overlap. Kept (ranked last) rather than dropped, so the
    /// UI can show "no great matches" instead of "no results".
    NoMatch,
    Substring,
    WholeWord,
    Prefix,
    Exact,
}

fn is_word_boundary(c: Option<char>) -> bool {
    match c {
        Some(c) => !c.is_alphanumeric(),
        None => true,
    }
}

/// Case-insensitive relevance of `title` for `query`.
pub fn score(query: &str, title: &str) -> ScoreTier {
    let q = query.trim().to_lowercase();
    let t = title.trim().to_lowercase();

    if q.is_empty() || t.is_empty() {
        return ScoreTier::NoMatch;
    }

    if t == q {
        return ScoreTier::Exact;
    }

    if t.starts_with(&q) {
        return ScoreTier::Prefix;
    }

    if !t.contains(&q) {
        return ScoreTier::NoMatch;
    }

    // Substring hit; promote to a whole-word match when the occurrence is
    // bounded by non-alphanumerics on both sides.
    for (idx, _) in t.match_indices(&q) {
        let before = t[..idx].chars().next_back();
        let after = t[idx + q.len()..].chars().next();
        if is_word_boundary(before) && is_word_boundary(after) {
            return ScoreTier::WholeWord;
        }
    }

    ScoreTier::Substring
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub hit: SearchHit,
    pub tier: ScoreTier,
}

/// Per-query-string result cache, bounded by recency: holds the most
/// recently used `capacity` queries, keyed by the lowercased query.
#[derive(Debug)]
struct QueryCache {
    capacity: usize,
    entries: VecDeque<(String, Vec<RankedResult>)>,
}

impl QueryCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    fn get(&mut self, key: &str) -> Option<Vec<RankedResult>> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(pos)?;
        let results = entry.1.clone();
        self.entries.push_front(entry);
        Some(results)
    }

    fn insert(&mut self, key: String, results: Vec<RankedResult>) {
        self.entries.retain(|(k, _)| k != &key);
        self.entries.push_front((key, results));
        self.entries.truncate(self.capacity);
    }
}

/// Monotonic request-generation counter: each live search issues a token,
/// and a response is committed only while its token is still the latest.
/// A stale response never overwrites a newer one.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: AtomicU64,
}

impl RequestSequence {
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }
}

/// Fans queries out to every configured provider and ranks the combined
/// results. Owns the query cache and the live-search sequence; constructed
/// once per application lifetime.
pub struct SearchAggregator {
    providers: Vec<SourceClient>,
    cache: Mutex<QueryCache>,
    sequence: RequestSequence,
}

impl SearchAggregator {
    /// Queries remembered by the recency cache.
    pub const CACHE_CAPACITY: usize = 32;

    pub fn new(providers: Vec<SourceClient>) -> Self {
        Self {
            providers,
            cache: Mutex::new(QueryCache::new(Self::CACHE_CAPACITY)),
            sequence: RequestSequence::default(),
        }
    }

    pub fn providers(&self) -> &[SourceClient] {
        &self.providers
    }

    pub fn sequence(&self) -> &RequestSequence {
        &self.sequence
    }

    /// One aggregated search: all providers are queried concurrently, a
    /// failing provider contributes an empty list, results are deduplicated
    /// by (source, identifier) and stably ranked by tier. Results from
    /// different sources are never deduplicated against each other.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str, per_source_limit: usize) -> Vec<RankedResult> {
        let requests = self
            .providers
            .iter()
            .map(|provider| provider.search(query, per_source_limit));

        let mut seen = HashSet::new();
        let mut ranked: Vec<RankedResult> = join_all(requests)
            .await
            .into_iter()
            .flatten()
            .filter(|hit| seen.insert((hit.source, hit.identifier.clone())))
            .map(|hit| RankedResult {
                tier: score(query, &hit.title),
                hit,
            })
            .collect();

        // Stable sort: within a tier, provider response order is preserved.
        ranked.sort_by(|a, b| b.tier.cmp(&a.tier));
        ranked
    }

    /// Cached results for `query`, if a recent search stored them. The
    /// caller may show these instantly while a refresh is in flight.
    pub fn cached(&self, query: &str) -> Option<Vec<RankedResult>> {
        self.cache.lock().get(&query.trim().to_lowercase())
    }

    /// Live (as-you-type) search. Issues a generation token before the
    /// fan-out; if a newer query was issued while this one was in flight,
    /// the response is discarded and `None` is returned, so only the most
    /// recent query's results are ever committed.
    pub async fn live_search(
        &self,
        query: &str,
        per_source_limit: usize,
    ) -> Option<Vec<RankedResult>> {
        let token = self.sequence.issue();

        let results = self.search(query, per_source_limit).await;

        if !self.sequence.is_current(token) {
            tracing::debug!("discarding stale results for {query:?}");
            return None;
        }

        self.cache
            .lock()
            .insert(query.trim().to_lowercase(), results.clone());

        Some(results)
    }
}
