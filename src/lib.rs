//! Multi-source manga aggregation and normalization layer for the MangaKo
//! reader.
//!
//! Queries several heterogeneous content providers (the MangaDex public
//! API plus scraped-source proxy deployments for Mangapill, WeebCentral and
//! AsuraScans), normalizes their divergent response shapes into one
//! canonical manga/chapter model, merges partial records from different
//! sources into a single coherent entity, and resolves chapter ordering
//! and pagination across providers that address chapters by opaque ids or
//! by URLs.

pub mod config;
pub mod hub;
pub mod merge;
pub mod model;
pub mod order;
pub mod providers;
pub mod search;

pub use config::Config;
pub use hub::MangaHub;
pub use model::{
    DisplayNumber, MergeConfidence, MergedManga, NormalizedChapter, NormalizedManga, Provider,
};
pub use providers::{ProviderClient, SearchHit};
pub use search::{RankedResult, ScoreTier};
