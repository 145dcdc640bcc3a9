//! Canonical manga/chapter records shared by every provider.
//!
//! Providers return wildly different shapes; everything user-facing goes
//! through [`NormalizedManga`]/[`NormalizedChapter`] so the rest of the
//! crate never sees a provider-specific field.

use regex::Regex;
use serde::{Deserialize, Serialize};

use std::sync::OnceLock;

/// Placeholder used when a provider sends no description at all.
pub const DEFAULT_DESCRIPTION: &str = "No description available.";

/// One external content source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    MangaDex,
    Mangapill,
    WeebCentral,
    AsuraScans,
}

impl Provider {
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::MangaDex => "MangaDex",
            Provider::Mangapill => "Mangapill",
            Provider::WeebCentral => "WeebCentral",
            Provider::AsuraScans => "AsuraScans",
        }
    }

    /// Title used when the provider supplies none. Never empty.
    pub fn placeholder_title(&self) -> String {
        format!("From {}", self.display_name())
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Numeric ordering key derived from heterogeneous chapter identifiers.
///
/// `Unknown` sorts after every known number in both sort directions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayNumber {
    Known(f64),
    Unknown,
}

fn number_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"))
}

impl DisplayNumber {
    /// First numeric token found in `s`, e.g. "Chapter 10.5 Extra" -> 10.5.
    pub fn parse_token(s: &str) -> Option<f64> {
        number_token_re()
            .captures(s)
            .and_then(|cap| cap.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    }

    /// Derives the ordering key from the available signals, in priority
    /// order: an explicit numeric field, a human-readable name, the
    /// trailing path segment of a URL.
    pub fn from_signals(number: Option<&str>, name: Option<&str>, url: Option<&str>) -> Self {
        if let Some(n) = number.and_then(Self::parse_token) {
            return DisplayNumber::Known(n);
        }

        if let Some(n) = name.and_then(Self::parse_token) {
            return DisplayNumber::Known(n);
        }

        let slug = url.and_then(|u| u.split('/').filter(|seg| !seg.is_empty()).next_back());
        if let Some(n) = slug.and_then(Self::parse_token) {
            return DisplayNumber::Known(n);
        }

        DisplayNumber::Unknown
    }

    pub fn known(&self) -> Option<f64> {
        match self {
            DisplayNumber::Known(n) => Some(*n),
            DisplayNumber::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DisplayNumber::Known(_))
    }
}

/// One chapter as seen by a single provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NormalizedChapter {
    /// Provider-specific addressing token: an opaque chapter id for
    /// MangaDex, a full URL for scraped sources. Unique within one manga's
    /// chapter list.
    pub identifier: String,
    pub display_number: DisplayNumber,
    pub title: Option<String>,
    /// Used only for relative-time display, never for ordering.
    pub updated_at: Option<String>,
}

impl NormalizedChapter {
    /// Human label for the chapter list: the provider title when present,
    /// otherwise a prettified trailing URL slug, otherwise "Chapter".
    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            if !title.trim().is_empty() {
                return title.clone();
            }
        }

        let slug = self
            .identifier
            .split('/')
            .filter(|seg| !seg.is_empty())
            .next_back()
            .unwrap_or("");

        let pretty = slug
            .split(['-', '_'])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        if pretty.is_empty() {
            "Chapter".to_string()
        } else {
            pretty
        }
    }
}

/// One manga as seen by a single provider, with every UI-facing field
/// populated (placeholder defaults instead of missing values).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NormalizedManga {
    pub source: Provider,
    /// Unique within `source`'s namespace only, never across providers.
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    pub artists: Vec<String>,
    pub tags: Vec<String>,
    /// Already rewritten through the provider's image proxy.
    pub cover_url: Option<String>,
    /// Populated only by chapter-hosting providers.
    pub chapters: Vec<NormalizedChapter>,
}

/// How the cross-provider pairing behind a [`MergedManga`] was established.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeConfidence {
    /// Both records were addressed directly by the caller.
    Linked,
    /// Resolved by title search with an exact (case-insensitive) match.
    TitleMatch,
    /// Resolved by title search with only a partial match; badge-worthy.
    Fuzzy,
    /// No metadata record; all metadata fields are provider defaults.
    SourceOnly,
    /// No chapter-hosting record; the chapter list is empty.
    MetadataOnly,
}

/// One metadata record and one chapter-hosting record folded into a single
/// coherent entity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MergedManga {
    /// Source and id of the chapter-hosting record (metadata-only merges
    /// carry the metadata provider's instead).
    pub source: Provider,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub authors: Vec<String>,
    pub artists: Vec<String>,
    pub tags: Vec<String>,
    pub cover_url: Option<String>,
    pub chapters: Vec<NormalizedChapter>,
    pub confidence: MergeConfidence,
}

impl MergedManga {
    pub fn with_confidence(mut self, confidence: MergeConfidence) -> Self {
        self.confidence = confidence;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_number_prefers_explicit_field() {
        let n = DisplayNumber::from_signals(
            Some("10"),
            Some("Chapter 99"),
            Some("https://example.com/chapter-3"),
        );
        assert_eq!(n, DisplayNumber::Known(10.0));
    }

    #[test]
    fn display_number_from_name() {
        let n = DisplayNumber::from_signals(None, Some("Chapter 10.5 Extra"), None);
        assert_eq!(n, DisplayNumber::Known(10.5));
    }

    #[test]
    fn display_number_from_url_slug() {
        let n = DisplayNumber::from_signals(
            None,
            None,
            Some("https://mangapill.com/manga/1/chapter-3"),
        );
        assert_eq!(n, DisplayNumber::Known(3.0));
    }

    #[test]
    fn display_number_unknown_when_no_signal() {
        let n = DisplayNumber::from_signals(None, Some("Extra"), Some("https://x.com/extras/"));
        assert_eq!(n, DisplayNumber::Unknown);
    }

    #[test]
    fn display_title_prettifies_slug() {
        let ch = NormalizedChapter {
            identifier: "https://mangapill.com/chapters/one_piece-chapter-1".to_string(),
            display_number: DisplayNumber::Known(1.0),
            title: None,
            updated_at: None,
        };
        assert_eq!(ch.display_title(), "One Piece Chapter 1");
    }

    #[test]
    fn display_title_falls_back_to_generic_label() {
        let ch = NormalizedChapter {
            identifier: String::new(),
            display_number: DisplayNumber::Unknown,
            title: Some("   ".to_string()),
            updated_at: None,
        };
        assert_eq!(ch.display_title(), "Chapter");
    }
}
