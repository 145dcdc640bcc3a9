//! Merge engine: folds a metadata-rich record and a chapter-hosting record
//! into one [`MergedManga`].
//!
//! Pure and total: a missing metadata record is valid input ("source-only"
//! merge), never an error, and identical inputs always produce identical
//! output.

use crate::model::{MergeConfidence, MergedManga, NormalizedManga, DEFAULT_DESCRIPTION};

fn prefer_text(preferred: Option<&str>, fallback: &str, default: &str) -> String {
    match preferred {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => {
            if fallback.trim().is_empty() {
                default.to_string()
            } else {
                fallback.to_string()
            }
        }
    }
}

fn prefer_list(preferred: Option<&Vec<String>>, fallback: &[String]) -> Vec<String> {
    match preferred {
        Some(list) if !list.is_empty() => list.clone(),
        _ => fallback.to_vec(),
    }
}

/// Field-level precedence: scalars and collections prefer the metadata
/// provider's non-empty value and fall back to the chapter source's;
/// `chapters` always comes from the chapter source.
pub fn merge(metadata: Option<&NormalizedManga>, chapter_source: &NormalizedManga) -> MergedManga {
    let cover_url = metadata
        .and_then(|m| m.cover_url.clone())
        .or_else(|| chapter_source.cover_url.clone());

    let confidence = if metadata.is_some() {
        MergeConfidence::Linked
    } else {
        MergeConfidence::SourceOnly
    };

    MergedManga {
        source: chapter_source.source,
        source_id: chapter_source.source_id.clone(),
        title: prefer_text(
            metadata.map(|m| m.title.as_str()),
            &chapter_source.title,
            &chapter_source.source.placeholder_title(),
        ),
        description: prefer_text(
            metadata.map(|m| m.description.as_str()),
            &chapter_source.description,
            DEFAULT_DESCRIPTION,
        ),
        authors: prefer_list(metadata.map(|m| &m.authors), &chapter_source.authors),
        artists: prefer_list(metadata.map(|m| &m.artists), &chapter_source.artists),
        tags: prefer_list(metadata.map(|m| &m.tags), &chapter_source.tags),
        cover_url,
        chapters: chapter_source.chapters.clone(),
        confidence,
    }
}

/// A merged view with no chapter-hosting record: all fields come from the
/// metadata provider and the chapter list is empty.
pub fn from_metadata(metadata: &NormalizedManga) -> MergedManga {
    MergedManga {
        source: metadata.source,
        source_id: metadata.source_id.clone(),
        title: metadata.title.clone(),
        description: metadata.description.clone(),
        authors: metadata.authors.clone(),
        artists: metadata.artists.clone(),
        tags: metadata.tags.clone(),
        cover_url: metadata.cover_url.clone(),
        chapters: Vec::new(),
        confidence: MergeConfidence::MetadataOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DisplayNumber, NormalizedChapter, Provider};

    fn chapter(identifier: &str) -> NormalizedChapter {
        NormalizedChapter {
            identifier: identifier.to_string(),
            display_number: DisplayNumber::Known(1.0),
            title: None,
            updated_at: None,
        }
    }

    fn metadata_record() -> NormalizedManga {
        NormalizedManga {
            source: Provider::MangaDex,
            source_id: "uuid-1".to_string(),
            title: "Chainsaw Man".to_string(),
            description: "Denji and Pochita.".to_string(),
            authors: vec!["Fujimoto Tatsuki".to_string()],
            artists: vec!["Fujimoto Tatsuki".to_string()],
            tags: vec!["Action".to_string()],
            cover_url: Some("https://uploads.mangadex.org/covers/uuid-1/c.512.jpg".to_string()),
            chapters: vec![chapter("md-chapter")],
        }
    }

    fn chapter_source_record() -> NormalizedManga {
        NormalizedManga {
            source: Provider::Mangapill,
            source_id: "https://mangapill.com/manga/1".to_string(),
            title: "Chainsaw Man (mirror)".to_string(),
            description: "Mirror description.".to_string(),
            authors: vec![],
            artists: vec![],
            tags: vec!["Shounen".to_string()],
            cover_url: Some("https://proxy/image_proxy?url=x".to_string()),
            chapters: vec![chapter("https://mangapill.com/ch/1")],
        }
    }

    #[test]
    fn metadata_fields_win_when_present() {
        let merged = merge(Some(&metadata_record()), &chapter_source_record());

        assert_eq!(merged.title, "Chainsaw Man");
        assert_eq!(merged.description, "Denji and Pochita.");
        assert_eq!(merged.tags, vec!["Action"]);
        assert_eq!(
            merged.cover_url.as_deref(),
            Some("https://uploads.mangadex.org/covers/uuid-1/c.512.jpg")
        );
        assert_eq!(merged.confidence, MergeConfidence::Linked);
    }

    #[test]
    fn empty_metadata_collections_fall_back_to_chapter_source() {
        let mut md = metadata_record();
        md.authors.clear();
        md.tags.clear();

        let mut src = chapter_source_record();
        src.authors = vec!["Mirror Author".to_string()];

        let merged = merge(Some(&md), &src);

        assert_eq!(merged.authors, vec!["Mirror Author"]);
        assert_eq!(merged.tags, vec!["Shounen"]);
    }

    #[test]
    fn chapters_always_come_from_the_chapter_source() {
        let merged = merge(Some(&metadata_record()), &chapter_source_record());

        assert_eq!(merged.chapters.len(), 1);
        assert_eq!(merged.chapters[0].identifier, "https://mangapill.com/ch/1");
        assert_eq!(merged.source, Provider::Mangapill);
        assert_eq!(merged.source_id, "https://mangapill.com/manga/1");
    }

    #[test]
    fn source_only_merge_reflects_the_chapter_source() {
        let src = chapter_source_record();
        let merged = merge(None, &src);

        assert_eq!(merged.title, src.title);
        assert_eq!(merged.description, src.description);
        assert_eq!(merged.tags, src.tags);
        assert_eq!(merged.cover_url, src.cover_url);
        assert_eq!(merged.chapters, src.chapters);
        assert_eq!(merged.confidence, MergeConfidence::SourceOnly);
    }

    #[test]
    fn merge_is_deterministic() {
        let md = metadata_record();
        let src = chapter_source_record();

        assert_eq!(merge(Some(&md), &src), merge(Some(&md), &src));
        assert_eq!(merge(None, &src), merge(None, &src));
    }

    #[test]
    fn placeholders_apply_when_both_sides_are_empty() {
        let mut src = chapter_source_record();
        src.title = String::new();
        src.description = "  ".to_string();

        let merged = merge(None, &src);

        assert_eq!(merged.title, "From Mangapill");
        assert_eq!(merged.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn metadata_only_view_has_no_chapters() {
        let merged = from_metadata(&metadata_record());

        assert!(merged.chapters.is_empty());
        assert_eq!(merged.confidence, MergeConfidence::MetadataOnly);
        assert_eq!(merged.title, "Chainsaw Man");
    }
}
