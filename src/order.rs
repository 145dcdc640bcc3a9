//! Chapter ordering and pagination.
//!
//! Chapters with an unknown display number always sort after every known
//! number, in both directions: flipping the direction reorders only the
//! known numbers. Sorting is stable so releases that parse to the same
//! number ("10" and "10.5extra" both yielding 10) keep their original
//! relative order.

use crate::model::{DisplayNumber, NormalizedChapter};

use std::cmp::Ordering;

/// Chapter list page size used by the reading screen.
pub const DEFAULT_PAGE_SIZE: usize = 50;

fn compare(a: DisplayNumber, b: DisplayNumber, ascending: bool) -> Ordering {
    match (a, b) {
        (DisplayNumber::Known(x), DisplayNumber::Known(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
        (DisplayNumber::Known(_), DisplayNumber::Unknown) => Ordering::Less,
        (DisplayNumber::Unknown, DisplayNumber::Known(_)) => Ordering::Greater,
        (DisplayNumber::Unknown, DisplayNumber::Unknown) => Ordering::Equal,
    }
}

/// Stable sort by display number.
pub fn order(mut chapters: Vec<NormalizedChapter>, ascending: bool) -> Vec<NormalizedChapter> {
    chapters.sort_by(|a, b| compare(a.display_number, b.display_number, ascending));
    chapters
}

/// One page of an ordered chapter list. `page_number` is always within
/// `[1, total_pages]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<NormalizedChapter>,
    pub page_number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

/// Slices one 1-based page out of `ordered`. A page number past the end is
/// clamped to the last valid page rather than returning an empty page, so
/// a selected page survives the list shrinking after a re-sort.
pub fn paginate(ordered: &[NormalizedChapter], page_size: usize, page_number: usize) -> Page {
    let page_size = page_size.max(1);
    let total_items = ordered.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page_number = page_number.clamp(1, total_pages);

    let start = (page_number - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let items = ordered.get(start..end).unwrap_or_default().to_vec();

    Page {
        items,
        page_number,
        total_pages,
        total_items,
        page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(id: &str, n: f64) -> NormalizedChapter {
        NormalizedChapter {
            identifier: id.to_string(),
            display_number: DisplayNumber::Known(n),
            title: None,
            updated_at: None,
        }
    }

    fn unknown(id: &str) -> NormalizedChapter {
        NormalizedChapter {
            identifier: id.to_string(),
            display_number: DisplayNumber::Unknown,
            title: None,
            updated_at: None,
        }
    }

    fn numbers(chapters: &[NormalizedChapter]) -> Vec<Option<f64>> {
        chapters.iter().map(|c| c.display_number.known()).collect()
    }

    #[test]
    fn mixed_signals_sort_ascending() {
        // "Chapter 10.5 Extra", {number: "10"}, ".../chapter-3"
        let chapters = vec![known("a", 10.5), known("b", 10.0), known("c", 3.0)];
        let sorted = order(chapters, true);
        assert_eq!(numbers(&sorted), vec![Some(3.0), Some(10.0), Some(10.5)]);
    }

    #[test]
    fn unknown_sorts_last_in_both_directions() {
        let chapters = vec![unknown("x"), known("a", 2.0), known("b", 1.0)];

        let asc = order(chapters.clone(), true);
        assert_eq!(numbers(&asc), vec![Some(1.0), Some(2.0), None]);

        let desc = order(chapters, false);
        assert_eq!(numbers(&desc), vec![Some(2.0), Some(1.0), None]);
    }

    #[test]
    fn descending_equals_reversed_ascending_for_known_numbers() {
        let chapters = vec![
            known("a", 7.0),
            unknown("x"),
            known("b", 1.0),
            known("c", 4.5),
        ];

        let asc: Vec<_> = order(chapters.clone(), true)
            .into_iter()
            .filter(|c| c.display_number.is_known())
            .collect();
        let desc: Vec<_> = order(chapters, false)
            .into_iter()
            .filter(|c| c.display_number.is_known())
            .collect();

        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(reversed, desc);
    }

    #[test]
    fn equal_numbers_keep_original_relative_order() {
        // "10" and "10.5extra" can both parse to 10
        let chapters = vec![known("first", 10.0), known("second", 10.0)];
        let sorted = order(chapters, true);
        assert_eq!(sorted[0].identifier, "first");
        assert_eq!(sorted[1].identifier, "second");
    }

    #[test]
    fn paginate_clamps_past_the_end() {
        let chapters: Vec<_> = (1..=120).map(|i| known(&i.to_string(), i as f64)).collect();

        let page = paginate(&chapters, 50, 999);
        assert_eq!(page.page_number, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 20);
    }

    #[test]
    fn paginate_never_leaves_the_valid_range() {
        let chapters: Vec<_> = (1..=10).map(|i| known(&i.to_string(), i as f64)).collect();

        let low = paginate(&chapters, 4, 0);
        assert_eq!(low.page_number, 1);
        assert_eq!(low.items.len(), 4);

        let high = paginate(&chapters, 4, 3);
        assert_eq!(high.page_number, 3);
        assert_eq!(high.items.len(), 2);
    }

    #[test]
    fn paginate_empty_list_yields_one_empty_page() {
        let page = paginate(&[], DEFAULT_PAGE_SIZE, 5);
        assert_eq!(page.page_number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 0);
    }

    #[test]
    fn paginate_slices_the_requested_page() {
        let chapters: Vec<_> = (1..=10).map(|i| known(&i.to_string(), i as f64)).collect();

        let page = paginate(&chapters, 3, 2);
        assert_eq!(numbers(&page.items), vec![Some(4.0), Some(5.0), Some(6.0)]);
        assert_eq!(page.total_pages, 4);
    }
}
