//! Page slicing

use crate::core::query::Page;

/// Slice an ordered collection into one page
///
/// `page` is 1-based. A page past the end clamps to the last page, so a
/// stale "page 5" link still shows results after filters shrink the set.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(page_size).max(1);

    let requested = page.max(1);
    let page = requested.min(total_pages);
    if page != requested {
        tracing::debug!(requested, clamped = page, total_pages, "Page out of range, clamping");
    }

    let start = (page - 1) * page_size;
    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        total,
        page,
        page_size,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let page = paginate((1..=45).collect(), 1, 20);
        assert_eq!(page.items, (1..=20).collect::<Vec<_>>());
        assert_eq!((page.total, page.total_pages), (45, 3));
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate((1..=45).collect(), 3, 20);
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
    }

    #[test]
    fn test_out_of_range_clamps_to_last_page() {
        let page = paginate((1..=45).collect(), 9, 20);
        assert_eq!(page.page, 3);
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let page = paginate(Vec::<u8>::new(), 4, 10);
        assert_eq!((page.page, page.total, page.total_pages), (1, 0, 1));
        assert!(page.is_empty());
    }

    #[test]
    fn test_zero_inputs_are_raised() {
        let page = paginate(vec!['a', 'b'], 0, 0);
        assert_eq!((page.page, page.page_size, page.total_pages), (1, 1, 2));
        assert_eq!(page.items, vec!['a']);
    }

    #[test]
    fn test_pages_cover_everything_once() {
        let all: Vec<u32> = (0..53).collect();
        let first = paginate(all.clone(), 1, 7);
        let rebuilt: Vec<u32> = (1..=first.total_pages)
            .flat_map(|p| paginate(all.clone(), p, 7).items)
            .collect();
        assert_eq!(rebuilt, all);
    }
}
