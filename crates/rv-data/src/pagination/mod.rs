//! Page windows over a filtered row set

use rv_core::{Row, RowPage};

/// Take the 1-indexed `page` of `page_size` items.
///
/// Returns the window and the number of items before windowing. Page 0 is
/// read as page 1; a zero page size yields an empty window. Pages past the
/// end are empty.
pub fn window<T>(items: Vec<T>, page: usize, page_size: usize) -> (Vec<T>, usize) {
    let total = items.len();
    if page_size == 0 {
        return (Vec::new(), total);
    }

    let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);
    let rows = items.into_iter().skip(offset).take(page_size).collect();
    (rows, total)
}

/// Window a filtered, sorted row set
pub fn paginate(rows: Vec<Row>, page: usize, page_size: usize) -> RowPage {
    let (rows, total) = window(rows, page, page_size);
    RowPage { rows, total }
}

/// Number of pages needed for `total` rows; never less than one
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

/// Clamp a page number into `1..=page_count`
pub fn clamp_page(page: usize, total: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(total, page_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_length_property() {
        for total in [0usize, 1, 9, 10, 11, 250] {
            for size in [1usize, 3, 10, 100] {
                for page in 1..=30 {
                    let items: Vec<usize> = (0..total).collect();
                    let (rows, count) = window(items, page, size);
                    let expected = size.min(total.saturating_sub((page - 1) * size));
                    assert_eq!(rows.len(), expected, "total={total} size={size} page={page}");
                    assert_eq!(count, total);
                }
            }
        }
    }

    #[test]
    fn test_window_contents() {
        let (rows, _) = window((1..=25).collect::<Vec<_>>(), 3, 10);
        assert_eq!(rows, vec![21, 22, 23, 24, 25]);
        let (rows, _) = window((1..=25).collect::<Vec<_>>(), 0, 10);
        assert_eq!(rows.first(), Some(&1));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(250, 10), 25);
        assert_eq!(page_count(251, 10), 26);
        assert_eq!(clamp_page(40, 250, 10), 25);
        assert_eq!(clamp_page(0, 250, 10), 1);
    }
}
