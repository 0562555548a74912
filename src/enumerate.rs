//! Capped listing of potentially large collections.
//!
//! The cap bounds the *returned* items. The count is always taken over the
//! full source so callers can tell how much was cut off.

use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundedList<T> {
    pub items: Vec<T>,
    pub total_count: usize,
    pub returned_count: usize,
    /// True iff `total_count > limit`.
    pub limit_reached: bool,
}

/// Count everything `source` yields, then project at most `limit` items.
///
/// `source` is invoked twice, so it must be repeatable and produce the same
/// sequence both times. `project` is only called for returned items.
pub fn enumerate_bounded<S, I, T, U, F>(
    source: S,
    limit: usize,
    mut project: F,
) -> Result<BoundedList<U>, AppError>
where
    S: Fn() -> I,
    I: Iterator<Item = T>,
    F: FnMut(T) -> U,
{
    if limit == 0 {
        return Err(AppError::config("enumeration limit must be at least 1"));
    }

    let total_count = source().count();
    let items: Vec<U> = source().take(limit).map(&mut project).collect();
    let returned_count = items.len();

    Ok(BoundedList {
        items,
        total_count,
        returned_count,
        limit_reached: total_count > limit,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_over_limit() {
        let data: Vec<u32> = (0..250).collect();
        let list = enumerate_bounded(|| data.iter(), 100, |x| *x).unwrap();
        assert_eq!(list.total_count, 250);
        assert_eq!(list.returned_count, 100);
        assert!(list.limit_reached);
        assert_eq!(list.items.first(), Some(&0));
        assert_eq!(list.items.last(), Some(&99));
    }

    #[test]
    fn test_exactly_at_limit_is_not_reached() {
        let data = vec!["a", "b", "c"];
        let list = enumerate_bounded(|| data.iter(), 3, |s| s.to_uppercase()).unwrap();
        assert_eq!(list.returned_count, 3);
        assert!(!list.limit_reached);
        assert_eq!(list.items, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_empty_source() {
        let data: Vec<u8> = Vec::new();
        let list = enumerate_bounded(|| data.iter(), 10, |x| *x).unwrap();
        assert_eq!(list.total_count, 0);
        assert!(list.items.is_empty());
        assert!(!list.limit_reached);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let data = vec![1];
        let err = enumerate_bounded(|| data.iter(), 0, |x| *x).unwrap_err();
        assert!(matches!(err, AppError::ConfigError { .. }));
    }

    #[test]
    fn test_projection_runs_only_for_returned_items() {
        let data: Vec<u32> = (0..50).collect();
        let calls = Cell::new(0);
        let list = enumerate_bounded(
            || data.iter(),
            5,
            |x| {
                calls.set(calls.get() + 1);
                x * 2
            },
        )
        .unwrap();
        assert_eq!(calls.get(), 5);
        assert_eq!(list.items, vec![0, 2, 4, 6, 8]);
    }
}
