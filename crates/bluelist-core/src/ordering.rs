//! OrderingPolicy - sort and filter for the device list.
//!
//! Rows are ranked by a priority score (paired devices earn +10) with
//! higher scores first, then by alias. The object path breaks any remaining
//! tie so the order is total even when two devices share an alias.

use std::cmp::Ordering;

use crate::row::RowState;

/// Score contribution of a paired device.
pub const PAIRED_SCORE: u32 = 10;

type FilterFn = Box<dyn Fn(&RowState) -> bool>;

pub fn priority_score(row: &RowState) -> u32 {
    if row.paired { PAIRED_SCORE } else { 0 }
}

/// Total order over rows: score descending, alias ascending, path ascending.
pub fn compare_rows(a: &RowState, b: &RowState) -> Ordering {
    priority_score(b)
        .cmp(&priority_score(a))
        .then_with(|| a.sort_alias().cmp(b.sort_alias()))
        .then_with(|| a.object_path.cmp(&b.object_path))
}

/// Filter that hides devices which never published an alias.
pub fn hide_unnamed(row: &RowState) -> bool {
    row.alias.as_deref().is_some_and(|alias| !alias.is_empty())
}

pub struct OrderingPolicy {
    filter: Option<FilterFn>,
}

impl OrderingPolicy {
    /// Policy that shows every row.
    pub fn new() -> Self {
        Self { filter: None }
    }

    pub fn with_filter<F>(filter: F) -> Self
    where
        F: Fn(&RowState) -> bool + 'static,
    {
        Self {
            filter: Some(Box::new(filter)),
        }
    }

    /// Replace the filter predicate.
    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: Fn(&RowState) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    pub fn is_visible(&self, row: &RowState) -> bool {
        self.filter.as_ref().is_none_or(|f| f(row))
    }

    pub fn compare(&self, a: &RowState, b: &RowState) -> Ordering {
        compare_rows(a, b)
    }

    /// Object paths of `rows` in display order. Paths are unique, so a
    /// row appears exactly once however often this is called.
    pub fn order<'a, I>(&self, rows: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a RowState>,
    {
        let mut rows: Vec<&RowState> = rows.into_iter().collect();
        rows.sort_by(|a, b| compare_rows(a, b));
        rows.dedup_by(|a, b| a.object_path == b.object_path);
        rows.into_iter().map(|r| r.object_path.clone()).collect()
    }
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, alias: Option<&str>, paired: bool) -> RowState {
        let mut row = RowState::new(path);
        row.alias = alias.map(str::to_string);
        row.paired = paired;
        row
    }

    #[test]
    fn test_pairing_dominates_alias() {
        let a = row("/a", Some("B"), true);
        let b = row("/b", Some("A"), false);
        let policy = OrderingPolicy::new();
        assert_eq!(policy.order([&b, &a]), vec!["/a", "/b"]);
    }

    #[test]
    fn test_alias_order_within_score() {
        let rows = [
            row("/1", Some("Zebra"), false),
            row("/2", Some("Apple"), false),
            row("/3", Some("Mango"), true),
            row("/4", Some("Banana"), true),
        ];
        let policy = OrderingPolicy::new();
        assert_eq!(policy.order(&rows), vec!["/4", "/3", "/2", "/1"]);
    }

    #[test]
    fn test_missing_alias_sorts_as_empty() {
        let rows = [row("/named", Some("A"), false), row("/anon", None, false)];
        let policy = OrderingPolicy::new();
        assert_eq!(policy.order(&rows), vec!["/anon", "/named"]);
    }

    #[test]
    fn test_equal_alias_is_total_by_path() {
        let a = row("/a", Some("Same"), false);
        let b = row("/b", Some("Same"), false);
        assert_eq!(compare_rows(&a, &b), Ordering::Less);
        assert_eq!(compare_rows(&b, &a), Ordering::Greater);
        assert_eq!(compare_rows(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let rows: Vec<RowState> = (0..20)
            .map(|i| {
                let alias = format!("dev{}", (i * 7) % 5);
                row(&format!("/d{:02}", i), Some(&alias), i % 3 == 0)
            })
            .collect();
        let policy = OrderingPolicy::new();
        let first = policy.order(&rows);

        let by_path: std::collections::HashMap<&str, &RowState> =
            rows.iter().map(|r| (r.object_path.as_str(), r)).collect();
        let resorted: Vec<&RowState> = first.iter().map(|p| by_path[p.as_str()]).collect();
        assert_eq!(policy.order(resorted), first);
        assert_eq!(first.len(), rows.len());
    }

    #[test]
    fn test_comparator_is_transitive() {
        let rows = [
            row("/a", Some("x"), true),
            row("/b", Some("y"), false),
            row("/c", None, true),
            row("/d", Some("x"), false),
            row("/e", Some(""), false),
        ];
        for a in &rows {
            for b in &rows {
                for c in &rows {
                    if compare_rows(a, b) == Ordering::Less && compare_rows(b, c) == Ordering::Less {
                        assert_eq!(compare_rows(a, c), Ordering::Less);
                    }
                }
                assert_eq!(compare_rows(a, b), compare_rows(b, a).reverse());
            }
        }
    }

    #[test]
    fn test_paired_never_after_unpaired() {
        let rows = [
            row("/1", Some("aaa"), false),
            row("/2", Some("zzz"), true),
            row("/3", Some("mmm"), false),
        ];
        let order = OrderingPolicy::new().order(&rows);
        assert_eq!(order[0], "/2");
    }

    #[test]
    fn test_duplicate_input_yields_single_entry() {
        let a = row("/a", Some("A"), false);
        let order = OrderingPolicy::new().order([&a, &a]);
        assert_eq!(order, vec!["/a"]);
    }

    #[test]
    fn test_filter_overridable() {
        let named = row("/named", Some("A"), false);
        let anon = row("/anon", None, false);

        let mut policy = OrderingPolicy::new();
        assert!(policy.is_visible(&anon));

        policy.set_filter(hide_unnamed);
        assert!(policy.is_visible(&named));
        assert!(!policy.is_visible(&anon));

        policy.clear_filter();
        assert!(policy.is_visible(&anon));

        let only_paired = OrderingPolicy::with_filter(|r| r.paired);
        assert!(!only_paired.is_visible(&named));
    }
}
