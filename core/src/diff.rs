//! Set difference over string lists, used wherever two versions of a
//! membership list must be reconciled into add/remove events.

use ahash::AHashSet as HashSet;

/// Computes the symmetric difference of two lists.
///
/// Returns `(added, removed)` where `added` contains the elements only in
/// `next` and `removed` the elements only in `prev`. Duplicates are
/// collapsed; the relative order of first appearance is preserved.
pub fn symmetric_diff(prev: &[String], next: &[String]) -> (Vec<String>, Vec<String>) {
    let prev_set: HashSet<&str> = prev.iter().map(String::as_str).collect();
    let next_set: HashSet<&str> = next.iter().map(String::as_str).collect();

    let mut added = Vec::new();
    let mut seen = HashSet::new();
    for item in next {
        if !prev_set.contains(item.as_str()) && seen.insert(item.as_str()) {
            added.push(item.clone());
        }
    }

    let mut removed = Vec::new();
    let mut seen = HashSet::new();
    for item in prev {
        if !next_set.contains(item.as_str()) && seen.insert(item.as_str()) {
            removed.push(item.clone());
        }
    }

    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn disjoint_and_overlapping() {
        let cases: &[(&[&str], &[&str], &[&str], &[&str])] = &[
            (&[], &[], &[], &[]),
            (&["a"], &[], &[], &["a"]),
            (&[], &["a"], &["a"], &[]),
            (&["a", "b"], &["b", "c"], &["c"], &["a"]),
            (&["a", "b"], &["a", "b"], &[], &[]),
            (&["a", "a", "b"], &["b", "c", "c"], &["c"], &["a"]),
        ];
        for (prev, next, added, removed) in cases {
            let (got_added, got_removed) = symmetric_diff(&strings(prev), &strings(next));
            assert_eq!(got_added, strings(added), "added for {prev:?} -> {next:?}");
            assert_eq!(got_removed, strings(removed), "removed for {prev:?} -> {next:?}");
        }
    }

    #[test]
    fn identical_lists_yield_nothing() {
        let list = strings(&["x", "y", "z"]);
        let (added, removed) = symmetric_diff(&list, &list);
        assert!(added.is_empty());
        assert!(removed.is_empty());
    }
}
