//! BTree index implementation.

use crate::index::traits::{Index, IndexKey};
use std::collections::BTreeMap;
use std::ops::{Bound, ControlFlow};

/// Ordered key-value index backed by a `BTreeMap`.
///
/// `OrderedIndex` supports:
/// - Point lookups (`get`, `has`)
/// - Range iteration with inclusive/exclusive bounds and early exit
/// - Counting keys in a range, for cost estimates
/// - Ordered enumeration of values
///
/// # Example
///
/// ```rust,ignore
/// let mut index: OrderedIndex<&str> = OrderedIndex::new();
/// index.set(IndexKey::new(25), "bob");
///
/// index.range_scan(Bound::Included(&IndexKey::new(18)), Bound::Unbounded, |_, name| {
///     println!("{name}");
///     ControlFlow::Continue(())
/// });
/// ```
#[derive(Debug, Clone)]
pub struct OrderedIndex<V> {
    entries: BTreeMap<IndexKey, V>,
}

impl<V> Default for OrderedIndex<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> OrderedIndex<V> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a mutable reference to the value under a key.
    pub fn get_mut(&mut self, key: &IndexKey) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Returns the value under a key, inserting a default one if absent.
    pub fn entry_or_default(&mut self, key: IndexKey) -> &mut V
    where
        V: Default,
    {
        self.entries.entry(key).or_default()
    }

    /// Visits entries with keys between the bounds, in key order.
    ///
    /// The visitor returns `ControlFlow::Break` to stop the scan; the break is
    /// passed back to the caller. Bounds that describe an empty range (lower
    /// above upper, or equal with an exclusive side) visit nothing.
    pub fn range_scan<F>(
        &self,
        lower: Bound<&IndexKey>,
        upper: Bound<&IndexKey>,
        mut visit: F,
    ) -> ControlFlow<()>
    where
        F: FnMut(&IndexKey, &V) -> ControlFlow<()>,
    {
        if is_empty_range(lower, upper) {
            return ControlFlow::Continue(());
        }
        for (key, value) in self.entries.range::<IndexKey, _>((lower, upper)) {
            visit(key, value)?;
        }
        ControlFlow::Continue(())
    }

    /// Counts the keys between the bounds.
    pub fn count_range(&self, lower: Bound<&IndexKey>, upper: Bound<&IndexKey>) -> usize {
        if is_empty_range(lower, upper) {
            return 0;
        }
        self.entries.range::<IndexKey, _>((lower, upper)).count()
    }

    /// Returns the minimum key.
    pub fn min_key(&self) -> Option<&IndexKey> {
        self.entries.keys().next()
    }

    /// Returns the maximum key.
    pub fn max_key(&self) -> Option<&IndexKey> {
        self.entries.keys().next_back()
    }

    /// Iterates over values in key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.entries.values()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&IndexKey, &V)> + '_ {
        self.entries.iter()
    }
}

impl<V: Send + Sync> Index<V> for OrderedIndex<V> {
    fn get(&self, key: &IndexKey) -> Option<&V> {
        self.entries.get(key)
    }

    fn set(&mut self, key: IndexKey, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    fn delete(&mut self, key: &IndexKey) -> Option<V> {
        self.entries.remove(key)
    }

    fn has(&self, key: &IndexKey) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// `BTreeMap::range` panics on inverted bounds, so they are filtered here.
fn is_empty_range(lower: Bound<&IndexKey>, upper: Bound<&IndexKey>) -> bool {
    match (lower, upper) {
        (Bound::Included(lo), Bound::Included(hi)) => lo > hi,
        (Bound::Included(lo), Bound::Excluded(hi))
        | (Bound::Excluded(lo), Bound::Included(hi))
        | (Bound::Excluded(lo), Bound::Excluded(hi)) => lo >= hi,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_value::Value;

    fn ages() -> OrderedIndex<&'static str> {
        let mut index = OrderedIndex::new();
        for (age, name) in [(30, "c"), (10, "a"), (50, "e"), (20, "b"), (40, "d")] {
            index.set(IndexKey::new(age), name);
        }
        index
    }

    fn collect(
        index: &OrderedIndex<&'static str>,
        lower: Bound<&IndexKey>,
        upper: Bound<&IndexKey>,
    ) -> Vec<&'static str> {
        let mut out = Vec::new();
        let _ = index.range_scan(lower, upper, |_, v| {
            out.push(*v);
            ControlFlow::Continue(())
        });
        out
    }

    #[test]
    fn set_get_delete() {
        let mut index = ages();
        assert_eq!(index.get(&IndexKey::new(20)), Some(&"b"));
        assert!(index.has(&IndexKey::new(30)));

        assert_eq!(index.delete(&IndexKey::new(30)), Some("c"));
        assert!(!index.has(&IndexKey::new(30)));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn range_bounds() {
        let index = ages();
        let (k20, k40) = (IndexKey::new(20), IndexKey::new(40));

        let found = collect(&index, Bound::Included(&k20), Bound::Excluded(&k40));
        assert_eq!(found, vec!["b", "c"]);

        let found = collect(&index, Bound::Excluded(&k20), Bound::Included(&k40));
        assert_eq!(found, vec!["c", "d"]);

        let found = collect(&index, Bound::Unbounded, Bound::Included(&k20));
        assert_eq!(found, vec!["a", "b"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let index = ages();
        let (k20, k40) = (IndexKey::new(20), IndexKey::new(40));

        assert!(collect(&index, Bound::Included(&k40), Bound::Included(&k20)).is_empty());
        assert!(collect(&index, Bound::Excluded(&k20), Bound::Excluded(&k20)).is_empty());
        assert_eq!(index.count_range(Bound::Included(&k40), Bound::Excluded(&k20)), 0);
    }

    #[test]
    fn range_scan_stops_on_break() {
        let index = ages();
        let mut seen = 0;
        let flow = index.range_scan(Bound::Unbounded, Bound::Unbounded, |_, _| {
            seen += 1;
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(seen, 2);
    }

    #[test]
    fn count_range() {
        let index = ages();
        let k25 = IndexKey::new(25);
        assert_eq!(index.count_range(Bound::Included(&k25), Bound::Unbounded), 3);
        assert_eq!(index.count_range(Bound::Unbounded, Bound::Unbounded), 5);
    }

    #[test]
    fn min_max_key() {
        let index = ages();
        assert_eq!(index.min_key(), Some(&IndexKey::new(10)));
        assert_eq!(index.max_key(), Some(&IndexKey::new(50)));
        assert_eq!(OrderedIndex::<()>::new().min_key(), None);
    }

    #[test]
    fn values_are_ordered() {
        let index = ages();
        let values: Vec<_> = index.values().copied().collect();
        assert_eq!(values, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn mixed_type_keys() {
        let mut index = OrderedIndex::new();
        index.set(IndexKey::new("x"), 3);
        index.set(IndexKey::new(Value::Date(5)), 2);
        index.set(IndexKey::new(true), 1);

        let values: Vec<_> = index.values().copied().collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    mod ranges {
        use super::*;
        use proptest::prelude::*;

        fn bound(key: Option<(i32, bool)>) -> Bound<IndexKey> {
            match key {
                None => Bound::Unbounded,
                Some((k, true)) => Bound::Included(IndexKey::new(k)),
                Some((k, false)) => Bound::Excluded(IndexKey::new(k)),
            }
        }

        fn admits(bound: &Bound<IndexKey>, key: &IndexKey, lower: bool) -> bool {
            match (bound, lower) {
                (Bound::Unbounded, _) => true,
                (Bound::Included(b), true) => key >= b,
                (Bound::Excluded(b), true) => key > b,
                (Bound::Included(b), false) => key <= b,
                (Bound::Excluded(b), false) => key < b,
            }
        }

        proptest! {
            #[test]
            fn range_scan_matches_linear_filter(
                keys in prop::collection::btree_set(0i32..30, 0..20),
                lower in prop::option::of((0i32..30, any::<bool>())),
                upper in prop::option::of((0i32..30, any::<bool>())),
            ) {
                let mut index = OrderedIndex::new();
                for k in &keys {
                    index.set(IndexKey::new(*k), *k);
                }
                let (lower, upper) = (bound(lower), bound(upper));

                let mut scanned = Vec::new();
                let _ = index.range_scan(lower.as_ref(), upper.as_ref(), |_, v| {
                    scanned.push(*v);
                    ControlFlow::Continue(())
                });
                let expected: Vec<i32> = keys
                    .iter()
                    .copied()
                    .filter(|k| {
                        let key = IndexKey::new(*k);
                        admits(&lower, &key, true) && admits(&upper, &key, false)
                    })
                    .collect();

                prop_assert_eq!(index.count_range(lower.as_ref(), upper.as_ref()), expected.len());
                prop_assert_eq!(scanned, expected);
            }
        }
    }
}
