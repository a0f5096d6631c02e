//! Deterministic ordering and reduction helpers shared by every stage of the
//! pipeline. Anything that walks a collection and produces an artifact must
//! go through one of these so that two runs over the same inputs, on two
//! machines, produce byte-identical output.

use core::cmp::Ordering;

#[cfg(feature = "std")]
use std::collections::BTreeMap;
#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// A type with a canonical total order independent of insertion order,
/// hash-map iteration order, or thread scheduling.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

/// Sort a slice in place by its `StableOrd` key. Stable sort: ties keep their
/// relative input order, which matters when the caller has already applied a
/// secondary tie-break (e.g. `chunk_id` ascending after a score sort).
pub fn sort_stable<T: StableOrd>(items: &mut [T]) {
    items.sort_by(|a, b| a.stable_cmp(b));
}

/// Compare two items by a projected key, for use inside `sort_by`.
pub fn cmp_by_key<T, K: Ord>(a: &T, b: &T, key: impl Fn(&T) -> K) -> Ordering {
    key(a).cmp(&key(b))
}

/// A deterministic fold: applies `reduce` to items in a fixed, caller-chosen
/// order (the caller is expected to have sorted `items` first via
/// `sort_stable` or an explicit key) rather than relying on set/map iteration.
pub trait StableReduce<T> {
    fn reduce_deterministic(items: &[T]) -> Self;
}

/// Build a `BTreeMap` from an iterator of key/value pairs. `BTreeMap` iterates
/// in key order, so this is the one map type safe to serialize directly
/// without a separate sort pass.
pub fn btreemap_from_iter_kv<K: Ord, V>(iter: impl IntoIterator<Item = (K, V)>) -> BTreeMap<K, V> {
    iter.into_iter().collect()
}

/// A type that can be turned into the canonical byte sequence used for
/// content-addressing (hashed via `esg_io::hasher::sha256_hex` at the I/O
/// boundary; this crate only defines the interface).
pub trait HashCanon {
    fn canonical_bytes(&self) -> Vec<u8>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Item(u32, &'static str);

    impl StableOrd for Item {
        fn stable_cmp(&self, other: &Self) -> Ordering {
            self.0.cmp(&other.0)
        }
    }

    #[test]
    fn sort_stable_preserves_tie_order() {
        let mut items = vec![Item(2, "a"), Item(1, "b"), Item(1, "a"), Item(2, "b")];
        sort_stable(&mut items);
        assert_eq!(
            items,
            vec![Item(1, "b"), Item(1, "a"), Item(2, "a"), Item(2, "b")]
        );
    }

    #[test]
    fn btreemap_sorts_by_key() {
        let m = btreemap_from_iter_kv(vec![("b", 2), ("a", 1), ("c", 3)]);
        let keys: Vec<_> = m.keys().copied().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
