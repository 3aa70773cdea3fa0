//! Computed table for binary diagram operations.
//!
//! Results of `apply` are memoised by `(operation, lhs, rhs)`. Since the node
//! store never drops nodes, a cached [`Ref`][crate::reference::Ref] stays valid
//! for the whole lifetime of the store and the cache never needs invalidation.

use std::collections::HashMap;
use std::hash::Hash;

/// Memo table keyed by operation and operands.
///
/// Entries are never evicted. `bits` only sizes the initial allocation.
pub struct Cache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K, V> Cache<K, V> {
    /// Room for `2^bits` entries up front.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");
        Self {
            map: HashMap::with_capacity(1 << bits),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Lookups answered from the table.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Lookups that had to recurse.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq,
    V: Copy,
{
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.map.get(key) {
            Some(&v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Records a computed result.
    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{NodeId, Ref};

    #[test]
    fn test_hits_and_misses() {
        let mut cache = Cache::<(Ref, Ref), Ref>::new(3);
        let a = Ref::Node(NodeId::new(1));
        let b = Ref::Node(NodeId::new(2));

        assert_eq!(cache.get(&(a, b)), None);
        cache.insert((a, b), Ref::TRUE);
        cache.insert((b, a), Ref::FALSE);

        assert_eq!(cache.get(&(a, b)), Some(Ref::TRUE));
        assert_eq!(cache.get(&(b, a)), Some(Ref::FALSE));
        assert_eq!(cache.get(&(a, a)), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 2);
    }
}
