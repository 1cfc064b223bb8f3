//! Hash collections keyed by node, edge and pair indices.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<K> = rustc_hash::FxHashSet<K>;

pub fn map_new<K, V>() -> HashMap<K, V> {
    HashMap::default()
}

pub fn map_with_capacity<K, V>(capacity: usize) -> HashMap<K, V> {
    HashMap::with_capacity_and_hasher(capacity, Default::default())
}

pub fn set_with_capacity<K>(capacity: usize) -> HashSet<K> {
    HashSet::with_capacity_and_hasher(capacity, Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::EdgeIdx;

    #[test]
    fn preallocated_collections_start_empty() {
        let mut seen = set_with_capacity(8);
        assert!(seen.capacity() >= 8);
        assert!(seen.insert(EdgeIdx(3)));
        assert!(!seen.insert(EdgeIdx(3)));

        let mut by_edge: HashMap<EdgeIdx, usize> = map_with_capacity(4);
        assert!(by_edge.is_empty());
        by_edge.insert(EdgeIdx(1), 7);
        assert_eq!(by_edge.get(&EdgeIdx(1)), Some(&7));
        assert!(map_new::<EdgeIdx, usize>().is_empty());
    }
}
