//! Property-based tests for collections and indexes.
//!
//! These tests verify invariants that should hold regardless of input:
//! - The k-d tree returns exactly the brute-force top-k under Euclidean distance
//! - Filtered queries never return a non-matching item
//! - Result lists are bounded by the requested size
//! - Deleted items never come back
//! - Rebuilding without mutation does not change results
//! - `add` followed by `get` returns the item that was added

use proptest::prelude::*;
use vector5db::{
    BruteForceIndex, Collection, CollectionConfig, DistanceMetric, Filter, Index, IndexKey,
    IndexType, Item, KdTreeIndex, LshParams, Metadata, PqParams, Vector,
};

const DIM: usize = 3;

prop_compose! {
    fn arb_vector(dim: usize)(vec in prop::collection::vec(-10.0f64..10.0, dim)) -> Vec<f64> {
        vec
    }
}

prop_compose! {
    fn arb_dataset(max_len: usize)(
        rows in prop::collection::vec((arb_vector(DIM), 0..3u8), 1..max_len)
    ) -> Vec<(Vec<f64>, u8)> {
        rows
    }
}

fn tag(label: u8) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("tag".to_string(), label.to_string());
    metadata
}

fn seeded_config() -> CollectionConfig {
    CollectionConfig::all_indexes(DistanceMetric::Euclidean)
        .with_pq(PqParams::new(2, 4).with_seed(7))
        .with_lsh(LshParams::projection(5, 1).with_seed(7))
}

fn collection_from(rows: &[(Vec<f64>, u8)]) -> Collection {
    let mut collection = Collection::new("prop", seeded_config()).unwrap();
    for (i, (vector, label)) in rows.iter().enumerate() {
        collection
            .add(format!("id{i}"), vector.clone(), tag(*label), "")
            .unwrap();
    }
    collection
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn kdtree_matches_brute_force(
        rows in arb_dataset(60),
        query in arb_vector(DIM),
        k in 1usize..12,
    ) {
        let mut flat = BruteForceIndex::new(DistanceMetric::Euclidean);
        let mut kd = KdTreeIndex::new(DistanceMetric::Euclidean);
        for (i, (vector, label)) in rows.iter().enumerate() {
            let key = IndexKey::new(i, Vector::new(vector.clone()), tag(*label));
            flat.add(key.clone()).unwrap();
            kd.add(key).unwrap();
        }
        kd.build().unwrap();

        let expected = flat.search(&query, k, None, None).unwrap();
        let actual = kd.search(&query, k, None, None).unwrap();
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn kdtree_incremental_matches_brute_force(
        rows in arb_dataset(40),
        removals in prop::collection::vec(0usize..40, 0..10),
        query in arb_vector(DIM),
    ) {
        let mut flat = BruteForceIndex::new(DistanceMetric::Euclidean);
        let mut kd = KdTreeIndex::new(DistanceMetric::Euclidean);
        for (i, (vector, label)) in rows.iter().enumerate() {
            let key = IndexKey::new(i, Vector::new(vector.clone()), tag(*label));
            flat.add(key.clone()).unwrap();
            kd.add(key).unwrap();
        }
        for id in removals {
            flat.remove(id);
            kd.remove(id);
        }

        let filter = Filter::new().with("tag", "1");
        let expected = flat.search(&query, 5, None, Some(&filter)).unwrap();
        let actual = kd.search(&query, 5, None, Some(&filter)).unwrap();
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn filtered_results_always_match(
        rows in arb_dataset(40),
        query in arb_vector(DIM),
        label in 0..4u8,
    ) {
        let mut collection = collection_from(&rows);
        let filter = Filter::new().with("tag", label.to_string());
        for index in IndexType::ALL {
            let results = collection.query(&[query.clone()], 10, Some(&filter), Some(index)).unwrap();
            for hit in &results[0] {
                prop_assert_eq!(&hit.item.metadata["tag"], &label.to_string());
            }
        }
    }

    #[test]
    fn result_size_is_bounded(
        rows in arb_dataset(40),
        query in arb_vector(DIM),
        n in 0usize..50,
    ) {
        let mut collection = collection_from(&rows);
        for index in IndexType::ALL {
            let results = collection.query(&[query.clone()], n, None, Some(index)).unwrap();
            prop_assert!(results[0].len() <= n);
            if index.is_exact() {
                prop_assert_eq!(results[0].len(), n.min(rows.len()));
            }
        }
    }

    #[test]
    fn filtered_result_size_counts_matching_items(
        rows in arb_dataset(40),
        query in arb_vector(DIM),
        label in 0..4u8,
        n in 0usize..50,
    ) {
        let mut collection = collection_from(&rows);
        let filter = Filter::new().with("tag", label.to_string());
        let matching = rows.iter().filter(|(_, l)| *l == label).count();
        for index in IndexType::ALL.into_iter().filter(IndexType::is_exact) {
            let results = collection.query(&[query.clone()], n, Some(&filter), Some(index)).unwrap();
            prop_assert_eq!(results[0].len(), n.min(matching));
        }
    }

    #[test]
    fn deleted_items_never_return(
        rows in arb_dataset(30),
        query in arb_vector(DIM),
        victim in 0usize..30,
    ) {
        let mut collection = collection_from(&rows);
        let id = format!("id{}", victim % rows.len());
        prop_assert!(collection.delete(&id).is_some());
        prop_assert!(collection.get(&id).is_none());
        for index in IndexType::ALL {
            let results = collection.query(&[query.clone()], rows.len(), None, Some(index)).unwrap();
            prop_assert!(results[0].iter().all(|r| r.item.id != id));
        }
    }

    #[test]
    fn rebuild_is_idempotent(
        rows in arb_dataset(40),
        query in arb_vector(DIM),
    ) {
        let mut collection = collection_from(&rows);
        for index in IndexType::ALL {
            let first = collection.query(&[query.clone()], 5, None, Some(index)).unwrap();
            let second = collection.query(&[query.clone()], 5, None, Some(index)).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn add_then_get_round_trips(
        vector in arb_vector(DIM),
        label in 0..3u8,
        document in "[a-z ]{0,20}",
    ) {
        let mut collection = Collection::new("prop", CollectionConfig::default()).unwrap();
        collection.add("x", vector.clone(), tag(label), document.clone()).unwrap();
        let expected = Item::new("x", vector, tag(label), document);
        prop_assert_eq!(collection.get("x"), Some(&expected));
    }
}
