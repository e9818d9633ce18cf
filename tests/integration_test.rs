//! Integration tests for collections, indexes and the catalog

use vector5db::{
    Collection, CollectionConfig, Database, DistanceMetric, Filter, IndexType, LshParams,
    Metadata, PqParams, QueryOptions, SearchResult,
};

fn category(value: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("category".to_string(), value.to_string());
    metadata
}

fn five_items(config: CollectionConfig) -> Collection {
    let mut collection = Collection::new("items", config).unwrap();
    collection.add("item1", vec![1.0, 2.0, 3.0], category("A"), "one").unwrap();
    collection.add("item2", vec![4.0, 5.0, 6.0], category("B"), "two").unwrap();
    collection.add("item3", vec![7.0, 8.0, 9.0], category("A"), "three").unwrap();
    collection.add("item4", vec![0.0, 1.0, 2.0], category("B"), "four").unwrap();
    collection.add("item5", vec![3.0, 4.0, 5.0], category("A"), "five").unwrap();
    collection
}

fn seeded(metric: DistanceMetric) -> CollectionConfig {
    CollectionConfig::all_indexes(metric)
        .with_pq(PqParams::new(3, 8).with_seed(3))
        .with_lsh(LshParams::hyperplane(10, 5).with_seed(3))
}

fn ids(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.item.id.as_str()).collect()
}

#[test]
fn test_basic_workflow() {
    let mut collection = five_items(CollectionConfig::default());
    assert_eq!(collection.count(), 5);

    let results = collection.query(&[vec![1.0, 2.0, 3.0]], 1, None, None).unwrap();
    assert_eq!(ids(&results[0]), vec!["item1"]);

    collection.delete("item1");
    assert_eq!(collection.count(), 4);
    let results = collection.query(&[vec![1.0, 2.0, 3.0]], 1, None, None).unwrap();
    assert_eq!(ids(&results[0]), vec!["item4"]);
}

#[test]
fn test_exact_matches_under_every_metric_and_index() {
    for metric in [DistanceMetric::Euclidean, DistanceMetric::Cosine, DistanceMetric::Jaccard] {
        let mut collection = five_items(seeded(metric));
        for index in IndexType::ALL {
            let results = collection
                .query(&[vec![1.0, 2.0, 3.0], vec![7.0, 8.0, 9.0]], 1, None, Some(index))
                .unwrap();
            assert_eq!(ids(&results[0]), vec!["item1"], "{metric} / {index}");
            assert_eq!(ids(&results[1]), vec!["item3"], "{metric} / {index}");
        }
    }
}

#[test]
fn test_filtered_queries_on_exact_indexes() {
    let mut collection = five_items(seeded(DistanceMetric::Euclidean));
    let b = Filter::new().with("category", "B");
    let c = Filter::new().with("category", "C");

    for index in [IndexType::BruteForce, IndexType::KdTree] {
        let results = collection
            .query(&[vec![1.0, 2.0, 3.0]], 1, Some(&b), Some(index))
            .unwrap();
        assert_eq!(ids(&results[0]), vec!["item4"]);

        let results = collection
            .query(&[vec![1.0, 2.0, 3.0]], 1, Some(&c), Some(index))
            .unwrap();
        assert!(results[0].is_empty());
    }
}

#[test]
fn test_filters_never_leak_on_approximate_indexes() {
    let mut collection = five_items(seeded(DistanceMetric::Euclidean));
    let a = Filter::new().with("category", "A");
    for index in [IndexType::KdTreePq, IndexType::Lsh] {
        let results = collection
            .query(&[vec![4.0, 5.0, 6.0]], 5, Some(&a), Some(index))
            .unwrap();
        assert!(results[0].iter().all(|r| r.item.metadata["category"] == "A"));
    }
}

#[test]
fn test_results_are_sorted_and_bounded() {
    let mut collection = five_items(seeded(DistanceMetric::Euclidean));
    for index in IndexType::ALL {
        for n in [0, 2, 10] {
            let results = collection
                .query(&[vec![2.0, 3.0, 4.0]], n, None, Some(index))
                .unwrap();
            assert!(results[0].len() <= n);
            assert!(results[0].windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }

    let results = collection
        .query(&[vec![2.0, 3.0, 4.0]], 10, None, Some(IndexType::KdTree))
        .unwrap();
    assert_eq!(results[0].len(), 5);
}

#[test]
fn test_query_with_max_distance() {
    let mut collection = five_items(seeded(DistanceMetric::Euclidean));
    let options = QueryOptions::new(5)
        .max_distance(0.5)
        .index(IndexType::BruteForce);
    let results = collection.query_with(&[vec![1.0, 2.0, 3.0]], &options).unwrap();
    assert_eq!(ids(&results[0]), vec!["item1"]);
}

#[test]
fn test_kdtree_two_dimensional_scenario() {
    let config = CollectionConfig::new(DistanceMetric::Euclidean, [IndexType::KdTree]);
    let mut collection = Collection::new("points", config).unwrap();
    for (id, point) in [("a", [1.0, 2.0]), ("b", [3.0, 4.0]), ("c", [5.0, 6.0]), ("d", [7.0, 8.0])] {
        collection.add(id, point.to_vec(), Metadata::new(), "").unwrap();
    }

    let results = collection.query(&[vec![3.0, 3.0]], 2, None, None).unwrap();
    assert_eq!(ids(&results[0]), vec!["b", "a"]);

    collection.delete("b");
    let results = collection.query(&[vec![3.0, 3.0]], 2, None, None).unwrap();
    assert_eq!(ids(&results[0]), vec!["a", "c"]);
}

#[test]
fn test_catalog_workflow() {
    let mut db = Database::new();
    let docs = db
        .create_collection("docs", CollectionConfig::new(DistanceMetric::Cosine, [IndexType::Lsh]))
        .unwrap();
    docs.add("x", vec![1.0, 0.0], Metadata::new(), "").unwrap();

    let same = db
        .get_or_create_collection("docs", CollectionConfig::default())
        .unwrap();
    assert_eq!(same.count(), 1);
    assert_eq!(same.index_types().collect::<Vec<_>>(), vec![IndexType::Lsh]);

    db.get_or_create_collection("other", CollectionConfig::default()).unwrap();
    assert_eq!(db.list_collections(), vec!["docs", "other"]);

    db.delete_collection("docs");
    assert_eq!(db.list_collections(), vec!["other"]);
    db.reset();
    assert!(db.is_empty());
}

#[test]
fn test_empty_collection_queries() {
    let mut collection = Collection::new("empty", seeded(DistanceMetric::Euclidean)).unwrap();
    for index in IndexType::ALL {
        let results = collection.query(&[vec![1.0, 2.0]], 3, None, Some(index)).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_empty());
    }
    let results = collection.query(&[], 3, None, None).unwrap();
    assert!(results.is_empty());
}
