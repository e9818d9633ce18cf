//! # Vector5db
//!
//! An embeddable similarity-search engine.
//!
//! This library provides:
//! - Collections of items (id, vector, metadata, document)
//! - Distance metrics (Euclidean, Cosine, Jaccard)
//! - Exact search with a brute-force scan or a k-d tree
//! - Approximate search with a product-quantized k-d tree or LSH buckets
//! - Exact-match metadata filters and distance ceilings
//!
//! ## Example
//!
//! ```rust
//! use vector5db::{Collection, CollectionConfig, DistanceMetric, Filter, IndexType, Metadata};
//!
//! let config = CollectionConfig::new(DistanceMetric::Euclidean, [IndexType::KdTree]);
//! let mut collection = Collection::new("docs", config).unwrap();
//!
//! let mut metadata = Metadata::new();
//! metadata.insert("category".to_string(), "A".to_string());
//! collection.add("item1", vec![1.0, 2.0, 3.0], metadata, "first").unwrap();
//! collection.add("item2", vec![4.0, 5.0, 6.0], Metadata::new(), "second").unwrap();
//!
//! let filter = Filter::new().with("category", "A");
//! let results = collection
//!     .query(&[vec![1.1, 2.1, 3.1]], 5, Some(&filter), None)
//!     .unwrap();
//! assert_eq!(results[0][0].item.id, "item1");
//! ```

pub mod brute_force;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod distance;
pub mod error;
pub mod index;
pub mod item;
pub mod kdtree;
pub mod lsh;
pub mod neighbor_queue;
pub mod pq;
pub mod vector;

pub use brute_force::BruteForceIndex;
pub use catalog::Database;
pub use collection::{Collection, QueryOptions, SearchResult};
pub use config::{CollectionConfig, LshParams, LshScheme, PqParams};
pub use distance::DistanceMetric;
pub use error::{Result, VectorDbError};
pub use index::{AnyIndex, Index, IndexType};
pub use item::{Filter, IndexKey, Item, Metadata};
pub use kdtree::KdTreeIndex;
pub use lsh::LshIndex;
pub use pq::{KdTreePqIndex, ProductQuantizer};
pub use vector::Vector;
