//! Items stored in a collection and the projections indexes keep of them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::vector::Vector;

/// Metadata associated with an item: string keys to string values.
pub type Metadata = HashMap<String, String>;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub vector: Vector,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub document: String,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        vector: impl Into<Vector>,
        metadata: Metadata,
        document: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vector: vector.into(),
            metadata,
            document: document.into(),
        }
    }
}

/// An exact-match conjunction over item metadata.
///
/// An item matches iff every key in the filter is present in the item's
/// metadata with an equal value. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    clauses: BTreeMap<String, String>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `key == value` clause.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.clauses
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.clauses.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filter {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            clauses: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Convenience check for an optional filter: `None` matches everything.
pub fn matches_filter(filter: Option<&Filter>, metadata: &Metadata) -> bool {
    filter.map_or(true, |f| f.matches(metadata))
}

/// The projection of an item that indexes keep: internal id, vector, metadata.
///
/// The internal id is assigned by the collection; ascending ids follow
/// insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexKey {
    pub id: usize,
    pub vector: Vector,
    pub metadata: Metadata,
}

impl IndexKey {
    pub fn new(id: usize, vector: Vector, metadata: Metadata) -> Self {
        Self {
            id,
            vector,
            metadata,
        }
    }

    pub fn from_item(id: usize, item: &Item) -> Self {
        Self::new(id, item.vector.clone(), item.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&meta(&[])));
        assert!(Filter::new().matches(&meta(&[("category", "A")])));
        assert!(matches_filter(None, &meta(&[])));
    }

    #[test]
    fn test_filter_requires_every_key() {
        let filter = Filter::new().with("category", "A").with("lang", "en");
        assert!(filter.matches(&meta(&[("category", "A"), ("lang", "en"), ("x", "y")])));
        assert!(!filter.matches(&meta(&[("category", "A")])));
        assert!(!filter.matches(&meta(&[("category", "B"), ("lang", "en")])));
    }

    #[test]
    fn test_filter_from_iter() {
        let filter: Filter = [("category", "B")].into_iter().collect();
        assert!(filter.matches(&meta(&[("category", "B")])));
        assert!(!filter.matches(&meta(&[("category", "A")])));
    }

    #[test]
    fn test_item_deserialize_defaults() {
        let item: Item = serde_json::from_str(r#"{"id": "a", "vector": [1.0, 2.0]}"#).unwrap();
        assert_eq!(item.id, "a");
        assert!(item.metadata.is_empty());
        assert_eq!(item.document, "");
    }
}
