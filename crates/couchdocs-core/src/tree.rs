//! The in-memory document tree.
//!
//! A DocumentTree is what a directory of design files turns into before
//! it goes over the wire: nested string keys down to leaves that are
//! either source code or parsed JSON. Every per-file contribution is a
//! single-branch tree, and the directory as a whole is their deep merge.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use tracing::warn;

/// A single value in a document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Source text read from a code file. May carry expanded macro blocks.
    Code(String),
    /// A parsed JSON value. Never macro-processed.
    Json(serde_json::Value),
    /// A nested level, one directory deeper on disk.
    Tree(DocumentTree),
}

impl Value {
    /// Converts a remote JSON value into a tree value.
    ///
    /// Objects become nested trees and strings become code, which is how
    /// the dump direction decides what ends up as a directory, a `.js`
    /// file or a `.json` file.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Value::Tree(DocumentTree::from_json_object(map)),
            serde_json::Value::String(text) => Value::Code(text),
            other => Value::Json(other),
        }
    }

    /// Converts the value into the JSON sent to the store.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Code(text) => serde_json::Value::String(text.clone()),
            Value::Json(value) => value.clone(),
            Value::Tree(tree) => tree.to_json(),
        }
    }

    /// Returns the nested tree, if this value is one.
    pub fn as_tree(&self) -> Option<&DocumentTree> {
        match self {
            Value::Tree(tree) => Some(tree),
            _ => None,
        }
    }
}

impl From<DocumentTree> for Value {
    fn from(tree: DocumentTree) -> Self {
        Value::Tree(tree)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Code(text) => serializer.serialize_str(text),
            Value::Json(value) => value.serialize(serializer),
            Value::Tree(tree) => tree.serialize(serializer),
        }
    }
}

/// Nested key to value mapping. Keys are unique per level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentTree {
    entries: BTreeMap<String, Value>,
}

impl DocumentTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a single-branch tree from path segments and a leaf.
    ///
    /// The last segment pairs directly with `value`; every segment before
    /// it wraps the result in one more level. `["a", "b", "c"]` with `v`
    /// gives `{a: {b: {c: v}}}`. No segments gives an empty tree.
    pub fn from_path<I>(segments: I, value: Value) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut segments = segments.into_iter().rev();
        let Some(last) = segments.next() else {
            return Self::new();
        };

        let mut tree = Self::from_iter([(last, value)]);
        for segment in segments {
            tree = Self::from_iter([(segment, Value::Tree(tree))]);
        }
        tree
    }

    /// Converts a JSON object into a tree, recursively.
    pub fn from_json_object(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(key, value)| (key, Value::from_json(value)))
            .collect()
    }

    /// Deep-merges `other` into this tree.
    ///
    /// Trees on both sides of a key are merged recursively. Anything else
    /// colliding at the same key is resolved in favor of `other` (the later
    /// contribution), with a warning since it usually means two files map
    /// to the same document path.
    pub fn merge(&mut self, other: DocumentTree) {
        for (key, incoming) in other.entries {
            match self.entries.get_mut(&key) {
                Some(current) => match (current, incoming) {
                    (Value::Tree(existing), Value::Tree(incoming)) => existing.merge(incoming),
                    (current, incoming) => {
                        if *current != incoming {
                            warn!(key = %key, "conflicting values for key, keeping the later one");
                        }
                        *current = incoming;
                    }
                },
                None => {
                    self.entries.insert(key, incoming);
                }
            }
        }
    }

    /// Inserts a value, returning whatever was there before.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Looks up a key at this level.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Removes a key at this level.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Number of keys at this level.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over this level in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Serializes the tree as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for DocumentTree {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for DocumentTree {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentTree {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for DocumentTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn code(text: &str) -> Value {
        Value::Code(text.to_string())
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_path_nests_segments() {
        let tree = DocumentTree::from_path(path(&["a", "b", "c"]), code("d"));

        let expected: DocumentTree = [(
            "a".to_string(),
            Value::Tree(DocumentTree::from_iter([(
                "b".to_string(),
                Value::Tree(DocumentTree::from_iter([("c".to_string(), code("d"))])),
            )])),
        )]
        .into_iter()
        .collect();

        assert_eq!(tree, expected);
    }

    #[test]
    fn test_from_path_without_segments_is_empty() {
        let tree = DocumentTree::from_path(Vec::new(), code("lost"));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_merge_unions_nested_keys() {
        let mut tree = DocumentTree::from_path(path(&["a", "b", "c"]), code("one"));
        tree.merge(DocumentTree::from_path(path(&["a", "b", "d"]), code("two")));
        tree.merge(DocumentTree::from_path(
            path(&["a", "e"]),
            Value::Json(json!([{"one": "2"}])),
        ));

        assert_eq!(
            tree.to_json(),
            json!({"a": {"b": {"c": "one", "d": "two"}, "e": [{"one": "2"}]}})
        );
    }

    #[test]
    fn test_merge_collision_keeps_later_value() {
        let mut tree = DocumentTree::from_path(path(&["a", "b"]), code("tree-side"));
        tree.merge(DocumentTree::from_path(path(&["a"]), code("leaf")));
        assert_eq!(tree.get("a"), Some(&code("leaf")));

        tree.merge(DocumentTree::from_path(path(&["a", "x"]), code("again")));
        assert_eq!(tree.to_json(), json!({"a": {"x": "again"}}));
    }

    #[test]
    fn test_from_json_classifies_values() {
        let value = Value::from_json(json!({"map": "function(doc){}", "n": 1, "list": ["x"]}));
        let tree = value.as_tree().unwrap();

        assert_eq!(tree.get("map"), Some(&code("function(doc){}")));
        assert_eq!(tree.get("n"), Some(&Value::Json(json!(1))));
        assert_eq!(tree.get("list"), Some(&Value::Json(json!(["x"]))));
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let tree = DocumentTree::from_path(path(&["views", "all", "map"]), code("fn"));
        let via_serde = serde_json::to_value(&tree).unwrap();
        assert_eq!(via_serde, tree.to_json());
        assert_eq!(
            serde_json::to_string(&tree).unwrap(),
            r#"{"views":{"all":{"map":"fn"}}}"#
        );
    }
}
