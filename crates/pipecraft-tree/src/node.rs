//! Tree node model
//!
//! An ordered document is a tree of [`Node`]s: insertion-ordered maps with
//! unique string keys, sequences, and scalar leaves. Formatting metadata
//! ([`KeyMeta`]) rides on map entries and sequence items so a banner comment
//! stays attached to the key or item it introduces, whatever happens to the
//! value.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

/// A node in a document tree
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered map with unique keys
    Map(MapNode),
    /// Ordered list; items carry their own formatting metadata
    Sequence(Vec<Entry>),
    /// Leaf value
    Scalar(Scalar),
}

/// Scalar leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Formatting metadata attached to a map key or sequence item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMeta {
    /// Comment lines emitted above the key (without the `#` marker)
    pub comment_before: Option<String>,
    /// Emit a blank line before the key
    pub space_before: bool,
    /// Comment at the end of the key line
    pub comment_inline: Option<String>,
    /// Comment lines closing the value, at the key's indentation
    pub comment_after: Option<String>,
}

impl KeyMeta {
    /// Metadata carrying only a comment
    #[inline]
    #[must_use]
    pub fn with_comment(comment: impl Into<String>) -> Self {
        Self {
            comment_before: Some(comment.into()),
            ..Self::default()
        }
    }

    /// Check if there is nothing to emit
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comment_before.is_none()
            && !self.space_before
            && self.comment_inline.is_none()
            && self.comment_after.is_none()
    }
}

/// A value with its formatting metadata: one pair of a [`MapNode`] or one
/// item of a sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub value: Node,
    pub meta: KeyMeta,
}

impl Entry {
    /// Entry without formatting metadata
    #[inline]
    #[must_use]
    pub fn new(value: Node) -> Self {
        Self {
            value,
            meta: KeyMeta::default(),
        }
    }
}

/// Insertion-ordered map node
///
/// # Invariants
/// - Keys are unique
/// - Replacing an existing key keeps its position; new keys append
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapNode {
    entries: IndexMap<String, Entry>,
    /// Comment copy carried by the value itself (job bodies)
    comment: Option<String>,
}

impl MapNode {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Get value by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Get mutable value by key
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.get_mut(key).map(|e| &mut e.value)
    }

    /// Get the full entry (value and key metadata)
    #[inline]
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    #[inline]
    pub fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// Position of a key in emission order
    #[inline]
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Insert a value, keeping position and key metadata of an existing key
    ///
    /// Returns the previous value if the key existed.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        match self.entries.get_mut(&key) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.entries.insert(key, Entry::new(value));
                None
            }
        }
    }

    /// Get the value for a key, appending one built by `f` if absent
    pub fn get_or_insert_with<F>(&mut self, key: &str, f: F) -> &mut Node
    where
        F: FnOnce() -> Node,
    {
        &mut self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(f()))
            .value
    }

    /// Insert a fresh pair, replacing value and key metadata
    ///
    /// An existing key keeps its position.
    pub fn insert_entry(&mut self, key: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(key.into(), entry)
    }

    /// Remove a key, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.shift_remove(key)
    }

    /// Replace the key metadata of an existing key
    ///
    /// Returns `false` if the key does not exist.
    pub fn set_meta(&mut self, key: &str, meta: KeyMeta) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.meta = meta;
                true
            }
            None => false,
        }
    }

    /// Keys in emission order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in emission order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Mutable entries in emission order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Entry)> {
        self.entries.iter_mut().map(|(k, e)| (k.as_str(), e))
    }

    /// Reorder entries by rank; ties keep their relative order
    pub fn sort_by_rank<F>(&mut self, mut rank: F)
    where
        F: FnMut(&str) -> usize,
    {
        self.entries.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
    }

    /// Value-level comment
    #[inline]
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Set value-level comment
    #[inline]
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for MapNode {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Node {
    /// Empty map node
    #[inline]
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(MapNode::new())
    }

    /// String scalar
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(value.into()))
    }

    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&MapNode> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map_mut(&mut self) -> Option<&mut MapNode> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Entry]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Human-readable kind, used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Map(_) => "map",
            Self::Sequence(_) => "sequence",
            Self::Scalar(_) => "scalar",
        }
    }

    /// Convert to a JSON value (metadata is dropped)
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(k, e)| (k.to_string(), e.value.to_json()))
                    .collect(),
            ),
            Self::Sequence(items) => JsonValue::Array(items.iter().map(|e| e.value.to_json()).collect()),
            Self::Scalar(Scalar::Null) => JsonValue::Null,
            Self::Scalar(Scalar::Bool(b)) => JsonValue::Bool(*b),
            Self::Scalar(Scalar::Int(i)) => JsonValue::from(*i),
            Self::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            Self::Scalar(Scalar::String(s)) => JsonValue::String(s.clone()),
        }
    }

    /// Serialized value form used for equality during de-duplication
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_json().to_string()
    }
}

impl From<JsonValue> for Node {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Scalar(Scalar::Null),
            JsonValue::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Scalar(Scalar::Int(i)),
                None => Self::Scalar(Scalar::Float(n.as_f64().unwrap_or_default())),
            },
            JsonValue::String(s) => Self::Scalar(Scalar::String(s)),
            JsonValue::Array(items) => {
                Self::Sequence(items.into_iter().map(|v| Entry::new(Self::from(v))).collect())
            }
            JsonValue::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Self::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<MapNode> for Node {
    fn from(value: MapNode) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Self::Sequence(value.into_iter().map(Entry::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_existing_key_keeps_position_and_meta() {
        let mut map: MapNode = [("a", Node::from(1)), ("b", Node::from(2)), ("c", Node::from(3))]
            .into_iter()
            .collect();
        map.set_meta("b", KeyMeta::with_comment("keep me"));

        let previous = map.insert("b", Node::from("two"));

        assert_eq!(previous, Some(Node::from(2)));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(map.entry("b").unwrap().meta.comment_before.as_deref(), Some("keep me"));
    }

    #[test]
    fn insert_new_key_appends() {
        let mut map: MapNode = [("a", Node::from(1))].into_iter().collect();
        map.insert("z", Node::from(2));
        map.insert("m", Node::from(3));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "z", "m"]);
    }

    #[test]
    fn insert_entry_replaces_meta_in_place() {
        let mut map: MapNode = [("a", Node::from(1)), ("b", Node::from(2))].into_iter().collect();
        map.set_meta("a", KeyMeta::with_comment("old"));
        map.insert_entry(
            "a",
            Entry {
                value: Node::from(9),
                meta: KeyMeta::with_comment("new"),
            },
        );
        assert_eq!(map.position("a"), Some(0));
        assert_eq!(map.entry("a").unwrap().meta.comment_before.as_deref(), Some("new"));
    }

    #[test]
    fn remove_preserves_order() {
        let mut map: MapNode = [("a", Node::from(1)), ("b", Node::from(2)), ("c", Node::from(3))]
            .into_iter()
            .collect();
        map.remove("b");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn sort_by_rank_is_stable() {
        let mut map: MapNode = [("x", Node::from(1)), ("b", Node::from(2)), ("a", Node::from(3))]
            .into_iter()
            .collect();
        map.sort_by_rank(|k| usize::from(k != "a"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "x", "b"]);
    }

    #[test]
    fn sequence_items_carry_meta() {
        let mut node = Node::from(vec![Node::from("a"), Node::from("b")]);
        if let Node::Sequence(items) = &mut node {
            items[1].meta = KeyMeta::with_comment("second");
        }
        let items = node.as_sequence().unwrap();
        assert!(items[0].meta.is_empty());
        assert_eq!(items[1].meta.comment_before.as_deref(), Some("second"));
        assert_eq!(node.to_json(), json!(["a", "b"]));
    }

    #[test]
    fn json_conversion_preserves_order() {
        let node = Node::from(json!({"z": 1, "a": [true, null, "s"], "m": 1.5}));
        let map = node.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(node.canonical(), r#"{"z":1,"a":[true,null,"s"],"m":1.5}"#);
    }
}
