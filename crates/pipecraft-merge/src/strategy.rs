//! Merge policies and their strategies
//!
//! Each [`MergePolicy`] is backed by a [`MergeStrategy`] that decides how an
//! incoming node combines with the node already at the target path. The
//! engine owns everything the policies share: skipping optional absent
//! paths, creating parents, and key metadata.

use pipecraft_tree::{Entry, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// How a path operation treats an existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Create or replace
    Set,
    /// Structural union of maps and sequences
    Merge,
    /// Unconditional replace
    Overwrite,
    /// Keep the existing value; seed only when absent
    Preserve,
}

impl MergePolicy {
    /// Strategy implementing this policy
    #[must_use]
    pub fn strategy(self) -> &'static dyn MergeStrategy {
        match self {
            Self::Set => &SetStrategy,
            Self::Merge => &UnionStrategy,
            Self::Overwrite => &OverwriteStrategy,
            Self::Preserve => &PreserveStrategy,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        self.strategy().name()
    }
}

impl Display for MergePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a strategy did with an existing value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Existing value replaced by the incoming one
    Replaced,
    /// Incoming value folded into the existing one
    Merged,
    /// Existing value left as it was
    Kept,
}

/// Combines an incoming node with the node already at a path
///
/// Only called when the target exists; an absent target is always seeded
/// with the incoming value.
pub trait MergeStrategy: Send + Sync + fmt::Debug {
    /// Fold `incoming` into `existing`
    fn resolve(&self, existing: &mut Node, incoming: Node) -> Resolution;

    /// Whether the incoming value is needed at all for an existing target
    ///
    /// Lets the engine skip materializing values that will be discarded.
    fn uses_incoming(&self) -> bool {
        true
    }

    /// Strategy name (matches the policy's serialized form)
    fn name(&self) -> &'static str;
}

/// `set`: create-or-replace
#[derive(Debug, Clone, Copy, Default)]
pub struct SetStrategy;

impl MergeStrategy for SetStrategy {
    fn resolve(&self, existing: &mut Node, incoming: Node) -> Resolution {
        *existing = incoming;
        Resolution::Replaced
    }

    fn name(&self) -> &'static str {
        "set"
    }
}

/// `overwrite`: unconditional replace
#[derive(Debug, Clone, Copy, Default)]
pub struct OverwriteStrategy;

impl MergeStrategy for OverwriteStrategy {
    fn resolve(&self, existing: &mut Node, incoming: Node) -> Resolution {
        *existing = incoming;
        Resolution::Replaced
    }

    fn name(&self) -> &'static str {
        "overwrite"
    }
}

/// `preserve`: existing value wins unconditionally
#[derive(Debug, Clone, Copy, Default)]
pub struct PreserveStrategy;

impl MergeStrategy for PreserveStrategy {
    fn resolve(&self, _existing: &mut Node, _incoming: Node) -> Resolution {
        Resolution::Kept
    }

    fn uses_incoming(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "preserve"
    }
}

/// `merge`: shallow map union, de-duplicated sequence append
///
/// Any other combination of node kinds falls back to overwrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionStrategy;

impl MergeStrategy for UnionStrategy {
    fn resolve(&self, existing: &mut Node, incoming: Node) -> Resolution {
        match (existing, incoming) {
            (Node::Map(current), Node::Map(update)) => {
                for (key, entry) in update.iter() {
                    if current.contains_key(key) {
                        current.insert(key, entry.value.clone());
                    } else {
                        current.insert_entry(key, entry.clone());
                    }
                }
                Resolution::Merged
            }
            (Node::Sequence(current), Node::Sequence(update)) => {
                append_unique(current, update);
                Resolution::Merged
            }
            (slot, incoming) => {
                *slot = incoming;
                Resolution::Replaced
            }
        }
    }

    fn name(&self) -> &'static str {
        "merge"
    }
}

/// Append items whose serialized form is not already present; kept items
/// keep their comments
fn append_unique(current: &mut Vec<Entry>, update: Vec<Entry>) {
    let mut seen: HashSet<String> = current.iter().map(|item| item.value.canonical()).collect();
    for item in update {
        if seen.insert(item.value.canonical()) {
            current.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: serde_json::Value) -> Node {
        Node::from(value)
    }

    #[test]
    fn display_matches_serde_names() {
        for policy in [MergePolicy::Set, MergePolicy::Merge, MergePolicy::Overwrite, MergePolicy::Preserve] {
            assert_eq!(serde_json::to_string(&policy).unwrap(), format!("\"{policy}\""));
        }
        assert_eq!(MergePolicy::Overwrite.to_string(), "overwrite");
    }

    #[test]
    fn union_deduplicates_sequences() {
        let mut existing = node(json!(["a", "b"]));
        let resolution = UnionStrategy.resolve(&mut existing, node(json!(["b", "c"])));
        assert_eq!(resolution, Resolution::Merged);
        assert_eq!(existing, node(json!(["a", "b", "c"])));
    }

    #[test]
    fn union_compares_structured_items_by_value() {
        let mut existing = node(json!([{"uses": "actions/checkout@v4"}]));
        UnionStrategy.resolve(
            &mut existing,
            node(json!([{"uses": "actions/checkout@v4"}, {"run": "make"}])),
        );
        assert_eq!(existing, node(json!([{"uses": "actions/checkout@v4"}, {"run": "make"}])));
    }

    #[test]
    fn union_overwrites_map_keys_in_place() {
        let mut existing = node(json!({"a": 1, "b": 2, "c": 3}));
        UnionStrategy.resolve(&mut existing, node(json!({"b": 20, "d": 4})));
        assert_eq!(existing, node(json!({"a": 1, "b": 20, "c": 3, "d": 4})));
        let keys: Vec<_> = existing.as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn union_of_mismatched_kinds_overwrites() {
        let mut existing = node(json!("scalar"));
        let resolution = UnionStrategy.resolve(&mut existing, node(json!(["x"])));
        assert_eq!(resolution, Resolution::Replaced);
        assert_eq!(existing, node(json!(["x"])));
    }

    #[test]
    fn preserve_keeps_existing() {
        let mut existing = node(json!("user-value"));
        assert_eq!(
            PreserveStrategy.resolve(&mut existing, node(json!("template-value"))),
            Resolution::Kept
        );
        assert_eq!(existing, node(json!("user-value")));
        assert!(!PreserveStrategy.uses_incoming());
    }
}
