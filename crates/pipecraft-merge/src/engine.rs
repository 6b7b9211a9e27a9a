//! Merge operation engine
//!
//! Applies [`PathOperation`]s to a [`Document`] one at a time, in order.
//! Later operations observe the effects of earlier ones, so the order of a
//! batch encodes precedence.

use pipecraft_tree::{DocPath, Document, Entry, Node};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{MergeError, MergeResult};
use crate::operation::PathOperation;
use crate::strategy::Resolution;

/// What a single operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Optional operation on an absent path
    Skipped,
    /// Key did not exist and was created
    Inserted,
    /// Existing value replaced
    Replaced,
    /// Incoming value folded into the existing one
    Merged,
    /// Existing value preserved
    Kept,
}

/// Tally of outcomes for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub skipped: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub merged: usize,
    pub kept: usize,
}

impl ApplySummary {
    /// Count one outcome
    pub fn record(&mut self, outcome: Outcome) {
        let slot = match outcome {
            Outcome::Skipped => &mut self.skipped,
            Outcome::Inserted => &mut self.inserted,
            Outcome::Replaced => &mut self.replaced,
            Outcome::Merged => &mut self.merged,
            Outcome::Kept => &mut self.kept,
        };
        *slot += 1;
    }

    /// Number of operations that changed the document
    #[inline]
    #[must_use]
    pub fn changed(&self) -> usize {
        self.inserted + self.replaced + self.merged
    }
}

impl std::ops::AddAssign for ApplySummary {
    fn add_assign(&mut self, other: Self) {
        self.skipped += other.skipped;
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.merged += other.merged;
        self.kept += other.kept;
    }
}

/// Applies path operations against a template context
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    context: JsonValue,
    job_container: Option<DocPath>,
}

impl MergeEngine {
    /// Engine whose fragments resolve placeholders against `context`
    #[inline]
    #[must_use]
    pub fn new(context: JsonValue) -> Self {
        Self {
            context,
            job_container: None,
        }
    }

    /// Mark the map whose direct children are job identifiers
    ///
    /// Comments written on a job key are copied onto the job's map value.
    #[inline]
    #[must_use]
    pub fn with_job_container(mut self, path: DocPath) -> Self {
        self.job_container = Some(path);
        self
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &JsonValue {
        &self.context
    }

    /// Apply one operation
    ///
    /// # Errors
    /// - `EmptyPath` for an operation on the root
    /// - `Tree` when a required path runs through a non-map node
    /// - `Materialize` when the value cannot be built
    pub fn apply(&self, document: &mut Document, op: &PathOperation) -> MergeResult<Outcome> {
        let path = op.path();
        let (Some(parent_path), Some(key)) = (path.parent(), path.last()) else {
            return Err(MergeError::EmptyPath);
        };
        let strategy = op.policy().strategy();

        let exists = match document.contains(path) {
            Ok(exists) => exists,
            Err(err) if !op.is_required() => {
                debug!(path = %path, error = %err, "Skipping optional operation");
                return Ok(Outcome::Skipped);
            }
            Err(err) => return Err(err.into()),
        };
        if !exists && !op.is_required() {
            return Ok(Outcome::Skipped);
        }
        if exists && !strategy.uses_incoming() {
            debug!(path = %path, policy = %op.policy(), "Existing value kept");
            return Ok(Outcome::Kept);
        }

        let incoming = op
            .value()
            .materialize(&self.context)
            .map_err(|source| MergeError::Materialize {
                path: path.clone(),
                source,
            })?;

        let parent = document.ensure(&parent_path)?;
        let outcome = match parent.get_mut(key) {
            Some(existing) => match strategy.resolve(existing, incoming) {
                Resolution::Replaced => Outcome::Replaced,
                Resolution::Merged => Outcome::Merged,
                Resolution::Kept => Outcome::Kept,
            },
            None => {
                parent.insert_entry(key, Entry { value: incoming, meta: op.meta() });
                Outcome::Inserted
            }
        };

        if let Some(comment) = op.comment_before().filter(|_| outcome != Outcome::Kept) {
            // Existing keys with a comment are rewritten as a fresh pair in place
            if outcome != Outcome::Inserted {
                parent.set_meta(key, op.meta());
            }
            if self.is_job_path(path) {
                if let Some(Node::Map(job)) = parent.get_mut(key) {
                    job.set_comment(Some(comment.to_string()));
                }
            }
        }

        debug!(path = %path, policy = %op.policy(), ?outcome, "Applied path operation");
        Ok(outcome)
    }

    /// Apply operations strictly in the order given
    ///
    /// # Errors
    /// Stops at the first failing operation; see [`MergeEngine::apply`]
    pub fn apply_all(&self, document: &mut Document, ops: &[PathOperation]) -> MergeResult<ApplySummary> {
        let mut summary = ApplySummary::default();
        for op in ops {
            summary.record(self.apply(document, op)?);
        }
        Ok(summary)
    }

    fn is_job_path(&self, path: &DocPath) -> bool {
        self.job_container
            .as_ref()
            .is_some_and(|container| path.parent().as_ref() == Some(container))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::MergePolicy;
    use pipecraft_tree::{Materializable, TreeError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: JsonValue) -> Document {
        match Node::from(value) {
            Node::Map(map) => Document::from_root(map),
            other => panic!("expected map, got {}", other.kind()),
        }
    }

    fn path(s: &str) -> DocPath {
        s.parse().unwrap()
    }

    fn engine() -> MergeEngine {
        MergeEngine::new(json!({"initialBranch": "develop"})).with_job_container(path("jobs"))
    }

    #[test]
    fn optional_absent_path_is_a_no_op() {
        let mut d = doc(json!({"name": "x"}));
        let op = PathOperation::set(path("jobs.gate"), Node::from("v")).optional();
        assert_eq!(engine().apply(&mut d, &op).unwrap(), Outcome::Skipped);
        assert_eq!(d, doc(json!({"name": "x"})));
    }

    #[test]
    fn optional_through_scalar_is_skipped_but_required_fails() {
        let mut d = doc(json!({"jobs": "oops"}));
        let optional = PathOperation::set(path("jobs.gate"), Node::from("v")).optional();
        assert_eq!(engine().apply(&mut d, &optional).unwrap(), Outcome::Skipped);

        let required = PathOperation::set(path("jobs.gate"), Node::from("v"));
        assert!(matches!(
            engine().apply(&mut d, &required),
            Err(MergeError::Tree(TreeError::PathNotNavigable { .. }))
        ));
    }

    #[test]
    fn set_creates_parents_and_appends() {
        let mut d = doc(json!({"name": "x"}));
        let op = PathOperation::set(path("on.pull_request.branches"), Node::from(json!(["develop"])));
        assert_eq!(engine().apply(&mut d, &op).unwrap(), Outcome::Inserted);
        assert_eq!(d, doc(json!({"name": "x", "on": {"pull_request": {"branches": ["develop"]}}})));
    }

    #[test]
    fn overwrite_keeps_position_and_existing_meta() {
        let mut d = Document::parse("a: 1\n\n# note\nb: 2\nc: 3\n").unwrap();
        let op = PathOperation::overwrite(path("b"), Node::from(20));
        assert_eq!(engine().apply(&mut d, &op).unwrap(), Outcome::Replaced);
        assert_eq!(d.to_yaml(), "a: 1\n\n# note\nb: 20\nc: 3\n");
    }

    #[test]
    fn comment_rewrites_key_meta_in_place() {
        let mut d = Document::parse("a: 1\n# old\nb: 2\nc: 3\n").unwrap();
        let op = PathOperation::overwrite(path("b"), Node::from(20)).with_comment("new");
        engine().apply(&mut d, &op).unwrap();
        assert_eq!(d.to_yaml(), "a: 1\n# new\nb: 20\nc: 3\n");
    }

    #[test]
    fn job_comment_is_copied_to_value() {
        let mut d = Document::new();
        let op = PathOperation::overwrite(path("jobs.changes"), Node::from(json!({"runs-on": "ubuntu-latest"})))
            .with_comment("Detect changes");
        engine().apply(&mut d, &op).unwrap();
        let job = d.resolve(&path("jobs.changes")).unwrap().and_then(Node::as_map).unwrap();
        assert_eq!(job.comment(), Some("Detect changes"));
    }

    #[test]
    fn merge_sequences_deduplicates() {
        let mut d = doc(json!({"list": ["a", "b"]}));
        let op = PathOperation::merge(path("list"), Node::from(json!(["b", "c"])));
        assert_eq!(engine().apply(&mut d, &op).unwrap(), Outcome::Merged);
        assert_eq!(d, doc(json!({"list": ["a", "b", "c"]})));
    }

    #[test]
    fn merge_absent_behaves_as_set() {
        let mut d = Document::new();
        let op = PathOperation::merge(path("list"), Node::from(json!(["a"])));
        assert_eq!(engine().apply(&mut d, &op).unwrap(), Outcome::Inserted);
    }

    #[test]
    fn preserve_keeps_user_value() {
        let mut d = doc(json!({"custom": "user-value"}));
        let op = PathOperation::preserve(path("custom"), Node::from("template-value"));
        assert_eq!(engine().apply(&mut d, &op).unwrap(), Outcome::Kept);
        assert_eq!(d.root().get("custom"), Some(&Node::from("user-value")));

        let seed = PathOperation::preserve(path("other"), Node::from("template-value"));
        assert_eq!(engine().apply(&mut d, &seed).unwrap(), Outcome::Inserted);
    }

    #[test]
    fn preserve_does_not_materialize_discarded_values() {
        let mut d = doc(json!({"custom": 1}));
        let broken = PathOperation::preserve(path("custom"), Materializable::fragment("a: [unclosed"));
        assert_eq!(engine().apply(&mut d, &broken).unwrap(), Outcome::Kept);
    }

    #[test]
    fn fragments_use_the_engine_context() {
        let mut d = Document::new();
        let op = PathOperation::set(path("on.pull_request.branches"), Materializable::fragment("[${initialBranch}]"));
        engine().apply(&mut d, &op).unwrap();
        assert_eq!(
            d.resolve(&path("on.pull_request.branches")).unwrap(),
            Some(&Node::from(json!(["develop"])))
        );
    }

    #[test]
    fn apply_all_is_ordered() {
        let mut d = Document::new();
        let ops = vec![
            PathOperation::set(path("value"), Node::from("first")),
            PathOperation::preserve(path("value"), Node::from("second")),
            PathOperation::new(MergePolicy::Overwrite, path("other"), Node::from(1)),
            PathOperation::set(path("missing.child"), Node::from(1)).optional(),
        ];
        let summary = engine().apply_all(&mut d, &ops).unwrap();
        assert_eq!(d.root().get("value"), Some(&Node::from("first")));
        assert_eq!(
            summary,
            ApplySummary {
                skipped: 1,
                inserted: 2,
                replaced: 0,
                merged: 0,
                kept: 1,
            }
        );
        assert_eq!(summary.changed(), 2);

        let mut total = summary;
        total += summary;
        assert_eq!(total.kept, 2);
        assert_eq!(total.changed(), 4);
    }

    #[test]
    fn root_path_is_rejected() {
        let mut d = Document::new();
        let op = PathOperation::set(DocPath::root(), Node::from(1));
        assert!(matches!(engine().apply(&mut d, &op), Err(MergeError::EmptyPath)));
    }
}
