//! Path operations
//!
//! A [`PathOperation`] is one instruction for the engine: a target path, a
//! policy, the value to materialize, and optional key formatting.

use pipecraft_tree::{DocPath, KeyMeta, Materializable};

use crate::strategy::MergePolicy;

/// One merge instruction, built fresh for each generation pass
#[derive(Debug, Clone, PartialEq)]
pub struct PathOperation {
    path: DocPath,
    policy: MergePolicy,
    value: Materializable,
    required: bool,
    comment_before: Option<String>,
    space_before: bool,
}

impl PathOperation {
    /// Create a required operation without formatting metadata
    #[must_use]
    pub fn new(policy: MergePolicy, path: DocPath, value: impl Into<Materializable>) -> Self {
        Self {
            path,
            policy,
            value: value.into(),
            required: true,
            comment_before: None,
            space_before: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn set(path: DocPath, value: impl Into<Materializable>) -> Self {
        Self::new(MergePolicy::Set, path, value)
    }

    #[inline]
    #[must_use]
    pub fn merge(path: DocPath, value: impl Into<Materializable>) -> Self {
        Self::new(MergePolicy::Merge, path, value)
    }

    #[inline]
    #[must_use]
    pub fn overwrite(path: DocPath, value: impl Into<Materializable>) -> Self {
        Self::new(MergePolicy::Overwrite, path, value)
    }

    #[inline]
    #[must_use]
    pub fn preserve(path: DocPath, value: impl Into<Materializable>) -> Self {
        Self::new(MergePolicy::Preserve, path, value)
    }

    /// Skip the operation when its path is absent
    #[inline]
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a comment above the target key
    #[inline]
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment_before = Some(comment.into());
        self
    }

    /// Emit a blank line before the target key
    #[inline]
    #[must_use]
    pub fn with_space_before(mut self) -> Self {
        self.space_before = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &Materializable {
        &self.value
    }

    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[inline]
    #[must_use]
    pub fn comment_before(&self) -> Option<&str> {
        self.comment_before.as_deref()
    }

    /// Key metadata this operation writes
    #[must_use]
    pub fn meta(&self) -> KeyMeta {
        KeyMeta {
            comment_before: self.comment_before.clone(),
            space_before: self.space_before,
            ..KeyMeta::default()
        }
    }
}
