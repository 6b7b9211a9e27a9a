//! Documents and dot-path navigation
//!
//! A [`Document`] owns a root [`MapNode`]. [`Document::resolve`] walks an
//! existing path; [`Document::ensure`] walks and creates missing maps.

use crate::error::{TreeError, TreeResult};
use crate::node::{Entry, MapNode, Node};
use crate::path::DocPath;

/// An ordered document with a map at its root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: MapNode,
}

impl Document {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing root map
    #[inline]
    #[must_use]
    pub fn from_root(root: MapNode) -> Self {
        Self { root }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &MapNode {
        &self.root
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut MapNode {
        &mut self.root
    }

    /// Unwrap into the root map
    #[inline]
    #[must_use]
    pub fn into_root(self) -> MapNode {
        self.root
    }

    /// Resolve an existing node by path
    ///
    /// Returns `Ok(None)` when a segment is missing (the root itself is not
    /// addressable through this call; use [`Document::root`]).
    ///
    /// # Errors
    /// `PathNotNavigable` when an intermediate node is not a map
    pub fn resolve(&self, path: &DocPath) -> TreeResult<Option<&Node>> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Ok(None);
        };
        let Some(parent) = self.walk(path, parents)? else {
            return Ok(None);
        };
        Ok(parent.get(last))
    }

    /// Check whether a path resolves to a node
    ///
    /// # Errors
    /// `PathNotNavigable` when an intermediate node is not a map
    pub fn contains(&self, path: &DocPath) -> TreeResult<bool> {
        Ok(self.resolve(path)?.is_some())
    }

    /// Resolve an existing map by path; the empty path is the root
    ///
    /// # Errors
    /// `PathNotNavigable` when any node on the path is not a map
    pub fn resolve_map(&self, path: &DocPath) -> TreeResult<Option<&MapNode>> {
        self.walk(path, path.segments())
    }

    /// Mutable variant of [`Document::resolve_map`] that never creates nodes
    ///
    /// # Errors
    /// `PathNotNavigable` when any node on the path is not a map
    pub fn resolve_map_mut(&mut self, path: &DocPath) -> TreeResult<Option<&mut MapNode>> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = match current.get_mut(segment) {
                Some(Node::Map(map)) => map,
                Some(other) => {
                    return Err(TreeError::not_navigable(path, segment.clone(), other.kind()))
                }
                None => return Ok(None),
            };
        }
        Ok(Some(current))
    }

    /// Walk a path, creating an empty map at every missing segment
    ///
    /// # Errors
    /// `PathNotNavigable` when an existing node on the path is not a map
    pub fn ensure(&mut self, path: &DocPath) -> TreeResult<&mut MapNode> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = match current.get_or_insert_with(segment, Node::empty_map) {
                Node::Map(map) => map,
                other => {
                    return Err(TreeError::not_navigable(path, segment.clone(), other.kind()))
                }
            };
        }
        Ok(current)
    }

    /// Remove the node at a path, returning its entry
    ///
    /// # Errors
    /// `PathNotNavigable` when an intermediate node is not a map
    pub fn remove(&mut self, path: &DocPath) -> TreeResult<Option<Entry>> {
        let Some(parent_path) = path.parent() else {
            return Ok(None);
        };
        let key = path.last().unwrap_or_default();
        Ok(self
            .resolve_map_mut(&parent_path)?
            .and_then(|parent| parent.remove(key)))
    }

    fn walk<'a>(&'a self, path: &DocPath, segments: &[String]) -> TreeResult<Option<&'a MapNode>> {
        let mut current = &self.root;
        for segment in segments {
            current = match current.get(segment) {
                Some(Node::Map(map)) => map,
                Some(other) => {
                    return Err(TreeError::not_navigable(path, segment.clone(), other.kind()))
                }
                None => return Ok(None),
            };
        }
        Ok(Some(current))
    }
}

impl From<MapNode> for Document {
    fn from(root: MapNode) -> Self {
        Self::from_root(root)
    }
}
