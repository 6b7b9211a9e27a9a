//! Value materialization
//!
//! Merge operations carry a [`Materializable`]: an already-built node, a
//! whole document, a JSON value, or a textual template fragment with
//! `${path}` placeholders. [`Materializable::materialize`] turns any of
//! these into a [`Node`] against a JSON context.
//!
//! GitHub expressions (`${{ ... }}`) are not placeholders and pass through
//! untouched.

use crate::document::Document;
use crate::error::TreeResult;
use crate::node::Node;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use tracing::debug;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^{}]+)\}").unwrap_or_else(|e| panic!("placeholder pattern is valid: {e}"))
});

/// A value that can be turned into a tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Materializable {
    /// Ready-made node
    Node(Node),
    /// Whole document; materializes to its root map
    Document(Document),
    /// Structured JSON value
    Json(JsonValue),
    /// YAML text with `${path}` placeholders
    Fragment(String),
}

impl Materializable {
    /// Template fragment
    #[inline]
    #[must_use]
    pub fn fragment(text: impl Into<String>) -> Self {
        Self::Fragment(text.into())
    }

    /// Produce the node for this value
    ///
    /// Fragments are substituted against `context` and then parsed; the
    /// other variants ignore the context.
    ///
    /// # Errors
    /// `Fragment` when a substituted fragment is not valid YAML
    pub fn materialize(&self, context: &JsonValue) -> TreeResult<Node> {
        match self {
            Self::Node(node) => Ok(node.clone()),
            Self::Document(document) => Ok(Node::Map(document.root().clone())),
            Self::Json(value) => Ok(Node::from(value.clone())),
            Self::Fragment(text) => Node::from_yaml(&substitute(text, context)),
        }
    }
}

impl From<Node> for Materializable {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Document> for Materializable {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}

impl From<JsonValue> for Materializable {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

/// Replace `${path}` placeholders with values looked up in `context`
///
/// Strings are inserted verbatim, other values as compact JSON. A
/// placeholder that does not resolve becomes its own text in double quotes.
#[must_use]
pub fn substitute(template: &str, context: &JsonValue) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let expr = caps[1].trim();
            match lookup(context, expr) {
                Some(JsonValue::String(s)) => s.clone(),
                Some(value) => value.to_string(),
                None => {
                    debug!(placeholder = expr, "Unresolved template placeholder");
                    JsonValue::String(caps[0].to_string()).to_string()
                }
            }
        })
        .into_owned()
}

/// Resolve a dot path in a JSON value; numeric segments index arrays
fn lookup<'a>(context: &'a JsonValue, expr: &str) -> Option<&'a JsonValue> {
    expr.split('.').try_fold(context, |current, segment| match current {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
