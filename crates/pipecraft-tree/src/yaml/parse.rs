//! YAML text to document tree

use super::comments::{self, Segment};
use crate::document::Document;
use crate::error::{TreeError, TreeResult};
use crate::node::{Entry, MapNode, Node, Scalar};
use serde_yaml::Value as YamlValue;

pub(crate) fn parse(text: &str) -> TreeResult<Document> {
    let value: YamlValue =
        serde_yaml::from_str(text).map_err(|e| TreeError::MalformedDocument(e.to_string()))?;

    let root = match value {
        YamlValue::Mapping(mapping) => convert_mapping(mapping)?,
        YamlValue::Null => {
            return Err(TreeError::MalformedDocument("document is empty".to_string()))
        }
        other => {
            return Err(TreeError::MalformedDocument(format!(
                "document root is a {}, expected a mapping",
                yaml_kind(&other)
            )))
        }
    };

    Ok(with_metadata(root, text))
}

/// Parse a template fragment; any node kind is accepted at the root
pub(crate) fn parse_fragment(text: &str) -> TreeResult<Node> {
    let fragment = |message: String| TreeError::Fragment { message };
    let value: YamlValue = serde_yaml::from_str(text).map_err(|e| fragment(e.to_string()))?;
    match value {
        YamlValue::Mapping(mapping) => {
            let root = convert_mapping(mapping).map_err(|e| fragment(e.to_string()))?;
            Ok(Node::Map(with_metadata(root, text).into_root()))
        }
        other => convert(other).map_err(|e| fragment(e.to_string())),
    }
}

fn with_metadata(mut root: MapNode, text: &str) -> Document {
    for (address, meta) in comments::scan(text) {
        let Some((Segment::Key(key), rest)) = address.split_first() else {
            continue;
        };
        // Addresses the scanner saw that did not survive parsing are ignored
        if let Some(entry) = root.entry_mut(key).and_then(|entry| entry_at(entry, rest)) {
            entry.meta = meta;
        }
    }
    Document::from_root(root)
}

fn entry_at<'a>(entry: &'a mut Entry, address: &[Segment]) -> Option<&'a mut Entry> {
    let Some((segment, rest)) = address.split_first() else {
        return Some(entry);
    };
    let next = match (segment, &mut entry.value) {
        (Segment::Key(key), Node::Map(map)) => map.entry_mut(key)?,
        (Segment::Item(index), Node::Sequence(items)) => items.get_mut(*index)?,
        _ => return None,
    };
    entry_at(next, rest)
}

fn convert(value: YamlValue) -> TreeResult<Node> {
    Ok(match value {
        YamlValue::Null => Node::Scalar(Scalar::Null),
        YamlValue::Bool(b) => Node::Scalar(Scalar::Bool(b)),
        YamlValue::Number(n) => Node::Scalar(convert_number(&n)),
        YamlValue::String(s) => Node::Scalar(Scalar::String(s)),
        YamlValue::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(|item| convert(item).map(Entry::new))
                .collect::<TreeResult<_>>()?,
        ),
        YamlValue::Mapping(mapping) => Node::Map(convert_mapping(mapping)?),
        YamlValue::Tagged(tagged) => convert(tagged.value)?,
    })
}

fn convert_mapping(mapping: serde_yaml::Mapping) -> TreeResult<MapNode> {
    let mut map = MapNode::new();
    for (key, value) in mapping {
        let key = match key {
            YamlValue::String(s) => s,
            YamlValue::Bool(b) => b.to_string(),
            YamlValue::Number(n) => n.to_string(),
            YamlValue::Null => "null".to_string(),
            other => {
                return Err(TreeError::MalformedDocument(format!(
                    "unsupported {} used as a mapping key",
                    yaml_kind(&other)
                )))
            }
        };
        map.insert(key, convert(value)?);
    }
    Ok(map)
}

fn convert_number(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Int(i)
    } else {
        Scalar::Float(n.as_f64().unwrap_or_default())
    }
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "boolean",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "sequence",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_document_order() {
        let doc = parse("z: 1\na: two\nm:\n  - x\n").unwrap();
        assert_eq!(doc.root().keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(doc.root().get("z"), Some(&Node::from(1)));
    }

    #[test]
    fn on_is_a_plain_string_key() {
        let doc = parse("on:\n  push: {}\n").unwrap();
        assert!(doc.root().contains_key("on"));
    }

    #[test]
    fn comments_attach_to_keys() {
        let doc = parse("# header\nname: x\n\njobs: {}\n").unwrap();
        let name = doc.root().entry("name").unwrap();
        assert_eq!(name.meta.comment_before.as_deref(), Some("header"));
        assert!(doc.root().entry("jobs").unwrap().meta.space_before);
    }

    #[test]
    fn comments_attach_to_sequence_items() {
        let doc = parse("steps:\n  # first\n  - run: a\n    # inner\n    env: {}\n  - b # pinned\n").unwrap();
        let steps = doc.root().get("steps").and_then(Node::as_sequence).unwrap();
        assert_eq!(steps[0].meta.comment_before.as_deref(), Some("first"));
        let env = steps[0].value.as_map().and_then(|m| m.entry("env")).unwrap();
        assert_eq!(env.meta.comment_before.as_deref(), Some("inner"));
        assert_eq!(steps[1].meta.comment_inline.as_deref(), Some("pinned"));
    }

    #[test]
    fn non_mapping_roots_are_malformed() {
        assert!(matches!(parse("- a\n- b\n"), Err(TreeError::MalformedDocument(_))));
        assert!(matches!(parse(""), Err(TreeError::MalformedDocument(_))));
        assert!(matches!(parse("just text"), Err(TreeError::MalformedDocument(_))));
    }

    #[test]
    fn fragments_accept_any_root() {
        assert_eq!(parse_fragment("- a\n- b\n").unwrap(), Node::from(vec![Node::from("a"), Node::from("b")]));
        assert_eq!(parse_fragment("plain").unwrap(), Node::from("plain"));
        assert!(matches!(parse_fragment("a: [\n"), Err(TreeError::Fragment { .. })));
    }

    #[test]
    fn syntax_errors_are_malformed() {
        assert!(matches!(parse("a: [1, 2\n"), Err(TreeError::MalformedDocument(_))));
        assert!(matches!(parse("a: 1\na: 2\n"), Err(TreeError::MalformedDocument(_))));
    }
}
