//! Document tree to YAML text
//!
//! Block style throughout, two-space indentation, sequences indented under
//! their key. Metadata is written around every mapping key and sequence
//! item; a map item stays on its `-` line unless a comment has to go there.

use super::scalar::{self, Rendered};
use crate::document::Document;
use crate::node::{Entry, KeyMeta, MapNode, Node};

const INDENT: usize = 2;

pub(crate) fn emit(document: &Document) -> String {
    let mut out = String::new();
    write_entries(&mut out, document.root(), 0, false);
    out
}

fn write_entries(out: &mut String, map: &MapNode, indent: usize, first_inline: bool) {
    for (index, (key, entry)) in map.iter().enumerate() {
        if !(first_inline && index == 0) {
            write_leading(out, &entry.meta, indent, index == 0);
            pad(out, indent);
        }
        out.push_str(&scalar::render_key(key));
        out.push(':');
        write_value(out, &entry.value, indent, entry.meta.comment_inline.as_deref());
        write_comment(out, entry.meta.comment_after.as_deref(), indent);
    }
}

/// Blank line and comment lines in front of a key or item; no blank line
/// before the first one
fn write_leading(out: &mut String, meta: &KeyMeta, indent: usize, first: bool) {
    if meta.space_before && !first {
        out.push('\n');
    }
    write_comment(out, meta.comment_before.as_deref(), indent);
}

fn write_comment(out: &mut String, comment: Option<&str>, indent: usize) {
    let Some(comment) = comment else {
        return;
    };
    for line in comment.split('\n') {
        pad(out, indent);
        if line.is_empty() {
            out.push('#');
        } else {
            out.push_str("# ");
            out.push_str(line);
        }
        out.push('\n');
    }
}

/// Finish a line, with its inline comment if any
fn end_line(out: &mut String, comment: Option<&str>) {
    match comment {
        Some("") => out.push_str(" #"),
        Some(comment) => {
            out.push_str(" # ");
            out.push_str(comment);
        }
        None => {}
    }
    out.push('\n');
}

/// Write what follows `key:` or `-`
fn write_value(out: &mut String, value: &Node, indent: usize, comment: Option<&str>) {
    match value {
        Node::Scalar(s) => write_scalar(out, scalar::render(s), indent, comment),
        Node::Map(map) if map.is_empty() => {
            out.push_str(" {}");
            end_line(out, comment);
        }
        Node::Map(map) => {
            end_line(out, comment);
            write_entries(out, map, indent + INDENT, false);
        }
        Node::Sequence(items) if items.is_empty() => {
            out.push_str(" []");
            end_line(out, comment);
        }
        Node::Sequence(items) => {
            end_line(out, comment);
            write_sequence(out, items, indent + INDENT);
        }
    }
}

fn write_sequence(out: &mut String, items: &[Entry], indent: usize) {
    for (index, item) in items.iter().enumerate() {
        write_leading(out, &item.meta, indent, index == 0);
        pad(out, indent);
        out.push('-');
        let comment = item.meta.comment_inline.as_deref();
        match &item.value {
            Node::Map(map) if !map.is_empty() => {
                let first_has_comment = map.iter().next().is_some_and(|(_, e)| e.meta.comment_before.is_some());
                if comment.is_none() && !first_has_comment {
                    out.push(' ');
                    write_entries(out, map, indent + INDENT, true);
                } else {
                    end_line(out, comment);
                    write_entries(out, map, indent + INDENT, false);
                }
            }
            other => write_value(out, other, indent, comment),
        }
        write_comment(out, item.meta.comment_after.as_deref(), indent);
    }
}

fn write_scalar(out: &mut String, rendered: Rendered, indent: usize, comment: Option<&str>) {
    match rendered {
        Rendered::Inline(text) => {
            out.push(' ');
            out.push_str(&text);
            end_line(out, comment);
        }
        Rendered::Block { header, lines } => {
            out.push(' ');
            out.push_str(header);
            end_line(out, comment);
            for line in lines {
                if !line.is_empty() {
                    pad(out, indent + INDENT);
                    out.push_str(&line);
                }
                out.push('\n');
            }
        }
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}
