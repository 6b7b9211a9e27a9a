//! Comment and blank-line recovery
//!
//! `serde_yaml` discards comments, so a line scanner runs alongside it and
//! records the [`KeyMeta`] of every block-mapping key and block-sequence
//! item, addressed by the chain of keys and item indices leading to it.
//! The emitter writes metadata in the same places, which keeps parse and
//! emit a fixed point.

use crate::node::KeyMeta;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static KEY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<key>'(?:[^']|'')*'|"(?:[^"\\]|\\.)*"|[^\s#'"\-?:,\[\]{}&*!|>%@`][^:#]*?|-[^\s:#][^:#]*?)\s*:(?:\s+(?P<value>.*))?$"#,
    )
    .unwrap_or_else(|e| panic!("key pattern is valid: {e}"))
});

static BLOCK_INDICATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[|>][-+0-9]*$").unwrap_or_else(|e| panic!("block pattern is valid: {e}")));

/// One step of a metadata address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Segment {
    Key(String),
    Item(usize),
}

pub(crate) type Address = Vec<Segment>;

/// Scan text for key and item metadata
pub(crate) fn scan(text: &str) -> Vec<(Address, KeyMeta)> {
    Scanner::default().run(text)
}

/// An open key or sequence item and the column it starts at
struct Frame {
    column: usize,
    segment: Segment,
}

#[derive(Default)]
struct Scanner {
    frames: Vec<Frame>,
    /// Base column of an open block scalar
    block: Option<usize>,
    comments: Vec<String>,
    /// Column of the first pending comment line
    comment_column: usize,
    blank: bool,
    /// A blank line followed the last pending comment
    blank_after_comments: bool,
    found: IndexMap<Address, KeyMeta>,
}

impl Scanner {
    fn run(mut self, text: &str) -> Vec<(Address, KeyMeta)> {
        for raw in text.lines() {
            let line = raw.trim_end();
            if line.is_empty() {
                self.blank = true;
                self.blank_after_comments = !self.comments.is_empty();
                continue;
            }
            let indent = line.len() - line.trim_start_matches(' ').len();
            let content = &line[indent..];

            if let Some(base) = self.block {
                if indent > base {
                    self.blank = false;
                    continue;
                }
                self.block = None;
            }

            if let Some(comment) = content.strip_prefix('#') {
                if self.blank_after_comments || indent < self.comment_column {
                    self.close_comments(indent);
                }
                if self.comments.is_empty() {
                    self.comment_column = indent;
                }
                let comment = comment.strip_prefix(' ').unwrap_or(comment);
                self.comments.push(comment.to_string());
                self.blank_after_comments = false;
                continue;
            }

            if content == "---" || content.starts_with("--- ") || content == "..." {
                self.reset_pending();
                continue;
            }

            self.close_comments(indent);

            if is_sequence_item(content) {
                self.sequence_line(indent, content);
                continue;
            }
            match KEY_LINE.captures(content) {
                Some(caps) => {
                    let key = caps.name("key").map_or("", |m| m.as_str());
                    let value = caps.name("value").map_or("", |m| m.as_str());
                    self.key_line(indent, unquote_key(key.trim_end()), value);
                }
                None => self.reset_pending(),
            }
        }
        self.close_comments(0);
        self.found.into_iter().filter(|(_, meta)| !meta.is_empty()).collect()
    }

    /// Pending comments that close the previous value instead of opening
    /// the next one become its trailing comment
    ///
    /// That is the case when the next line is shallower than the comments,
    /// or when a blank line separates them from it.
    fn close_comments(&mut self, next_indent: usize) {
        if self.comments.is_empty() {
            return;
        }
        let column = self.comment_column;
        if next_indent >= column && !self.blank_after_comments {
            return;
        }
        let Some(depth) = self.frames.iter().rposition(|f| f.column <= column) else {
            return;
        };
        if self.frames[depth].column < next_indent {
            return;
        }
        let address = self.frames[..=depth].iter().map(|f| f.segment.clone()).collect();
        let comment = self.comments.join("\n");
        self.found.entry(address).or_default().comment_after = Some(comment);
        self.comments.clear();
        self.blank = self.blank_after_comments;
        self.blank_after_comments = false;
    }

    /// `- ...` lines, including compact nested items such as `- - a`
    fn sequence_line(&mut self, indent: usize, content: &str) {
        let mut column = indent;
        let mut rest = content;
        let mut item = self.open_item(column);
        while let Some(after) = rest.strip_prefix('-').filter(|a| a.is_empty() || a.starts_with(' ')) {
            let trimmed = after.trim_start_matches(' ');
            column += 1 + after.len() - trimmed.len();
            rest = trimmed;
            if is_sequence_item(rest) {
                item = self.open_item(column);
            } else {
                break;
            }
        }

        if rest.is_empty() {
            return;
        }
        if let Some(comment) = rest.strip_prefix('#') {
            let comment = comment.strip_prefix(' ').unwrap_or(comment);
            self.found.entry(item).or_default().comment_inline = Some(comment.to_string());
            return;
        }
        match KEY_LINE.captures(rest) {
            Some(caps) => {
                let key = caps.name("key").map_or("", |m| m.as_str());
                let value = caps.name("value").map_or("", |m| m.as_str());
                self.key_line(column, unquote_key(key.trim_end()), value);
            }
            None => {
                let (value, comment) = split_inline_comment(rest);
                if let Some(comment) = comment {
                    self.found.entry(item).or_default().comment_inline = Some(comment);
                }
                if BLOCK_INDICATOR.is_match(value) {
                    self.block = Some(indent);
                }
            }
        }
    }

    fn key_line(&mut self, column: usize, key: String, value: &str) {
        let address = self.record_key(column, key);
        let (value, comment) = split_inline_comment(value);
        if let Some(comment) = comment {
            self.found.entry(address).or_default().comment_inline = Some(comment);
        }
        if BLOCK_INDICATOR.is_match(value) {
            self.block = Some(column);
        }
    }

    fn record_key(&mut self, column: usize, key: String) -> Address {
        while self.frames.last().is_some_and(|f| f.column >= column) {
            self.frames.pop();
        }
        self.push(column, Segment::Key(key))
    }

    /// Open the next item of the sequence at `column`
    fn open_item(&mut self, column: usize) -> Address {
        while self.frames.last().is_some_and(|f| f.column > column) {
            self.frames.pop();
        }
        let index = match self.frames.last() {
            Some(Frame { column: c, segment: Segment::Item(i) }) if *c == column => {
                let next = i + 1;
                self.frames.pop();
                next
            }
            _ => 0,
        };
        self.push(column, Segment::Item(index))
    }

    /// Push a frame and hand it the pending comments and blank line
    fn push(&mut self, column: usize, segment: Segment) -> Address {
        self.frames.push(Frame { column, segment });
        let address: Address = self.frames.iter().map(|f| f.segment.clone()).collect();
        let meta = KeyMeta {
            comment_before: (!self.comments.is_empty()).then(|| self.comments.join("\n")),
            space_before: self.blank,
            ..KeyMeta::default()
        };
        if !meta.is_empty() {
            self.found.insert(address.clone(), meta);
        }
        self.reset_pending();
        address
    }

    fn reset_pending(&mut self) {
        self.comments.clear();
        self.blank = false;
        self.blank_after_comments = false;
    }
}

fn is_sequence_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

/// Split `value # comment` at the first `#` outside quotes that starts a
/// token; the value is returned trimmed
fn split_inline_comment(value: &str) -> (&str, Option<String>) {
    let mut quote: Option<char> = None;
    let mut previous: Option<char> = None;
    let mut chars = value.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') if chars.peek().is_some_and(|(_, n)| *n == '\'') => {
                chars.next();
            }
            (Some('"'), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if previous.map_or(true, |p| " [{,:".contains(p)) => quote = Some(c),
            (None, '#') if previous.map_or(true, char::is_whitespace) => {
                let comment = &value[index + 1..];
                let comment = comment.strip_prefix(' ').unwrap_or(comment);
                return (value[..index].trim(), Some(comment.trim_end().to_string()));
            }
            _ => {}
        }
        previous = Some(c);
    }
    (value.trim(), None)
}

fn unquote_key(key: &str) -> String {
    if key.starts_with(['\'', '"']) {
        if let Ok(unquoted) = serde_yaml::from_str::<String>(key) {
            return unquoted;
        }
    }
    key.to_string()
}
