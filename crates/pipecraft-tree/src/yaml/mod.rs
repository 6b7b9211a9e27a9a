//! YAML codec with comment and blank-line preservation
//!
//! Parsing goes through `serde_yaml` for values and a line scanner for key
//! metadata. Emission is deterministic: emitting a parsed document and
//! parsing it again yields an equal tree, so regeneration is byte-stable.

mod comments;
mod emit;
mod parse;
mod scalar;

use crate::document::Document;
use crate::error::TreeResult;
use crate::node::Node;

impl Document {
    /// Parse YAML text into a document
    ///
    /// # Errors
    /// `MalformedDocument` when the text is not valid YAML, is empty, has
    /// duplicate keys, or its root is not a mapping
    pub fn parse(text: &str) -> TreeResult<Self> {
        parse::parse(text)
    }

    /// Render the document as YAML text
    #[must_use]
    pub fn to_yaml(&self) -> String {
        emit::emit(self)
    }
}

impl Node {
    /// Parse a YAML fragment of any shape
    ///
    /// # Errors
    /// `Fragment` when the text is not valid YAML
    pub fn from_yaml(text: &str) -> TreeResult<Self> {
        parse::parse_fragment(text)
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;
    use pretty_assertions::assert_eq;

    const WORKFLOW: &str = "\
# Pipeline managed by pipecraft
#
# Custom jobs are kept.
name: Pipeline

on:
  pull_request:
    branches:
      - develop
  push:
    branches: [develop, staging, main]

jobs:
  # Detect changed domains
  changes:
    runs-on: ubuntu-latest
    outputs:
      api: ${{ steps.filter.outputs.api }}
    steps:
      - uses: dorny/paths-filter@v3
        id: filter
        with:
          filters: |
            api:
              - 'src/api/**'

  lint:
    runs-on: ubuntu-latest
    steps:
      - run: |
          npm ci

          npm run lint
";

    #[test]
    fn emit_parse_is_a_fixed_point() {
        let first = Document::parse(WORKFLOW).unwrap();
        let text = first.to_yaml();
        let second = Document::parse(&text).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.to_yaml(), text);
    }

    #[test]
    fn comments_and_spacing_survive_a_round_trip() {
        let text = Document::parse(WORKFLOW).unwrap().to_yaml();
        assert!(text.starts_with("# Pipeline managed by pipecraft\n#\n# Custom jobs are kept.\nname: Pipeline\n\non:\n"));
        assert!(text.contains("\njobs:\n  # Detect changed domains\n  changes:\n"));
        assert!(text.contains("\n\n  lint:\n"));
    }

    #[test]
    fn literal_blocks_keep_their_content() {
        let doc = Document::parse(WORKFLOW).unwrap();
        let reparsed = Document::parse(&doc.to_yaml()).unwrap();
        let lint = reparsed.root().get("jobs").and_then(|j| j.as_map()).and_then(|j| j.get("lint"));
        let run = lint
            .and_then(|l| l.as_map())
            .and_then(|l| l.get("steps"))
            .and_then(|s| s.as_sequence())
            .and_then(|s| s.first())
            .and_then(|s| s.value.as_map())
            .and_then(|s| s.get("run"))
            .and_then(|r| r.as_str());
        assert_eq!(run, Some("npm ci\n\nnpm run lint\n"));
    }

    const COMMENTED_STEPS: &str = "\
jobs:
  lint:
    runs-on: ubuntu-latest # pinned runner
    steps:
      # checkout first
      - uses: actions/checkout@v4
      - name: Lint
        # keep strict mode
        run: |
          set -euo pipefail
          make lint
      # - run: make slow-lint

  test:
    runs-on: ubuntu-latest
";

    #[test]
    fn comments_inside_step_lists_survive() {
        let document = Document::parse(COMMENTED_STEPS).unwrap();
        assert_eq!(document.to_yaml(), COMMENTED_STEPS);
        assert_eq!(Document::parse(&document.to_yaml()).unwrap(), document);
    }
}
