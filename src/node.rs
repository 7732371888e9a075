use crate::error::Error;
use saphyr_parser::{Event, Marker, Parser, ScalarStyle, Span, SpannedEventReceiver};
use std::fmt;

/// 1-based line and column of a node in the source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    fn from_marker(marker: &Marker) -> Self {
        Self {
            line: marker.line(),
            column: marker.col() + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
}

/// How a scalar was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Style {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl From<ScalarStyle> for Style {
    fn from(style: ScalarStyle) -> Self {
        #[allow(unreachable_patterns)]
        match style {
            ScalarStyle::SingleQuoted => Style::SingleQuoted,
            ScalarStyle::DoubleQuoted => Style::DoubleQuoted,
            ScalarStyle::Literal => Style::Literal,
            ScalarStyle::Folded => Style::Folded,
            _ => Style::Plain,
        }
    }
}

/// A node of the parsed document with its source position.
///
/// Mappings keep their keys and values interleaved in `content`
/// (`[key, value, key, value, ...]`), sequences keep their items in order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub kind: NodeKind,
    pub style: Style,
    /// Explicit YAML tag (`!!str`, `!custom`), if one was written
    pub tag: Option<String>,
    /// Literal text of a scalar, empty for collections
    pub value: String,
    pub position: Position,
    pub content: Vec<Node>,
}

impl Node {
    /// A plain scalar that does not come from a document
    pub fn scalar(value: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Scalar,
            style: Style::Plain,
            tag: None,
            value: value.into(),
            position: Position::default(),
            content: Vec::new(),
        }
    }

    fn collection(kind: NodeKind, tag: Option<String>, position: Position) -> Self {
        Self {
            kind,
            style: Style::Plain,
            tag,
            value: String::new(),
            position,
            content: Vec::new(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == NodeKind::Scalar
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == NodeKind::Mapping
    }

    pub fn is_sequence(&self) -> bool {
        self.kind == NodeKind::Sequence
    }

    pub fn is_plain(&self) -> bool {
        self.style == Style::Plain
    }

    pub fn is_tagged(&self) -> bool {
        self.tag.is_some()
    }

    /// The plain scalar `null`, the only accepted spelling of the null value,
    /// or a key written without a value
    pub fn is_null(&self) -> bool {
        self.is_scalar() && self.is_plain() && (self.value == "null" || self.value.is_empty())
    }

    /// A plain scalar with no text, as in `key:` with nothing after it
    pub fn is_empty_value(&self) -> bool {
        self.is_scalar() && self.is_plain() && self.value.is_empty()
    }

    /// Key/value pairs of a mapping, empty for any other kind
    pub fn pairs(&self) -> impl Iterator<Item = (&Node, &Node)> {
        let content: &[Node] = if self.is_mapping() { &self.content } else { &[] };
        content.chunks_exact(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Value node stored under `key` in a mapping
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.pairs()
            .find(|(k, _)| k.is_scalar() && k.value == key)
            .map(|(_, v)| v)
    }

    /// Follows a dotted path of mapping keys and `[index]` sequence
    /// positions, e.g. `server.listeners[1].port`
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let (key, indices) = match segment.find('[') {
                Some(i) => segment.split_at(i),
                None => (segment, ""),
            };
            if !key.is_empty() {
                current = current.get(key)?;
            }
            for index in indices
                .split(|c| c == '[' || c == ']')
                .filter(|s| !s.is_empty())
            {
                let index: usize = index.parse().ok()?;
                if !current.is_sequence() {
                    return None;
                }
                current = current.content.get(index)?;
            }
        }
        Some(current)
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self.kind {
            NodeKind::Scalar if self.is_null() => "null",
            NodeKind::Scalar => "scalar",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
        }
    }
}

/// Folds parser events into an owned node tree
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Node>,
    documents: Vec<Node>,
    error: Option<Error>,
}

impl TreeBuilder {
    fn attach(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.content.push(node),
            None => self.documents.push(node),
        }
    }
}

impl<'input> SpannedEventReceiver<'input> for TreeBuilder {
    fn on_event(&mut self, event: Event<'input>, span: Span) {
        if self.error.is_some() {
            return;
        }
        let position = Position::from_marker(&span.start);
        match event {
            Event::Scalar(value, style, _anchor, tag) => {
                // the parser spells an omitted value as `~` with an empty span
                let value = if span.start.index() == span.end.index() {
                    String::new()
                } else {
                    value.into_owned()
                };
                self.attach(Node {
                    kind: NodeKind::Scalar,
                    style: style.into(),
                    tag: tag.map(|t| format!("{}{}", t.handle, t.suffix)),
                    value,
                    position,
                    content: Vec::new(),
                })
            }
            Event::SequenceStart(_anchor, tag) => self.stack.push(Node::collection(
                NodeKind::Sequence,
                tag.map(|t| format!("{}{}", t.handle, t.suffix)),
                position,
            )),
            Event::MappingStart(_anchor, tag) => self.stack.push(Node::collection(
                NodeKind::Mapping,
                tag.map(|t| format!("{}{}", t.handle, t.suffix)),
                position,
            )),
            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(node) = self.stack.pop() {
                    self.attach(node);
                }
            }
            Event::Alias(_) => {
                self.error = Some(Error::malformed(position, "aliases are not supported"));
            }
            _ => {}
        }
    }
}

/// Parses `source` into a node tree.
///
/// Only a single document is accepted; aliases are rejected.
pub fn parse(source: &str) -> Result<Node, Error> {
    let mut builder = TreeBuilder::default();
    Parser::new_from_str(source)
        .load(&mut builder, true)
        .map_err(|e| Error::MalformedDocument {
            position: Some(Position::from_marker(e.marker())),
            message: e.info().to_string(),
        })?;

    if let Some(error) = builder.error {
        return Err(error);
    }

    let mut documents = builder.documents.into_iter();
    let root = documents.next().ok_or(Error::EmptyDocument)?;
    if root.is_empty_value() {
        return Err(Error::EmptyDocument);
    }
    if let Some(extra) = documents.next() {
        return Err(Error::malformed(
            extra.position,
            "multi-document streams are not supported",
        ));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positions() {
        let root = parse("name: app\nserver:\n  port: 8080\n").unwrap();

        assert!(root.is_mapping());
        let port = root.lookup("server.port").unwrap();
        assert_eq!(port.value, "8080");
        assert_eq!(port.position, Position { line: 3, column: 9 });

        let name_key = &root.content[0];
        assert_eq!(name_key.value, "name");
        assert_eq!(name_key.position, Position { line: 1, column: 1 });
    }

    #[test]
    fn test_parse_styles() {
        let root = parse("a: plain\nb: 'single'\nc: \"double\"\nd: |\n  literal\n").unwrap();

        assert_eq!(root.get("a").unwrap().style, Style::Plain);
        assert_eq!(root.get("b").unwrap().style, Style::SingleQuoted);
        assert_eq!(root.get("c").unwrap().style, Style::DoubleQuoted);
        assert_eq!(root.get("d").unwrap().style, Style::Literal);
        assert_eq!(root.get("d").unwrap().value, "literal\n");
    }

    #[test]
    fn test_parse_tags() {
        let root = parse("a: !!str 42\nb: 42\n").unwrap();

        assert!(root.get("a").unwrap().is_tagged());
        assert!(!root.get("b").unwrap().is_tagged());
    }

    #[test]
    fn test_null_is_only_plain_null() {
        let root = parse("a: null\nb: \"null\"\nc: ~\n").unwrap();

        assert!(root.get("a").unwrap().is_null());
        assert!(!root.get("b").unwrap().is_null());
        assert!(!root.get("c").unwrap().is_null());
    }

    #[test]
    fn test_lookup_sequence_index() {
        let root = parse("items:\n  - name: a\n  - name: b\n").unwrap();

        let second = root.lookup("items[1].name").unwrap();
        assert_eq!(second.value, "b");
        assert_eq!(second.position.line, 3);
        assert!(root.lookup("items[2].name").is_none());
    }

    #[test]
    fn test_empty_source_has_no_document() {
        assert!(matches!(parse(""), Err(Error::EmptyDocument)));
        assert!(matches!(parse("# just a comment\n"), Err(Error::EmptyDocument)));
        assert!(matches!(parse("---\n"), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_omitted_value_is_empty() {
        let root = parse("a:
b: ~
c: ''
").unwrap();

        let a = root.get("a").unwrap();
        assert_eq!(a.value, "");
        assert!(a.is_empty_value());
        assert!(a.is_null());

        assert_eq!(root.get("b").unwrap().value, "~");
        assert!(!root.get("b").unwrap().is_empty_value());
        assert!(!root.get("c").unwrap().is_null());
    }

    #[test]
    fn test_alias_rejected() {
        let result = parse("a: &x 1\nb: *x\n");
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_multi_document_rejected() {
        let result = parse("a: 1\n---\nb: 2\n");
        assert!(matches!(result, Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let result = parse("a: [1, 2\n");
        match result {
            Err(Error::MalformedDocument { position, .. }) => assert!(position.is_some()),
            other => panic!("expected MalformedDocument, got {:?}", other),
        }
    }
}
