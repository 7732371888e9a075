//! Maps a field-name namespace such as `Config.servers[1].port` or
//! `Config.limits["api"]` back to a node of the loaded document.

use crate::node::{Node, Position};
use crate::setting::Setting;
use crate::shape::Shape;

/// Where a namespace points in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub position: Position,
    /// Document key of the last field that could be resolved, empty when
    /// not even the first field was found
    pub tag: String,
}

#[derive(Debug, PartialEq)]
enum Selector {
    Index(usize),
    Key(String),
}

#[derive(Debug, PartialEq)]
struct Segment {
    name: String,
    selectors: Vec<Selector>,
}

/// Resolves `namespace` against `root`, the document `T` was loaded from.
///
/// The first segment names the root type and is skipped. Resolution stops
/// at the first segment that has no counterpart in the type or in the
/// document, and the last resolved node is returned.
pub fn locate<T: Setting>(namespace: &str, root: &Node) -> Location {
    let mut location = Location {
        position: root.position,
        tag: String::new(),
    };
    let mut shape = T::shape();
    let mut node = root;

    for segment in split_namespace(namespace).into_iter().skip(1) {
        let Some(field) = shape
            .unwrap_pointers()
            .as_struct()
            .and_then(|s| s.fields().into_iter().find(|f| f.name == segment.name))
        else {
            break;
        };
        let (Some(tag), Some(field_shape)) = (field.yaml, field.shape()) else {
            break;
        };
        let Some(value) = node.get(tag) else {
            break;
        };
        node = value;
        shape = field_shape;
        location = Location {
            position: node.position,
            tag: tag.to_string(),
        };

        for selector in &segment.selectors {
            let Some((next_node, next_shape)) = select(node, &shape, selector) else {
                return location;
            };
            node = next_node;
            shape = next_shape;
            location.position = node.position;
        }
    }

    location
}

fn select<'a>(node: &'a Node, shape: &Shape, selector: &Selector) -> Option<(&'a Node, Shape)> {
    match (shape.unwrap_pointers(), selector) {
        (Shape::Seq(elem) | Shape::Array(elem, _), Selector::Index(index)) => {
            if !node.is_sequence() {
                return None;
            }
            node.content.get(*index).map(|item| (item, (**elem).clone()))
        }
        (Shape::Map(_, value), selector) => {
            let key = match selector {
                Selector::Index(index) => index.to_string(),
                Selector::Key(key) => key.clone(),
            };
            node.pairs()
                .find(|(k, _)| k.is_scalar() && k.value == key)
                .map(|(_, v)| (v, (**value).clone()))
        }
        _ => None,
    }
}

/// Splits on dots outside brackets, collecting `[n]` and `["key"]`
/// suffixes of each segment
fn split_namespace(namespace: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = namespace.chars().peekable();

    while chars.peek().is_some() {
        let mut segment = Segment {
            name: String::new(),
            selectors: Vec::new(),
        };
        while let Some(&c) = chars.peek() {
            if c == '.' || c == '[' {
                break;
            }
            segment.name.push(c);
            chars.next();
        }
        while chars.peek() == Some(&'[') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut key = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                key.push(escaped);
                            }
                        }
                        c => key.push(c),
                    }
                }
                segment.selectors.push(Selector::Key(key));
                // closing bracket
                chars.next();
            } else {
                let mut digits = String::new();
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    digits.push(c);
                }
                match digits.parse() {
                    Ok(index) => segment.selectors.push(Selector::Index(index)),
                    Err(_) => segment.selectors.push(Selector::Key(digits)),
                }
            }
        }
        if chars.peek() == Some(&'.') {
            chars.next();
        }
        segments.push(segment);
    }

    segments
}
