//! Strict decoding of node trees into typed values.
//!
//! These helpers back the `Setting::decode` implementations, including the
//! ones generated by `#[derive(Setting)]`.

use crate::duration::parse_duration;
use crate::error::{Error, ShapeViolation};
use crate::node::Node;
use crate::setting::{FromNode, FromText, Setting};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

fn mismatch(node: &Node, expected: &str) -> Error {
    let found = if node.is_scalar() && !node.is_null() {
        format!("{} {:?}", node.describe(), node.value)
    } else {
        node.describe().to_string()
    };
    Error::malformed(
        node.position,
        format!("cannot decode {} into {}", found, expected),
    )
}

fn plain_scalar<'a>(node: &'a Node, expected: &str) -> Result<&'a str, Error> {
    if node.is_scalar() && node.is_plain() && !node.is_null() {
        Ok(&node.value)
    } else {
        Err(mismatch(node, expected))
    }
}

pub fn string(node: &Node) -> Result<String, Error> {
    if node.is_scalar() && (!node.is_null() || node.is_empty_value()) {
        Ok(node.value.clone())
    } else {
        Err(mismatch(node, "String"))
    }
}

pub fn boolean(node: &Node) -> Result<bool, Error> {
    match plain_scalar(node, "bool")? {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(mismatch(node, "bool")),
    }
}

pub fn int<T: TryFrom<i128>>(node: &Node, type_name: &str) -> Result<T, Error> {
    let text = plain_scalar(node, type_name)?;
    let value = parse_int(text).ok_or_else(|| mismatch(node, type_name))?;
    T::try_from(value).map_err(|_| {
        Error::malformed(
            node.position,
            format!("{} is out of range for {}", text, type_name),
        )
    })
}

pub fn float<T: FromStr>(node: &Node, type_name: &str) -> Result<T, Error> {
    let text = plain_scalar(node, type_name)?;
    parse_float(text).ok_or_else(|| mismatch(node, type_name))
}

pub fn duration(node: &Node) -> Result<Duration, Error> {
    if !node.is_scalar() || node.is_null() {
        return Err(mismatch(node, "Duration"));
    }
    parse_duration(&node.value).map_err(|reason| Error::malformed(node.position, reason))
}

/// Decodes a scalar through the type's [`FromText`] implementation
pub fn from_text<T: FromText>(node: &Node) -> Result<T, Error> {
    if !node.is_scalar() || node.is_null() {
        return Err(mismatch(node, std::any::type_name::<T>()));
    }
    T::from_text(&node.value).map_err(|e| Error::malformed(node.position, e.to_string()))
}

/// Decodes a node through the type's [`FromNode`] implementation
pub fn from_node<T: FromNode>(node: &Node) -> Result<T, Error> {
    T::from_node(node).map_err(|e| Error::malformed(node.position, e.to_string()))
}

/// Value for a `pub` field that has no `yaml` tag; such types never pass
/// shape validation, so decoding them is always an error
pub fn untagged<T>(struct_name: &str, field: &str) -> Result<T, Error> {
    Err(Error::shape(
        format!("{}.{}", struct_name, field),
        ShapeViolation::MissingYamlTag,
    ))
}

/// A mapping node checked against the tags a struct knows about
pub struct StructNode<'a> {
    node: &'a Node,
    name: &'static str,
}

impl<'a> StructNode<'a> {
    /// Rejects anything but a mapping whose keys are all known, unique tags
    pub fn new(node: &'a Node, name: &'static str, tags: &[&str]) -> Result<Self, Error> {
        if !node.is_mapping() {
            return Err(mismatch(node, name));
        }

        let mut seen: HashMap<&str, &Node> = HashMap::new();
        for (key, _) in node.pairs() {
            if !key.is_scalar() {
                return Err(mismatch(key, "a field name"));
            }
            if !tags.contains(&key.value.as_str()) {
                return Err(Error::malformed(
                    key.position,
                    format!("field {} not found in type {}", key.value, name),
                ));
            }
            if let Some(previous) = seen.insert(&key.value, key) {
                return Err(Error::malformed(
                    key.position,
                    format!(
                        "mapping key {:?} already defined at line {}",
                        key.value, previous.position.line
                    ),
                ));
            }
        }

        Ok(Self { node, name })
    }

    pub fn field<T: Setting>(&self, tag: &str) -> Result<T, Error> {
        match self.node.get(tag) {
            Some(value) => T::decode(value),
            None => Err(Error::MissingField {
                path: self.name.to_string(),
                tag: tag.to_string(),
            }),
        }
    }
}

/// Parses decimal, `0x`, `0o` and `0b` integers with optional sign and `_`
/// digit separators
fn parse_int(text: &str) -> Option<i128> {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let (radix, digits) = if let Some(rest) = unsigned.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = unsigned.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = unsigned.strip_prefix("0b") {
        (2, rest)
    } else {
        (10, unsigned)
    };
    if digits.is_empty() || digits.starts_with(|c| c == '+' || c == '-') {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float<T: FromStr>(text: &str) -> Option<T> {
    let spelled = match text {
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => "inf",
        "-.inf" | "-.Inf" | "-.INF" => "-inf",
        ".nan" | ".NaN" | ".NAN" => "NaN",
        _ => {
            let cleaned: String = text.chars().filter(|&c| c != '_').collect();
            // Rust spellings like `inf` or `infinity` are not YAML
            if cleaned
                .chars()
                .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
            {
                return None;
            }
            return cleaned.parse().ok();
        }
    };
    spelled.parse().ok()
}
