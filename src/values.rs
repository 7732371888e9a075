//! Content rules the strict decode cannot express on its own: explicit YAML
//! tags, boolean and null spellings, and keys missing from the document.

use crate::error::{Error, LiteralViolation};
use crate::node::Node;
use crate::shape::{Shape, StructRef};

/// Walks `shape` and the document together, starting at the root struct
pub fn validate_values(root: &StructRef, node: &Node) -> Result<(), Error> {
    check(None, root.name, &Shape::Struct(root.clone()), node)
}

fn check(tag: Option<&str>, path: &str, shape: &Shape, node: &Node) -> Result<(), Error> {
    if let Some(yaml_tag) = &node.tag {
        return Err(Error::TagUsed {
            position: node.position,
            path: path.to_string(),
            tag: tag.map(str::to_string),
            yaml_tag: yaml_tag.clone(),
        });
    }
    if let Err(violation) = check_literal(shape, node) {
        return Err(Error::MalformedLiteral {
            position: node.position,
            path: path.to_string(),
            tag: tag.map(str::to_string),
            violation,
        });
    }

    match shape {
        Shape::Pointer(inner) if !node.is_null() => check(tag, path, inner, node),
        Shape::Struct(s) if !s.is_opaque() && node.is_mapping() => {
            for field in s.fields() {
                let (true, Some(field_tag), Some(field_shape)) =
                    (field.exported, field.yaml, field.shape())
                else {
                    continue;
                };
                let field_path = format!("{}.{}", path, field.name);
                let Some(value) = node.get(field_tag) else {
                    return Err(Error::MissingField {
                        path: field_path,
                        tag: field_tag.to_string(),
                    });
                };
                check(Some(field_tag), &field_path, &field_shape, value)?;
            }
            Ok(())
        }
        Shape::Seq(elem) | Shape::Array(elem, _) if node.is_sequence() => {
            for (index, item) in node.content.iter().enumerate() {
                check(tag, &format!("{}[{}]", path, index), elem, item)?;
            }
            Ok(())
        }
        Shape::Map(key, value) if node.is_mapping() => {
            for (key_node, value_node) in node.pairs() {
                let entry_path = format!("{}[{:?}]", path, key_node.value);
                check(tag, &entry_path, key, key_node)?;
                check(tag, &entry_path, value, value_node)?;
            }
            Ok(())
        }
        // kind mismatches are reported by the strict decode
        _ => Ok(()),
    }
}

fn check_literal(shape: &Shape, node: &Node) -> Result<(), LiteralViolation> {
    if !node.is_scalar() {
        return Ok(());
    }
    let value = node.value.as_str();

    if value == "null" {
        let allowed = if node.is_plain() {
            shape.is_nullable()
        } else {
            // the quoted text "null" is a string, never the null value
            matches!(shape.unwrap_pointers(), Shape::Str)
        };
        return if allowed {
            Ok(())
        } else {
            Err(LiteralViolation::NullOnNonNullable)
        };
    }

    if node.is_plain() && (value == "~" || value.eq_ignore_ascii_case("null")) {
        return Err(LiteralViolation::BadNull);
    }

    if matches!(shape, Shape::Bool) && value != "true" && value != "false" {
        return Err(LiteralViolation::BadBool);
    }
    Ok(())
}
