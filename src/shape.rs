//! Type descriptors and the structural rules every configuration type obeys.
//!
//! A [`Shape`] is produced by [`Setting::shape`](crate::Setting::shape),
//! usually through `#[derive(Setting)]`. Struct field lists are evaluated
//! lazily so self-referencing types can be described and then rejected.

use crate::error::{Error, ShapeViolation};
use crate::setting::Setting;
use std::collections::HashMap;
use std::fmt;

/// Custom decoding a type provides in place of field-by-field decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The type implements [`FromText`](crate::FromText)
    Text,
    /// The type implements [`FromNode`](crate::FromNode)
    Node,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Text => write!(f, "FromText"),
            Capability::Node => write!(f, "FromNode"),
        }
    }
}

/// Types that exist in Rust but have no place in a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    /// `isize` and `usize`
    UnsizedInt,
    Function,
    Channel,
    /// Trait objects such as `Box<dyn Any>`
    Interface,
    RawPointer,
}

impl UnsupportedKind {
    fn hint(self) -> Option<&'static str> {
        match self {
            UnsupportedKind::UnsizedInt => Some(
                "use integer type with specified width, such as i32 or i64 instead of isize",
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    W32,
    W64,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Str,
    Bool,
    Int { width: IntWidth, signed: bool },
    Float(FloatWidth),
    Duration,
    /// `Option<T>`
    Pointer(Box<Shape>),
    /// `Vec<T>`
    Seq(Box<Shape>),
    /// `[T; N]`
    Array(Box<Shape>, usize),
    /// `HashMap<K, V>` and `BTreeMap<K, V>`
    Map(Box<Shape>, Box<Shape>),
    Struct(StructRef),
    Unsupported {
        kind: UnsupportedKind,
        type_name: &'static str,
    },
}

/// Descriptor of a struct (or opaque custom-decode type)
#[derive(Debug, Clone)]
pub struct StructRef {
    /// Short name used as the root of field paths
    pub name: &'static str,
    /// Fully qualified type name, the identity used for recursion detection
    pub type_name: &'static str,
    pub capability: Option<Capability>,
    /// Whether the type runs a [`Validate`](crate::Validate) hook
    pub validates: bool,
    pub fields: fn() -> Vec<FieldShape>,
}

#[derive(Debug, Clone)]
pub struct FieldShape {
    /// Rust field name
    pub name: &'static str,
    /// Whether the field is `pub`
    pub exported: bool,
    /// Document key the field is bound to
    pub yaml: Option<&'static str>,
    /// Environment variable the field is bound to
    pub env: Option<&'static str>,
    /// Descriptor of the field type, `None` for private fields which are
    /// never decoded
    pub shape: Option<fn() -> Shape>,
}

impl FieldShape {
    pub fn shape(&self) -> Option<Shape> {
        self.shape.map(|shape| shape())
    }
}

impl Shape {
    /// Strips every `Option` layer
    pub fn unwrap_pointers(&self) -> &Shape {
        let mut shape = self;
        while let Shape::Pointer(inner) = shape {
            shape = &**inner;
        }
        shape
    }

    /// Whether the document may assign `null`
    pub fn is_nullable(&self) -> bool {
        matches!(self, Shape::Pointer(_) | Shape::Seq(_) | Shape::Map(..))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Shape::Str | Shape::Bool | Shape::Int { .. } | Shape::Float(_) | Shape::Duration
        )
    }

    pub fn as_struct(&self) -> Option<&StructRef> {
        match self {
            Shape::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name used in messages
    pub fn type_name(&self) -> String {
        match self {
            Shape::Str => "String".to_string(),
            Shape::Bool => "bool".to_string(),
            Shape::Int { width, signed } => {
                let bits = match width {
                    IntWidth::W8 => 8,
                    IntWidth::W16 => 16,
                    IntWidth::W32 => 32,
                    IntWidth::W64 => 64,
                };
                format!("{}{}", if *signed { "i" } else { "u" }, bits)
            }
            Shape::Float(FloatWidth::W32) => "f32".to_string(),
            Shape::Float(FloatWidth::W64) => "f64".to_string(),
            Shape::Duration => "Duration".to_string(),
            Shape::Pointer(inner) => format!("Option<{}>", inner.type_name()),
            Shape::Seq(elem) => format!("Vec<{}>", elem.type_name()),
            Shape::Array(elem, len) => format!("[{}; {}]", elem.type_name(), len),
            Shape::Map(key, value) => {
                format!("Map<{}, {}>", key.type_name(), value.type_name())
            }
            Shape::Struct(s) => s.type_name.to_string(),
            Shape::Unsupported { type_name, .. } => type_name.to_string(),
        }
    }
}

impl StructRef {
    pub fn fields(&self) -> Vec<FieldShape> {
        (self.fields)()
    }

    pub fn is_opaque(&self) -> bool {
        self.capability.is_some()
    }
}

/// Whether `tag` is a POSIX shell variable name (`^[A-Z_][A-Z0-9_]*$`)
pub fn is_posix_env_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Checks `T` against every structural rule without touching a document
pub fn validate_type<T: Setting>() -> Result<(), Error> {
    let shape = T::shape();
    let root = match &shape {
        Shape::Struct(s) if !s.is_opaque() => s,
        Shape::Struct(s) => return Err(Error::shape(s.name, ShapeViolation::IllegalRootType)),
        other => {
            return Err(Error::shape(
                other.type_name(),
                ShapeViolation::IllegalRootType,
            ))
        }
    };

    let mut walker = ShapeWalker {
        stack: vec![root.type_name],
    };
    walker.check_struct(root.name, root)
}

struct ShapeWalker {
    stack: Vec<&'static str>,
}

impl ShapeWalker {
    fn check_struct(&mut self, path: &str, s: &StructRef) -> Result<(), Error> {
        let fields = s.fields();

        if let Some(capability) = s.capability {
            return check_opaque_fields(path, capability, &fields);
        }

        let mut exported = 0;
        // tag -> path of the field that defined it
        let mut tags: HashMap<&str, String> = HashMap::new();

        for field in &fields {
            let field_path = format!("{}.{}", path, field.name);

            match (field.yaml, field.exported) {
                (None, true) => {
                    return Err(Error::shape(field_path, ShapeViolation::MissingYamlTag))
                }
                (Some(_), false) => {
                    return Err(Error::shape(field_path, ShapeViolation::YamlTagOnUnexported))
                }
                _ => {}
            }

            check_env_field(&field_path, field)?;

            let (Some(tag), Some(shape)) = (field.yaml, field.shape()) else {
                continue;
            };
            exported += 1;

            if let Some(previous) = tags.get(tag) {
                return Err(Error::shape(
                    field_path,
                    ShapeViolation::YamlTagRedefined {
                        tag: tag.to_string(),
                        previous: previous.clone(),
                    },
                ));
            }
            tags.insert(tag, field_path.clone());

            self.check_field_type(&field_path, &shape)?;
        }

        if exported < 1 {
            return Err(Error::shape(path, ShapeViolation::NoExportedFields));
        }
        Ok(())
    }

    /// Descends through optionals, sequences and maps down to the leaf type
    fn check_field_type(&mut self, path: &str, shape: &Shape) -> Result<(), Error> {
        let mut current = shape;
        loop {
            if let Shape::Pointer(inner) = current {
                if matches!(
                    **inner,
                    Shape::Pointer(_) | Shape::Seq(_) | Shape::Array(..) | Shape::Map(..)
                ) {
                    return Err(Error::shape(
                        path,
                        ShapeViolation::UnsupportedPointer {
                            type_name: current.type_name(),
                        },
                    ));
                }
                current = &**inner;
                continue;
            }

            match current {
                Shape::Struct(s) => {
                    if self.stack.contains(&s.type_name) {
                        return Err(Error::shape(path, ShapeViolation::RecursiveType));
                    }
                    self.stack.push(s.type_name);
                    self.check_struct(path, s)?;
                    self.stack.pop();
                    return Ok(());
                }
                Shape::Unsupported { kind, type_name } => {
                    return Err(Error::shape(
                        path,
                        ShapeViolation::UnsupportedType {
                            type_name: type_name.to_string(),
                            hint: kind.hint(),
                        },
                    ))
                }
                Shape::Seq(elem) | Shape::Array(elem, _) => current = &**elem,
                Shape::Map(key, value) => {
                    self.check_field_type(path, key)?;
                    if let Shape::Struct(s) = &**value {
                        if !s.is_opaque() {
                            return Err(Error::shape(
                                path,
                                ShapeViolation::UnsupportedType {
                                    type_name: s.type_name.to_string(),
                                    hint: Some("use Option of struct as map value"),
                                },
                            ));
                        }
                    }
                    current = &**value;
                }
                _ => return Ok(()),
            }
        }
    }
}

fn check_opaque_fields(
    path: &str,
    capability: Capability,
    fields: &[FieldShape],
) -> Result<(), Error> {
    for field in fields {
        let tagged = field
            .yaml
            .map(|tag| ("yaml", tag))
            .or_else(|| field.env.map(|tag| ("env", tag)));
        if let Some((attribute, tag)) = tagged {
            return Err(Error::shape(
                format!("{}.{}", path, field.name),
                ShapeViolation::TagOnCustomDecode {
                    capability,
                    attribute,
                    tag: tag.to_string(),
                },
            ));
        }
    }
    Ok(())
}

fn check_env_field(path: &str, field: &FieldShape) -> Result<(), Error> {
    let Some(tag) = field.env else {
        return Ok(());
    };
    let (true, Some(shape)) = (field.exported, field.shape()) else {
        return Err(Error::shape(path, ShapeViolation::EnvTagOnUnexported));
    };
    if !is_posix_env_name(tag) {
        return Err(Error::shape(
            path,
            ShapeViolation::InvalidEnvTag {
                tag: tag.to_string(),
            },
        ));
    }

    let target = match &shape {
        Shape::Pointer(inner) => inner.as_ref(),
        other => other,
    };
    let bindable = match target {
        Shape::Struct(s) => s.is_opaque(),
        other => other.is_primitive(),
    };
    if bindable {
        Ok(())
    } else {
        Err(Error::shape(
            path,
            ShapeViolation::EnvOnUnsupportedType {
                type_name: shape.type_name(),
            },
        ))
    }
}
