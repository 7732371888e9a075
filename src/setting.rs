use crate::de;
use crate::duration::parse_duration;
use crate::env::EnvSource;
use crate::error::{Error, ShapeViolation};
use crate::node::Node;
use crate::shape::{FloatWidth, IntWidth, Shape, UnsupportedKind};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::time::Duration;
use tracing::trace;

/// Error type returned by user-supplied hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A type that can be loaded from a configuration document.
///
/// Implemented for strings, fixed-width numbers, `bool`, [`Duration`],
/// `Option`, `Vec`, arrays, `HashMap` and `BTreeMap`. Structs implement it
/// with `#[derive(Setting)]`.
pub trait Setting: Sized {
    /// Descriptor used by shape validation, value validation and error
    /// location
    fn shape() -> Shape;

    /// Strict decode from a document node
    fn decode(node: &Node) -> Result<Self, Error>;

    /// Converts the text of an environment variable
    fn from_env_text(_text: &str) -> Result<Self, String> {
        Err(format!(
            "{} cannot be read from an environment variable",
            Self::shape().type_name()
        ))
    }

    /// Overwrites `self` from the environment. `var` is the variable bound
    /// to the field holding this value, `path` its logical field path.
    fn apply_env(&mut self, env: &dyn EnvSource, var: Option<&str>, path: &str) -> Result<(), Error> {
        let Some(var) = var else {
            return Ok(());
        };
        let Some(text) = env.lookup(var) else {
            return Ok(());
        };
        trace!(path, var, "applying environment variable");
        *self = Self::from_env_text(&text).map_err(|reason| invalid_env::<Self>(path, var, reason))?;
        Ok(())
    }

    /// Runs [`Validate`] hooks on this value and everything below it
    fn run_validate(&self, _node: &Node) -> Result<(), Error> {
        Ok(())
    }
}

/// Custom decoding from a scalar's text, the text-based escape hatch.
///
/// Types using it are declared with `#[config(from_text)]` and are opaque to
/// field tagging and traversal.
pub trait FromText: Sized {
    fn from_text(text: &str) -> Result<Self, BoxError>;
}

/// Custom decoding from a whole document node.
///
/// Declared with `#[config(from_node)]`.
pub trait FromNode: Sized {
    fn from_node(node: &Node) -> Result<Self, BoxError>;
}

/// Self-validation hook, declared with `#[config(validate)]`.
///
/// Runs after the environment overlay, outer values before inner ones.
pub trait Validate {
    fn validate(&self) -> Result<(), BoxError>;
}

pub(crate) fn invalid_env<T: Setting>(path: &str, var: &str, reason: String) -> Error {
    Error::InvalidEnvValue {
        path: path.to_string(),
        var: var.to_string(),
        expected: T::shape().type_name(),
        reason: Some(reason),
    }
}

/// Wraps a failed [`Validate`] hook with the position of the value
pub fn validation_error(node: &Node, error: BoxError) -> Error {
    Error::Validation {
        position: node.position,
        message: error.to_string(),
    }
}

impl Setting for String {
    fn shape() -> Shape {
        Shape::Str
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        de::string(node)
    }

    fn from_env_text(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }
}

impl Setting for bool {
    fn shape() -> Shape {
        Shape::Bool
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        de::boolean(node)
    }

    fn from_env_text(text: &str) -> Result<Self, String> {
        match text {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err("must be either false or true".to_string()),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty => $width:ident, $signed:literal;)*) => {$(
        impl Setting for $ty {
            fn shape() -> Shape {
                Shape::Int { width: IntWidth::$width, signed: $signed }
            }

            fn decode(node: &Node) -> Result<Self, Error> {
                de::int(node, stringify!($ty))
            }

            fn from_env_text(text: &str) -> Result<Self, String> {
                text.parse().map_err(|e: std::num::ParseIntError| e.to_string())
            }
        }
    )*};
}

impl_int! {
    i8 => W8, true;
    i16 => W16, true;
    i32 => W32, true;
    i64 => W64, true;
    u8 => W8, false;
    u16 => W16, false;
    u32 => W32, false;
    u64 => W64, false;
}

macro_rules! impl_float {
    ($($ty:ty => $width:ident;)*) => {$(
        impl Setting for $ty {
            fn shape() -> Shape {
                Shape::Float(FloatWidth::$width)
            }

            fn decode(node: &Node) -> Result<Self, Error> {
                de::float(node, stringify!($ty))
            }

            fn from_env_text(text: &str) -> Result<Self, String> {
                text.parse().map_err(|e: std::num::ParseFloatError| e.to_string())
            }
        }
    )*};
}

impl_float! {
    f32 => W32;
    f64 => W64;
}

impl Setting for Duration {
    fn shape() -> Shape {
        Shape::Duration
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        de::duration(node)
    }

    fn from_env_text(text: &str) -> Result<Self, String> {
        parse_duration(text)
    }
}

impl<T: Setting> Setting for Option<T> {
    fn shape() -> Shape {
        Shape::Pointer(Box::new(T::shape()))
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        if node.is_null() {
            Ok(None)
        } else {
            T::decode(node).map(Some)
        }
    }

    fn from_env_text(text: &str) -> Result<Self, String> {
        T::from_env_text(text).map(Some)
    }

    fn apply_env(&mut self, env: &dyn EnvSource, var: Option<&str>, path: &str) -> Result<(), Error> {
        if let Some(name) = var {
            if let Some(text) = env.lookup(name) {
                if text == "null" {
                    trace!(path, var = name, "clearing optional value from environment");
                    *self = None;
                    return Ok(());
                }
                if self.is_none() {
                    trace!(path, var = name, "applying environment variable");
                    let value =
                        T::from_env_text(&text).map_err(|reason| invalid_env::<T>(path, name, reason))?;
                    *self = Some(value);
                    return Ok(());
                }
            }
        }
        match self {
            Some(inner) => inner.apply_env(env, var, path),
            None => Ok(()),
        }
    }

    fn run_validate(&self, node: &Node) -> Result<(), Error> {
        match self {
            Some(inner) => inner.run_validate(node),
            None => Ok(()),
        }
    }
}

impl<T: Setting> Setting for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        if node.is_null() {
            return Ok(Vec::new());
        }
        if !node.is_sequence() {
            return Err(Error::malformed(
                node.position,
                format!("cannot decode {} into {}", node.describe(), Self::shape().type_name()),
            ));
        }
        node.content.iter().map(T::decode).collect()
    }

    fn apply_env(&mut self, env: &dyn EnvSource, _var: Option<&str>, path: &str) -> Result<(), Error> {
        for (index, item) in self.iter_mut().enumerate() {
            item.apply_env(env, None, &format!("{}[{}]", path, index))?;
        }
        Ok(())
    }

    fn run_validate(&self, node: &Node) -> Result<(), Error> {
        for (item, item_node) in self.iter().zip(&node.content) {
            item.run_validate(item_node)?;
        }
        Ok(())
    }
}

impl<T: Setting, const N: usize> Setting for [T; N] {
    fn shape() -> Shape {
        Shape::Array(Box::new(T::shape()), N)
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        if !node.is_sequence() || node.content.len() != N {
            let found = if node.is_sequence() {
                format!("sequence of {} items", node.content.len())
            } else {
                node.describe().to_string()
            };
            return Err(Error::malformed(
                node.position,
                format!("cannot decode {} into {}", found, Self::shape().type_name()),
            ));
        }
        let items = node
            .content
            .iter()
            .map(T::decode)
            .collect::<Result<Vec<T>, Error>>()?;
        items.try_into().map_err(|_| {
            Error::malformed(node.position, format!("expected exactly {} items", N))
        })
    }

    fn apply_env(&mut self, env: &dyn EnvSource, _var: Option<&str>, path: &str) -> Result<(), Error> {
        for (index, item) in self.iter_mut().enumerate() {
            item.apply_env(env, None, &format!("{}[{}]", path, index))?;
        }
        Ok(())
    }

    fn run_validate(&self, node: &Node) -> Result<(), Error> {
        for (item, item_node) in self.iter().zip(&node.content) {
            item.run_validate(item_node)?;
        }
        Ok(())
    }
}

/// Decodes mapping entries in document order, rejecting duplicate keys
fn decode_entries<K: Setting + PartialEq, V: Setting>(
    node: &Node,
    type_name: String,
) -> Result<Vec<(K, V)>, Error> {
    if node.is_null() {
        return Ok(Vec::new());
    }
    if !node.is_mapping() {
        return Err(Error::malformed(
            node.position,
            format!("cannot decode {} into {}", node.describe(), type_name),
        ));
    }
    let mut entries: Vec<(K, V)> = Vec::with_capacity(node.content.len() / 2);
    for (key_node, value_node) in node.pairs() {
        let key = K::decode(key_node)?;
        if entries.iter().any(|(existing, _)| *existing == key) {
            return Err(Error::malformed(
                key_node.position,
                format!("mapping key {:?} already defined", key_node.value),
            ));
        }
        entries.push((key, V::decode(value_node)?));
    }
    Ok(entries)
}

impl<K, V, S> Setting for HashMap<K, V, S>
where
    K: Setting + Eq + Hash + fmt::Debug,
    V: Setting,
    S: BuildHasher + Default,
{
    fn shape() -> Shape {
        Shape::Map(Box::new(K::shape()), Box::new(V::shape()))
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        let entries = decode_entries::<K, V>(node, Self::shape().type_name())?;
        Ok(entries.into_iter().collect())
    }

    fn apply_env(&mut self, env: &dyn EnvSource, _var: Option<&str>, path: &str) -> Result<(), Error> {
        // only optional values can be populated in place
        if !matches!(V::shape(), Shape::Pointer(_)) {
            return Ok(());
        }
        for (key, value) in self.iter_mut() {
            value.apply_env(env, None, &format!("{}[{:?}]", path, key))?;
        }
        Ok(())
    }

    fn run_validate(&self, node: &Node) -> Result<(), Error> {
        for (key_node, value_node) in node.pairs() {
            let Ok(key) = K::decode(key_node) else { continue };
            if let Some((key, value)) = self.get_key_value(&key) {
                key.run_validate(key_node)?;
                value.run_validate(value_node)?;
            }
        }
        Ok(())
    }
}

impl<K, V> Setting for BTreeMap<K, V>
where
    K: Setting + Ord + fmt::Debug,
    V: Setting,
{
    fn shape() -> Shape {
        Shape::Map(Box::new(K::shape()), Box::new(V::shape()))
    }

    fn decode(node: &Node) -> Result<Self, Error> {
        let entries = decode_entries::<K, V>(node, Self::shape().type_name())?;
        Ok(entries.into_iter().collect())
    }

    fn apply_env(&mut self, env: &dyn EnvSource, _var: Option<&str>, path: &str) -> Result<(), Error> {
        if !matches!(V::shape(), Shape::Pointer(_)) {
            return Ok(());
        }
        for (key, value) in self.iter_mut() {
            value.apply_env(env, None, &format!("{}[{:?}]", path, key))?;
        }
        Ok(())
    }

    fn run_validate(&self, node: &Node) -> Result<(), Error> {
        for (key_node, value_node) in node.pairs() {
            let Ok(key) = K::decode(key_node) else { continue };
            if let Some((key, value)) = self.get_key_value(&key) {
                key.run_validate(key_node)?;
                value.run_validate(value_node)?;
            }
        }
        Ok(())
    }
}

fn unsupported<T>(kind: UnsupportedKind) -> Result<T, Error> {
    let type_name = std::any::type_name::<T>();
    trace!(?kind, type_name, "refusing to decode unsupported type");
    Err(Error::shape(
        type_name,
        ShapeViolation::UnsupportedType {
            type_name: type_name.to_string(),
            hint: None,
        },
    ))
}

macro_rules! impl_unsupported {
    ($kind:ident => $([$($generics:tt)*] $ty:ty),* $(,)?) => {$(
        impl<$($generics)*> Setting for $ty {
            fn shape() -> Shape {
                Shape::Unsupported {
                    kind: UnsupportedKind::$kind,
                    type_name: std::any::type_name::<Self>(),
                }
            }

            fn decode(_node: &Node) -> Result<Self, Error> {
                unsupported(UnsupportedKind::$kind)
            }
        }
    )*};
}

impl_unsupported!(UnsizedInt => [] isize, [] usize);
impl_unsupported!(Function => [R] fn() -> R, [A, R] fn(A) -> R, [A, B, R] fn(A, B) -> R);
impl_unsupported!(RawPointer => [T: ?Sized] *const T, [T: ?Sized] *mut T);
impl_unsupported!(
    Interface =>
    [] Box<dyn std::any::Any>,
    [] Box<dyn std::any::Any + Send>,
    [] Box<dyn std::any::Any + Send + Sync>,
);
impl_unsupported!(
    Channel =>
    [T] std::sync::mpsc::Sender<T>,
    [T] std::sync::mpsc::SyncSender<T>,
    [T] std::sync::mpsc::Receiver<T>,
);
