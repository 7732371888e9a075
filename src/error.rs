use crate::node::Position;
use crate::shape::Capability;
use colored::Colorize;
use std::{fmt, path::PathBuf, sync::Arc};

/// Structural rule a destination type breaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    /// A `pub` field has no `yaml` tag
    MissingYamlTag,
    /// A `yaml` tag sits on a private field
    YamlTagOnUnexported,
    /// Two sibling fields share a `yaml` tag
    YamlTagRedefined { tag: String, previous: String },
    /// An `env` tag sits on a private field
    EnvTagOnUnexported,
    /// The `env` tag is not a POSIX shell variable name
    InvalidEnvTag { tag: String },
    /// An `env` tag is bound to a type that cannot be read from a variable
    EnvOnUnsupportedType { type_name: String },
    /// A custom-decode type carries `yaml` or `env` tags on its own fields
    TagOnCustomDecode {
        capability: Capability,
        attribute: &'static str,
        tag: String,
    },
    /// A struct has no `pub` fields at all
    NoExportedFields,
    /// Pointer to pointer, sequence, array or map
    UnsupportedPointer { type_name: String },
    /// A type the loader refuses to handle anywhere in the graph
    UnsupportedType {
        type_name: String,
        hint: Option<&'static str>,
    },
    /// A struct contains itself
    RecursiveType,
    /// The root is not a plain struct
    IllegalRootType,
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeViolation::MissingYamlTag => write!(f, "missing yaml tag"),
            ShapeViolation::YamlTagOnUnexported => write!(f, "yaml tag on private field"),
            ShapeViolation::YamlTagRedefined { tag, previous } => write!(
                f,
                "yaml tag {} previously defined on field {}: a yaml tag must be unique",
                format!("{:?}", tag).cyan(),
                previous.magenta()
            ),
            ShapeViolation::EnvTagOnUnexported => write!(f, "env tag on private field"),
            ShapeViolation::InvalidEnvTag { tag } => write!(
                f,
                "invalid env tag {}: must match the POSIX env var pattern ^[A-Z_][A-Z0-9_]*$",
                format!("{:?}", tag).cyan()
            ),
            ShapeViolation::EnvOnUnsupportedType { type_name } => {
                write!(f, "env tag on unsupported type {}", type_name.yellow())
            }
            ShapeViolation::TagOnCustomDecode {
                capability,
                attribute,
                tag,
            } => write!(
                f,
                "type implements {} but field carries {} tag {}: custom-decode types must not contain yaml and env tags",
                capability,
                attribute,
                format!("{:?}", tag).cyan()
            ),
            ShapeViolation::NoExportedFields => write!(f, "no pub fields"),
            ShapeViolation::UnsupportedPointer { type_name } => write!(
                f,
                "unsupported optional type {}: only optional scalars and structs are allowed",
                type_name.yellow()
            ),
            ShapeViolation::UnsupportedType { type_name, hint } => {
                write!(f, "unsupported type {}", type_name.yellow())?;
                if let Some(hint) = hint {
                    write!(f, ", {}", hint)?;
                }
                Ok(())
            }
            ShapeViolation::RecursiveType => write!(f, "recursive type"),
            ShapeViolation::IllegalRootType => write!(
                f,
                "root type must be a struct and must not implement FromText or FromNode"
            ),
        }
    }
}

/// Literal spellings the supported YAML dialect refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralViolation {
    BadBool,
    BadNull,
    NullOnNonNullable,
}

impl fmt::Display for LiteralViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralViolation::BadBool => write!(
                f,
                "must be either false or true, other variants of boolean literals are not supported"
            ),
            LiteralViolation::BadNull => write!(
                f,
                "must be null, any other variants of null are not supported"
            ),
            LiteralViolation::NullOnNonNullable => {
                write!(f, "cannot assign null to non-optional type")
            }
        }
    }
}

/// Coarse classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Shape,
    Io,
    EmptyDocument,
    MalformedDocument,
    MissingField,
    MalformedLiteral,
    TagUsed,
    InvalidEnvValue,
    Validation,
    RuleViolation,
}

/// Errors that can occur while loading a configuration
#[derive(Debug, Clone)]
pub enum Error {
    /// The destination type itself breaks a structural rule
    Shape {
        path: String,
        violation: ShapeViolation,
    },
    /// The configuration file could not be read
    Io {
        path: PathBuf,
        source: Arc<std::io::Error>,
    },
    /// The source contains no document
    EmptyDocument,
    /// The source could not be parsed or does not fit the destination type
    MalformedDocument {
        position: Option<Position>,
        message: String,
    },
    /// A field of the destination type has no key in the document
    MissingField { path: String, tag: String },
    /// A boolean or null literal is spelled in an unsupported way
    MalformedLiteral {
        position: Position,
        path: String,
        tag: Option<String>,
        violation: LiteralViolation,
    },
    /// The document uses an explicit YAML tag such as `!!str`
    TagUsed {
        position: Position,
        path: String,
        tag: Option<String>,
        yaml_tag: String,
    },
    /// An environment variable is set but cannot be converted
    InvalidEnvValue {
        path: String,
        var: String,
        expected: String,
        reason: Option<String>,
    },
    /// A `Validate` hook rejected a value
    Validation { position: Position, message: String },
    /// The rule engine rejected a value
    RuleViolation {
        position: Position,
        tag: String,
        rule: String,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Shape { .. } => ErrorKind::Shape,
            Error::Io { .. } => ErrorKind::Io,
            Error::EmptyDocument => ErrorKind::EmptyDocument,
            Error::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Error::MissingField { .. } => ErrorKind::MissingField,
            Error::MalformedLiteral { .. } => ErrorKind::MalformedLiteral,
            Error::TagUsed { .. } => ErrorKind::TagUsed,
            Error::InvalidEnvValue { .. } => ErrorKind::InvalidEnvValue,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::RuleViolation { .. } => ErrorKind::RuleViolation,
        }
    }

    /// Position in the document the error points at, if any
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::MalformedDocument { position, .. } => *position,
            Error::MalformedLiteral { position, .. }
            | Error::TagUsed { position, .. }
            | Error::Validation { position, .. }
            | Error::RuleViolation { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub(crate) fn shape(path: impl Into<String>, violation: ShapeViolation) -> Self {
        Error::Shape {
            path: path.into(),
            violation,
        }
    }

    pub(crate) fn malformed(position: Position, message: impl Into<String>) -> Self {
        Error::MalformedDocument {
            position: Some(position),
            message: message.into(),
        }
    }
}

fn write_site(f: &mut fmt::Formatter<'_>, tag: Option<&str>, path: &str) -> fmt::Result {
    match tag {
        Some(tag) => write!(
            f,
            "{} ({})",
            format!("{:?}", tag).cyan(),
            path.magenta().bold()
        ),
        None => write!(f, "{}", path.magenta().bold()),
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shape { path, violation } => {
                write!(f, "at {}: {}", path.magenta().bold(), violation)
            }
            Error::Io { path, source } => {
                write!(f, "reading file {}: {}", format!("{:?}", path).magenta(), source)
            }
            Error::EmptyDocument => write!(f, "empty file"),
            Error::MalformedDocument { position, message } => match position {
                Some(position) => write!(f, "at {}: malformed YAML: {}", position, message.red()),
                None => write!(f, "malformed YAML: {}", message.red()),
            },
            Error::MissingField { path, tag } => write!(
                f,
                "at {} (as {}): missing field in config file",
                path.magenta().bold(),
                format!("{:?}", tag).cyan()
            ),
            Error::MalformedLiteral {
                position,
                path,
                tag,
                violation,
            } => {
                write!(f, "at {}: ", position)?;
                write_site(f, tag.as_deref(), path)?;
                write!(f, ": {}", violation)
            }
            Error::TagUsed {
                position,
                path,
                tag,
                yaml_tag,
            } => {
                write!(f, "at {}: ", position)?;
                write_site(f, tag.as_deref(), path)?;
                write!(
                    f,
                    ": tag {}: avoid using YAML tags",
                    format!("{:?}", yaml_tag).red()
                )
            }
            Error::InvalidEnvValue {
                path,
                var,
                expected,
                reason,
            } => {
                write!(
                    f,
                    "at {}: invalid env var {}: expected {}",
                    path.magenta().bold(),
                    var.magenta(),
                    expected.yellow()
                )?;
                if let Some(reason) = reason {
                    write!(f, ": {}", reason)?;
                }
                Ok(())
            }
            Error::Validation { position, message } => {
                write!(f, "at {}: validation: {}", position, message.red())
            }
            Error::RuleViolation {
                position,
                tag,
                rule,
            } => write!(
                f,
                "at {}: {} violates validation rule: {}",
                position,
                format!("{:?}", tag).cyan(),
                format!("{:?}", rule).red()
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_error_display() {
        colored::control::set_override(false);

        let error = Error::shape("Config.port", ShapeViolation::MissingYamlTag);

        assert_eq!(error.to_string(), "at Config.port: missing yaml tag");
        assert_eq!(error.kind(), ErrorKind::Shape);
        assert_eq!(error.position(), None);
    }

    #[test]
    fn test_redefined_tag_names_both_fields() {
        colored::control::set_override(false);

        let error = Error::shape(
            "Config.second",
            ShapeViolation::YamlTagRedefined {
                tag: "x".to_string(),
                previous: "Config.first".to_string(),
            },
        );

        let output = error.to_string();
        assert!(output.contains("at Config.second"));
        assert!(output.contains("previously defined on field Config.first"));
    }

    #[test]
    fn test_malformed_literal_display() {
        colored::control::set_override(false);

        let error = Error::MalformedLiteral {
            position: Position { line: 3, column: 9 },
            path: "Config.debug".to_string(),
            tag: Some("debug".to_string()),
            violation: LiteralViolation::BadBool,
        };

        let output = error.to_string();
        assert!(output.starts_with("at 3:9: \"debug\" (Config.debug): must be either false or true"));
        assert_eq!(error.position(), Some(Position { line: 3, column: 9 }));
    }

    #[test]
    fn test_invalid_env_value_with_reason() {
        colored::control::set_override(false);

        let error = Error::InvalidEnvValue {
            path: "Config.port".to_string(),
            var: "PORT".to_string(),
            expected: "u16".to_string(),
            reason: Some("invalid digit found in string".to_string()),
        };

        assert_eq!(
            error.to_string(),
            "at Config.port: invalid env var PORT: expected u16: invalid digit found in string"
        );
    }

    #[test]
    fn test_rule_violation_display() {
        colored::control::set_override(false);

        let error = Error::RuleViolation {
            position: Position { line: 4, column: 11 },
            tag: "port".to_string(),
            rule: "min".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "at 4:11: \"port\" violates validation rule: \"min\""
        );
    }

    #[test]
    fn test_io_error_has_source() {
        let error = Error::Io {
            path: PathBuf::from("missing.yaml"),
            source: Arc::new(std::io::Error::from(std::io::ErrorKind::NotFound)),
        };

        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(error.clone().kind(), ErrorKind::Io);
    }
}
