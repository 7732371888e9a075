use crate::env::{EnvSource, ProcessEnv};
use crate::error::{Error, ShapeViolation};
use crate::locate::locate;
use crate::node::parse;
use crate::rules::RuleEngine;
use crate::setting::Setting;
use crate::shape::{validate_type, Shape, StructRef};
use crate::values::validate_values;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Loads configuration documents into `T`.
///
/// Every load runs the same pipeline: the type is checked against the
/// structural rules, the document is parsed, its literals are checked,
/// it is decoded strictly, environment variables are overlaid, and
/// finally [`Validate`](crate::Validate) hooks and the optional rule
/// engine run on the result.
///
/// # Example
/// ```
/// use std::collections::HashMap;
/// use yaml_loadr::{Error, Loader, RuleViolation, Setting};
///
/// #[derive(Setting)]
/// struct Config {
///     #[field(yaml = "port", env = "PORT")]
///     pub port: u16,
/// }
///
/// let loader = Loader::<Config>::new()
///     .with_env(HashMap::<String, String>::new())
///     .with_rules(|c: &Config| {
///         if c.port < 1024 {
///             return Err(RuleViolation::new("Config.port", "min"));
///         }
///         Ok(())
///     });
///
/// let config = loader.load("port: 8080\n").unwrap();
/// assert_eq!(config.port, 8080);
///
/// match loader.load("port: 80\n") {
///     Err(Error::RuleViolation { position, tag, .. }) => {
///         assert_eq!((position.line, position.column), (1, 7));
///         assert_eq!(tag, "port");
///     }
///     _ => unreachable!(),
/// }
/// ```
pub struct Loader<'a, T> {
    env: Box<dyn EnvSource + 'a>,
    rules: Option<Box<dyn RuleEngine<T> + 'a>>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Setting> Loader<'a, T> {
    /// A loader reading overrides from the process environment, without a
    /// rule engine
    pub fn new() -> Self {
        Self {
            env: Box::new(ProcessEnv),
            rules: None,
            _marker: PhantomData,
        }
    }

    /// Replaces the environment overrides are looked up in
    pub fn with_env(mut self, env: impl EnvSource + 'a) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Runs `rules` on every successfully loaded value
    pub fn with_rules(mut self, rules: impl RuleEngine<T> + 'a) -> Self {
        self.rules = Some(Box::new(rules));
        self
    }

    pub fn load(&self, source: impl AsRef<[u8]>) -> Result<T, Error> {
        let bytes = source.as_ref();
        if bytes.is_empty() {
            return Err(Error::EmptyDocument);
        }

        validate_type::<T>()?;
        let root_type = root_struct::<T>()?;
        debug!(type_name = root_type.type_name, "type validated");

        let text = std::str::from_utf8(bytes).map_err(|e| Error::MalformedDocument {
            position: None,
            message: e.to_string(),
        })?;
        let root = parse(text)?;
        debug!(bytes = bytes.len(), "document parsed");

        validate_values(&root_type, &root)?;
        debug!("document values validated");

        let mut value = T::decode(&root)?;
        debug!("document decoded");

        value.apply_env(&*self.env, None, root_type.name)?;
        debug!("environment overlay applied");

        value.run_validate(&root)?;
        if let Some(rules) = &self.rules {
            if let Err(violation) = rules.check(&value) {
                debug!(namespace = %violation.namespace, rule = %violation.rule, "rule violated");
                let location = locate::<T>(&violation.namespace, &root);
                return Err(Error::RuleViolation {
                    position: location.position,
                    tag: location.tag,
                    rule: violation.rule,
                });
            }
        }
        debug!(type_name = root_type.type_name, "configuration loaded");

        Ok(value)
    }

    /// Reads `path` and loads it, I/O errors carry the path
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<T, Error> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading configuration file");
        let bytes = fs::read(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
        self.load(bytes)
    }
}

impl<T: Setting> Default for Loader<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Loader<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("rules", &self.rules.is_some())
            .finish_non_exhaustive()
    }
}

fn root_struct<T: Setting>() -> Result<StructRef, Error> {
    match T::shape() {
        Shape::Struct(root) => Ok(root),
        other => Err(Error::shape(other.type_name(), ShapeViolation::IllegalRootType)),
    }
}

/// Loads `source` with overrides from the process environment
pub fn load<T: Setting>(source: impl AsRef<[u8]>) -> Result<T, Error> {
    Loader::new().load(source)
}

/// Reads and loads the file at `path` with overrides from the process
/// environment
pub fn load_file<T: Setting>(path: impl AsRef<Path>) -> Result<T, Error> {
    Loader::new().load_file(path)
}
