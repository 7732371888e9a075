use crate::error::Error;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::Path;
use std::sync::Arc;

/// Where environment overrides are looked up
pub trait EnvSource {
    /// Value of the variable, `None` when it is not set
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The process environment. Variables that are not valid unicode are
/// treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl<S: BuildHasher> EnvSource for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// Reads a dotenv file into a map without touching the process environment
///
/// # Example
/// ```no_run
/// use yaml_loadr::{Loader, env};
/// # #[derive(yaml_loadr::Setting)]
/// # struct Config { #[field(yaml = "port", env = "PORT")] pub port: u16 }
///
/// let vars = env::from_dotenv_file(".env").unwrap();
/// let config: Config = Loader::new().with_env(vars).load_file("config.yaml").unwrap();
/// ```
pub fn from_dotenv_file(path: impl AsRef<Path>) -> Result<HashMap<String, String>, Error> {
    let path = path.as_ref();
    let io_error = |e: dotenvy::Error| Error::Io {
        path: path.to_path_buf(),
        source: Arc::new(match e {
            dotenvy::Error::Io(io) => io,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        }),
    };

    dotenvy::from_path_iter(path)
        .map_err(io_error)?
        .map(|item| item.map_err(io_error))
        .collect()
}
