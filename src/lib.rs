//! Strict, typed YAML configuration loading.
//!
//! A configuration type derives [`Setting`], binding each public field to a
//! document key with `#[field(yaml = "...")]` and optionally to an
//! environment variable with `env = "..."`. Loading rejects anything the
//! type cannot represent exactly: unknown or missing keys, YAML tags,
//! boolean spellings other than `true`/`false`, null spellings other than
//! `null`, and `null` on values that cannot hold it.
//!
//! ```no_run
//! use yaml_loadr::Setting;
//!
//! #[derive(Setting)]
//! struct Config {
//!     #[field(yaml = "listen", env = "LISTEN")]
//!     pub listen: String,
//!     #[field(yaml = "workers")]
//!     pub workers: Option<u8>,
//! }
//!
//! let config: Config = yaml_loadr::load_file("config.yaml").unwrap();
//! ```

extern crate self as yaml_loadr;

mod de;
mod docs;
pub mod duration;
pub mod env;
pub mod error;
mod loader;
mod locate;
pub mod node;
mod rules;
mod setting;
pub mod shape;
mod values;

#[doc(hidden)]
pub mod macros;

pub use docs::{docs, write_docs};
pub use env::{EnvSource, ProcessEnv};
pub use error::{Error, ErrorKind, LiteralViolation, ShapeViolation};
pub use loader::{load, load_file, Loader};
pub use locate::{locate, Location};
pub use node::{parse, Node, NodeKind, Position, Style};
pub use rules::{RuleEngine, RuleViolation};
pub use setting::{BoxError, FromNode, FromText, Setting, Validate};
pub use shape::{validate_type, Capability, FieldShape, Shape, StructRef};

// Re-export derive macro
pub use yaml_loadr_macros::Setting;
