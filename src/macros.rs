// Paths used by the code `#[derive(Setting)]` expands to. Everything here
// is reachable through `yaml_loadr::macros::*` so generated code does not
// depend on how the crate is laid out.

pub use crate::de::{from_node, from_text, untagged, StructNode};
pub use crate::env::EnvSource;
pub use crate::error::Error;
pub use crate::node::Node;
pub use crate::setting::{validation_error, FromNode, FromText, Setting, Validate};
pub use crate::shape::{Capability, FieldShape, Shape, StructRef};
pub use std::any::type_name;
