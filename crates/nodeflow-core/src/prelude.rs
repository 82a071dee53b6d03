//! Convenient re-exports for common use.

pub use crate::error::{BoxedError, InputError};
pub use crate::inputs::Inputs;
pub use crate::node::{Dependency, Node, NodeRole, Tags};
pub use crate::validation::{Importance, ValidationOutcome, Validator};
pub use crate::value::{Value, ValueMap, ValueType};
