#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod inputs;
mod node;
mod validation;
mod value;

#[doc(hidden)]
pub mod prelude;

pub use error::{BoxedError, InputError};
pub use inputs::Inputs;
pub use node::{
    Dependency, Node, NodeFn, NodeRole, TAG_CACHE, TAG_IMPORTANCE, TAG_QUALITY_IMPORTANCE,
    TAG_TARGET, TAG_VALIDATOR, Tags, ValidatorBinding,
};
pub use validation::{Importance, ValidationOutcome, Validator};
pub use value::{Value, ValueMap, ValueType};
