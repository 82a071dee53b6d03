//! Mock implementations of nodeflow extension points.

mod validator;

pub use validator::MockValidator;
