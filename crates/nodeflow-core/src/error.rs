//! Common error type definitions.

use thiserror::Error;

use crate::value::ValueType;

/// Type alias for boxed dynamic errors that can be sent across threads.
///
/// Node callables return this error type so that any user error can cross
/// the worker boundary of a parallel adapter.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading arguments out of [`Inputs`].
///
/// [`Inputs`]: crate::Inputs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The argument was not resolved for this call.
    #[error("input '{name}' is not available")]
    Missing {
        /// Name of the missing argument.
        name: String,
    },

    /// The argument exists but holds a value of another type.
    #[error("input '{name}' expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the argument.
        name: String,
        /// Type the caller asked for.
        expected: ValueType,
        /// Type actually held.
        found: ValueType,
    },
}
