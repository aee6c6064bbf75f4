//! Error types for callable execution.
//!
//! Two families live here:
//!
//! - [`CoreError`]: API misuse surfaced synchronously to the caller (missing
//!   event name, missing receiver, scheduling without a runtime, ...).
//! - [`Fault`]: a value raised by a callable body. Faults never escape the
//!   execution wrapper; they become `error` events instead.

use crate::value::Value;

/// Misuse of the callable API. Always returned to the immediate caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("emit requires an event name")]
    MissingEventName,
    #[error("scoped emit requires a receiver")]
    MissingReceiver,
    #[error("expected an object receiver, found {found}")]
    NotAnObject { found: &'static str },
    #[error("{found} is not callable")]
    NotCallable { found: &'static str },
    #[error("receiver of `{callable}` has been dropped")]
    ReceiverDropped { callable: String },
    #[error("no async runtime available to schedule `{callable}`")]
    NoReactor { callable: String },
    #[error("cannot assign `{key}` on immutable {owner}")]
    Immutable { owner: String, key: String },
}

/// A value raised by a callable body.
///
/// Carries the raised [`Value`] verbatim so that `error` subscribers receive
/// exactly what the body produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{value}")]
pub struct Fault {
    value: Value,
}

impl Fault {
    /// Raises an arbitrary value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns the raised value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the fault, returning the raised value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<CoreError> for Fault {
    fn from(err: CoreError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_displays_raised_value() {
        let fault = Fault::new("boom");
        assert_eq!(fault.to_string(), "boom");
        assert_eq!(fault.value(), &Value::from("boom"));
    }

    #[test]
    fn core_error_converts_into_string_fault() {
        let fault = Fault::from(CoreError::MissingEventName);
        assert_eq!(
            fault.into_value(),
            Value::String("emit requires an event name".to_string())
        );
    }

    #[test]
    fn no_reactor_names_the_callable() {
        let err = CoreError::NoReactor {
            callable: "tick".to_string(),
        };
        assert_eq!(err.to_string(), "no async runtime available to schedule `tick`");
    }
}
