//! Execution wrapper.
//!
//! Runs a callable, captures its outcome, and derives lifecycle events from
//! it: `success` with the result or `error` with the raised value, then
//! `complete` with no arguments. Failures are reported and contained; the
//! caller sees [`Value::Undefined`] instead.

use std::slice;

use crate::callable::{Callable, Dispatch};
use crate::error::Fault;
use crate::events::event_names;
use crate::value::Value;

/// Result of running a callable body once.
pub type Outcome = Result<Value, Fault>;

impl Callable {
    /// Invokes with the natural receiver and emits lifecycle events.
    ///
    /// Scoped triggers are invoked as their bound receiver, so their events
    /// carry it (see [`invoke_as`](Self::invoke_as)). Forks hand off to the
    /// original's wrapper, which settles once on the shared bus.
    pub fn invoke(&self, args: &[Value]) -> Value {
        match self.dispatch() {
            Dispatch::Scoped => match self.natural_receiver() {
                Ok(receiver) => self.invoke_as(&receiver, args),
                Err(fault) => self.settle(None, Err(fault)),
            },
            Dispatch::Forward => self.forward(args),
            Dispatch::Plain => {
                let outcome = self.call_with(&Value::Undefined, args);
                self.settle(None, outcome)
            }
        }
    }

    /// Alias of [`invoke`](Self::invoke).
    pub fn now(&self, args: &[Value]) -> Value {
        self.invoke(args)
    }

    /// Invokes with `receiver` as execution context. Lifecycle events are
    /// delivered through the scoped emit, carrying `receiver`.
    ///
    /// A fork ignores `receiver`: the original runs unscoped.
    pub fn invoke_as(&self, receiver: &Value, args: &[Value]) -> Value {
        if self.dispatch() == Dispatch::Forward {
            return self.forward(args);
        }
        let outcome = self.call_with(receiver, args);
        self.settle(Some(receiver), outcome)
    }

    // The forwarding body wraps the original's `invoke`, which never fails.
    fn forward(&self, args: &[Value]) -> Value {
        self.call_with(&Value::Undefined, args).unwrap_or_default()
    }

    fn settle(&self, receiver: Option<&Value>, outcome: Outcome) -> Value {
        let result = match outcome {
            Ok(value) => {
                self.deliver(event_names::SUCCESS, receiver, slice::from_ref(&value));
                value
            }
            Err(fault) => {
                tracing::warn!(callable = self.label(), error = %fault, "invocation failed");
                self.deliver(event_names::ERROR, receiver, &[fault.into_value()]);
                Value::Undefined
            }
        };
        self.deliver(event_names::COMPLETE, receiver, &[]);
        result
    }
}
