//! Augmentable callables.
//!
//! A [`Callable`] is a cheaply clonable handle around a body closure. Each
//! callable owns (or shares) a [`CallableState`] holding its lazily created
//! event bus and its tracked timers; the event, wrapper, and scheduler
//! capabilities are implemented in their own modules as `impl Callable` blocks.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{CoreError, Fault};
use crate::events::EventBus;
use crate::scheduler::TimerBook;
use crate::traits::Object;
use crate::value::Value;

/// Signature of a callable body: `(receiver, args) -> result`.
pub type Body = dyn Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync;

/// How a plain call on the callable is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Plain calls run the body directly.
    Plain,
    /// Plain calls and receiver-less invocations route through
    /// `invoke_as(bound_receiver, ..)`. Used for class-wide bound methods.
    Scoped,
    /// The body already runs another callable through its wrapper, so
    /// wrapper passes on this one run the body without settling again.
    /// Used for forks.
    Forward,
}

/// Receiver fixed at bind time.
#[derive(Clone)]
enum Bound {
    Strong(Value),
    Weak(Weak<dyn Object>),
}

/// Per-callable capability state: event bus and tracked timers.
#[derive(Default)]
pub(crate) struct CallableState {
    pub(crate) bus: Mutex<Option<EventBus>>,
    pub(crate) timers: Mutex<TimerBook>,
}

struct Inner {
    name: Option<String>,
    body: Arc<Body>,
    bound: Option<Bound>,
    dispatch: Dispatch,
    state: Arc<CallableState>,
}

/// A function-like unit that can acquire lifecycle events and scheduling.
///
/// Cloning a `Callable` yields another handle to the same callable: clones
/// share identity, event subscribers, and timers.
#[derive(Clone)]
pub struct Callable {
    inner: Arc<Inner>,
}

impl Callable {
    /// Creates an anonymous callable.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::from_parts(None, Arc::new(body), None, Dispatch::Plain, Arc::default())
    }

    /// Creates a callable carrying a declared name.
    pub fn named<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        Self::from_parts(
            Some(name.into()),
            Arc::new(body),
            None,
            Dispatch::Plain,
            Arc::default(),
        )
    }

    fn from_parts(
        name: Option<String>,
        body: Arc<Body>,
        bound: Option<Bound>,
        dispatch: Dispatch,
        state: Arc<CallableState>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                body,
                bound,
                dispatch,
                state,
            }),
        }
    }

    /// Declared name, if any. Anonymous callables return `None`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub(crate) fn label(&self) -> &str {
        self.name().unwrap_or("anonymous")
    }

    #[must_use]
    pub fn dispatch(&self) -> Dispatch {
        self.inner.dispatch
    }

    /// Returns a new callable with identical behavior but a different declared
    /// name. The result has its own, empty, event bus and timers.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::from_parts(
            Some(name.into()),
            Arc::clone(&self.inner.body),
            self.inner.bound.clone(),
            self.inner.dispatch,
            Arc::default(),
        )
    }

    /// Returns a new callable whose receiver is always `receiver`.
    #[must_use]
    pub fn bind(&self, receiver: Value) -> Self {
        Self::from_parts(
            self.inner.name.clone(),
            Arc::clone(&self.inner.body),
            Some(Bound::Strong(receiver)),
            Dispatch::Plain,
            Arc::default(),
        )
    }

    /// Returns a trigger bound weakly to `receiver` whose calls run through
    /// `invoke_as(receiver, ..)`.
    ///
    /// With `share_state`, the trigger delivers events on this callable's bus
    /// and tracks timers alongside it; otherwise it gets its own.
    #[must_use]
    pub fn bind_scoped(&self, receiver: Weak<dyn Object>, share_state: bool) -> Self {
        let state = if share_state {
            Arc::clone(&self.inner.state)
        } else {
            Arc::default()
        };
        Self::from_parts(
            self.inner.name.clone(),
            Arc::clone(&self.inner.body),
            Some(Bound::Weak(receiver)),
            Dispatch::Scoped,
            state,
        )
    }

    /// Returns a forwarding callable that re-invokes this one through
    /// [`invoke`](Self::invoke). The fork shares this callable's event bus and
    /// timers; invoking or scheduling the fork settles once, on that bus.
    #[must_use]
    pub fn fork(&self) -> Self {
        let original = self.clone();
        Self::from_parts(
            None,
            Arc::new(move |_: &Value, args: &[Value]| Ok(original.invoke(args))),
            None,
            Dispatch::Forward,
            Arc::clone(&self.inner.state),
        )
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether both callables deliver events on the same bus.
    #[must_use]
    pub fn shares_state_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner.state, &other.inner.state)
    }

    pub(crate) fn state(&self) -> &CallableState {
        &self.inner.state
    }

    /// The receiver used when none is supplied: the bound one, or `Undefined`.
    pub(crate) fn natural_receiver(&self) -> Result<Value, Fault> {
        self.receiver_for(&Value::Undefined)
    }

    fn receiver_for(&self, supplied: &Value) -> Result<Value, Fault> {
        match &self.inner.bound {
            None => Ok(supplied.clone()),
            Some(Bound::Strong(value)) => Ok(value.clone()),
            Some(Bound::Weak(weak)) => weak.upgrade().map(Value::Object).ok_or_else(|| {
                CoreError::ReceiverDropped {
                    callable: self.label().to_string(),
                }
                .into()
            }),
        }
    }

    /// Runs the body with `receiver`, bypassing events. A bound receiver
    /// takes precedence over the supplied one.
    ///
    /// # Errors
    ///
    /// Returns whatever fault the body raises, or a dropped-receiver fault.
    pub fn call_with(&self, receiver: &Value, args: &[Value]) -> Result<Value, Fault> {
        let this = self.receiver_for(receiver)?;
        (self.inner.body)(&this, args)
    }

    /// Plain call with the natural receiver.
    ///
    /// Scoped triggers route through the execution wrapper, so their plain
    /// calls never fail; a contained failure yields `Ok(Value::Undefined)`.
    ///
    /// # Errors
    ///
    /// Returns whatever fault the body raises (plain dispatch only).
    pub fn call(&self, args: &[Value]) -> Result<Value, Fault> {
        match self.inner.dispatch {
            Dispatch::Scoped => Ok(self.invoke(args)),
            Dispatch::Plain | Dispatch::Forward => self.call_with(&Value::Undefined, args),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.label())
            .field("dispatch", &self.inner.dispatch)
            .field("bound", &self.inner.bound.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn echo_receiver() -> Callable {
        Callable::new(|this, _| Ok(this.clone()))
    }

    #[test]
    fn call_passes_arguments_through() {
        let sum = Callable::new(|_, args| {
            Ok(Value::Int(args.iter().filter_map(Value::as_int).sum()))
        });
        assert_eq!(sum.call(&[1.into(), 2.into(), 3.into()]).unwrap(), Value::Int(6));
    }

    #[test]
    fn unbound_call_sees_undefined_receiver() {
        assert_eq!(echo_receiver().call(&[]).unwrap(), Value::Undefined);
        assert_eq!(
            echo_receiver().call_with(&"ctx".into(), &[]).unwrap(),
            Value::from("ctx")
        );
    }

    #[test]
    fn bound_receiver_overrides_supplied_one() {
        let bound = echo_receiver().bind("fixed".into());
        assert_eq!(bound.call(&[]).unwrap(), Value::from("fixed"));
        assert_eq!(bound.call_with(&"other".into(), &[]).unwrap(), Value::from("fixed"));
        assert!(!bound.shares_state_with(&echo_receiver()));
    }

    #[test]
    fn renamed_keeps_behavior_with_fresh_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let original = Callable::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        });
        let renamed = original.renamed("property");

        assert_eq!(original.name(), None);
        assert_eq!(renamed.name(), Some("property"));
        renamed.call(&[]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!renamed.shares_state_with(&original));
    }

    #[test]
    fn fork_shares_state_but_not_identity() {
        let f = Callable::new(|_, args| Ok(args.first().cloned().unwrap_or_default()));
        let g = f.fork();
        assert!(g.shares_state_with(&f));
        assert!(!g.ptr_eq(&f));
        assert_eq!(g.call(&[5.into()]).unwrap(), Value::Int(5));
    }

    #[test]
    fn errors_propagate_from_plain_calls() {
        let failing = Callable::new(|_, _| Err(Fault::new("nope")));
        assert_eq!(failing.call(&[]).unwrap_err(), Fault::new("nope"));
    }
}
