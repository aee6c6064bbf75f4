//! Per-callable event bus.
//!
//! Every callable may carry an [`EventBus`] mapping event names to ordered
//! subscriber lists. The bus is created on first use with the three lifecycle
//! buckets already present; custom buckets appear on first subscription.
//!
//! Subscribers are callables themselves and are run through the execution
//! wrapper, so a failing subscriber reports its own `error`/`complete` and
//! never interrupts delivery to the rest.

use std::collections::HashMap;

use crate::callable::Callable;
use crate::error::CoreError;
use crate::value::Value;

/// Well-known event names.
pub mod event_names {
    pub const SUCCESS: &str = "success";
    pub const ERROR: &str = "error";
    pub const COMPLETE: &str = "complete";

    /// Buckets present on every bus from creation.
    pub const DEFAULTS: [&str; 3] = [SUCCESS, ERROR, COMPLETE];
}

/// Event name -> subscribers, in registration order.
#[derive(Debug)]
pub struct EventBus {
    buckets: HashMap<String, Vec<Callable>>,
}

impl EventBus {
    /// Creates a bus with the default `success`, `error`, and `complete` buckets.
    #[must_use]
    pub fn new() -> Self {
        let buckets = event_names::DEFAULTS
            .iter()
            .map(|name| ((*name).to_string(), Vec::new()))
            .collect();
        Self { buckets }
    }

    /// Appends a subscriber, creating the bucket if absent.
    pub fn subscribe(&mut self, event: &str, subscriber: Callable) {
        self.buckets
            .entry(event.to_string())
            .or_default()
            .push(subscriber);
    }

    /// Copy of the subscribers for `event`, so delivery can run without the
    /// bus locked.
    #[must_use]
    pub fn snapshot(&self, event: &str) -> Vec<Callable> {
        self.buckets.get(event).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn has_bucket(&self, event: &str) -> bool {
        self.buckets.contains_key(event)
    }

    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.buckets.get(event).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Callable {
    fn with_bus<R>(&self, f: impl FnOnce(&mut EventBus) -> R) -> R {
        let mut bus = self.state().bus.lock();
        f(bus.get_or_insert_with(EventBus::new))
    }

    /// Registers `subscriber` under `event`.
    pub fn on(&self, event: &str, subscriber: Callable) {
        self.with_bus(|bus| bus.subscribe(event, subscriber));
    }

    /// Subscribes to `success`. Returns `self` for chaining.
    pub fn then(&self, subscriber: Callable) -> &Self {
        self.on(event_names::SUCCESS, subscriber);
        self
    }

    /// Subscribes to `error`. Returns `self` for chaining.
    pub fn error(&self, subscriber: Callable) -> &Self {
        self.on(event_names::ERROR, subscriber);
        self
    }

    /// Subscribes to `complete`. Returns `self` for chaining.
    pub fn always(&self, subscriber: Callable) -> &Self {
        self.on(event_names::COMPLETE, subscriber);
        self
    }

    /// Delivers `args` to every subscriber of `event`, receiver-less.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingEventName`] if `event` is empty.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<(), CoreError> {
        if event.is_empty() {
            return Err(CoreError::MissingEventName);
        }
        self.deliver(event, None, args);
        Ok(())
    }

    /// Delivers `args` to every subscriber of `event`, each invoked with
    /// `receiver` as its execution context.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingEventName`] if `event` is empty.
    pub fn emit_as(&self, event: &str, receiver: &Value, args: &[Value]) -> Result<(), CoreError> {
        if event.is_empty() {
            return Err(CoreError::MissingEventName);
        }
        self.deliver(event, Some(receiver), args);
        Ok(())
    }

    /// Dynamic form of [`emit`](Self::emit): `[event, args...]`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingEventName`] if the list is empty or does
    /// not start with a non-empty string.
    pub fn emit_args(&self, args: &[Value]) -> Result<(), CoreError> {
        let (event, rest) = split_event(args)?;
        self.emit(event, rest)
    }

    /// Dynamic form of [`emit_as`](Self::emit_as): `[event, receiver, args...]`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingEventName`] or [`CoreError::MissingReceiver`].
    pub fn emit_as_args(&self, args: &[Value]) -> Result<(), CoreError> {
        let (event, rest) = split_event(args)?;
        let (receiver, rest) = rest.split_first().ok_or(CoreError::MissingReceiver)?;
        self.emit_as(event, receiver, rest)
    }

    /// Number of subscribers registered under `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.state()
            .bus
            .lock()
            .as_ref()
            .map_or(0, |bus| bus.subscriber_count(event))
    }

    /// Whether a bus has been created for this callable.
    #[must_use]
    pub fn has_event_bus(&self) -> bool {
        self.state().bus.lock().is_some()
    }

    /// Runs each subscriber of `event` through the execution wrapper.
    pub(crate) fn deliver(&self, event: &str, receiver: Option<&Value>, args: &[Value]) {
        let subscribers = self.with_bus(|bus| bus.snapshot(event));
        for subscriber in subscribers {
            match receiver {
                None => {
                    subscriber.invoke(args);
                }
                Some(receiver) => {
                    subscriber.invoke_as(receiver, args);
                }
            }
        }
    }
}

fn split_event(args: &[Value]) -> Result<(&str, &[Value]), CoreError> {
    let (first, rest) = args.split_first().ok_or(CoreError::MissingEventName)?;
    match first.as_str() {
        Some(event) if !event.is_empty() => Ok((event, rest)),
        _ => Err(CoreError::MissingEventName),
    }
}
