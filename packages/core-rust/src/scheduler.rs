//! Deferred and repeating invocation.
//!
//! Scheduled invocations run on the ambient tokio runtime and go through the
//! receiver-less execution wrapper, so failures inside them are contained the
//! same way as synchronous calls. Every handle is tracked on the callable in
//! one of two lists (one-shot, repeating) so [`Callable::stop`] can cancel
//! them all at once.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::callable::Callable;
use crate::error::CoreError;
use crate::value::Value;

/// Shortest period a repeating timer may have.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Delay unit accepted by the scheduling forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Parses `s`, `m`, `h`, or `d`. Anything else (including an empty
    /// string) is treated as milliseconds.
    #[must_use]
    pub fn parse(unit: &str) -> Self {
        match unit {
            "s" => Self::Seconds,
            "m" => Self::Minutes,
            "h" => Self::Hours,
            "d" => Self::Days,
            _ => Self::Millis,
        }
    }

    /// Milliseconds per unit.
    #[must_use]
    pub const fn multiplier(self) -> u64 {
        match self {
            Self::Millis => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }
}

/// `n * multiplier(unit)` milliseconds, saturating.
#[must_use]
pub fn delay(n: u64, unit: &str) -> Duration {
    Duration::from_millis(n.saturating_mul(TimeUnit::parse(unit).multiplier()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    OneShot,
    Repeating,
}

/// Reference to a scheduled invocation.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: u64,
    kind: TimerKind,
    abort: AbortHandle,
}

impl TimerHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    /// Whether the underlying task has finished (fired or been cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

/// Count of tracked handles on a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingTimers {
    pub one_shot: usize,
    pub repeating: usize,
}

impl PendingTimers {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.one_shot == 0 && self.repeating == 0
    }
}

/// The two handle lists tracked per callable.
#[derive(Debug, Default)]
pub(crate) struct TimerBook {
    next_id: u64,
    one_shot: Vec<TimerHandle>,
    repeating: Vec<TimerHandle>,
}

impl TimerBook {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn retire(&mut self, id: u64) {
        self.one_shot.retain(|handle| handle.id != id);
    }
}

impl Callable {
    /// Invokes on the next scheduling opportunity rather than synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoReactor`] outside a tokio runtime.
    pub fn later(&self, args: Vec<Value>) -> Result<TimerHandle, CoreError> {
        self.schedule_once(Duration::ZERO, args)
    }

    /// Invokes once after `n` units (see [`delay`]).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoReactor`] outside a tokio runtime.
    pub fn after(&self, n: u64, unit: &str, args: Vec<Value>) -> Result<TimerHandle, CoreError> {
        self.schedule_once(delay(n, unit), args)
    }

    /// Invokes every `n` units until [`stop`](Self::stop) is called. The first
    /// invocation happens one period from now.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoReactor`] outside a tokio runtime.
    pub fn every(&self, n: u64, unit: &str, args: Vec<Value>) -> Result<TimerHandle, CoreError> {
        let runtime = self.reactor()?;
        let period = delay(n, unit).max(MIN_PERIOD);
        let target = self.clone();

        let mut book = self.state().timers.lock();
        let id = book.allocate();
        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                target.invoke(&args);
            }
        });
        let handle = TimerHandle {
            id,
            kind: TimerKind::Repeating,
            abort: task.abort_handle(),
        };
        book.repeating.push(handle.clone());
        Ok(handle)
    }

    /// Cancels every tracked one-shot and repeating timer. Calling it with
    /// nothing scheduled is a no-op.
    pub fn stop(&self) {
        let (one_shot, repeating) = {
            let mut book = self.state().timers.lock();
            (
                std::mem::take(&mut book.one_shot),
                std::mem::take(&mut book.repeating),
            )
        };
        if one_shot.is_empty() && repeating.is_empty() {
            return;
        }
        for handle in one_shot.iter().chain(&repeating) {
            handle.abort.abort();
        }
        tracing::debug!(
            callable = self.label(),
            one_shot = one_shot.len(),
            repeating = repeating.len(),
            "timers cancelled"
        );
    }

    /// Number of tracked timers not yet fired or cancelled.
    #[must_use]
    pub fn pending_timers(&self) -> PendingTimers {
        let book = self.state().timers.lock();
        PendingTimers {
            one_shot: book.one_shot.len(),
            repeating: book.repeating.len(),
        }
    }

    fn reactor(&self) -> Result<Handle, CoreError> {
        Handle::try_current().map_err(|_| CoreError::NoReactor {
            callable: self.label().to_string(),
        })
    }

    fn schedule_once(&self, wait: Duration, args: Vec<Value>) -> Result<TimerHandle, CoreError> {
        let runtime = self.reactor()?;
        let target = self.clone();

        // The book stays locked until the handle is recorded, so the task
        // cannot retire its id before it exists.
        let mut book = self.state().timers.lock();
        let id = book.allocate();
        let task = runtime.spawn(async move {
            tokio::time::sleep(wait).await;
            // On a multi-thread runtime a `stop` landing between retire and
            // invoke no longer sees this handle, so the invocation still runs.
            target.state().timers.lock().retire(id);
            target.invoke(&args);
        });
        let handle = TimerHandle {
            id,
            kind: TimerKind::OneShot,
            abort: task.abort_handle(),
        };
        book.one_shot.push(handle.clone());
        Ok(handle)
    }
}
