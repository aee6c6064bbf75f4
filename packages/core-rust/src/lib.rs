//! Jolt Core — dynamic values, augmentable callables, lifecycle events, and timers.
//!
//! Any [`Callable`] can acquire, on first use:
//!
//! 1. **Events** (`events`): per-callable subscriber lists (`on`, `then`, `error`, `always`, `emit`)
//! 2. **Execution wrapper** (`wrapper`): `invoke` / `invoke_as` with error containment
//! 3. **Scheduling** (`scheduler`): `later`, `after`, `every`, `stop`

pub mod callable;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod template;
pub mod traits;
pub mod value;
pub mod wrapper;

pub use callable::{Body, Callable, Dispatch};
pub use error::{CoreError, Fault};
pub use events::{event_names, EventBus};
pub use scheduler::{delay, PendingTimers, TimeUnit, TimerHandle, TimerKind};
pub use traits::Object;
pub use value::Value;
pub use wrapper::Outcome;
