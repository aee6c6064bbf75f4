use std::any::Any;
use std::fmt;

use crate::error::Fault;
use crate::value::Value;

/// An object whose members are resolved through a controlled lookup.
///
/// Implemented by the runtime's types and instances. Callable bodies receive
/// their receiver as a [`Value`] and reach members through this trait.
///
/// Used as `Arc<dyn Object>`.
pub trait Object: Send + Sync + fmt::Debug + Any {
    /// Declared name of the object's type (e.g., `"Counter"`).
    fn type_name(&self) -> &str;

    /// Resolves a member. Unknown members resolve to [`Value::Undefined`].
    ///
    /// # Errors
    ///
    /// Returns a fault if resolution runs code that fails (a computed
    /// property, for example).
    fn get(&self, key: &str) -> Result<Value, Fault>;

    /// Assigns an own data member.
    ///
    /// # Errors
    ///
    /// Returns a fault if the object does not accept assignment.
    fn set(&self, key: &str, value: Value) -> Result<(), Fault>;

    /// Enables downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Resolves a member and calls it with `args`.
    ///
    /// # Errors
    ///
    /// Returns a fault if the member is not callable or the call fails.
    fn call_member(&self, key: &str, args: &[Value]) -> Result<Value, Fault> {
        self.get(key)?.expect_callable()?.call(args)
    }
}
