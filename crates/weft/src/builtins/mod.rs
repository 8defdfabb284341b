//! Built-in callables.
//!
//! Each callable is a process-wide static, created on first use. Overload
//! selection goes through a [`ConcurrentDispatcher`] so the statics can be
//! resolved from several threads at once. [`FunctionCallable`] wraps a
//! caller's own function instead.

mod apply;
mod arith;
mod assign;
mod missing;

pub use apply::FunctionCallable;
pub use arith::{Arithmetic, add, divide, multiply, subtract};
pub use assign::{Assign, AssignFn, assign};
pub use missing::{AssignMissingCallable, IsMissingCallable, assign_missing, is_missing};

pub(crate) use assign::assign_with_mode;

use tracing::error;
use weft_types::TypeId;

use crate::dispatch::ConcurrentDispatcher;

/// Registers a built-in overload. The built-in sets are well founded, so a
/// rejection is logged instead of aborting initialization.
fn register<T: Clone>(
    dispatcher: &ConcurrentDispatcher<T>,
    callable: &str,
    params: impl Into<Box<[TypeId]>>,
    value: T,
) {
    if let Err(err) = dispatcher.insert(params, value) {
        error!(callable, %err, "built-in overload rejected");
    }
}
