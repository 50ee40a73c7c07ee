//! Panic containment for calls into probe code.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;

/// Run `f`, converting a panic into an error.
///
/// Probe code runs inside the host process under the lifecycle lock; a panic
/// must neither unwind into the host nor poison the agent's state.
///
/// # Errors
///
/// Returns the closure's own error, or an error carrying the panic message.
pub fn call_guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
