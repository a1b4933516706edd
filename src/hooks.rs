//! Process-wide hook for errors nobody handles.
//!
//! A callback subscription created without an error handler routes its
//! terminal error here instead of dropping it. The built-in hook logs it with
//! `tracing::error!`.
//!
//! The hook is one explicit cell. Swapping it is meant for process startup and
//! tests; under concurrent tests every thread sees the same hook, so tests
//! that install one should hold the returned [`HookGuard`] for their whole
//! body and restore the previous hook by dropping it.
//!
//! ```rust
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! use rxcore::hooks;
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let c_hits = hits.clone();
//! let guard = hooks::set_default_error_handler(move |_err| {
//!   c_hits.fetch_add(1, Ordering::SeqCst);
//! });
//! hooks::default_error_handler(&"boom");
//! drop(guard);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::{fmt::Debug, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

pub type ErrorHandler = Arc<dyn Fn(&dyn Debug) + Send + Sync>;

static DEFAULT_ERROR_HANDLER: Lazy<RwLock<ErrorHandler>> =
  Lazy::new(|| RwLock::new(builtin_error_handler()));

fn builtin_error_handler() -> ErrorHandler {
  Arc::new(|err| tracing::error!(error = ?err, "unhandled error in subscription"))
}

/// Report an error that reached a subscription without an error handler.
pub fn default_error_handler(err: &dyn Debug) {
  // clone out so the hook may itself swap the hook
  let handler = DEFAULT_ERROR_HANDLER.read().clone();
  handler(err);
}

/// Install `handler`, returning a guard that puts the previous one back.
pub fn set_default_error_handler<F>(handler: F) -> HookGuard
where
  F: Fn(&dyn Debug) + Send + Sync + 'static,
{
  let previous = std::mem::replace(&mut *DEFAULT_ERROR_HANDLER.write(), Arc::new(handler));
  HookGuard { previous: Some(previous) }
}

/// Restore the built-in logging hook.
pub fn reset_default_error_handler() {
  *DEFAULT_ERROR_HANDLER.write() = builtin_error_handler();
}

/// Restores the previously installed hook when dropped.
#[must_use]
pub struct HookGuard {
  previous: Option<ErrorHandler>,
}

impl HookGuard {
  /// Keep the new hook installed for the rest of the process.
  pub fn forget(mut self) { self.previous = None; }
}

impl Drop for HookGuard {
  fn drop(&mut self) {
    if let Some(previous) = self.previous.take() {
      *DEFAULT_ERROR_HANDLER.write() = previous;
    }
  }
}
