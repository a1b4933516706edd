//! Schedulers: where and when actions run.
//!
//! A [`Scheduler`] accepts an action, optionally delayed, and returns a
//! disposable that cancels it while it is still pending. The action itself
//! may return a disposable for follow-up work; disposing the handle after the
//! action ran releases that one instead.
//!
//! | Scheduler | Runs actions |
//! |---|---|
//! | [`CurrentThreadScheduler`] | on the calling thread, through a trampoline |
//! | [`SerialScheduler`] | on one dedicated worker, immediate actions in FIFO order |
//! | [`ConcurrentScheduler`] | on a shared thread pool |
//! | [`TokioScheduler`] | as tokio tasks (feature `tokio-scheduler`) |
//! | [`VirtualTimeScheduler`] | when virtual time is advanced explicitly |
//! | [`HistoricalScheduler`] | like the above, on an [`Instant`] clock |
//! | [`TestScheduler`] | virtual time plus hot/cold test fixtures |

pub use std::time::{Duration, Instant};

use crate::disposable::{BoxedDisposable, Disposable, SingleAssignmentDisposable};

mod current_thread;
mod historical;
mod recursive;
#[cfg(feature = "futures-scheduler")]
mod thread_pool;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
mod virtual_time;

pub mod test_scheduler;

pub use current_thread::CurrentThreadScheduler;
pub use historical::HistoricalScheduler;
pub use recursive::Recursion;
pub use test_scheduler::TestScheduler;
#[cfg(feature = "futures-scheduler")]
pub use thread_pool::{ConcurrentScheduler, SerialScheduler};
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::{VirtualTimeConfig, VirtualTimeScheduler};

/// An execution context for actions.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// The scheduler's notion of the current time.
  fn now(&self) -> Instant;

  /// Run `action` once `due` has elapsed.
  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static;

  /// Run `action` as soon as possible.
  fn schedule<F, D>(&self, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    self.schedule_relative(Duration::ZERO, action)
  }

  /// Run `action` repeatedly. Each run receives the state and a
  /// [`Recursion`] through which it requests the next run; every run goes
  /// back through this scheduler's queue.
  ///
  /// ```rust
  /// use std::sync::Arc;
  ///
  /// use parking_lot::Mutex;
  /// use rxcore::prelude::*;
  ///
  /// let scheduler = VirtualTimeScheduler::new();
  /// let seen = Arc::new(Mutex::new(vec![]));
  /// let c_seen = seen.clone();
  /// scheduler.schedule_recursive(0, move |n, recursion| {
  ///   c_seen.lock().push(n);
  ///   if n < 3 {
  ///     recursion.schedule_after(Duration::from_millis(10), n + 1);
  ///   }
  /// });
  /// scheduler.start().unwrap();
  /// assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
  /// assert_eq!(scheduler.clock(), 30);
  /// ```
  fn schedule_recursive<St, F>(&self, state: St, action: F) -> BoxedDisposable
  where
    St: Send + 'static,
    F: FnMut(St, &mut Recursion<St>) + Send + 'static,
  {
    recursive::schedule_recursive(self, state, action)
  }

  /// Run `action` after `start_after` and then every `period`, threading
  /// the state from one run into the next, until the handle is disposed.
  ///
  /// Runs stay on the grid `now() + start_after + n * period` even when one
  /// of them starts late. A zero period runs back to back.
  fn schedule_periodic<St, F>(
    &self, state: St, start_after: Duration, period: Duration, action: F,
  ) -> BoxedDisposable
  where
    St: Send + 'static,
    F: FnMut(St) -> St + Send + 'static,
  {
    recursive::schedule_periodic(self, state, start_after, period, action)
  }
}

/// Wrap `action` so it is skipped once `handle` is disposed, and so the
/// disposable it returns is owned by `handle`.
pub(crate) fn cancellable<F, D>(action: F) -> (SingleAssignmentDisposable, impl FnOnce() + Send)
where
  F: FnOnce() -> D + Send + 'static,
  D: Disposable + Send + Sync + 'static,
{
  let handle = SingleAssignmentDisposable::new();
  let c_handle = handle.clone();
  let run = move || {
    if !c_handle.is_disposed() {
      // a fresh holder, so the only possible outcome besides storing is
      // disposing a late value
      c_handle.set(action()).ok();
    }
  };
  (handle, run)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::disposable::BooleanDisposable;

  #[rxcore_macro::test]
  fn cancellable_skips_disposed_action() {
    let ran = BooleanDisposable::new();
    let c_ran = ran.clone();
    let (handle, run) = cancellable(move || c_ran.dispose());
    handle.dispose();
    run();
    assert!(!ran.is_disposed());
  }

  #[rxcore_macro::test]
  fn cancellable_hands_result_to_handle() {
    let inner = BooleanDisposable::new();
    let c_inner = inner.clone();
    let (handle, run) = cancellable(move || c_inner);
    run();
    assert!(!inner.is_disposed());
    handle.dispose();
    assert!(inner.is_disposed());
  }
}
