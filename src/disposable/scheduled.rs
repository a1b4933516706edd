use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedDisposable, Disposable};
use crate::{atomic::AtomicInt, scheduler::Scheduler};

const DISPOSED: i32 = 1;

/// Disposes its inner disposable on a scheduler instead of the calling
/// thread.
pub struct ScheduledDisposable<S> {
  scheduler: S,
  inner: Arc<Inner>,
}

struct Inner {
  state: AtomicInt,
  disposable: Mutex<Option<BoxedDisposable>>,
}

impl<S: Scheduler> ScheduledDisposable<S> {
  pub fn new<D>(scheduler: S, disposable: D) -> Self
  where
    D: Disposable + Send + Sync + 'static,
  {
    let disposable: BoxedDisposable = Box::new(disposable);
    let inner = Inner { state: AtomicInt::new(0), disposable: Mutex::new(Some(disposable)) };
    Self { scheduler, inner: Arc::new(inner) }
  }

  pub fn scheduler(&self) -> &S { &self.scheduler }
}

impl<S: Clone> Clone for ScheduledDisposable<S> {
  fn clone(&self) -> Self { Self { scheduler: self.scheduler.clone(), inner: self.inner.clone() } }
}

impl<S: Scheduler> Disposable for ScheduledDisposable<S> {
  fn dispose(&self) {
    if !self.inner.state.try_set_flag(DISPOSED) {
      return;
    }
    let disposable = self.inner.disposable.lock().take();
    if let Some(disposable) = disposable {
      self.scheduler.schedule(move || disposable.dispose());
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.inner.state.is_flag_set(DISPOSED) }
}
