use parking_lot::Mutex;
use tokio::{runtime::Handle, task::JoinHandle};

use super::{cancellable, Duration, Instant, Scheduler};
use crate::disposable::{BoxedDisposable, Disposable, NaryDisposable};

/// Runs actions as tasks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler {
  handle: Handle,
}

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { Self { handle } }

  /// The runtime the caller is running on, if any.
  pub fn try_current() -> Option<Self> { Handle::try_current().ok().map(Self::new) }
}

impl Scheduler for TokioScheduler {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    let (handle, run) = cancellable(action);
    let task = self.handle.spawn(async move {
      if !due.is_zero() {
        tokio::time::sleep(due).await;
      }
      run();
    });
    Box::new(NaryDisposable::pair(handle, TaskAbort(Mutex::new(Some(task)))))
  }
}

struct TaskAbort(Mutex<Option<JoinHandle<()>>>);

impl Disposable for TaskAbort {
  fn dispose(&self) {
    let task = self.0.lock().take();
    if let Some(task) = task {
      task.abort();
    }
  }

  fn is_disposed(&self) -> bool { self.0.lock().is_none() }
}
