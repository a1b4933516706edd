use std::{
  future::Future,
  io,
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  executor::ThreadPool,
  future::{abortable, AbortHandle},
  ready, FutureExt,
};
use futures_time::task::Sleep;
use once_cell::sync::OnceCell;
use pin_project_lite::pin_project;

use super::{cancellable, Duration, Instant, Scheduler};
use crate::{
  atomic::AtomicInt,
  disposable::{BoxedDisposable, Disposable, NaryDisposable},
};

static SHARED_POOL: OnceCell<ThreadPool> = OnceCell::new();

/// Runs every action on one dedicated worker thread.
///
/// Immediate actions run in the order they were scheduled.
#[derive(Clone)]
pub struct SerialScheduler {
  pool: ThreadPool,
}

impl SerialScheduler {
  pub fn new() -> io::Result<Self> {
    let pool = ThreadPool::builder()
      .pool_size(1)
      .name_prefix("rxcore-serial-")
      .create()?;
    Ok(Self { pool })
  }
}

impl Scheduler for SerialScheduler {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    spawn_delayed(&self.pool, due, action)
  }
}

/// Runs actions on a thread pool, with no ordering between actions.
#[derive(Clone)]
pub struct ConcurrentScheduler {
  pool: ThreadPool,
}

impl ConcurrentScheduler {
  /// A scheduler on the process-wide pool, created on first use.
  pub fn shared() -> io::Result<Self> {
    let pool = SHARED_POOL.get_or_try_init(|| {
      ThreadPool::builder()
        .name_prefix("rxcore-pool-")
        .create()
    })?;
    Ok(Self { pool: pool.clone() })
  }

  pub fn with_pool(pool: ThreadPool) -> Self { Self { pool } }
}

impl Scheduler for ConcurrentScheduler {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    spawn_delayed(&self.pool, due, action)
  }
}

pin_project! {
  /// Waits out an optional delay, then runs its action once.
  struct DelayedAction<F> {
    #[pin]
    delay: Option<Sleep>,
    action: Option<F>,
  }
}

impl<F: FnOnce()> Future for DelayedAction<F> {
  type Output = ();

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
    let mut this = self.project();
    if let Some(delay) = this.delay.as_mut().as_pin_mut() {
      ready!(delay.poll(cx));
      this.delay.set(None);
    }
    if let Some(action) = this.action.take() {
      action();
    }
    Poll::Ready(())
  }
}

const ABORTED: i32 = 1;

/// Aborts a spawned task that has not run yet.
struct SpawnHandle {
  abort: AbortHandle,
  state: AtomicInt,
}

impl Disposable for SpawnHandle {
  fn dispose(&self) {
    if self.state.try_set_flag(ABORTED) {
      self.abort.abort();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.state.is_flag_set(ABORTED) }
}

fn spawn_delayed<F, D>(pool: &ThreadPool, due: Duration, action: F) -> BoxedDisposable
where
  F: FnOnce() -> D + Send + 'static,
  D: Disposable + Send + Sync + 'static,
{
  let (handle, run) = cancellable(action);
  let delay = (!due.is_zero()).then(|| futures_time::task::sleep(due.into()));
  let (task, abort) = abortable(DelayedAction { delay, action: Some(run) });
  pool.spawn_ok(task.map(|_| ()));
  Box::new(NaryDisposable::pair(handle, SpawnHandle { abort, state: AtomicInt::new(0) }))
}
