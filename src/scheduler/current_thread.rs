use std::{cell::RefCell, collections::BTreeMap, thread};

use super::{cancellable, Duration, Instant, Scheduler};
use crate::disposable::{BoxedDisposable, Disposable};

type Job = Box<dyn FnOnce()>;

#[derive(Default)]
struct Trampoline {
  next_seq: u64,
  queue: BTreeMap<(Instant, u64), Job>,
}

thread_local! {
  static TRAMPOLINE: RefCell<Option<Trampoline>> = const { RefCell::new(None) };
}

/// Runs actions on the calling thread.
///
/// The first action scheduled on a thread runs right away and installs a
/// trampoline; actions scheduled while it runs are queued by due time and run
/// after it returns, so nested scheduling never deepens the stack. Delays
/// block the thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
  /// Whether an action scheduled now would run right away, that is, the
  /// calling thread is not already draining scheduled actions.
  pub fn is_schedule_required() -> bool { TRAMPOLINE.with(|t| t.borrow().is_none()) }
}

impl Scheduler for CurrentThreadScheduler {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    let due_at = Instant::now() + due;
    let (handle, run) = cancellable(action);
    let c_handle = handle.clone();
    let job: Job = Box::new(move || {
      if c_handle.is_disposed() {
        return;
      }
      let now = Instant::now();
      if due_at > now {
        thread::sleep(due_at - now);
      }
      run();
    });

    let first = TRAMPOLINE.with(|t| match t.borrow_mut().as_mut() {
      Some(trampoline) => {
        let seq = trampoline.next_seq;
        trampoline.next_seq += 1;
        trampoline.queue.insert((due_at, seq), job);
        None
      }
      None => Some(job),
    });
    if let Some(job) = first {
      drain(job);
    }
    Box::new(handle)
  }
}

/// Clears the trampoline when the drain ends, also while unwinding.
struct TrampolineGuard;

impl Drop for TrampolineGuard {
  fn drop(&mut self) {
    let leftover = TRAMPOLINE.with(|t| t.borrow_mut().take());
    drop(leftover);
  }
}

fn drain(first: Job) {
  TRAMPOLINE.with(|t| *t.borrow_mut() = Some(Trampoline::default()));
  let _guard = TrampolineGuard;

  let mut next = Some(first);
  while let Some(job) = next {
    job();
    next = TRAMPOLINE.with(|t| {
      t.borrow_mut()
        .as_mut()
        .and_then(|trampoline| trampoline.queue.pop_first())
        .map(|(_, job)| job)
    });
  }
}
