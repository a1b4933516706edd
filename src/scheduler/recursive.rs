use std::sync::Arc;

use parking_lot::Mutex;

use super::{Duration, Scheduler};
use crate::disposable::{BoxedDisposable, CompositeDisposable, SingleAssignmentDisposable};

/// Handed to each run of a recursive action to request the next run.
///
/// Requesting twice within one run keeps only the last request; not
/// requesting at all ends the recursion.
pub struct Recursion<St> {
  next: Option<(Duration, St)>,
}

impl<St> Recursion<St> {
  /// Run again as soon as possible with `state`.
  pub fn schedule(&mut self, state: St) { self.schedule_after(Duration::ZERO, state) }

  /// Run again after `due` with `state`.
  pub fn schedule_after(&mut self, due: Duration, state: St) { self.next = Some((due, state)); }
}

pub(crate) fn schedule_recursive<S, St, F>(scheduler: &S, state: St, action: F) -> BoxedDisposable
where
  S: Scheduler,
  St: Send + 'static,
  F: FnMut(St, &mut Recursion<St>) + Send + 'static,
{
  schedule_recursive_after(scheduler, Duration::ZERO, state, action)
}

pub(crate) fn schedule_recursive_after<S, St, F>(
  scheduler: &S, due: Duration, state: St, action: F,
) -> BoxedDisposable
where
  S: Scheduler,
  St: Send + 'static,
  F: FnMut(St, &mut Recursion<St>) + Send + 'static,
{
  let group = CompositeDisposable::new();
  step(scheduler.clone(), group.clone(), Arc::new(Mutex::new(action)), due, state);
  Box::new(group)
}

/// Run `action` after `start_after`, then every `period`.
///
/// Run `n` is due at `start + start_after + n * period`; a late run shortens
/// the wait before the next one instead of shifting every later run.
pub(crate) fn schedule_periodic<S, St, F>(
  scheduler: &S, state: St, start_after: Duration, period: Duration, mut action: F,
) -> BoxedDisposable
where
  S: Scheduler,
  St: Send + 'static,
  F: FnMut(St) -> St + Send + 'static,
{
  let first = scheduler.now().checked_add(start_after);
  let clock = scheduler.clone();
  let mut runs: u32 = 0;
  schedule_recursive_after(scheduler, start_after, state, move |state, recursion| {
    let state = action(state);
    runs = runs.saturating_add(1);
    let due = first.and_then(|first| first.checked_add(period.checked_mul(runs)?));
    let wait = match due {
      Some(due) => due.saturating_duration_since(clock.now()),
      None => period,
    };
    recursion.schedule_after(wait, state);
  })
}

// Every pending run owns one slot in `group`, so disposing the group cancels
// whichever run is queued. A finished run removes its own slot.
fn step<S, St, F>(
  scheduler: S, group: CompositeDisposable, action: Arc<Mutex<F>>, due: Duration, state: St,
) where
  S: Scheduler,
  St: Send + 'static,
  F: FnMut(St, &mut Recursion<St>) + Send + 'static,
{
  let slot = SingleAssignmentDisposable::new();
  let Some(key) = group.insert(slot.clone()) else {
    return;
  };

  let c_scheduler = scheduler.clone();
  let c_group = group.clone();
  let handle = scheduler.schedule_relative(due, move || {
    let mut recursion = Recursion { next: None };
    {
      let mut action = action.lock();
      (*action)(state, &mut recursion);
    }
    if let Some((due, state)) = recursion.next {
      step(c_scheduler, c_group.clone(), action, due, state);
    }
    c_group.remove(key);
  });
  slot.set(handle).ok();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    disposable::Disposable,
    scheduler::{CurrentThreadScheduler, VirtualTimeScheduler},
  };

  #[rxcore_macro::test]
  fn runs_until_no_more_requests() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let (c_seen, c_scheduler) = (seen.clone(), scheduler.clone());
    scheduler.schedule_recursive(1, move |n, recursion| {
      c_seen.lock().push((n, c_scheduler.clock()));
      if n < 4 {
        recursion.schedule_after(Duration::from_millis(5), n * 2);
      }
    });
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.start().unwrap();
    assert_eq!(*seen.lock(), vec![(1, 0), (2, 5), (4, 10)]);
    assert_eq!(scheduler.pending_count(), 0);
  }

  #[rxcore_macro::test]
  fn dispose_cancels_the_pending_run() {
    let scheduler = VirtualTimeScheduler::new();
    let runs = Arc::new(Mutex::new(0));
    let c_runs = runs.clone();
    let handle = scheduler.schedule_recursive((), move |(), recursion| {
      *c_runs.lock() += 1;
      recursion.schedule_after(Duration::from_millis(10), ());
    });

    scheduler.advance_to(25).unwrap();
    assert_eq!(*runs.lock(), 3);
    handle.dispose();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.advance_to(100).unwrap();
    assert_eq!(*runs.lock(), 3);
  }

  #[rxcore_macro::test]
  fn deep_recursion_on_current_thread_does_not_grow_the_stack() {
    let count = Arc::new(Mutex::new(0usize));
    let c_count = count.clone();
    CurrentThreadScheduler.schedule_recursive(0usize, move |n, recursion| {
      *c_count.lock() = n;
      if n < 100_000 {
        recursion.schedule(n + 1);
      }
    });
    assert_eq!(*count.lock(), 100_000);
  }

  #[rxcore_macro::test]
  fn periodic_runs_on_a_fixed_grid_until_disposed() {
    let scheduler = VirtualTimeScheduler::new();
    let ticks = Arc::new(Mutex::new(vec![]));
    let (c_ticks, c_scheduler) = (ticks.clone(), scheduler.clone());
    let handle = scheduler.schedule_periodic(
      0,
      Duration::from_millis(10),
      Duration::from_millis(20),
      move |n| {
        c_ticks.lock().push((n, c_scheduler.clock()));
        n + 1
      },
    );

    scheduler.advance_to(75).unwrap();
    assert_eq!(*ticks.lock(), vec![(0, 10), (1, 30), (2, 50), (3, 70)]);

    handle.dispose();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.advance_to(200).unwrap();
    assert_eq!(ticks.lock().len(), 4);
  }

  #[rxcore_macro::test]
  fn late_periodic_run_keeps_later_runs_on_schedule() {
    let scheduler = VirtualTimeScheduler::new();
    let ticks = Arc::new(Mutex::new(vec![]));
    let (c_ticks, c_scheduler) = (ticks.clone(), scheduler.clone());
    // the first run takes 15ms of virtual time
    let _handle = scheduler.schedule_periodic(
      true,
      Duration::ZERO,
      Duration::from_millis(20),
      move |slow| {
        c_ticks.lock().push(c_scheduler.clock());
        if slow {
          c_scheduler.sleep(15);
        }
        false
      },
    );

    scheduler.advance_to(60).unwrap();
    assert_eq!(*ticks.lock(), vec![0, 20, 40, 60]);
  }
}
