use std::{
  collections::BTreeMap,
  sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{cancellable, Duration, Instant, Scheduler};
use crate::{
  disposable::{BoxedDisposable, Disposable, Disposables, NaryDisposable},
  error::RxError,
};

type Job = Box<dyn FnOnce() + Send>;

/// Settings of a [`VirtualTimeScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualTimeConfig {
  /// Clock value at creation.
  pub initial_clock: u64,
  /// Real duration of one tick, used to convert `Duration`s to ticks and to
  /// report [`Scheduler::now`].
  pub resolution: Duration,
  /// `start` never runs entries due after this tick.
  pub horizon: u64,
  /// Work scheduled at or before the current clock runs one tick later, as
  /// if every action took a tick to process.
  pub simulate_processing_delay: bool,
}

impl Default for VirtualTimeConfig {
  fn default() -> Self {
    Self {
      initial_clock: 0,
      resolution: Duration::from_millis(1),
      horizon: u64::MAX,
      simulate_processing_delay: false,
    }
  }
}

struct State {
  clock: u64,
  running: bool,
  stop_requested: bool,
  next_seq: u64,
  queue: BTreeMap<(u64, u64), Job>,
}

struct Inner {
  config: VirtualTimeConfig,
  epoch: Instant,
  state: Mutex<State>,
}

/// A scheduler on a logical clock.
///
/// Nothing runs until the clock is driven with [`advance_to`],
/// [`advance_by`] or [`start`]. Entries run in `(due tick, scheduling order)`
/// order; entries scheduled while draining may run within the same drain.
/// The queue lock is never held while an action runs.
///
/// ```rust
/// use std::sync::Arc;
///
/// use parking_lot::Mutex;
/// use rxcore::prelude::*;
///
/// let scheduler = VirtualTimeScheduler::new();
/// let fired = Arc::new(Mutex::new(vec![]));
/// let (c_fired, c_scheduler) = (fired.clone(), scheduler.clone());
/// scheduler.schedule_relative_virtual(10, move || c_fired.lock().push(c_scheduler.clock()));
///
/// scheduler.advance_to(5).unwrap();
/// assert!(fired.lock().is_empty());
/// scheduler.advance_to(10).unwrap();
/// assert_eq!(*fired.lock(), vec![10]);
/// ```
///
/// [`advance_to`]: VirtualTimeScheduler::advance_to
/// [`advance_by`]: VirtualTimeScheduler::advance_by
/// [`start`]: VirtualTimeScheduler::start
#[derive(Clone)]
pub struct VirtualTimeScheduler(Arc<Inner>);

impl Default for VirtualTimeScheduler {
  fn default() -> Self { Self::new() }
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::with_config(VirtualTimeConfig::default()) }

  pub fn with_config(config: VirtualTimeConfig) -> Self { Self::with_epoch(config, Instant::now()) }

  /// A scheduler whose tick zero is `epoch`.
  pub(crate) fn with_epoch(config: VirtualTimeConfig, epoch: Instant) -> Self {
    Self(Arc::new(Inner {
      config,
      epoch,
      state: Mutex::new(State {
        clock: config.initial_clock,
        running: false,
        stop_requested: false,
        next_seq: 0,
        queue: BTreeMap::new(),
      }),
    }))
  }

  #[inline]
  pub fn config(&self) -> &VirtualTimeConfig { &self.0.config }

  /// The instant [`Scheduler::now`] reports at tick zero.
  #[inline]
  pub(crate) fn epoch(&self) -> Instant { self.0.epoch }

  /// The current tick.
  pub fn clock(&self) -> u64 { self.0.state.lock().clock }

  /// Number of entries waiting to run. Cancelled entries are not counted.
  pub fn pending_count(&self) -> usize { self.0.state.lock().queue.len() }

  pub fn is_running(&self) -> bool { self.0.state.lock().running }

  /// Convert `due` to ticks, rounding to the nearest tick.
  pub fn to_ticks(&self, due: Duration) -> u64 {
    let resolution = self.0.config.resolution.as_nanos().max(1);
    let ticks = (due.as_nanos() + resolution / 2) / resolution;
    u64::try_from(ticks).unwrap_or(u64::MAX)
  }

  /// Run `action` when the clock reaches `time`.
  pub fn schedule_absolute_virtual<F, D>(&self, time: u64, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    let (handle, run) = cancellable(action);
    let key = {
      let mut state = self.0.state.lock();
      let time = if self.0.config.simulate_processing_delay && time <= state.clock {
        state.clock.saturating_add(1)
      } else {
        time
      };
      let key = (time, state.next_seq);
      state.next_seq += 1;
      state.queue.insert(key, Box::new(run));
      key
    };

    let inner: Weak<Inner> = Arc::downgrade(&self.0);
    let unqueue = Disposables::create(move || {
      if let Some(inner) = inner.upgrade() {
        let removed = inner.state.lock().queue.remove(&key);
        drop(removed);
      }
    });
    Box::new(NaryDisposable::pair(handle, unqueue))
  }

  /// Run `action` `ticks` after the current clock.
  pub fn schedule_relative_virtual<F, D>(&self, ticks: u64, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    let time = self.clock().saturating_add(ticks);
    self.schedule_absolute_virtual(time, action)
  }

  /// Run every entry due at or before `time`, then move the clock to `time`.
  ///
  /// The clock never moves backwards. Returns
  /// [`RxError::SchedulerRunning`] without doing anything when called from an
  /// action this scheduler is running.
  pub fn advance_to(&self, time: u64) -> Result<(), RxError> { self.drain(time, true) }

  /// [`advance_to`](Self::advance_to) `ticks` after the current clock.
  pub fn advance_by(&self, ticks: u64) -> Result<(), RxError> {
    self.advance_to(self.clock().saturating_add(ticks))
  }

  /// Run entries until the queue is empty, [`stop`](Self::stop) is called, or
  /// the next entry lies past the configured horizon. The clock stays at the
  /// last entry that ran.
  pub fn start(&self) -> Result<(), RxError> { self.drain(self.0.config.horizon, false) }

  /// Make the running drain return after the current action.
  pub fn stop(&self) { self.0.state.lock().stop_requested = true; }

  /// Move the clock forward by `ticks` without running anything.
  pub fn sleep(&self, ticks: u64) {
    let mut state = self.0.state.lock();
    state.clock = state.clock.saturating_add(ticks);
  }

  fn drain(&self, limit: u64, settle_at_limit: bool) -> Result<(), RxError> {
    {
      let mut state = self.0.state.lock();
      if state.running {
        drop(state);
        warn!(limit, "virtual time scheduler is already running, ignoring drain request");
        return Err(RxError::SchedulerRunning);
      }
      state.running = true;
      state.stop_requested = false;
      debug!(
        clock = state.clock,
        pending = state.queue.len(),
        limit,
        "virtual time drain started"
      );
    }
    let _running = RunningGuard(&self.0);

    let mut fired = 0usize;
    loop {
      let job = {
        let mut state = self.0.state.lock();
        if state.stop_requested {
          break;
        }
        match state.queue.first_key_value() {
          Some((&(due, _), _)) if due <= limit => {}
          _ => break,
        }
        let Some(((due, _), job)) = state.queue.pop_first() else {
          break;
        };
        state.clock = state.clock.max(due);
        job
      };
      job();
      fired += 1;
    }

    let mut state = self.0.state.lock();
    if settle_at_limit && !state.stop_requested {
      state.clock = state.clock.max(limit);
    }
    debug!(
      clock = state.clock,
      fired,
      pending = state.queue.len(),
      "virtual time drain finished"
    );
    Ok(())
  }
}

/// Clears the running mark when a drain ends, also while unwinding.
struct RunningGuard<'a>(&'a Inner);

impl Drop for RunningGuard<'_> {
  fn drop(&mut self) { self.0.state.lock().running = false; }
}

impl Scheduler for VirtualTimeScheduler {
  /// The epoch captured at creation plus the clock in real time units.
  fn now(&self) -> Instant {
    let nanos = self
      .0
      .config
      .resolution
      .as_nanos()
      .saturating_mul(u128::from(self.clock()));
    let offset = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
    self.0.epoch.checked_add(offset).unwrap_or(self.0.epoch)
  }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    self.schedule_relative_virtual(self.to_ticks(due), action)
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;

  fn record_clock(
    scheduler: &VirtualTimeScheduler, log: &Arc<Mutex<Vec<u64>>>,
  ) -> impl FnOnce() + Send + 'static {
    let (scheduler, log) = (scheduler.clone(), log.clone());
    move || log.lock().push(scheduler.clock())
  }

  #[rxcore_macro::test(virtual_time)]
  fn follow_ups_scheduled_while_draining() {
    let scheduler = VirtualTimeScheduler::new();
    let fired = Arc::new(Mutex::new(vec![]));

    let (c_scheduler, c_fired) = (scheduler.clone(), fired.clone());
    scheduler.schedule_relative(Duration::from_millis(10), move || {
      c_fired.lock().push(c_scheduler.clock());
      let later = record_clock(&c_scheduler, &c_fired);
      c_scheduler.schedule_relative(Duration::from_millis(20), later);
      c_scheduler.schedule(record_clock(&c_scheduler, &c_fired));
    });

    scheduler.start().unwrap();
    assert_eq!(*fired.lock(), vec![10, 10, 30]);
    assert_eq!(scheduler.clock(), 30);
  }

  #[rxcore_macro::test]
  fn same_tick_runs_in_schedule_order() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    for i in 0..5 {
      let log = log.clone();
      scheduler.schedule_absolute_virtual(7, move || log.lock().push(i));
    }
    scheduler.advance_to(7).unwrap();
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
  }

  #[rxcore_macro::test]
  fn advance_moves_clock_even_without_work() {
    let scheduler = VirtualTimeScheduler::new();
    scheduler.advance_to(40).unwrap();
    assert_eq!(scheduler.clock(), 40);
    scheduler.advance_by(2).unwrap();
    assert_eq!(scheduler.clock(), 42);
    scheduler.advance_to(10).unwrap();
    assert_eq!(scheduler.clock(), 42);
  }

  #[rxcore_macro::test]
  fn cancel_removes_the_entry() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let handle = scheduler.schedule_absolute_virtual(5, record_clock(&scheduler, &log));
    scheduler.schedule_absolute_virtual(6, record_clock(&scheduler, &log));
    assert_eq!(scheduler.pending_count(), 2);

    handle.dispose();
    assert_eq!(scheduler.pending_count(), 1);
    scheduler.start().unwrap();
    assert_eq!(*log.lock(), vec![6]);
  }

  #[rxcore_macro::test]
  fn nested_drain_is_rejected() {
    let scheduler = VirtualTimeScheduler::new();
    let result = Arc::new(Mutex::new(None));
    let (c_scheduler, c_result) = (scheduler.clone(), result.clone());
    scheduler.schedule_absolute_virtual(1, move || {
      *c_result.lock() = Some(c_scheduler.advance_to(100));
    });

    scheduler.start().unwrap();
    assert_eq!(*result.lock(), Some(Err(RxError::SchedulerRunning)));
    assert_eq!(scheduler.clock(), 1);
    assert!(!scheduler.is_running());
  }

  #[rxcore_macro::test]
  fn stop_ends_the_drain() {
    let scheduler = VirtualTimeScheduler::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_scheduler = scheduler.clone();
    scheduler.schedule_absolute_virtual(1, move || c_scheduler.stop());
    scheduler.schedule_absolute_virtual(2, record_clock(&scheduler, &log));

    scheduler.start().unwrap();
    assert!(log.lock().is_empty());
    assert_eq!(scheduler.clock(), 1);
    scheduler.start().unwrap();
    assert_eq!(*log.lock(), vec![2]);
  }

  #[rxcore_macro::test]
  fn horizon_bounds_start() {
    let scheduler =
      VirtualTimeScheduler::with_config(VirtualTimeConfig { horizon: 50, ..Default::default() });
    let log = Arc::new(Mutex::new(vec![]));
    scheduler.schedule_absolute_virtual(50, record_clock(&scheduler, &log));
    scheduler.schedule_absolute_virtual(51, record_clock(&scheduler, &log));
    scheduler.start().unwrap();
    assert_eq!(*log.lock(), vec![50]);
    assert_eq!(scheduler.pending_count(), 1);
  }

  #[rxcore_macro::test]
  fn processing_delay_pushes_past_work_forward() {
    let scheduler = VirtualTimeScheduler::with_config(VirtualTimeConfig {
      initial_clock: 100,
      simulate_processing_delay: true,
      ..Default::default()
    });
    let log = Arc::new(Mutex::new(vec![]));
    scheduler.schedule_absolute_virtual(50, record_clock(&scheduler, &log));
    scheduler.schedule(record_clock(&scheduler, &log));
    scheduler.start().unwrap();
    assert_eq!(*log.lock(), vec![101, 101]);
  }

  #[rxcore_macro::test]
  fn sleep_and_time_conversion() {
    let scheduler = VirtualTimeScheduler::new();
    let before = scheduler.now();
    scheduler.sleep(15);
    assert_eq!(scheduler.clock(), 15);
    assert_eq!(scheduler.now() - before, Duration::from_millis(15));
    assert_eq!(scheduler.to_ticks(Duration::from_micros(2_600)), 3);
    assert_eq!(scheduler.to_ticks(Duration::from_micros(2_400)), 2);
  }
}
