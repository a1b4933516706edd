use super::{Duration, Instant, Scheduler, VirtualTimeConfig, VirtualTimeScheduler};
use crate::{
  disposable::{BoxedDisposable, Disposable},
  error::RxError,
};

/// Virtual time measured in wall-clock instants.
///
/// Works like [`VirtualTimeScheduler`] but the clock is an [`Instant`]:
/// replaying recorded events at their original timestamps, or driving code
/// that reads [`Scheduler::now`], needs no tick arithmetic. The clock starts
/// at the instant given on creation and never moves before it.
///
/// ```rust
/// use std::sync::Arc;
///
/// use parking_lot::Mutex;
/// use rxcore::prelude::*;
///
/// let t0 = Instant::now();
/// let scheduler = HistoricalScheduler::new(t0);
/// let fired = Arc::new(Mutex::new(vec![]));
/// let (c_fired, c_scheduler) = (fired.clone(), scheduler.clone());
/// scheduler.schedule_at(t0 + Duration::from_secs(5), move || {
///   c_fired.lock().push(c_scheduler.clock())
/// });
///
/// scheduler.advance_by(Duration::from_secs(10)).unwrap();
/// assert_eq!(*fired.lock(), vec![t0 + Duration::from_secs(5)]);
/// assert_eq!(scheduler.clock(), t0 + Duration::from_secs(10));
/// ```
#[derive(Clone)]
pub struct HistoricalScheduler(VirtualTimeScheduler);

impl HistoricalScheduler {
  /// Nanosecond resolution, so instants are kept exactly.
  pub fn new(initial: Instant) -> Self { Self::with_resolution(initial, Duration::from_nanos(1)) }

  /// Instants are rounded to the nearest multiple of `resolution` after
  /// `initial`.
  pub fn with_resolution(initial: Instant, resolution: Duration) -> Self {
    let config = VirtualTimeConfig { resolution, ..Default::default() };
    Self(VirtualTimeScheduler::with_epoch(config, initial))
  }

  /// The current virtual instant.
  pub fn clock(&self) -> Instant { self.0.now() }

  /// Number of entries waiting to run.
  pub fn pending_count(&self) -> usize { self.0.pending_count() }

  pub fn is_running(&self) -> bool { self.0.is_running() }

  /// Run `action` when the clock reaches `time`. Instants before the
  /// current clock run on the next drain.
  pub fn schedule_at<F, D>(&self, time: Instant, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    self.0.schedule_absolute_virtual(self.ticks_at(time), action)
  }

  /// Run every entry due at or before `time`, then move the clock there.
  pub fn advance_to(&self, time: Instant) -> Result<(), RxError> {
    self.0.advance_to(self.ticks_at(time))
  }

  pub fn advance_by(&self, by: Duration) -> Result<(), RxError> {
    self.0.advance_by(self.0.to_ticks(by))
  }

  /// Run entries until the queue is empty or [`stop`](Self::stop) is called.
  pub fn start(&self) -> Result<(), RxError> { self.0.start() }

  pub fn stop(&self) { self.0.stop() }

  /// Move the clock forward by `by` without running anything.
  pub fn sleep(&self, by: Duration) { self.0.sleep(self.0.to_ticks(by)) }

  fn ticks_at(&self, time: Instant) -> u64 {
    self
      .0
      .to_ticks(time.saturating_duration_since(self.0.epoch()))
  }
}

impl Scheduler for HistoricalScheduler {
  fn now(&self) -> Instant { self.0.now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    self.0.schedule_relative(due, action)
  }
}
