//! Deterministic test tooling on virtual time.
//!
//! A [`TestScheduler`] drives a [`VirtualTimeScheduler`] with simulated
//! processing delay and builds fixtures on its clock:
//!
//! - [`HotObservable`]: emits its messages at absolute ticks, whoever is
//!   subscribed at that moment receives them.
//! - [`ColdObservable`]: emits its messages relative to each subscribe.
//! - [`TestableObserver`]: records every event with the tick it arrived at.
//!
//! Both fixtures log each subscription's `[subscribe, unsubscribe]` window.
//!
//! # Usage
//!
//! ```rust
//! use rxcore::{
//!   prelude::*,
//!   scheduler::test_scheduler::{completed, next, SubscriptionLog},
//! };
//!
//! let scheduler = TestScheduler::new();
//! let xs = scheduler.create_cold_observable(vec![
//!   next::<_, String>(10, 'a'),
//!   next(20, 'b'),
//!   completed(30),
//! ]);
//!
//! let c_xs = xs.clone();
//! let observer = scheduler.start(move || c_xs);
//! assert_eq!(
//!   observer.events(),
//!   vec![next(210, 'a'), next(220, 'b'), completed(230)]
//! );
//! assert_eq!(xs.subscriptions(), vec![SubscriptionLog::new(200, 1000)]);
//! ```

use std::{ops::Deref, sync::Arc};

use parking_lot::Mutex;

use super::{Duration, Instant, Scheduler, VirtualTimeConfig, VirtualTimeScheduler};
use crate::{
  disposable::{
    ActionDisposable, BoxedDisposable, CompositeDisposable, Disposable, Disposables,
    SingleAssignmentDisposable,
  },
  error::RxError,
  event::Event,
  observable::{Observable, ObservableExt},
  observer::{IntoBoxedObserver, Observer},
  subject::subscribers::{broadcast, ObserverSlot, Subscribers},
};

/// Default tick at which [`TestScheduler::start`] creates the source.
pub const CREATED: u64 = 100;
/// Default tick at which [`TestScheduler::start`] subscribes.
pub const SUBSCRIBED: u64 = 200;
/// Default tick at which [`TestScheduler::start`] disposes the subscription.
pub const DISPOSED: u64 = 1000;

/// A value stamped with the tick it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recorded<T> {
  pub time: u64,
  pub value: T,
}

pub fn next<Item, Err>(time: u64, value: Item) -> Recorded<Event<Item, Err>> {
  Recorded { time, value: Event::Next(value) }
}

pub fn error<Item, Err>(time: u64, err: Err) -> Recorded<Event<Item, Err>> {
  Recorded { time, value: Event::Error(err) }
}

pub fn completed<Item, Err>(time: u64) -> Recorded<Event<Item, Err>> {
  Recorded { time, value: Event::Completed }
}

/// The window during which one subscription to a fixture was open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionLog {
  pub subscribe: u64,
  /// [`SubscriptionLog::OPEN`] while still subscribed.
  pub unsubscribe: u64,
}

impl SubscriptionLog {
  pub const OPEN: u64 = u64::MAX;

  pub fn new(subscribe: u64, unsubscribe: u64) -> Self { Self { subscribe, unsubscribe } }

  pub fn open(subscribe: u64) -> Self { Self::new(subscribe, Self::OPEN) }

  #[inline]
  pub fn is_open(&self) -> bool { self.unsubscribe == Self::OPEN }
}

#[derive(Clone, Default)]
struct SubscriptionLogs(Arc<Mutex<Vec<SubscriptionLog>>>);

impl SubscriptionLogs {
  fn open(&self, at: u64) -> usize {
    let mut logs = self.0.lock();
    logs.push(SubscriptionLog::open(at));
    logs.len() - 1
  }

  fn close(&self, index: usize, at: u64) {
    if let Some(log) = self.0.lock().get_mut(index) {
      log.unsubscribe = at;
    }
  }

  fn snapshot(&self) -> Vec<SubscriptionLog> { self.0.lock().clone() }
}

/// Virtual time scheduler with simulated processing delay and fixture
/// builders. Dereferences to the underlying [`VirtualTimeScheduler`].
#[derive(Clone)]
pub struct TestScheduler(VirtualTimeScheduler);

impl Default for TestScheduler {
  fn default() -> Self { Self::new() }
}

impl Deref for TestScheduler {
  type Target = VirtualTimeScheduler;

  fn deref(&self) -> &Self::Target { &self.0 }
}

impl TestScheduler {
  pub fn new() -> Self {
    Self(VirtualTimeScheduler::with_config(VirtualTimeConfig {
      simulate_processing_delay: true,
      ..VirtualTimeConfig::default()
    }))
  }

  /// Run every pending entry.
  pub fn flush(&self) -> Result<(), RxError> { self.0.start() }

  /// Run `action` at tick `time`.
  pub fn schedule_at<F, D>(&self, time: u64, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    self.0.schedule_absolute_virtual(time, action)
  }

  pub fn create_observer<Item, Err>(&self) -> TestableObserver<Item, Err> {
    TestableObserver { scheduler: self.0.clone(), events: Arc::new(Mutex::new(vec![])) }
  }

  pub fn create_hot_observable<Item, Err>(
    &self, messages: Vec<Recorded<Event<Item, Err>>>,
  ) -> HotObservable<Item, Err>
  where
    Item: Clone + Send + 'static,
    Err: Clone + Send + 'static,
  {
    HotObservable::new(self.0.clone(), messages)
  }

  pub fn create_cold_observable<Item, Err>(
    &self, messages: Vec<Recorded<Event<Item, Err>>>,
  ) -> ColdObservable<Item, Err> {
    ColdObservable { scheduler: self.0.clone(), messages, subscriptions: <_>::default() }
  }

  /// Create the source with `factory` at tick `created`, subscribe a fresh
  /// [`TestableObserver`] at `subscribed`, dispose that subscription at
  /// `disposed`, and run the scheduler until nothing is pending.
  ///
  /// Called from inside one of this scheduler's own actions, the fixtures are
  /// queued but nothing runs.
  pub fn start_with<Item, Err, S, F>(
    &self, created: u64, subscribed: u64, disposed: u64, factory: F,
  ) -> TestableObserver<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
    F: FnOnce() -> S + Send + 'static,
    S: Observable<Item, Err, TestableObserver<Item, Err>> + Send + 'static,
    S::Unsub: Send + Sync + 'static,
  {
    let observer = self.create_observer();
    let source = Arc::new(Mutex::new(None));
    let subscription = SingleAssignmentDisposable::new();

    let c_source = source.clone();
    self.schedule_at(created, move || {
      *c_source.lock() = Some(factory());
    });

    let (c_observer, c_subscription) = (observer.clone(), subscription.clone());
    self.schedule_at(subscribed, move || {
      let source = source.lock().take();
      if let Some(source) = source {
        c_subscription
          .set(source.actual_subscribe(c_observer))
          .ok();
      }
    });

    self.schedule_at(disposed, move || subscription.dispose());

    self.flush().ok();
    observer
  }

  /// [`start_with`](Self::start_with) at the default ticks
  /// ([`CREATED`], [`SUBSCRIBED`], [`DISPOSED`]).
  pub fn start<Item, Err, S, F>(&self, factory: F) -> TestableObserver<Item, Err>
  where
    Item: Send + 'static,
    Err: Send + 'static,
    F: FnOnce() -> S + Send + 'static,
    S: Observable<Item, Err, TestableObserver<Item, Err>> + Send + 'static,
    S::Unsub: Send + Sync + 'static,
  {
    self.start_with(CREATED, SUBSCRIBED, DISPOSED, factory)
  }
}

impl Scheduler for TestScheduler {
  #[inline]
  fn now(&self) -> Instant { self.0.now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    self.0.schedule_relative(due, action)
  }
}

/// Observer recording each event with the tick it arrived at.
pub struct TestableObserver<Item, Err> {
  scheduler: VirtualTimeScheduler,
  events: Arc<Mutex<Vec<Recorded<Event<Item, Err>>>>>,
}

impl<Item, Err> Clone for TestableObserver<Item, Err> {
  fn clone(&self) -> Self {
    Self { scheduler: self.scheduler.clone(), events: self.events.clone() }
  }
}

impl<Item, Err> TestableObserver<Item, Err> {
  fn record(&self, value: Event<Item, Err>) {
    let time = self.scheduler.clock();
    self.events.lock().push(Recorded { time, value });
  }
}

impl<Item: Clone, Err: Clone> TestableObserver<Item, Err> {
  pub fn events(&self) -> Vec<Recorded<Event<Item, Err>>> { self.events.lock().clone() }

  /// The received values, without timing.
  pub fn values(&self) -> Vec<Item> {
    self
      .events
      .lock()
      .iter()
      .filter_map(|recorded| recorded.value.element().cloned())
      .collect()
  }
}

impl<Item, Err> Observer<Item, Err> for TestableObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.record(Event::Next(value)) }

  fn error(self, err: Err) { self.record(Event::Error(err)) }

  fn complete(self) { self.record(Event::Completed) }

  fn is_closed(&self) -> bool { false }
}

/// Emits its messages at their absolute ticks to whoever is subscribed then.
pub struct HotObservable<Item, Err>(Arc<HotInner<Item, Err>>);

struct HotInner<Item, Err> {
  scheduler: VirtualTimeScheduler,
  observers: Mutex<Subscribers<Item, Err>>,
  subscriptions: SubscriptionLogs,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item, Err> HotObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn new(scheduler: VirtualTimeScheduler, messages: Vec<Recorded<Event<Item, Err>>>) -> Self {
    let inner = Arc::new(HotInner {
      scheduler: scheduler.clone(),
      observers: Mutex::new(Subscribers::default()),
      subscriptions: SubscriptionLogs::default(),
    });
    for Recorded { time, value } in messages {
      let inner = inner.clone();
      scheduler.schedule_absolute_virtual(time, move || {
        let targets = inner.observers.lock().snapshot();
        broadcast(&targets, value);
      });
    }
    Self(inner)
  }
}

impl<Item, Err> HotObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.0.subscriptions.snapshot() }
}

impl<Item, Err, O> Observable<Item, Err, O> for HotObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = ActionDisposable;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let inner = self.0;
    let index = inner.subscriptions.open(inner.scheduler.clock());
    let slot = Arc::new(ObserverSlot::new(observer.into_boxed()));
    let key = inner.observers.lock().add(slot.clone());

    Disposables::create(move || {
      slot.dispose();
      let removed = inner.observers.lock().remove(key);
      drop(removed);
      inner
        .subscriptions
        .close(index, inner.scheduler.clock());
    })
  }
}

impl<Item, Err> ObservableExt<Item, Err> for HotObservable<Item, Err> {}

/// Emits its messages relative to each subscribe.
pub struct ColdObservable<Item, Err> {
  scheduler: VirtualTimeScheduler,
  messages: Vec<Recorded<Event<Item, Err>>>,
  subscriptions: SubscriptionLogs,
}

impl<Item: Clone, Err: Clone> Clone for ColdObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self {
      scheduler: self.scheduler.clone(),
      messages: self.messages.clone(),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<Item, Err> ColdObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionLog> { self.subscriptions.snapshot() }
}

impl<Item, Err, O> Observable<Item, Err, O> for ColdObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = CompositeDisposable;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let Self { scheduler, messages, subscriptions } = self;
    let index = subscriptions.open(scheduler.clock());
    let slot = Arc::new(ObserverSlot::new(observer.into_boxed()));

    let scheduled: CompositeDisposable = messages
      .into_iter()
      .map(|Recorded { time, value }| {
        let slot = slot.clone();
        scheduler.schedule_relative_virtual(time, move || slot.on(value))
      })
      .collect();
    scheduled.insert(Disposables::create(move || {
      slot.dispose();
      subscriptions.close(index, scheduler.clock());
    }));
    scheduled
  }
}

impl<Item, Err> ObservableExt<Item, Err> for ColdObservable<Item, Err> {}
