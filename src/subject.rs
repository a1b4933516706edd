//! Subjects: hot observables that are also observers.
//!
//! Every flavor shares one core and differs only in what a late subscriber
//! receives:
//!
//! | Subject | While active | After termination |
//! |---|---|---|
//! | [`PublishSubject`] | nothing retroactive | the terminal event |
//! | [`BehaviorSubject`] | the current value | the terminal event |
//! | [`ReplaySubject`] | the buffered values | buffered values, then the terminal event |
//! | [`AsyncSubject`] | nothing | completed: last value then `Completed`; error: the error |
//!
//! [`PublishRelay`], [`BehaviorRelay`] and [`ReplayRelay`] wrap the matching
//! subject for sequences that never terminate.
//!
//! Disposing a subject drops its observers without a terminal event; it
//! ignores events afterwards and refuses new subscribers.
//!
//! # Re-Entrancy Policy
//!
//! - **Emissions are not re-entrant**. Calling `on_next`/`on_error`/
//!   `on_completed` on a subject from within one of its own callbacks panics.
//! - **Subscription mutations are allowed** inside callbacks. A subscriber
//!   added during a fan-out does not receive the in-progress event; a
//!   subscription disposed during a fan-out receives nothing further, even
//!   for the in-progress event.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use rxcore::prelude::*;
//!
//! let subject = PublishSubject::<i32, String>::new();
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! let subscription = subject
//!   .clone()
//!   .subscribe_next(move |v| c_seen.lock().unwrap().push(v));
//!
//! subject.on_next(1);
//! subscription.dispose();
//! subject.on_next(2);
//! assert_eq!(*seen.lock().unwrap(), vec![1]);
//! ```

mod async_subject;
mod behavior_subject;
mod publish_subject;
mod relay;
mod replay_subject;
mod subject_core;
mod subject_subscription;
pub(crate) mod subscribers;

pub use async_subject::AsyncSubject;
pub use behavior_subject::BehaviorSubject;
pub use publish_subject::PublishSubject;
pub use relay::{BehaviorRelay, PublishRelay, ReplayRelay};
pub use replay_subject::ReplaySubject;
pub use subject_subscription::SubjectSubscription;

/// Implements the surface every subject flavor shares: cloning, the producer
/// methods, `Observer` and `Observable`.
macro_rules! impl_subject {
  ($name:ident) => {
    impl<Item, Err> Clone for $name<Item, Err> {
      fn clone(&self) -> Self { Self(self.0.clone()) }
    }

    impl<Item, Err> $name<Item, Err> {
      /// Whether any subscription is still live.
      pub fn has_observers(&self) -> bool { self.0.has_observers() }

      /// Number of live subscriptions.
      pub fn observer_count(&self) -> usize { self.0.observer_count() }

      /// Whether a terminal event was received.
      pub fn is_stopped(&self) -> bool { self.0.is_stopped() }
    }

    impl<Item, Err> $crate::disposable::Disposable for $name<Item, Err> {
      /// Drop every observer without a terminal event. Later events are
      /// ignored and later subscriptions fail with
      /// [`RxError::Disposed`](crate::error::RxError::Disposed).
      fn dispose(&self) { self.0.dispose() }

      #[inline]
      fn is_disposed(&self) -> bool { self.0.is_disposed() }
    }

    impl<Item, Err> $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
    {
      /// Subscribe `observer`, or report that the subject was disposed.
      pub fn try_subscribe<O>(
        &self, observer: O,
      ) -> Result<$crate::subject::SubjectSubscription<Item, Err>, $crate::error::RxError>
      where
        O: $crate::observer::Observer<Item, Err> + Send + 'static,
      {
        self
          .0
          .subscribe($crate::observer::IntoBoxedObserver::into_boxed(observer))
      }
    }

    impl<Item: Clone, Err: Clone> $name<Item, Err> {
      /// Deliver `event` to every current observer, synchronously.
      ///
      /// Events after the first terminal event are ignored.
      ///
      /// # Panics
      ///
      /// When called from inside one of this subject's own callbacks.
      pub fn on(&self, event: $crate::event::Event<Item, Err>) { self.0.emit(event) }

      pub fn on_next(&self, value: Item) { self.on($crate::event::Event::Next(value)) }

      pub fn on_error(&self, err: Err) { self.on($crate::event::Event::Error(err)) }

      pub fn on_completed(&self) { self.on($crate::event::Event::Completed) }
    }

    impl<Item: Clone, Err: Clone> $crate::observer::Observer<Item, Err> for $name<Item, Err> {
      #[inline]
      fn next(&mut self, value: Item) { self.on_next(value) }

      #[inline]
      fn error(self, err: Err) { self.on_error(err) }

      #[inline]
      fn complete(self) { self.on_completed() }

      #[inline]
      fn is_closed(&self) -> bool {
        self.is_stopped() || $crate::disposable::Disposable::is_disposed(self)
      }
    }

    impl<Item, Err, O> $crate::observable::Observable<Item, Err, O> for $name<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
      O: $crate::observer::Observer<Item, Err> + Send + 'static,
    {
      type Unsub = $crate::subject::SubjectSubscription<Item, Err>;

      /// Subscribing to a disposed subject drops `observer` and returns an
      /// already disposed handle.
      fn actual_subscribe(self, observer: O) -> Self::Unsub {
        self.try_subscribe(observer).unwrap_or_else(|err| {
          tracing::warn!(%err, "subscribed to a disposed subject");
          $crate::subject::SubjectSubscription::disposed()
        })
      }
    }

    impl<Item, Err> $crate::observable::ObservableExt<Item, Err> for $name<Item, Err> {}
  };
}

pub(crate) use impl_subject;

#[cfg(test)]
mod tests {
  use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
    thread,
  };

  use parking_lot::Mutex;

  use crate::prelude::*;

  type Log = Arc<Mutex<Vec<String>>>;

  fn recorder(log: &Log, name: &'static str) -> Callbacks<i32, String> {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    Callbacks::new()
      .on_next(move |v| l1.lock().push(format!("{} {}", name, v)))
      .on_error(move |e| l2.lock().push(format!("{} error {}", name, e)))
      .on_completed(move || l3.lock().push(format!("{} completed", name)))
  }

  #[rxcore_macro::test]
  fn fan_out_reaches_every_observer_in_order() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();
    subject.clone().subscribe_callbacks(recorder(&log, "a"));
    subject.clone().subscribe_callbacks(recorder(&log, "b"));
    assert_eq!(subject.observer_count(), 2);

    subject.on_next(1);
    subject.on_completed();
    subject.on_next(2);

    assert_eq!(*log.lock(), vec!["a 1", "b 1", "a completed", "b completed"]);
    assert!(subject.is_stopped());
    assert!(!subject.has_observers());
  }

  #[rxcore_macro::test]
  fn dispose_during_fan_out_skips_the_disposed_observer() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();
    let second = Arc::new(Mutex::new(None::<NaryDisposable>));

    let c_second = second.clone();
    let c_log = log.clone();
    subject.clone().subscribe_next(move |v| {
      c_log.lock().push(format!("first {}", v));
      if let Some(s) = c_second.lock().as_ref() {
        s.dispose();
      }
    });
    let handle = subject.clone().subscribe_callbacks(recorder(&log, "second"));
    *second.lock() = Some(handle);

    subject.on_next(1);
    subject.on_next(2);
    assert_eq!(*log.lock(), vec!["first 1", "first 2"]);
    assert_eq!(subject.observer_count(), 1);
  }

  #[rxcore_macro::test]
  fn self_dispose_inside_next() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();
    let own = Arc::new(Mutex::new(None::<NaryDisposable>));

    let c_own = own.clone();
    let c_log = log.clone();
    let handle = subject.clone().subscribe_next(move |v| {
      c_log.lock().push(v.to_string());
      if let Some(s) = c_own.lock().as_ref() {
        s.dispose();
      }
    });
    *own.lock() = Some(handle);

    subject.on_next(1);
    subject.on_next(2);
    assert_eq!(*log.lock(), vec!["1"]);
    assert!(!subject.has_observers());
  }

  #[rxcore_macro::test]
  fn subscribe_inside_callback_misses_current_event() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();

    let c_subject = subject.clone();
    let c_log = log.clone();
    let subscribed = Arc::new(Mutex::new(false));
    subject.clone().subscribe_next(move |v| {
      c_log.lock().push(format!("outer {}", v));
      let mut subscribed = subscribed.lock();
      if !*subscribed {
        *subscribed = true;
        let inner_log = c_log.clone();
        c_subject
          .clone()
          .subscribe_next(move |v| inner_log.lock().push(format!("inner {}", v)));
      }
    });

    subject.on_next(1);
    subject.on_next(2);
    assert_eq!(*log.lock(), vec!["outer 1", "outer 2", "inner 2"]);
  }

  #[rxcore_macro::test]
  fn reentrant_next_panics() {
    let subject = PublishSubject::<i32, String>::new();
    let c_subject = subject.clone();
    subject.clone().subscribe_next(move |v| {
      if v == 1 {
        c_subject.on_next(2);
      }
    });

    let result = catch_unwind(AssertUnwindSafe(|| subject.on_next(1)));
    assert!(result.is_err());

    // the subject is usable again once the panic unwound
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    subject.clone().subscribe_next(move |v| c_seen.lock().push(v));
    subject.on_next(5);
    assert_eq!(*seen.lock(), vec![5]);
  }

  #[rxcore_macro::test]
  fn reentrant_complete_panics() {
    let subject = PublishSubject::<i32, String>::new();
    let c_subject = subject.clone();
    subject.clone().subscribe_next(move |_| c_subject.on_completed());

    let result = catch_unwind(AssertUnwindSafe(|| subject.on_next(1)));
    assert!(result.is_err());
    assert!(!subject.is_stopped());
  }

  #[rxcore_macro::test]
  fn concurrent_producers_never_interleave() {
    let subject = PublishSubject::<usize, String>::new();
    let in_flight = Arc::new(crate::atomic::AtomicInt::default());
    let overlaps = Arc::new(crate::atomic::AtomicInt::default());
    let count = Arc::new(crate::atomic::AtomicInt::default());

    let (c_in_flight, c_overlaps, c_count) = (in_flight.clone(), overlaps.clone(), count.clone());
    subject.clone().subscribe_next(move |_| {
      if c_in_flight.add(1) != 0 {
        c_overlaps.add(1);
      }
      c_count.add(1);
      c_in_flight.sub(1);
    });

    let handles: Vec<_> = (0..4)
      .map(|_| {
        let subject = subject.clone();
        thread::spawn(move || {
          for i in 0..250 {
            subject.on_next(i);
          }
        })
      })
      .collect();
    handles
      .into_iter()
      .for_each(|h| h.join().unwrap());

    assert_eq!(count.load(), 1000);
    assert_eq!(overlaps.load(), 0);
  }

  #[rxcore_macro::test]
  fn dispose_from_other_thread_cuts_off_in_progress_event() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();
    let victim = Arc::new(Mutex::new(None::<Arc<NaryDisposable>>));

    // subscribed first, so it runs before the victim in every fan-out and
    // disposes it from another thread while the emitting thread holds the lock
    let c_victim = victim.clone();
    subject.clone().subscribe_next(move |_| {
      let handle = c_victim.lock().clone();
      if let Some(handle) = handle {
        thread::spawn(move || handle.dispose())
          .join()
          .unwrap();
      }
    });
    let handle = subject.clone().subscribe_callbacks(recorder(&log, "victim"));
    *victim.lock() = Some(Arc::new(handle));

    subject.on_next(1);
    assert!(log.lock().is_empty());
    assert_eq!(subject.observer_count(), 1);
    subject.on_next(2);
    assert!(log.lock().is_empty());
  }

  #[rxcore_macro::test]
  fn dispose_from_other_thread_during_fan_out_releases_observer() {
    let subject = PublishSubject::<i32, String>::new();
    let marker = Arc::new(());
    let victim = Arc::new(Mutex::new(None::<NaryDisposable>));

    let c_victim = victim.clone();
    subject.clone().subscribe_next(move |_| {
      let handle = c_victim.lock().take();
      if let Some(handle) = handle {
        thread::spawn(move || handle.dispose())
          .join()
          .unwrap();
      }
    });
    let c_marker = marker.clone();
    let handle = subject.clone().subscribe_next(move |_| {
      let _keep = &c_marker;
    });
    *victim.lock() = Some(handle);

    subject.on_next(1);
    // nothing is emitted afterwards, the subject must not wait for that
    assert_eq!(Arc::strong_count(&marker), 1);
    assert_eq!(subject.observer_count(), 1);
  }

  #[rxcore_macro::test]
  fn disposing_the_subject_inside_a_callback_stops_the_fan_out_state() {
    let subject = PublishSubject::<i32, String>::new();
    let log = Log::default();
    let c_subject = subject.clone();
    subject.clone().subscribe_next(move |_| c_subject.dispose());
    subject.clone().subscribe_callbacks(recorder(&log, "b"));

    subject.on_next(1);
    subject.on_next(2);
    assert!(subject.is_disposed());
    assert!(!subject.has_observers());
    assert_eq!(*log.lock(), Vec::<String>::new());
  }
}
