use std::{cell::RefCell, marker::PhantomData, sync::Arc};

use parking_lot::ReentrantMutex;

use crate::{
  atomic::AtomicInt,
  disposable::{Disposable, SingleAssignmentDisposable},
  event::Event,
  observable::{Observable, ObservableExt},
  observer::{BoxedObserver, IntoBoxedObserver, Observer},
};

const DISPOSED: i32 = 1;
const STOPPED: i32 = 2;

const REENTRANT_DELIVERY: &str =
  "re-entrant emission into a create observer (next/error/complete called from inside its own \
   callback). Hop through a scheduler if the observer must feed back into its source.";

/// Creates an observable from a subscribe function.
///
/// The function receives an [`AnyObserver`] it may keep, clone and move to
/// other threads, and returns the disposable that tears its work down. If it
/// returns `Err(e)` the observer gets `error(e)` and the subscription is
/// disposed.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use rxcore::prelude::*;
///
/// let seen = Arc::new(Mutex::new(vec![]));
/// let c_seen = seen.clone();
/// create(|observer: AnyObserver<i32, String>| {
///   observer.next(1);
///   observer.next(2);
///   observer.complete();
///   Ok(())
/// })
/// .subscribe_next(move |v| c_seen.lock().unwrap().push(v));
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub fn create<F, D, Item, Err>(subscribe: F) -> Create<F, Item, Err>
where
  F: FnOnce(AnyObserver<Item, Err>) -> Result<D, Err>,
  D: Disposable + Send + Sync + 'static,
{
  Create { subscribe, _marker: PhantomData }
}

/// Observable created from a function.
#[derive(Clone)]
pub struct Create<F, Item, Err> {
  subscribe: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

struct Sink<Item, Err> {
  state: AtomicInt,
  // re-entrant so a same-thread call from inside a callback is detected
  // instead of deadlocking
  observer: ReentrantMutex<RefCell<Option<BoxedObserver<Item, Err>>>>,
  resource: SingleAssignmentDisposable,
}

impl<Item, Err> Sink<Item, Err> {
  fn is_live(&self) -> bool { self.state.load() == 0 }

  fn next(&self, value: Item) {
    let guard = self.observer.lock();
    let released = {
      let Ok(mut observer) = guard.try_borrow_mut() else {
        panic!("{}", REENTRANT_DELIVERY);
      };
      if self.is_live() {
        if let Some(observer) = observer.as_mut() {
          observer.next(value);
        }
      }
      // a dispose issued from inside the callback left the observer to us
      if self.state.is_flag_set(DISPOSED) { observer.take() } else { None }
    };
    drop(guard);
    drop(released);
  }

  fn stop(&self) -> Option<BoxedObserver<Item, Err>> {
    if self.state.try_set_flag(STOPPED) && !self.state.is_flag_set(DISPOSED) {
      let guard = self.observer.lock();
      let Ok(mut observer) = guard.try_borrow_mut() else {
        panic!("{}", REENTRANT_DELIVERY);
      };
      observer.take()
    } else {
      None
    }
  }
}

/// A cloneable, thread-safe handle that forwards events to one subscriber.
///
/// Events after a terminal event or after the subscription was disposed are
/// dropped.
pub struct AnyObserver<Item, Err>(Arc<Sink<Item, Err>>);

impl<Item, Err> Clone for AnyObserver<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item, Err> AnyObserver<Item, Err> {
  /// # Panics
  ///
  /// When called on the thread that is currently inside this observer's own
  /// callback.
  pub fn next(&self, value: Item) {
    if self.0.is_live() {
      self.0.next(value);
    }
  }

  pub fn error(&self, err: Err) {
    if let Some(observer) = self.0.stop() {
      observer.error(err);
      self.0.resource.dispose();
    }
  }

  pub fn complete(&self) {
    if let Some(observer) = self.0.stop() {
      observer.complete();
      self.0.resource.dispose();
    }
  }

  pub fn on(&self, event: Event<Item, Err>) {
    match event {
      Event::Next(v) => self.next(v),
      Event::Error(e) => self.error(e),
      Event::Completed => self.complete(),
    }
  }

  pub fn is_closed(&self) -> bool { !self.0.is_live() }
}

/// Subscription returned by [`create`].
pub struct CreateSubscription<Item, Err>(Arc<Sink<Item, Err>>);

impl<Item, Err> Disposable for CreateSubscription<Item, Err> {
  fn dispose(&self) {
    if self.0.state.try_set_flag(DISPOSED) {
      // the observer may be mid-callback on this thread; drop it lazily then
      let observer = self.0.observer.try_lock().and_then(|guard| {
        let taken = guard
          .try_borrow_mut()
          .ok()
          .and_then(|mut observer| observer.take());
        taken
      });
      drop(observer);
      self.0.resource.dispose();
    }
  }

  fn is_disposed(&self) -> bool { !self.0.is_live() }
}

impl<F, D, Item, Err, O> Observable<Item, Err, O> for Create<F, Item, Err>
where
  F: FnOnce(AnyObserver<Item, Err>) -> Result<D, Err>,
  D: Disposable + Send + Sync + 'static,
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = CreateSubscription<Item, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let sink = Arc::new(Sink {
      state: AtomicInt::new(0),
      observer: ReentrantMutex::new(RefCell::new(Some(observer.into_boxed()))),
      resource: SingleAssignmentDisposable::new(),
    });
    let emitter = AnyObserver(sink.clone());
    match (self.subscribe)(emitter.clone()) {
      Ok(resource) => {
        // the only assignment, so it cannot be rejected
        sink.resource.set(resource).ok();
      }
      Err(err) => {
        emitter.error(err);
        sink.resource.dispose();
      }
    }
    CreateSubscription(sink)
  }
}

impl<F, Item, Err> ObservableExt<Item, Err> for Create<F, Item, Err> {}

#[cfg(test)]
mod tests {
  use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::mpsc,
    thread,
  };

  use parking_lot::Mutex;

  use super::*;
  use crate::{disposable::Disposables, observer::Callbacks};

  #[rxcore_macro::test]
  fn test_create_next_complete() {
    let emitted = Arc::new(Mutex::new(vec![]));
    let emitted_clone = emitted.clone();

    create(|emitter: AnyObserver<i32, String>| {
      emitter.next(1);
      emitter.next(2);
      emitter.complete();
      emitter.next(3);
      Ok(())
    })
    .subscribe_next(move |v| emitted_clone.lock().push(v));

    assert_eq!(*emitted.lock(), vec![1, 2]);
  }

  #[rxcore_macro::test]
  fn failing_producer_becomes_error_and_disposes() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());

    create(|emitter: AnyObserver<i32, &'static str>| {
      emitter.next(1);
      Err::<(), _>("oops")
    })
    .subscribe_callbacks(
      Callbacks::new()
        .on_error(move |e| l1.lock().push(e))
        .on_disposed(move || l2.lock().push("disposed")),
    );

    assert_eq!(*log.lock(), vec!["oops", "disposed"]);
  }

  #[rxcore_macro::test]
  fn test_create_teardown() {
    let unsubscribed = Arc::new(AtomicInt::default());
    let unsub_clone = unsubscribed.clone();

    let subscription = create(move |emitter: AnyObserver<i32, String>| {
      emitter.next(1);
      Ok(Disposables::create(move || {
        unsub_clone.add(1);
      }))
    })
    .subscribe_next(|_| {});

    assert_eq!(unsubscribed.load(), 0);
    subscription.dispose();
    subscription.dispose();
    assert_eq!(unsubscribed.load(), 1);
  }

  #[rxcore_macro::test]
  fn completion_releases_resource() {
    let released = Arc::new(AtomicInt::default());
    let c_released = released.clone();
    create(move |emitter: AnyObserver<(), String>| {
      emitter.complete();
      Ok(Disposables::create(move || {
        c_released.add(1);
      }))
    })
    .subscribe_next(|_| {});
    // the resource arrives after completion and is released on arrival
    assert_eq!(released.load(), 1);
  }

  #[rxcore_macro::test]
  fn events_after_dispose_are_dropped() {
    let (tx, rx) = mpsc::channel::<AnyObserver<i32, String>>();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    let subscription = create(move |emitter: AnyObserver<i32, String>| {
      tx.send(emitter).ok();
      Ok(())
    })
    .subscribe_next(move |v| c_seen.lock().push(v));

    let emitter = rx.recv().unwrap();
    let c_emitter = emitter.clone();
    thread::spawn(move || c_emitter.next(1)).join().unwrap();
    subscription.dispose();
    emitter.next(2);

    assert_eq!(*seen.lock(), vec![1]);
    assert!(emitter.is_closed());
  }

  #[rxcore_macro::test]
  fn dispose_from_inside_next() {
    let (tx, rx) = mpsc::channel::<AnyObserver<i32, String>>();
    let holder = SingleAssignmentDisposable::new();
    let c_holder = holder.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    let subscription = create(move |emitter: AnyObserver<i32, String>| {
      tx.send(emitter).ok();
      Ok(())
    })
    .subscribe_next(move |v| {
      c_seen.lock().push(v);
      c_holder.dispose();
    });
    holder.set(subscription).unwrap();

    let emitter = rx.recv().unwrap();
    emitter.next(1);
    emitter.next(2);
    assert_eq!(*seen.lock(), vec![1]);
    assert!(emitter.is_closed());
  }

  #[rxcore_macro::test]
  fn reentrant_next_panics_instead_of_deadlocking() {
    let (tx, rx) = mpsc::channel::<AnyObserver<i32, String>>();
    let slot = Arc::new(Mutex::new(None::<AnyObserver<i32, String>>));
    let c_slot = slot.clone();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();

    let _subscription = create(move |emitter: AnyObserver<i32, String>| {
      tx.send(emitter).ok();
      Ok(())
    })
    .subscribe_next(move |v| {
      c_seen.lock().push(v);
      let emitter = c_slot.lock().clone();
      if let Some(emitter) = emitter {
        emitter.next(v + 1);
      }
    });

    let emitter = rx.recv().unwrap();
    *slot.lock() = Some(emitter.clone());
    let result = catch_unwind(AssertUnwindSafe(|| emitter.next(1)));

    let payload = result.unwrap_err();
    let message = payload
      .downcast_ref::<String>()
      .cloned()
      .unwrap_or_default();
    assert!(message.contains("re-entrant emission"));
    assert_eq!(*seen.lock(), vec![1]);
  }
}
