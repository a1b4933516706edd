//! Producers of sequences.
//!
//! An [`Observable`] is consumed by subscribing an [`Observer`] to it; the
//! returned disposable ends the subscription. [`ObservableExt`] adds the
//! closure-based subscribe conveniences.
use std::{fmt::Debug, sync::Arc};

use crate::{
  disposable::{ActionDisposable, Disposable, NaryDisposable},
  observer::{CallbackObserver, Callbacks, Observer},
};

mod create;
mod trivial;

pub use create::*;
pub use trivial::*;

/// A representation of any set of values over any amount of time.
///
/// The observer type is a trait parameter so every source can stay generic
/// over its consumer without boxing.
pub trait Observable<Item, Err, O>: Sized
where
  O: Observer<Item, Err>,
{
  type Unsub: Disposable;

  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

pub trait ObservableExt<Item, Err>: Sized {
  /// Subscribe a full observer.
  fn subscribe<O>(self, observer: O) -> <Self as Observable<Item, Err, O>>::Unsub
  where
    O: Observer<Item, Err>,
    Self: Observable<Item, Err, O>,
  {
    self.actual_subscribe(observer)
  }

  /// Subscribe per-event closures.
  ///
  /// The returned handle disposes the upstream subscription and fires the
  /// `disposed` callback at most once.
  fn subscribe_callbacks(self, callbacks: Callbacks<Item, Err>) -> NaryDisposable
  where
    Err: Debug,
    Self: Observable<Item, Err, CallbackObserver<Item, Err>>,
    <Self as Observable<Item, Err, CallbackObserver<Item, Err>>>::Unsub: Send + Sync + 'static,
  {
    let mut callbacks = callbacks;
    let disposed = callbacks.disposed.take();
    let on_disposed = Arc::new(ActionDisposable::new(move || {
      if let Some(disposed) = disposed {
        disposed();
      }
    }));
    let observer = CallbackObserver::new(callbacks, on_disposed.clone());
    let upstream = self.actual_subscribe(observer);
    NaryDisposable::pair(upstream, on_disposed)
  }

  /// Subscribe a `next` handler only; a terminal error goes to the default
  /// error hook.
  fn subscribe_next<F>(self, next: F) -> NaryDisposable
  where
    F: FnMut(Item) + Send + 'static,
    Err: Debug,
    Self: Observable<Item, Err, CallbackObserver<Item, Err>>,
    <Self as Observable<Item, Err, CallbackObserver<Item, Err>>>::Unsub: Send + Sync + 'static,
  {
    self.subscribe_callbacks(Callbacks::new().on_next(next))
  }
}
