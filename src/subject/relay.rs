//! Subjects that only ever carry values.
//!
//! A relay wraps a subject whose error type is [`Infallible`] and exposes
//! `accept` instead of the producer trio, so it can neither fail nor
//! complete. Subscribers keep receiving values until they dispose.

use std::convert::Infallible;

use super::{BehaviorSubject, PublishSubject, ReplaySubject, SubjectSubscription};
use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

macro_rules! impl_relay {
  ($name:ident) => {
    impl<Item> Clone for $name<Item> {
      fn clone(&self) -> Self { Self(self.0.clone()) }
    }

    impl<Item: Clone> $name<Item> {
      /// Deliver `value` to every current subscriber.
      ///
      /// # Panics
      ///
      /// When called from inside one of this relay's own callbacks.
      pub fn accept(&self, value: Item) { self.0.on_next(value) }
    }

    impl<Item> $name<Item> {
      pub fn has_observers(&self) -> bool { self.0.has_observers() }

      pub fn observer_count(&self) -> usize { self.0.observer_count() }
    }

    impl<Item, O> Observable<Item, Infallible, O> for $name<Item>
    where
      Item: Clone + Send + 'static,
      O: Observer<Item, Infallible> + Send + 'static,
    {
      type Unsub = SubjectSubscription<Item, Infallible>;

      fn actual_subscribe(self, observer: O) -> Self::Unsub { self.0.actual_subscribe(observer) }
    }

    impl<Item> ObservableExt<Item, Infallible> for $name<Item> {}
  };
}

/// A [`PublishSubject`] that only carries values.
pub struct PublishRelay<Item>(PublishSubject<Item, Infallible>);

impl<Item> PublishRelay<Item> {
  pub fn new() -> Self { Self(PublishSubject::new()) }
}

impl<Item> Default for PublishRelay<Item> {
  fn default() -> Self { Self::new() }
}

/// A [`BehaviorSubject`] that only carries values, so its current value can
/// always be read.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let relay = BehaviorRelay::new(1);
/// relay.accept(2);
/// assert_eq!(relay.value(), 2);
/// ```
pub struct BehaviorRelay<Item>(BehaviorSubject<Item, Infallible>);

impl<Item> BehaviorRelay<Item> {
  pub fn new(initial: Item) -> Self { Self(BehaviorSubject::new(initial)) }
}

impl<Item: Clone> BehaviorRelay<Item> {
  pub fn value(&self) -> Item { self.0.latest() }
}

/// A [`ReplaySubject`] that only carries values.
pub struct ReplayRelay<Item>(ReplaySubject<Item, Infallible>);

impl<Item> ReplayRelay<Item> {
  /// Replay at most the `capacity` most recent values.
  pub fn with_capacity(capacity: usize) -> Self { Self(ReplaySubject::with_capacity(capacity)) }

  /// Replay every value.
  pub fn unbounded() -> Self { Self(ReplaySubject::unbounded()) }
}

impl_relay!(PublishRelay);
impl_relay!(BehaviorRelay);
impl_relay!(ReplayRelay);
