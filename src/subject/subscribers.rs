use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  atomic::AtomicInt,
  bag::{Bag, BagKey},
  event::Event,
  observer::{BoxedObserver, Observer},
};

const DISPOSED: i32 = 1;

/// One registered observer.
///
/// The disposed flag is checked under the slot lock right before every
/// delivery, so once a subscription's `dispose` returns no new event starts
/// on this slot, even while the slot still sits in a fan-out snapshot.
/// Disposing also drops the observer: at once when no delivery holds the slot,
/// otherwise when that delivery returns.
pub(crate) struct ObserverSlot<Item, Err> {
  disposed: AtomicInt,
  observer: Mutex<Option<BoxedObserver<Item, Err>>>,
}

impl<Item, Err> ObserverSlot<Item, Err> {
  pub(crate) fn new(observer: BoxedObserver<Item, Err>) -> Self {
    Self { disposed: AtomicInt::new(0), observer: Mutex::new(Some(observer)) }
  }

  pub(crate) fn dispose(&self) {
    self.disposed.fetch_or(DISPOSED);
    let released = self
      .observer
      .try_lock()
      .and_then(|mut observer| observer.take());
    drop(released);
  }

  #[inline]
  pub(crate) fn is_disposed(&self) -> bool { self.disposed.is_flag_set(DISPOSED) }

  pub(crate) fn on(&self, event: Event<Item, Err>) {
    match event {
      Event::Next(value) => {
        let mut observer = self.observer.lock();
        if !self.is_disposed() {
          if let Some(observer) = observer.as_mut() {
            observer.next(value);
          }
        }
        // a dispose that found the slot held left the observer to us
        let released = if self.is_disposed() { observer.take() } else { None };
        drop(observer);
        drop(released);
      }
      terminal => {
        let observer = self.observer.lock().take();
        if let Some(observer) = observer {
          if !self.is_disposed() {
            terminal.accept(observer);
          }
        }
      }
    }
  }
}

/// Subscribers container keyed by [`Bag`] keys.
///
/// Delivery never happens while this container is borrowed: callers take a
/// [`snapshot`](Subscribers::snapshot) or [`drain`](Subscribers::drain) and
/// broadcast to that.
pub(crate) struct Subscribers<Item, Err> {
  inner: Bag<Arc<ObserverSlot<Item, Err>>>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { inner: Bag::new() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  #[inline]
  pub(crate) fn add(&mut self, slot: Arc<ObserverSlot<Item, Err>>) -> BagKey {
    self.inner.insert(slot)
  }

  #[inline]
  pub(crate) fn remove(&mut self, key: BagKey) -> Option<Arc<ObserverSlot<Item, Err>>> {
    self.inner.remove_key(key)
  }

  pub(crate) fn has_live(&self) -> bool { self.inner.iter().any(|(_, slot)| !slot.is_disposed()) }

  pub(crate) fn live_count(&self) -> usize {
    self
      .inner
      .iter()
      .filter(|(_, slot)| !slot.is_disposed())
      .count()
  }

  pub(crate) fn snapshot(&self) -> Vec<Arc<ObserverSlot<Item, Err>>> {
    self
      .inner
      .iter()
      .map(|(_, slot)| slot.clone())
      .collect()
  }

  /// Take every observer out, in subscription order.
  pub(crate) fn drain(&mut self) -> Vec<Arc<ObserverSlot<Item, Err>>> { self.inner.remove_all() }

  /// Remove slots whose subscription was disposed while the container could
  /// not be touched. The removed slots are returned so they are dropped
  /// outside any borrow.
  pub(crate) fn prune(&mut self) -> Vec<Arc<ObserverSlot<Item, Err>>> {
    let keys: Vec<_> = self
      .inner
      .iter()
      .filter(|(_, slot)| slot.is_disposed())
      .map(|(key, _)| key)
      .collect();
    keys
      .into_iter()
      .filter_map(|key| self.inner.remove_key(key))
      .collect()
  }
}

/// Broadcast one event to `targets`.
///
/// The value is cloned for every target except the last one, which receives
/// the moved value.
pub(crate) fn broadcast<Item, Err>(
  targets: &[Arc<ObserverSlot<Item, Err>>], event: Event<Item, Err>,
) where
  Item: Clone,
  Err: Clone,
{
  let mut iter = targets.iter().peekable();
  while let Some(slot) = iter.next() {
    if iter.peek().is_some() {
      slot.on(event.clone());
    } else {
      slot.on(event);
      break;
    }
  }
}
