use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedDisposable, Disposable};
use crate::bag::{Bag, BagKey};

/// Key returned by [`CompositeDisposable::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositeKey(BagKey);

/// A growable set of disposables released together.
///
/// Inserting into a disposed composite disposes the argument right away and
/// yields no key.
#[derive(Clone)]
pub struct CompositeDisposable(Arc<Mutex<Option<Bag<BoxedDisposable>>>>);

impl Default for CompositeDisposable {
  fn default() -> Self { Self(Arc::new(Mutex::new(Some(Bag::new())))) }
}

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn insert<D>(&self, disposable: D) -> Option<CompositeKey>
  where
    D: Disposable + Send + Sync + 'static,
  {
    self.insert_boxed(Box::new(disposable))
  }

  pub fn insert_boxed(&self, disposable: BoxedDisposable) -> Option<CompositeKey> {
    let rejected = {
      let mut bag = self.0.lock();
      match bag.as_mut() {
        Some(bag) => return Some(CompositeKey(bag.insert(disposable))),
        None => disposable,
      }
    };
    rejected.dispose();
    None
  }

  /// Remove and dispose the member registered under `key`.
  pub fn remove(&self, key: CompositeKey) {
    let removed = self
      .0
      .lock()
      .as_mut()
      .and_then(|bag| bag.remove_key(key.0));
    if let Some(d) = removed {
      d.dispose();
    }
  }

  /// Number of members still held, zero once disposed.
  pub fn count(&self) -> usize { self.0.lock().as_ref().map_or(0, Bag::count) }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    let bag = self.0.lock().take();
    if let Some(mut bag) = bag {
      for d in bag.remove_all() {
        d.dispose();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.lock().is_none() }
}

impl FromIterator<BoxedDisposable> for CompositeDisposable {
  fn from_iter<I: IntoIterator<Item = BoxedDisposable>>(iter: I) -> Self {
    let mut bag = Bag::new();
    for d in iter {
      bag.insert(d);
    }
    Self(Arc::new(Mutex::new(Some(bag))))
  }
}
