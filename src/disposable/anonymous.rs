use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedDisposable, Disposable, NaryDisposable};
use crate::atomic::AtomicInt;

const DISPOSED: i32 = 1;

/// Factory functions for the common disposables.
pub struct Disposables;

impl Disposables {
  /// A disposable that runs `action` the first time it is disposed.
  pub fn create<F>(action: F) -> ActionDisposable
  where
    F: FnOnce() + Send + 'static,
  {
    ActionDisposable::new(action)
  }

  /// A disposable with nothing to release.
  #[inline]
  pub fn empty() {}

  /// A disposable that disposes every member once.
  pub fn create_many<I>(disposables: I) -> NaryDisposable
  where
    I: IntoIterator<Item = BoxedDisposable>,
  {
    NaryDisposable::new(disposables)
  }
}

/// Runs an action on first dispose.
pub struct ActionDisposable {
  state: AtomicInt,
  action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ActionDisposable {
  pub fn new<F: FnOnce() + Send + 'static>(action: F) -> Self {
    Self { state: AtomicInt::new(0), action: Mutex::new(Some(Box::new(action))) }
  }
}

impl Disposable for ActionDisposable {
  fn dispose(&self) {
    if self.state.try_set_flag(DISPOSED) {
      let action = self.action.lock().take();
      if let Some(action) = action {
        action();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.state.is_flag_set(DISPOSED) }
}

/// Only records whether it was disposed. Clones share the flag.
#[derive(Clone, Debug, Default)]
pub struct BooleanDisposable(Arc<AtomicInt>);

impl BooleanDisposable {
  pub fn new() -> Self { Self::default() }

  /// A disposable that already reports itself disposed.
  pub fn disposed() -> Self { Self(Arc::new(AtomicInt::new(DISPOSED))) }
}

impl Disposable for BooleanDisposable {
  #[inline]
  fn dispose(&self) { self.0.fetch_or(DISPOSED); }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_flag_set(DISPOSED) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[rxcore_macro::test]
  fn action_runs_once() {
    let counter = Arc::new(AtomicInt::default());
    let c_counter = counter.clone();
    let disposable = Disposables::create(move || {
      c_counter.add(1);
    });

    assert_eq!(counter.load(), 0);
    assert!(!disposable.is_disposed());
    disposable.dispose();
    assert_eq!(counter.load(), 1);
    disposable.dispose();
    assert_eq!(counter.load(), 1);
    assert!(disposable.is_disposed());
  }

  #[rxcore_macro::test]
  fn boolean_clones_share_state() {
    let d = BooleanDisposable::new();
    let c = d.clone();
    c.dispose();
    assert!(d.is_disposed());
    assert!(BooleanDisposable::disposed().is_disposed());
  }
}
