use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedDisposable, Disposable};
use crate::atomic::AtomicInt;

/// Releases its underlying disposable only after it was disposed *and* every
/// handle obtained from [`retain`](RefCountDisposable::retain) was disposed,
/// in whichever order those happen.
#[derive(Clone)]
pub struct RefCountDisposable(Arc<Mutex<RefCountState>>);

struct RefCountState {
  disposable: Option<BoxedDisposable>,
  primary_disposed: bool,
  count: usize,
}

impl RefCountDisposable {
  pub fn new<D>(disposable: D) -> Self
  where
    D: Disposable + Send + Sync + 'static,
  {
    Self(Arc::new(Mutex::new(RefCountState {
      disposable: Some(Box::new(disposable)),
      primary_disposed: false,
      count: 0,
    })))
  }

  /// Take a dependent handle. Once the underlying disposable is gone this
  /// hands out a no-op.
  pub fn retain(&self) -> BoxedDisposable {
    let mut state = self.0.lock();
    if state.disposable.is_some() {
      state.count += 1;
      Box::new(RetainedDisposable { parent: self.0.clone(), state: AtomicInt::new(0) })
    } else {
      Box::new(())
    }
  }

  /// Outstanding retained handles.
  pub fn retained(&self) -> usize { self.0.lock().count }
}

fn release(parent: &Mutex<RefCountState>) {
  let disposable = {
    let mut state = parent.lock();
    if state.disposable.is_none() {
      return;
    }
    state.count = state.count.saturating_sub(1);
    if state.primary_disposed && state.count == 0 { state.disposable.take() } else { None }
  };
  if let Some(d) = disposable {
    d.dispose();
  }
}

impl Disposable for RefCountDisposable {
  fn dispose(&self) {
    let disposable = {
      let mut state = self.0.lock();
      if state.disposable.is_none() || state.primary_disposed {
        return;
      }
      state.primary_disposed = true;
      if state.count == 0 { state.disposable.take() } else { None }
    };
    if let Some(d) = disposable {
      d.dispose();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.lock().disposable.is_none() }
}

struct RetainedDisposable {
  parent: Arc<Mutex<RefCountState>>,
  state: AtomicInt,
}

impl Disposable for RetainedDisposable {
  fn dispose(&self) {
    if self.state.try_set_flag(1) {
      release(&self.parent);
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.state.is_flag_set(1) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::disposable::BooleanDisposable;

  #[rxcore_macro::test]
  fn primary_first_then_dependents() {
    let inner = BooleanDisposable::new();
    let ref_count = RefCountDisposable::new(inner.clone());
    let d1 = ref_count.retain();
    let d2 = ref_count.retain();
    assert_eq!(ref_count.retained(), 2);

    ref_count.dispose();
    assert!(!inner.is_disposed());
    d1.dispose();
    d1.dispose();
    assert!(!inner.is_disposed());
    d2.dispose();
    assert!(inner.is_disposed());
    assert!(ref_count.is_disposed());
  }

  #[rxcore_macro::test]
  fn dependents_first_then_primary() {
    let inner = BooleanDisposable::new();
    let ref_count = RefCountDisposable::new(inner.clone());
    let d1 = ref_count.retain();
    let d2 = ref_count.retain();

    d1.dispose();
    d2.dispose();
    assert!(!inner.is_disposed());
    ref_count.dispose();
    assert!(inner.is_disposed());
  }

  #[rxcore_macro::test]
  fn no_dependents_disposes_immediately() {
    let inner = BooleanDisposable::new();
    let ref_count = RefCountDisposable::new(inner.clone());
    ref_count.dispose();
    assert!(inner.is_disposed());

    let late = ref_count.retain();
    late.dispose();
    assert_eq!(ref_count.retained(), 0);
  }
}
