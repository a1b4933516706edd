use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedDisposable, Disposable};
use crate::{atomic::AtomicInt, error::RxError};

const DISPOSED: i32 = 1;
const DISPOSABLE_SET: i32 = 2;

/// A holder that accepts its inner disposable exactly once.
///
/// Whichever of `set` and `dispose` comes second releases the inner value, so
/// a subscription handed out before its source finished subscribing can still
/// be cancelled.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let holder = SingleAssignmentDisposable::new();
/// holder.dispose();
///
/// let inner = BooleanDisposable::new();
/// holder.set(inner.clone()).unwrap();
/// assert!(inner.is_disposed());
/// ```
#[derive(Clone, Default)]
pub struct SingleAssignmentDisposable(Arc<Inner>);

#[derive(Default)]
struct Inner {
  state: AtomicInt,
  current: Mutex<Option<BoxedDisposable>>,
}

enum Assigned {
  Stored,
  Late(BoxedDisposable),
  Rejected(BoxedDisposable),
}

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  /// Store `disposable`, or dispose it straight away when this holder is
  /// already disposed.
  ///
  /// A second assignment is a programming error: the rejected value is
  /// disposed and [`RxError::AlreadyAssigned`] is returned.
  pub fn set<D>(&self, disposable: D) -> Result<(), RxError>
  where
    D: Disposable + Send + Sync + 'static,
  {
    let disposable: BoxedDisposable = Box::new(disposable);
    let assigned = {
      let mut current = self.0.current.lock();
      let previous = self.0.state.fetch_or(DISPOSABLE_SET);
      if previous & DISPOSABLE_SET != 0 {
        Assigned::Rejected(disposable)
      } else if previous & DISPOSED != 0 {
        Assigned::Late(disposable)
      } else {
        *current = Some(disposable);
        Assigned::Stored
      }
    };

    match assigned {
      Assigned::Stored => Ok(()),
      Assigned::Late(d) => {
        d.dispose();
        Ok(())
      }
      Assigned::Rejected(d) => {
        d.dispose();
        Err(RxError::AlreadyAssigned)
      }
    }
  }

  #[inline]
  pub fn is_set(&self) -> bool { self.0.state.is_flag_set(DISPOSABLE_SET) }
}

impl Disposable for SingleAssignmentDisposable {
  fn dispose(&self) {
    let previous = self.0.state.fetch_or(DISPOSED);
    if previous & DISPOSED != 0 {
      return;
    }
    if previous & DISPOSABLE_SET != 0 {
      let current = self.0.current.lock().take();
      if let Some(d) = current {
        d.dispose();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.state.is_flag_set(DISPOSED) }
}
