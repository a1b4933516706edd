use std::sync::Arc;

use parking_lot::Mutex;

use super::{BoxedDisposable, Disposable};

/// A holder whose inner disposable can be replaced; the replaced value is
/// disposed.
///
/// Once the holder itself is disposed, every later assignment is disposed on
/// arrival.
#[derive(Clone, Default)]
pub struct SerialDisposable(Arc<Mutex<SerialState>>);

#[derive(Default)]
struct SerialState {
  disposed: bool,
  current: Option<BoxedDisposable>,
}

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  /// Replace the inner disposable, disposing the previous one.
  pub fn set<D>(&self, disposable: D)
  where
    D: Disposable + Send + Sync + 'static,
  {
    let disposable: BoxedDisposable = Box::new(disposable);
    let displaced = {
      let mut state = self.0.lock();
      if state.disposed { Some(disposable) } else { state.current.replace(disposable) }
    };
    if let Some(d) = displaced {
      d.dispose();
    }
  }
}

impl Disposable for SerialDisposable {
  fn dispose(&self) {
    let current = {
      let mut state = self.0.lock();
      if state.disposed {
        None
      } else {
        state.disposed = true;
        state.current.take()
      }
    };
    if let Some(d) = current {
      d.dispose();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}
