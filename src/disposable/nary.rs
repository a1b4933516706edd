use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{BoxedDisposable, Disposable};

/// A fixed group of disposables released together.
///
/// Two members are kept inline; most groups pair a source subscription with
/// one cleanup action.
pub struct NaryDisposable {
  members: Mutex<Option<SmallVec<[BoxedDisposable; 2]>>>,
}

impl NaryDisposable {
  pub fn new<I>(disposables: I) -> Self
  where
    I: IntoIterator<Item = BoxedDisposable>,
  {
    Self { members: Mutex::new(Some(disposables.into_iter().collect())) }
  }

  pub fn pair<A, B>(a: A, b: B) -> Self
  where
    A: Disposable + Send + Sync + 'static,
    B: Disposable + Send + Sync + 'static,
  {
    Self::new([Box::new(a) as BoxedDisposable, Box::new(b)])
  }
}

impl Disposable for NaryDisposable {
  fn dispose(&self) {
    let members = self.members.lock().take();
    if let Some(members) = members {
      for d in members {
        d.dispose();
      }
    }
  }

  fn is_disposed(&self) -> bool { self.members.lock().is_none() }
}
