use super::{CompositeDisposable, Disposable};

/// Owns disposables and disposes them all when dropped.
///
/// Inserting after the bag was emptied by [`dispose`](Disposable::dispose)
/// disposes the argument at once.
#[derive(Default)]
pub struct DisposeBag(CompositeDisposable);

impl DisposeBag {
  pub fn new() -> Self { Self::default() }

  pub fn insert<D>(&self, disposable: D)
  where
    D: Disposable + Send + Sync + 'static,
  {
    self.0.insert(disposable);
  }

  pub fn len(&self) -> usize { self.0.count() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl Disposable for DisposeBag {
  #[inline]
  fn dispose(&self) { self.0.dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl Drop for DisposeBag {
  fn drop(&mut self) { self.0.dispose() }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::disposable::{BooleanDisposable, DisposableExt};

  #[rxcore_macro::test]
  fn drop_disposes_contents() {
    let a = BooleanDisposable::new();
    let b = BooleanDisposable::new();
    {
      let bag = DisposeBag::new();
      a.clone().disposed_by(&bag);
      bag.insert(b.clone());
      assert_eq!(bag.len(), 2);
      assert!(!a.is_disposed());
    }
    assert!(a.is_disposed());
    assert!(b.is_disposed());
  }
}
