//! Disposables: idempotent, cancellable handles to subscriptions and
//! resources.
//!
//! Every type here can be disposed from any thread, any number of times; the
//! underlying resource is released exactly once. Dropping a handle does *not*
//! dispose it; use [`DisposableExt::dispose_when_dropped`] or a [`DisposeBag`]
//! for scope-bound lifetimes.
use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

mod anonymous;
mod composite;
mod dispose_bag;
mod nary;
mod ref_count;
mod scheduled;
mod serial;
mod single_assignment;

pub use anonymous::*;
pub use composite::*;
pub use dispose_bag::*;
pub use nary::*;
pub use ref_count::*;
pub use scheduled::*;
pub use serial::*;
pub use single_assignment::*;

/// A handle whose `dispose` releases a resource or ends a subscription.
pub trait Disposable {
  /// Release the resource. Calling it again has no further effect.
  fn dispose(&self);

  fn is_disposed(&self) -> bool;
}

/// Type-erased disposable that can cross threads.
pub type BoxedDisposable = Box<dyn Disposable + Send + Sync>;

impl Debug for dyn Disposable + Send + Sync {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("dyn Disposable")
      .field("is_disposed", &self.is_disposed())
      .finish()
  }
}

/// The unit value is the no-op disposable.
impl Disposable for () {
  #[inline]
  fn dispose(&self) {}

  #[inline]
  fn is_disposed(&self) -> bool { true }
}

impl<T: ?Sized + Disposable> Disposable for Box<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

impl<T: ?Sized + Disposable> Disposable for Arc<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

impl<T: Disposable> Disposable for Option<T> {
  #[inline]
  fn dispose(&self) {
    if let Some(inner) = self {
      inner.dispose()
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.as_ref().map_or(true, Disposable::is_disposed) }
}

pub trait DisposableExt: Disposable + Sized {
  /// Erase the concrete type.
  fn boxed(self) -> BoxedDisposable
  where
    Self: Send + Sync + 'static,
  {
    Box::new(self)
  }

  /// Activates "RAII" behavior: `dispose()` runs as soon as the returned
  /// guard goes out of scope.
  ///
  /// **Attention:** if the return value is not bound to a variable, the
  /// guard is dropped and the disposable is disposed immediately.
  fn dispose_when_dropped(self) -> DisposeGuard<Self> { DisposeGuard(self) }

  /// Hand the dispose responsibility to `bag`.
  fn disposed_by(self, bag: &DisposeBag)
  where
    Self: Send + Sync + 'static,
  {
    bag.insert(self);
  }
}

impl<T: Disposable> DisposableExt for T {}

/// An RAII implementation of a "scoped subscription". When this structure is
/// dropped (falls out of scope), the wrapped disposable is disposed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct DisposeGuard<T: Disposable>(T);

impl<T: Disposable> DisposeGuard<T> {
  pub fn new(disposable: T) -> Self { DisposeGuard(disposable) }

  pub fn inner(&self) -> &T { &self.0 }
}

impl<T: Disposable> Disposable for DisposeGuard<T> {
  #[inline]
  fn dispose(&self) { self.0.dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl<T: Disposable> Drop for DisposeGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.dispose() }
}
