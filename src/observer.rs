//! Consumers of events.
//!
//! `error` and `complete` take the observer by value: once a terminal event is
//! delivered there is nothing left to call.

use std::{convert::Infallible, fmt::Debug, sync::Arc};

use crate::{disposable::Disposable, hooks};

pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  fn error(self, err: Err);

  fn complete(self);

  /// Whether delivering further events is pointless.
  fn is_closed(&self) -> bool;
}

/// Object-safe mirror of [`Observer`], implemented for every observer.
///
/// The terminal methods take `Box<Self>` so a boxed observer can still be
/// consumed.
pub trait DynObserver<Item, Err> {
  fn dyn_next(&mut self, value: Item);
  fn dyn_error(self: Box<Self>, err: Err);
  fn dyn_complete(self: Box<Self>);
  fn dyn_is_closed(&self) -> bool;
}

impl<O: Observer<Item, Err>, Item, Err> DynObserver<Item, Err> for O {
  fn dyn_next(&mut self, value: Item) { self.next(value) }

  fn dyn_error(self: Box<Self>, err: Err) { (*self).error(err) }

  fn dyn_complete(self: Box<Self>) { (*self).complete() }

  fn dyn_is_closed(&self) -> bool { self.is_closed() }
}

/// Type-erased observer that can be moved across threads.
pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for BoxedObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).dyn_next(value) }

  #[inline]
  fn error(self, err: Err) { self.dyn_error(err) }

  #[inline]
  fn complete(self) { self.dyn_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).dyn_is_closed() }
}

/// Erase an observer into a [`BoxedObserver`].
pub trait IntoBoxedObserver<Item, Err> {
  fn into_boxed(self) -> BoxedObserver<Item, Err>;
}

impl<Item, Err, O> IntoBoxedObserver<Item, Err> for O
where
  O: Observer<Item, Err> + Send + 'static,
{
  fn into_boxed(self) -> BoxedObserver<Item, Err> { Box::new(self) }
}

/// A `next`-only closure for sequences that cannot fail.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<F, Item> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value) }

  #[inline]
  fn error(self, _err: Infallible) {}

  #[inline]
  fn complete(self) {}

  #[inline]
  fn is_closed(&self) -> bool { false }
}

/// Per-event handlers for [`subscribe_callbacks`].
///
/// A missing error handler routes the error to
/// [`hooks::default_error_handler`]. The `disposed` handler runs once, either
/// when the subscription is disposed or right after a terminal event.
///
/// [`subscribe_callbacks`]: crate::observable::ObservableExt::subscribe_callbacks
pub struct Callbacks<Item, Err> {
  pub(crate) next: Option<Box<dyn FnMut(Item) + Send>>,
  pub(crate) error: Option<Box<dyn FnOnce(Err) + Send>>,
  pub(crate) completed: Option<Box<dyn FnOnce() + Send>>,
  pub(crate) disposed: Option<Box<dyn FnOnce() + Send>>,
}

impl<Item, Err> Default for Callbacks<Item, Err> {
  fn default() -> Self { Self { next: None, error: None, completed: None, disposed: None } }
}

impl<Item, Err> Callbacks<Item, Err> {
  pub fn new() -> Self { Self::default() }

  pub fn on_next(mut self, f: impl FnMut(Item) + Send + 'static) -> Self {
    self.next = Some(Box::new(f));
    self
  }

  pub fn on_error(mut self, f: impl FnOnce(Err) + Send + 'static) -> Self {
    self.error = Some(Box::new(f));
    self
  }

  pub fn on_completed(mut self, f: impl FnOnce() + Send + 'static) -> Self {
    self.completed = Some(Box::new(f));
    self
  }

  pub fn on_disposed(mut self, f: impl FnOnce() + Send + 'static) -> Self {
    self.disposed = Some(Box::new(f));
    self
  }
}

/// Observer assembled from [`Callbacks`]; `on_terminal` is disposed after
/// the terminal handler ran.
pub struct CallbackObserver<Item, Err> {
  next: Option<Box<dyn FnMut(Item) + Send>>,
  error: Option<Box<dyn FnOnce(Err) + Send>>,
  completed: Option<Box<dyn FnOnce() + Send>>,
  on_terminal: Arc<dyn Disposable + Send + Sync>,
}

impl<Item, Err> CallbackObserver<Item, Err> {
  pub(crate) fn new(
    callbacks: Callbacks<Item, Err>, on_terminal: Arc<dyn Disposable + Send + Sync>,
  ) -> Self {
    let Callbacks { next, error, completed, disposed: _ } = callbacks;
    Self { next, error, completed, on_terminal }
  }
}

impl<Item, Err: Debug> Observer<Item, Err> for CallbackObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if let Some(next) = self.next.as_mut() {
      next(value);
    }
  }

  fn error(self, err: Err) {
    match self.error {
      Some(error) => error(err),
      None => hooks::default_error_handler(&err),
    }
    self.on_terminal.dispose();
  }

  fn complete(self) {
    if let Some(completed) = self.completed {
      completed();
    }
    self.on_terminal.dispose();
  }

  fn is_closed(&self) -> bool { self.on_terminal.is_disposed() }
}
