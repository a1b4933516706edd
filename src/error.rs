//! Errors for misuse of the core primitives.
//!
//! Stream failures never show up here: they travel as the `Err` type parameter
//! inside [`Event::Error`](crate::event::Event::Error). These types cover the
//! cases where a caller breaks a precondition of a primitive.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RxError {
  /// `SingleAssignmentDisposable::set` was called more than once.
  #[error("single assignment disposable was already assigned")]
  AlreadyAssigned,
  /// A virtual time scheduler was asked to run while already running.
  #[error("virtual time scheduler is already running")]
  SchedulerRunning,
  /// The subject was disposed.
  #[error("subject was disposed")]
  Disposed,
}

/// Why [`BehaviorSubject::value`](crate::subject::BehaviorSubject::value)
/// could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError<Err> {
  #[error("subject terminated with error: {0:?}")]
  Errored(Err),
  #[error("subject was disposed")]
  Disposed,
}
