//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Disposables
pub use crate::disposable::{
  ActionDisposable, BooleanDisposable, BoxedDisposable, CompositeDisposable, CompositeKey,
  Disposable, DisposableExt, DisposeBag, DisposeGuard, Disposables, NaryDisposable,
  RefCountDisposable, ScheduledDisposable, SerialDisposable, SingleAssignmentDisposable,
};
// Errors
pub use crate::error::{RxError, ValueError};
// Events
pub use crate::event::Event;
// Core traits and creation functions
pub use crate::observable::{
  create, empty, from_iter, just, never, of, throw, AnyObserver, Observable, ObservableExt,
};
// Observers
pub use crate::observer::{BoxedObserver, CallbackObserver, Callbacks, FnMutObserver, Observer};
// Schedulers
#[cfg(feature = "futures-scheduler")]
pub use crate::scheduler::{ConcurrentScheduler, SerialScheduler};
#[cfg(feature = "tokio-scheduler")]
pub use crate::scheduler::TokioScheduler;
pub use crate::scheduler::{
  CurrentThreadScheduler, Duration, HistoricalScheduler, Instant, Recursion, Scheduler,
  TestScheduler, VirtualTimeConfig, VirtualTimeScheduler,
};
// Subjects
pub use crate::subject::{
  AsyncSubject, BehaviorRelay, BehaviorSubject, PublishRelay, PublishSubject, ReplayRelay,
  ReplaySubject, SubjectSubscription,
};
