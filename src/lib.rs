//! # rxcore: the concurrency core of Reactive Extensions
//!
//! Disposables, subjects and schedulers: the pieces every reactive operator
//! is built on, safe to use from any thread.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use parking_lot::Mutex;
//! use rxcore::prelude::*;
//!
//! let subject = BehaviorSubject::<i32, String>::new(0);
//! let seen = Arc::new(Mutex::new(vec![]));
//! let c_seen = seen.clone();
//! let subscription = subject
//!   .clone()
//!   .subscribe_next(move |v| c_seen.lock().push(v));
//!
//! subject.on_next(1);
//! subscription.dispose();
//! subject.on_next(2);
//! assert_eq!(*seen.lock(), vec![0, 1]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A producer; subscribing returns a disposable |
//! | [`Observer`] | Consumes `next`, `error` and `complete` events |
//! | [`Disposable`] | Idempotent handle releasing a subscription or resource |
//! | [`PublishSubject`] and friends | Multicast observables that are also observers |
//! | [`Scheduler`] | Where and when actions run, including virtual time |
//!
//! ## Feature Flags
//!
//! - **`futures-scheduler`** (default): thread pool schedulers on `futures`
//! - **`tokio-scheduler`**: [`TokioScheduler`](scheduler::TokioScheduler)
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Disposable`]: disposable::Disposable
//! [`PublishSubject`]: subject::PublishSubject
//! [`Scheduler`]: scheduler::Scheduler

pub mod atomic;
pub mod bag;
pub mod disposable;
pub mod error;
pub mod event;
pub mod hooks;
pub mod observable;
pub mod observer;
pub mod prelude;
pub mod scheduler;
pub mod subject;

pub use crate::scheduler::{Duration, Instant};
