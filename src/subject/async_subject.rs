use std::sync::Arc;

use super::{
  impl_subject,
  subject_core::{Retention, SubjectCore},
};

/// Emits only the last value, and only once the source completes.
///
/// Completion without any value just completes. An error discards the
/// retained value and is forwarded as is, to current and late subscribers.
pub struct AsyncSubject<Item, Err>(Arc<SubjectCore<Item, Err>>);

impl<Item, Err> AsyncSubject<Item, Err> {
  pub fn new() -> Self { Self(SubjectCore::new(Retention::Async(None))) }
}

impl<Item, Err> Default for AsyncSubject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl_subject!(AsyncSubject);
