use std::{collections::VecDeque, sync::Arc};

use super::{
  impl_subject,
  subject_core::{Retention, SubjectCore},
};

/// Buffers values and replays them to each new subscriber, oldest first.
///
/// A terminated subject still replays its buffer, followed by the terminal
/// event.
pub struct ReplaySubject<Item, Err>(Arc<SubjectCore<Item, Err>>);

impl<Item, Err> ReplaySubject<Item, Err> {
  /// Keep at most the `capacity` most recent values.
  pub fn with_capacity(capacity: usize) -> Self {
    let retention = if capacity == 1 {
      Retention::ReplayOne(None)
    } else {
      Retention::Replay { capacity: Some(capacity), buffer: VecDeque::new() }
    };
    Self(SubjectCore::new(retention))
  }

  /// Keep every value.
  pub fn unbounded() -> Self {
    Self(SubjectCore::new(Retention::Replay { capacity: None, buffer: VecDeque::new() }))
  }
}

impl_subject!(ReplaySubject);
