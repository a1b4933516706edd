use std::sync::Arc;

use super::{
  impl_subject,
  subject_core::{Retention, SubjectCore},
};

/// Broadcasts every event to the observers subscribed at the time of the
/// event. Late subscribers see only the terminal event.
///
/// ```rust
/// use rxcore::prelude::*;
///
/// let subject = PublishSubject::<i32, String>::new();
/// subject.on_next(0); // nobody is listening
/// subject.clone().subscribe_next(|v| println!("{}", v));
/// subject.on_next(1);
/// ```
pub struct PublishSubject<Item, Err>(Arc<SubjectCore<Item, Err>>);

impl<Item, Err> PublishSubject<Item, Err> {
  pub fn new() -> Self { Self(SubjectCore::new(Retention::Publish)) }
}

impl<Item, Err> Default for PublishSubject<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl_subject!(PublishSubject);
