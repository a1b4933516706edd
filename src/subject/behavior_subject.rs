use std::sync::Arc;

use super::{
  impl_subject,
  subject_core::{Retention, SubjectCore, SubjectState, Terminal},
};
use crate::error::ValueError;

/// Holds a current value. Each new subscriber first receives the current
/// value, then every later event.
///
/// After an error, late subscribers receive only the error; after completion,
/// only the completion.
pub struct BehaviorSubject<Item, Err>(Arc<SubjectCore<Item, Err>>);

impl<Item, Err> BehaviorSubject<Item, Err> {
  pub fn new(initial: Item) -> Self { Self(SubjectCore::new(Retention::Behavior(initial))) }
}

impl<Item: Clone, Err: Clone> BehaviorSubject<Item, Err> {
  /// The latest value.
  ///
  /// Still available after completion; after an error the error is returned
  /// instead.
  pub fn value(&self) -> Result<Item, ValueError<Err>> {
    if self.0.is_disposed() {
      return Err(ValueError::Disposed);
    }
    self.0.with_state(|state| match &state.stopped {
      Some(Terminal::Error(e)) => Err(ValueError::Errored(e.clone())),
      _ => Ok(Self::current(state)),
    })
  }

  /// The latest value, whatever happened to the subject.
  pub(crate) fn latest(&self) -> Item { self.0.with_state(Self::current) }

  fn current(state: &SubjectState<Item, Err>) -> Item {
    match &state.retention {
      Retention::Behavior(current) => current.clone(),
      _ => unreachable!("behavior subject always retains its current value"),
    }
  }
}

impl_subject!(BehaviorSubject);

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::{error::ValueError, prelude::*};

  fn record(subject: &BehaviorSubject<i32, String>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    subject.clone().subscribe_callbacks(
      Callbacks::new()
        .on_next(move |v: i32| l1.lock().push(v.to_string()))
        .on_error(move |e| l2.lock().push(format!("error {}", e)))
        .on_completed(move || l3.lock().push("completed".to_owned())),
    );
    log
  }

  #[rxcore_macro::test]
  fn replays_current_value_on_subscribe() {
    let subject = BehaviorSubject::new(1);
    let first = record(&subject);
    subject.on_next(2);
    let second = record(&subject);
    subject.on_next(3);

    assert_eq!(*first.lock(), vec!["1", "2", "3"]);
    assert_eq!(*second.lock(), vec!["2", "3"]);
    assert_eq!(subject.value(), Ok(3));
  }

  #[rxcore_macro::test]
  fn value_survives_completion() {
    let subject = BehaviorSubject::<i32, String>::new(1);
    subject.on_next(5);
    subject.on_completed();
    assert_eq!(subject.value(), Ok(5));

    let late = record(&subject);
    assert_eq!(*late.lock(), vec!["completed"]);
  }

  #[rxcore_macro::test]
  fn value_reports_error() {
    let subject = BehaviorSubject::<i32, String>::new(1);
    subject.on_error("bad".to_owned());
    assert_eq!(subject.value(), Err(ValueError::Errored("bad".to_owned())));

    let late = record(&subject);
    assert_eq!(*late.lock(), vec!["error bad"]);
  }

  #[rxcore_macro::test]
  fn value_is_readable_inside_a_callback() {
    let subject = BehaviorSubject::<i32, String>::new(0);
    let seen = Arc::new(Mutex::new(vec![]));
    let (c_subject, c_seen) = (subject.clone(), seen.clone());
    subject
      .clone()
      .subscribe_next(move |v| c_seen.lock().push((v, c_subject.value())));
    subject.on_next(4);
    assert_eq!(*seen.lock(), vec![(0, Ok(0)), (4, Ok(4))]);
  }

  #[rxcore_macro::test]
  fn disposed_subject_rejects_value_and_subscribers() {
    let subject = BehaviorSubject::<i32, String>::new(1);
    let early = record(&subject);
    subject.dispose();
    subject.on_next(2);

    assert!(subject.is_disposed());
    assert!(!subject.has_observers());
    assert_eq!(*early.lock(), vec!["1"]);
    assert_eq!(subject.value(), Err(ValueError::Disposed));
    assert!(matches!(
      subject.try_subscribe(CallbackObserver::new(Callbacks::new(), Arc::new(()))),
      Err(RxError::Disposed)
    ));
  }
}
