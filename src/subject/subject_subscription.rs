use std::sync::Weak;

use super::{subject_core::SubjectCore, subscribers::ObserverSlot};
use crate::{atomic::AtomicInt, bag::BagKey, disposable::Disposable};

const DISPOSED: i32 = 1;

/// Subscription handle for a subject.
///
/// # Design
///
/// - **Weak back-references**: the handle never keeps the subject or its
///   observer alive.
/// - **Immediate cut-off**: disposing flips the observer slot's flag first, so
///   no event starts delivery to it afterwards.
/// - **Non-blocking removal**: the bag entry is removed right away when the
///   subject lock is free (or held by this thread), otherwise the next
///   fan-out prunes it.
pub struct SubjectSubscription<Item, Err> {
  core: Weak<SubjectCore<Item, Err>>,
  slot: Weak<ObserverSlot<Item, Err>>,
  key: Option<BagKey>,
  state: AtomicInt,
}

impl<Item, Err> SubjectSubscription<Item, Err> {
  pub(crate) fn new(
    core: Weak<SubjectCore<Item, Err>>, slot: Weak<ObserverSlot<Item, Err>>, key: Option<BagKey>,
  ) -> Self {
    Self { core, slot, key, state: AtomicInt::new(0) }
  }

  /// The handle returned when subscribing to a disposed subject.
  pub(crate) fn disposed() -> Self {
    Self { core: Weak::new(), slot: Weak::new(), key: None, state: AtomicInt::new(DISPOSED) }
  }
}

impl<Item, Err> Disposable for SubjectSubscription<Item, Err> {
  fn dispose(&self) {
    if !self.state.try_set_flag(DISPOSED) {
      return;
    }
    if let Some(slot) = self.slot.upgrade() {
      slot.dispose();
    }
    if let (Some(core), Some(key)) = (self.core.upgrade(), self.key) {
      core.remove_observer(key);
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.state.is_flag_set(DISPOSED) }
}
