use std::{cell::RefCell, collections::VecDeque, sync::Arc};

use parking_lot::ReentrantMutex;

use super::{
  subject_subscription::SubjectSubscription,
  subscribers::{broadcast, ObserverSlot, Subscribers},
};
use crate::{
  atomic::AtomicInt, bag::BagKey, error::RxError, event::Event, observer::BoxedObserver,
};

pub(crate) const REENTRANT_EMISSION: &str =
  "re-entrant Subject emissions are not supported (next/error/complete). Emit from outside the \
   subject's own callbacks, or hop through a scheduler if you need a feedback loop.";

/// How a subject ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Terminal<Err> {
  Error(Err),
  Completed,
}

impl<Err: Clone> Terminal<Err> {
  fn to_event<Item>(&self) -> Event<Item, Err> {
    match self {
      Terminal::Error(e) => Event::Error(e.clone()),
      Terminal::Completed => Event::Completed,
    }
  }
}

/// What a subject remembers for subscribers that arrive later.
pub(crate) enum Retention<Item> {
  Publish,
  Behavior(Item),
  ReplayOne(Option<Item>),
  /// `capacity: None` keeps every value.
  Replay {
    capacity: Option<usize>,
    buffer: VecDeque<Item>,
  },
  /// The last value, released only on completion.
  Async(Option<Item>),
}

impl<Item> Retention<Item> {
  /// Forget buffered values. The current value of a behavior subject stays.
  fn clear(&mut self) {
    match self {
      Retention::ReplayOne(last) | Retention::Async(last) => *last = None,
      Retention::Replay { buffer, .. } => buffer.clear(),
      Retention::Publish | Retention::Behavior(_) => {}
    }
  }
}

impl<Item: Clone> Retention<Item> {
  /// Record `value`. Returns whether live observers receive it now.
  fn on_next(&mut self, value: &Item) -> bool {
    match self {
      Retention::Publish => true,
      Retention::Behavior(current) => {
        *current = value.clone();
        true
      }
      Retention::ReplayOne(last) => {
        *last = Some(value.clone());
        true
      }
      Retention::Replay { capacity, buffer } => {
        if *capacity != Some(0) {
          buffer.push_back(value.clone());
        }
        if let Some(capacity) = *capacity {
          while buffer.len() > capacity {
            buffer.pop_front();
          }
        }
        true
      }
      Retention::Async(last) => {
        *last = Some(value.clone());
        false
      }
    }
  }

  fn buffered(&self) -> Vec<Item> {
    match self {
      Retention::Behavior(current) => vec![current.clone()],
      Retention::ReplayOne(last) => last.iter().cloned().collect(),
      Retention::Replay { buffer, .. } => buffer.iter().cloned().collect(),
      Retention::Publish | Retention::Async(_) => vec![],
    }
  }

  /// Events broadcast to live observers when the subject terminates.
  fn terminal_events<Err: Clone>(&self, terminal: &Terminal<Err>) -> Vec<Event<Item, Err>> {
    match (self, terminal) {
      (Retention::Async(Some(last)), Terminal::Completed) => {
        vec![Event::Next(last.clone()), Event::Completed]
      }
      _ => vec![terminal.to_event()],
    }
  }

  /// Events a subscriber receives after the subject terminated.
  fn replay_stopped<Err: Clone>(&self, terminal: &Terminal<Err>) -> Vec<Event<Item, Err>> {
    match self {
      Retention::ReplayOne(_) | Retention::Replay { .. } => self
        .buffered()
        .into_iter()
        .map(Event::Next)
        .chain(Some(terminal.to_event()))
        .collect(),
      _ => self.terminal_events(terminal),
    }
  }
}

pub(crate) struct SubjectState<Item, Err> {
  observers: Subscribers<Item, Err>,
  pub(crate) stopped: Option<Terminal<Err>>,
  pub(crate) retention: Retention<Item>,
  emitting: bool,
}

/// State shared by every subject flavor.
///
/// One re-entrant lock is held around "mutate state, then fan out", so
/// producers on different threads never interleave deliveries. The `RefCell`
/// borrow is released before any observer runs: a callback may subscribe,
/// dispose, or query the subject on the same thread. Emitting from inside a
/// callback panics.
///
/// Disposing the subject itself drops every observer without a terminal
/// event; afterwards events are ignored and subscribing fails.
pub(crate) struct SubjectCore<Item, Err> {
  state: ReentrantMutex<RefCell<SubjectState<Item, Err>>>,
  // set when a dispose could not reach the observer bag
  pending_prune: AtomicInt,
  disposed: AtomicInt,
}

type Slots<Item, Err> = Vec<Arc<ObserverSlot<Item, Err>>>;

/// Marks the subject as delivering; restores the previous mark on drop, also
/// while unwinding.
struct EmittingGuard<'a, Item, Err> {
  state: &'a RefCell<SubjectState<Item, Err>>,
  previous: bool,
}

impl<'a, Item, Err> EmittingGuard<'a, Item, Err> {
  fn new(state: &'a RefCell<SubjectState<Item, Err>>) -> Self {
    let previous = std::mem::replace(&mut state.borrow_mut().emitting, true);
    Self { state, previous }
  }
}

impl<Item, Err> Drop for EmittingGuard<'_, Item, Err> {
  fn drop(&mut self) { self.state.borrow_mut().emitting = self.previous; }
}

impl<Item, Err> SubjectCore<Item, Err> {
  pub(crate) fn new(retention: Retention<Item>) -> Arc<Self> {
    Arc::new(Self {
      state: ReentrantMutex::new(RefCell::new(SubjectState {
        observers: Subscribers::default(),
        stopped: None,
        retention,
        emitting: false,
      })),
      pending_prune: AtomicInt::new(0),
      disposed: AtomicInt::new(0),
    })
  }

  pub(crate) fn has_observers(&self) -> bool {
    if self.is_disposed() {
      return false;
    }
    let guard = self.state.lock();
    let state = guard.borrow();
    state.observers.has_live()
  }

  pub(crate) fn observer_count(&self) -> usize {
    if self.is_disposed() {
      return 0;
    }
    let guard = self.state.lock();
    let state = guard.borrow();
    state.observers.live_count()
  }

  pub(crate) fn is_stopped(&self) -> bool { self.state.lock().borrow().stopped.is_some() }

  /// Read the state under the lock.
  pub(crate) fn with_state<R>(&self, f: impl FnOnce(&SubjectState<Item, Err>) -> R) -> R {
    let guard = self.state.lock();
    let state = guard.borrow();
    f(&state)
  }

  #[inline]
  pub(crate) fn is_disposed(&self) -> bool { self.disposed.is_flag_set(1) }

  pub(crate) fn dispose(&self) {
    if !self.disposed.try_set_flag(1) {
      return;
    }
    tracing::debug!("subject disposed");
    self.request_prune();
  }

  /// Remove `key` from the observer bag if the bag is reachable right now,
  /// otherwise leave it for the fan-out or subscribe holding the bag.
  pub(crate) fn remove_observer(&self, key: BagKey) {
    let mut removed = None;
    let mut reached = false;
    if let Some(guard) = self.state.try_lock() {
      if let Ok(mut state) = guard.try_borrow_mut() {
        removed = state.observers.remove(key);
        reached = true;
      }
    }
    if !reached {
      self.pending_prune.fetch_or(1);
    }
    drop(removed);
  }

  fn request_prune(&self) {
    self.pending_prune.fetch_or(1);
    let mut pruned = vec![];
    if let Some(guard) = self.state.try_lock() {
      if let Ok(mut state) = guard.try_borrow_mut() {
        pruned = self.take_pruned(&mut state);
      }
    }
    drop(pruned);
  }

  /// Run a requested prune. The removed slots are returned so the caller
  /// drops them after the borrow ends.
  fn take_pruned(&self, state: &mut SubjectState<Item, Err>) -> Slots<Item, Err> {
    if self.pending_prune.swap(0) == 0 {
      return vec![];
    }
    if self.is_disposed() {
      state.retention.clear();
      let drained = state.observers.drain();
      drained.iter().for_each(|slot| slot.dispose());
      drained
    } else {
      state.observers.prune()
    }
  }

  fn prune_after_delivery(&self, cell: &RefCell<SubjectState<Item, Err>>) {
    let pruned = self.take_pruned(&mut cell.borrow_mut());
    drop(pruned);
  }
}

impl<Item, Err> SubjectCore<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  pub(crate) fn emit(&self, event: Event<Item, Err>) {
    let guard = self.state.lock();
    let cell: &RefCell<_> = &guard;

    let (targets, events, pruned) = {
      let mut state = cell.borrow_mut();
      if state.emitting {
        drop(state);
        panic!("{}", REENTRANT_EMISSION);
      }
      let pruned = self.take_pruned(&mut state);
      let (targets, events) = if state.stopped.is_some() || self.is_disposed() {
        (vec![], vec![])
      } else {
        match event {
          Event::Next(value) => {
            if state.retention.on_next(&value) {
              (state.observers.snapshot(), vec![Event::Next(value)])
            } else {
              (vec![], vec![])
            }
          }
          Event::Error(err) => Self::terminate(&mut state, Terminal::Error(err)),
          Event::Completed => Self::terminate(&mut state, Terminal::Completed),
        }
      };
      (targets, events, pruned)
    };
    drop(pruned);
    if events.is_empty() {
      return;
    }

    let emitting = EmittingGuard::new(cell);
    for event in events {
      broadcast(&targets, event);
    }
    drop(emitting);
    drop(targets);
    self.prune_after_delivery(cell);
  }

  fn terminate(
    state: &mut SubjectState<Item, Err>, terminal: Terminal<Err>,
  ) -> (Slots<Item, Err>, Vec<Event<Item, Err>>) {
    let events = state.retention.terminal_events(&terminal);
    let targets = state.observers.drain();
    tracing::debug!(
      observers = targets.len(),
      errored = matches!(terminal, Terminal::Error(_)),
      "subject terminated"
    );
    state.stopped = Some(terminal);
    (targets, events)
  }

  pub(crate) fn subscribe(
    self: &Arc<Self>, observer: BoxedObserver<Item, Err>,
  ) -> Result<SubjectSubscription<Item, Err>, RxError> {
    let guard = self.state.lock();
    let cell: &RefCell<_> = &guard;
    let slot = Arc::new(ObserverSlot::new(observer));

    let (key, events, pruned) = {
      let mut state_ref = cell.borrow_mut();
      let state = &mut *state_ref;
      let pruned = self.take_pruned(state);
      if self.is_disposed() {
        drop(state_ref);
        drop(pruned);
        return Err(RxError::Disposed);
      }
      match state.stopped.as_ref() {
        Some(terminal) => (None, state.retention.replay_stopped(terminal), pruned),
        None => {
          let key = state.observers.add(slot.clone());
          let events: Vec<_> = state
            .retention
            .buffered()
            .into_iter()
            .map(Event::Next)
            .collect();
          (Some(key), events, pruned)
        }
      }
    };
    drop(pruned);

    if !events.is_empty() {
      let emitting = EmittingGuard::new(cell);
      for event in events {
        slot.on(event);
      }
      drop(emitting);
      self.prune_after_delivery(cell);
    }

    Ok(SubjectSubscription::new(Arc::downgrade(self), Arc::downgrade(&slot), key))
  }
}
