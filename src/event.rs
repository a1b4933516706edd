use crate::observer::Observer;

/// One notification in a sequence: zero or more `Next`, then at most one of
/// `Error` / `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

impl<Item, Err> Event<Item, Err> {
  /// `Error` and `Completed` end a sequence.
  #[inline]
  pub fn is_stop_event(&self) -> bool { !matches!(self, Event::Next(_)) }

  #[inline]
  pub fn element(&self) -> Option<&Item> {
    match self {
      Event::Next(v) => Some(v),
      _ => None,
    }
  }

  #[inline]
  pub fn error(&self) -> Option<&Err> {
    match self {
      Event::Error(e) => Some(e),
      _ => None,
    }
  }

  #[inline]
  pub fn is_completed(&self) -> bool { matches!(self, Event::Completed) }

  pub fn map<U>(self, f: impl FnOnce(Item) -> U) -> Event<U, Err> {
    match self {
      Event::Next(v) => Event::Next(f(v)),
      Event::Error(e) => Event::Error(e),
      Event::Completed => Event::Completed,
    }
  }

  /// Deliver this event to `observer`. The observer is handed back unless the
  /// event terminated it.
  pub fn accept<O>(self, mut observer: O) -> Option<O>
  where
    O: Observer<Item, Err>,
  {
    match self {
      Event::Next(v) => {
        observer.next(v);
        Some(observer)
      }
      Event::Error(e) => {
        observer.error(e);
        None
      }
      Event::Completed => {
        observer.complete();
        None
      }
    }
  }
}
