use std::{
  collections::BTreeMap,
  fmt::{Debug, Formatter},
};

/// Unique identifier of an entry inserted into a [`Bag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BagKey(u64);

impl BagKey {
  #[inline]
  pub fn raw(self) -> u64 { self.0 }
}

/// A keyed multiset tuned for the observer / disposable registries.
///
/// Most subjects and composites hold zero or one entry, so the first live
/// entry sits in an inline slot and never touches the heap. Further entries go
/// into an ordered overflow map; keys grow monotonically, so iterating the map
/// is iterating in insertion order.
///
/// # Design
///
/// - **Inline slot**: reused whenever it is empty, so the common
///   subscribe/unsubscribe churn of a single observer never allocates.
/// - **Ordered overflow**: `BTreeMap` gives `O(log n)` removal by key with no
///   compaction, so removing every key in either order stays near-linear.
/// - **Snapshot iteration**: callers that need to mutate the bag while walking
///   it take [`Bag::snapshot`] first; mutations are then invisible to that
///   pass.
///
/// # Examples
///
/// ```rust
/// use rxcore::bag::Bag;
///
/// let mut bag = Bag::default();
/// let a = bag.insert("a");
/// let b = bag.insert("b");
/// assert_eq!(bag.count(), 2);
///
/// assert_eq!(bag.remove_key(a), Some("a"));
/// assert_eq!(bag.remove_key(a), None);
/// assert_eq!(bag.remove_all(), vec!["b"]);
/// assert!(bag.remove_key(b).is_none());
/// ```
pub struct Bag<T> {
  next_key: u64,
  slot: Option<(BagKey, T)>,
  overflow: BTreeMap<BagKey, T>,
}

impl<T> Default for Bag<T> {
  fn default() -> Self { Self { next_key: 0, slot: None, overflow: BTreeMap::new() } }
}

impl<T> Bag<T> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Insert `value` and return the key that removes it again.
  pub fn insert(&mut self, value: T) -> BagKey {
    let key = BagKey(self.next_key);
    self.next_key = self.next_key.wrapping_add(1);

    if self.slot.is_none() {
      self.slot = Some((key, value));
    } else {
      self.overflow.insert(key, value);
    }
    key
  }

  /// Remove the entry for `key`, `None` if it was already removed.
  pub fn remove_key(&mut self, key: BagKey) -> Option<T> {
    if matches!(&self.slot, Some((k, _)) if *k == key) {
      return self.slot.take().map(|(_, v)| v);
    }
    self.overflow.remove(&key)
  }

  /// Swap the storage with an empty one and hand back what it held, in
  /// insertion order. Disposing the values is the caller's business.
  pub fn remove_all(&mut self) -> Vec<T> {
    let slot = self.slot.take();
    let overflow = std::mem::take(&mut self.overflow);

    let mut values = Vec::with_capacity(overflow.len() + slot.is_some() as usize);
    match slot {
      Some((key, value)) => {
        let mut value = Some(value);
        for (k, v) in overflow {
          if k > key {
            values.extend(value.take());
          }
          values.push(v);
        }
        values.extend(value);
      }
      None => values.extend(overflow.into_values()),
    }
    values
  }

  #[inline]
  pub fn contains_key(&self, key: BagKey) -> bool {
    matches!(&self.slot, Some((k, _)) if *k == key) || self.overflow.contains_key(&key)
  }

  #[inline]
  pub fn count(&self) -> usize { self.slot.is_some() as usize + self.overflow.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.slot.is_none() && self.overflow.is_empty() }

  /// Walk the entries in insertion order.
  pub fn iter(&self) -> impl Iterator<Item = (BagKey, &T)> {
    let split = self
      .slot
      .as_ref()
      .map_or(BagKey(u64::MAX), |(k, _)| *k);
    self
      .overflow
      .range(..split)
      .chain(self.slot.iter().map(|(k, v)| (k, v)))
      .chain(self.overflow.range(split..))
      .map(|(k, v)| (*k, v))
  }

  pub fn for_each(&self, mut action: impl FnMut(&T)) {
    for (_, value) in self.iter() {
      action(value);
    }
  }
}

impl<T: Clone> Bag<T> {
  /// Clone out the current `(key, value)` pairs so the bag can be mutated
  /// while the caller walks them.
  pub fn snapshot(&self) -> Vec<(BagKey, T)> {
    self
      .iter()
      .map(|(k, v)| (k, v.clone()))
      .collect()
  }
}

impl<T> Debug for Bag<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} elements in Bag", self.count())
  }
}
