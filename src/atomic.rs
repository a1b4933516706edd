//! Lock-free integer used to elect a single winner among racing threads.
//!
//! Every operation is sequentially consistent. The typical pattern is a flag
//! word where each bit marks a one-time transition: the thread whose
//! `fetch_or` observes the bit unset is the one that performs the side effect.
//!
//! ```rust
//! use rxcore::atomic::AtomicInt;
//!
//! const DISPOSED: i32 = 1;
//! let state = AtomicInt::new(0);
//! assert!(state.try_set_flag(DISPOSED));
//! assert!(!state.try_set_flag(DISPOSED));
//! ```

use std::{
  fmt::{Debug, Formatter},
  sync::atomic::{AtomicI32, Ordering},
};

#[derive(Default)]
pub struct AtomicInt(AtomicI32);

impl AtomicInt {
  #[inline]
  pub const fn new(value: i32) -> Self { Self(AtomicI32::new(value)) }

  #[inline]
  pub fn load(&self) -> i32 { self.0.load(Ordering::SeqCst) }

  /// Adds `value` and returns the previous value.
  #[inline]
  pub fn add(&self, value: i32) -> i32 { self.0.fetch_add(value, Ordering::SeqCst) }

  /// Subtracts `value` and returns the previous value.
  #[inline]
  pub fn sub(&self, value: i32) -> i32 { self.0.fetch_sub(value, Ordering::SeqCst) }

  /// Bitwise-or `mask` into the value and returns the previous value.
  #[inline]
  pub fn fetch_or(&self, mask: i32) -> i32 { self.0.fetch_or(mask, Ordering::SeqCst) }

  /// Stores `value` and returns the previous value.
  #[inline]
  pub fn swap(&self, value: i32) -> i32 { self.0.swap(value, Ordering::SeqCst) }

  #[inline]
  pub fn is_flag_set(&self, mask: i32) -> bool { self.load() & mask != 0 }

  /// Sets `mask` and reports whether this call was the one that flipped it.
  #[inline]
  pub fn try_set_flag(&self, mask: i32) -> bool { self.fetch_or(mask) & mask == 0 }
}

impl Debug for AtomicInt {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_tuple("AtomicInt").field(&self.load()).finish()
  }
}
