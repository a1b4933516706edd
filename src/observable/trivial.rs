use std::{convert::Infallible, marker::PhantomData};

use crate::{
  disposable::BooleanDisposable,
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Creates an observable that emits the values of an iterator, then
/// completes.
///
/// Emission stops early once the observer reports itself closed.
///
/// ```
/// use rxcore::prelude::*;
///
/// from_iter(0..10).subscribe_next(|v| println!("{},", v));
/// ```
pub fn from_iter<Iter>(iter: Iter) -> ObservableIter<Iter>
where
  Iter: IntoIterator,
{
  ObservableIter(iter)
}

#[derive(Clone)]
pub struct ObservableIter<Iter>(Iter);

impl<O, Iter> Observable<Iter::Item, Infallible, O> for ObservableIter<Iter>
where
  Iter: IntoIterator,
  O: Observer<Iter::Item, Infallible>,
{
  type Unsub = ();

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    for v in self.0 {
      if observer.is_closed() {
        return;
      }
      observer.next(v);
    }
    observer.complete();
  }
}

impl<Iter> ObservableExt<Iter::Item, Infallible> for ObservableIter<Iter> where Iter: IntoIterator
{}

/// Creates an observable producing a single value, then completing.
pub fn of<Item>(v: Item) -> ObservableIter<std::iter::Once<Item>> { from_iter(std::iter::once(v)) }

/// Alias of [`of`].
pub fn just<Item>(v: Item) -> ObservableIter<std::iter::Once<Item>> { of(v) }

/// Creates an observable that completes immediately without values.
pub fn empty<Item>() -> ObservableIter<std::iter::Empty<Item>> { from_iter(std::iter::empty()) }

/// Creates an observable that never emits anything.
///
/// Its subscription reports disposal but holds nothing.
pub fn never<Item, Err>() -> Never<Item, Err> { Never(PhantomData) }

pub struct Never<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for Never<Item, Err> {
  fn clone(&self) -> Self { Never(PhantomData) }
}

impl<Item, Err, O> Observable<Item, Err, O> for Never<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = BooleanDisposable;

  fn actual_subscribe(self, _observer: O) -> Self::Unsub { BooleanDisposable::new() }
}

impl<Item, Err> ObservableExt<Item, Err> for Never<Item, Err> {}

/// Creates an observable that emits no items, just terminates with an error.
pub fn throw<Item, Err>(e: Err) -> Throw<Item, Err> { Throw(e, PhantomData) }

#[derive(Clone)]
pub struct Throw<Item, Err>(Err, PhantomData<fn() -> Item>);

impl<Item, Err, O> Observable<Item, Err, O> for Throw<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = ();

  fn actual_subscribe(self, observer: O) -> Self::Unsub { observer.error(self.0) }
}

impl<Item, Err> ObservableExt<Item, Err> for Throw<Item, Err> {}
