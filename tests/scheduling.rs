//! Schedulers and disposables working together.

use std::{sync::Arc, thread};

use parking_lot::Mutex;
use rxcore::{
  prelude::*,
  scheduler::test_scheduler::{completed, next},
};

#[rxcore_macro::test]
fn virtual_time_runs_in_due_order() {
  let scheduler = VirtualTimeScheduler::new();
  let log = Arc::new(Mutex::new(vec![]));
  for (due, tag) in [(30, 'c'), (10, 'a'), (10, 'b')] {
    let (c_log, c_scheduler) = (log.clone(), scheduler.clone());
    scheduler.schedule_absolute_virtual(due, move || {
      c_log.lock().push((c_scheduler.clock(), tag));
    });
  }
  scheduler.start().unwrap();
  assert_eq!(*log.lock(), vec![(10, 'a'), (10, 'b'), (30, 'c')]);
}

#[rxcore_macro::test]
fn recursive_producer_feeds_a_subject() {
  // immediate work requested at the current tick runs one tick later
  let scheduler = TestScheduler::new();
  let subject = PublishSubject::<u32, String>::new();

  let (c_subject, c_scheduler) = (subject.clone(), scheduler.clone());
  scheduler.schedule_at(200, move || {
    c_scheduler.schedule_recursive(1, move |n, recursion| {
      if n > 3 {
        c_subject.on_completed();
      } else {
        c_subject.on_next(n);
        recursion.schedule_after(Duration::from_millis(10), n + 1);
      }
    })
  });

  let c_subject = subject.clone();
  let observer = scheduler.start_with(0, 150, 1000, move || c_subject);
  assert_eq!(
    observer.events(),
    vec![next(201, 1), next(211, 2), next(221, 3), completed(231)]
  );
}

#[rxcore_macro::test]
fn scheduled_dispose_waits_for_the_clock() {
  let scheduler = TestScheduler::new();
  let disposed_at = Arc::new(Mutex::new(None));
  let (c_scheduler, c_disposed_at) = (scheduler.clone(), disposed_at.clone());
  let inner = Disposables::create(move || *c_disposed_at.lock() = Some(c_scheduler.clock()));
  let scheduled = ScheduledDisposable::new(scheduler.clone(), inner);

  scheduler.advance_to(40).unwrap();
  scheduled.dispose();
  assert!(scheduled.is_disposed());
  assert_eq!(*disposed_at.lock(), None);

  scheduler.flush().unwrap();
  assert_eq!(*disposed_at.lock(), Some(41));
}

#[rxcore_macro::test]
fn composite_disposed_from_many_threads_disposes_members_once() {
  let composite = CompositeDisposable::new();
  let hits = Arc::new(rxcore::atomic::AtomicInt::default());
  for _ in 0..16 {
    let c_hits = hits.clone();
    composite.insert(Disposables::create(move || {
      c_hits.add(1);
    }));
  }

  let handles: Vec<_> = (0..8)
    .map(|_| {
      let composite = composite.clone();
      thread::spawn(move || composite.dispose())
    })
    .collect();
  handles
    .into_iter()
    .for_each(|h| h.join().unwrap());

  assert_eq!(hits.load(), 16);
  assert!(composite.is_disposed());
  assert_eq!(composite.count(), 0);
}

#[rxcore_macro::test]
fn ref_count_releases_underlying_after_last_retainer() {
  let underlying = BooleanDisposable::new();
  let ref_count = RefCountDisposable::new(underlying.clone());
  let retained: Vec<_> = (0..4).map(|_| ref_count.retain()).collect();

  ref_count.dispose();
  assert!(!underlying.is_disposed());

  let handles: Vec<_> = retained
    .into_iter()
    .map(|d| thread::spawn(move || d.dispose()))
    .collect();
  handles
    .into_iter()
    .for_each(|h| h.join().unwrap());

  assert!(underlying.is_disposed());
  assert_eq!(ref_count.retained(), 0);
}

#[rxcore_macro::test]
fn serial_replaces_and_disposes_previous() {
  let serial = SerialDisposable::new();
  let (first, second) = (BooleanDisposable::new(), BooleanDisposable::new());
  serial.set(first.clone());
  serial.set(second.clone());
  assert!(first.is_disposed());
  assert!(!second.is_disposed());

  serial.dispose();
  assert!(second.is_disposed());

  let late = BooleanDisposable::new();
  serial.set(late.clone());
  assert!(late.is_disposed());
}

#[cfg(feature = "futures-scheduler")]
#[rxcore_macro::test]
fn serial_scheduler_keeps_fifo_order() {
  let scheduler = SerialScheduler::new().unwrap();
  let (tx, rx) = std::sync::mpsc::channel();
  for i in 0..20 {
    let tx = tx.clone();
    scheduler.schedule(move || {
      tx.send(i).ok();
    });
  }
  let received: Vec<_> = rx.iter().take(20).collect();
  assert_eq!(received, (0..20).collect::<Vec<_>>());
}
