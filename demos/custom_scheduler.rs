//! Example: a custom scheduler
//!
//! A scheduler only has to say what time it is and how it runs a delayed
//! action. Recursive scheduling comes for free from the trait. This one logs
//! every request and hands the work to the current-thread trampoline.

use rxcore::prelude::*;

#[derive(Clone, Default)]
pub struct VerboseScheduler {
  inner: CurrentThreadScheduler,
}

impl Scheduler for VerboseScheduler {
  fn now(&self) -> Instant { self.inner.now() }

  fn schedule_relative<F, D>(&self, due: Duration, action: F) -> BoxedDisposable
  where
    F: FnOnce() -> D + Send + 'static,
    D: Disposable + Send + Sync + 'static,
  {
    println!("[VerboseScheduler] scheduling an action due in {:?}", due);
    self.inner.schedule_relative(due, move || {
      println!("[VerboseScheduler] running");
      action()
    })
  }
}

fn main() {
  println!("--- Starting Custom Scheduler Example ---");

  let scheduler = VerboseScheduler::default();
  let subject = PublishSubject::<u32, String>::new();
  subject
    .clone()
    .subscribe_next(|v| println!("Consumer received value: {}", v));

  let c_subject = subject.clone();
  scheduler.schedule_recursive(1u32, move |n, recursion| {
    c_subject.on_next(n);
    if n < 3 {
      recursion.schedule_after(Duration::from_millis(100), n + 1);
    } else {
      c_subject.on_completed();
    }
  });

  println!("--- Example Finished ---");
}
